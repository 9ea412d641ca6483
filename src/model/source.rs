//! Source providers feeding the [`Module`] on demand.
//!
//! The raw CIL and JVM readers live outside this crate. They plug in through
//! [`SourceProvider`]: the module asks a provider for a type name when resolution misses its
//! own indices, and registers whatever builder comes back. Each name is requested at most once
//! per module, so providers need no caching of their own.

use dashmap::DashMap;

use crate::model::{Module, TypeBuilder, TypeOrigin};

/// A read-only adapter over one source representation.
pub trait SourceProvider: Send + Sync {
    /// Representation this provider reads.
    fn origin(&self) -> TypeOrigin;

    /// Human readable name, used in log output.
    fn name(&self) -> &str;

    /// Describes the type with the given full name or JVM class name, if this provider
    /// defines it.
    ///
    /// The module is passed for type conversion only. Implementations must not resolve the
    /// name being loaded.
    fn load(&self, module: &Module, name: &str) -> Option<TypeBuilder>;

    /// Names of all types this provider defines. Used for eager loading.
    fn type_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A provider serving prepared builders from memory.
///
/// Builders are keyed by full name, and foreign builders additionally by class name.
pub struct InMemorySource {
    name: String,
    origin: TypeOrigin,
    types: DashMap<String, TypeBuilder>,
    names: boxcar::Vec<String>,
}

impl InMemorySource {
    /// Creates an empty provider.
    pub fn new(name: impl Into<String>, origin: TypeOrigin) -> Self {
        InMemorySource {
            name: name.into(),
            origin,
            types: DashMap::new(),
            names: boxcar::Vec::new(),
        }
    }

    /// Adds a builder.
    #[must_use]
    pub fn with_type(self, builder: TypeBuilder) -> Self {
        self.add(builder);
        self
    }

    /// Adds a builder through a shared reference.
    pub fn add(&self, builder: TypeBuilder) {
        let full_name = builder.full_name();
        if let Some(class_name) = builder.class_name() {
            self.types.insert(class_name.to_string(), builder.clone());
        }
        self.names.push(full_name.clone());
        self.types.insert(full_name, builder);
    }

    /// Number of builders held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.count()
    }

    /// True if no builder was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceProvider for InMemorySource {
    fn origin(&self) -> TypeOrigin {
        self.origin
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, _module: &Module, name: &str) -> Option<TypeBuilder> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    fn type_names(&self) -> Vec<String> {
        self.names.iter().map(|(_, name)| name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_lookup() {
        let source = InMemorySource::new("rt.jar", TypeOrigin::Foreign)
            .with_type(TypeBuilder::foreign("java/util/List"));
        let module = Module::new();

        assert_eq!(source.len(), 1);
        assert!(source.load(&module, "java/util/List").is_some());
        assert!(source.load(&module, "java.util.List").is_some());
        assert!(source.load(&module, "java.util.Map").is_none());
        assert_eq!(source.type_names(), vec!["java.util.List".to_string()]);
    }
}
