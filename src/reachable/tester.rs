//! Pluggable include testers.
//!
//! After propagation, the remaining members of reachable types are offered to every
//! registered [`IncludeTester`]. A member is included if any tester accepts it.

use crate::{
    config::{CompilationMode, ReachableConfig},
    model::{FieldDefinition, FieldFlags, MethodDefinition, Module, Token},
};

/// Votes on whether a member of a reachable type must be emitted.
pub trait IncludeTester: Send + Sync {
    /// Short name for log output.
    fn name(&self) -> &'static str;

    /// True if the method must be included.
    fn include_method(&self, _module: &Module, _method: &MethodDefinition) -> bool {
        false
    }

    /// True if the field must be included.
    fn include_field(&self, _module: &Module, _field: &FieldDefinition) -> bool {
        false
    }
}

/// Mode-dependent member defaults.
///
/// Class libraries keep their externally visible surface. In [`CompilationMode::All`] every
/// member of a root assembly is kept. Applications keep nothing by default.
#[derive(Debug, Clone)]
pub struct ModeTester {
    mode: CompilationMode,
    root_assemblies: Vec<String>,
}

impl ModeTester {
    /// Creates the tester for a configuration.
    #[must_use]
    pub fn new(config: &ReachableConfig) -> Self {
        ModeTester {
            mode: config.mode,
            root_assemblies: config.root_assemblies.clone(),
        }
    }

    fn in_root_assembly(&self, module: &Module, declaring: Token) -> bool {
        module.get(declaring).is_some_and(|ty| {
            self.root_assemblies.is_empty()
                || self
                    .root_assemblies
                    .iter()
                    .any(|assembly| assembly.eq_ignore_ascii_case(ty.scope()))
        })
    }
}

impl IncludeTester for ModeTester {
    fn name(&self) -> &'static str {
        "mode"
    }

    fn include_method(&self, module: &Module, method: &MethodDefinition) -> bool {
        match self.mode {
            CompilationMode::Application => false,
            CompilationMode::ClassLibrary => method.visibility.is_externally_visible(),
            CompilationMode::All => self.in_root_assembly(module, method.declaring),
        }
    }

    fn include_field(&self, module: &Module, field: &FieldDefinition) -> bool {
        match self.mode {
            CompilationMode::Application => false,
            CompilationMode::ClassLibrary => field.visibility.is_externally_visible(),
            CompilationMode::All => self.in_root_assembly(module, field.declaring),
        }
    }
}

/// Keeps the serialized state of serializable types.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializationTester;

impl IncludeTester for SerializationTester {
    fn name(&self) -> &'static str {
        "serialization"
    }

    fn include_field(&self, module: &Module, field: &FieldDefinition) -> bool {
        !field.flags.intersects(FieldFlags::STATIC | FieldFlags::NOT_SERIALIZED)
            && module
                .get(field.declaring)
                .is_some_and(|ty| ty.is_serializable())
    }
}

/// Keeps every field of an enum, so values can be named at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumFieldTester;

impl IncludeTester for EnumFieldTester {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn include_field(&self, module: &Module, field: &FieldDefinition) -> bool {
        module.get(field.declaring).is_some_and(|ty| ty.is_enum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{FieldBuilder, MethodBuilder, TypeBuilder, TypeFlags, Visibility},
        test::int,
    };

    #[test]
    fn test_mode_tester() {
        let module = Module::new();
        let ty = TypeBuilder::native("Lib", "Lib", "Api")
            .with_method(MethodBuilder::new("Open"))
            .with_method(MethodBuilder::new("Helper").with_visibility(Visibility::Assembly))
            .with_field(FieldBuilder::new("state", int()).with_visibility(Visibility::Family))
            .register(&module)
            .unwrap();
        let open = &ty.methods()[0];
        let helper = &ty.methods()[1];
        let state = &ty.fields()[0];

        let application = ModeTester::new(&ReachableConfig::application());
        assert!(!application.include_method(&module, open));

        let library = ModeTester::new(&ReachableConfig::class_library());
        assert!(library.include_method(&module, open));
        assert!(!library.include_method(&module, helper));
        assert!(library.include_field(&module, state));

        let all = ModeTester::new(&ReachableConfig::all(["Lib"]));
        assert!(all.include_method(&module, helper));
        let other = ModeTester::new(&ReachableConfig::all(["App"]));
        assert!(!other.include_field(&module, state));
    }

    #[test]
    fn test_serialization_tester() {
        let module = Module::new();
        let ty = TypeBuilder::native("App", "App", "Settings")
            .with_flags(TypeFlags::SERIALIZABLE)
            .with_field(FieldBuilder::new("name", int()))
            .with_field(FieldBuilder::new("cache", int()).with_flags(FieldFlags::NOT_SERIALIZED))
            .with_field(FieldBuilder::new("shared", int()).with_flags(FieldFlags::STATIC))
            .register(&module)
            .unwrap();
        let plain = TypeBuilder::native("App", "App", "Plain")
            .with_field(FieldBuilder::new("name", int()))
            .register(&module)
            .unwrap();

        let tester = SerializationTester;
        assert!(tester.include_field(&module, &ty.fields()[0]));
        assert!(!tester.include_field(&module, &ty.fields()[1]));
        assert!(!tester.include_field(&module, &ty.fields()[2]));
        assert!(!tester.include_field(&module, &plain.fields()[0]));
    }

    #[test]
    fn test_enum_tester() {
        let module = Module::new();
        let color = TypeBuilder::native("App", "App", "Color")
            .with_flags(TypeFlags::ENUM | TypeFlags::VALUE_TYPE)
            .with_field(FieldBuilder::new("Red", int()).with_flags(FieldFlags::STATIC | FieldFlags::LITERAL))
            .register(&module)
            .unwrap();
        assert!(EnumFieldTester.include_field(&module, &color.fields()[0]));
    }
}
