//! Reachability configuration.
//!
//! [`ReachableConfig`] carries everything the caller decides about root selection: the
//! compilation mode, explicit root names, the include rules given outside of attributes, and
//! the limits of the walk. Attribute-driven includes are harvested from the model and need no
//! configuration.

use strum::{Display, EnumIter, EnumString};

use crate::{
    model::DEFAULT_MAX_DEPTH,
    reachable::{PatternInclude, TargetInclude},
};

/// What the default roots of a compilation are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum CompilationMode {
    /// Types carrying an application-root attribute
    #[default]
    Application,
    /// Every externally visible type and member
    ClassLibrary,
    /// Every type of the root assemblies
    All,
}

/// Configuration of root selection and propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableConfig {
    /// Default root selection
    pub mode: CompilationMode,

    /// Explicit root names, matched case-insensitively against full names and JVM class names
    pub root_names: Vec<String>,

    /// Assemblies whose types are roots in [`CompilationMode::All`], and whose members are
    /// tested in [`CompilationMode::ClassLibrary`]. Empty means every assembly.
    pub root_assemblies: Vec<String>,

    /// Glob includes, in declaration order
    pub patterns: Vec<PatternInclude>,

    /// Single-target includes, optionally gated on another type
    pub targets: Vec<TargetInclude>,

    /// Full names of types whose subclasses and implementers are always reachable
    pub instance_of: Vec<String>,

    /// Limit for recursive walks through composite type references
    pub max_depth: usize,

    /// Evaluate pass candidates on the rayon pool
    pub parallel: bool,
}

impl Default for ReachableConfig {
    fn default() -> Self {
        Self {
            mode: CompilationMode::Application,
            root_names: Vec::new(),
            root_assemblies: Vec::new(),
            patterns: Vec::new(),
            targets: Vec::new(),
            instance_of: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            parallel: true,
        }
    }
}

impl ReachableConfig {
    /// Roots come from application-root attributes.
    #[must_use]
    pub fn application() -> Self {
        Self::default()
    }

    /// Roots are all externally visible types.
    #[must_use]
    pub fn class_library() -> Self {
        Self {
            mode: CompilationMode::ClassLibrary,
            ..Self::default()
        }
    }

    /// Roots are all types of the given assemblies.
    #[must_use]
    pub fn all<I, S>(assemblies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: CompilationMode::All,
            root_assemblies: assemblies.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: CompilationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds an explicit root name.
    #[must_use]
    pub fn with_root(mut self, name: impl Into<String>) -> Self {
        self.root_names.push(name.into());
        self
    }

    /// Adds a root assembly.
    #[must_use]
    pub fn with_root_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.root_assemblies.push(assembly.into());
        self
    }

    /// Appends a pattern include. Later patterns take precedence over earlier ones of the
    /// same scope.
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternInclude) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Appends a single-target include.
    #[must_use]
    pub fn with_target(mut self, target: TargetInclude) -> Self {
        self.targets.push(target);
        self
    }

    /// Adds an instance-of condition by full name.
    #[must_use]
    pub fn with_instance_of(mut self, type_name: impl Into<String>) -> Self {
        self.instance_of.push(type_name.into());
        self
    }

    /// Sets the walk depth limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Enables or disables parallel candidate evaluation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// True if `scope` is one of the root assemblies. An empty list admits every scope.
    #[must_use]
    pub fn is_root_assembly(&self, scope: &str) -> bool {
        self.root_assemblies.is_empty()
            || self
                .root_assemblies
                .iter()
                .any(|assembly| assembly.eq_ignore_ascii_case(scope))
    }
}
