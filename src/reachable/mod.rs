//! Whole-program reachability (tree shaking).
//!
//! Computes the minimal set of types, methods and fields that must be emitted. Roots are
//! selected once from the configuration and from marker attributes, then a fixpoint loop
//! propagates reachability through overrides, interface implementations, bridges and
//! conditional includes until a pass adds nothing.
//!
//! # Key Components
//!
//! - [`ReachableContext`] - Root selection, dependency walking and the fixpoint
//! - [`ReachableSet`] - Append-only set of reachable tokens
//! - [`PatternInclude`] / [`TargetInclude`] - Configured include rules
//! - [`IncludeTester`] - Pluggable member votes
//!
//! # Propagation
//!
//! A pass marks, for every reachable type:
//! - methods overriding a reachable base method;
//! - methods implementing a reachable interface method;
//! - members whose bridge target is reachable;
//! - members some tester or pattern include accepts;
//! - for every reachable interface method, its implementation in every reachable concrete
//!   implementer.
//!
//! Marking a definition also marks its direct dependencies (see the walker). The reachable
//! set only grows, so the loop terminates after at most one pass per definition.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotdex::config::ReachableConfig;
//! use dotdex::model::{MethodBuilder, MethodFlags, MethodReference, Module, PrimitiveKind,
//!     TypeBuilder, TypeReference};
//! use dotdex::reachable::ReachableContext;
//!
//! let module = Arc::new(Module::new());
//! let void = TypeReference::primitive(PrimitiveKind::Void);
//! let base = TypeBuilder::native("App", "App", "Base")
//!     .with_method(MethodBuilder::new("Foo").with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT))
//!     .register(&module)?;
//! let derived = TypeBuilder::native("App", "App", "Derived")
//!     .with_base(base.reference())
//!     .with_method(MethodBuilder::constructor())
//!     .with_method(MethodBuilder::new("Foo").with_flags(MethodFlags::VIRTUAL))
//!     .register(&module)?;
//! TypeBuilder::native("App", "App", "Program")
//!     .with_method(
//!         MethodBuilder::new("Main")
//!             .with_reference(MethodReference::new(derived.reference(), ".ctor", vec![], void.clone()))
//!             .with_reference(MethodReference::new(base.reference(), "Foo", vec![], void)),
//!     )
//!     .register(&module)?;
//!
//! let context = ReachableContext::new(module, ReachableConfig::default().with_root("App.Program")
//!     .with_target(dotdex::reachable::TargetInclude::new("App.Program::Main")));
//! context.mark_roots();
//! context.complete();
//!
//! assert!(context.is_reachable(derived.find_method("Foo").unwrap().token));
//! # Ok::<(), dotdex::Error>(())
//! ```

mod context;
mod include;
mod pattern;
mod set;
mod tester;
mod walker;

pub use context::{ReachableContext, ReachableStats};
pub use include::{
    harvest, is_include_attribute, AssemblyIncludes, IncludeAction, IncludeScope,
    InstanceOfConditionInclude, PatternInclude, PatternRules, TargetInclude,
    TypeConditionInclude, APPLICATION_ROOT_ATTRIBUTE, APPLY_TO_MEMBERS, ATTRIBUTE_NAMESPACE,
    INCLUDE_ATTRIBUTE, INCLUDE_DERIVED_TYPES, INCLUDE_TYPE_ARGUMENT, INCLUDE_TYPE_ATTRIBUTE,
    INSTANCE_OF_CONDITION, TYPE_CONDITION,
};
pub use pattern::Pattern;
pub use set::ReachableSet;
pub use tester::{EnumFieldTester, IncludeTester, ModeTester, SerializationTester};
