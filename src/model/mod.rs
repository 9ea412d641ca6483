//! Unified Type Model.
//!
//! This module abstracts over the two source representations the compiler consumes, CIL
//! metadata and JVM class files, behind one graph of types, methods and fields. Everything
//! downstream (reachability, code generation) works on this graph only.
//!
//! # Key Components
//!
//! - [`Module`] - Per-run registry owning all definitions, with lazy provider loading
//! - [`TypeReference`] - Unbound reference, tagged with the [`TypeUsage`] it was created for
//! - [`TypeDefinition`] - Closed enum over native, foreign and synthetic definitions
//! - [`MethodDefinition`] / [`FieldDefinition`] - Member definitions
//! - [`TypeBuilder`] - Describes a type and registers it in a module
//! - [`SourceProvider`] - Adapter interface for the raw readers
//! - [`RawType`] - Adapter-level types converted through [`Module::as_type_reference`]
//!
//! # Identity
//!
//! Definitions are identified by [`Token`]. Two references denote the same type if they
//! resolve to the same token; unresolved references fall back to full-name equality. See
//! [`Module::is_same`].
//!
//! # Examples
//!
//! ```rust
//! use dotdex::model::{Module, TypeBuilder, TypeFlags, TypeReference, TypeOrigin};
//!
//! let module = Module::new();
//! let iface = TypeBuilder::native("App", "App", "IRun")
//!     .with_flags(TypeFlags::INTERFACE)
//!     .register(&module)?;
//! let runner = TypeBuilder::native("App", "App", "Runner")
//!     .with_interface(iface.reference())
//!     .register(&module)?;
//!
//! assert!(module.implements(&runner, &iface));
//! let by_name = TypeReference::named("App", "Runner", TypeOrigin::Native);
//! assert!(module.is_same(&by_name, &runner.reference()));
//! # Ok::<(), dotdex::Error>(())
//! ```

mod attribute;
mod builder;
mod convert;
mod field;
mod generic;
mod hierarchy;
mod member;
mod method;
mod module;
pub(crate) mod primitives;
mod source;
mod token;
mod typedef;
mod typeref;

pub use attribute::{AttributeValue, CustomAttribute};
pub use builder::{FieldBuilder, MethodBuilder, TypeBuilder};
pub use convert::{ForeignType, NativeType, RawType};
pub use field::{FieldDefinition, FieldDefinitionRc, FieldFlags, FieldReference};
pub use generic::{GenericOwner, GenericParameter};
pub use member::{MemberReference, Visibility};
pub use method::{
    MethodDefinition, MethodDefinitionRc, MethodFlags, MethodReference, Parameter,
    CLASS_CTOR_NAMES, INSTANCE_CTOR_NAMES,
};
pub use module::{Module, DEFAULT_MAX_DEPTH};
pub use primitives::{PrimitiveKind, SYSTEM_NAMESPACE};
pub use source::{InMemorySource, SourceProvider};
pub use token::{MemberKind, Token, FIELD_TABLE, METHOD_TABLE, TYPE_TABLE};
pub use typedef::{
    ForeignTypeDef, NativeTypeDef, SyntheticTypeDef, TypeCore, TypeDefinition, TypeDefinitionRc,
    TypeFlags,
};
pub use typeref::{
    NamedType, TypeOrigin, TypeRefKind, TypeReference, TypeUsage, NULLABLE_NAME,
    NULLABLE_NAMESPACE,
};
