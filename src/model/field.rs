//! Field references and definitions.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::model::{CustomAttribute, Token, TypeOrigin, TypeReference, TypeUsage, Visibility};

/// A reference-counted pointer to a [`FieldDefinition`]
pub type FieldDefinitionRc = Arc<FieldDefinition>;

bitflags! {
    /// Field attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u16 {
        /// Per-type storage
        const STATIC = 0x0001;
        /// Assignable only in constructors
        const INIT_ONLY = 0x0002;
        /// Compile-time constant
        const LITERAL = 0x0004;
        /// Excluded from serialization
        const NOT_SERIALIZED = 0x0008;
    }
}

/// A reference to a field by declaring type, name and type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReference {
    /// Type declaring the field
    pub declaring_type: TypeReference,
    /// Simple name
    pub name: String,
    /// Field type
    pub field_type: TypeReference,
}

impl FieldReference {
    /// Creates a field reference, tagging the usages.
    pub fn new(declaring_type: TypeReference, name: impl Into<String>, field_type: TypeReference) -> Self {
        FieldReference {
            declaring_type: declaring_type.with_usage(TypeUsage::DeclaringType),
            name: name.into(),
            field_type: field_type.with_usage(TypeUsage::FieldType),
        }
    }

    /// Full name in the form `Type Decl::Name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}", self.field_type, self.declaring_type, self.name)
    }
}

/// A field definition registered in a [`crate::model::Module`].
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Identity within the module
    pub token: Token,
    /// Token of the declaring type
    pub declaring: Token,
    /// Reference to the declaring type
    pub declaring_type: TypeReference,
    /// Simple name
    pub name: String,
    /// Field type, with [`TypeUsage::FieldType`]
    pub field_type: TypeReference,
    /// Storage attributes
    pub flags: FieldFlags,
    /// Accessibility
    pub visibility: Visibility,
    /// Foreign field this wrapper maps to
    pub bridge: Option<FieldReference>,
    /// Custom attributes, verbatim
    pub attributes: Vec<CustomAttribute>,
    /// Source representation
    pub origin: TypeOrigin,
}

impl FieldDefinition {
    /// Full name in the form `Type Decl::Name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}", self.field_type, self.declaring_type, self.name)
    }

    /// True for static fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }

    /// A reference that binds back to this definition.
    #[must_use]
    pub fn to_reference(&self) -> FieldReference {
        FieldReference {
            declaring_type: self.declaring_type.clone(),
            name: self.name.clone(),
            field_type: self.field_type.clone(),
        }
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
