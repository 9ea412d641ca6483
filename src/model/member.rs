//! Accessibility and untyped member references.

use std::fmt;

use crate::model::{FieldReference, MethodReference, TypeReference};

/// Member and type accessibility, ordered from least to most visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Visibility {
    /// Visible only inside the declaring type
    #[default]
    Private,
    /// `private protected`
    FamilyAndAssembly,
    /// `internal`
    Assembly,
    /// `protected`
    Family,
    /// `protected internal`
    FamilyOrAssembly,
    /// `public`
    Public,
}

impl Visibility {
    /// True if code outside the declaring assembly can see the member.
    #[must_use]
    pub fn is_externally_visible(self) -> bool {
        matches!(
            self,
            Visibility::Public | Visibility::Family | Visibility::FamilyOrAssembly
        )
    }
}

/// A reference to a type, method or field, as recorded in a method body or a bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberReference {
    /// Type operand (`newobj` target type, `castclass`, `ldtoken`, ...)
    Type(TypeReference),
    /// Call or `ldftn` target
    Method(MethodReference),
    /// Field load or store
    Field(FieldReference),
}

impl fmt::Display for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberReference::Type(ty) => write!(f, "{ty}"),
            MemberReference::Method(method) => write!(f, "{}", method.full_name()),
            MemberReference::Field(field) => write!(f, "{}", field.full_name()),
        }
    }
}

impl From<TypeReference> for MemberReference {
    fn from(value: TypeReference) -> Self {
        MemberReference::Type(value)
    }
}

impl From<MethodReference> for MemberReference {
    fn from(value: MethodReference) -> Self {
        MemberReference::Method(value)
    }
}

impl From<FieldReference> for MemberReference {
    fn from(value: FieldReference) -> Self {
        MemberReference::Field(value)
    }
}
