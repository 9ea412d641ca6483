//! Fixture builders shared by the unit tests.

use crate::{
    model::{CustomAttribute, PrimitiveKind, TypeOrigin, TypeReference},
    reachable::{APPLICATION_ROOT_ATTRIBUTE, ATTRIBUTE_NAMESPACE},
};

/// `System.Void`
pub fn void() -> TypeReference {
    TypeReference::primitive(PrimitiveKind::Void)
}

/// `System.Int32`
pub fn int() -> TypeReference {
    TypeReference::primitive(PrimitiveKind::Int32)
}

/// The application-root marker attribute, unregistered.
pub fn app_root() -> CustomAttribute {
    CustomAttribute::new(TypeReference::named(
        ATTRIBUTE_NAMESPACE,
        APPLICATION_ROOT_ATTRIBUTE,
        TypeOrigin::Native,
    ))
}
