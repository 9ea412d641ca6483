//! Generic parameters of types and methods.

use std::fmt;

use crate::model::TypeReference;

/// What declares a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// Declared on a type (`!0` in CIL notation)
    Type,
    /// Declared on a method (`!!0` in CIL notation)
    Method,
}

/// A generic parameter, identified by owner kind and position.
///
/// Two parameters are the same when they have the same owner kind and position; the name is
/// informational only, since a derived type is free to rename inherited parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParameter {
    /// Declaring entity kind
    pub owner: GenericOwner,
    /// Zero-based position in the owner's parameter list
    pub position: u32,
    /// Declared name, e.g. `T`
    pub name: String,
    /// Type constraints (`where T : IFoo`)
    pub constraints: Vec<TypeReference>,
}

impl GenericParameter {
    /// Creates an unconstrained generic parameter.
    pub fn new(owner: GenericOwner, position: u32, name: impl Into<String>) -> Self {
        GenericParameter {
            owner,
            position,
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    /// Adds a constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: TypeReference) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// True if both denote the same parameter slot.
    #[must_use]
    pub fn is_same(&self, other: &GenericParameter) -> bool {
        self.owner == other.owner && self.position == other.position
    }
}

impl fmt::Display for GenericParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            match self.owner {
                GenericOwner::Type => write!(f, "!{}", self.position),
                GenericOwner::Method => write!(f, "!!{}", self.position),
            }
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_name() {
        let t = GenericParameter::new(GenericOwner::Type, 0, "T");
        let u = GenericParameter::new(GenericOwner::Type, 0, "TKey");
        let m = GenericParameter::new(GenericOwner::Method, 0, "T");

        assert!(t.is_same(&u));
        assert!(!t.is_same(&m));
    }

    #[test]
    fn test_display() {
        assert_eq!(GenericParameter::new(GenericOwner::Type, 1, "").to_string(), "!1");
        assert_eq!(GenericParameter::new(GenericOwner::Method, 0, "").to_string(), "!!0");
        assert_eq!(GenericParameter::new(GenericOwner::Method, 0, "TResult").to_string(), "TResult");
    }
}
