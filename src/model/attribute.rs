//! Custom attributes, stored verbatim as the source adapter read them.
//!
//! The model attaches no meaning to attributes. Their interpretation (application roots,
//! include rules) lives in [`crate::reachable`].

use crate::model::TypeReference;

/// A constant attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean constant
    Bool(bool),
    /// Any integral constant, sign-extended
    Int(i64),
    /// String constant
    String(String),
    /// `typeof(T)` argument
    Type(TypeReference),
    /// Array of constants
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// The value as bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// The value as type reference, if it is one.
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeReference> {
        match self {
            AttributeValue::Type(value) => Some(value),
            _ => None,
        }
    }
}

/// One custom attribute application.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// The attribute class
    pub attribute_type: TypeReference,
    /// Constructor arguments in order
    pub fixed_arguments: Vec<AttributeValue>,
    /// Property and field assignments
    pub named_arguments: Vec<(String, AttributeValue)>,
}

impl CustomAttribute {
    /// Creates an attribute application without arguments.
    #[must_use]
    pub fn new(attribute_type: TypeReference) -> Self {
        CustomAttribute {
            attribute_type,
            fixed_arguments: Vec::new(),
            named_arguments: Vec::new(),
        }
    }

    /// Appends a constructor argument.
    #[must_use]
    pub fn with_argument(mut self, value: AttributeValue) -> Self {
        self.fixed_arguments.push(value);
        self
    }

    /// Appends a named argument.
    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.named_arguments.push((name.into(), value));
        self
    }

    /// Looks up a named argument. The last assignment wins if a name repeats.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&AttributeValue> {
        self.named_arguments
            .iter()
            .rev()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Named boolean argument, `false` when absent or not a bool.
    #[must_use]
    pub fn named_flag(&self, name: &str) -> bool {
        self.named(name).and_then(AttributeValue::as_bool).unwrap_or(false)
    }

    /// True if the attribute class has the given namespace and name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.attribute_type
            .as_named()
            .is_some_and(|named| named.namespace == namespace && named.name == name)
    }
}
