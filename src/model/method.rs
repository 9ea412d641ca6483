//! Method references and definitions.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::model::{
    CustomAttribute, GenericParameter, MemberReference, Token, TypeOrigin, TypeReference,
    TypeUsage, Visibility,
};

/// A reference-counted pointer to a [`MethodDefinition`]
pub type MethodDefinitionRc = Arc<MethodDefinition>;

/// Names that denote instance constructors in either source representation.
pub const INSTANCE_CTOR_NAMES: [&str; 2] = [".ctor", "<init>"];
/// Names that denote type initializers in either source representation.
pub const CLASS_CTOR_NAMES: [&str; 2] = [".cctor", "<clinit>"];

bitflags! {
    /// Method attributes relevant to dispatch and code generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u16 {
        /// No `this` argument
        const STATIC = 0x0001;
        /// Dispatched through the vtable
        const VIRTUAL = 0x0002;
        /// No body
        const ABSTRACT = 0x0004;
        /// Starts a new vtable slot instead of overriding
        const NEW_SLOT = 0x0008;
        /// Cannot be overridden
        const FINAL = 0x0010;
        /// Name has special meaning (accessors, operators, constructors)
        const SPECIAL_NAME = 0x0020;
        /// Implemented by the runtime or natively
        const EXTERN = 0x0040;
    }
}

/// A named, typed method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Declared name, may be empty for foreign methods
    pub name: String,
    /// Parameter type, with [`TypeUsage::ParameterType`]
    pub parameter_type: TypeReference,
}

impl Parameter {
    /// Creates a parameter, tagging the type with [`TypeUsage::ParameterType`].
    pub fn new(name: impl Into<String>, parameter_type: TypeReference) -> Self {
        Parameter {
            name: name.into(),
            parameter_type: parameter_type.with_usage(TypeUsage::ParameterType),
        }
    }
}

/// A reference to a method by declaring type and signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodReference {
    /// Type declaring the method
    pub declaring_type: TypeReference,
    /// Simple name
    pub name: String,
    /// False for static methods
    pub has_this: bool,
    /// Parameter types in order
    pub parameters: Vec<TypeReference>,
    /// Return type
    pub return_type: TypeReference,
    /// Generic arguments of a generic method instance
    pub generic_arguments: Vec<TypeReference>,
}

impl MethodReference {
    /// Creates an instance method reference.
    pub fn new(
        declaring_type: TypeReference,
        name: impl Into<String>,
        parameters: Vec<TypeReference>,
        return_type: TypeReference,
    ) -> Self {
        MethodReference {
            declaring_type: declaring_type.with_usage(TypeUsage::DeclaringType),
            name: name.into(),
            has_this: true,
            parameters: parameters
                .into_iter()
                .map(|p| p.with_usage(TypeUsage::ParameterType))
                .collect(),
            return_type: return_type.with_usage(TypeUsage::ReturnType),
            generic_arguments: Vec::new(),
        }
    }

    /// Turns this into a static method reference.
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.has_this = false;
        self
    }

    /// Full name in the form `Ret Decl::Name<Args>(Params)`.
    #[must_use]
    pub fn full_name(&self) -> String {
        method_full_name(
            &self.return_type,
            &self.declaring_type.full_name(),
            &self.name,
            &self.generic_arguments,
            self.parameters.iter(),
        )
    }
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

fn method_full_name<'a>(
    return_type: &TypeReference,
    declaring: &str,
    name: &str,
    generics: &[TypeReference],
    parameters: impl Iterator<Item = &'a TypeReference>,
) -> String {
    let params = parameters
        .map(TypeReference::full_name)
        .collect::<Vec<_>>()
        .join(",");
    if generics.is_empty() {
        format!("{return_type} {declaring}::{name}({params})")
    } else {
        let args = generics
            .iter()
            .map(TypeReference::full_name)
            .collect::<Vec<_>>()
            .join(",");
        format!("{return_type} {declaring}::{name}<{args}>({params})")
    }
}

/// A method definition registered in a [`crate::model::Module`].
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Identity within the module
    pub token: Token,
    /// Token of the declaring type
    pub declaring: Token,
    /// Reference to the declaring type, with [`TypeUsage::DeclaringType`]
    pub declaring_type: TypeReference,
    /// Simple name
    pub name: String,
    /// Parameters in order, without `this`
    pub parameters: Vec<Parameter>,
    /// Return type, with [`TypeUsage::ReturnType`]
    pub return_type: TypeReference,
    /// Method-level generic parameters
    pub generic_parameters: Vec<GenericParameter>,
    /// Dispatch attributes
    pub flags: MethodFlags,
    /// Accessibility
    pub visibility: Visibility,
    /// Explicitly overridden methods (`.override` in CIL)
    pub overrides: Vec<MethodReference>,
    /// Foreign method this wrapper forwards to
    pub bridge: Option<MethodReference>,
    /// Members referenced from the method body, as reported by the source adapter
    pub body_references: Vec<MemberReference>,
    /// Custom attributes, verbatim
    pub attributes: Vec<CustomAttribute>,
    /// Source representation
    pub origin: TypeOrigin,
    /// JVM descriptor, for foreign methods
    pub descriptor: Option<String>,
}

impl MethodDefinition {
    /// Full name in the form `Ret Decl::Name<GenericParams>(Params)`.
    #[must_use]
    pub fn full_name(&self) -> String {
        let generics = self
            .generic_parameters
            .iter()
            .cloned()
            .map(TypeReference::generic_parameter)
            .collect::<Vec<_>>();
        method_full_name(
            &self.return_type,
            &self.declaring_type.full_name(),
            &self.name,
            &generics,
            self.parameters.iter().map(|p| &p.parameter_type),
        )
    }

    /// True for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// True for virtual methods
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodFlags::VIRTUAL)
    }

    /// True for abstract methods
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    /// True if this method starts a new vtable slot
    #[must_use]
    pub fn is_new_slot(&self) -> bool {
        self.flags.contains(MethodFlags::NEW_SLOT)
    }

    /// Instance constructor in either representation.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        !self.is_static() && INSTANCE_CTOR_NAMES.contains(&self.name.as_str())
    }

    /// Type initializer in either representation.
    #[must_use]
    pub fn is_class_constructor(&self) -> bool {
        CLASS_CTOR_NAMES.contains(&self.name.as_str())
    }

    /// Parameter types in order.
    pub fn parameter_types(&self) -> impl Iterator<Item = &TypeReference> {
        self.parameters.iter().map(|p| &p.parameter_type)
    }

    /// A reference that binds back to this definition.
    #[must_use]
    pub fn to_reference(&self) -> MethodReference {
        MethodReference {
            declaring_type: self.declaring_type.clone(),
            name: self.name.clone(),
            has_this: !self.is_static(),
            parameters: self.parameter_types().cloned().collect(),
            return_type: self.return_type.clone(),
            generic_arguments: Vec::new(),
        }
    }
}

impl fmt::Display for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PrimitiveKind, TypeOrigin};

    #[test]
    fn test_reference_full_name() {
        let foo = TypeReference::named("App", "Foo", TypeOrigin::Native);
        let reference = MethodReference::new(
            foo,
            "Run",
            vec![
                TypeReference::primitive(PrimitiveKind::Int32),
                TypeReference::named("System", "String", TypeOrigin::Native),
            ],
            TypeReference::primitive(PrimitiveKind::Void),
        );
        assert_eq!(
            reference.full_name(),
            "System.Void App.Foo::Run(System.Int32,System.String)"
        );
        assert!(reference.has_this);
        assert!(!reference.clone().into_static().has_this);
    }

    #[test]
    fn test_reference_usages() {
        let reference = MethodReference::new(
            TypeReference::named("App", "Foo", TypeOrigin::Native),
            "Get",
            vec![TypeReference::primitive(PrimitiveKind::Int32)],
            TypeReference::primitive(PrimitiveKind::Int64),
        );
        assert_eq!(reference.declaring_type.usage(), TypeUsage::DeclaringType);
        assert_eq!(reference.parameters[0].usage(), TypeUsage::ParameterType);
        assert_eq!(reference.return_type.usage(), TypeUsage::ReturnType);
    }

    #[test]
    fn test_generic_reference_full_name() {
        let mut reference = MethodReference::new(
            TypeReference::named("App", "Foo", TypeOrigin::Native),
            "Map",
            vec![],
            TypeReference::primitive(PrimitiveKind::Void),
        );
        reference
            .generic_arguments
            .push(TypeReference::primitive(PrimitiveKind::Int32));
        assert_eq!(reference.full_name(), "System.Void App.Foo::Map<System.Int32>()");
    }
}
