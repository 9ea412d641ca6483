//! Type definitions of the unified model.
//!
//! A [`TypeDefinition`] is a closed enum over the three source representations. All variants
//! share a [`TypeCore`] carrying the capability surface consumers rely on, so code walking the
//! graph never needs to know where a type came from. Variant-specific data (the JVM class name
//! of a foreign type, the imported class of a native wrapper) is reachable through the variant.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::model::{
    CustomAttribute, FieldDefinitionRc, GenericParameter, MethodDefinitionRc, Token, TypeOrigin,
    TypeReference, TypeUsage, Visibility,
};

/// A reference-counted pointer to a [`TypeDefinition`]
pub type TypeDefinitionRc = Arc<TypeDefinition>;

bitflags! {
    /// Kind and inheritance attributes of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u16 {
        /// Interface type
        const INTERFACE = 0x0001;
        /// Enumeration, implies `VALUE_TYPE`
        const ENUM = 0x0002;
        /// Value type (struct)
        const VALUE_TYPE = 0x0004;
        /// Cannot be instantiated
        const ABSTRACT = 0x0008;
        /// Cannot be derived from
        const SEALED = 0x0010;
        /// Marked serializable
        const SERIALIZABLE = 0x0020;
    }
}

/// Data shared by every type definition variant.
#[derive(Debug, Clone)]
pub struct TypeCore {
    /// Identity within the module
    pub token: Token,
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name; nested types use `Outer/Inner`
    pub name: String,
    /// Base class, with [`TypeUsage::BaseType`]
    pub base_type: Option<TypeReference>,
    /// Directly implemented interfaces
    pub interfaces: Vec<TypeReference>,
    /// Declared fields
    pub fields: Vec<FieldDefinitionRc>,
    /// Declared methods
    pub methods: Vec<MethodDefinitionRc>,
    /// Tokens of directly nested types
    pub nested_types: Vec<Token>,
    /// Enclosing type, for nested types
    pub declaring_type: Option<Token>,
    /// Type-level generic parameters
    pub generic_parameters: Vec<GenericParameter>,
    /// Kind attributes
    pub flags: TypeFlags,
    /// Accessibility
    pub visibility: Visibility,
    /// Custom attributes, verbatim
    pub attributes: Vec<CustomAttribute>,
    /// Name of the assembly (or archive) the type was loaded from
    pub scope: String,
}

impl TypeCore {
    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// A type defined in CIL metadata.
#[derive(Debug, Clone)]
pub struct NativeTypeDef {
    /// Shared data
    pub core: TypeCore,
    /// JVM class this type wraps, when it is a bridge to a foreign class
    pub java_import: Option<String>,
}

/// A type defined in a JVM class file.
#[derive(Debug, Clone)]
pub struct ForeignTypeDef {
    /// Shared data
    pub core: TypeCore,
    /// Slash-separated JVM class name, e.g. `java/util/List`
    pub class_name: String,
}

/// A type created by the compiler (delegates, closures, enum helpers).
#[derive(Debug, Clone)]
pub struct SyntheticTypeDef {
    /// Shared data
    pub core: TypeCore,
    /// The definition this type was generated for
    pub generated_for: Option<Token>,
}

/// A type definition from any source representation.
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    /// Defined in CIL metadata
    Native(NativeTypeDef),
    /// Defined in a JVM class file
    Foreign(ForeignTypeDef),
    /// Generated by the compiler
    Synthetic(SyntheticTypeDef),
}

impl TypeDefinition {
    /// The shared data of this definition.
    #[must_use]
    pub fn core(&self) -> &TypeCore {
        match self {
            TypeDefinition::Native(def) => &def.core,
            TypeDefinition::Foreign(def) => &def.core,
            TypeDefinition::Synthetic(def) => &def.core,
        }
    }

    /// Which source representation this came from.
    #[must_use]
    pub fn origin(&self) -> TypeOrigin {
        match self {
            TypeDefinition::Native(_) => TypeOrigin::Native,
            TypeDefinition::Foreign(_) => TypeOrigin::Foreign,
            TypeDefinition::Synthetic(_) => TypeOrigin::Synthetic,
        }
    }

    /// Identity within the module.
    #[must_use]
    pub fn token(&self) -> Token {
        self.core().token
    }

    /// Simple name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core().name
    }

    /// Namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.core().namespace
    }

    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.core().full_name()
    }

    /// Base class, if any.
    #[must_use]
    pub fn base_type(&self) -> Option<&TypeReference> {
        self.core().base_type.as_ref()
    }

    /// Directly implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeReference] {
        &self.core().interfaces
    }

    /// Declared fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinitionRc] {
        &self.core().fields
    }

    /// Declared methods.
    #[must_use]
    pub fn methods(&self) -> &[MethodDefinitionRc] {
        &self.core().methods
    }

    /// Tokens of directly nested types.
    #[must_use]
    pub fn nested_types(&self) -> &[Token] {
        &self.core().nested_types
    }

    /// Enclosing type, for nested types.
    #[must_use]
    pub fn declaring_type(&self) -> Option<Token> {
        self.core().declaring_type
    }

    /// Type-level generic parameters.
    #[must_use]
    pub fn generic_parameters(&self) -> &[GenericParameter] {
        &self.core().generic_parameters
    }

    /// Kind attributes.
    #[must_use]
    pub fn flags(&self) -> TypeFlags {
        self.core().flags
    }

    /// True for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags().contains(TypeFlags::INTERFACE)
    }

    /// True for enumerations.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.flags().contains(TypeFlags::ENUM)
    }

    /// True for value types other than enums.
    #[must_use]
    pub fn is_struct(&self) -> bool {
        self.flags().contains(TypeFlags::VALUE_TYPE) && !self.is_enum()
    }

    /// True for abstract classes and interfaces.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags()
            .intersects(TypeFlags::ABSTRACT | TypeFlags::INTERFACE)
    }

    /// True for sealed types. Value types are always sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags()
            .intersects(TypeFlags::SEALED | TypeFlags::VALUE_TYPE | TypeFlags::ENUM)
    }

    /// True for types marked serializable.
    #[must_use]
    pub fn is_serializable(&self) -> bool {
        self.flags().contains(TypeFlags::SERIALIZABLE)
    }

    /// Accessibility.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.core().visibility
    }

    /// Custom attributes.
    #[must_use]
    pub fn attributes(&self) -> &[CustomAttribute] {
        &self.core().attributes
    }

    /// Name of the assembly or archive the type came from.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.core().scope
    }

    /// JVM class name for foreign types.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDefinition::Foreign(def) => Some(&def.class_name),
            _ => None,
        }
    }

    /// JVM class a native wrapper imports.
    #[must_use]
    pub fn java_import(&self) -> Option<&str> {
        match self {
            TypeDefinition::Native(def) => def.java_import.as_deref(),
            _ => None,
        }
    }

    /// Exact binding key, unique per module.
    #[must_use]
    pub fn scope_id(&self) -> String {
        match self {
            TypeDefinition::Native(def) => format!("[{}]{}", def.core.scope, def.core.full_name()),
            TypeDefinition::Foreign(def) => def.class_name.clone(),
            TypeDefinition::Synthetic(def) => format!("<synthetic>{}", def.core.full_name()),
        }
    }

    /// A reference bound to this definition through its scope id.
    #[must_use]
    pub fn reference(&self) -> TypeReference {
        let mut reference = TypeReference::named(self.namespace(), self.name(), self.origin())
            .with_scope_id(self.scope_id());
        if self.flags().intersects(TypeFlags::VALUE_TYPE | TypeFlags::ENUM) {
            reference = reference.as_value_type();
        }
        reference.with_usage(TypeUsage::Reference)
    }

    /// First method with the given name.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodDefinitionRc> {
        self.methods().iter().find(|m| m.name == name)
    }

    /// Field with the given name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&FieldDefinitionRc> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(namespace: &str, name: &str, flags: TypeFlags) -> TypeCore {
        TypeCore {
            token: Token::from_parts(crate::model::TYPE_TABLE, 1),
            namespace: namespace.to_string(),
            name: name.to_string(),
            base_type: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested_types: Vec::new(),
            declaring_type: None,
            generic_parameters: Vec::new(),
            flags,
            visibility: Visibility::Public,
            attributes: Vec::new(),
            scope: "App".to_string(),
        }
    }

    #[test]
    fn test_scope_ids() {
        let native = TypeDefinition::Native(NativeTypeDef {
            core: core("App", "Foo", TypeFlags::empty()),
            java_import: None,
        });
        let foreign = TypeDefinition::Foreign(ForeignTypeDef {
            core: core("java.util", "List", TypeFlags::INTERFACE),
            class_name: "java/util/List".to_string(),
        });
        let synthetic = TypeDefinition::Synthetic(SyntheticTypeDef {
            core: core("App", "<>Closure", TypeFlags::SEALED),
            generated_for: None,
        });

        assert_eq!(native.scope_id(), "[App]App.Foo");
        assert_eq!(foreign.scope_id(), "java/util/List");
        assert_eq!(synthetic.scope_id(), "<synthetic>App.<>Closure");
        assert_eq!(foreign.class_name(), Some("java/util/List"));
        assert!(native.class_name().is_none());
    }

    #[test]
    fn test_capability_flags() {
        let iface = TypeDefinition::Native(NativeTypeDef {
            core: core("App", "IRun", TypeFlags::INTERFACE),
            java_import: None,
        });
        assert!(iface.is_interface());
        assert!(iface.is_abstract());
        assert!(!iface.is_sealed());

        let value = TypeDefinition::Native(NativeTypeDef {
            core: core("App", "Point", TypeFlags::VALUE_TYPE),
            java_import: None,
        });
        assert!(value.is_struct());
        assert!(value.is_sealed());
        assert!(value.reference().is_value_type());

        let color = TypeDefinition::Native(NativeTypeDef {
            core: core("App", "Color", TypeFlags::ENUM | TypeFlags::VALUE_TYPE),
            java_import: None,
        });
        assert!(color.is_enum());
        assert!(!color.is_struct());
    }

    #[test]
    fn test_reference_binds_scope_id() {
        let def = TypeDefinition::Native(NativeTypeDef {
            core: core("App", "Foo", TypeFlags::empty()),
            java_import: None,
        });
        let reference = def.reference();
        assert_eq!(reference.full_name(), "App.Foo");
        assert_eq!(
            reference.as_named().and_then(|n| n.scope_id.as_deref()),
            Some("[App]App.Foo")
        );
    }
}
