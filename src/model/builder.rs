//! Builders that register definitions in a [`Module`].
//!
//! Source adapters (and tests) describe a type with a [`TypeBuilder`], attach
//! [`MethodBuilder`]s and [`FieldBuilder`]s, and call [`TypeBuilder::register`]. Registration
//! assigns tokens, wires declaring-type links and nested types, and indexes the result.
//!
//! # Examples
//!
//! ```rust
//! use dotdex::model::{
//!     MethodBuilder, MethodFlags, Module, PrimitiveKind, TypeBuilder, TypeReference,
//! };
//!
//! let module = Module::new();
//! let foo = TypeBuilder::native("App", "App", "Foo")
//!     .with_method(MethodBuilder::new("Run").with_flags(MethodFlags::VIRTUAL))
//!     .with_method(
//!         MethodBuilder::new("Add")
//!             .with_parameter("x", TypeReference::primitive(PrimitiveKind::Int32))
//!             .returns(TypeReference::primitive(PrimitiveKind::Int32)),
//!     )
//!     .register(&module)?;
//!
//! assert_eq!(foo.methods().len(), 2);
//! assert!(module.find("App.Foo").is_some());
//! # Ok::<(), dotdex::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    model::{
        CustomAttribute, FieldDefinition, FieldFlags, FieldReference, ForeignType,
        ForeignTypeDef, GenericParameter, MemberReference, MethodDefinition, MethodFlags,
        MethodReference, Module, NativeTypeDef, Parameter, PrimitiveKind, SyntheticTypeDef,
        Token, TypeCore, TypeDefinition, TypeDefinitionRc, TypeFlags, TypeOrigin, TypeReference,
        TypeUsage, Visibility, FIELD_TABLE, METHOD_TABLE, TYPE_TABLE,
    },
    Error, Result,
};

/// Describes a method before registration.
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    parameters: Vec<Parameter>,
    return_type: TypeReference,
    generic_parameters: Vec<GenericParameter>,
    flags: MethodFlags,
    visibility: Visibility,
    overrides: Vec<MethodReference>,
    bridge: Option<MethodReference>,
    body_references: Vec<MemberReference>,
    attributes: Vec<CustomAttribute>,
    descriptor: Option<String>,
}

impl MethodBuilder {
    /// A public instance method returning void.
    pub fn new(name: impl Into<String>) -> Self {
        MethodBuilder {
            name: name.into(),
            parameters: Vec::new(),
            return_type: TypeReference::primitive(PrimitiveKind::Void),
            generic_parameters: Vec::new(),
            flags: MethodFlags::empty(),
            visibility: Visibility::Public,
            overrides: Vec::new(),
            bridge: None,
            body_references: Vec::new(),
            attributes: Vec::new(),
            descriptor: None,
        }
    }

    /// A public instance constructor.
    #[must_use]
    pub fn constructor() -> Self {
        Self::new(".ctor").with_flags(MethodFlags::SPECIAL_NAME)
    }

    /// A type initializer.
    #[must_use]
    pub fn class_constructor() -> Self {
        Self::new(".cctor")
            .with_flags(MethodFlags::STATIC | MethodFlags::SPECIAL_NAME)
            .with_visibility(Visibility::Private)
    }

    /// A foreign method whose signature is given as a JVM method descriptor.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for malformed descriptors or signatures using type
    /// variables.
    pub fn from_descriptor(module: &Module, name: impl Into<String>, descriptor: &str) -> Result<Self> {
        let (parameters, return_type) = ForeignType::parse_method(descriptor)?;
        let mut builder = Self::new(name);
        for (index, parameter) in parameters.into_iter().enumerate() {
            let converted = module.as_type_reference(&parameter.into(), TypeUsage::ParameterType)?;
            builder.parameters.push(Parameter::new(format!("p{index}"), converted));
        }
        builder.return_type = module.as_type_reference(&return_type.into(), TypeUsage::ReturnType)?;
        builder.descriptor = Some(descriptor.to_string());
        Ok(builder)
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, parameter_type: TypeReference) -> Self {
        self.parameters.push(Parameter::new(name, parameter_type));
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, return_type: TypeReference) -> Self {
        self.return_type = return_type;
        self
    }

    /// Adds a method-level generic parameter.
    #[must_use]
    pub fn with_generic_parameter(mut self, parameter: GenericParameter) -> Self {
        self.generic_parameters.push(parameter);
        self
    }

    /// Adds dispatch flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the accessibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Records an explicit override.
    #[must_use]
    pub fn with_override(mut self, overridden: MethodReference) -> Self {
        self.overrides.push(overridden);
        self
    }

    /// Links this wrapper method to a foreign method.
    #[must_use]
    pub fn with_bridge(mut self, target: MethodReference) -> Self {
        self.bridge = Some(target);
        self
    }

    /// Records a member referenced from the method body.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<MemberReference>) -> Self {
        self.body_references.push(reference.into());
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn build(self, token: Token, declaring: Token, declaring_type: &TypeReference, origin: TypeOrigin) -> MethodDefinition {
        MethodDefinition {
            token,
            declaring,
            declaring_type: declaring_type.clone(),
            name: self.name,
            parameters: self.parameters,
            return_type: self.return_type.with_usage(TypeUsage::ReturnType),
            generic_parameters: self.generic_parameters,
            flags: self.flags,
            visibility: self.visibility,
            overrides: self.overrides,
            bridge: self.bridge,
            body_references: self.body_references,
            attributes: self.attributes,
            origin,
            descriptor: self.descriptor,
        }
    }
}

/// Describes a field before registration.
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    name: String,
    field_type: TypeReference,
    flags: FieldFlags,
    visibility: Visibility,
    bridge: Option<FieldReference>,
    attributes: Vec<CustomAttribute>,
}

impl FieldBuilder {
    /// A public instance field.
    pub fn new(name: impl Into<String>, field_type: TypeReference) -> Self {
        FieldBuilder {
            name: name.into(),
            field_type,
            flags: FieldFlags::empty(),
            visibility: Visibility::Public,
            bridge: None,
            attributes: Vec::new(),
        }
    }

    /// Adds storage flags.
    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the accessibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Links this wrapper field to a foreign field.
    #[must_use]
    pub fn with_bridge(mut self, target: FieldReference) -> Self {
        self.bridge = Some(target);
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn build(self, token: Token, declaring: Token, declaring_type: &TypeReference, origin: TypeOrigin) -> FieldDefinition {
        FieldDefinition {
            token,
            declaring,
            declaring_type: declaring_type.clone(),
            name: self.name,
            field_type: self.field_type.with_usage(TypeUsage::FieldType),
            flags: self.flags,
            visibility: self.visibility,
            bridge: self.bridge,
            attributes: self.attributes,
            origin,
        }
    }
}

#[derive(Debug, Clone)]
enum Flavor {
    Native { java_import: Option<String> },
    Foreign { class_name: String },
    Synthetic { generated_for: Option<Token> },
}

/// Describes a type before registration.
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    flavor: Flavor,
    scope: String,
    namespace: String,
    name: String,
    base_type: Option<TypeReference>,
    interfaces: Vec<TypeReference>,
    fields: Vec<FieldBuilder>,
    methods: Vec<MethodBuilder>,
    nested: Vec<TypeBuilder>,
    generic_parameters: Vec<GenericParameter>,
    flags: TypeFlags,
    visibility: Visibility,
    attributes: Vec<CustomAttribute>,
}

impl TypeBuilder {
    fn with_flavor(flavor: Flavor, scope: String, namespace: String, name: String) -> Self {
        TypeBuilder {
            flavor,
            scope,
            namespace,
            name,
            base_type: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            generic_parameters: Vec::new(),
            flags: TypeFlags::empty(),
            visibility: Visibility::Public,
            attributes: Vec::new(),
        }
    }

    /// A CIL type in assembly `scope`.
    pub fn native(scope: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_flavor(
            Flavor::Native { java_import: None },
            scope.into(),
            namespace.into(),
            name.into(),
        )
    }

    /// A JVM class, e.g. `java/util/ArrayList`.
    pub fn foreign(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let (namespace, name) = match class_name.rfind('/') {
            Some(pos) => (class_name[..pos].replace('/', "."), class_name[pos + 1..].to_string()),
            None => (String::new(), class_name.clone()),
        };
        Self::with_flavor(Flavor::Foreign { class_name }, String::new(), namespace, name)
    }

    /// A compiler-generated type.
    pub fn synthetic(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_flavor(
            Flavor::Synthetic { generated_for: None },
            String::new(),
            namespace.into(),
            name.into(),
        )
    }

    /// Origin the registered type will have.
    #[must_use]
    pub fn origin(&self) -> TypeOrigin {
        match self.flavor {
            Flavor::Native { .. } => TypeOrigin::Native,
            Flavor::Foreign { .. } => TypeOrigin::Foreign,
            Flavor::Synthetic { .. } => TypeOrigin::Synthetic,
        }
    }

    /// Namespace-qualified name the type will be registered under.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// JVM class name, for foreign builders.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match &self.flavor {
            Flavor::Foreign { class_name } => Some(class_name),
            _ => None,
        }
    }

    /// Sets the assembly or archive name.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the base class.
    #[must_use]
    pub fn with_base(mut self, base_type: TypeReference) -> Self {
        self.base_type = Some(base_type.with_usage(TypeUsage::BaseType));
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: TypeReference) -> Self {
        self.interfaces.push(interface.with_usage(TypeUsage::Interface));
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method.
    #[must_use]
    pub fn with_method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a nested type. Its namespace and scope are taken from this type.
    #[must_use]
    pub fn with_nested(mut self, nested: TypeBuilder) -> Self {
        self.nested.push(nested);
        self
    }

    /// Adds a type-level generic parameter.
    #[must_use]
    pub fn with_generic_parameter(mut self, parameter: GenericParameter) -> Self {
        self.generic_parameters.push(parameter);
        self
    }

    /// Adds kind flags.
    #[must_use]
    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Sets the accessibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Attaches a custom attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Marks a native type as wrapper of the given JVM class. Ignored for other flavors.
    #[must_use]
    pub fn with_java_import(mut self, class_name: impl Into<String>) -> Self {
        if let Flavor::Native { java_import } = &mut self.flavor {
            *java_import = Some(class_name.into());
        }
        self
    }

    /// Records what a synthetic type was generated for. Ignored for other flavors.
    #[must_use]
    pub fn generated_for(mut self, token: Token) -> Self {
        if let Flavor::Synthetic { generated_for } = &mut self.flavor {
            *generated_for = Some(token);
        }
        self
    }

    /// Registers the type, its members and its nested types in `module`.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateScopeId`] if a definition with the same scope id is already
    /// registered.
    pub fn register(self, module: &Module) -> Result<TypeDefinitionRc> {
        self.register_nested(module, None)
    }

    fn scope_id(&self) -> String {
        match &self.flavor {
            Flavor::Native { .. } => format!("[{}]{}", self.scope, self.full_name()),
            Flavor::Foreign { class_name } => class_name.clone(),
            Flavor::Synthetic { .. } => format!("<synthetic>{}", self.full_name()),
        }
    }

    fn register_nested(self, module: &Module, declaring_type: Option<Token>) -> Result<TypeDefinitionRc> {
        let scope_id = self.scope_id();
        if module.scope_id_token(&scope_id).is_some() {
            return Err(Error::DuplicateScopeId(scope_id));
        }

        let origin = self.origin();
        let token = module.next_token(TYPE_TABLE);

        let mut reference = TypeReference::named(self.namespace.as_str(), self.name.as_str(), origin)
            .with_scope_id(scope_id)
            .with_usage(TypeUsage::DeclaringType);
        if self.flags.intersects(TypeFlags::VALUE_TYPE | TypeFlags::ENUM) {
            reference = reference.as_value_type();
        }

        let mut nested_types = Vec::with_capacity(self.nested.len());
        for mut nested in self.nested {
            nested.namespace.clone_from(&self.namespace);
            nested.name = format!("{}/{}", self.name, nested.name);
            if nested.scope.is_empty() {
                nested.scope.clone_from(&self.scope);
            }
            nested_types.push(nested.register_nested(module, Some(token))?.token());
        }

        let fields = self
            .fields
            .into_iter()
            .map(|field| Arc::new(field.build(module.next_token(FIELD_TABLE), token, &reference, origin)))
            .collect();
        let methods = self
            .methods
            .into_iter()
            .map(|method| Arc::new(method.build(module.next_token(METHOD_TABLE), token, &reference, origin)))
            .collect();

        let core = TypeCore {
            token,
            namespace: self.namespace,
            name: self.name,
            base_type: self.base_type,
            interfaces: self.interfaces,
            fields,
            methods,
            nested_types,
            declaring_type,
            generic_parameters: self.generic_parameters,
            flags: self.flags,
            visibility: self.visibility,
            attributes: self.attributes,
            scope: self.scope,
        };

        let definition = match self.flavor {
            Flavor::Native { java_import } => TypeDefinition::Native(NativeTypeDef { core, java_import }),
            Flavor::Foreign { class_name } => TypeDefinition::Foreign(ForeignTypeDef { core, class_name }),
            Flavor::Synthetic { generated_for } => {
                TypeDefinition::Synthetic(SyntheticTypeDef { core, generated_for })
            }
        };

        module.register(definition)
    }
}
