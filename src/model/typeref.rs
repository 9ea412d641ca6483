//! Type references of the unified model.
//!
//! A [`TypeReference`] names a type without binding it. Named references carry the origin of
//! the source they came from and an optional scope id used for exact binding; composite
//! references (arrays, byrefs, generic instances) wrap other references. Binding to a
//! definition happens through [`crate::model::Module::resolve`].
//!
//! Each reference remembers the [`TypeUsage`] it was created for. The usage is fixed at
//! construction, since conversion policy depends on where a type appears and not just on what
//! it is.
//!
//! # Equality
//!
//! The `PartialEq` implementation is the unresolved form of equality: named references compare
//! by full name, composites compare structurally and the usage is ignored. Use
//! [`crate::model::Module::is_same`] when definitions are available.

use std::fmt;

use crate::model::{GenericParameter, PrimitiveKind};

/// Namespace of ``System.Nullable`1``
pub const NULLABLE_NAMESPACE: &str = "System";
/// Simple name of ``System.Nullable`1``
pub const NULLABLE_NAME: &str = "Nullable`1";

/// Position in which a type reference is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeUsage {
    /// Declaring type of a member
    DeclaringType,
    /// Base class of a type
    BaseType,
    /// Method parameter
    ParameterType,
    /// Method return value
    ReturnType,
    /// Field type
    FieldType,
    /// Implemented interface
    Interface,
    /// Any other position: body operands, generic arguments, attribute arguments
    #[default]
    Reference,
}

impl TypeUsage {
    /// True for positions where the literal class identity must be kept.
    ///
    /// A type cannot extend or be declared inside a nullable wrapper, so boxed-primitive
    /// substitution is skipped for these.
    #[must_use]
    pub fn keeps_class_identity(self) -> bool {
        matches!(self, TypeUsage::DeclaringType | TypeUsage::BaseType)
    }
}

/// Which source representation a named type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOrigin {
    /// CIL metadata
    Native,
    /// JVM class file
    Foreign,
    /// Created by the compiler itself
    Synthetic,
}

impl TypeOrigin {
    /// Priority when two definitions claim the same full name; higher wins.
    #[must_use]
    pub fn lookup_priority(self) -> u8 {
        match self {
            TypeOrigin::Native => 2,
            TypeOrigin::Synthetic => 1,
            TypeOrigin::Foreign => 0,
        }
    }
}

impl fmt::Display for TypeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeOrigin::Native => write!(f, "native"),
            TypeOrigin::Foreign => write!(f, "foreign"),
            TypeOrigin::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// A reference to a class, interface or value type by name.
#[derive(Debug, Clone)]
pub struct NamedType {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple name; nested types use `Outer/Inner`
    pub name: String,
    /// Source representation
    pub origin: TypeOrigin,
    /// Exact binding key, when the source knows it (e.g. the JVM class name)
    pub scope_id: Option<String>,
    /// True for value types
    pub is_value_type: bool,
}

impl NamedType {
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

/// The shape of a type reference.
#[derive(Debug, Clone)]
pub enum TypeRefKind {
    /// One of the module-owned primitive singletons
    Primitive(PrimitiveKind),
    /// Class, interface or value type by name
    Named(NamedType),
    /// Single or multi-dimensional array
    Array {
        /// Element type
        element: Box<TypeReference>,
        /// Number of dimensions, at least 1
        rank: u32,
    },
    /// Managed pointer (`ref T`)
    ByRef(Box<TypeReference>),
    /// Closed or partially closed generic type
    GenericInstance {
        /// The open generic type
        element: Box<TypeReference>,
        /// Generic arguments in declaration order
        arguments: Vec<TypeReference>,
    },
    /// Generic parameter of a type or method
    GenericParameter(GenericParameter),
}

/// A reference to a type, together with the position it is used in.
#[derive(Debug, Clone)]
pub struct TypeReference {
    kind: TypeRefKind,
    usage: TypeUsage,
}

impl TypeReference {
    /// Creates a reference of the given shape for [`TypeUsage::Reference`].
    #[must_use]
    pub fn new(kind: TypeRefKind) -> Self {
        TypeReference {
            kind,
            usage: TypeUsage::Reference,
        }
    }

    /// Primitive reference. Prefer [`crate::model::Module::primitive`] inside a run.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(TypeRefKind::Primitive(kind))
    }

    /// Named reference without scope id.
    pub fn named(namespace: impl Into<String>, name: impl Into<String>, origin: TypeOrigin) -> Self {
        Self::new(TypeRefKind::Named(NamedType {
            namespace: namespace.into(),
            name: name.into(),
            origin,
            scope_id: None,
            is_value_type: false,
        }))
    }

    /// Named reference to a JVM class, e.g. `java/lang/String`.
    ///
    /// The slash-separated package becomes the dotted namespace and the class name itself is
    /// kept as the scope id.
    pub fn foreign_class(class_name: &str) -> Self {
        let (namespace, name) = match class_name.rfind('/') {
            Some(pos) => (class_name[..pos].replace('/', "."), &class_name[pos + 1..]),
            None => (String::new(), class_name),
        };
        Self::new(TypeRefKind::Named(NamedType {
            namespace,
            name: name.to_string(),
            origin: TypeOrigin::Foreign,
            scope_id: Some(class_name.to_string()),
            is_value_type: false,
        }))
    }

    /// Array of `element`.
    #[must_use]
    pub fn array(element: TypeReference, rank: u32) -> Self {
        Self::new(TypeRefKind::Array {
            element: Box::new(element),
            rank: rank.max(1),
        })
    }

    /// Managed pointer to `element`.
    #[must_use]
    pub fn by_ref(element: TypeReference) -> Self {
        Self::new(TypeRefKind::ByRef(Box::new(element)))
    }

    /// Generic instance of `element` over `arguments`.
    #[must_use]
    pub fn generic_instance(element: TypeReference, arguments: Vec<TypeReference>) -> Self {
        Self::new(TypeRefKind::GenericInstance {
            element: Box::new(element),
            arguments,
        })
    }

    /// Generic parameter reference.
    #[must_use]
    pub fn generic_parameter(parameter: GenericParameter) -> Self {
        Self::new(TypeRefKind::GenericParameter(parameter))
    }

    /// ``System.Nullable`1`` over `argument`.
    #[must_use]
    pub fn nullable(argument: TypeReference) -> Self {
        let mut nullable = Self::named(NULLABLE_NAMESPACE, NULLABLE_NAME, TypeOrigin::Native);
        if let TypeRefKind::Named(named) = &mut nullable.kind {
            named.is_value_type = true;
        }
        Self::generic_instance(nullable, vec![argument])
    }

    /// Returns this reference re-tagged for `usage`.
    ///
    /// Used while a reference is being built; once handed to the model the usage is not
    /// changed again.
    #[must_use]
    pub fn with_usage(mut self, usage: TypeUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Sets the exact binding key of a named reference. Other shapes are returned unchanged.
    #[must_use]
    pub fn with_scope_id(mut self, scope_id: impl Into<String>) -> Self {
        if let TypeRefKind::Named(named) = &mut self.kind {
            named.scope_id = Some(scope_id.into());
        }
        self
    }

    /// Marks a named reference as value type.
    #[must_use]
    pub fn as_value_type(mut self) -> Self {
        if let TypeRefKind::Named(named) = &mut self.kind {
            named.is_value_type = true;
        }
        self
    }

    /// The shape of this reference.
    #[must_use]
    pub fn kind(&self) -> &TypeRefKind {
        &self.kind
    }

    /// The position this reference was created for.
    #[must_use]
    pub fn usage(&self) -> TypeUsage {
        self.usage
    }

    /// The named part, if this is a named reference.
    #[must_use]
    pub fn as_named(&self) -> Option<&NamedType> {
        match &self.kind {
            TypeRefKind::Named(named) => Some(named),
            _ => None,
        }
    }

    /// The primitive kind, if this is a primitive reference.
    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.kind {
            TypeRefKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// True for `System.Void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.as_primitive() == Some(PrimitiveKind::Void)
    }

    /// True for value types: primitives other than void, and named value types.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match &self.kind {
            TypeRefKind::Primitive(kind) => *kind != PrimitiveKind::Void,
            TypeRefKind::Named(named) => named.is_value_type,
            TypeRefKind::GenericInstance { element, .. } => element.is_value_type(),
            _ => false,
        }
    }

    /// Innermost element type: strips arrays, byrefs and generic instantiation.
    #[must_use]
    pub fn element_type(&self) -> &TypeReference {
        match &self.kind {
            TypeRefKind::Array { element, .. }
            | TypeRefKind::ByRef(element)
            | TypeRefKind::GenericInstance { element, .. } => element.element_type(),
            _ => self,
        }
    }

    /// Generic arguments of a generic instance, empty otherwise.
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeReference] {
        match &self.kind {
            TypeRefKind::GenericInstance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// True for ``System.Nullable`1`` instances.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match &self.kind {
            TypeRefKind::GenericInstance { element, .. } => element.as_named().is_some_and(|n| {
                n.namespace == NULLABLE_NAMESPACE && n.name == NULLABLE_NAME
            }),
            _ => false,
        }
    }

    /// The wrapped primitive of a nullable-wrapped primitive.
    #[must_use]
    pub fn nullable_primitive(&self) -> Option<PrimitiveKind> {
        if !self.is_nullable() {
            return None;
        }
        self.generic_arguments().first().and_then(TypeReference::as_primitive)
    }

    /// Namespace of the innermost element, empty for non-named shapes.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match &self.element_type().kind {
            TypeRefKind::Named(named) => &named.namespace,
            TypeRefKind::Primitive(_) => crate::model::primitives::SYSTEM_NAMESPACE,
            _ => "",
        }
    }

    /// Full name in CIL notation, e.g. ``System.Nullable`1<System.Int32>`` or `Foo[]`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.kind {
            TypeRefKind::Primitive(kind) => kind.full_name(),
            TypeRefKind::Named(named) => named.full_name(),
            TypeRefKind::Array { element, rank } => {
                let commas = ",".repeat((*rank as usize).saturating_sub(1));
                format!("{}[{commas}]", element.full_name())
            }
            TypeRefKind::ByRef(element) => format!("{}&", element.full_name()),
            TypeRefKind::GenericInstance { element, arguments } => {
                let args = arguments
                    .iter()
                    .map(TypeReference::full_name)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{}<{args}>", element.full_name())
            }
            TypeRefKind::GenericParameter(param) => param.to_string(),
        }
    }

    /// Structural comparison with a pluggable comparison for named leaves.
    ///
    /// `ignore_sign` folds unsigned primitives onto signed ones before comparing.
    pub(crate) fn is_same_with<F>(&self, other: &TypeReference, ignore_sign: bool, named_eq: &F) -> bool
    where
        F: Fn(&TypeReference, &TypeReference) -> bool,
    {
        match (&self.kind, &other.kind) {
            (TypeRefKind::Primitive(a), TypeRefKind::Primitive(b)) => {
                if ignore_sign {
                    a.signed() == b.signed()
                } else {
                    a == b
                }
            }
            (TypeRefKind::Named(_), TypeRefKind::Named(_)) => named_eq(self, other),
            // A named reference to e.g. System.Int32 is the same type as the primitive
            (TypeRefKind::Named(named), TypeRefKind::Primitive(kind))
            | (TypeRefKind::Primitive(kind), TypeRefKind::Named(named)) => {
                PrimitiveKind::from_full_name(&named.full_name()).is_some_and(|named_kind| {
                    if ignore_sign {
                        named_kind.signed() == kind.signed()
                    } else {
                        named_kind == *kind
                    }
                })
            }
            (
                TypeRefKind::Array {
                    element: a,
                    rank: ra,
                },
                TypeRefKind::Array {
                    element: b,
                    rank: rb,
                },
            ) => ra == rb && a.is_same_with(b, ignore_sign, named_eq),
            (TypeRefKind::ByRef(a), TypeRefKind::ByRef(b)) => {
                a.is_same_with(b, ignore_sign, named_eq)
            }
            (
                TypeRefKind::GenericInstance {
                    element: ea,
                    arguments: aa,
                },
                TypeRefKind::GenericInstance {
                    element: eb,
                    arguments: ab,
                },
            ) => {
                aa.len() == ab.len()
                    && ea.is_same_with(eb, ignore_sign, named_eq)
                    && aa
                        .iter()
                        .zip(ab)
                        .all(|(a, b)| a.is_same_with(b, ignore_sign, named_eq))
            }
            (TypeRefKind::GenericParameter(a), TypeRefKind::GenericParameter(b)) => a.is_same(b),
            _ => false,
        }
    }

    /// Unresolved equality with signedness folding.
    #[must_use]
    pub fn is_same_ignore_sign(&self, other: &TypeReference) -> bool {
        self.is_same_with(other, true, &|a: &TypeReference, b: &TypeReference| a.full_name() == b.full_name())
    }
}

impl PartialEq for TypeReference {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_with(other, false, &|a: &TypeReference, b: &TypeReference| a.full_name() == b.full_name())
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
