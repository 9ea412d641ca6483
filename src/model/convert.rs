//! Conversion of adapter-level raw types into [`TypeReference`]s.
//!
//! Source adapters describe types in their own terms: CIL signatures become [`NativeType`],
//! JVM descriptors become [`ForeignType`]. [`Module::as_type_reference`] maps either into the
//! unified model, applying the usage-dependent boxed-primitive policy on the way.
//!
//! # Boxed primitives
//!
//! A JVM boxed primitive (`java/lang/Integer` and friends) used as a field, parameter or
//! return type is a nullable value on the CIL side, so it becomes ``System.Nullable`1`` over
//! the primitive. As a base or declaring type it keeps its class identity.
//!
//! # Examples
//!
//! ```rust
//! use dotdex::model::{ForeignType, Module, PrimitiveKind, TypeUsage};
//!
//! let module = Module::new();
//! let integer = ForeignType::parse("Ljava/lang/Integer;")?;
//!
//! let field = module.as_type_reference(&integer.clone().into(), TypeUsage::FieldType)?;
//! assert_eq!(field.nullable_primitive(), Some(PrimitiveKind::Int32));
//!
//! let base = module.as_type_reference(&integer.into(), TypeUsage::BaseType)?;
//! assert_eq!(base.full_name(), "java.lang.Integer");
//! # Ok::<(), dotdex::Error>(())
//! ```

use crate::{
    model::{GenericParameter, Module, PrimitiveKind, TypeOrigin, TypeReference, TypeUsage},
    Error, Result,
};

/// A JVM field-descriptor or signature type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignType {
    /// Base type descriptor character (`Z`, `B`, `C`, `S`, `I`, `J`, `F`, `D`, `V`)
    Base(char),
    /// Class type by slash-separated name
    Object(String),
    /// One-dimensional array
    Array(Box<ForeignType>),
    /// Generic type variable from a signature attribute, e.g. `TT;`
    TypeVariable(String),
}

impl ForeignType {
    /// Parses a complete field descriptor.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for malformed descriptors or trailing input.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let (parsed, rest) = Self::parse_prefix(descriptor)?;
        if !rest.is_empty() {
            return Err(Error::NotSupported(format!(
                "trailing input '{rest}' in descriptor '{descriptor}'"
            )));
        }
        Ok(parsed)
    }

    /// Parses a method descriptor into parameter types and return type.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for malformed descriptors.
    pub fn parse_method(descriptor: &str) -> Result<(Vec<ForeignType>, ForeignType)> {
        let Some(mut rest) = descriptor.strip_prefix('(') else {
            return Err(Error::NotSupported(format!(
                "method descriptor '{descriptor}' does not start with '('"
            )));
        };

        let mut parameters = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (parameter, after) = Self::parse_prefix(rest)?;
            parameters.push(parameter);
            rest = after;
        }

        Ok((parameters, Self::parse(rest)?))
    }

    fn parse_prefix(input: &str) -> Result<(Self, &str)> {
        let mut chars = input.chars();
        match chars.next() {
            Some(c @ ('Z' | 'B' | 'C' | 'S' | 'I' | 'J' | 'F' | 'D' | 'V')) => {
                Ok((ForeignType::Base(c), chars.as_str()))
            }
            Some('[') => {
                let (element, rest) = Self::parse_prefix(chars.as_str())?;
                Ok((ForeignType::Array(Box::new(element)), rest))
            }
            Some(kind @ ('L' | 'T')) => {
                let body = chars.as_str();
                let Some(end) = body.find(';') else {
                    return Err(Error::NotSupported(format!("unterminated class in '{input}'")));
                };
                // Generic arguments of a class signature are dropped, the raw class remains
                let name = match body[..end].find('<') {
                    Some(generic) => &body[..generic],
                    None => &body[..end],
                };
                let rest = match body[..end].find('<') {
                    Some(_) => Self::skip_generic_suffix(body)?,
                    None => &body[end + 1..],
                };
                let parsed = if kind == 'L' {
                    ForeignType::Object(name.to_string())
                } else {
                    ForeignType::TypeVariable(name.to_string())
                };
                Ok((parsed, rest))
            }
            Some(other) => Err(Error::NotSupported(format!(
                "unknown descriptor character '{other}' in '{input}'"
            ))),
            None => Err(Error::NotSupported("empty descriptor".to_string())),
        }
    }

    /// Skips `Name<...>;` and returns what follows the closing `;`.
    fn skip_generic_suffix(body: &str) -> Result<&str> {
        let mut depth = 0usize;
        for (index, c) in body.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => return Ok(&body[index + 1..]),
                _ => {}
            }
        }
        Err(Error::NotSupported(format!("unterminated signature '{body}'")))
    }

    /// The descriptor string of this type.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            ForeignType::Base(c) => c.to_string(),
            ForeignType::Object(name) => format!("L{name};"),
            ForeignType::Array(element) => format!("[{}", element.descriptor()),
            ForeignType::TypeVariable(name) => format!("T{name};"),
        }
    }
}

/// A CIL signature type, as reported by the native adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeType {
    /// Built-in primitive
    Primitive(PrimitiveKind),
    /// Class, interface or value type
    Class {
        /// Namespace
        namespace: String,
        /// Simple name; nested types use `Outer/Inner`
        name: String,
        /// True for value types
        is_value_type: bool,
        /// Exact binding key, when the adapter knows the defining assembly
        scope_id: Option<String>,
    },
    /// Array with rank
    Array(Box<NativeType>, u32),
    /// Managed pointer
    ByRef(Box<NativeType>),
    /// Generic instantiation
    GenericInstance(Box<NativeType>, Vec<NativeType>),
    /// Generic parameter
    GenericParam(GenericParameter),
}

impl NativeType {
    /// Class type without binding key.
    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        NativeType::Class {
            namespace: namespace.into(),
            name: name.into(),
            is_value_type: false,
            scope_id: None,
        }
    }
}

/// A raw type from either adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    /// CIL signature type
    Native(NativeType),
    /// JVM descriptor type
    Foreign(ForeignType),
}

impl From<NativeType> for RawType {
    fn from(value: NativeType) -> Self {
        RawType::Native(value)
    }
}

impl From<ForeignType> for RawType {
    fn from(value: ForeignType) -> Self {
        RawType::Foreign(value)
    }
}

impl Module {
    /// Converts an adapter type into a unified reference used in position `usage`.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for JVM type variables and unknown base descriptors.
    pub fn as_type_reference(&self, raw: &RawType, usage: TypeUsage) -> Result<TypeReference> {
        let converted = match raw {
            RawType::Native(native) => self.native_reference(native, usage)?,
            RawType::Foreign(foreign) => self.foreign_reference(foreign, usage)?,
        };
        Ok(converted.with_usage(usage))
    }

    fn foreign_reference(&self, raw: &ForeignType, usage: TypeUsage) -> Result<TypeReference> {
        match raw {
            ForeignType::Base(c) => PrimitiveKind::from_descriptor(*c)
                .map(|kind| self.primitive(kind).clone())
                .ok_or_else(|| Error::NotSupported(format!("base descriptor '{c}'"))),
            ForeignType::Object(class_name) => {
                if !usage.keeps_class_identity() {
                    if let Some(kind) = PrimitiveKind::from_boxed_class(class_name) {
                        return Ok(TypeReference::nullable(self.primitive(kind).clone()));
                    }
                }
                Ok(TypeReference::foreign_class(class_name))
            }
            ForeignType::Array(element) => Ok(TypeReference::array(
                self.foreign_reference(element, usage)?,
                1,
            )),
            ForeignType::TypeVariable(name) => Err(Error::NotSupported(format!(
                "JVM type variable '{name}' has no unified counterpart"
            ))),
        }
    }

    fn native_reference(&self, raw: &NativeType, usage: TypeUsage) -> Result<TypeReference> {
        Ok(match raw {
            NativeType::Primitive(kind) => self.primitive(*kind).clone(),
            NativeType::Class {
                namespace,
                name,
                is_value_type,
                scope_id,
            } => {
                let mut reference =
                    TypeReference::named(namespace.as_str(), name.as_str(), TypeOrigin::Native);
                if let Some(scope_id) = scope_id {
                    reference = reference.with_scope_id(scope_id.as_str());
                }
                if *is_value_type {
                    reference = reference.as_value_type();
                }
                reference
            }
            NativeType::Array(element, rank) => {
                TypeReference::array(self.native_reference(element, usage)?, *rank)
            }
            NativeType::ByRef(element) => {
                TypeReference::by_ref(self.native_reference(element, usage)?)
            }
            NativeType::GenericInstance(element, arguments) => {
                let element = self.native_reference(element, usage)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.native_reference(argument, TypeUsage::Reference))
                    .collect::<Result<Vec<_>>>()?;
                TypeReference::generic_instance(element, arguments)
            }
            NativeType::GenericParam(parameter) => {
                TypeReference::generic_parameter(parameter.clone())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenericOwner, TypeRefKind};

    #[test]
    fn test_parse_field_descriptors() {
        assert_eq!(ForeignType::parse("I").unwrap(), ForeignType::Base('I'));
        assert_eq!(
            ForeignType::parse("[[Ljava/lang/String;").unwrap(),
            ForeignType::Array(Box::new(ForeignType::Array(Box::new(ForeignType::Object(
                "java/lang/String".into()
            )))))
        );
        assert_eq!(
            ForeignType::parse("TT;").unwrap(),
            ForeignType::TypeVariable("T".into())
        );
        assert_eq!(
            ForeignType::parse("Ljava/util/List<Ljava/lang/String;>;").unwrap(),
            ForeignType::Object("java/util/List".into())
        );
        assert!(ForeignType::parse("Q").is_err());
        assert!(ForeignType::parse("Ljava/lang/String").is_err());
        assert!(ForeignType::parse("II").is_err());
    }

    #[test]
    fn test_parse_method_descriptor() {
        let (params, ret) = ForeignType::parse_method("(I[JLjava/lang/Object;)V").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], ForeignType::Base('I'));
        assert_eq!(params[1], ForeignType::Array(Box::new(ForeignType::Base('J'))));
        assert_eq!(params[2].descriptor(), "Ljava/lang/Object;");
        assert_eq!(ret, ForeignType::Base('V'));
        assert!(ForeignType::parse_method("I)V").is_err());
    }

    #[test]
    fn test_descriptor_primitives() {
        let module = Module::new();
        for (descriptor, kind) in [
            ('Z', PrimitiveKind::Boolean),
            ('B', PrimitiveKind::SByte),
            ('C', PrimitiveKind::Char),
            ('S', PrimitiveKind::Int16),
            ('I', PrimitiveKind::Int32),
            ('J', PrimitiveKind::Int64),
            ('F', PrimitiveKind::Single),
            ('D', PrimitiveKind::Double),
            ('V', PrimitiveKind::Void),
        ] {
            let converted = module
                .as_type_reference(&ForeignType::Base(descriptor).into(), TypeUsage::FieldType)
                .unwrap();
            assert_eq!(converted.as_primitive(), Some(kind));
        }
    }

    #[test]
    fn test_boxed_substitution_by_usage() {
        let module = Module::new();
        let integer: RawType = ForeignType::Object("java/lang/Integer".into()).into();

        for usage in [TypeUsage::FieldType, TypeUsage::ParameterType, TypeUsage::ReturnType] {
            let converted = module.as_type_reference(&integer, usage).unwrap();
            assert_eq!(converted.nullable_primitive(), Some(PrimitiveKind::Int32));
            assert_eq!(converted.usage(), usage);
        }

        for usage in [TypeUsage::BaseType, TypeUsage::DeclaringType] {
            let converted = module.as_type_reference(&integer, usage).unwrap();
            assert!(!converted.is_nullable());
            let named = converted.as_named().unwrap();
            assert_eq!(named.scope_id.as_deref(), Some("java/lang/Integer"));
            assert_eq!(named.origin, TypeOrigin::Foreign);
        }

        let byte: RawType = ForeignType::Object("java/lang/Byte".into()).into();
        let converted = module.as_type_reference(&byte, TypeUsage::FieldType).unwrap();
        assert_eq!(converted.nullable_primitive(), Some(PrimitiveKind::Byte));
    }

    #[test]
    fn test_type_variable_not_supported() {
        let module = Module::new();
        let raw: RawType = ForeignType::TypeVariable("T".into()).into();
        assert!(matches!(
            module.as_type_reference(&raw, TypeUsage::FieldType),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_native_composites() {
        let module = Module::new();
        let raw: RawType = NativeType::GenericInstance(
            Box::new(NativeType::class("System.Collections.Generic", "List`1")),
            vec![NativeType::Array(
                Box::new(NativeType::Primitive(PrimitiveKind::Int32)),
                1,
            )],
        )
        .into();
        let converted = module.as_type_reference(&raw, TypeUsage::ParameterType).unwrap();
        assert_eq!(
            converted.full_name(),
            "System.Collections.Generic.List`1<System.Int32[]>"
        );

        let param: RawType =
            NativeType::ByRef(Box::new(NativeType::GenericParam(GenericParameter::new(
                GenericOwner::Method,
                0,
                "T",
            ))))
            .into();
        let converted = module.as_type_reference(&param, TypeUsage::ParameterType).unwrap();
        assert!(matches!(converted.kind(), TypeRefKind::ByRef(_)));
    }
}
