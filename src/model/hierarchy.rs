//! Inheritance queries over the [`Module`].
//!
//! Every walk keeps a visited set, so cyclic input (which malformed or partially loaded
//! metadata can produce) terminates. Base-type chains are additionally capped at
//! [`Module::max_depth`].

use std::{collections::HashSet, sync::Arc};

use crate::{
    model::{MethodDefinition, MethodDefinitionRc, Module, TypeDefinition, TypeDefinitionRc},
    Error, Result,
};

impl Module {
    /// The base types of `ty`, nearest first.
    ///
    /// Unresolvable bases end the chain. A cycle ends it silently.
    ///
    /// # Errors
    /// Returns [`Error::RecursionLimit`] if the chain is longer than the configured depth.
    pub fn base_chain(&self, ty: &TypeDefinition) -> Result<Vec<TypeDefinitionRc>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([ty.token()]);
        let mut current = ty.base_type().and_then(|base| self.resolve(base));

        while let Some(base) = current {
            if !visited.insert(base.token()) {
                break;
            }
            if chain.len() >= self.max_depth() {
                return Err(Error::RecursionLimit(self.max_depth()));
            }
            current = base.base_type().and_then(|next| self.resolve(next));
            chain.push(base);
        }

        Ok(chain)
    }

    fn bases(&self, ty: &TypeDefinition) -> Vec<TypeDefinitionRc> {
        self.base_chain(ty).unwrap_or_else(|error| {
            tracing::debug!("base chain of {} truncated: {error}", ty.full_name());
            Vec::new()
        })
    }

    /// True if `base` is a (transitive) base class of `ty`.
    #[must_use]
    pub fn extends(&self, ty: &TypeDefinition, base: &TypeDefinition) -> bool {
        self.bases(ty).iter().any(|b| b.token() == base.token())
    }

    /// All interfaces `ty` implements, including those of its base types and those inherited
    /// by interfaces.
    #[must_use]
    pub fn all_interfaces(&self, ty: &TypeDefinition) -> Vec<TypeDefinitionRc> {
        let mut pending = ty.interfaces().to_vec();
        for base in self.bases(ty) {
            pending.extend(base.interfaces().iter().cloned());
        }

        let mut visited = HashSet::from([ty.token()]);
        let mut result = Vec::new();
        while let Some(reference) = pending.pop() {
            let Some(interface) = self.resolve(&reference) else {
                continue;
            };
            if !visited.insert(interface.token()) {
                continue;
            }
            pending.extend(interface.interfaces().iter().cloned());
            result.push(interface);
        }

        result
    }

    /// True if `ty` implements `interface`, directly or through bases and interface
    /// inheritance.
    #[must_use]
    pub fn implements(&self, ty: &TypeDefinition, interface: &TypeDefinition) -> bool {
        self.all_interfaces(ty)
            .iter()
            .any(|i| i.token() == interface.token())
    }

    /// Class-condition or interface-condition assignability, excluding `ty == target`.
    #[must_use]
    pub fn is_instance_of(&self, ty: &TypeDefinition, target: &TypeDefinition) -> bool {
        if target.is_interface() {
            self.implements(ty, target)
        } else {
            self.extends(ty, target)
        }
    }

    /// True if both methods have the same name, instance-ness, arity, return type and
    /// parameter types.
    #[must_use]
    pub fn is_same_except_declaring_type(&self, a: &MethodDefinition, b: &MethodDefinition) -> bool {
        a.name == b.name
            && a.is_static() == b.is_static()
            && a.parameters.len() == b.parameters.len()
            && a.generic_parameters.len() == b.generic_parameters.len()
            && self.is_same(&a.return_type, &b.return_type)
            && a
                .parameter_types()
                .zip(b.parameter_types())
                .all(|(x, y)| self.is_same(x, y))
    }

    /// Base-class methods that `method` overrides, nearest first.
    ///
    /// Explicit overrides are included. The structural walk stops at the method that
    /// introduced the vtable slot.
    #[must_use]
    pub fn base_methods(&self, method: &MethodDefinition) -> Vec<MethodDefinitionRc> {
        let mut result: Vec<MethodDefinitionRc> = method
            .overrides
            .iter()
            .filter_map(|reference| self.resolve_method(reference))
            .filter(|target| self.get(target.declaring).is_some_and(|ty| !ty.is_interface()))
            .collect();

        if method.is_virtual() && !method.is_new_slot() {
            if let Some(declaring) = self.get(method.declaring) {
                for base in self.bases(&declaring) {
                    if let Some(overridden) = base
                        .methods()
                        .iter()
                        .find(|m| m.is_virtual() && self.is_same_except_declaring_type(m, method))
                    {
                        result.push(overridden.clone());
                        if overridden.is_new_slot() {
                            break;
                        }
                    }
                }
            }
        }

        dedup_methods(result)
    }

    /// Interface methods that `method` implements, explicitly or by signature.
    #[must_use]
    pub fn base_interface_methods(&self, method: &MethodDefinition) -> Vec<MethodDefinitionRc> {
        let mut result: Vec<MethodDefinitionRc> = method
            .overrides
            .iter()
            .filter_map(|reference| self.resolve_method(reference))
            .filter(|target| self.get(target.declaring).is_some_and(|ty| ty.is_interface()))
            .collect();

        if !method.is_static() {
            if let Some(declaring) = self.get(method.declaring) {
                for interface in self.all_interfaces(&declaring) {
                    result.extend(
                        interface
                            .methods()
                            .iter()
                            .filter(|m| self.is_same_except_declaring_type(m, method))
                            .cloned(),
                    );
                }
            }
        }

        dedup_methods(result)
    }

    /// The method of `ty` (or its base chain) implementing `interface_method`.
    ///
    /// Per type, an explicit override wins over a signature match.
    #[must_use]
    pub fn find_implementation(
        &self,
        ty: &TypeDefinition,
        interface_method: &MethodDefinition,
    ) -> Option<MethodDefinitionRc> {
        self.implementation_in(ty, interface_method).or_else(|| {
            self.bases(ty)
                .iter()
                .find_map(|base| self.implementation_in(base, interface_method))
        })
    }

    fn implementation_in(
        &self,
        ty: &TypeDefinition,
        interface_method: &MethodDefinition,
    ) -> Option<MethodDefinitionRc> {
        let explicit = ty.methods().iter().find(|m| {
            m.overrides.iter().any(|reference| {
                self.resolve_method(reference)
                    .is_some_and(|target| target.token == interface_method.token)
            })
        });

        explicit
            .or_else(|| {
                ty.methods().iter().find(|m| {
                    !m.is_static()
                        && m.token != interface_method.token
                        && self.is_same_except_declaring_type(m, interface_method)
                })
            })
            .cloned()
    }

    /// The parameterless instance constructor.
    #[must_use]
    pub fn default_ctor(&self, ty: &TypeDefinition) -> Option<MethodDefinitionRc> {
        ty.methods()
            .iter()
            .find(|m| m.is_constructor() && m.parameters.is_empty())
            .cloned()
    }

    /// The type initializer.
    #[must_use]
    pub fn class_ctor(&self, ty: &TypeDefinition) -> Option<MethodDefinitionRc> {
        ty.methods().iter().find(|m| m.is_class_constructor()).cloned()
    }
}

fn dedup_methods(methods: Vec<MethodDefinitionRc>) -> Vec<MethodDefinitionRc> {
    let mut seen = HashSet::new();
    methods
        .into_iter()
        .filter(|m| seen.insert(m.token))
        .collect::<Vec<Arc<MethodDefinition>>>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            MethodBuilder, MethodFlags, MethodReference, TypeBuilder, TypeFlags, TypeOrigin,
            TypeReference,
        },
        test::{int, void},
    };

    #[test]
    fn test_extends_and_implements() {
        let module = Module::new();
        let base_iface = TypeBuilder::native("App", "App", "IBase")
            .with_flags(TypeFlags::INTERFACE)
            .register(&module)
            .unwrap();
        let iface = TypeBuilder::native("App", "App", "IRun")
            .with_flags(TypeFlags::INTERFACE)
            .with_interface(base_iface.reference())
            .register(&module)
            .unwrap();
        let base = TypeBuilder::native("App", "App", "Base")
            .with_interface(iface.reference())
            .register(&module)
            .unwrap();
        let derived = TypeBuilder::native("App", "App", "Derived")
            .with_base(base.reference())
            .register(&module)
            .unwrap();

        assert!(module.extends(&derived, &base));
        assert!(!module.extends(&base, &derived));
        assert!(!module.extends(&base, &base));
        assert!(module.implements(&derived, &iface));
        assert!(module.implements(&derived, &base_iface));
        assert!(module.is_instance_of(&derived, &iface));
        assert!(module.is_instance_of(&derived, &base));
    }

    #[test]
    fn test_cyclic_bases_terminate() {
        let module = Module::new();
        let a = TypeBuilder::native("App", "App", "A")
            .with_base(TypeReference::named("App", "B", TypeOrigin::Native))
            .register(&module)
            .unwrap();
        TypeBuilder::native("App", "App", "B")
            .with_base(TypeReference::named("App", "A", TypeOrigin::Native))
            .register(&module)
            .unwrap();

        let chain = module.base_chain(&a).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(module.all_interfaces(&a).is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let module = Module::new().with_max_depth(2);
        let mut previous: Option<TypeReference> = None;
        let mut last = None;
        for index in 0..5 {
            let mut builder = TypeBuilder::native("App", "App", format!("T{index}"));
            if let Some(base) = previous.take() {
                builder = builder.with_base(base);
            }
            let registered = builder.register(&module).unwrap();
            previous = Some(registered.reference());
            last = Some(registered);
        }

        let last = last.unwrap();
        assert!(matches!(module.base_chain(&last), Err(Error::RecursionLimit(2))));
        assert!(module.bases(&last).is_empty());
    }

    #[test]
    fn test_base_methods() {
        let module = Module::new();
        let base = TypeBuilder::native("App", "App", "Base")
            .with_method(MethodBuilder::new("Foo").with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT))
            .register(&module)
            .unwrap();
        let middle = TypeBuilder::native("App", "App", "Middle")
            .with_base(base.reference())
            .with_method(MethodBuilder::new("Foo").with_flags(MethodFlags::VIRTUAL))
            .register(&module)
            .unwrap();
        let derived = TypeBuilder::native("App", "App", "Derived")
            .with_base(middle.reference())
            .with_method(MethodBuilder::new("Foo").with_flags(MethodFlags::VIRTUAL))
            .with_method(MethodBuilder::new("Bar").with_flags(MethodFlags::VIRTUAL))
            .register(&module)
            .unwrap();

        let foo = derived.find_method("Foo").unwrap();
        let bases = module.base_methods(foo);
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0].declaring, middle.token());
        assert_eq!(bases[1].declaring, base.token());

        assert!(module.base_methods(base.find_method("Foo").unwrap()).is_empty());
        assert!(module.base_methods(derived.find_method("Bar").unwrap()).is_empty());
    }

    #[test]
    fn test_find_implementation() {
        let module = Module::new();
        let iface = TypeBuilder::native("App", "App", "IRun")
            .with_flags(TypeFlags::INTERFACE)
            .with_method(MethodBuilder::new("Run").with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT))
            .register(&module)
            .unwrap();
        let run = iface.find_method("Run").unwrap().clone();

        let implicit = TypeBuilder::native("App", "App", "Implicit")
            .with_interface(iface.reference())
            .with_method(MethodBuilder::new("Run").with_flags(MethodFlags::VIRTUAL))
            .register(&module)
            .unwrap();
        let explicit = TypeBuilder::native("App", "App", "Explicit")
            .with_interface(iface.reference())
            .with_method(MethodBuilder::new("Run").with_flags(MethodFlags::VIRTUAL))
            .with_method(
                MethodBuilder::new("App.IRun.Run")
                    .with_flags(MethodFlags::VIRTUAL)
                    .with_override(MethodReference::new(iface.reference(), "Run", vec![], void())),
            )
            .register(&module)
            .unwrap();
        let inherited = TypeBuilder::native("App", "App", "Inherited")
            .with_base(implicit.reference())
            .register(&module)
            .unwrap();

        assert_eq!(
            module.find_implementation(&implicit, &run).unwrap().declaring,
            implicit.token()
        );
        assert_eq!(
            module.find_implementation(&explicit, &run).unwrap().name,
            "App.IRun.Run"
        );
        assert_eq!(
            module.find_implementation(&inherited, &run).unwrap().declaring,
            implicit.token()
        );

        let implementation = implicit.find_method("Run").unwrap();
        let implemented = module.base_interface_methods(implementation);
        assert_eq!(implemented.len(), 1);
        assert_eq!(implemented[0].token, run.token);
    }

    #[test]
    fn test_constructors() {
        let module = Module::new();
        let ty = TypeBuilder::native("App", "App", "Foo")
            .with_method(
                MethodBuilder::constructor()
                    .with_parameter("x", int()),
            )
            .with_method(MethodBuilder::constructor())
            .with_method(MethodBuilder::class_constructor())
            .register(&module)
            .unwrap();

        let ctor = module.default_ctor(&ty).unwrap();
        assert!(ctor.parameters.is_empty());
        assert!(module.class_ctor(&ty).unwrap().is_class_constructor());

        let foreign = TypeBuilder::foreign("java/lang/Thread")
            .with_method(MethodBuilder::new("<init>"))
            .register(&module)
            .unwrap();
        assert!(module.default_ctor(&foreign).is_some());
        assert!(module.class_ctor(&foreign).is_none());
    }
}
