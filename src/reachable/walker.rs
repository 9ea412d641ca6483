//! Dependency walking for newly marked definitions.
//!
//! When a definition enters the reachable set, everything it directly depends on is marked
//! as well. Walks never recurse into the marking itself: newly marked tokens go onto the
//! context's frontier and are walked in the next batch.
//!
//! A reference that does not resolve is a soft miss. The path is skipped and the walk goes on.

use crate::{
    model::{
        FieldDefinition, GenericParameter, MemberReference, MethodDefinition, MethodReference,
        Token, TypeDefinition, TypeRefKind, TypeReference,
    },
    reachable::{IncludeAction, ReachableContext},
};

impl ReachableContext {
    /// Walks the dependencies of a marked definition.
    pub(crate) fn walk(&self, token: Token) {
        let module = self.module();
        if token.is_type() {
            if let Some(ty) = module.get(token) {
                self.walk_type(&ty);
            }
        } else if token.is_method() {
            if let Some(method) = module.get_method(token) {
                self.walk_method(&method);
            }
        } else if token.is_field() {
            if let Some(field) = module.get_field(token) {
                self.walk_field(&field);
            }
        }
    }

    fn walk_type(&self, ty: &TypeDefinition) {
        let module = self.module();

        if let Some(base) = ty.base_type() {
            self.mark_reference(base);
        }
        if let Some(declaring) = ty.declaring_type() {
            self.mark(declaring);
        }
        for interface in ty.interfaces() {
            self.mark_reference(interface);
        }
        for parameter in ty.generic_parameters() {
            self.mark_constraints(parameter, 0);
        }
        for attribute in ty.attributes() {
            self.mark_reference(&attribute.attribute_type);
        }

        if let Some(ctor) = module.default_ctor(ty) {
            self.mark(ctor.token);
        }
        if let Some(cctor) = module.class_ctor(ty) {
            self.mark(cctor.token);
        }

        // A JVM class nobody wraps is emitted as is
        let unwrapped_foreign = ty
            .class_name()
            .is_some_and(|class_name| module.wrapper_of(class_name).is_none());

        if let Some(import) = ty.java_import() {
            match module.resolve_token(&TypeReference::foreign_class(import)) {
                Some(imported) if imported != ty.token() => {
                    self.mark(imported);
                }
                _ => tracing::trace!("{ty} imports unregistered class {import}"),
            }
        }
        let imported_interface = ty.java_import().is_some() && ty.is_interface();

        for method in ty.methods() {
            if unwrapped_foreign || imported_interface || self.accepts_method(ty, method) {
                self.mark(method.token);
            }
        }
        for field in ty.fields() {
            if unwrapped_foreign || self.accepts_field(ty, field) {
                self.mark(field.token);
            }
        }
    }

    fn walk_method(&self, method: &MethodDefinition) {
        let module = self.module();

        self.mark(method.declaring);
        self.mark_reference(&method.return_type);
        for parameter in &method.parameters {
            self.mark_reference(&parameter.parameter_type);
        }
        for parameter in &method.generic_parameters {
            self.mark_constraints(parameter, 0);
        }
        for attribute in &method.attributes {
            self.mark_reference(&attribute.attribute_type);
        }

        for reference in &method.body_references {
            match reference {
                MemberReference::Type(ty) => self.mark_reference(ty),
                MemberReference::Method(target) => self.mark_method_reference(target),
                MemberReference::Field(target) => {
                    self.mark_reference(&target.declaring_type);
                    match module.resolve_field(target) {
                        Some(field) => {
                            self.mark(field.token);
                        }
                        None => tracing::trace!("unresolved field {} in {method}", target.full_name()),
                    }
                }
            }
        }

        for overridden in &method.overrides {
            self.mark_method_reference(overridden);
        }
        if method.is_virtual() {
            for base in module.base_methods(method) {
                self.mark(base.token);
            }
        }
        if let Some(bridge) = &method.bridge {
            self.mark_method_reference(bridge);
        }
    }

    fn walk_field(&self, field: &FieldDefinition) {
        self.mark(field.declaring);
        self.mark_reference(&field.field_type);
        for attribute in &field.attributes {
            self.mark_reference(&attribute.attribute_type);
        }

        if let Some(bridge) = &field.bridge {
            match self.module().resolve_field(bridge) {
                Some(target) => {
                    self.mark(target.token);
                }
                None => tracing::trace!("unresolved bridge {} of {}", bridge.full_name(), field.full_name()),
            }
        }
    }

    fn mark_method_reference(&self, reference: &MethodReference) {
        self.mark_reference(&reference.declaring_type);
        for argument in &reference.generic_arguments {
            self.mark_reference(argument);
        }
        match self.module().resolve_method(reference) {
            Some(target) => {
                self.mark(target.token);
            }
            None => tracing::trace!("unresolved method {}", reference.full_name()),
        }
    }

    /// Marks the definitions a type reference denotes, including the elements and arguments
    /// of composite references.
    pub(crate) fn mark_reference(&self, reference: &TypeReference) {
        self.mark_reference_at(reference, 0);
    }

    fn mark_reference_at(&self, reference: &TypeReference, depth: usize) {
        if depth > self.config().max_depth {
            tracing::debug!("type reference {reference} nested deeper than {}", self.config().max_depth);
            return;
        }

        match reference.kind() {
            TypeRefKind::Primitive(_) | TypeRefKind::Named(_) => {
                if let Some(token) = self.module().resolve_token(reference) {
                    self.mark(token);
                }
            }
            TypeRefKind::Array { element, .. } | TypeRefKind::ByRef(element) => {
                self.mark_reference_at(element, depth + 1);
            }
            TypeRefKind::GenericInstance { element, arguments } => {
                self.mark_reference_at(element, depth + 1);
                for argument in arguments {
                    self.mark_reference_at(argument, depth + 1);
                }
            }
            TypeRefKind::GenericParameter(parameter) => self.mark_constraints(parameter, depth + 1),
        }
    }

    fn mark_constraints(&self, parameter: &GenericParameter, depth: usize) {
        for constraint in &parameter.constraints {
            self.mark_reference_at(constraint, depth + 1);
        }
    }

    /// True if a tester or a pattern include asks for the method.
    pub(crate) fn accepts_method(&self, ty: &TypeDefinition, method: &MethodDefinition) -> bool {
        let module = self.module();
        self.testers()
            .iter()
            .any(|tester| tester.include_method(module, method))
            || self.patterns().decide_member(ty, &method.name) == Some(IncludeAction::Include)
    }

    /// True if a tester or a pattern include asks for the field.
    pub(crate) fn accepts_field(&self, ty: &TypeDefinition, field: &FieldDefinition) -> bool {
        let module = self.module();
        self.testers()
            .iter()
            .any(|tester| tester.include_field(module, field))
            || self.patterns().decide_member(ty, &field.name) == Some(IncludeAction::Include)
    }
}
