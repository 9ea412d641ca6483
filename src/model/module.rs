//! The per-run type registry.
//!
//! A [`Module`] owns every definition of one compilation run, regardless of where it came
//! from. It stores definitions in token order, keeps name indices for resolution, and pulls
//! missing types from registered [`SourceProvider`]s on demand.
//!
//! # Architecture
//!
//! - Lock-free primary storage keyed by [`Token`] (`SkipMap`)
//! - Concurrent secondary indices by scope id and full name (`DashMap`)
//! - Atomic row counters per table for token assignment
//! - A memo of provider requests, so each name is loaded at most once
//!
//! # Resolution order
//!
//! [`Module::resolve`] binds a named reference by, in order:
//! 1. its scope id, if it carries one;
//! 2. its full name, where a native definition shadows a synthetic one, which shadows a
//!    foreign one;
//! 3. its scope id as an import name, which binds a JVM class reference to the native
//!    wrapper that imports it;
//! 4. the registered providers.
//!
//! A miss is `None`. Generic instances resolve through their element type; arrays, byrefs
//! and generic parameters never resolve.
//!
//! # Thread Safety
//!
//! All operations take `&self` and are safe to call from rayon workers.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, OnceLock, RwLock,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};
use strum::IntoEnumIterator;

use crate::{
    model::{
        FieldDefinitionRc, FieldReference, MethodDefinition, MethodDefinitionRc,
        MethodReference, NamedType, PrimitiveKind, SourceProvider, Token, TypeDefinition,
        TypeDefinitionRc, TypeOrigin, TypeRefKind, TypeReference, FIELD_TABLE, METHOD_TABLE,
        TYPE_TABLE,
    },
    Error, Result,
};

/// Default limit for base-type and interface walks.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Registry of all definitions of a compilation run.
pub struct Module {
    /// Primary storage, in registration order
    types: SkipMap<Token, TypeDefinitionRc>,
    methods: SkipMap<Token, MethodDefinitionRc>,
    fields: SkipMap<Token, FieldDefinitionRc>,
    next_type_row: AtomicU32,
    next_method_row: AtomicU32,
    next_field_row: AtomicU32,
    /// Exact binding keys, unique
    by_scope_id: DashMap<String, Token>,
    /// Full names and import names with the origin that claimed them
    by_full_name: DashMap<String, (Token, TypeOrigin)>,
    /// JVM class name to the native type importing it
    wrappers: DashMap<String, Token>,
    providers: RwLock<Vec<Arc<dyn SourceProvider>>>,
    /// One cell per name ever requested from the providers
    loads: DashMap<String, Arc<OnceLock<Option<Token>>>>,
    primitives: Vec<TypeReference>,
    object: TypeReference,
    max_depth: usize,
}

impl Module {
    /// Creates an empty module with the primitive singletons in place.
    #[must_use]
    pub fn new() -> Self {
        Module {
            types: SkipMap::new(),
            methods: SkipMap::new(),
            fields: SkipMap::new(),
            next_type_row: AtomicU32::new(1),
            next_method_row: AtomicU32::new(1),
            next_field_row: AtomicU32::new(1),
            by_scope_id: DashMap::new(),
            by_full_name: DashMap::new(),
            wrappers: DashMap::new(),
            providers: RwLock::new(Vec::new()),
            loads: DashMap::new(),
            primitives: PrimitiveKind::iter().map(TypeReference::primitive).collect(),
            object: TypeReference::named(
                crate::model::primitives::SYSTEM_NAMESPACE,
                "Object",
                TypeOrigin::Native,
            ),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the limit for hierarchy walks.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Limit for hierarchy walks.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Registers a provider consulted when resolution misses.
    pub fn add_provider(&self, provider: Arc<dyn SourceProvider>) {
        write_lock!(self.providers).push(provider);
    }

    /// The module-owned reference for a primitive kind.
    #[must_use]
    pub fn primitive(&self, kind: PrimitiveKind) -> &TypeReference {
        &self.primitives[kind as usize]
    }

    /// Reference to `System.Object`.
    #[must_use]
    pub fn object_type(&self) -> &TypeReference {
        &self.object
    }

    pub(crate) fn next_token(&self, table: u8) -> Token {
        let counter = match table {
            METHOD_TABLE => &self.next_method_row,
            FIELD_TABLE => &self.next_field_row,
            _ => &self.next_type_row,
        };
        Token::from_parts(table, counter.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn scope_id_token(&self, scope_id: &str) -> Option<Token> {
        self.by_scope_id.get(scope_id).map(|entry| *entry.value())
    }

    fn full_name_token(&self, name: &str) -> Option<Token> {
        self.by_full_name.get(name).map(|entry| entry.value().0)
    }

    pub(crate) fn register(&self, definition: TypeDefinition) -> Result<TypeDefinitionRc> {
        let token = definition.token();
        let origin = definition.origin();

        match self.by_scope_id.entry(definition.scope_id()) {
            Entry::Occupied(entry) => return Err(Error::DuplicateScopeId(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(token);
            }
        }

        let definition = Arc::new(definition);
        for method in definition.methods() {
            self.methods.insert(method.token, method.clone());
        }
        for field in definition.fields() {
            self.fields.insert(field.token, field.clone());
        }
        self.types.insert(token, definition.clone());

        self.index_name(definition.full_name(), token, origin);
        match definition.as_ref() {
            TypeDefinition::Native(native) => {
                if let Some(import) = &native.java_import {
                    self.index_name(import.clone(), token, origin);
                    self.wrappers.insert(import.clone(), token);
                }
            }
            TypeDefinition::Foreign(foreign) => {
                self.index_name(foreign.class_name.clone(), token, origin);
            }
            TypeDefinition::Synthetic(_) => {}
        }

        tracing::trace!("registered {origin} type {} as {token}", definition.full_name());
        Ok(definition)
    }

    fn index_name(&self, name: String, token: Token, origin: TypeOrigin) {
        self.by_full_name
            .entry(name)
            .and_modify(|existing| {
                if origin.lookup_priority() > existing.1.lookup_priority() {
                    *existing = (token, origin);
                }
            })
            .or_insert((token, origin));
    }

    /// Type definition by token.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<TypeDefinitionRc> {
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// Method definition by token.
    #[must_use]
    pub fn get_method(&self, token: Token) -> Option<MethodDefinitionRc> {
        self.methods.get(&token).map(|entry| entry.value().clone())
    }

    /// Field definition by token.
    #[must_use]
    pub fn get_field(&self, token: Token) -> Option<FieldDefinitionRc> {
        self.fields.get(&token).map(|entry| entry.value().clone())
    }

    /// Type definition by token, as error when absent.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the token is not a registered type.
    pub fn type_definition(&self, token: Token) -> Result<TypeDefinitionRc> {
        self.get(token).ok_or(Error::TypeNotFound(token))
    }

    /// All registered types in token order.
    #[must_use]
    pub fn types(&self) -> Vec<TypeDefinitionRc> {
        self.types.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of registered methods.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Number of registered fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Finds a type by full name or import name, loading it from the providers if needed.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TypeDefinitionRc> {
        self.full_name_token(name)
            .or_else(|| self.load(name))
            .and_then(|token| self.get(token))
    }

    /// The native type wrapping the given JVM class, if one is registered.
    #[must_use]
    pub fn wrapper_of(&self, class_name: &str) -> Option<TypeDefinitionRc> {
        self.wrappers
            .get(class_name)
            .and_then(|entry| self.get(*entry.value()))
    }

    /// Loads every type the providers enumerate. Returns the number of types resolved.
    pub fn load_all(&self) -> usize {
        let providers = read_lock!(self.providers).clone();
        providers
            .iter()
            .flat_map(|provider| provider.type_names())
            .filter(|name| self.find(name).is_some())
            .count()
    }

    /// Binds a reference to its definition.
    #[must_use]
    pub fn resolve(&self, reference: &TypeReference) -> Option<TypeDefinitionRc> {
        self.resolve_token(reference).and_then(|token| self.get(token))
    }

    /// Binds a reference to the token of its definition.
    #[must_use]
    pub fn resolve_token(&self, reference: &TypeReference) -> Option<Token> {
        self.bind_token(reference, true)
    }

    /// Like [`Module::resolve_token`], but never asks the providers. Only types already
    /// registered bind.
    #[must_use]
    pub fn lookup_token(&self, reference: &TypeReference) -> Option<Token> {
        self.bind_token(reference, false)
    }

    fn bind_token(&self, reference: &TypeReference, load: bool) -> Option<Token> {
        match reference.kind() {
            TypeRefKind::Named(named) => self.resolve_named(named, load),
            TypeRefKind::GenericInstance { element, .. } => self.bind_token(element, load),
            TypeRefKind::Primitive(kind) => self.full_name_token(&kind.full_name()),
            TypeRefKind::Array { .. } | TypeRefKind::ByRef(_) | TypeRefKind::GenericParameter(_) => {
                None
            }
        }
    }

    fn resolve_named(&self, named: &NamedType, load: bool) -> Option<Token> {
        if let Some(token) = named
            .scope_id
            .as_deref()
            .and_then(|scope_id| self.scope_id_token(scope_id))
        {
            return Some(token);
        }

        let full_name = named.full_name();
        if let Some(token) = self.full_name_token(&full_name) {
            return Some(token);
        }

        if let Some(scope_id) = named.scope_id.as_deref() {
            if let Some(token) = self.full_name_token(scope_id) {
                return Some(token);
            }
            if load && named.origin == TypeOrigin::Foreign {
                if let Some(token) = self.load(scope_id) {
                    return Some(token);
                }
            }
        }

        if load {
            self.load(&full_name)
        } else {
            None
        }
    }

    fn load(&self, name: &str) -> Option<Token> {
        if read_lock!(self.providers).is_empty() {
            return None;
        }

        let cell = Arc::clone(self.loads.entry(name.to_string()).or_default().value());
        *cell.get_or_init(|| self.load_from_providers(name))
    }

    fn load_from_providers(&self, name: &str) -> Option<Token> {
        let providers = read_lock!(self.providers).clone();
        for provider in providers {
            let Some(builder) = provider.load(self, name) else {
                continue;
            };

            match builder.register(self) {
                Ok(definition) => {
                    tracing::debug!("loaded {name} from {}", provider.name());
                    return Some(definition.token());
                }
                // Already loaded under another name
                Err(Error::DuplicateScopeId(scope_id)) => return self.scope_id_token(&scope_id),
                Err(error) => {
                    tracing::warn!("provider {} failed to load {name}: {error}", provider.name());
                }
            }
        }

        tracing::trace!("no provider defines {name}");
        None
    }

    /// Binds a method reference, searching the declaring type and its base chain.
    #[must_use]
    pub fn resolve_method(&self, reference: &MethodReference) -> Option<MethodDefinitionRc> {
        let mut current = self.resolve(&reference.declaring_type);
        let mut visited = HashSet::new();

        while let Some(ty) = current {
            if !visited.insert(ty.token()) || visited.len() > self.max_depth {
                break;
            }
            if let Some(method) = ty
                .methods()
                .iter()
                .find(|method| self.matches_reference(method, reference))
            {
                return Some(method.clone());
            }
            current = ty.base_type().and_then(|base| self.resolve(base));
        }

        None
    }

    fn matches_reference(&self, method: &MethodDefinition, reference: &MethodReference) -> bool {
        method.name == reference.name
            && method.is_static() != reference.has_this
            && method.parameters.len() == reference.parameters.len()
            && self.is_same(&method.return_type, &reference.return_type)
            && method
                .parameter_types()
                .zip(&reference.parameters)
                .all(|(a, b)| self.is_same(a, b))
    }

    /// Binds a field reference, searching the declaring type and its base chain.
    #[must_use]
    pub fn resolve_field(&self, reference: &FieldReference) -> Option<FieldDefinitionRc> {
        let mut current = self.resolve(&reference.declaring_type);
        let mut visited = HashSet::new();

        while let Some(ty) = current {
            if !visited.insert(ty.token()) || visited.len() > self.max_depth {
                break;
            }
            if let Some(field) = ty.fields().iter().find(|field| {
                field.name == reference.name && self.is_same(&field.field_type, &reference.field_type)
            }) {
                return Some(field.clone());
            }
            current = ty.base_type().and_then(|base| self.resolve(base));
        }

        None
    }

    /// True if both references denote the same type.
    ///
    /// Named leaves compare by resolved definition when both resolve, else by full name.
    /// Composites compare structurally.
    #[must_use]
    pub fn is_same(&self, a: &TypeReference, b: &TypeReference) -> bool {
        a.is_same_with(b, false, &|x: &TypeReference, y: &TypeReference| self.same_named(x, y))
    }

    /// Like [`Module::is_same`], with unsigned primitives folded onto signed ones.
    #[must_use]
    pub fn is_same_ignore_sign(&self, a: &TypeReference, b: &TypeReference) -> bool {
        a.is_same_with(b, true, &|x: &TypeReference, y: &TypeReference| self.same_named(x, y))
    }

    fn same_named(&self, a: &TypeReference, b: &TypeReference) -> bool {
        match (self.lookup_token(a), self.lookup_token(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a.full_name() == b.full_name(),
        }
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}
