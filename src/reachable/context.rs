//! Root selection and the propagation fixpoint.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    config::{CompilationMode, ReachableConfig},
    diagnostics::{DiagnosticCategory, Diagnostics},
    model::{
        FieldDefinitionRc, MethodDefinitionRc, Module, Token, TypeDefinition, TypeDefinitionRc,
        TypeOrigin, TypeReference,
    },
    reachable::{
        harvest, AssemblyIncludes, EnumFieldTester, IncludeAction, IncludeTester,
        InstanceOfConditionInclude, ModeTester, PatternRules, ReachableSet, SerializationTester,
        APPLICATION_ROOT_ATTRIBUTE, ATTRIBUTE_NAMESPACE, INCLUDE_DERIVED_TYPES,
    },
};

/// Includes harvested from one assembly, with the types already looked at.
///
/// Providers can register more types into an assembly after it was first harvested; only
/// those are harvested on the next pass.
#[derive(Debug, Default)]
struct ScopeHarvest {
    types: HashSet<Token>,
    includes: Arc<AssemblyIncludes>,
}

/// Counters of a reachability run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableStats {
    /// Fixpoint passes run so far, over all calls to [`ReachableContext::complete`]
    pub passes: usize,
    /// Definitions marked directly as roots
    pub roots: usize,
    /// Reachable types
    pub types: usize,
    /// Reachable methods
    pub methods: usize,
    /// Reachable fields
    pub fields: usize,
    /// Definitions added per pass, in pass order
    pub history: Vec<usize>,
}

impl ReachableStats {
    /// Total number of reachable definitions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.types + self.methods + self.fields
    }

    /// Definitions added by the most recent pass.
    #[must_use]
    pub fn last_added(&self) -> Option<usize> {
        self.history.last().copied()
    }
}

/// The state of one reachability run over a [`Module`].
///
/// Usage is [`ReachableContext::mark_roots`] once, then [`ReachableContext::complete`].
/// Completion is idempotent: calling it again without new roots adds nothing.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotdex::config::ReachableConfig;
/// use dotdex::model::{MethodBuilder, Module, TypeBuilder};
/// use dotdex::reachable::ReachableContext;
///
/// let module = Arc::new(Module::new());
/// let program = TypeBuilder::native("App", "App", "Program")
///     .with_method(MethodBuilder::constructor())
///     .register(&module)?;
/// TypeBuilder::native("App", "App", "Unused").register(&module)?;
///
/// let context = ReachableContext::new(module, ReachableConfig::default().with_root("app.program"));
/// context.mark_roots();
/// let stats = context.complete();
///
/// assert!(context.is_reachable(program.token()));
/// assert!(context.is_reachable(program.methods()[0].token));
/// assert_eq!(stats.types, 1);
/// # Ok::<(), dotdex::Error>(())
/// ```
pub struct ReachableContext {
    module: Arc<Module>,
    config: ReachableConfig,
    reachable: ReachableSet,
    /// Lowercased explicit root names
    root_names: HashSet<String>,
    testers: Vec<Arc<dyn IncludeTester>>,
    patterns: PatternRules,
    /// Marked but not yet walked
    frontier: Mutex<Vec<Token>>,
    /// Attribute type token to "is application root attribute"
    application_roots: DashMap<Token, bool>,
    /// Harvested includes per assembly
    assembly_includes: DashMap<String, ScopeHarvest>,
    /// Instance-of conditions given by name in the configuration
    configured_instance_of: Mutex<Vec<InstanceOfConditionInclude>>,
    diagnostics: Diagnostics,
    roots: AtomicUsize,
    history: Mutex<Vec<usize>>,
}

impl ReachableContext {
    /// Creates a context with the standard include testers.
    #[must_use]
    pub fn new(module: Arc<Module>, config: ReachableConfig) -> Self {
        let testers: Vec<Arc<dyn IncludeTester>> = vec![
            Arc::new(ModeTester::new(&config)),
            Arc::new(SerializationTester),
            Arc::new(EnumFieldTester),
        ];

        ReachableContext {
            root_names: config.root_names.iter().map(|name| name.to_lowercase()).collect(),
            patterns: PatternRules::new(config.patterns.clone()),
            module,
            config,
            reachable: ReachableSet::new(),
            testers,
            frontier: Mutex::new(Vec::new()),
            application_roots: DashMap::new(),
            assembly_includes: DashMap::new(),
            configured_instance_of: Mutex::new(Vec::new()),
            diagnostics: Diagnostics::new(),
            roots: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Adds an include tester.
    #[must_use]
    pub fn with_tester(mut self, tester: Arc<dyn IncludeTester>) -> Self {
        self.testers.push(tester);
        self
    }

    /// Selects roots, propagates to a fixpoint and returns the context.
    #[must_use]
    pub fn run(module: Arc<Module>, config: ReachableConfig) -> Self {
        let context = Self::new(module, config);
        context.mark_roots();
        context.complete();
        context
    }

    /// The module being analyzed.
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The configuration of this run.
    #[must_use]
    pub fn config(&self) -> &ReachableConfig {
        &self.config
    }

    /// The reachable set.
    #[must_use]
    pub fn reachable(&self) -> &ReachableSet {
        &self.reachable
    }

    /// Configuration problems found during root selection.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn testers(&self) -> &[Arc<dyn IncludeTester>] {
        &self.testers
    }

    pub(crate) fn patterns(&self) -> &PatternRules {
        &self.patterns
    }

    /// True if the definition was marked.
    #[must_use]
    pub fn is_reachable(&self, token: Token) -> bool {
        self.reachable.contains(token)
    }

    /// Marks a definition. Returns true if it was not reachable before.
    ///
    /// The dependencies of a newly marked definition are walked on the next drain.
    pub fn mark(&self, token: Token) -> bool {
        if !self.reachable.insert(token) {
            return false;
        }
        tracing::trace!("marked {token}");
        lock!(self.frontier).push(token);
        true
    }

    /// Walks the frontier until it is empty.
    fn drain(&self) {
        loop {
            let batch = drain_lock!(self.frontier);
            if batch.is_empty() {
                break;
            }
            if self.config.parallel {
                batch.par_iter().for_each(|token| self.walk(*token));
            } else {
                batch.iter().for_each(|token| self.walk(*token));
            }
        }
    }

    /// Selects the roots and walks their dependencies. Returns the number of roots.
    ///
    /// Root sources are applied in order: explicit names, mode defaults, instance-of
    /// conditions, pattern includes, single-target includes.
    pub fn mark_roots(&self) -> usize {
        let before = self.reachable.len();

        self.mark_root_names();
        self.mark_mode_roots();

        let configured: Vec<InstanceOfConditionInclude> = self
            .config
            .instance_of
            .iter()
            .filter_map(|name| match self.module.find(name) {
                Some(condition) => Some(InstanceOfConditionInclude::new(condition)),
                None => {
                    self.diagnostics.warning(
                        DiagnosticCategory::Configuration,
                        format!("instance-of condition {name} does not resolve"),
                    );
                    None
                }
            })
            .collect();
        *lock!(self.configured_instance_of) = configured;
        self.apply_instance_of();

        self.apply_patterns();
        self.apply_targets(true);

        let roots = self.reachable.len() - before;
        self.roots.fetch_add(roots, Ordering::Relaxed);
        tracing::debug!("selected {roots} roots");

        self.drain();
        roots
    }

    fn mark_root_names(&self) {
        if self.root_names.is_empty() {
            return;
        }

        let mut matched = HashSet::new();
        for name in &self.config.root_names {
            if let Some(ty) = self.module.find(name) {
                self.mark_root_type(&ty);
                matched.insert(name.to_lowercase());
            }
        }
        for ty in self.module.types() {
            if let Some(key) = self.root_name_key(&ty) {
                self.mark_root_type(&ty);
                matched.insert(key);
            }
        }

        for name in self.root_names.difference(&matched) {
            tracing::debug!("root {name} matches no type");
        }
    }

    /// The lowercased root name `ty` matches, if any.
    fn root_name_key(&self, ty: &TypeDefinition) -> Option<String> {
        let full_name = ty.full_name().to_lowercase();
        if self.root_names.contains(&full_name) {
            return Some(full_name);
        }

        let class_name = ty.class_name()?.to_lowercase();
        let dotted = class_name.replace('/', ".");
        let flattened = dotted.replace('$', ".");
        [class_name, dotted, flattened]
            .into_iter()
            .find(|candidate| self.root_names.contains(candidate))
    }

    /// Marks a root type. JVM classes given as roots keep all their members.
    fn mark_root_type(&self, ty: &TypeDefinition) {
        self.mark(ty.token());
        if ty.origin() == TypeOrigin::Foreign {
            for method in ty.methods() {
                self.mark(method.token);
            }
            for field in ty.fields() {
                self.mark(field.token);
            }
        }
    }

    fn mark_mode_roots(&self) {
        for ty in self.module.types() {
            if ty.origin() != TypeOrigin::Native {
                continue;
            }
            let is_root = match self.config.mode {
                CompilationMode::Application => self.is_application_root(&ty),
                CompilationMode::ClassLibrary => {
                    ty.visibility().is_externally_visible()
                        && self.config.is_root_assembly(ty.scope())
                }
                CompilationMode::All => self.config.is_root_assembly(ty.scope()),
            };
            if is_root {
                self.mark(ty.token());
            }
        }
    }

    /// True if `ty` carries an application-root attribute, or a base type carries one with
    /// `IncludeDerivedTypes` set.
    fn is_application_root(&self, ty: &TypeDefinition) -> bool {
        if ty
            .attributes()
            .iter()
            .any(|attribute| self.is_application_root_attribute(&attribute.attribute_type))
        {
            return true;
        }

        let bases = self.module.base_chain(ty).unwrap_or_else(|error| {
            tracing::debug!("base chain of {ty} truncated: {error}");
            Vec::new()
        });
        bases.iter().any(|base| {
            base.attributes().iter().any(|attribute| {
                self.is_application_root_attribute(&attribute.attribute_type)
                    && attribute.named_flag(INCLUDE_DERIVED_TYPES)
            })
        })
    }

    /// True if the attribute type is the application-root attribute or derives from it.
    fn is_application_root_attribute(&self, attribute_type: &TypeReference) -> bool {
        let is_marker = |namespace: &str, name: &str| {
            namespace == ATTRIBUTE_NAMESPACE && name == APPLICATION_ROOT_ATTRIBUTE
        };

        let Some(definition) = self.module.resolve(attribute_type) else {
            return attribute_type
                .as_named()
                .is_some_and(|named| is_marker(&named.namespace, &named.name));
        };

        if let Some(cached) = self.application_roots.get(&definition.token()) {
            return *cached;
        }

        // The marker itself may be unregistered, so base references are checked by name too
        let chain = self.module.base_chain(&definition).unwrap_or_default();
        let result = std::iter::once(&definition).chain(chain.iter()).any(|ty| {
            is_marker(ty.namespace(), ty.name())
                || ty
                    .base_type()
                    .and_then(TypeReference::as_named)
                    .is_some_and(|named| is_marker(&named.namespace, &named.name))
        });
        self.application_roots.insert(definition.token(), result);
        result
    }

    /// Harvests the includes of every assembly with a reachable type. Types not seen before
    /// are harvested in parallel and merged into their assembly's entry.
    fn reachable_assembly_includes(&self) -> Vec<Arc<AssemblyIncludes>> {
        let mut by_scope: HashMap<String, Vec<TypeDefinitionRc>> = HashMap::new();
        let types = self.module.types();
        let reachable_scopes: HashSet<&str> = types
            .iter()
            .filter(|ty| !ty.scope().is_empty() && self.is_reachable(ty.token()))
            .map(|ty| ty.scope())
            .collect();
        for ty in &types {
            if !reachable_scopes.contains(ty.scope()) {
                continue;
            }
            let harvested = self
                .assembly_includes
                .get(ty.scope())
                .is_some_and(|entry| entry.types.contains(&ty.token()));
            if !harvested {
                by_scope.entry(ty.scope().to_string()).or_default().push(ty.clone());
            }
        }

        by_scope.into_par_iter().for_each(|(scope, members)| {
            let fresh = harvest(&self.module, &members);
            tracing::debug!(
                "harvested {} conditional and {} instance-of includes from {} types of {scope}",
                fresh.conditional.len(),
                fresh.instance_of.len(),
                members.len()
            );
            let mut entry = self.assembly_includes.entry(scope).or_default();
            entry.types.extend(members.iter().map(|ty| ty.token()));
            if !fresh.is_empty() {
                let mut merged = AssemblyIncludes::clone(&entry.includes);
                merged.extend(fresh);
                entry.includes = Arc::new(merged);
            }
        });

        reachable_scopes
            .iter()
            .filter_map(|scope| {
                self.assembly_includes
                    .get(*scope)
                    .map(|entry| entry.includes.clone())
            })
            .collect()
    }

    fn apply_instance_of(&self) {
        let mut conditions = lock!(self.configured_instance_of).clone();
        for includes in self.reachable_assembly_includes() {
            conditions.extend(includes.instance_of.iter().cloned());
        }
        if conditions.is_empty() {
            return;
        }

        for ty in self.module.types() {
            if self.is_reachable(ty.token()) {
                continue;
            }
            if conditions.iter().any(|condition| condition.applies_to(&self.module, &ty)) {
                self.mark(ty.token());
            }
        }
    }

    fn apply_conditional_includes(&self) {
        for includes in self.reachable_assembly_includes() {
            for include in &includes.conditional {
                if include.is_satisfied(&self.reachable) {
                    self.mark(include.member);
                }
            }
        }
    }

    fn apply_patterns(&self) {
        if self.patterns.is_empty() {
            return;
        }
        for ty in self.module.types() {
            if !self.is_reachable(ty.token())
                && self.patterns.decide_type(&ty) == Some(IncludeAction::Include)
            {
                self.mark(ty.token());
            }
        }
    }

    /// Marks single-target includes whose condition holds. Misses are reported only when
    /// `report` is set, so repeated passes stay quiet.
    fn apply_targets(&self, report: bool) {
        for target in &self.config.targets {
            if let Some(condition) = &target.condition {
                match self.module.find(condition) {
                    Some(gate) if self.is_reachable(gate.token()) => {}
                    Some(_) => continue,
                    None => {
                        if report {
                            self.diagnostics.warning(
                                DiagnosticCategory::Configuration,
                                format!("condition of include {target} does not resolve"),
                            );
                        }
                        continue;
                    }
                }
            }

            let Some(ty) = self.module.find(&target.type_name) else {
                if report {
                    self.diagnostics.warning(
                        DiagnosticCategory::Configuration,
                        format!("include {target} does not resolve"),
                    );
                }
                continue;
            };

            match &target.member {
                None => {
                    self.mark(ty.token());
                }
                Some(member) => {
                    let mut found = false;
                    for method in ty.methods().iter().filter(|m| &m.name == member) {
                        self.mark(method.token);
                        found = true;
                    }
                    for field in ty.fields().iter().filter(|f| &f.name == member) {
                        self.mark(field.token);
                        found = true;
                    }
                    if !found && report {
                        self.diagnostics.warning(
                            DiagnosticCategory::Configuration,
                            format!("include {target} names no member"),
                        );
                    }
                }
            }
        }
    }

    /// Runs propagation passes until one adds nothing.
    ///
    /// Each pass applies the conditional includes, then evaluates the remaining members of
    /// all reachable types in parallel, then marks the implementations of reachable
    /// interface methods. Marks are applied after the evaluation barrier.
    pub fn complete(&self) -> ReachableStats {
        self.drain();

        loop {
            let before = self.reachable.len();

            self.apply_conditional_includes();
            self.apply_instance_of();
            self.apply_patterns();
            self.apply_targets(false);
            self.drain();

            let types = self.reachable_definitions();
            let mut found: Vec<Token> = if self.config.parallel {
                types.par_iter().flat_map_iter(|ty| self.candidates_of(ty)).collect()
            } else {
                types.iter().flat_map(|ty| self.candidates_of(ty)).collect()
            };
            found.extend(self.interface_implementations(&types));

            for token in found {
                self.mark(token);
            }
            self.drain();

            let added = self.reachable.len() - before;
            tracing::debug!("reachability pass added {added}, {} reachable", self.reachable.len());
            let mut history = lock!(self.history);
            history.push(added);
            if added == 0 {
                break;
            }
        }

        self.stats()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> ReachableStats {
        let history = lock!(self.history).clone();
        ReachableStats {
            passes: history.len(),
            roots: self.roots.load(Ordering::Relaxed),
            types: self.reachable.type_count(),
            methods: self.reachable.method_count(),
            fields: self.reachable.field_count(),
            history,
        }
    }

    fn reachable_definitions(&self) -> Vec<TypeDefinitionRc> {
        self.reachable
            .tokens()
            .into_iter()
            .filter(|token| token.is_type())
            .filter_map(|token| self.module.get(token))
            .collect()
    }

    /// Members of a reachable type that became reachable through a reachable base method,
    /// a reachable bridge target or an include tester.
    fn candidates_of(&self, ty: &TypeDefinitionRc) -> Vec<Token> {
        let mut result = Vec::new();

        for method in ty.methods().iter().filter(|m| !self.is_reachable(m.token)) {
            let bridged = method
                .bridge
                .as_ref()
                .and_then(|bridge| self.module.resolve_method(bridge))
                .is_some_and(|target| self.is_reachable(target.token));

            if bridged
                || self
                    .module
                    .base_methods(method)
                    .iter()
                    .any(|base| self.is_reachable(base.token))
                || self
                    .module
                    .base_interface_methods(method)
                    .iter()
                    .any(|base| self.is_reachable(base.token))
                || self.accepts_method(ty, method)
            {
                result.push(method.token);
            }
        }

        for field in ty.fields().iter().filter(|f| !self.is_reachable(f.token)) {
            let bridged = field
                .bridge
                .as_ref()
                .and_then(|bridge| self.module.resolve_field(bridge))
                .is_some_and(|target| self.is_reachable(target.token));

            if bridged || self.accepts_field(ty, field) {
                result.push(field.token);
            }
        }

        result
    }

    /// Implementations of reachable interface methods in reachable concrete types.
    fn interface_implementations(&self, types: &[TypeDefinitionRc]) -> Vec<Token> {
        // Interface to reachable concrete implementers, rebuilt every pass
        let mut implementers: HashMap<Token, Vec<TypeDefinitionRc>> = HashMap::new();
        for ty in types.iter().filter(|ty| !ty.is_interface() && !ty.is_abstract()) {
            for interface in self.module.all_interfaces(ty) {
                if self.is_reachable(interface.token()) {
                    implementers.entry(interface.token()).or_default().push(ty.clone());
                }
            }
        }

        let work: Vec<(MethodDefinitionRc, &TypeDefinitionRc)> = types
            .iter()
            .filter(|ty| ty.is_interface())
            .flat_map(|interface| {
                let implementing = implementers.get(&interface.token());
                interface
                    .methods()
                    .iter()
                    .filter(|m| self.is_reachable(m.token))
                    .flat_map(move |method| {
                        implementing
                            .into_iter()
                            .flatten()
                            .map(move |ty| (method.clone(), ty))
                    })
            })
            .collect();

        let find = |(method, ty): &(MethodDefinitionRc, &TypeDefinitionRc)| {
            self.module
                .find_implementation(ty, method)
                .map(|implementation| implementation.token)
                .filter(|token| !self.is_reachable(*token))
        };
        if self.config.parallel {
            work.par_iter().filter_map(find).collect()
        } else {
            work.iter().filter_map(find).collect()
        }
    }

    /// Reachable types sorted by full name.
    #[must_use]
    pub fn reachable_types(&self) -> Vec<TypeDefinitionRc> {
        let mut types = self.reachable_definitions();
        types.sort_by_cached_key(|ty| ty.full_name());
        types
    }

    /// Reachable methods of `ty`, in declaration order.
    #[must_use]
    pub fn reachable_methods(&self, ty: &TypeDefinition) -> Vec<MethodDefinitionRc> {
        ty.methods()
            .iter()
            .filter(|m| self.is_reachable(m.token))
            .cloned()
            .collect()
    }

    /// Reachable fields of `ty`, in declaration order.
    #[must_use]
    pub fn reachable_fields(&self, ty: &TypeDefinition) -> Vec<FieldDefinitionRc> {
        ty.fields()
            .iter()
            .filter(|f| self.is_reachable(f.token))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            AttributeValue, CustomAttribute, FieldBuilder, FieldReference, InMemorySource,
            MethodBuilder, MethodFlags, MethodReference, TypeBuilder, TypeFlags,
            Visibility,
        },
        reachable::{PatternInclude, TargetInclude, INCLUDE_ATTRIBUTE, TYPE_CONDITION},
        test::{app_root, int, void},
    };

    fn sequential(config: ReachableConfig) -> ReachableConfig {
        config.with_parallel(false)
    }

    #[test]
    fn test_root_names_case_insensitive() {
        let module = Arc::new(Module::new());
        let program = TypeBuilder::native("App", "App", "Program").register(&module).unwrap();
        let other = TypeBuilder::native("App", "App", "Other").register(&module).unwrap();

        let context = ReachableContext::run(
            module,
            ReachableConfig::default().with_root("APP.PROGRAM").with_root("App.Missing"),
        );
        assert!(context.is_reachable(program.token()));
        assert!(!context.is_reachable(other.token()));
        assert!(!context.diagnostics().has_any());
    }

    #[test]
    fn test_foreign_root_names() {
        let module = Arc::new(Module::new());
        let inner = TypeBuilder::foreign("com/example/Outer$Inner")
            .with_method(MethodBuilder::new("run"))
            .with_field(FieldBuilder::new("count", int()))
            .register(&module)
            .unwrap();
        let plain = TypeBuilder::foreign("com/example/Plain").register(&module).unwrap();

        let context = ReachableContext::new(
            module,
            sequential(ReachableConfig::default().with_root("com.example.outer.inner")),
        );
        assert_eq!(context.mark_roots(), 3);
        assert!(context.is_reachable(inner.token()));
        assert!(context.is_reachable(inner.methods()[0].token));
        assert!(context.is_reachable(inner.fields()[0].token));
        assert!(!context.is_reachable(plain.token()));
    }

    #[test]
    fn test_application_roots() {
        let module = Arc::new(Module::new());
        let activity = TypeBuilder::native("App", "App", "BaseActivity")
            .with_attribute(app_root().with_named(INCLUDE_DERIVED_TYPES, AttributeValue::Bool(true)))
            .register(&module)
            .unwrap();
        let main = TypeBuilder::native("App", "App", "MainActivity")
            .with_base(activity.reference())
            .register(&module)
            .unwrap();
        let service = TypeBuilder::native("App", "App", "Service")
            .with_attribute(app_root())
            .register(&module)
            .unwrap();
        let worker = TypeBuilder::native("App", "App", "Worker")
            .with_base(service.reference())
            .register(&module)
            .unwrap();

        // An attribute deriving from the marker counts as the marker
        let derived_marker = TypeBuilder::native("App", "App", "ActivityAttribute")
            .with_base(TypeReference::named(ATTRIBUTE_NAMESPACE, APPLICATION_ROOT_ATTRIBUTE, TypeOrigin::Native))
            .register(&module)
            .unwrap();
        let custom = TypeBuilder::native("App", "App", "Custom")
            .with_attribute(CustomAttribute::new(derived_marker.reference()))
            .register(&module)
            .unwrap();

        let context = ReachableContext::run(module, sequential(ReachableConfig::application()));
        assert!(context.is_reachable(activity.token()));
        assert!(context.is_reachable(main.token()));
        assert!(context.is_reachable(service.token()));
        assert!(!context.is_reachable(worker.token()));
        assert!(context.is_reachable(custom.token()));
    }

    #[test]
    fn test_class_library_mode() {
        let module = Arc::new(Module::new());
        let api = TypeBuilder::native("Lib", "Lib", "Api")
            .with_method(MethodBuilder::new("Open"))
            .with_method(MethodBuilder::new("Helper").with_visibility(Visibility::Private))
            .register(&module)
            .unwrap();
        let internal = TypeBuilder::native("Lib", "Lib", "Internal")
            .with_visibility(Visibility::Assembly)
            .register(&module)
            .unwrap();

        let context = ReachableContext::run(module, ReachableConfig::class_library());
        assert!(context.is_reachable(api.token()));
        assert!(context.is_reachable(api.methods()[0].token));
        assert!(!context.is_reachable(api.methods()[1].token));
        assert!(!context.is_reachable(internal.token()));
    }

    #[test]
    fn test_all_mode_limits_assemblies() {
        let module = Arc::new(Module::new());
        let app = TypeBuilder::native("App", "App", "A")
            .with_method(MethodBuilder::new("Run").with_visibility(Visibility::Private))
            .register(&module)
            .unwrap();
        let lib = TypeBuilder::native("Lib", "Lib", "B").register(&module).unwrap();

        let context = ReachableContext::run(module, ReachableConfig::all(["App"]));
        assert!(context.is_reachable(app.token()));
        assert!(context.is_reachable(app.methods()[0].token));
        assert!(!context.is_reachable(lib.token()));
    }

    #[test]
    fn test_instance_of_condition() {
        let module = Arc::new(Module::new());
        let plugin = TypeBuilder::native("App", "App", "IPlugin")
            .with_flags(TypeFlags::INTERFACE)
            .register(&module)
            .unwrap();
        let base = TypeBuilder::native("App", "App", "PluginBase")
            .with_interface(plugin.reference())
            .register(&module)
            .unwrap();
        let concrete = TypeBuilder::native("App", "App", "Concrete")
            .with_base(base.reference())
            .register(&module)
            .unwrap();
        let unrelated = TypeBuilder::native("App", "App", "Unrelated").register(&module).unwrap();

        let context = ReachableContext::run(
            module,
            sequential(ReachableConfig::default().with_instance_of("App.IPlugin").with_instance_of("App.Gone")),
        );
        assert!(context.is_reachable(plugin.token()));
        assert!(context.is_reachable(base.token()));
        assert!(context.is_reachable(concrete.token()));
        assert!(!context.is_reachable(unrelated.token()));
        assert_eq!(context.diagnostics().warning_count(), 1);
    }

    #[test]
    fn test_patterns_and_targets() {
        let module = Arc::new(Module::new());
        let view = TypeBuilder::native("App", "App.Views", "MainView")
            .with_method(MethodBuilder::new("get_Title"))
            .with_method(MethodBuilder::new("Render"))
            .register(&module)
            .unwrap();
        let hidden = TypeBuilder::native("App", "App.Views", "HiddenView").register(&module).unwrap();
        let gate = TypeBuilder::native("App", "App", "Gate").register(&module).unwrap();
        let gated = TypeBuilder::native("App", "App", "Gated")
            .with_method(MethodBuilder::new("Handle"))
            .register(&module)
            .unwrap();

        let config = ReachableConfig::default()
            .with_pattern(PatternInclude::new("App.Views.*").with_members("get_*"))
            .with_pattern(PatternInclude::new("App.Views.Hidden*").local("App").exclude())
            .with_target(TargetInclude::new("App.Gated::Handle").when("App.Gate"));

        let context = ReachableContext::new(module.clone(), sequential(config.clone()));
        context.mark_roots();
        context.complete();
        assert!(context.is_reachable(view.token()));
        assert!(context.is_reachable(view.methods()[0].token));
        assert!(!context.is_reachable(view.methods()[1].token));
        assert!(!context.is_reachable(hidden.token()));
        assert!(!context.is_reachable(gated.methods()[0].token));

        let context = ReachableContext::new(module, sequential(config.with_root("App.Gate")));
        context.mark_roots();
        context.complete();
        assert!(context.is_reachable(gate.token()));
        assert!(context.is_reachable(gated.methods()[0].token));
        assert!(context.is_reachable(gated.token()));
    }

    #[test]
    fn test_attribute_includes() {
        let module = Arc::new(Module::new());
        let gate = TypeBuilder::native("App", "App", "Gate").register(&module).unwrap();
        let program = TypeBuilder::native("App", "App", "Program").register(&module).unwrap();
        let handler = TypeBuilder::native("App", "App", "Handler")
            .with_attribute(
                CustomAttribute::new(TypeReference::named(ATTRIBUTE_NAMESPACE, INCLUDE_ATTRIBUTE, TypeOrigin::Native))
                    .with_named(TYPE_CONDITION, AttributeValue::Type(gate.reference())),
            )
            .register(&module)
            .unwrap();

        let context = ReachableContext::run(
            module.clone(),
            sequential(ReachableConfig::default().with_root("App.Program")),
        );
        assert!(context.is_reachable(program.token()));
        assert!(!context.is_reachable(handler.token()));

        let context = ReachableContext::run(
            module,
            sequential(ReachableConfig::default().with_root("App.Program").with_root("App.Gate")),
        );
        assert!(context.is_reachable(handler.token()));
    }

    #[test]
    fn test_attribute_includes_of_loaded_types() {
        let module = Arc::new(Module::new());
        let include = CustomAttribute::new(TypeReference::named(
            ATTRIBUTE_NAMESPACE,
            INCLUDE_ATTRIBUTE,
            TypeOrigin::Native,
        ));
        module.add_provider(Arc::new(
            InMemorySource::new("App.dll", TypeOrigin::Native).with_type(
                TypeBuilder::native("App", "App", "Lazy")
                    .with_method(MethodBuilder::constructor())
                    .with_method(MethodBuilder::new("Helper").with_attribute(include))
                    .with_method(MethodBuilder::new("Unused")),
            ),
        ));
        let lazy = TypeReference::named("App", "Lazy", TypeOrigin::Native);
        TypeBuilder::native("App", "App", "Program")
            .with_method(
                MethodBuilder::new("Main")
                    .with_flags(MethodFlags::STATIC)
                    .with_reference(MethodReference::new(lazy, ".ctor", vec![], void())),
            )
            .register(&module)
            .unwrap();

        for parallel in [false, true] {
            let config = ReachableConfig::default()
                .with_root("App.Program")
                .with_parallel(parallel);
            let context = ReachableContext::run(module.clone(), config);

            // On the first run App is harvested before Lazy is loaded into it
            let loaded = module.find("App.Lazy").unwrap();
            assert!(context.is_reachable(loaded.token()));
            assert!(context.is_reachable(loaded.find_method("Helper").unwrap().token));
            assert!(!context.is_reachable(loaded.find_method("Unused").unwrap().token));
        }
    }

    #[test]
    fn test_bridges_both_ways() {
        let module = Arc::new(Module::new());
        let foreign = TypeBuilder::foreign("java/lang/Thread")
            .with_method(MethodBuilder::new("start"))
            .with_field(FieldBuilder::new("name", TypeReference::foreign_class("java/lang/String")))
            .register(&module)
            .unwrap();
        let wrapper = TypeBuilder::native("Rt", "Java.Lang", "Thread")
            .with_java_import("java/lang/Thread")
            .with_method(
                MethodBuilder::new("Start")
                    .with_bridge(MethodReference::new(foreign.reference(), "start", vec![], void())),
            )
            .with_field(
                FieldBuilder::new("Name", TypeReference::foreign_class("java/lang/String")).with_bridge(
                    FieldReference::new(foreign.reference(), "name", TypeReference::foreign_class("java/lang/String")),
                ),
            )
            .register(&module)
            .unwrap();
        let start = wrapper.methods()[0].token;

        // Forward: wrapper method pulls in the foreign method
        let context = ReachableContext::new(module.clone(), sequential(ReachableConfig::default()));
        context.mark(start);
        context.complete();
        assert!(context.is_reachable(foreign.methods()[0].token));
        assert!(context.is_reachable(foreign.token()));
        // The wrapped class keeps only what is used
        assert!(!context.is_reachable(foreign.fields()[0].token));

        // Reverse: a reachable foreign field pulls in its wrapper once the wrapper is reachable
        let context = ReachableContext::new(module, sequential(ReachableConfig::default()));
        context.mark(wrapper.token());
        context.mark(foreign.fields()[0].token);
        context.complete();
        assert!(context.is_reachable(wrapper.fields()[0].token));
        assert!(!context.is_reachable(start));
    }

    #[test]
    fn test_provider_types_become_reachable() {
        let module = Arc::new(Module::new());
        module.add_provider(Arc::new(
            InMemorySource::new("rt", TypeOrigin::Foreign)
                .with_type(TypeBuilder::foreign("java/util/List").with_method(MethodBuilder::new("size"))),
        ));
        let program = TypeBuilder::native("App", "App", "Program")
            .with_method(
                MethodBuilder::new("Main")
                    .with_flags(MethodFlags::STATIC)
                    .with_reference(TypeReference::foreign_class("java/util/List")),
            )
            .register(&module)
            .unwrap();

        let context = ReachableContext::new(module.clone(), sequential(ReachableConfig::default()));
        context.mark(program.methods()[0].token);
        context.complete();

        let list = module.find("java/util/List").unwrap();
        assert!(context.is_reachable(list.token()));
        assert!(context.is_reachable(list.methods()[0].token));
        let names: Vec<String> = context.reachable_types().iter().map(|t| t.full_name()).collect();
        assert_eq!(names, vec!["App.Program".to_string(), "java.util.List".to_string()]);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let module = Arc::new(Module::new());
        TypeBuilder::native("App", "App", "Program")
            .with_attribute(app_root())
            .with_method(MethodBuilder::constructor())
            .register(&module)
            .unwrap();

        let context = ReachableContext::new(module, ReachableConfig::default());
        context.mark_roots();
        let first = context.complete();
        let second = context.complete();
        assert_eq!(first.total(), second.total());
        assert_eq!(second.last_added(), Some(0));
        assert_eq!(second.passes, first.passes + 1);
        assert_eq!(second.roots, 1);
    }
}
