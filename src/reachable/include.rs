//! Declarative include rules.
//!
//! Rules come from two places. The caller configures [`PatternInclude`]s, [`TargetInclude`]s
//! and instance-of type names in [`crate::config::ReachableConfig`]. Assemblies carry include
//! attributes, which [`harvest`] turns into [`TypeConditionInclude`]s and
//! [`InstanceOfConditionInclude`]s once per assembly.
//!
//! # Attributes
//!
//! All attributes live in the [`ATTRIBUTE_NAMESPACE`] namespace:
//!
//! - `IncludeAttribute` on a type, method or field includes the carrier. With
//!   `TypeCondition` it waits until that type is reachable. With `InstanceOfCondition` it
//!   instead includes every type assignable to the given one. With `Type` it includes the
//!   given type instead of the carrier. On a type, `ApplyToMembers = true` includes all
//!   members once the type is reachable.
//! - `IncludeTypeAttribute` is `IncludeAttribute` with `ApplyToMembers` implied.
//! - `ApplicationRootAttribute` (or a subclass of it) roots a type in application mode.
//!   `IncludeDerivedTypes = true` extends that to all subclasses.

use std::fmt;

use crate::{
    model::{
        AttributeValue, CustomAttribute, Module, Token, TypeDefinition, TypeDefinitionRc,
    },
    reachable::{Pattern, ReachableSet},
};

/// Namespace of all marker attributes.
pub const ATTRIBUTE_NAMESPACE: &str = "Dotdex";
/// Include marker.
pub const INCLUDE_ATTRIBUTE: &str = "IncludeAttribute";
/// Include marker applying to all members of a type.
pub const INCLUDE_TYPE_ATTRIBUTE: &str = "IncludeTypeAttribute";
/// Application root marker.
pub const APPLICATION_ROOT_ATTRIBUTE: &str = "ApplicationRootAttribute";
/// Named argument gating an include on another type.
pub const TYPE_CONDITION: &str = "TypeCondition";
/// Named argument turning an include into an instance-of condition.
pub const INSTANCE_OF_CONDITION: &str = "InstanceOfCondition";
/// Named argument extending a type include to its members.
pub const APPLY_TO_MEMBERS: &str = "ApplyToMembers";
/// Named argument naming the type to include.
pub const INCLUDE_TYPE_ARGUMENT: &str = "Type";
/// Named argument extending an application root to subclasses.
pub const INCLUDE_DERIVED_TYPES: &str = "IncludeDerivedTypes";

/// Where a pattern include applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IncludeScope {
    /// Every assembly and archive
    #[default]
    Global,
    /// Only the named assembly
    Local(String),
}

impl IncludeScope {
    /// True if a definition from `scope` is covered.
    #[must_use]
    pub fn covers(&self, scope: &str) -> bool {
        match self {
            IncludeScope::Global => true,
            IncludeScope::Local(assembly) => assembly.eq_ignore_ascii_case(scope),
        }
    }
}

/// What a matching pattern does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IncludeAction {
    /// Mark the match
    #[default]
    Include,
    /// Suppress pattern-driven marking of the match
    Exclude,
}

/// A glob include over type names, optionally extending to members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternInclude {
    /// Matched against full names and JVM class names
    pub type_pattern: Pattern,
    /// Matched against member names; `None` matches every member
    pub member_pattern: Option<Pattern>,
    /// Assemblies covered
    pub scope: IncludeScope,
    /// Whether members of matching types are tagged too
    pub apply_to_members: bool,
    /// Include or exclude
    pub action: IncludeAction,
}

impl PatternInclude {
    /// A global include for types matching `type_pattern`.
    pub fn new(type_pattern: impl Into<Pattern>) -> Self {
        PatternInclude {
            type_pattern: type_pattern.into(),
            member_pattern: None,
            scope: IncludeScope::Global,
            apply_to_members: false,
            action: IncludeAction::Include,
        }
    }

    /// Restricts the include to one assembly.
    #[must_use]
    pub fn local(mut self, assembly: impl Into<String>) -> Self {
        self.scope = IncludeScope::Local(assembly.into());
        self
    }

    /// Extends the include to all members of matching types.
    #[must_use]
    pub fn apply_to_members(mut self) -> Self {
        self.apply_to_members = true;
        self
    }

    /// Extends the include to members whose name matches `member_pattern`.
    #[must_use]
    pub fn with_members(mut self, member_pattern: impl Into<Pattern>) -> Self {
        self.member_pattern = Some(member_pattern.into());
        self.apply_to_members = true;
        self
    }

    /// Turns the rule into an exclusion.
    #[must_use]
    pub fn exclude(mut self) -> Self {
        self.action = IncludeAction::Exclude;
        self
    }

    /// True if the rule covers `ty`.
    #[must_use]
    pub fn matches_type(&self, ty: &TypeDefinition) -> bool {
        self.scope.covers(ty.scope())
            && (self.type_pattern.matches(&ty.full_name())
                || ty
                    .class_name()
                    .is_some_and(|class_name| self.type_pattern.matches(class_name)))
    }

    /// True if the rule covers the member `name` of `ty`.
    #[must_use]
    pub fn matches_member(&self, ty: &TypeDefinition, name: &str) -> bool {
        self.apply_to_members
            && self.matches_type(ty)
            && self
                .member_pattern
                .as_ref()
                .is_none_or(|pattern| pattern.matches(name))
    }

    fn is_local(&self) -> bool {
        matches!(self.scope, IncludeScope::Local(_))
    }
}

/// Ordered pattern includes with precedence resolution.
///
/// Among the rules matching a definition, a local rule beats a global one, and within the
/// same scope the last declared rule wins.
#[derive(Debug, Clone, Default)]
pub struct PatternRules {
    rules: Vec<PatternInclude>,
}

impl PatternRules {
    /// Wraps rules in declaration order.
    #[must_use]
    pub fn new(rules: Vec<PatternInclude>) -> Self {
        PatternRules { rules }
    }

    /// True if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The deciding action for a type, `None` if no rule matches.
    #[must_use]
    pub fn decide_type(&self, ty: &TypeDefinition) -> Option<IncludeAction> {
        self.decide(|rule| rule.matches_type(ty))
    }

    /// The deciding action for a member, `None` if no rule matches.
    #[must_use]
    pub fn decide_member(&self, ty: &TypeDefinition, name: &str) -> Option<IncludeAction> {
        self.decide(|rule| rule.matches_member(ty, name))
    }

    fn decide(&self, matches: impl Fn(&PatternInclude) -> bool) -> Option<IncludeAction> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| matches(rule))
            .max_by_key(|(index, rule)| (rule.is_local(), *index))
            .map(|(_, rule)| rule.action)
    }
}

/// An explicit include of one type or member, optionally gated on another type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetInclude {
    /// Full name or JVM class name of the type
    pub type_name: String,
    /// Member name; `None` targets the type itself
    pub member: Option<String>,
    /// Type that must be reachable first
    pub condition: Option<String>,
}

impl TargetInclude {
    /// Parses `Namespace.Type` or `Namespace.Type::Member`.
    pub fn new(target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (type_name, member) = match target.split_once("::") {
            Some((ty, member)) => (ty.to_string(), Some(member.to_string())),
            None => (target.to_string(), None),
        };
        TargetInclude {
            type_name,
            member,
            condition: None,
        }
    }

    /// Gates the include on the named type.
    #[must_use]
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

impl fmt::Display for TargetInclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(member) = &self.member {
            write!(f, "::{member}")?;
        }
        if let Some(condition) = &self.condition {
            write!(f, " when {condition}")?;
        }
        Ok(())
    }
}

/// Includes a definition, unconditionally or once a condition type is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeConditionInclude {
    /// Type, method or field to include
    pub member: Token,
    /// Type that must be reachable first
    pub condition: Option<Token>,
}

impl TypeConditionInclude {
    /// True if the member should be marked now.
    #[must_use]
    pub fn is_satisfied(&self, reachable: &ReachableSet) -> bool {
        !reachable.contains(self.member)
            && self.condition.is_none_or(|condition| reachable.contains(condition))
    }
}

/// Includes every type assignable to a condition type.
#[derive(Debug, Clone)]
pub struct InstanceOfConditionInclude {
    condition: TypeDefinitionRc,
}

impl InstanceOfConditionInclude {
    /// Creates the include for `condition`.
    #[must_use]
    pub fn new(condition: TypeDefinitionRc) -> Self {
        InstanceOfConditionInclude { condition }
    }

    /// The condition type.
    #[must_use]
    pub fn condition(&self) -> &TypeDefinitionRc {
        &self.condition
    }

    /// True if `ty` is the condition type, or extends it (class condition), or implements it
    /// (interface condition).
    #[must_use]
    pub fn applies_to(&self, module: &Module, ty: &TypeDefinition) -> bool {
        ty.token() == self.condition.token() || module.is_instance_of(ty, &self.condition)
    }
}

/// Includes harvested from one assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblyIncludes {
    /// Type-condition includes, including unconditional ones
    pub conditional: Vec<TypeConditionInclude>,
    /// Instance-of condition includes
    pub instance_of: Vec<InstanceOfConditionInclude>,
}

impl AssemblyIncludes {
    /// True if nothing was harvested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditional.is_empty() && self.instance_of.is_empty()
    }

    /// Appends the includes harvested from more types of the same assembly.
    pub fn extend(&mut self, other: AssemblyIncludes) {
        self.conditional.extend(other.conditional);
        self.instance_of.extend(other.instance_of);
    }
}

/// True for `IncludeAttribute` and `IncludeTypeAttribute`.
#[must_use]
pub fn is_include_attribute(attribute: &CustomAttribute) -> bool {
    attribute.is(ATTRIBUTE_NAMESPACE, INCLUDE_ATTRIBUTE)
        || attribute.is(ATTRIBUTE_NAMESPACE, INCLUDE_TYPE_ATTRIBUTE)
}

/// Collects the include attributes of `types`, which should be all types of one assembly.
///
/// Attribute arguments that do not resolve are skipped.
#[must_use]
pub fn harvest(module: &Module, types: &[TypeDefinitionRc]) -> AssemblyIncludes {
    let mut includes = AssemblyIncludes::default();

    for ty in types {
        collect(module, ty.token(), ty.attributes(), &mut includes);

        let apply_to_members = ty.attributes().iter().any(|attribute| {
            attribute.is(ATTRIBUTE_NAMESPACE, INCLUDE_TYPE_ATTRIBUTE)
                || (is_include_attribute(attribute) && attribute.named_flag(APPLY_TO_MEMBERS))
        });

        for method in ty.methods() {
            collect(module, method.token, &method.attributes, &mut includes);
            if apply_to_members {
                includes.conditional.push(TypeConditionInclude {
                    member: method.token,
                    condition: Some(ty.token()),
                });
            }
        }
        for field in ty.fields() {
            collect(module, field.token, &field.attributes, &mut includes);
            if apply_to_members {
                includes.conditional.push(TypeConditionInclude {
                    member: field.token,
                    condition: Some(ty.token()),
                });
            }
        }
    }

    includes
}

fn collect(
    module: &Module,
    carrier: Token,
    attributes: &[CustomAttribute],
    includes: &mut AssemblyIncludes,
) {
    for attribute in attributes.iter().filter(|a| is_include_attribute(a)) {
        if let Some(reference) = attribute.named(INSTANCE_OF_CONDITION).and_then(AttributeValue::as_type) {
            match module.resolve(reference) {
                Some(condition) => includes
                    .instance_of
                    .push(InstanceOfConditionInclude::new(condition)),
                None => tracing::debug!("instance-of condition {reference} on {carrier} does not resolve"),
            }
            continue;
        }

        let condition = match attribute.named(TYPE_CONDITION).and_then(AttributeValue::as_type) {
            Some(reference) => match module.resolve_token(reference) {
                Some(token) => Some(token),
                None => {
                    // A condition that never resolves can never be met
                    tracing::debug!("type condition {reference} on {carrier} does not resolve");
                    continue;
                }
            },
            None => None,
        };

        let member = match attribute.named(INCLUDE_TYPE_ARGUMENT).and_then(AttributeValue::as_type) {
            Some(reference) => match module.resolve_token(reference) {
                Some(token) => token,
                None => {
                    tracing::debug!("include target {reference} on {carrier} does not resolve");
                    continue;
                }
            },
            None => carrier,
        };

        includes.conditional.push(TypeConditionInclude { member, condition });
    }
}
