//! Rule type definitions

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cel::EvalContext;
use crate::types::{Effect, Target};

/// The question being answered when an assertion runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessQuery<'a> {
    /// Role whose rule is being checked; an ancestor of the queried role when
    /// the rule was inherited
    pub role: &'a str,
    /// Queried resource
    pub resource: &'a str,
    pub privilege: &'a str,
}

/// In-process dynamic predicate
pub trait AssertionFn: Send + Sync {
    fn assert(&self, query: &AccessQuery<'_>, context: &EvalContext) -> bool;
}

impl<F> AssertionFn for F
where
    F: Fn(&AccessQuery<'_>, &EvalContext) -> bool + Send + Sync,
{
    fn assert(&self, query: &AccessQuery<'_>, context: &EvalContext) -> bool {
        self(query, context)
    }
}

/// Dynamic predicate gating a rule, evaluated lazily at query time
///
/// Expressions survive serialization into a persistent cache; callbacks do not,
/// so a policy carrying one can only be cached in memory.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assertion {
    /// CEL expression
    Expression(String),

    /// Native predicate
    #[serde(skip)]
    Callback(Arc<dyn AssertionFn>),
}

impl Assertion {
    pub fn expression(expr: impl Into<String>) -> Self {
        Assertion::Expression(expr.into())
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&AccessQuery<'_>, &EvalContext) -> bool + Send + Sync + 'static,
    {
        Assertion::Callback(Arc::new(f))
    }

    /// Whether the assertion can be written to a persistent cache
    pub fn is_serializable(&self) -> bool {
        matches!(self, Assertion::Expression(_))
    }
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assertion::Expression(expr) => f.debug_tuple("Expression").field(expr).finish(),
            Assertion::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Allow/deny statement over roles × resources × privileges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub effect: Effect,
    pub roles: Target,
    pub resources: Target,
    pub privileges: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
}

impl Rule {
    pub fn new(
        effect: Effect,
        roles: impl Into<Target>,
        resources: impl Into<Target>,
        privileges: impl Into<Target>,
    ) -> Self {
        Self {
            effect,
            roles: roles.into(),
            resources: resources.into(),
            privileges: privileges.into(),
            assertion: None,
        }
    }

    pub fn allow(
        roles: impl Into<Target>,
        resources: impl Into<Target>,
        privileges: impl Into<Target>,
    ) -> Self {
        Self::new(Effect::Allow, roles, resources, privileges)
    }

    pub fn deny(
        roles: impl Into<Target>,
        resources: impl Into<Target>,
        privileges: impl Into<Target>,
    ) -> Self {
        Self::new(Effect::Deny, roles, resources, privileges)
    }

    /// Gate the rule on a CEL expression
    pub fn when(mut self, expr: impl Into<String>) -> Self {
        self.assertion = Some(Assertion::Expression(expr.into()));
        self
    }

    /// Gate the rule on an arbitrary assertion
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    /// Static part of the match: role, resource and privilege coverage
    pub fn covers(&self, role: &str, resource: &str, privilege: &str) -> bool {
        self.roles.matches(role) && self.resources.matches(resource) && self.privileges.matches(privilege)
    }
}
