//! Compiled policy and query interface
//!
//! A [`CompiledPolicy`] is an immutable snapshot of the role graph, the resource
//! tree and the ordered rule list. It is shared by `Arc` among concurrent
//! queries and replaced, never mutated, when configuration changes.
//!
//! # Evaluation
//!
//! For `is_allowed(role, resource, privilege)` the resource chain is walked from
//! the queried resource up to its root. At each resource the role chain is
//! walked from the queried role through its ancestors (see
//! [`RoleGraph::ancestry`]). At each (resource, role) step the rules are scanned
//! from the last registered to the first, and the first rule that covers the
//! step and whose assertion passes decides. Wildcard rules take part in every
//! step, so precedence among rules matching the same step is purely
//! registration order. Nothing matching means deny.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::cel::{Engine as CelEngine, EvalContext};
use crate::error::{AclError, Result};
use crate::resources::ResourceTree;
use crate::roles::RoleGraph;
use crate::rules::{AccessQuery, Assertion, Rule, RuleSet};
use crate::types::Effect;

/// Outcome of a query, with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,

    /// Index of the deciding rule in registration order
    pub rule: Option<usize>,

    /// Role at which the deciding rule matched
    pub matched_role: Option<String>,

    /// Resource at which the deciding rule matched
    pub matched_resource: Option<String>,
}

impl Decision {
    pub(crate) fn default_deny() -> Self {
        Self {
            allowed: false,
            rule: None,
            matched_role: None,
            matched_resource: None,
        }
    }

    /// Whether the decision came from the deny-by-default base policy
    pub fn is_default(&self) -> bool {
        self.rule.is_none()
    }
}

/// Immutable compiled ACL
#[derive(Debug, Serialize, Deserialize)]
pub struct CompiledPolicy {
    roles: RoleGraph,
    resources: ResourceTree,
    rules: RuleSet,

    /// Compilation time (milliseconds since epoch)
    compiled_at: u64,

    #[serde(skip)]
    expressions: CelEngine,
}

impl CompiledPolicy {
    pub fn new(roles: RoleGraph, resources: ResourceTree, rules: RuleSet) -> Self {
        let compiled_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            roles,
            resources,
            rules,
            compiled_at,
            expressions: CelEngine::new(),
        }
    }

    pub fn roles(&self) -> &RoleGraph {
        &self.roles
    }

    pub fn resources(&self) -> &ResourceTree {
        &self.resources
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn compiled_at(&self) -> u64 {
        self.compiled_at
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_resource(&self, resource: &str) -> bool {
        self.resources.contains(resource)
    }

    /// Whether any resource declares `privilege`
    pub fn has_privilege(&self, privilege: &str) -> bool {
        self.resources.privileges().contains(privilege)
    }

    pub fn inherits_role(&self, role: &str, ancestor: &str, only_direct: bool) -> Result<bool> {
        self.roles.inherits(role, ancestor, only_direct)
    }

    pub fn inherits_resource(
        &self,
        resource: &str,
        ancestor: &str,
        only_direct: bool,
    ) -> Result<bool> {
        self.resources.inherits(resource, ancestor, only_direct)
    }

    /// Is `role` allowed `privilege` on `resource`?
    pub fn is_allowed(
        &self,
        role: &str,
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<bool> {
        Ok(self.explain(role, resource, privilege, context)?.allowed)
    }

    /// Like [`is_allowed`](Self::is_allowed) for an identity holding several
    /// roles. Later roles take precedence over earlier ones.
    pub fn is_allowed_any(
        &self,
        roles: &[&str],
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<bool> {
        Ok(self.explain_any(roles, resource, privilege, context)?.allowed)
    }

    /// Full decision for a single role
    pub fn explain(
        &self,
        role: &str,
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<Decision> {
        self.explain_any(&[role], resource, privilege, context)
    }

    /// Full decision for an identity holding several roles
    pub fn explain_any(
        &self,
        roles: &[&str],
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<Decision> {
        if let Some(unknown) = roles.iter().find(|r| !self.roles.contains(r)) {
            return Err(AclError::unknown_role(*unknown));
        }
        if !self.resources.contains(resource) {
            return Err(AclError::unknown_resource(resource));
        }

        let role_chain = self.roles.ancestry(roles);
        for level in self.resources.ancestry(resource) {
            for &role in &role_chain {
                let matched = self.rules.iter().enumerate().rev().find(|(_, rule)| {
                    rule.covers(role, level, privilege)
                        && self.assertion_passes(rule, role, resource, privilege, context)
                });

                if let Some((index, rule)) = matched {
                    debug!(
                        "Rule #{} ({}) decided {} on {} for {} at {}/{}",
                        index, rule.effect, privilege, resource, roles.join(","), role, level
                    );
                    return Ok(Decision {
                        allowed: rule.effect == Effect::Allow,
                        rule: Some(index),
                        matched_role: Some(role.to_string()),
                        matched_resource: Some(level.to_string()),
                    });
                }
            }
        }

        debug!("No rule matched {} on {}, default deny", privilege, resource);
        Ok(Decision::default_deny())
    }

    fn assertion_passes(
        &self,
        rule: &Rule,
        role: &str,
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> bool {
        let query = AccessQuery {
            role,
            resource,
            privilege,
        };

        match &rule.assertion {
            None => true,
            Some(Assertion::Callback(assertion)) => assertion.assert(&query, context),
            Some(Assertion::Expression(expr)) => {
                match self.expressions.evaluate_expression(expr, &query, context) {
                    Ok(passed) => passed,
                    Err(e) => {
                        warn!("Assertion '{}' failed to evaluate: {}", expr, e);
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceTreeBuilder;
    use crate::roles::RoleGraphBuilder;
    use crate::rules::RuleApplier;
    use crate::types::{ResourceEntry, RoleEntry, Target};

    fn policy(rules: Vec<Rule>) -> CompiledPolicy {
        let mut roles = RoleGraphBuilder::new();
        roles.add_role(RoleEntry::new("guest")).unwrap();
        roles.add_role(RoleEntry::new("user").with_parent("guest")).unwrap();
        roles.add_role(RoleEntry::new("admin").with_parent("user")).unwrap();
        let roles = roles.build().unwrap();

        let mut resources = ResourceTreeBuilder::new();
        resources.add_resource(ResourceEntry::new("docs")).unwrap();
        resources
            .add_resource(ResourceEntry::new("docs.private").with_parent("docs"))
            .unwrap();
        let resources = resources.build().unwrap();

        let mut applier = RuleApplier::new(&roles, &resources);
        for rule in rules {
            applier.add_rule(rule).unwrap();
        }
        let rules = applier.finish();
        CompiledPolicy::new(roles, resources, rules)
    }

    #[test]
    fn test_default_deny() {
        let policy = policy(vec![]);
        let decision = policy.explain("admin", "docs", "read", &EvalContext::new()).unwrap();
        assert!(!decision.allowed);
        assert!(decision.is_default());
    }

    #[test]
    fn test_inherited_grant() {
        let policy = policy(vec![Rule::allow("guest", "docs", "read")]);
        let ctx = EvalContext::new();

        assert!(policy.is_allowed("admin", "docs.private", "read", &ctx).unwrap());
        let decision = policy.explain("admin", "docs.private", "read", &ctx).unwrap();
        assert_eq!(decision.matched_role.as_deref(), Some("guest"));
        assert_eq!(decision.matched_resource.as_deref(), Some("docs"));
    }

    #[test]
    fn test_closer_resource_overrides() {
        let policy = policy(vec![
            Rule::deny("guest", "docs.private", "read"),
            Rule::allow("guest", "docs", "read"),
        ]);
        let ctx = EvalContext::new();

        assert!(!policy.is_allowed("user", "docs.private", "read", &ctx).unwrap());
        assert!(policy.is_allowed("user", "docs", "read", &ctx).unwrap());
    }

    #[test]
    fn test_closer_role_overrides() {
        let policy = policy(vec![
            Rule::allow("admin", "docs", "edit"),
            Rule::deny("user", "docs", "edit"),
        ]);
        let ctx = EvalContext::new();

        assert!(policy.is_allowed("admin", "docs", "edit", &ctx).unwrap());
        assert!(!policy.is_allowed("user", "docs", "edit", &ctx).unwrap());
    }

    #[test]
    fn test_wildcards_follow_registration_order() {
        let policy = policy(vec![
            Rule::allow("admin", "docs", "edit"),
            Rule::deny(Target::all(), Target::all(), Target::all()),
        ]);
        assert!(!policy.is_allowed("admin", "docs", "edit", &EvalContext::new()).unwrap());
    }

    #[test]
    fn test_failed_assertion_skips_rule() {
        let policy = policy(vec![
            Rule::allow("guest", "docs", "read"),
            Rule::deny("guest", "docs", "read").when("context.maintenance == true"),
        ]);

        let normal = EvalContext::new().var("maintenance", false);
        let maintenance = EvalContext::new().var("maintenance", true);
        assert!(policy.is_allowed("guest", "docs", "read", &normal).unwrap());
        assert!(!policy.is_allowed("guest", "docs", "read", &maintenance).unwrap());
    }

    #[test]
    fn test_broken_expression_does_not_match() {
        let policy = policy(vec![
            Rule::allow("guest", "docs", "read"),
            Rule::deny("guest", "docs", "read").when("this is not cel @#$"),
        ]);
        assert!(policy.is_allowed("guest", "docs", "read", &EvalContext::new()).unwrap());
    }

    #[test]
    fn test_unknown_identifiers() {
        let policy = policy(vec![]);
        let ctx = EvalContext::new();

        assert!(matches!(
            policy.is_allowed("ghost", "docs", "read", &ctx),
            Err(AclError::UnknownIdentifier { kind: "role", .. })
        ));
        assert!(matches!(
            policy.is_allowed("guest", "images", "read", &ctx),
            Err(AclError::UnknownIdentifier { kind: "resource", .. })
        ));
    }

    #[test]
    fn test_multiple_identity_roles() {
        let mut roles = RoleGraphBuilder::new();
        roles.add_role(RoleEntry::new("reader")).unwrap();
        roles.add_role(RoleEntry::new("banned")).unwrap();
        let roles = roles.build().unwrap();
        let mut resources = ResourceTreeBuilder::new();
        resources.add_resource(ResourceEntry::new("docs")).unwrap();
        let resources = resources.build().unwrap();
        let mut applier = RuleApplier::new(&roles, &resources);
        applier.add_rule(Rule::allow("reader", "docs", "read")).unwrap();
        applier.add_rule(Rule::deny("banned", "docs", "read")).unwrap();
        let rules = applier.finish();
        let policy = CompiledPolicy::new(roles, resources, rules);
        let ctx = EvalContext::new();

        assert!(!policy.is_allowed_any(&["reader", "banned"], "docs", "read", &ctx).unwrap());
        assert!(policy.is_allowed_any(&["banned", "reader"], "docs", "read", &ctx).unwrap());
    }

    #[test]
    fn test_serde_round_trip_keeps_behaviour() {
        let original = policy(vec![Rule::allow("user", "docs", "read").when("principal.active == true")]);
        let json = serde_json::to_string(&original).unwrap();
        let restored: CompiledPolicy = serde_json::from_str(&json).unwrap();

        let ctx = EvalContext::new().principal_attr("active", true);
        assert!(restored.is_allowed("admin", "docs.private", "read", &ctx).unwrap());
        assert_eq!(restored.compiled_at(), original.compiled_at());
    }
}
