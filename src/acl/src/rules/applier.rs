//! Rule applier: validates rules against the merged graphs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use super::types::Rule;
use crate::error::{AclError, Result};
use crate::provider::RuleProvider;
use crate::resources::ResourceTree;
use crate::roles::RoleGraph;

/// Rules in evaluation order (provider registration order, then provider order)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Whether every rule can be written to a persistent cache
    pub fn is_serializable(&self) -> bool {
        self.rules
            .iter()
            .all(|r| r.assertion.as_ref().map_or(true, |a| a.is_serializable()))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Concatenates rules from every provider and checks their references
pub struct RuleApplier<'g> {
    roles: &'g RoleGraph,
    resources: &'g ResourceTree,
    privileges: BTreeSet<&'g str>,
    rules: Vec<Rule>,
}

impl<'g> RuleApplier<'g> {
    pub fn new(roles: &'g RoleGraph, resources: &'g ResourceTree) -> Self {
        Self {
            roles,
            resources,
            privileges: resources.privileges(),
            rules: Vec::new(),
        }
    }

    /// Apply every provider in order
    pub fn apply(
        roles: &'g RoleGraph,
        resources: &'g ResourceTree,
        providers: &[Arc<dyn RuleProvider>],
    ) -> Result<RuleSet> {
        let mut applier = Self::new(roles, resources);
        for provider in providers {
            applier.collect(provider.as_ref())?;
        }
        Ok(applier.finish())
    }

    /// Drain one provider
    pub fn collect(&mut self, provider: &dyn RuleProvider) -> Result<usize> {
        let mut count = 0;
        for rule in provider.get_rules()? {
            self.add_rule(rule)?;
            count += 1;
        }
        debug!("Rule provider '{}' contributed {} rules", provider.name(), count);
        Ok(count)
    }

    /// Validate and append one rule
    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        let position = self.rules.len();
        let unknown = |kind: &'static str, id: &str| AclError::UnknownRuleReference {
            rule: position,
            kind,
            id: id.to_string(),
        };

        if let Some(role) = rule.roles.ids().iter().find(|r| !self.roles.contains(r)) {
            return Err(unknown("role", role));
        }
        if let Some(resource) = rule
            .resources
            .ids()
            .iter()
            .find(|r| !self.resources.contains(r))
        {
            return Err(unknown("resource", resource));
        }
        // Without any declared privileges the vocabulary is open
        if !self.privileges.is_empty() {
            if let Some(privilege) = rule
                .privileges
                .ids()
                .iter()
                .find(|p| !self.privileges.contains(p.as_str()))
            {
                return Err(unknown("privilege", privilege));
            }
        }

        self.rules.push(rule);
        Ok(())
    }

    pub fn finish(self) -> RuleSet {
        RuleSet { rules: self.rules }
    }
}
