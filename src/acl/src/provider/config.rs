//! Providers reading ACL definitions from JSON configuration documents
//!
//! Role documents:
//!
//! ```json
//! { "guest": {}, "user": { "parents": ["guest"], "children": { "admin": {} } } }
//! ["guest", { "id": "user", "parents": ["guest"] }]
//! ```
//!
//! Resource documents:
//!
//! ```json
//! { "docs": { "privileges": ["read"], "children": { "docs.private": {} } } }
//! ["docs", { "id": "docs.private", "parent": "docs" }]
//! ```
//!
//! Rule documents list `allow` rules before `deny` rules; each rule is
//! `[roles, resources, privileges?, assertion?]` where `null` means "all":
//!
//! ```json
//! { "allow": [[["guest", "user"], "docs", ["read"]]], "deny": [["guest", "docs.private"]] }
//! [{ "effect": "allow", "roles": "user", "resources": null, "privileges": "read" }]
//! ```
//!
//! A scalar document is rejected with `InvalidProviderOutput`.

use serde_json::{Map, Value};

use super::{Entries, ResourceProvider, RoleProvider, RuleProvider};
use crate::error::{AclError, Result};
use crate::rules::{Assertion, Rule};
use crate::types::{Effect, ResourceEntry, RoleEntry, Target};

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn not_a_collection(provider: &str, value: &Value) -> AclError {
    AclError::invalid_output(
        provider,
        format!("expected an array or object, got {}", describe(value)),
    )
}

/// String, array of strings, or null (all)
fn parse_target(provider: &str, field: &str, value: Option<&Value>) -> Result<Target> {
    match value {
        None | Some(Value::Null) => Ok(Target::All),
        Some(Value::String(id)) => Ok(Target::from(id.clone())),
        Some(Value::Array(items)) => {
            let ids = items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        AclError::invalid_output(
                            provider,
                            format!("'{}' entries must be strings, got {}", field, describe(item)),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Target::Only(ids))
        }
        Some(other) => Err(AclError::invalid_output(
            provider,
            format!("'{}' must be a string, array or null, got {}", field, describe(other)),
        )),
    }
}

fn parse_id_list(provider: &str, field: &str, value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        some => Ok(parse_target(provider, field, some)?.ids().to_vec()),
    }
}

/// Role provider over a JSON document
#[derive(Debug, Clone)]
pub struct ConfigRoleProvider {
    name: String,
    document: Value,
}

impl ConfigRoleProvider {
    pub fn new(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    fn collect_map(
        &self,
        map: &Map<String, Value>,
        parent: Option<&str>,
        out: &mut Vec<RoleEntry>,
    ) -> Result<()> {
        for (id, spec) in map {
            let mut entry = RoleEntry::new(id.clone());
            if let Some(parent) = parent {
                entry.parents.push(parent.to_string());
            }

            match spec {
                Value::Null => out.push(entry),
                Value::Object(fields) => {
                    entry
                        .parents
                        .extend(parse_id_list(&self.name, "parents", fields.get("parents"))?);
                    out.push(entry);
                    self.collect_children(fields.get("children"), id, out)?;
                }
                other => {
                    return Err(AclError::invalid_output(
                        &self.name,
                        format!("role '{}' must map to an object, got {}", id, describe(other)),
                    ))
                }
            }
        }
        Ok(())
    }

    fn collect_children(
        &self,
        children: Option<&Value>,
        parent: &str,
        out: &mut Vec<RoleEntry>,
    ) -> Result<()> {
        match children {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Object(map)) => self.collect_map(map, Some(parent), out),
            Some(Value::Array(items)) => {
                for item in items {
                    let mut entry = self.parse_item(item)?;
                    entry.parents.push(parent.to_string());
                    out.push(entry);
                }
                Ok(())
            }
            Some(other) => Err(not_a_collection(&self.name, other)),
        }
    }

    fn parse_item(&self, item: &Value) -> Result<RoleEntry> {
        match item {
            Value::String(id) => Ok(RoleEntry::new(id.clone())),
            Value::Object(_) => serde_json::from_value(item.clone())
                .map_err(|e| AclError::invalid_output(&self.name, e.to_string())),
            other => Err(AclError::invalid_output(
                &self.name,
                format!("role entries must be strings or objects, got {}", describe(other)),
            )),
        }
    }
}

impl RoleProvider for ConfigRoleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_roles(&self) -> Result<Entries<'_, RoleEntry>> {
        let mut roles = Vec::new();
        match &self.document {
            Value::Object(map) => self.collect_map(map, None, &mut roles)?,
            Value::Array(items) => {
                for item in items {
                    roles.push(self.parse_item(item)?);
                }
            }
            other => return Err(not_a_collection(&self.name, other)),
        }
        Ok(Box::new(roles.into_iter()))
    }
}

/// Resource provider over a JSON document
#[derive(Debug, Clone)]
pub struct ConfigResourceProvider {
    name: String,
    document: Value,
}

impl ConfigResourceProvider {
    pub fn new(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    fn collect_map(
        &self,
        map: &Map<String, Value>,
        parent: Option<&str>,
        out: &mut Vec<ResourceEntry>,
    ) -> Result<()> {
        for (id, spec) in map {
            let mut entry = ResourceEntry::new(id.clone());
            entry.parent = parent.map(str::to_string);

            match spec {
                Value::Null => out.push(entry),
                Value::Object(fields) => {
                    if let Some(explicit) = fields.get("parent").and_then(Value::as_str) {
                        entry.parent = Some(explicit.to_string());
                    }
                    entry.privileges =
                        parse_id_list(&self.name, "privileges", fields.get("privileges"))?;
                    out.push(entry);
                    self.collect_children(fields.get("children"), id, out)?;
                }
                other => {
                    return Err(AclError::invalid_output(
                        &self.name,
                        format!("resource '{}' must map to an object, got {}", id, describe(other)),
                    ))
                }
            }
        }
        Ok(())
    }

    fn collect_children(
        &self,
        children: Option<&Value>,
        parent: &str,
        out: &mut Vec<ResourceEntry>,
    ) -> Result<()> {
        match children {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Object(map)) => self.collect_map(map, Some(parent), out),
            Some(Value::Array(items)) => {
                for item in items {
                    let mut entry = self.parse_item(item)?;
                    entry.parent = Some(parent.to_string());
                    out.push(entry);
                }
                Ok(())
            }
            Some(other) => Err(not_a_collection(&self.name, other)),
        }
    }

    fn parse_item(&self, item: &Value) -> Result<ResourceEntry> {
        match item {
            Value::String(id) => Ok(ResourceEntry::new(id.clone())),
            Value::Object(_) => serde_json::from_value(item.clone())
                .map_err(|e| AclError::invalid_output(&self.name, e.to_string())),
            other => Err(AclError::invalid_output(
                &self.name,
                format!("resource entries must be strings or objects, got {}", describe(other)),
            )),
        }
    }
}

impl ResourceProvider for ConfigResourceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_resources(&self) -> Result<Entries<'_, ResourceEntry>> {
        let mut resources = Vec::new();
        match &self.document {
            Value::Object(map) => self.collect_map(map, None, &mut resources)?,
            Value::Array(items) => {
                for item in items {
                    resources.push(self.parse_item(item)?);
                }
            }
            other => return Err(not_a_collection(&self.name, other)),
        }
        Ok(Box::new(resources.into_iter()))
    }
}

/// Rule provider over a JSON document
#[derive(Debug, Clone)]
pub struct ConfigRuleProvider {
    name: String,
    document: Value,
}

impl ConfigRuleProvider {
    pub fn new(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }

    fn parse_assertion(&self, value: Option<&Value>) -> Result<Option<Assertion>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(expr)) => Ok(Some(Assertion::Expression(expr.clone()))),
            Some(other) => Err(AclError::invalid_output(
                &self.name,
                format!("assertions must be CEL expression strings, got {}", describe(other)),
            )),
        }
    }

    /// `[roles, resources, privileges?, assertion?]`
    fn parse_tuple(&self, effect: Effect, item: &Value) -> Result<Rule> {
        let parts = item.as_array().ok_or_else(|| {
            AclError::invalid_output(
                &self.name,
                format!("{} rules must be arrays, got {}", effect, describe(item)),
            )
        })?;
        if parts.len() < 2 || parts.len() > 4 {
            return Err(AclError::invalid_output(
                &self.name,
                format!("{} rules take 2 to 4 elements, got {}", effect, parts.len()),
            ));
        }

        Ok(Rule {
            effect,
            roles: parse_target(&self.name, "roles", parts.first())?,
            resources: parse_target(&self.name, "resources", parts.get(1))?,
            privileges: parse_target(&self.name, "privileges", parts.get(2))?,
            assertion: self.parse_assertion(parts.get(3))?,
        })
    }

    /// `{ "effect", "roles", "resources", "privileges", "assertion" }`
    fn parse_object(&self, item: &Value) -> Result<Rule> {
        let fields = item.as_object().ok_or_else(|| {
            AclError::invalid_output(
                &self.name,
                format!("rules must be objects, got {}", describe(item)),
            )
        })?;
        let effect: Effect = fields
            .get("effect")
            .cloned()
            .map(serde_json::from_value::<Effect>)
            .transpose()
            .map_err(|e| AclError::invalid_output(&self.name, e.to_string()))?
            .ok_or_else(|| AclError::invalid_output(&self.name, "rule is missing 'effect'"))?;

        Ok(Rule {
            effect,
            roles: parse_target(&self.name, "roles", fields.get("roles"))?,
            resources: parse_target(&self.name, "resources", fields.get("resources"))?,
            privileges: parse_target(&self.name, "privileges", fields.get("privileges"))?,
            assertion: self.parse_assertion(fields.get("assertion"))?,
        })
    }
}

impl RuleProvider for ConfigRuleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_rules(&self) -> Result<Entries<'_, Rule>> {
        let mut rules = Vec::new();
        match &self.document {
            Value::Object(sections) => {
                for key in sections.keys() {
                    if key != "allow" && key != "deny" {
                        return Err(AclError::invalid_output(
                            &self.name,
                            format!("unknown rule section '{}'", key),
                        ));
                    }
                }
                for (key, effect) in [("allow", Effect::Allow), ("deny", Effect::Deny)] {
                    match sections.get(key) {
                        None | Some(Value::Null) => {}
                        Some(Value::Array(items)) => {
                            for item in items {
                                rules.push(self.parse_tuple(effect, item)?);
                            }
                        }
                        Some(other) => return Err(not_a_collection(&self.name, other)),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    rules.push(self.parse_object(item)?);
                }
            }
            other => return Err(not_a_collection(&self.name, other)),
        }
        Ok(Box::new(rules.into_iter()))
    }
}
