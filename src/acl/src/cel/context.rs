//! Request-time context handed to rule assertions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::rules::AccessQuery;

/// Variables available to assertions while a query is evaluated
///
/// The compiled policy never stores a context; callers build one per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalContext {
    /// Identity attributes (user id, department, ...)
    pub principal: HashMap<String, Value>,

    /// Attributes of the concrete object being accessed (owner, state, ...)
    pub resource: HashMap<String, Value>,

    /// Request metadata (time, ip, ...)
    pub request: HashMap<String, Value>,

    /// Free-form variables
    pub context: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: HashMap<String, Value>) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_resource(mut self, resource: HashMap<String, Value>) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_request(mut self, request: HashMap<String, Value>) -> Self {
        self.request = request;
        self
    }

    /// Set a single principal attribute
    pub fn principal_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.principal.insert(key.into(), value.into());
        self
    }

    /// Set a single resource attribute
    pub fn resource_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.resource.insert(key.into(), value.into());
        self
    }

    /// Set a single free-form variable
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Flatten into CEL variables.
    ///
    /// `request.role`, `request.resource` and `request.privilege` are taken from
    /// the query and shadow caller-supplied keys of the same name.
    pub fn to_variables(&self, query: &AccessQuery<'_>) -> HashMap<String, Value> {
        let object = |map: &HashMap<String, Value>| {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        };

        let mut request = self.request.clone();
        request.insert("role".to_string(), Value::String(query.role.to_string()));
        request.insert("resource".to_string(), Value::String(query.resource.to_string()));
        request.insert("privilege".to_string(), Value::String(query.privilege.to_string()));

        let mut vars = HashMap::new();
        vars.insert("principal".to_string(), object(&self.principal));
        vars.insert("P".to_string(), object(&self.principal));
        vars.insert("resource".to_string(), object(&self.resource));
        vars.insert("R".to_string(), object(&self.resource));
        vars.insert("request".to_string(), object(&request));
        vars.insert("context".to_string(), object(&self.context));
        vars
    }
}
