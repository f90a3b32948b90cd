//! Identity-based authorization
//!
//! [`Authorizer`] answers "may the current identity do this?" by resolving the
//! identity's roles and querying the compiled policy with all of them.

use std::sync::Arc;
use tracing::debug;

use crate::cel::EvalContext;
use crate::compiler::PolicyCompiler;
use crate::config::AclConfig;
use crate::error::{AclError, Result};
use crate::policy::Decision;
use crate::types::RoleId;

/// Source of the roles held by the current identity
pub trait IdentityProvider: Send + Sync {
    /// Roles in increasing precedence
    fn identity_roles(&self) -> Vec<RoleId>;
}

/// Identity with a fixed role list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    roles: Vec<RoleId>,
}

impl StaticIdentity {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Identity without roles
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity_roles(&self) -> Vec<RoleId> {
        self.roles.clone()
    }
}

/// Authorization façade over a compiler and an identity
pub struct Authorizer {
    compiler: Arc<PolicyCompiler>,
    identity: Arc<dyn IdentityProvider>,
    default_role: Option<RoleId>,
}

impl Authorizer {
    pub fn new(compiler: Arc<PolicyCompiler>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            compiler,
            identity,
            default_role: None,
        }
    }

    /// Authorizer for `config`; the compiler uses the configured cache
    pub fn from_config(config: &AclConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let compiler = Arc::new(PolicyCompiler::from_config(config)?);
        let mut authorizer = Self::new(compiler, identity);
        authorizer.default_role = config.default_role.clone();
        Ok(authorizer)
    }

    /// Role assumed when the identity holds none
    pub fn with_default_role(mut self, role: impl Into<RoleId>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    pub fn compiler(&self) -> &Arc<PolicyCompiler> {
        &self.compiler
    }

    /// Effective roles: the identity's, or the default role
    pub fn roles(&self) -> Vec<RoleId> {
        let roles = self.identity.identity_roles();
        if roles.is_empty() {
            self.default_role.iter().cloned().collect()
        } else {
            roles
        }
    }

    pub fn is_allowed(
        &self,
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<bool> {
        Ok(self.explain(resource, privilege, context)?.allowed)
    }

    pub fn explain(
        &self,
        resource: &str,
        privilege: &str,
        context: &EvalContext,
    ) -> Result<Decision> {
        let roles = self.roles();
        let policy = self.compiler.compiled_policy()?;

        if roles.is_empty() {
            debug!(
                "Identity has no roles and no default role, denying {} on {}",
                privilege, resource
            );
            if !policy.has_resource(resource) {
                return Err(AclError::unknown_resource(resource));
            }
            return Ok(Decision::default_deny());
        }

        let refs: Vec<&str> = roles.iter().map(String::as_str).collect();
        policy.explain_any(&refs, resource, privilege, context)
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("compiler", &self.compiler)
            .field("roles", &self.roles())
            .field("default_role", &self.default_role)
            .finish()
    }
}
