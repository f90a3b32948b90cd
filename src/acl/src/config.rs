//! ACL configuration

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheBackend, FilesystemCache, MemoryCache};
use crate::compiler::{PolicyCompiler, Providers};
use crate::error::{AclError, Result};
use crate::provider::{ConfigResourceProvider, ConfigRoleProvider, ConfigRuleProvider};

/// Cache backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CacheSettings {
    /// No caching; every compiler builds
    None,

    /// In-process cache
    Memory,

    /// One JSON file per key under `directory`
    Filesystem { directory: PathBuf },
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings::Memory
    }
}

impl CacheSettings {
    /// Instantiate the selected backend
    pub fn backend(&self) -> Option<Arc<dyn CacheBackend>> {
        match self {
            CacheSettings::None => None,
            CacheSettings::Memory => Some(Arc::new(MemoryCache::new())),
            CacheSettings::Filesystem { directory } => {
                Some(Arc::new(FilesystemCache::new(directory.clone())))
            }
        }
    }
}

/// Provider documents, one provider per entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDocuments {
    pub role: Vec<Value>,
    pub resource: Vec<Value>,
    pub rule: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Key the compiled policy is cached under
    pub cache_key: String,

    pub cache: CacheSettings,

    /// Append a digest of the provider documents to the cache key
    pub fingerprint_key: bool,

    /// Role used for identities without any role
    pub default_role: Option<String>,

    pub providers: ProviderDocuments,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            cache_key: "cretoai-acl".to_string(),
            cache: CacheSettings::default(),
            fingerprint_key: false,
            default_role: None,
            providers: ProviderDocuments::default(),
        }
    }
}

impl AclConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AclConfig =
            serde_json::from_str(json).map_err(|e| AclError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ACL configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_key.trim().is_empty() {
            return Err(AclError::InvalidConfig("cache_key must not be empty".to_string()));
        }
        if let CacheSettings::Filesystem { directory } = &self.cache {
            if directory.as_os_str().is_empty() {
                return Err(AclError::InvalidConfig(
                    "filesystem cache requires a directory".to_string(),
                ));
            }
        }
        if let Some(role) = &self.default_role {
            if role.is_empty() {
                return Err(AclError::InvalidConfig("default_role must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Hex blake3 digest of the provider documents
    ///
    /// Object keys are hashed in sorted order, so reformatting a document does
    /// not change its fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (section, documents) in [
            ("role", &self.providers.role),
            ("resource", &self.providers.resource),
            ("rule", &self.providers.rule),
        ] {
            hasher.update(section.as_bytes());
            for document in documents {
                hasher.update(&[0]);
                hasher.update(document.to_string().as_bytes());
            }
            hasher.update(&[0xff]);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Cache key, suffixed with the fingerprint when `fingerprint_key` is set
    pub fn effective_cache_key(&self) -> String {
        if self.fingerprint_key {
            format!("{}-{}", self.cache_key, &self.fingerprint()[..16])
        } else {
            self.cache_key.clone()
        }
    }

    /// Config-backed providers in document order
    pub fn build_providers(&self) -> Providers {
        let mut providers = Providers::default();
        for (i, document) in self.providers.role.iter().enumerate() {
            providers.roles.push(Arc::new(ConfigRoleProvider::new(
                format!("config.role[{}]", i),
                document.clone(),
            )));
        }
        for (i, document) in self.providers.resource.iter().enumerate() {
            providers.resources.push(Arc::new(ConfigResourceProvider::new(
                format!("config.resource[{}]", i),
                document.clone(),
            )));
        }
        for (i, document) in self.providers.rule.iter().enumerate() {
            providers.rules.push(Arc::new(ConfigRuleProvider::new(
                format!("config.rule[{}]", i),
                document.clone(),
            )));
        }
        providers
    }
}

impl PolicyCompiler {
    /// Compiler for `config`, with the configured cache backend
    pub fn from_config(config: &AclConfig) -> Result<Self> {
        Self::from_config_with_cache(config, config.cache.backend())
    }

    /// Compiler for `config` sharing an existing cache backend
    pub fn from_config_with_cache(
        config: &AclConfig,
        cache: Option<Arc<dyn CacheBackend>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(PolicyCompiler::new(
            config.effective_cache_key(),
            config.build_providers(),
            cache,
        ))
    }
}
