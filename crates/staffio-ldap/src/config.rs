//! Directory source configuration.

use serde::{Deserialize, Serialize};

use crate::fanout::FanOutPolicy;

/// One directory endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory URL, e.g. `ldap://ldap.example.org:389`.
    pub addr: String,

    /// Base DN of the tree, e.g. `dc=example,dc=org`.
    pub base: String,

    /// Base DN for people. Defaults to `ou=people,<base>`.
    #[serde(default)]
    pub user_base: Option<String>,

    /// Administrative bind DN used for resets and lookups.
    #[serde(default)]
    pub bind_dn: String,

    /// Administrative bind password.
    #[serde(default, skip_serializing)]
    pub bind_password: String,

    /// Connect and operation timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_timeout() -> u64 {
    5000
}

impl SourceConfig {
    /// Creates a source with no administrative identity.
    #[must_use]
    pub fn new(addr: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            base: base.into(),
            user_base: None,
            bind_dn: String::new(),
            bind_password: String::new(),
            timeout_ms: default_timeout(),
        }
    }

    /// Sets the administrative identity.
    #[must_use]
    pub fn with_admin(mut self, bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_password = password.into();
        self
    }

    /// Overrides the people base.
    #[must_use]
    pub fn with_user_base(mut self, user_base: impl Into<String>) -> Self {
        self.user_base = Some(user_base.into());
        self
    }

    /// Base DN under which user entries live.
    #[must_use]
    pub fn user_base(&self) -> String {
        match &self.user_base {
            Some(base) if !base.is_empty() => base.clone(),
            _ => format!("ou=people,{}", self.base),
        }
    }

    /// Checks the fields every source needs.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.addr.trim().is_empty() {
            return Err("directory source addr must not be empty".into());
        }
        if self.base.trim().is_empty() {
            return Err(format!("directory source {} has an empty base", self.addr));
        }
        if self.timeout_ms == 0 {
            return Err(format!("directory source {} timeout_ms must be > 0", self.addr));
        }
        Ok(())
    }
}

/// Ordered set of sources plus the fan-out policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Sources in fan-out order. The first is the primary.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// How password fan-out outcomes are combined.
    #[serde(default)]
    pub policy: FanOutPolicy,
}

impl DirectoryConfig {
    /// Checks every source and the policy.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.sources.is_empty() {
            return Err("directory.sources must not be empty".into());
        }
        for source in &self.sources {
            source.validate()?;
        }
        if let FanOutPolicy::Quorum(n) = self.policy
            && (n == 0 || n > self.sources.len())
        {
            return Err(format!(
                "directory.policy quorum must be between 1 and {}",
                self.sources.len()
            ));
        }
        Ok(())
    }
}
