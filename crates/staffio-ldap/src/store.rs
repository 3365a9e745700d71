//! Multi-source directory store.
//!
//! Password operations fan out to every source in configuration order, one
//! after another, whatever happened at the previous source. Lookups and
//! authentication stop at the first source that answers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use staffio_core::{
    Authenticator, DirectoryError, DirectoryResult, PasswordStore, Staff, StaffStore,
};
use tracing::{debug, instrument, warn};

use crate::config::DirectoryConfig;
use crate::connection::{Connector, LdapConnector};
use crate::fanout::{FanOutPolicy, FanOutReport};
use crate::source::DirectorySource;

/// Ordered set of directory sources.
#[derive(Debug)]
pub struct DirectoryStore {
    sources: Vec<DirectorySource>,
    policy: FanOutPolicy,
}

impl DirectoryStore {
    /// Store over already constructed sources.
    #[must_use]
    pub fn new(sources: Vec<DirectorySource>, policy: FanOutPolicy) -> Self {
        Self { sources, policy }
    }

    /// Builds one source per configured entry, all opening sessions through
    /// `connector`.
    #[must_use]
    pub fn with_connector(config: &DirectoryConfig, connector: Arc<dyn Connector>) -> Self {
        let sources = config
            .sources
            .iter()
            .cloned()
            .map(|source| DirectorySource::new(source, Arc::clone(&connector)))
            .collect();
        Self::new(sources, config.policy)
    }

    /// Builds LDAP sources from configuration. No connection is opened until
    /// the first operation.
    #[must_use]
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::with_connector(config, Arc::new(LdapConnector))
    }

    /// Sources in fan-out order.
    #[must_use]
    pub fn sources(&self) -> &[DirectorySource] {
        &self.sources
    }

    /// Policy applied by the single-result password operations.
    #[must_use]
    pub fn policy(&self) -> FanOutPolicy {
        self.policy
    }

    /// Changes the password at every source and reports each outcome.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn password_change_report(
        &self,
        uid: &str,
        old_password: &str,
        new_password: &str,
    ) -> FanOutReport {
        let mut report = FanOutReport::new();
        for source in &self.sources {
            let result = source.password_change(uid, old_password, new_password).await;
            if let Err(e) = &result {
                warn!(source = %source.addr(), error = %e, "password change failed");
            }
            report.record(source.addr(), result);
        }
        report
    }

    /// Resets the password at every source and reports each outcome.
    #[instrument(skip(self, new_password))]
    pub async fn password_reset_report(&self, uid: &str, new_password: &str) -> FanOutReport {
        let mut report = FanOutReport::new();
        for source in &self.sources {
            let result = source.password_reset(uid, new_password).await;
            if let Err(e) = &result {
                warn!(source = %source.addr(), error = %e, "password reset failed");
            }
            report.record(source.addr(), result);
        }
        report
    }

    /// Closes every open session.
    pub async fn close(&self) {
        for source in &self.sources {
            source.close().await;
        }
    }

    /// First source that returns `Ok` wins; otherwise the last error.
    async fn first_hit<'a, F, Fut>(&'a self, mut op: F) -> DirectoryResult<Staff>
    where
        F: FnMut(&'a DirectorySource) -> Fut,
        Fut: Future<Output = DirectoryResult<Staff>>,
    {
        let mut last = Err(DirectoryError::NoSources);
        for source in &self.sources {
            match op(source).await {
                Ok(staff) => return Ok(staff),
                Err(e) => {
                    debug!(source = %source.addr(), error = %e, "source missed");
                    last = Err(e);
                }
            }
        }
        last
    }
}

#[async_trait]
impl Authenticator for DirectoryStore {
    async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<Staff> {
        self.first_hit(|source| source.authenticate(uid, password))
            .await
    }
}

#[async_trait]
impl PasswordStore for DirectoryStore {
    async fn password_change(
        &self,
        uid: &str,
        old_password: &str,
        new_password: &str,
    ) -> DirectoryResult<()> {
        self.password_change_report(uid, old_password, new_password)
            .await
            .resolve(self.policy)
    }

    async fn password_reset(&self, uid: &str, new_password: &str) -> DirectoryResult<()> {
        self.password_reset_report(uid, new_password)
            .await
            .resolve(self.policy)
    }
}

#[async_trait]
impl StaffStore for DirectoryStore {
    async fn get(&self, uid: &str) -> DirectoryResult<Staff> {
        self.first_hit(|source| source.fetch_staff(uid)).await
    }

    async fn get_by_dn(&self, dn: &str) -> DirectoryResult<Staff> {
        self.first_hit(|source| source.fetch_staff_by_dn(dn)).await
    }
}
