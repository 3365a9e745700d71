//! Directory connections.
//!
//! [`DirectoryConnection`] is the narrow set of protocol operations a source
//! needs; [`Connector`] opens one. [`LdapConnector`] speaks LDAP through
//! `ldap3`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::exop::PasswordModify;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, SearchEntry};
use staffio_core::{DirectoryError, DirectoryResult};
use tracing::{debug, warn};

use crate::config::SourceConfig;

/// LDAP result code for invalidCredentials.
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// LDAP result code for noSuchObject.
pub const RC_NO_SUCH_OBJECT: u32 = 32;

/// A directory entry: its DN and multi-valued attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl Entry {
    /// First value of `name`, or `""`.
    #[must_use]
    pub fn first(&self, name: &str) -> &str {
        self.attrs
            .get(name)
            .and_then(|values| values.first())
            .map_or("", String::as_str)
    }
}

/// Search scope for [`DirectoryConnection::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// The base entry and everything below it.
    Subtree,
}

/// An open session with one directory.
///
/// Errors carry the address of the directory. A rejected bind is
/// [`DirectoryError::AuthFailed`]; a transport failure is
/// [`DirectoryError::Connection`] and tells the caller to drop this session.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Authenticates the session as `dn`.
    async fn bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()>;

    /// RFC 3062 password modify for `user_dn`. `old` is `None` for an
    /// administrative reset.
    async fn password_modify(
        &mut self,
        user_dn: &str,
        old: Option<&str>,
        new: &str,
    ) -> DirectoryResult<()>;

    /// Entries under `base` matching `filter`.
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>>;

    /// Ends the session. Errors are ignored.
    async fn close(&mut self) {}
}

/// Opens sessions for a source.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a session with the directory at `config.addr`.
    async fn connect(&self, config: &SourceConfig) -> DirectoryResult<Box<dyn DirectoryConnection>>;
}

// =============================================================================
// ldap3
// =============================================================================

/// Opens `ldap3` sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

#[async_trait]
impl Connector for LdapConnector {
    async fn connect(&self, config: &SourceConfig) -> DirectoryResult<Box<dyn DirectoryConnection>> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let settings = LdapConnSettings::new().set_conn_timeout(timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.addr)
            .await
            .map_err(|e| DirectoryError::connection(&config.addr, e.to_string()))?;
        ldap3::drive!(conn);
        ldap.with_timeout(timeout);

        debug!(source = %config.addr, "directory connection opened");
        Ok(Box::new(LdapConnection {
            addr: config.addr.clone(),
            timeout,
            ldap,
        }))
    }
}

/// Session backed by `ldap3::Ldap`.
pub struct LdapConnection {
    addr: String,
    timeout: Duration,
    ldap: ldap3::Ldap,
}

impl LdapConnection {
    fn map_error(&self, err: LdapError) -> DirectoryError {
        match err {
            LdapError::LdapResult { result } if result.rc == RC_NO_SUCH_OBJECT => {
                DirectoryError::not_found(result.text)
            }
            LdapError::LdapResult { result } => {
                DirectoryError::operation(&self.addr, format!("rc={} {}", result.rc, result.text))
            }
            LdapError::Io { .. } | LdapError::Timeout { .. } => {
                DirectoryError::connection(&self.addr, err.to_string())
            }
            other => DirectoryError::operation(&self.addr, other.to_string()),
        }
    }
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        // An empty password is an unauthenticated bind and would "succeed".
        if password.is_empty() {
            return Err(DirectoryError::auth_failed(&self.addr, dn));
        }

        self.ldap.with_timeout(self.timeout);
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(|e| self.map_error(e))?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(DirectoryError::auth_failed(&self.addr, dn));
        }
        result.success().map_err(|e| self.map_error(e))?;
        Ok(())
    }

    async fn password_modify(
        &mut self,
        user_dn: &str,
        old: Option<&str>,
        new: &str,
    ) -> DirectoryResult<()> {
        let request = PasswordModify {
            user_id: Some(user_dn),
            old_pass: old,
            new_pass: Some(new),
        };

        self.ldap.with_timeout(self.timeout);
        self.ldap
            .extended(request)
            .await
            .and_then(|res| res.success())
            .map_err(|e| self.map_error(e))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        let scope = match scope {
            SearchScope::Base => ldap3::Scope::Base,
            SearchScope::Subtree => ldap3::Scope::Subtree,
        };

        self.ldap.with_timeout(self.timeout);
        let (entries, _result) = match self
            .ldap
            .search(base, scope, filter, attrs.to_vec())
            .await
            .and_then(|res| res.success())
        {
            Ok(found) => found,
            Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.map_error(e)),
        };

        Ok(entries
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                Entry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!(source = %self.addr, error = %e, "directory unbind failed");
        }
    }
}
