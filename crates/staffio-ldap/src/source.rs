//! One directory endpoint.
//!
//! A source keeps at most one open session, opened on first use. A
//! transport failure drops the session and the next call opens a new one.
//! Every operation starts with its own bind, so a reused session never
//! carries a previous caller's identity into the next operation.

use std::sync::Arc;

use staffio_core::{DirectoryError, DirectoryResult, Staff};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::config::SourceConfig;
use crate::connection::{Connector, DirectoryConnection, LdapConnector, SearchScope};
use crate::staff::{STAFF_ATTRIBUTES, entry_to_staff};

type Session = Option<Box<dyn DirectoryConnection>>;

/// Who a bind authenticates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// A user proving their own password. Rejection is `AuthFailed`.
    User,
    /// The configured administrative identity. Rejection is an operation
    /// failure of the source, not of the user.
    Admin,
}

/// A single directory server.
pub struct DirectorySource {
    config: SourceConfig,
    connector: Arc<dyn Connector>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySource")
            .field("addr", &self.config.addr)
            .field("user_base", &self.config.user_base())
            .finish_non_exhaustive()
    }
}

impl DirectorySource {
    /// Source that opens sessions through `connector`.
    #[must_use]
    pub fn new(config: SourceConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            session: Mutex::new(None),
        }
    }

    /// Source speaking LDAP.
    #[must_use]
    pub fn ldap(config: SourceConfig) -> Self {
        Self::new(config, Arc::new(LdapConnector))
    }

    /// Directory address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Source configuration.
    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Distinguished name of `uid` under this source's people base.
    #[must_use]
    pub fn user_dn(&self, uid: &str) -> String {
        format!("uid={},{}", ldap3::dn_escape(uid), self.config.user_base())
    }

    async fn session(&self) -> DirectoryResult<MutexGuard<'_, Session>> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.connector.connect(&self.config).await?);
        }
        Ok(guard)
    }

    /// Drops the session after a transport failure.
    fn settle<T>(&self, session: &mut Session, result: DirectoryResult<T>) -> DirectoryResult<T> {
        if let Err(DirectoryError::Connection { message, .. }) = &result {
            warn!(source = %self.config.addr, error = %message, "dropping directory session");
            *session = None;
        }
        result
    }

    async fn bind_on(
        &self,
        conn: &mut dyn DirectoryConnection,
        dn: &str,
        password: &str,
        kind: BindKind,
    ) -> DirectoryResult<()> {
        match (conn.bind(dn, password).await, kind) {
            (Ok(()), _) => Ok(()),
            (Err(DirectoryError::AuthFailed { .. }), BindKind::Admin) => {
                Err(DirectoryError::operation(
                    &self.config.addr,
                    format!("administrative bind rejected for {dn}"),
                ))
            }
            (Err(e), _) => Err(e),
        }
    }

    async fn admin_bind_on(&self, conn: &mut dyn DirectoryConnection) -> DirectoryResult<()> {
        if self.config.bind_dn.is_empty() {
            return Err(DirectoryError::operation(
                &self.config.addr,
                "no administrative bind_dn configured",
            ));
        }
        self.bind_on(
            conn,
            &self.config.bind_dn,
            &self.config.bind_password,
            BindKind::Admin,
        )
        .await
    }

    /// Authenticates the session as `dn`.
    ///
    /// # Errors
    ///
    /// `AuthFailed` for a rejected user bind, `Operation` for a rejected
    /// administrative bind, `Connection` if the server is unreachable.
    #[instrument(skip(self, password), fields(source = %self.config.addr))]
    pub async fn bind(&self, dn: &str, password: &str, kind: BindKind) -> DirectoryResult<()> {
        let mut session = self.session().await?;
        let result = match session.as_deref_mut() {
            Some(conn) => self.bind_on(conn, dn, password, kind).await,
            None => Err(DirectoryError::connection(&self.config.addr, "no session")),
        };
        self.settle(&mut session, result)
    }

    /// Binds as the user with `old_password`, then sets `new_password`.
    ///
    /// # Errors
    ///
    /// `AuthFailed` if the old password is rejected, otherwise the error of
    /// the modify operation. Nothing is retried.
    #[instrument(skip(self, old_password, new_password), fields(source = %self.config.addr))]
    pub async fn password_change(
        &self,
        uid: &str,
        old_password: &str,
        new_password: &str,
    ) -> DirectoryResult<()> {
        let user_dn = self.user_dn(uid);
        let mut session = self.session().await?;
        let result = match session.as_deref_mut() {
            Some(conn) => {
                async {
                    self.bind_on(conn, &user_dn, old_password, BindKind::User)
                        .await?;
                    conn.password_modify(&user_dn, Some(old_password), new_password)
                        .await
                }
                .await
            }
            None => Err(DirectoryError::connection(&self.config.addr, "no session")),
        };

        if result.is_ok() {
            info!(uid, "password changed");
        }
        self.settle(&mut session, result)
    }

    /// Binds as the administrator and force-sets `new_password`.
    ///
    /// # Errors
    ///
    /// `Operation` if the administrative bind is rejected, otherwise the
    /// error of the modify operation.
    #[instrument(skip(self, new_password), fields(source = %self.config.addr))]
    pub async fn password_reset(&self, uid: &str, new_password: &str) -> DirectoryResult<()> {
        let user_dn = self.user_dn(uid);
        let mut session = self.session().await?;
        let result = match session.as_deref_mut() {
            Some(conn) => {
                async {
                    self.admin_bind_on(conn).await?;
                    conn.password_modify(&user_dn, None, new_password).await
                }
                .await
            }
            None => Err(DirectoryError::connection(&self.config.addr, "no session")),
        };

        if result.is_ok() {
            info!(uid, "password reset");
        }
        self.settle(&mut session, result)
    }

    /// Binds as the user and reads their own entry.
    ///
    /// # Errors
    ///
    /// `AuthFailed` if the password is rejected, `NotFound` if the entry
    /// cannot be read back.
    #[instrument(skip(self, password), fields(source = %self.config.addr))]
    pub async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<Staff> {
        let user_dn = self.user_dn(uid);
        let mut session = self.session().await?;
        let result = match session.as_deref_mut() {
            Some(conn) => {
                async {
                    self.bind_on(conn, &user_dn, password, BindKind::User).await?;
                    let entries = conn
                        .search(
                            &user_dn,
                            SearchScope::Base,
                            "(objectClass=*)",
                            STAFF_ATTRIBUTES,
                        )
                        .await?;
                    entries
                        .first()
                        .map(entry_to_staff)
                        .ok_or_else(|| DirectoryError::not_found(format!("entry {user_dn}")))
                }
                .await
            }
            None => Err(DirectoryError::connection(&self.config.addr, "no session")),
        };
        self.settle(&mut session, result)
    }

    /// Looks up `uid` under the people base.
    ///
    /// # Errors
    ///
    /// `NotFound` if no entry carries the uid.
    #[instrument(skip(self), fields(source = %self.config.addr))]
    pub async fn fetch_staff(&self, uid: &str) -> DirectoryResult<Staff> {
        let base = self.config.user_base();
        let filter = format!("(uid={})", ldap3::ldap_escape(uid));
        self.admin_search(&base, SearchScope::Subtree, &filter)
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("staff {uid:?}")))
    }

    /// Reads the entry at `dn`.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such entry.
    #[instrument(skip(self), fields(source = %self.config.addr))]
    pub async fn fetch_staff_by_dn(&self, dn: &str) -> DirectoryResult<Staff> {
        self.admin_search(dn, SearchScope::Base, "(objectClass=*)")
            .await?
            .ok_or_else(|| DirectoryError::not_found(format!("entry {dn}")))
    }

    async fn admin_search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
    ) -> DirectoryResult<Option<Staff>> {
        let mut session = self.session().await?;
        let result = match session.as_deref_mut() {
            Some(conn) => {
                async {
                    if !self.config.bind_dn.is_empty() {
                        self.admin_bind_on(conn).await?;
                    }
                    let entries = conn.search(base, scope, filter, STAFF_ATTRIBUTES).await?;
                    debug!(found = entries.len(), "directory search");
                    Ok(entries.first().map(entry_to_staff))
                }
                .await
            }
            None => Err(DirectoryError::connection(&self.config.addr, "no session")),
        };
        self.settle(&mut session, result)
    }

    /// Closes the open session, if any.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if let Some(mut conn) = session.take() {
            conn.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;
    use crate::staff::staff_to_entry;

    const BASE: &str = "dc=example,dc=org";
    const ADMIN: &str = "cn=admin,dc=example,dc=org";
    const BOB: &str = "uid=bob,ou=people,dc=example,dc=org";

    fn fixture() -> (MemoryDirectory, DirectorySource) {
        let directory = MemoryDirectory::new("ldap://primary");
        directory.add_identity(ADMIN, "admin-pw");
        let bob = Staff {
            uid: "bob".into(),
            email: "bob@example.org".into(),
            common_name: "Bob".into(),
            ..Default::default()
        };
        directory.insert(staff_to_entry(&bob, BOB), "old");

        let config = SourceConfig::new("ldap://primary", BASE).with_admin(ADMIN, "admin-pw");
        let source = DirectorySource::new(config, Arc::new(directory.clone()));
        (directory, source)
    }

    #[test]
    fn test_user_dn() {
        let (_, source) = fixture();
        assert_eq!(source.user_dn("bob"), BOB);
        // A comma in the uid must not start a new RDN.
        let dn = source.user_dn("a,b");
        assert!(!dn.starts_with("uid=a,b,"));
        assert!(dn.ends_with(",ou=people,dc=example,dc=org"));
    }

    #[tokio::test]
    async fn test_bind_kinds() {
        let (_, source) = fixture();
        source.bind(BOB, "old", BindKind::User).await.unwrap();

        let err = source.bind(BOB, "wrong", BindKind::User).await.unwrap_err();
        assert!(err.is_auth_failed());

        let err = source.bind(ADMIN, "wrong", BindKind::Admin).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Operation { .. }));
    }

    #[tokio::test]
    async fn test_password_change() {
        let (directory, source) = fixture();

        let err = source.password_change("bob", "nope", "new").await.unwrap_err();
        assert!(err.is_auth_failed());
        assert_eq!(directory.password(BOB).as_deref(), Some("old"));

        source.password_change("bob", "old", "new").await.unwrap();
        assert_eq!(directory.password(BOB).as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_password_reset_uses_admin() {
        let (directory, source) = fixture();
        source.password_reset("bob", "fresh").await.unwrap();
        assert_eq!(directory.password(BOB).as_deref(), Some("fresh"));

        let config = SourceConfig::new("ldap://primary", BASE);
        let no_admin = DirectorySource::new(config, Arc::new(directory.clone()));
        let err = no_admin.password_reset("bob", "again").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Operation { .. }));
        assert_eq!(directory.password(BOB).as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_modify_failure_is_reported() {
        let (directory, source) = fixture();
        directory.set_reject_modify(true);
        let err = source.password_change("bob", "old", "new").await.unwrap_err();
        assert_eq!(err.source_addr(), Some("ldap://primary"));
        assert_eq!(directory.password(BOB).as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_authenticate_and_lookup() {
        let (_, source) = fixture();
        let staff = source.authenticate("bob", "old").await.unwrap();
        assert_eq!(staff.email, "bob@example.org");
        assert_eq!(staff.dn.as_deref(), Some(BOB));

        assert_eq!(source.fetch_staff("bob").await.unwrap().common_name, "Bob");
        assert_eq!(source.fetch_staff_by_dn(BOB).await.unwrap().uid, "bob");
        assert!(source.fetch_staff("alice").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_session_reopens_after_transport_failure() {
        let (directory, source) = fixture();
        source.bind(BOB, "old", BindKind::User).await.unwrap();
        assert_eq!(directory.connects(), 1);

        directory.set_offline(true);
        let err = source.bind(BOB, "old", BindKind::User).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Connection { .. }));

        directory.set_offline(false);
        source.bind(BOB, "old", BindKind::User).await.unwrap();
        assert_eq!(directory.connects(), 2);
    }
}
