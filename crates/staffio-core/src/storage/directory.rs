//! Directory-facing traits.
//!
//! The authentication layer depends on these, not on a concrete directory
//! protocol client.

use async_trait::async_trait;

use crate::DirectoryResult;
use crate::types::Staff;

/// Verifies credentials and returns the matching profile.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Binds as `uid` with `password` and fetches the profile.
    ///
    /// # Errors
    ///
    /// `AuthFailed` when the password is rejected.
    async fn authenticate(&self, uid: &str, password: &str) -> DirectoryResult<Staff>;
}

/// Password lifecycle operations.
#[async_trait]
pub trait PasswordStore: Send + Sync {
    /// Changes a password on behalf of its owner, who proves the old one.
    ///
    /// # Errors
    ///
    /// `AuthFailed` when the old password is rejected, or the error of the
    /// modify operation.
    async fn password_change(
        &self,
        uid: &str,
        old_password: &str,
        new_password: &str,
    ) -> DirectoryResult<()>;

    /// Force-sets a password. Administrator initiated only.
    ///
    /// # Errors
    ///
    /// Returns the error of the administrative bind or the modify operation.
    async fn password_reset(&self, uid: &str, new_password: &str) -> DirectoryResult<()>;
}

/// Read access to staff profiles.
#[async_trait]
pub trait StaffStore: Send + Sync {
    /// Looks a person up by login id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no source holds the uid.
    async fn get(&self, uid: &str) -> DirectoryResult<Staff>;

    /// Looks a person up by distinguished name.
    ///
    /// # Errors
    ///
    /// `NotFound` when no source holds the entry.
    async fn get_by_dn(&self, dn: &str) -> DirectoryResult<Staff>;
}
