//! # staffio-core
//!
//! Domain types and capability traits for the staffio identity and token
//! store.
//!
//! ## Modules
//!
//! - [`types`] - Staff, client, authorization code, token and scope records
//! - [`storage`] - Traits implemented by the PostgreSQL and LDAP backends
//! - [`error`] - The shared `NotFound` / `Database` / `InvalidValue` /
//!   `AuthFailed` taxonomy

pub mod error;
pub mod storage;
pub mod types;

pub use error::{DirectoryError, DirectoryResult, StoreError, StoreResult};
pub use storage::{Authenticator, CredentialStore, PasswordStore, StaffStore};
pub use types::{
    AccessData, AuthorizeData, Client, ClientId, ClientQuery, ClientUserAuthorization,
    ClientValidationError, Gender, Scope, SortOrder, Staff,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use staffio_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{DirectoryError, DirectoryResult, StoreError, StoreResult};
    pub use crate::storage::{Authenticator, CredentialStore, PasswordStore, StaffStore};
    pub use crate::types::{
        AccessData, AuthorizeData, Client, ClientId, ClientQuery, ClientUserAuthorization,
        Gender, Scope, SortOrder, Staff,
    };
}
