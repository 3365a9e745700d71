//! Storage traits for identity and credential data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth clients, authorization codes, access and refresh tokens
//! - Scopes and user grants
//! - Directory authentication, password lifecycle and staff lookup
//!
//! # Implementations
//!
//! Implementations are provided in separate crates:
//!
//! - `staffio-postgres` - PostgreSQL credential store
//! - `staffio-ldap` - multi-source LDAP directory store

pub mod credential;
pub mod directory;

pub use credential::CredentialStore;
pub use directory::{Authenticator, PasswordStore, StaffStore};
