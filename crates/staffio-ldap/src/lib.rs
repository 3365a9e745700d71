//! Directory backends for staffio.
//!
//! A [`DirectorySource`] wraps one directory server. A [`DirectoryStore`]
//! holds the ordered list of sources (primary first, then replicas) and
//! implements the `Authenticator`, `PasswordStore` and `StaffStore` traits
//! from `staffio-core`.
//!
//! ```ignore
//! use staffio_ldap::{DirectoryConfig, DirectoryStore};
//! use staffio_core::PasswordStore;
//!
//! let store = DirectoryStore::from_config(&config);
//! store.password_change("bob", "old", "new").await?;
//!
//! // Or inspect every replica:
//! let report = store.password_change_report("bob", "old", "new").await;
//! for outcome in report.failures() {
//!     eprintln!("{}: {:?}", outcome.source_addr, outcome.result);
//! }
//! ```

pub mod config;
pub mod connection;
pub mod fanout;
pub mod memory;
pub mod source;
pub mod staff;
pub mod store;

pub use config::{DirectoryConfig, SourceConfig};
pub use connection::{Connector, DirectoryConnection, Entry, LdapConnector, SearchScope};
pub use fanout::{FanOutPolicy, FanOutReport, SourceOutcome};
pub use memory::MemoryDirectory;
pub use source::{BindKind, DirectorySource};
pub use store::DirectoryStore;
