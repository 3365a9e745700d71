//! Error types shared by the identity and credential stores.
//!
//! Callers branch on the kind only: [`StoreError::NotFound`] versus anything
//! else. The underlying cause of a persistence failure is logged where it
//! happens and never carried verbatim across this boundary.

/// Errors returned by the credential store and the directory store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No matching row or directory entry.
    #[error("Not found: {message}")]
    NotFound {
        /// What was being looked up.
        message: String,
    },

    /// Any other persistence failure.
    #[error("Database error: {message}")]
    Database {
        /// Short description; the original cause is only logged.
        message: String,
    },

    /// The caller supplied invalid or incomplete data. Raised before any I/O.
    #[error("Invalid value: {message}")]
    InvalidValue {
        /// Which value was rejected.
        message: String,
    },

    /// A directory bind was rejected.
    #[error("Authentication failed: {message}")]
    AuthFailed {
        /// Identity whose bind failed.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Database` error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Creates a new `AuthFailed` error.
    #[must_use]
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a `Database` error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database { .. })
    }

    /// Returns `true` if this is an `InvalidValue` error.
    #[must_use]
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, Self::InvalidValue { .. })
    }

    /// Returns `true` if this is an `AuthFailed` error.
    #[must_use]
    pub fn is_auth_failed(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }

    /// Re-raises a lookup failure with the identifier that was being resolved.
    ///
    /// The kind is kept, only the message changes, so `NotFound` stays
    /// `NotFound` for the caller.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        match self {
            Self::NotFound { .. } => Self::NotFound { message: context },
            Self::Database { message } => Self::Database {
                message: format!("{context}: {message}"),
            },
            other => other,
        }
    }
}

/// Errors raised by a directory source.
///
/// Every variant except `NotFound` carries the address of the source that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// The bind was rejected by the directory.
    #[error("Authentication failed at {source_addr} for {dn}")]
    AuthFailed {
        /// Directory address.
        source_addr: String,
        /// Distinguished name that failed to bind.
        dn: String,
    },

    /// No entry matched the lookup.
    #[error("Entry not found: {message}")]
    NotFound {
        /// What was being looked up.
        message: String,
    },

    /// The directory could not be reached.
    #[error("Connection error at {source_addr}: {message}")]
    Connection {
        /// Directory address.
        source_addr: String,
        /// Underlying error text.
        message: String,
    },

    /// A directory operation was rejected or failed mid-flight.
    #[error("Operation failed at {source_addr}: {message}")]
    Operation {
        /// Directory address.
        source_addr: String,
        /// Underlying error text.
        message: String,
    },

    /// No directory sources are configured.
    #[error("No directory sources configured")]
    NoSources,
}

impl DirectoryError {
    /// Creates a new `AuthFailed` error.
    #[must_use]
    pub fn auth_failed(source_addr: impl Into<String>, dn: impl Into<String>) -> Self {
        Self::AuthFailed {
            source_addr: source_addr.into(),
            dn: dn.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(source_addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            source_addr: source_addr.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Operation` error.
    #[must_use]
    pub fn operation(source_addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            source_addr: source_addr.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is an `AuthFailed` error.
    #[must_use]
    pub fn is_auth_failed(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Address of the source that produced this error, if any.
    #[must_use]
    pub fn source_addr(&self) -> Option<&str> {
        match self {
            Self::AuthFailed { source_addr, .. }
            | Self::Connection { source_addr, .. }
            | Self::Operation { source_addr, .. } => Some(source_addr),
            Self::NotFound { .. } | Self::NoSources => None,
        }
    }
}

impl From<DirectoryError> for StoreError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::AuthFailed { .. } => StoreError::auth_failed(err.to_string()),
            DirectoryError::NotFound { message } => StoreError::NotFound { message },
            other => StoreError::database(other.to_string()),
        }
    }
}

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_predicates() {
        assert!(StoreError::not_found("client demo").is_not_found());
        assert!(StoreError::database("boom").is_database_error());
        assert!(StoreError::invalid_value("empty name").is_invalid_value());
        assert!(StoreError::auth_failed("bob").is_auth_failed());
        assert!(!StoreError::database("boom").is_not_found());
    }

    #[test]
    fn test_with_context_keeps_kind() {
        let err = StoreError::not_found("no rows").with_context("client \"demo\" not found");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: client \"demo\" not found");

        let err = StoreError::database("database error").with_context("load access");
        assert!(err.is_database_error());
        assert_eq!(err.to_string(), "Database error: load access: database error");
    }

    #[test]
    fn test_directory_error_carries_source() {
        let err = DirectoryError::operation("ldap://replica:389", "unwilling to perform");
        assert_eq!(err.source_addr(), Some("ldap://replica:389"));
        assert_eq!(
            err.to_string(),
            "Operation failed at ldap://replica:389: unwilling to perform"
        );
        assert_eq!(DirectoryError::NoSources.source_addr(), None);
    }

    #[test]
    fn test_directory_error_into_store_error() {
        let err: StoreError = DirectoryError::auth_failed("ldap://a", "uid=bob").into();
        assert!(err.is_auth_failed());

        let err: StoreError = DirectoryError::not_found("uid bob").into();
        assert!(err.is_not_found());

        let err: StoreError = DirectoryError::connection("ldap://a", "refused").into();
        assert!(err.is_database_error());
    }
}
