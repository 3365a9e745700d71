//! Record types for the identity and credential stores.

pub mod client;
pub mod scope;
pub mod staff;
pub mod token;

pub use client::{Client, ClientId, ClientQuery, ClientValidationError, SortOrder};
pub use scope::{ClientUserAuthorization, Scope};
pub use staff::{Gender, Staff};
pub use token::{AccessData, AuthorizeData};
