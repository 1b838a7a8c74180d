//! Shared domain types for the stakeboard backend:
//! - the double-entry account/ledger model
//! - player, match, session and withdrawal records
//! - error kinds shared by every component
//! - token and phone-number primitives

pub mod crypto;
pub mod error;
pub mod phone;
pub mod token;
pub mod types;

pub use error::{Error, ErrorKind, Result};
