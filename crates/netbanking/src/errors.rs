//! Error types for the netbanking sync engine.
//!
//! Nothing here is fatal to a refresh cycle. Each variant is produced at the
//! boundary where it occurs and converted by the caller into a logged message
//! plus a safe default (empty value, empty list, unchanged access token).

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Token endpoint unreachable, malformed response, or missing `access_token`.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-2xx status or transport failure on an API call.
    #[error("Request failed: {0}")]
    Request(String),

    /// Malformed date or missing field inside a single record.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown entity id, missing IBAN or out-of-range transaction ordinal.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
