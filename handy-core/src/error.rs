//! Error types for the Handy client.

use thiserror::Error;

/// Failure of the underlying remote call.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP request could not be completed
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not valid JSON
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response decoded but lacked a field the caller relies on
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

/// Main error type for the client.
#[derive(Error, Debug)]
pub enum Error {
    /// Client is not usable as configured (no connection key, bad base URL)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote call did not produce a usable response
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device API answered with a truthy `error` field
    #[error("remote error: {0}")]
    Remote(serde_json::Value),

    /// Arguments that would produce a non-finite or meaningless result
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Payload reported by the device API, if this is a remote error.
    pub fn remote_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Remote(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
