//! Error taxonomy for endpoints.
//!
//! Two families with different fates:
//!
//! - [`ConfigError`]: the application is wired incorrectly (incomplete
//!   descriptor, unknown endpoint name, orchestrator without a context).
//!   Returned synchronously from construction APIs and never stored in the
//!   store.
//! - [`FetchError`]: transport or data failures during a fetch. Always
//!   recovered into [`FetchRecord::error`](crate::record::FetchRecord) as a
//!   message, paired with `is_fetching = false`.

use thiserror::Error;

/// Programming mistakes detected while wiring endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The builder was given an empty name.
    #[error("Endpoint name is missing")]
    MissingName,

    /// `build()` was called without a URL mapper.
    #[error("Endpoint '{endpoint}' has no url mapper")]
    MissingUrlMapper {
        /// Endpoint being built
        endpoint: String,
    },

    /// `build()` was called without a response mapper.
    #[error("Endpoint '{endpoint}' has no response mapper")]
    MissingMapper {
        /// Endpoint being built
        endpoint: String,
    },

    /// Two descriptors share a name.
    #[error("Endpoint '{0}' is registered more than once")]
    DuplicateEndpoint(String),

    /// The registry has no descriptor with this name.
    #[error("Endpoint '{0}' is not registered")]
    UnknownEndpoint(String),

    /// An orchestrator was mounted without an endpoint context to resolve its descriptor.
    #[error("No endpoint context available to resolve '{endpoint}'")]
    MissingContext {
        /// Endpoint the orchestrator was created for
        endpoint: String,
    },

    /// The stored payload is not of the type the consumer asked for.
    #[error("Endpoint '{endpoint}' holds {found}, not {expected}")]
    PayloadType {
        /// Endpoint whose payload was read
        endpoint: String,
        /// Type requested by the consumer
        expected: &'static str,
        /// Type produced by the endpoint's mapper
        found: &'static str,
    },
}

/// Failures while fetching or transforming an endpoint's data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// The body was not valid JSON.
    #[error("Response could not be decoded: {0}")]
    Decode(String),

    /// The endpoint's mapper rejected the payload.
    #[error("{0}")]
    Transform(String),
}
