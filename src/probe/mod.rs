//! Probe module: one bounded HTTP exchange per execution.
//!
//! A [`ProbeSpec`] describes what to fetch, the [`ProbeExecutor`] drives the
//! exchange over a [`Transport`] and produces a [`ProbeOutcome`].

mod executor;
mod http;
mod outcome;
mod spec;
mod traffic;
mod transport;

pub use executor::*;
pub use http::*;
pub use outcome::*;
pub use spec::*;
pub use traffic::*;
pub use transport::*;

use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Bad input: missing URL or a malformed header line.
    #[error("validation error: {0}")]
    Validation(String),
    /// URL parse failure or I/O failure during the exchange.
    #[error("network error: {0}")]
    Network(String),
    /// Failure while releasing the stream or connection. Logged, never returned.
    #[error("resource error: {0}")]
    Resource(String),
}

impl ProbeError {
    /// The underlying cause without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::Network(msg) | Self::Resource(msg) => msg,
        }
    }
}
