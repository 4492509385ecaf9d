//! Error types for the Prefrontal coordination system
//!
//! This module provides structured error definitions using thiserror and
//! conversion from anyhow for propagation out of the binary.
//!
//! The variants follow the protocol's failure taxonomy:
//! - **Transport**: oracle request failed or returned a non-2xx status
//! - **Schema**: oracle output never validated within the retry budget
//! - **Protocol**: a message addressed an actor id with no route
//! - **Mission**: actor plumbing or deadline failures that abort a mission

use crate::orchestration::validator::SchemaKind;
use crate::types::AgentId;
use thiserror::Error;

/// Main error type for Prefrontal operations
#[derive(Error, Debug)]
pub enum PrefrontalError {
    /// HTTP transport to the oracle failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Oracle answered with a non-success status or an unusable body
    #[error("Oracle API error: {0}")]
    OracleApi(String),

    /// Every attempt produced unparsable or schema-invalid output
    #[error("Oracle output for {kind} failed validation after {attempts} attempts")]
    RetriesExhausted { kind: SchemaKind, attempts: u32 },

    /// Message addressed to an actor id absent from the routing table
    #[error("Recipient {0} not found in routing table")]
    UnknownRecipient(AgentId),

    /// Roster configuration is unusable
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// Actor spawn or messaging failure
    #[error("Actor error: {0}")]
    Actor(String),

    /// A bounded wait expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl PrefrontalError {
    /// Transport failures are surfaced to the caller and never retried by
    /// the coordination layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::OracleApi(_))
    }
}

/// Result type alias for Prefrontal operations
pub type Result<T> = std::result::Result<T, PrefrontalError>;

/// Convert anyhow::Error to PrefrontalError
impl From<anyhow::Error> for PrefrontalError {
    fn from(err: anyhow::Error) -> Self {
        PrefrontalError::Other(err.to_string())
    }
}
