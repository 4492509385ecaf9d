//! Services layer for the prefrontal orchestrator
//!
//! Provides the oracle gateway every agent consults for reasoning.

pub mod oracle;
pub mod scripted;

pub use oracle::{HttpOracle, Oracle, OracleConfig};
pub use scripted::ScriptedOracle;
