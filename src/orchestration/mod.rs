//! Multi-Agent Orchestration System
//!
//! A leader decomposes a mission into subtasks for a fixed pool of expert
//! workers. Workers reflect on their subtask, ask peers for help, answer
//! peers' asks and report back. An inspector reviews the aggregated output.
//!
//! # Architecture
//!
//! Every agent is a `ractor` actor. Agents exchange [`messages::Envelope`]s
//! through a [`registry::Router`] sealed once at startup; the
//! [`orchestrator::Orchestrator`] drives phases with RPC calls and waits on
//! each phase as a barrier.
//!
//! Every oracle answer goes through [`parser`], then [`validator`], before
//! it becomes a typed [`schema`] value; [`retry::consult`] bounds how often
//! a malformed or invalid answer is re-requested.

pub mod actors;
pub mod messages;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod state;
pub mod validator;

// Re-export key types
pub use actors::{InspectorActor, LeaderActor, PipelineActor, WorkerActor};
pub use messages::{
    AssignOutcome, Envelope, FeedbackOutcome, InspectorMessage, LeaderMessage, Payload,
    PipelineMessage, WorkOutcome, WorkerMessage,
};
pub use orchestrator::Orchestrator;
pub use parser::{parse, ParsedResponse};
pub use registry::{Route, Router};
pub use retry::{consult, RetryPolicy};
pub use schema::Schema;
pub use state::{
    InboxContent, InboxEntry, LeaderPhase, MissionReport, MissionStatus, TaskMetrics,
    WorkerStatus,
};
pub use validator::{validate, SchemaKind};
