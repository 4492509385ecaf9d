//! Agent Actor Implementations
//!
//! Four agents exchange envelopes through the sealed routing table:
//! - **LeaderActor**: Decomposes missions, dispatches subtasks, collects reports
//! - **WorkerActor**: Reflects, collaborates with peers and executes one subtask
//! - **InspectorActor**: Reviews aggregated output for the leader
//! - **PipelineActor**: Records the allocation level for the planner

pub mod inspector;
pub mod leader;
pub mod pipeline;
pub mod worker;

pub use inspector::{InspectorActor, InspectorArgs};
pub use leader::{LeaderActor, LeaderArgs};
pub use pipeline::PipelineActor;
pub use worker::{WorkerActor, WorkerArgs};
