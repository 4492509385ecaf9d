//! Prefrontal - Leader/Worker/Inspector Agent Coordination
//!
//! Coordinates a small team of reasoning agents over a generative text
//! oracle:
//! - A leader classifies mission difficulty and splits it into subtasks
//! - Expert workers reflect, collaborate with peers and execute
//! - An inspector reviews the combined output
//! - A pipeline gate tells the planner how much machinery to allocate
//!
//! # Architecture
//!
//! - **Types**: Agent ids, mission ids, difficulty, expertise
//! - **Services**: Oracle gateway (HTTP and scripted)
//! - **Orchestration**: Actors, routing, prompts, response validation
//! - **Planner**: Action-sequence interface fed by the pipeline gate
//!
//! # Example
//!
//! ```ignore
//! use prefrontal_core::{HttpOracle, Orchestrator, PrefrontalConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PrefrontalConfig::load(None)?;
//!     let oracle = Arc::new(HttpOracle::new(config.oracle.clone())?);
//!     let mut orchestrator = Orchestrator::new(&config, oracle).await?;
//!
//!     let report = orchestrator
//!         .execute_mission("Bring the red cup to the kitchen", vec![])
//!         .await?;
//!     println!("completion: {}", report.metrics.task_completion);
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod orchestration;
pub mod planner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{PrefrontalConfig, RosterConfig, WorkerSpec};
pub use error::{PrefrontalError, Result};
pub use orchestration::{MissionReport, MissionStatus, Orchestrator, TaskMetrics};
pub use planner::{allocation_requires_selector, ActionSelector, Planner};
pub use services::{HttpOracle, Oracle, OracleConfig, ScriptedOracle};
pub use types::{AgentId, Difficulty, Expertise, MissionId};
