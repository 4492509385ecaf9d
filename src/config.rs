//! Configuration for Prefrontal
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `PREFRONTAL__`-prefixed environment variables (`__` separates
//! nested keys, e.g. `PREFRONTAL__RETRY__MAX_ATTEMPTS=3`).

use crate::error::{PrefrontalError, Result};
use crate::orchestration::retry::RetryPolicy;
use crate::services::OracleConfig;
use crate::types::{AgentId, Expertise};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default configuration file looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "prefrontal.toml";

const ENV_PREFIX: &str = "PREFRONTAL";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefrontalConfig {
    pub oracle: OracleConfig,
    pub retry: RetryPolicy,
    pub deadlines: DeadlineConfig,
    pub roster: RosterConfig,
    pub orchestration: OrchestrationConfig,
}

impl PrefrontalConfig {
    /// Load defaults, then `path` if it exists, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let loaded: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.roster.validate()?;
        Ok(loaded)
    }
}

/// Bounded waits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// How long the leader may wait for outstanding task reports
    pub report_timeout_secs: u64,

    /// How long to wait for the inspector when the review phase is enabled
    pub review_timeout_secs: u64,

    /// Upper bound for any single phase barrier
    pub phase_timeout_secs: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            report_timeout_secs: 120,
            review_timeout_secs: 60,
            phase_timeout_secs: 300,
        }
    }
}

impl DeadlineConfig {
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    pub fn review_timeout(&self) -> Duration {
        Duration::from_secs(self.review_timeout_secs)
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Wait for the inspector's verdict before result processing
    pub review_phase: bool,
}

/// One worker in the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub id: AgentId,
    pub expertise: Expertise,
}

impl WorkerSpec {
    pub fn new(id: &str, title: &str, detail: &str) -> Self {
        Self {
            id: AgentId::from(id),
            expertise: Expertise::new(title, detail),
        }
    }
}

/// Static actor roster, read once when the orchestrator is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub leader: AgentId,
    pub inspector: AgentId,
    pub pipeline: AgentId,
    pub workers: Vec<WorkerSpec>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            leader: AgentId::from("Leader_0"),
            inspector: AgentId::from("Inspector_0"),
            pipeline: AgentId::from("Pipeline_0"),
            workers: vec![
                WorkerSpec::new(
                    "Worker_0",
                    "Navigation",
                    "move_to(x, y), rotate(theta), stop(), follow_path(waypoints)",
                ),
                WorkerSpec::new(
                    "Worker_1",
                    "Perception",
                    "detect_objects(), locate(object), scan_area(radius), read_label(object)",
                ),
                WorkerSpec::new(
                    "Worker_2",
                    "Manipulation",
                    "grasp(object), release(), place(object, location), push(object, direction)",
                ),
                WorkerSpec::new(
                    "Worker_3",
                    "Task Monitoring",
                    "check_progress(task), verify_state(condition), report_status()",
                ),
                WorkerSpec::new(
                    "Worker_4",
                    "Motion Planning",
                    "plan_path(start, goal), avoid_obstacle(obstacle), compute_trajectory(pose)",
                ),
            ],
        }
    }
}

impl RosterConfig {
    /// Reject empty worker sets, empty ids and ids shared between roles
    pub fn validate(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(PrefrontalError::InvalidRoster(
                "at least one worker is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let ids = [&self.leader, &self.inspector, &self.pipeline]
            .into_iter()
            .chain(self.workers.iter().map(|w| &w.id));

        for id in ids {
            if id.as_str().trim().is_empty() {
                return Err(PrefrontalError::InvalidRoster("empty actor id".to_string()));
            }
            if !seen.insert(id) {
                return Err(PrefrontalError::InvalidRoster(format!(
                    "duplicate actor id {}",
                    id
                )));
            }
        }

        Ok(())
    }

    /// Worker pool in roster order
    pub fn worker_ids(&self) -> Vec<AgentId> {
        self.workers.iter().map(|w| w.id.clone()).collect()
    }

    pub fn expertise_of(&self, id: &AgentId) -> Option<&Expertise> {
        self.workers
            .iter()
            .find(|w| &w.id == id)
            .map(|w| &w.expertise)
    }
}
