//! Mission State and Actor Lifecycles
//!
//! Data owned by the actors:
//! - **Mission**: the leader's single open unit of work
//! - **Subtask**: one mission fragment held by one worker
//! - **CollaborationRequest**: a worker's outstanding ask to a colleague
//! - **WorkerStatus** / **LeaderPhase**: per-actor state machines
//! - **TaskMetrics** / **MissionReport**: read-only summaries at close

use crate::orchestration::messages::TaskResponse;
use crate::orchestration::schema::InspectionReport;
use crate::types::{AgentId, Difficulty, Expertise, MissionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Worker lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Free to reflect, or to run its subtask once every ask is resolved
    Idle,

    /// Serving colleagues' collaboration requests
    Pending,

    /// Executing its own subtask
    Busy,
}

/// Leader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderPhase {
    /// No open mission
    Idle,

    /// Mission created, decomposition in progress
    Assigning,

    /// Decomposition finished; stays here when no worker was dispatched
    Dispatched,

    /// Subtasks dispatched, waiting for worker reports
    AwaitingReports,

    /// All reports in, review requested from the inspector
    Reviewing,

    /// Review verdict recorded
    Concluded,
}

impl LeaderPhase {
    /// Phase after the current one along the happy path
    pub fn next(&self) -> Option<LeaderPhase> {
        match self {
            LeaderPhase::Idle => Some(LeaderPhase::Assigning),
            LeaderPhase::Assigning => Some(LeaderPhase::Dispatched),
            LeaderPhase::Dispatched => Some(LeaderPhase::AwaitingReports),
            LeaderPhase::AwaitingReports => Some(LeaderPhase::Reviewing),
            LeaderPhase::Reviewing => Some(LeaderPhase::Concluded),
            LeaderPhase::Concluded => Some(LeaderPhase::Idle),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LeaderPhase::Idle)
    }
}

/// One mission fragment, immutable once dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub mission_id: MissionId,
    pub worker: AgentId,
    pub description: String,
    pub focus: Vec<String>,
}

/// Another dispatched worker, as seen by a colleague
/// Mission-level input a worker keeps for the duration of its subtask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub mission: String,

    /// Environment context shared by the leader
    pub context: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: AgentId,
    pub expertise: Expertise,
    pub focus: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Open,
    Answered,
}

/// Ask from one worker to another, keyed by its 4-digit id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationRequest {
    pub id: String,
    pub requester: AgentId,
    pub target: AgentId,
    pub detail: String,
    pub state: RequestState,
}

impl CollaborationRequest {
    pub fn open(id: String, requester: AgentId, target: AgentId, detail: String) -> Self {
        Self {
            id,
            requester,
            target,
            detail,
            state: RequestState::Open,
        }
    }
}

/// Collaborator answer stored in a worker's inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knowledge {
    pub from: AgentId,
    pub request_id: String,
    pub focus: Vec<String>,
    pub response: String,
    pub received_at: DateTime<Utc>,
}

/// What a leader inbox entry holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboxContent {
    TaskResponse(TaskResponse),

    /// Worker did not report before the deadline
    TimedOut,
}

/// Report accepted by the leader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub sender: AgentId,
    pub focus: Vec<String>,
    pub received_at: DateTime<Utc>,
    pub content: InboxContent,
}

impl InboxEntry {
    pub fn response(&self) -> Option<&TaskResponse> {
        match &self.content {
            InboxContent::TaskResponse(response) => Some(response),
            InboxContent::TimedOut => None,
        }
    }
}

/// The leader's single open unit of work
#[derive(Debug, Clone)]
pub struct Mission {
    pub id: MissionId,
    pub description: String,
    pub context: Vec<String>,
    pub difficulty: Option<Difficulty>,
    pub subtasks: Vec<Subtask>,
    pub pending: BTreeSet<AgentId>,
    pub iteration: u32,
    pub inbox: Vec<InboxEntry>,
    pub feedback: Vec<String>,
}

impl Mission {
    pub fn new(description: String, context: Vec<String>) -> Self {
        Self {
            id: MissionId::new(),
            description,
            context,
            difficulty: None,
            subtasks: Vec::new(),
            pending: BTreeSet::new(),
            iteration: 0,
            inbox: Vec::new(),
            feedback: Vec::new(),
        }
    }

    pub fn subtask_for(&self, worker: &AgentId) -> Option<&Subtask> {
        self.subtasks.iter().find(|st| &st.worker == worker)
    }

    pub fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            mission_id: self.id,
            description: self.description.clone(),
            difficulty: self.difficulty,
            iteration: self.iteration,
            subtasks: self.subtasks.clone(),
            pending: self.pending.iter().cloned().collect(),
            inbox: self.inbox.clone(),
            feedback: self.feedback.clone(),
        }
    }
}

/// Copy of a mission for observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub mission_id: MissionId,
    pub description: String,
    pub difficulty: Option<Difficulty>,
    pub iteration: u32,
    pub subtasks: Vec<Subtask>,
    pub pending: Vec<AgentId>,
    pub inbox: Vec<InboxEntry>,
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderSnapshot {
    pub phase: LeaderPhase,
    pub mission: Option<MissionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub id: AgentId,
    pub status: WorkerStatus,
    pub subtask: Option<Subtask>,
    pub collaborators: Vec<Collaborator>,
    pub outstanding: Vec<CollaborationRequest>,
    pub answered: Vec<CollaborationRequest>,
    pub queued: usize,
    pub knowledge: Vec<Knowledge>,
    pub cache: HashMap<MissionId, TaskContext>,
    pub reported: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorSnapshot {
    pub reviews_received: u32,
    pub last_mission: Option<MissionId>,
    pub last_report: Option<InspectionReport>,
}

/// Read-only summary computed at mission close
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Share of leader inbox entries that are task responses
    pub task_completion: f64,

    /// Share of leader inbox entries built on collaborator input
    pub collaboration_quality: f64,

    pub elapsed_ms: u64,
    pub error_count: u32,
}

impl TaskMetrics {
    /// Derive ratios from the closed mission's inbox; 0.0 for an empty inbox
    pub fn from_inbox(inbox: &[InboxEntry], elapsed_ms: u64, error_count: u32) -> Self {
        let total = inbox.len();
        if total == 0 {
            return Self {
                elapsed_ms,
                error_count,
                ..Default::default()
            };
        }

        let responses = inbox.iter().filter_map(InboxEntry::response);
        let (completed, collaborative) = responses.fold((0usize, 0usize), |(done, collab), r| {
            (done + 1, collab + usize::from(r.collaborator_inputs > 0))
        });

        Self {
            task_completion: completed as f64 / total as f64,
            collaboration_quality: collaborative as f64 / total as f64,
            elapsed_ms,
            error_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Running,
    Completed,
    Failed,

    /// Leader was busy with another mission
    Rejected,
}

/// Outcome of one orchestrated mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub mission_id: Option<MissionId>,
    pub status: MissionStatus,
    pub difficulty: Option<Difficulty>,
    pub metrics: TaskMetrics,
    pub responses: Vec<InboxEntry>,
    pub feedback: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(worker: &str, collaborator_inputs: usize) -> InboxEntry {
        InboxEntry {
            sender: AgentId::from(worker),
            focus: vec!["speed".to_string()],
            received_at: Utc::now(),
            content: InboxContent::TaskResponse(TaskResponse {
                worker_id: AgentId::from(worker),
                mission_id: MissionId::new(),
                subtask_id: "ST1".to_string(),
                response: "done".to_string(),
                collaborator_inputs,
            }),
        }
    }

    fn timed_out(worker: &str) -> InboxEntry {
        InboxEntry {
            sender: AgentId::from(worker),
            focus: vec![],
            received_at: Utc::now(),
            content: InboxContent::TimedOut,
        }
    }

    #[test]
    fn test_leader_phase_cycle() {
        let mut phase = LeaderPhase::Idle;
        let mut visited = vec![phase];
        while let Some(next) = phase.next() {
            if next.is_idle() {
                break;
            }
            visited.push(next);
            phase = next;
        }
        assert_eq!(
            visited,
            vec![
                LeaderPhase::Idle,
                LeaderPhase::Assigning,
                LeaderPhase::Dispatched,
                LeaderPhase::AwaitingReports,
                LeaderPhase::Reviewing,
                LeaderPhase::Concluded
            ]
        );
    }

    #[test]
    fn test_metrics_empty_inbox() {
        let metrics = TaskMetrics::from_inbox(&[], 12, 1);
        assert_eq!(metrics.task_completion, 0.0);
        assert_eq!(metrics.collaboration_quality, 0.0);
        assert_eq!(metrics.elapsed_ms, 12);
        assert_eq!(metrics.error_count, 1);
    }

    #[test]
    fn test_metrics_ratios() {
        let inbox = vec![
            response("Worker_0", 2),
            response("Worker_1", 0),
            response("Worker_2", 1),
            timed_out("Worker_3"),
        ];
        let metrics = TaskMetrics::from_inbox(&inbox, 0, 0);
        assert_eq!(metrics.task_completion, 0.75);
        assert_eq!(metrics.collaboration_quality, 0.5);
    }

    #[test]
    fn test_mission_snapshot_orders_pending() {
        let mut mission = Mission::new("assemble package X".to_string(), vec![]);
        mission.pending.insert(AgentId::from("Worker_2"));
        mission.pending.insert(AgentId::from("Worker_0"));
        let snapshot = mission.snapshot();
        assert_eq!(
            snapshot.pending,
            vec![AgentId::from("Worker_0"), AgentId::from("Worker_2")]
        );
        assert_eq!(snapshot.mission_id, mission.id);
    }
}
