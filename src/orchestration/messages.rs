//! Actor Message Protocol
//!
//! Two layers:
//!
//! - **Envelope / Payload**: the inter-actor channel. Payloads are a closed
//!   set of kinds; every field that came from the oracle was validated before
//!   the payload could be built.
//! - **Per-actor enums**: `Deliver(Envelope)` for peer traffic plus RPC
//!   variants the orchestrator uses to drive phases and read snapshots.

use crate::error::Result;
use crate::orchestration::schema::InspectionReport;
use crate::orchestration::state::{
    Collaborator, InboxEntry, InspectorSnapshot, LeaderSnapshot, MissionSnapshot, WorkerSnapshot,
};
use crate::types::{AgentId, Difficulty, MissionId};
use chrono::{DateTime, Utc};
use ractor::RpcReplyPort;
use serde::{Deserialize, Serialize};

/// Subtask handed from the leader to one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssign {
    pub mission_id: MissionId,
    pub subtask_id: String,
    pub mission: String,
    pub subtask: String,
    pub context: Vec<String>,
    pub focus: Vec<String>,
    pub collaborators: Vec<Collaborator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabRequest {
    pub request_id: String,
    pub requester_id: AgentId,
    pub request_detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabResponse {
    pub request_id: String,
    pub sender_id: AgentId,
    pub response: String,
}

/// Worker's report on its subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub worker_id: AgentId,
    pub mission_id: MissionId,
    pub subtask_id: String,
    pub response: String,

    /// Collaborator answers folded into the response
    #[serde(default)]
    pub collaborator_inputs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReview {
    pub mission_id: MissionId,
    pub description: String,
    pub context: Vec<String>,
    pub responses: Vec<InboxEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub mission_id: MissionId,
    pub review: InspectionReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDifficulty {
    pub level: Difficulty,
}

/// Closed set of inter-actor message kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    TaskAssign(TaskAssign),
    CollabRequest(CollabRequest),
    CollabResponse(CollabResponse),
    TaskResponse(TaskResponse),
    TaskReview(TaskReview),
    ReviewResponse(ReviewResponse),
    TaskDifficulty(TaskDifficulty),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::TaskAssign(_) => "task_assign",
            Payload::CollabRequest(_) => "collab_request",
            Payload::CollabResponse(_) => "collab_response",
            Payload::TaskResponse(_) => "task_response",
            Payload::TaskReview(_) => "task_review",
            Payload::ReviewResponse(_) => "review_response",
            Payload::TaskDifficulty(_) => "task_difficulty",
        }
    }
}

/// Routed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: AgentId,
    pub recipient: AgentId,
    pub payload: Payload,
    pub received_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(sender: AgentId, recipient: AgentId, payload: Payload) -> Self {
        Self {
            sender,
            recipient,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Result of `assign`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Mission opened; `dispatched` lists workers that received a subtask
    Accepted {
        mission_id: MissionId,
        difficulty: Difficulty,
        dispatched: Vec<AgentId>,
    },

    /// A mission is already open; nothing changed
    Busy,
}

/// Result of `process_feedback`
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    /// Reports still outstanding; mission left open
    Incomplete { pending: Vec<AgentId> },

    /// Mission closed and reset; final contents returned
    Closed(MissionSnapshot),

    NoMission,
}

/// Result of a worker's `work` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Subtask executed and reported to the leader
    Executed { collaborator_inputs: usize },

    /// Asks or incoming requests still unresolved
    Deferred { outstanding: usize, queued: usize },

    /// Worker was not idle
    Occupied,

    NoTask,

    /// Subtask was already executed for this assignment
    AlreadyReported,
}

/// Messages for the Leader actor
#[derive(Debug)]
pub enum LeaderMessage {
    Deliver(Envelope),

    /// Open a mission, decompose it and dispatch subtasks
    Assign {
        description: String,
        context: Vec<String>,
        reply: RpcReplyPort<Result<AssignOutcome>>,
    },

    /// Answered once the pending set is empty
    AwaitReports(RpcReplyPort<()>),

    /// Convert every still-pending worker into a timed-out report
    ExpirePending(RpcReplyPort<Vec<AgentId>>),

    /// Answered once a requested review has been recorded
    AwaitReview(RpcReplyPort<()>),

    ProcessFeedback(RpcReplyPort<FeedbackOutcome>),

    Snapshot(RpcReplyPort<LeaderSnapshot>),
}

/// Messages for a Worker actor
#[derive(Debug)]
pub enum WorkerMessage {
    Deliver(Envelope),

    /// Self-reflection; replies with the number of requests sent
    Reflect(RpcReplyPort<Result<usize>>),

    /// Serve queued requests; replies with the number answered
    Collaborate(RpcReplyPort<Result<usize>>),

    Work(RpcReplyPort<Result<WorkOutcome>>),

    /// Drop the subtask and everything scoped to it
    Reset(RpcReplyPort<()>),

    Snapshot(RpcReplyPort<WorkerSnapshot>),
}

/// Messages for the Inspector actor
#[derive(Debug)]
pub enum InspectorMessage {
    Deliver(Envelope),
    Snapshot(RpcReplyPort<InspectorSnapshot>),
}

/// Messages for the Pipeline actor
#[derive(Debug)]
pub enum PipelineMessage {
    Deliver(Envelope),

    /// Last recorded allocation level, if any
    AllocationLevel(RpcReplyPort<Option<u8>>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_kind_tags() {
        let payload = Payload::TaskDifficulty(TaskDifficulty {
            level: Difficulty::Medium,
        });
        assert_eq!(payload.kind(), "task_difficulty");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"type": "task_difficulty", "level": "medium"})
        );
    }

    #[test]
    fn test_collab_request_wire_format() {
        let payload: Payload = serde_json::from_value(json!({
            "type": "collab_request",
            "request_id": "0001",
            "requester_id": "Worker_1",
            "request_detail": "Locate the mug"
        }))
        .unwrap();
        match payload {
            Payload::CollabRequest(req) => {
                assert_eq!(req.request_id, "0001");
                assert_eq!(req.requester_id, AgentId::from("Worker_1"));
            }
            other => panic!("unexpected payload {}", other.kind()),
        }
    }

    #[test]
    fn test_task_response_defaults_collaborator_inputs() {
        let response: TaskResponse = serde_json::from_value(json!({
            "worker_id": "Worker_0",
            "mission_id": MissionId::new(),
            "subtask_id": "ST1",
            "response": "moved to the desk"
        }))
        .unwrap();
        assert_eq!(response.collaborator_inputs, 0);
    }
}
