//! Typed oracle responses
//!
//! Each interaction type has a typed response that can only be built from a
//! value the validator accepted. Deserialization happens after validation,
//! so every typed value is known to satisfy its schema's cross-field rules.

use crate::orchestration::validator::{validate, SchemaKind};
use crate::types::{AgentId, Difficulty};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Why a value could not become a typed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub kind: SchemaKind,
    pub reason: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} schema violation: {}", self.kind, self.reason)
    }
}

/// A response type gated by one validator
pub trait Schema: DeserializeOwned + Sized {
    const KIND: SchemaKind;

    /// Validate, then deserialize
    fn from_value(value: Value) -> Result<Self, SchemaViolation> {
        if !validate(Self::KIND, &value) {
            return Err(SchemaViolation {
                kind: Self::KIND,
                reason: "validator rejected response".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| SchemaViolation {
            kind: Self::KIND,
            reason: e.to_string(),
        })
    }
}

/// One subtask proposed by the leader's decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskPlan {
    pub subtask_id: String,
    pub assigned_worker: AgentId,
    pub task_description: String,
    pub focus: Vec<String>,
}

/// Leader decomposition: difficulty plus candidate subtasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub difficulty: Difficulty,
    pub subtasks: Vec<SubtaskPlan>,
}

impl Schema for Decomposition {
    const KIND: SchemaKind = SchemaKind::Decomposition;
}

impl Decomposition {
    /// Drop subtasks naming a worker outside `pool`, any subtask reusing a
    /// kept subtask id, and any second subtask for a worker that already has
    /// one. Order is preserved.
    pub fn retain_pool(self, pool: &[AgentId]) -> Vec<SubtaskPlan> {
        let mut assigned = HashSet::new();
        let mut ids = HashSet::new();
        self.subtasks
            .into_iter()
            .filter(|st| {
                if !pool.contains(&st.assigned_worker) {
                    tracing::debug!(
                        "Dropping subtask {} for unknown worker {}",
                        st.subtask_id,
                        st.assigned_worker
                    );
                    return false;
                }
                if ids.contains(&st.subtask_id) {
                    tracing::debug!(
                        "Dropping duplicate subtask id {} for {}",
                        st.subtask_id,
                        st.assigned_worker
                    );
                    return false;
                }
                if !assigned.insert(st.assigned_worker.clone()) {
                    tracing::debug!(
                        "Dropping subtask {}: {} already holds a subtask",
                        st.subtask_id,
                        st.assigned_worker
                    );
                    return false;
                }
                ids.insert(st.subtask_id.clone());
                true
            })
            .collect()
    }
}

/// One collaboration request a worker wants to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub request_id: String,
    pub worker_id: AgentId,
    pub request_detail: String,
}

/// Worker self-reflection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub collaboration_required: bool,
    #[serde(default)]
    pub requirement: Vec<Requirement>,
}

impl Schema for Reflection {
    const KIND: SchemaKind = SchemaKind::Reflection;
}

/// Answer to a colleague's request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationAnswer {
    pub response: String,
}

impl Schema for CollaborationAnswer {
    const KIND: SchemaKind = SchemaKind::Collaboration;
}

/// Answer to a worker's own subtask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAnswer {
    pub response: String,
}

impl Schema for TaskAnswer {
    const KIND: SchemaKind = SchemaKind::Task;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Contradiction,
    MissingInfo,
    ScopeViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

/// Problem found by the inspector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub issue_id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub description: String,
    pub severity: Severity,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {:?}/{:?}: {}",
            self.issue_id, self.severity, self.issue_type, self.description
        )
    }
}

/// Inspector verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub passed: bool,
    pub issues: Vec<Issue>,
}

impl Schema for InspectionReport {
    const KIND: SchemaKind = SchemaKind::Inspection;
}

/// Node of a scored state-transition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub state: String,
    pub score: f64,
    pub is_goal: bool,
    pub transitions: Vec<PlanTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTransition {
    pub action: String,
    pub probability: f64,
    pub next_state: PlanNode,
}

/// Planner output: tree rooted at the current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTree {
    pub next_state: PlanNode,
}

impl Schema for PlanTree {
    const KIND: SchemaKind = SchemaKind::PlanTree;
}

/// Single-action selector output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSelection {
    pub selected_action: String,
    pub reason: String,
}

impl Schema for ActionSelection {
    const KIND: SchemaKind = SchemaKind::ActionSelection;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool(ids: &[&str]) -> Vec<AgentId> {
        ids.iter().map(|id| AgentId::from(*id)).collect()
    }

    #[test]
    fn test_decomposition_from_valid_value() {
        let d = Decomposition::from_value(json!({
            "difficulty": "high",
            "subtasks": [{
                "subtask_id": "ST1",
                "assigned_worker": "Worker_1",
                "task_description": "Find the mug",
                "focus": ["vision"]
            }]
        }))
        .unwrap();
        assert_eq!(d.difficulty, Difficulty::High);
        assert_eq!(d.subtasks[0].assigned_worker, AgentId::from("Worker_1"));
    }

    #[test]
    fn test_invalid_value_cannot_be_constructed() {
        let err = Reflection::from_value(json!({
            "collaboration_required": false,
            "requirement": [{"request_id": "0001", "worker_id": "Worker_1", "request_detail": "x"}]
        }))
        .unwrap_err();
        assert_eq!(err.kind, SchemaKind::Reflection);
    }

    #[test]
    fn test_retain_pool_drops_unknown_and_duplicate_workers() {
        let d = Decomposition {
            difficulty: Difficulty::High,
            subtasks: vec![
                SubtaskPlan {
                    subtask_id: "ST1".into(),
                    assigned_worker: "Worker_0".into(),
                    task_description: "a".into(),
                    focus: vec![],
                },
                SubtaskPlan {
                    subtask_id: "ST2".into(),
                    assigned_worker: "Worker_5".into(),
                    task_description: "b".into(),
                    focus: vec![],
                },
                SubtaskPlan {
                    subtask_id: "ST3".into(),
                    assigned_worker: "Worker_0".into(),
                    task_description: "c".into(),
                    focus: vec![],
                },
                SubtaskPlan {
                    subtask_id: "ST4".into(),
                    assigned_worker: "Worker_2".into(),
                    task_description: "d".into(),
                    focus: vec![],
                },
            ],
        };
        let kept = d.retain_pool(&pool(&["Worker_0", "Worker_1", "Worker_2"]));
        let ids: Vec<&str> = kept.iter().map(|s| s.subtask_id.as_str()).collect();
        assert_eq!(ids, vec!["ST1", "ST4"]);
    }

    #[test]
    fn test_retain_pool_drops_repeated_subtask_ids() {
        let plan = |id: &str, worker: &str| SubtaskPlan {
            subtask_id: id.into(),
            assigned_worker: worker.into(),
            task_description: "x".into(),
            focus: vec![],
        };
        let d = Decomposition {
            difficulty: Difficulty::Low,
            subtasks: vec![
                plan("ST7", "Worker_9"),
                plan("ST7", "Worker_0"),
                plan("ST7", "Worker_1"),
                plan("ST8", "Worker_1"),
            ],
        };
        let kept = d.retain_pool(&pool(&["Worker_0", "Worker_1"]));
        let pairs: Vec<(&str, &str)> = kept
            .iter()
            .map(|s| (s.subtask_id.as_str(), s.assigned_worker.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ST7", "Worker_0"), ("ST8", "Worker_1")]);
    }

    #[test]
    fn test_inspection_issue_types_deserialize() {
        let report = InspectionReport::from_value(json!({
            "passed": false,
            "issues": [{
                "issue_id": "I002",
                "type": "missing_info",
                "description": "no temperature data",
                "severity": "warning"
            }]
        }))
        .unwrap();
        assert_eq!(report.issues[0].issue_type, IssueType::MissingInfo);
        assert_eq!(report.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_reflection_requirement_defaults_to_empty() {
        let r = Reflection::from_value(json!({"collaboration_required": false})).unwrap();
        assert!(r.requirement.is_empty());
    }
}
