//! Response Validator
//!
//! Pure, stateless predicates that check a parsed oracle response against
//! the fixed schema of one interaction type. Validators never fail loudly:
//! any structural anomaly (missing key, wrong type, value outside a closed
//! set, malformed identifier, cross-field contradiction) yields `false`.
//!
//! Typed construction in [`crate::orchestration::schema`] runs these checks
//! first, so a response that fails here can never become a typed value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Collaboration request ids are exactly four digits
static REQUEST_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("static request id pattern"));

const DIFFICULTY_LEVELS: [&str; 3] = ["low", "medium", "high"];
const ISSUE_TYPES: [&str; 3] = ["contradiction", "missing_info", "scope_violation"];
const ISSUE_SEVERITIES: [&str; 2] = ["critical", "warning"];

/// Interaction types with a fixed response schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    /// Leader: difficulty label plus subtask list
    Decomposition,
    /// Worker: does the subtask need colleagues
    Reflection,
    /// Worker: answer to a colleague's request
    Collaboration,
    /// Worker: answer to its own subtask
    Task,
    /// Inspector: pass/fail with typed issues
    Inspection,
    /// Planner: scored state-transition tree
    PlanTree,
    /// Planner: single next action
    ActionSelection,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 7] = [
        SchemaKind::Decomposition,
        SchemaKind::Reflection,
        SchemaKind::Collaboration,
        SchemaKind::Task,
        SchemaKind::Inspection,
        SchemaKind::PlanTree,
        SchemaKind::ActionSelection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Decomposition => "task-decomposition",
            SchemaKind::Reflection => "worker-reflection",
            SchemaKind::Collaboration => "collaboration-result",
            SchemaKind::Task => "task-result",
            SchemaKind::Inspection => "inspection-result",
            SchemaKind::PlanTree => "plan-tree",
            SchemaKind::ActionSelection => "action-selection",
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = SchemaKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown schema kind '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Dispatch to the check for `kind`
pub fn validate(kind: SchemaKind, value: &Value) -> bool {
    match kind {
        SchemaKind::Decomposition => check_decomposition(value),
        SchemaKind::Reflection => check_reflection(value),
        SchemaKind::Collaboration => check_collaboration(value),
        SchemaKind::Task => check_task(value),
        SchemaKind::Inspection => check_inspection(value),
        SchemaKind::PlanTree => check_plan_tree(value),
        SchemaKind::ActionSelection => check_action_selection(value),
    }
}

fn is_str(obj: &Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), Some(Value::String(_)))
}

fn str_in(obj: &Map<String, Value>, key: &str, allowed: &[&str]) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .map_or(false, |s| allowed.contains(&s))
}

fn non_blank(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key)
        .and_then(Value::as_str)
        .map_or(false, |s| !s.trim().is_empty())
}

/// `{difficulty: low|medium|high, subtasks: [{subtask_id, assigned_worker,
/// task_description, focus: [string]}]}`
pub fn check_decomposition(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if !str_in(obj, "difficulty", &DIFFICULTY_LEVELS) {
        return false;
    }
    let Some(subtasks) = obj.get("subtasks").and_then(Value::as_array) else {
        return false;
    };

    subtasks.iter().all(|subtask| {
        let Some(st) = subtask.as_object() else {
            return false;
        };
        let focus_ok = st
            .get("focus")
            .and_then(Value::as_array)
            .map_or(false, |items| items.iter().all(Value::is_string));

        is_str(st, "subtask_id")
            && is_str(st, "assigned_worker")
            && is_str(st, "task_description")
            && focus_ok
    })
}

/// `{collaboration_required: bool, requirement: [{request_id: \d{4},
/// worker_id, request_detail}]}`; the requirement list defaults to empty and
/// must be empty when no collaboration is required. Request ids are unique.
pub fn check_reflection(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(required) = obj.get("collaboration_required").and_then(Value::as_bool) else {
        return false;
    };
    let empty = Vec::new();
    let requirements = match obj.get("requirement") {
        None => &empty,
        Some(Value::Array(items)) => items,
        Some(_) => return false,
    };
    if !required && !requirements.is_empty() {
        return false;
    }

    let mut seen = HashSet::new();
    requirements.iter().all(|req| {
        let Some(r) = req.as_object() else {
            return false;
        };
        let Some(request_id) = r.get("request_id").and_then(Value::as_str) else {
            return false;
        };

        REQUEST_ID_PATTERN.is_match(request_id)
            && seen.insert(request_id.to_string())
            && is_str(r, "worker_id")
            && non_blank(r, "request_detail")
    })
}

fn check_answer(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |obj| non_blank(obj, "response"))
}

/// `{response: non-blank string}`
pub fn check_collaboration(value: &Value) -> bool {
    check_answer(value)
}

/// `{response: non-blank string}`
pub fn check_task(value: &Value) -> bool {
    check_answer(value)
}

/// `{passed: bool, issues: [{issue_id, type, description, severity}]}`
///
/// A failed review with an empty issue list is accepted here.
pub fn check_inspection(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if !matches!(obj.get("passed"), Some(Value::Bool(_))) {
        return false;
    }
    let Some(issues) = obj.get("issues").and_then(Value::as_array) else {
        return false;
    };

    issues.iter().all(|issue| {
        let Some(i) = issue.as_object() else {
            return false;
        };
        is_str(i, "issue_id")
            && str_in(i, "type", &ISSUE_TYPES)
            && is_str(i, "description")
            && str_in(i, "severity", &ISSUE_SEVERITIES)
    })
}

/// `{next_state: node}` where a node is `{state, score, is_goal,
/// transitions: [{action, probability, next_state: node}]}`
pub fn check_plan_tree(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("next_state"))
        .map_or(false, check_plan_node)
}

fn check_plan_node(node: &Value) -> bool {
    let Some(obj) = node.as_object() else {
        return false;
    };
    let shape_ok = is_str(obj, "state")
        && obj.get("score").map_or(false, Value::is_number)
        && obj.get("is_goal").map_or(false, Value::is_boolean);
    if !shape_ok {
        return false;
    }
    let Some(transitions) = obj.get("transitions").and_then(Value::as_array) else {
        return false;
    };

    transitions.iter().all(|transition| {
        let Some(t) = transition.as_object() else {
            return false;
        };
        is_str(t, "action")
            && t.get("probability").map_or(false, Value::is_number)
            && t.get("next_state").map_or(false, check_plan_node)
    })
}

/// `{selected_action: string, reason: string}`
pub fn check_action_selection(value: &Value) -> bool {
    value
        .as_object()
        .map_or(false, |obj| is_str(obj, "selected_action") && is_str(obj, "reason"))
}
