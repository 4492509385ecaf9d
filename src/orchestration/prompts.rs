//! Prompt templates for oracle consultations
//!
//! Every prompt starts with a `Stage:` line and, for per-actor prompts, an
//! `Agent ID:` line so responses can be told apart when recorded or scripted.

use crate::config::WorkerSpec;
use crate::orchestration::messages::{CollabRequest, TaskReview};
use crate::orchestration::state::{Collaborator, Knowledge, Subtask, TaskContext};
use crate::types::{AgentId, Expertise};
use serde_json::json;

pub const STAGE_DECOMPOSITION: &str = "Stage: decomposition";
pub const STAGE_REFLECTION: &str = "Stage: reflection";
pub const STAGE_COLLABORATION: &str = "Stage: collaboration";
pub const STAGE_EXECUTION: &str = "Stage: execution";
pub const STAGE_INSPECTION: &str = "Stage: inspection";
pub const STAGE_PLANNING: &str = "Stage: planning";
pub const STAGE_ACTION_SELECTION: &str = "Stage: action-selection";

/// `Agent ID:` line identifying the consulting actor
pub fn agent_line(id: &AgentId) -> String {
    format!("Agent ID: {}", id)
}

pub fn decomposition(leader: &AgentId, workers: &[WorkerSpec], mission: &str) -> String {
    let roster = workers
        .iter()
        .map(|w| format!("- {}: {}", w.id, w.expertise))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{stage}
{agent}
Role: Mission Coordinator
Task: Rate the mission's difficulty, split it into subtasks and give each subtask to the best-suited worker.

Workers:
{roster}

Mission: {mission}

Instructions:
1. Label the difficulty "low" (single movement), "medium" (one object interaction) or "high" (multi-step work needing several specialists).
2. For high difficulty, list subtasks with:
   - "subtask_id": unique identifier
   - "assigned_worker": one of the worker ids above
   - "task_description": concrete objective
   - "focus": 3-5 short keywords
3. Assign at most one subtask per worker.

Output JSON only:
{{"difficulty": "high", "subtasks": [{{"subtask_id": "ST1", "assigned_worker": "Worker_1", "task_description": "Locate the red mug on the table", "focus": ["accuracy", "object detection"]}}]}}"#,
        stage = STAGE_DECOMPOSITION,
        agent = agent_line(leader),
        roster = roster,
        mission = json!(mission),
    )
}

pub fn reflection(
    worker: &AgentId,
    expertise: &Expertise,
    subtask: &Subtask,
    task: &TaskContext,
    collaborators: &[Collaborator],
) -> String {
    let colleagues = collaborators
        .iter()
        .map(|c| format!("- {}: {} (focus: {})", c.id, c.expertise, c.focus.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{stage}
{agent}
Role: Specialist Worker ({expertise})
Task: Self-Reflection. Decide whether colleagues must help you finish your subtask.

Subtask: {subtask}

Colleagues:
{colleagues}

Instructions:
1. Identify skills or data your subtask needs that your expertise lacks.
2. If nothing is missing, answer {{"collaboration_required": false, "requirement": []}}.
3. Otherwise list one request per colleague you need, each with a 4-digit "request_id", the colleague's "worker_id" and a concrete "request_detail".

Output JSON only:
{{"collaboration_required": true, "requirement": [{{"request_id": "0001", "worker_id": "Worker_1", "request_detail": "Report the mug's position relative to the table edge"}}]}}"#,
        stage = STAGE_REFLECTION,
        agent = agent_line(worker),
        expertise = expertise,
        subtask = json!({
            "mission": task.mission,
            "environment_info": task.context,
            "subtask_id": subtask.id,
            "task_description": subtask.description,
            "focus": subtask.focus,
        }),
        colleagues = if colleagues.is_empty() { "(none)".to_string() } else { colleagues },
    )
}

pub fn collaboration(worker: &AgentId, expertise: &Expertise, request: &CollabRequest) -> String {
    format!(
        r#"{stage}
{agent}
Request ID: {request_id}
Role: Collaborating Worker ({expertise})
Task: Carry out the colleague's request and report the result.

Request: {request}

Output JSON only:
{{"response": "<detailed result of the requested work>"}}"#,
        stage = STAGE_COLLABORATION,
        agent = agent_line(worker),
        request_id = request.request_id,
        expertise = expertise,
        request = json!({
            "request_id": request.request_id,
            "requester_id": request.requester_id,
            "request_detail": request.request_detail,
        }),
    )
}

pub fn execution(
    worker: &AgentId,
    expertise: &Expertise,
    subtask: &Subtask,
    task: &TaskContext,
    knowledge: &[Knowledge],
) -> String {
    let received: Vec<_> = knowledge
        .iter()
        .map(|k| json!({"worker_id": k.from, "focus": k.focus, "response": k.response}))
        .collect();

    format!(
        r#"{stage}
{agent}
Role: Specialist Worker ({expertise})
Task: Complete your subtask, combining your own expertise with what colleagues reported.

Input: {input}

Instructions:
1. Start from your own expertise.
2. Fold in each received item, noting which colleague it came from.
3. Call out contradictions between received items instead of silently picking one.

Output JSON only:
{{"response": "<detailed result>"}}"#,
        stage = STAGE_EXECUTION,
        agent = agent_line(worker),
        expertise = expertise,
        input = json!({
            "mission": task.mission,
            "environment_info": task.context,
            "task_description": subtask.description,
            "focus": subtask.focus,
            "received_knowledge": received,
        }),
    )
}

pub fn inspection(inspector: &AgentId, review: &TaskReview) -> String {
    let responses: Vec<_> = review
        .responses
        .iter()
        .map(|entry| match entry.response() {
            Some(r) => json!({"worker_id": entry.sender, "focus": entry.focus, "response": r.response}),
            None => json!({"worker_id": entry.sender, "focus": entry.focus, "response": null}),
        })
        .collect();

    format!(
        r#"{stage}
{agent}
Role: Quality Inspector
Task: Check the workers' responses against the mission and the environment information.

Input: {input}

Instructions:
1. Flag contradictions with the environment information.
2. Flag information the environment does not support and required elements that are missing.
3. Flag responses outside their subtask's scope.
4. Fail the review if any issue is critical.

Output JSON only:
{{"passed": false, "issues": [{{"issue_id": "I001", "type": "contradiction", "description": "<what is wrong>", "severity": "critical"}}]}}
"type" is one of contradiction, missing_info, scope_violation; "severity" is critical or warning."#,
        stage = STAGE_INSPECTION,
        agent = agent_line(inspector),
        input = json!({
            "task_description": review.description,
            "environment_info": review.context,
            "worker_response": responses,
        }),
    )
}

pub fn plan_tree(
    task: &str,
    current_state: &str,
    actions: &[String],
    observations: &[String],
) -> String {
    format!(
        r#"{stage}
Role: Planning Expert
Task: Build a state-transition tree of at most five layers from the current state.

Input: {input}

Instructions:
1. Nodes are states, edges are actions from the available list with a transition probability.
2. Score every state from 0 (poor) to 1 (goal reached) and mark goal states.
3. Goal states and leaves have empty transitions.

Output JSON only:
{{"next_state": {{"state": "<state>", "score": 0.2, "is_goal": false, "transitions": [{{"action": "<action>", "probability": 0.9, "next_state": {{"state": "<state>", "score": 1.0, "is_goal": true, "transitions": []}}}}]}}}}"#,
        stage = STAGE_PLANNING,
        input = json!({
            "task_description": task,
            "current_state": current_state,
            "available_actions": actions,
            "observations": observations,
        }),
    )
}

pub fn action_selection(
    task: &str,
    current_state: &str,
    actions: &[String],
    observations: &[String],
) -> String {
    format!(
        r#"{stage}
Role: Action Selector
Task: Pick the single best next action from the available list.

Input: {input}

Output JSON only:
{{"selected_action": "<action>", "reason": "<one sentence>"}}"#,
        stage = STAGE_ACTION_SELECTION,
        input = json!({
            "task_description": task,
            "current_state": current_state,
            "available_actions": actions,
            "observations": observations,
        }),
    )
}
