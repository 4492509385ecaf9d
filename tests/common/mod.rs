//! Common test utilities and helpers

#![allow(dead_code)]

use prefrontal_core::orchestration::RetryPolicy;
use prefrontal_core::PrefrontalConfig;
use serde_json::json;

/// Default roster cut to `workers` workers, with fast retries and deadlines
pub fn test_config(workers: usize, review_phase: bool) -> PrefrontalConfig {
    let mut config = PrefrontalConfig::default();
    config.roster.workers.truncate(workers);
    config.retry = RetryPolicy::immediate(3);
    config.deadlines.report_timeout_secs = 2;
    config.deadlines.review_timeout_secs = 2;
    config.deadlines.phase_timeout_secs = 10;
    config.orchestration.review_phase = review_phase;
    config
}

/// High-difficulty decomposition with one subtask per listed worker
pub fn decomposition(workers: &[&str]) -> String {
    let subtasks: Vec<_> = workers
        .iter()
        .enumerate()
        .map(|(i, worker)| {
            json!({
                "subtask_id": format!("ST{}", i + 1),
                "assigned_worker": worker,
                "task_description": format!("part {} of the mission", i + 1),
                "focus": [format!("focus-{}", i + 1)],
            })
        })
        .collect();
    json!({"difficulty": "high", "subtasks": subtasks}).to_string()
}

pub fn no_collaboration() -> String {
    json!({"collaboration_required": false, "requirement": []}).to_string()
}

/// Reflection asking `target` for help under `request_id`
pub fn ask(request_id: &str, target: &str, detail: &str) -> String {
    json!({
        "collaboration_required": true,
        "requirement": [{"request_id": request_id, "worker_id": target, "request_detail": detail}]
    })
    .to_string()
}

pub fn answer(text: &str) -> String {
    json!({"response": text}).to_string()
}

pub fn passed_review() -> String {
    json!({"passed": true, "issues": []}).to_string()
}

/// Needle selecting prompts addressed to `id`
pub fn agent(id: &str) -> String {
    format!("Agent ID: {}", id)
}
