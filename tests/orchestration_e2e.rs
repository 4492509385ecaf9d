//! End-to-End Orchestration Tests
//!
//! Full missions driven through the orchestrator against a scripted oracle:
//! - Dispatch, reporting and review
//! - Peer collaboration
//! - Deadlines and partial completion
//! - Retry, failure and rejection

mod common;

use common::*;
use prefrontal_core::orchestration::prompts::{
    STAGE_COLLABORATION, STAGE_DECOMPOSITION, STAGE_EXECUTION, STAGE_INSPECTION,
    STAGE_REFLECTION,
};
use prefrontal_core::orchestration::{InboxContent, LeaderPhase, MissionStatus};
use prefrontal_core::{AgentId, Difficulty, Orchestrator, PrefrontalError, ScriptedOracle};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Dispatch and reporting
// =============================================================================

#[tokio::test]
async fn test_three_worker_mission_completes() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(
                &[STAGE_DECOMPOSITION],
                [decomposition(&["Worker_0", "Worker_1", "Worker_2"])],
            )
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(&[STAGE_EXECUTION], [answer("subtask finished")])
            .route(&[STAGE_INSPECTION], [passed_review()]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(3, true), oracle.clone())
        .await
        .unwrap();

    let report = orchestrator
        .execute_mission("assemble package X", vec!["bench 2 is free".to_string()])
        .await
        .unwrap();

    assert_eq!(report.status, MissionStatus::Completed);
    assert_eq!(report.difficulty, Some(Difficulty::High));
    assert_eq!(report.responses.len(), 3);
    assert!(report
        .responses
        .iter()
        .all(|entry| matches!(entry.content, InboxContent::TaskResponse(_))));
    assert_eq!(report.metrics.task_completion, 1.0);
    assert_eq!(report.metrics.collaboration_quality, 0.0);
    assert_eq!(report.feedback, vec!["Passed".to_string()]);

    // Workers see the shared environment context
    let worker_prompts: Vec<String> = oracle
        .prompts()
        .into_iter()
        .filter(|p| p.contains(STAGE_REFLECTION) || p.contains(STAGE_EXECUTION))
        .collect();
    assert_eq!(worker_prompts.len(), 6);
    assert!(worker_prompts.iter().all(|p| p.contains("bench 2 is free")));

    let inspector = orchestrator.inspector_snapshot().await.unwrap();
    assert_eq!(inspector.reviews_received, 1);
    assert_eq!(oracle.count_matching(&[STAGE_INSPECTION]), 1);

    let leader = orchestrator.leader_snapshot().await.unwrap();
    assert_eq!(leader.phase, LeaderPhase::Idle);
    assert!(leader.mission.is_none());

    assert_eq!(orchestrator.allocation_level().await.unwrap(), Some(2));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_subtask_for_unknown_worker_is_dropped() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(
                &[STAGE_DECOMPOSITION],
                [decomposition(&[
                    "Worker_0", "Worker_1", "Worker_2", "Worker_3", "Worker_4", "Worker_5",
                ])],
            )
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(&[STAGE_EXECUTION], [answer("done")]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(5, false), oracle.clone())
        .await
        .unwrap();

    let report = orchestrator
        .execute_mission("survey the warehouse", vec![])
        .await
        .unwrap();

    assert_eq!(report.responses.len(), 5);
    assert!(report
        .responses
        .iter()
        .all(|entry| entry.sender != AgentId::from("Worker_5")));
    assert_eq!(oracle.count_matching(&[STAGE_REFLECTION]), 5);
    assert_eq!(report.metrics.task_completion, 1.0);

    orchestrator.shutdown().await;
}

// =============================================================================
// Collaboration
// =============================================================================

#[tokio::test]
async fn test_collaboration_answer_reaches_requester() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(
                &[STAGE_DECOMPOSITION],
                [decomposition(&["Worker_0", "Worker_1", "Worker_2"])],
            )
            .route(
                &[STAGE_REFLECTION, agent("Worker_0").as_str()],
                [ask("0001", "Worker_1", "Where is the box?")],
            )
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(
                &[STAGE_COLLABORATION, agent("Worker_1").as_str()],
                [answer("The box is on the left shelf")],
            )
            .route(&[STAGE_EXECUTION], [answer("done")]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(3, false), oracle.clone())
        .await
        .unwrap();

    let report = orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .unwrap();

    assert_eq!(report.metrics.task_completion, 1.0);
    assert!((report.metrics.collaboration_quality - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(oracle.count_matching(&[STAGE_COLLABORATION]), 1);

    // The requester executed once, with the answer folded into its prompt
    let executions: Vec<String> = oracle
        .prompts()
        .into_iter()
        .filter(|p| p.contains(STAGE_EXECUTION) && p.contains(agent("Worker_0").as_str()))
        .collect();
    assert_eq!(executions.len(), 1);
    assert!(executions[0].contains("The box is on the left shelf"));

    orchestrator.shutdown().await;
}

// =============================================================================
// Review
// =============================================================================

#[tokio::test]
async fn test_failed_review_issues_logged_in_order() {
    let review = json!({
        "passed": false,
        "issues": [
            {"issue_id": "I001", "type": "contradiction", "description": "positions disagree", "severity": "critical"},
            {"issue_id": "I002", "type": "missing_info", "description": "no grip force", "severity": "warning"}
        ]
    })
    .to_string();
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(&[STAGE_DECOMPOSITION], [decomposition(&["Worker_0", "Worker_1"])])
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(&[STAGE_EXECUTION], [answer("done")])
            .route(&[STAGE_INSPECTION], [review]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(2, true), oracle).await.unwrap();

    let report = orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .unwrap();

    assert_eq!(report.feedback.len(), 2);
    assert!(report.feedback[0].starts_with("[I001]"));
    assert!(report.feedback[0].contains("positions disagree"));
    assert!(report.feedback[1].starts_with("[I002]"));

    orchestrator.shutdown().await;
}

// =============================================================================
// Deadlines, retries and failures
// =============================================================================

#[tokio::test]
async fn test_report_deadline_gives_partial_completion() {
    // Worker_2 is registered but not dispatched, so it drops the request and
    // Worker_0 never gets to execute
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(&[STAGE_DECOMPOSITION], [decomposition(&["Worker_0", "Worker_1"])])
            .route(
                &[STAGE_REFLECTION, agent("Worker_0").as_str()],
                [ask("0007", "Worker_2", "Scan the shelf")],
            )
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(&[STAGE_EXECUTION], [answer("done")]),
    );
    let mut config = test_config(3, false);
    config.deadlines.report_timeout_secs = 1;
    let mut orchestrator = Orchestrator::new(&config, oracle.clone()).await.unwrap();

    let report = orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .unwrap();

    assert_eq!(report.status, MissionStatus::Completed);
    assert_eq!(report.metrics.task_completion, 0.5);
    assert!(report
        .responses
        .iter()
        .any(|entry| entry.sender == AgentId::from("Worker_0")
            && entry.content == InboxContent::TimedOut));
    assert!(report
        .feedback
        .iter()
        .any(|line| line.contains("Worker_0 timed out")));
    assert_eq!(
        oracle.count_matching(&[STAGE_EXECUTION, agent("Worker_0").as_str()]),
        0
    );

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_malformed_then_valid_decomposition() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(
                &[STAGE_DECOMPOSITION],
                ["this is not json".to_string(), decomposition(&["Worker_0"])],
            )
            .route(&[STAGE_REFLECTION], [no_collaboration()])
            .route(&[STAGE_EXECUTION], [answer("done")]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(2, false), oracle.clone())
        .await
        .unwrap();

    let report = orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .unwrap();

    assert_eq!(oracle.count_matching(&[STAGE_DECOMPOSITION]), 2);
    assert_eq!(report.responses.len(), 1);
    assert_eq!(report.responses[0].sender, AgentId::from("Worker_0"));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_exhausted_decomposition_fails_mission() {
    let oracle = Arc::new(ScriptedOracle::new().route(&[STAGE_DECOMPOSITION], ["nonsense"]));
    let mut orchestrator = Orchestrator::new(&test_config(2, false), oracle).await.unwrap();

    let err = orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, PrefrontalError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(orchestrator.status(), MissionStatus::Failed);
    assert_eq!(orchestrator.error_count(), 1);

    // Nothing was dispatched, so the leader is free again
    let leader = orchestrator.leader_snapshot().await.unwrap();
    assert!(leader.phase.is_idle());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_failure_after_dispatch_leaves_leader_busy() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .route(&[STAGE_DECOMPOSITION], [decomposition(&["Worker_0"])])
            .route(&[STAGE_REFLECTION], ["still not json"]),
    );
    let mut orchestrator = Orchestrator::new(&test_config(2, false), oracle).await.unwrap();

    assert!(orchestrator
        .execute_mission("assemble package X", vec![])
        .await
        .is_err());
    assert_eq!(orchestrator.error_count(), 1);

    let report = orchestrator
        .execute_mission("assemble package Y", vec![])
        .await
        .unwrap();
    assert_eq!(report.status, MissionStatus::Rejected);
    assert!(report.mission_id.is_none());
    assert_eq!(report.metrics.error_count, 1);
    assert_eq!(orchestrator.status(), MissionStatus::Rejected);

    orchestrator.shutdown().await;
}
