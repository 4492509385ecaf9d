//! Planner interface
//!
//! The planner turns an action vocabulary and an observation list into a
//! scored state-transition tree and reads an action sequence off it. When the
//! pipeline's allocation level is 2 or more, a single-action selector runs
//! alongside it.

use crate::error::Result;
use crate::orchestration::prompts;
use crate::orchestration::retry::{consult, RetryPolicy};
use crate::orchestration::schema::{ActionSelection, PlanNode, PlanTree};
use crate::services::Oracle;
use async_trait::async_trait;
use std::sync::Arc;

/// Inputs shared by the planner and the action selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub task: String,
    pub current_state: String,
    pub actions: Vec<String>,
    pub observations: Vec<String>,
}

/// Produces an action sequence for a request
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<Vec<String>>;
}

/// Picks one next action for a request
#[async_trait]
pub trait ActionSelector: Send + Sync {
    async fn select(&self, request: &PlanRequest) -> Result<ActionSelection>;
}

/// Whether the secondary selector should run for an allocation level
pub fn allocation_requires_selector(level: u8) -> bool {
    level >= 2
}

/// Action sequence along the most probable path to a goal state.
///
/// Without a reachable goal, the path to the highest-scoring node is used.
pub fn optimal_actions(tree: &PlanTree) -> Vec<String> {
    let mut best: Option<Path> = None;
    walk(&tree.next_state, Vec::new(), 1.0, &mut best);
    best.map(|p| p.actions).unwrap_or_default()
}

struct Path {
    actions: Vec<String>,
    goal: bool,
    probability: f64,
    score: f64,
}

impl Path {
    fn beats(&self, other: &Path) -> bool {
        match (self.goal, other.goal) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => self.probability > other.probability,
            (false, false) => self.score > other.score,
        }
    }
}

fn walk(node: &PlanNode, actions: Vec<String>, probability: f64, best: &mut Option<Path>) {
    let here = Path {
        actions: actions.clone(),
        goal: node.is_goal,
        probability,
        score: node.score,
    };
    if best.as_ref().map_or(true, |b| here.beats(b)) {
        *best = Some(here);
    }
    if node.is_goal {
        return;
    }

    for transition in &node.transitions {
        let mut next = actions.clone();
        next.push(transition.action.clone());
        walk(
            &transition.next_state,
            next,
            probability * transition.probability,
            best,
        );
    }
}

/// Planner that asks the oracle for the tree
pub struct OraclePlanner {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
}

impl OraclePlanner {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy) -> Self {
        Self { oracle, retry }
    }
}

#[async_trait]
impl Planner for OraclePlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<Vec<String>> {
        let prompt = prompts::plan_tree(
            &request.task,
            &request.current_state,
            &request.actions,
            &request.observations,
        );
        let tree: PlanTree = consult(self.oracle.as_ref(), &prompt, &self.retry).await?;

        let sequence = optimal_actions(&tree);
        let unknown = sequence
            .iter()
            .filter(|a| !request.actions.contains(a))
            .count();
        if unknown > 0 {
            tracing::warn!("Plan uses {} actions outside the vocabulary", unknown);
        }
        tracing::debug!("Planned {} actions for '{}'", sequence.len(), request.task);
        Ok(sequence)
    }
}

/// Selector that asks the oracle for one action
pub struct OracleActionSelector {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
}

impl OracleActionSelector {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy) -> Self {
        Self { oracle, retry }
    }
}

#[async_trait]
impl ActionSelector for OracleActionSelector {
    async fn select(&self, request: &PlanRequest) -> Result<ActionSelection> {
        let prompt = prompts::action_selection(
            &request.task,
            &request.current_state,
            &request.actions,
            &request.observations,
        );
        consult(self.oracle.as_ref(), &prompt, &self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::prompts::{STAGE_ACTION_SELECTION, STAGE_PLANNING};
    use crate::services::ScriptedOracle;
    use serde_json::json;

    fn request() -> PlanRequest {
        PlanRequest {
            task: "fetch the cup".to_string(),
            current_state: "at door".to_string(),
            actions: vec!["move".to_string(), "grasp".to_string(), "wait".to_string()],
            observations: vec!["cup on table".to_string()],
        }
    }

    fn tree(value: serde_json::Value) -> PlanTree {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_allocation_requires_selector() {
        assert!(!allocation_requires_selector(1));
        assert!(allocation_requires_selector(2));
    }

    #[test]
    fn test_optimal_actions_prefers_most_probable_goal() {
        let tree = tree(json!({"next_state": {
            "state": "at door", "score": 0.1, "is_goal": false, "transitions": [
                {"action": "wait", "probability": 0.9, "next_state":
                    {"state": "at door", "score": 0.1, "is_goal": false, "transitions": []}},
                {"action": "move", "probability": 0.8, "next_state":
                    {"state": "at table", "score": 0.5, "is_goal": false, "transitions": [
                        {"action": "grasp", "probability": 0.5, "next_state":
                            {"state": "holding cup", "score": 1.0, "is_goal": true, "transitions": []}}
                    ]}},
                {"action": "grasp", "probability": 0.1, "next_state":
                    {"state": "holding cup", "score": 1.0, "is_goal": true, "transitions": []}}
            ]
        }}));

        assert_eq!(optimal_actions(&tree), vec!["move", "grasp"]);
    }

    #[test]
    fn test_optimal_actions_without_goal_follows_score() {
        let tree = tree(json!({"next_state": {
            "state": "at door", "score": 0.1, "is_goal": false, "transitions": [
                {"action": "move", "probability": 0.5, "next_state":
                    {"state": "at table", "score": 0.6, "is_goal": false, "transitions": []}},
                {"action": "wait", "probability": 0.5, "next_state":
                    {"state": "at door", "score": 0.1, "is_goal": false, "transitions": []}}
            ]
        }}));

        assert_eq!(optimal_actions(&tree), vec!["move"]);
    }

    #[test]
    fn test_goal_root_needs_no_actions() {
        let tree = tree(json!({"next_state": {
            "state": "holding cup", "score": 1.0, "is_goal": true, "transitions": []
        }}));
        assert!(optimal_actions(&tree).is_empty());
    }

    #[tokio::test]
    async fn test_oracle_planner_and_selector() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .route(
                    &[STAGE_PLANNING],
                    [r#"{"next_state": {"state": "at door", "score": 0.1, "is_goal": false, "transitions": [
                        {"action": "grasp", "probability": 0.7, "next_state":
                            {"state": "holding cup", "score": 1.0, "is_goal": true, "transitions": []}}
                    ]}}"#],
                )
                .route(
                    &[STAGE_ACTION_SELECTION],
                    [r#"{"selected_action": "move", "reason": "cup is out of reach"}"#],
                ),
        );

        let planner = OraclePlanner::new(oracle.clone(), RetryPolicy::immediate(1));
        assert_eq!(planner.plan(&request()).await.unwrap(), vec!["grasp"]);

        let selector = OracleActionSelector::new(oracle, RetryPolicy::immediate(1));
        let selection = selector.select(&request()).await.unwrap();
        assert_eq!(selection.selected_action, "move");
    }
}
