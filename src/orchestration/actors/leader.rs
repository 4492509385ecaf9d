//! Leader Actor
//!
//! Responsibilities:
//! - Own one mission at a time (busy gate)
//! - Decompose the mission through the oracle and dispatch subtasks
//! - Report the difficulty classification to the pipeline gate
//! - Aggregate worker reports, then request a review from the inspector
//! - Record the review verdict in the feedback log
//!
//! Report and review waits are RPCs answered later: the reply port is parked
//! until the pending set empties or the verdict arrives.

use crate::config::WorkerSpec;
use crate::error::Result;
use crate::orchestration::messages::{
    AssignOutcome, Envelope, FeedbackOutcome, LeaderMessage, Payload, ReviewResponse,
    TaskAssign, TaskDifficulty, TaskResponse, TaskReview,
};
use crate::orchestration::prompts;
use crate::orchestration::registry::Router;
use crate::orchestration::retry::{consult, RetryPolicy};
use crate::orchestration::schema::{Decomposition, InspectionReport};
use crate::orchestration::state::{
    Collaborator, InboxContent, InboxEntry, LeaderPhase, LeaderSnapshot, Mission, Subtask,
};
use crate::services::Oracle;
use crate::types::{AgentId, MissionId};
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;

/// Feedback line for a failed review that named no issues
pub const FAILED_WITHOUT_ISSUES: &str = "Failed (no issues reported)";

/// Feedback line for a passed review
pub const PASSED: &str = "Passed";

/// Everything the leader needs at spawn time
pub struct LeaderArgs {
    pub id: AgentId,
    pub inspector: AgentId,
    pub pipeline: AgentId,
    pub workers: Vec<WorkerSpec>,
    pub router: Router,
    pub oracle: Arc<dyn Oracle>,
    pub retry: RetryPolicy,
}

pub struct LeaderState {
    args: LeaderArgs,
    phase: LeaderPhase,
    mission: Option<Mission>,
    report_waiters: Vec<RpcReplyPort<()>>,
    review_waiters: Vec<RpcReplyPort<()>>,
}

impl LeaderState {
    fn new(args: LeaderArgs) -> Self {
        Self {
            args,
            phase: LeaderPhase::Idle,
            mission: None,
            report_waiters: Vec::new(),
            review_waiters: Vec::new(),
        }
    }

    fn worker_pool(&self) -> Vec<AgentId> {
        self.args.workers.iter().map(|w| w.id.clone()).collect()
    }

    fn collaborator(&self, id: &AgentId, focus: &[String]) -> Option<Collaborator> {
        self.args
            .workers
            .iter()
            .find(|w| &w.id == id)
            .map(|w| Collaborator {
                id: w.id.clone(),
                expertise: w.expertise.clone(),
                focus: focus.to_vec(),
            })
    }

    /// Open mission with the given id
    fn mission_mut(&mut self, mission_id: MissionId) -> Option<&mut Mission> {
        self.mission.as_mut().filter(|m| m.id == mission_id)
    }

    fn snapshot(&self) -> LeaderSnapshot {
        LeaderSnapshot {
            phase: self.phase,
            mission: self.mission.as_ref().map(Mission::snapshot),
        }
    }
}

pub struct LeaderActor;

impl LeaderActor {
    async fn assign(
        state: &mut LeaderState,
        description: String,
        context: Vec<String>,
    ) -> Result<AssignOutcome> {
        if !state.phase.is_idle() || state.mission.is_some() {
            tracing::warn!(
                "{} is busy with another mission, rejecting \"{}\"",
                state.args.id,
                description
            );
            return Ok(AssignOutcome::Busy);
        }

        let mission = Mission::new(description, context);
        tracing::info!("{} opened mission {}", state.args.id, mission.id);

        let prompt =
            prompts::decomposition(&state.args.id, &state.args.workers, &mission.description);
        state.mission = Some(mission);
        state.phase = LeaderPhase::Assigning;

        let decomposition: Decomposition =
            match consult(state.args.oracle.as_ref(), &prompt, &state.args.retry).await {
                Ok(decomposition) => decomposition,
                Err(e) => {
                    // Nothing was dispatched yet
                    state.mission = None;
                    state.phase = LeaderPhase::Idle;
                    return Err(e);
                }
            };

        Self::dispatch(state, decomposition)
    }

    fn dispatch(state: &mut LeaderState, decomposition: Decomposition) -> Result<AssignOutcome> {
        let difficulty = decomposition.difficulty;
        let plans = decomposition.retain_pool(&state.worker_pool());

        let Some(mission) = state.mission.as_mut() else {
            return Ok(AssignOutcome::Busy);
        };
        mission.difficulty = Some(difficulty);
        let mission_id = mission.id;
        state.phase = LeaderPhase::Dispatched;

        let mut dispatched = Vec::new();
        if difficulty.requires_workers() {
            let subtasks: Vec<Subtask> = plans
                .into_iter()
                .map(|plan| Subtask {
                    id: plan.subtask_id,
                    mission_id,
                    worker: plan.assigned_worker,
                    description: plan.task_description,
                    focus: plan.focus,
                })
                .collect();

            for subtask in &subtasks {
                let collaborators = subtasks
                    .iter()
                    .filter(|other| other.worker != subtask.worker)
                    .filter_map(|other| state.collaborator(&other.worker, &other.focus))
                    .collect();

                let assign = {
                    let Some(mission) = state.mission.as_ref() else {
                        break;
                    };
                    TaskAssign {
                        mission_id,
                        subtask_id: subtask.id.clone(),
                        mission: mission.description.clone(),
                        subtask: subtask.description.clone(),
                        context: mission.context.clone(),
                        focus: subtask.focus.clone(),
                        collaborators,
                    }
                };

                state
                    .args
                    .router
                    .send(&state.args.id, &subtask.worker, Payload::TaskAssign(assign))?;

                if let Some(mission) = state.mission.as_mut() {
                    mission.pending.insert(subtask.worker.clone());
                    mission.subtasks.push(subtask.clone());
                }
                dispatched.push(subtask.worker.clone());
            }
        } else {
            tracing::info!(
                "Mission {} rated {}, no subtasks dispatched",
                mission_id,
                difficulty
            );
        }

        state.args.router.send(
            &state.args.id,
            &state.args.pipeline,
            Payload::TaskDifficulty(TaskDifficulty { level: difficulty }),
        )?;

        if !dispatched.is_empty() {
            state.phase = LeaderPhase::AwaitingReports;
            tracing::info!(
                "Mission {} ({}) dispatched to {} workers",
                mission_id,
                difficulty,
                dispatched.len()
            );
        }

        Ok(AssignOutcome::Accepted {
            mission_id,
            difficulty,
            dispatched,
        })
    }

    fn receive(state: &mut LeaderState, envelope: Envelope) {
        let sender = envelope.sender;
        match envelope.payload {
            Payload::TaskResponse(response) => Self::accept_report(state, sender, response),
            Payload::ReviewResponse(review) if sender == state.args.inspector => {
                Self::record_review(state, review)
            }
            other => {
                tracing::debug!(
                    "{} dropping {} from {}",
                    state.args.id,
                    other.kind(),
                    sender
                );
            }
        }
    }

    fn accept_report(state: &mut LeaderState, sender: AgentId, response: TaskResponse) {
        let leader = state.args.id.clone();
        let Some(mission) = state.mission_mut(response.mission_id) else {
            tracing::debug!("{} has no mission {} for {}", leader, response.mission_id, sender);
            return;
        };
        if !mission.pending.remove(&sender) {
            tracing::debug!("{} dropping unexpected report from {}", leader, sender);
            return;
        }

        let focus = mission
            .subtask_for(&sender)
            .map(|st| st.focus.clone())
            .unwrap_or_default();
        mission.inbox.push(InboxEntry {
            sender: sender.clone(),
            focus,
            received_at: Utc::now(),
            content: InboxContent::TaskResponse(response),
        });
        mission.iteration += 1;

        tracing::info!(
            "{} accepted report from {} ({} pending)",
            leader,
            sender,
            mission.pending.len()
        );

        if mission.pending.is_empty() {
            Self::request_review(state);
        }
    }

    /// Every report is in (or expired): ask the inspector and release waiters
    fn request_review(state: &mut LeaderState) {
        let Some(mission) = state.mission.as_ref() else {
            return;
        };
        let review = TaskReview {
            mission_id: mission.id,
            description: mission.description.clone(),
            context: mission.context.clone(),
            responses: mission.inbox.clone(),
        };

        state.phase = LeaderPhase::Reviewing;
        if let Err(e) = state.args.router.send(
            &state.args.id,
            &state.args.inspector,
            Payload::TaskReview(review),
        ) {
            tracing::error!("{} failed to request review: {}", state.args.id, e);
        }

        for waiter in state.report_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn record_review(state: &mut LeaderState, review: ReviewResponse) {
        let leader = state.args.id.clone();
        let Some(mission) = state.mission_mut(review.mission_id) else {
            tracing::debug!("{} ignoring review of closed mission {}", leader, review.mission_id);
            return;
        };

        let InspectionReport { passed, issues } = review.review;
        if passed {
            mission.feedback.push(PASSED.to_string());
        } else if issues.is_empty() {
            tracing::warn!("Review of mission {} failed without issues", mission.id);
            mission.feedback.push(FAILED_WITHOUT_ISSUES.to_string());
        } else {
            mission
                .feedback
                .extend(issues.iter().map(|issue| issue.to_string()));
        }

        tracing::info!(
            "{} recorded review of mission {}: {}",
            leader,
            mission.id,
            if passed { "PASS" } else { "FAIL" }
        );

        state.phase = LeaderPhase::Concluded;
        for waiter in state.review_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Turn every pending worker into a timed-out report
    fn expire_pending(state: &mut LeaderState) -> Vec<AgentId> {
        let Some(mission) = state.mission.as_mut() else {
            return Vec::new();
        };
        if mission.pending.is_empty() {
            return Vec::new();
        }

        let expired: Vec<AgentId> = std::mem::take(&mut mission.pending).into_iter().collect();
        for worker in &expired {
            let focus = mission
                .subtask_for(worker)
                .map(|st| st.focus.clone())
                .unwrap_or_default();
            mission.inbox.push(InboxEntry {
                sender: worker.clone(),
                focus,
                received_at: Utc::now(),
                content: InboxContent::TimedOut,
            });
            mission
                .feedback
                .push(format!("{} timed out before reporting", worker));
        }
        mission.iteration += 1;

        tracing::warn!(
            "Mission {}: report deadline expired for {} workers",
            mission.id,
            expired.len()
        );

        Self::request_review(state);
        expired
    }

    fn process_feedback(state: &mut LeaderState) -> FeedbackOutcome {
        let Some(mission) = state.mission.as_ref() else {
            return FeedbackOutcome::NoMission;
        };
        if !mission.pending.is_empty() {
            tracing::warn!(
                "Mission {} still waiting on {} workers",
                mission.id,
                mission.pending.len()
            );
            return FeedbackOutcome::Incomplete {
                pending: mission.pending.iter().cloned().collect(),
            };
        }

        let snapshot = mission.snapshot();
        state.mission = None;
        state.phase = LeaderPhase::Idle;
        state.review_waiters.clear();
        tracing::info!("{} closed mission {}", state.args.id, snapshot.mission_id);
        FeedbackOutcome::Closed(snapshot)
    }
}

#[ractor::async_trait]
impl Actor for LeaderActor {
    type Msg = LeaderMessage;
    type State = LeaderState;
    type Arguments = LeaderArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Leader actor {} starting with {} workers",
            args.id,
            args.workers.len()
        );
        Ok(LeaderState::new(args))
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            LeaderMessage::Deliver(envelope) => Self::receive(state, envelope),
            LeaderMessage::Assign {
                description,
                context,
                reply,
            } => {
                let _ = reply.send(Self::assign(state, description, context).await);
            }
            LeaderMessage::AwaitReports(reply) => {
                let outstanding = state
                    .mission
                    .as_ref()
                    .is_some_and(|m| !m.pending.is_empty());
                if outstanding {
                    state.report_waiters.push(reply);
                } else {
                    let _ = reply.send(());
                }
            }
            LeaderMessage::ExpirePending(reply) => {
                let _ = reply.send(Self::expire_pending(state));
            }
            LeaderMessage::AwaitReview(reply) => {
                if state.phase == LeaderPhase::Reviewing {
                    state.review_waiters.push(reply);
                } else {
                    let _ = reply.send(());
                }
            }
            LeaderMessage::ProcessFeedback(reply) => {
                let _ = reply.send(Self::process_feedback(state));
            }
            LeaderMessage::Snapshot(reply) => {
                let _ = reply.send(state.snapshot());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        tracing::info!("Leader actor {} stopped", state.args.id);
        Ok(())
    }
}
