//! Inspector Actor
//!
//! Responsibilities:
//! - Review the leader's aggregated worker output against mission context
//! - Answer each `task_review` with exactly one `review_response`

use crate::error::Result;
use crate::orchestration::messages::{
    Envelope, InspectorMessage, Payload, ReviewResponse, TaskReview,
};
use crate::orchestration::prompts;
use crate::orchestration::registry::Router;
use crate::orchestration::retry::{consult, RetryPolicy};
use crate::orchestration::schema::InspectionReport;
use crate::orchestration::state::InspectorSnapshot;
use crate::services::Oracle;
use crate::types::{AgentId, MissionId};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::sync::Arc;

/// Everything the inspector needs at spawn time
pub struct InspectorArgs {
    pub id: AgentId,
    pub leader: AgentId,
    pub router: Router,
    pub oracle: Arc<dyn Oracle>,
    pub retry: RetryPolicy,
}

pub struct InspectorState {
    args: InspectorArgs,
    reviews_received: u32,
    last_mission: Option<MissionId>,
    last_report: Option<InspectionReport>,
}

impl InspectorState {
    fn snapshot(&self) -> InspectorSnapshot {
        InspectorSnapshot {
            reviews_received: self.reviews_received,
            last_mission: self.last_mission,
            last_report: self.last_report.clone(),
        }
    }
}

pub struct InspectorActor;

impl InspectorActor {
    async fn review(state: &mut InspectorState, review: TaskReview) -> Result<()> {
        let mission_id = review.mission_id;
        state.reviews_received += 1;
        state.last_mission = Some(mission_id);

        let prompt = prompts::inspection(&state.args.id, &review);

        let report: InspectionReport =
            consult(state.args.oracle.as_ref(), &prompt, &state.args.retry).await?;

        tracing::info!(
            "Review of mission {}: {} ({} issues)",
            mission_id,
            if report.passed { "PASS" } else { "FAIL" },
            report.issues.len()
        );

        state.last_report = Some(report.clone());

        state.args.router.send(
            &state.args.id,
            &state.args.leader,
            Payload::ReviewResponse(ReviewResponse {
                mission_id,
                review: report,
            }),
        )
    }

    async fn receive(state: &mut InspectorState, envelope: Envelope) -> Result<()> {
        match envelope.payload {
            Payload::TaskReview(review) if envelope.sender == state.args.leader => {
                Self::review(state, review).await
            }
            other => {
                tracing::debug!(
                    "{} dropping {} from {}",
                    state.args.id,
                    other.kind(),
                    envelope.sender
                );
                Ok(())
            }
        }
    }
}

#[ractor::async_trait]
impl Actor for InspectorActor {
    type Msg = InspectorMessage;
    type State = InspectorState;
    type Arguments = InspectorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        tracing::info!("Inspector actor {} starting", args.id);
        Ok(InspectorState {
            args,
            reviews_received: 0,
            last_mission: None,
            last_report: None,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            InspectorMessage::Deliver(envelope) => {
                if let Err(e) = Self::receive(state, envelope).await {
                    // Review is fire-and-forget; the leader's review wait expires
                    tracing::error!("{} failed to review: {}", state.args.id, e);
                }
            }
            InspectorMessage::Snapshot(reply) => {
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
        tracing::info!("Inspector actor {} stopped", state.args.id);
        Ok(())
    }
}
