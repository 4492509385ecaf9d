//! Pipeline Actor
//!
//! Passive gate between the leader and the planner: records the allocation
//! level derived from the leader's difficulty report (1 for low, 2 for
//! anything else). Sends nothing.

use crate::orchestration::messages::{Envelope, Payload, PipelineMessage};
use crate::types::AgentId;
use ractor::{Actor, ActorProcessingErr, ActorRef};

pub struct PipelineState {
    id: AgentId,
    allocation_level: Option<u8>,
}

pub struct PipelineActor;

impl PipelineActor {
    fn record(state: &mut PipelineState, envelope: Envelope) {
        match envelope.payload {
            Payload::TaskDifficulty(difficulty) => {
                let level = difficulty.level.allocation_level();
                tracing::debug!(
                    "{} recorded difficulty {} from {} (allocation level {})",
                    state.id,
                    difficulty.level,
                    envelope.sender,
                    level
                );
                state.allocation_level = Some(level);
            }
            other => {
                tracing::debug!("{} ignoring {} from {}", state.id, other.kind(), envelope.sender);
            }
        }
    }
}

#[ractor::async_trait]
impl Actor for PipelineActor {
    type Msg = PipelineMessage;
    type State = PipelineState;
    type Arguments = AgentId;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        id: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        tracing::info!("Pipeline actor {} starting", id);
        Ok(PipelineState {
            id,
            allocation_level: None,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            PipelineMessage::Deliver(envelope) => Self::record(state, envelope),
            PipelineMessage::AllocationLevel(reply) => {
                let _ = reply.send(state.allocation_level);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::messages::TaskDifficulty;
    use crate::types::Difficulty;

    fn difficulty(level: Difficulty) -> PipelineMessage {
        PipelineMessage::Deliver(Envelope::new(
            AgentId::from("Leader_0"),
            AgentId::from("Pipeline_0"),
            Payload::TaskDifficulty(TaskDifficulty { level }),
        ))
    }

    #[tokio::test]
    async fn test_pipeline_records_allocation_level() {
        let (actor, handle) = Actor::spawn(None, PipelineActor, AgentId::from("Pipeline_0"))
            .await
            .unwrap();

        assert_eq!(
            ractor::call!(actor, PipelineMessage::AllocationLevel).unwrap(),
            None
        );

        actor.cast(difficulty(Difficulty::Low)).unwrap();
        assert_eq!(
            ractor::call!(actor, PipelineMessage::AllocationLevel).unwrap(),
            Some(1)
        );

        actor.cast(difficulty(Difficulty::Medium)).unwrap();
        assert_eq!(
            ractor::call!(actor, PipelineMessage::AllocationLevel).unwrap(),
            Some(2)
        );

        actor.stop(None);
        handle.await.unwrap();
    }
}
