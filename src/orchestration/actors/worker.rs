//! Worker Actor
//!
//! Responsibilities:
//! - Hold at most one subtask, assigned by the leader
//! - Self-reflection: ask colleagues for what its expertise lacks
//! - Collaboration: answer colleagues' queued requests
//! - Work: execute the subtask once every ask is resolved, report to the leader
//!
//! Peer traffic arrives as `Deliver` and only mutates queues; the oracle is
//! consulted exclusively from the orchestrator-driven phase RPCs.

use crate::error::Result;
use crate::orchestration::messages::{
    CollabRequest, CollabResponse, Envelope, Payload, TaskAssign, TaskResponse, WorkOutcome,
    WorkerMessage,
};
use crate::orchestration::prompts;
use crate::orchestration::registry::Router;
use crate::orchestration::retry::{consult, RetryPolicy};
use crate::orchestration::schema::{CollaborationAnswer, Reflection, TaskAnswer};
use crate::orchestration::state::{
    CollaborationRequest, Collaborator, Knowledge, RequestState, Subtask, TaskContext,
    WorkerSnapshot, WorkerStatus,
};
use crate::services::Oracle;
use crate::types::{AgentId, Expertise, MissionId};
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Everything a worker needs at spawn time
pub struct WorkerArgs {
    pub id: AgentId,
    pub leader: AgentId,
    pub expertise: Expertise,
    pub router: Router,
    pub oracle: Arc<dyn Oracle>,
    pub retry: RetryPolicy,
}

pub struct WorkerState {
    args: WorkerArgs,
    status: WorkerStatus,
    subtask: Option<Subtask>,
    collaborators: Vec<Collaborator>,

    /// Own asks awaiting a `collab_response`
    outstanding: Vec<CollaborationRequest>,
    answered: Vec<CollaborationRequest>,

    /// Colleagues' asks awaiting an answer
    queue: VecDeque<CollabRequest>,

    /// Collaborator answers, in arrival order
    knowledge: Vec<Knowledge>,

    /// Private task-scoped cache, filled on assignment
    cache: HashMap<MissionId, TaskContext>,

    reported: bool,
}

impl WorkerState {
    fn new(args: WorkerArgs) -> Self {
        Self {
            args,
            status: WorkerStatus::Idle,
            subtask: None,
            collaborators: Vec::new(),
            outstanding: Vec::new(),
            answered: Vec::new(),
            queue: VecDeque::new(),
            knowledge: Vec::new(),
            cache: HashMap::new(),
            reported: false,
        }
    }

    fn reset(&mut self) {
        self.status = WorkerStatus::Idle;
        self.subtask = None;
        self.collaborators.clear();
        self.outstanding.clear();
        self.answered.clear();
        self.queue.clear();
        self.knowledge.clear();
        self.cache.clear();
        self.reported = false;
    }

    fn task_context(&self, subtask: &Subtask) -> TaskContext {
        self.cache
            .get(&subtask.mission_id)
            .cloned()
            .unwrap_or_default()
    }

    fn collaborator(&self, id: &AgentId) -> Option<&Collaborator> {
        self.collaborators.iter().find(|c| &c.id == id)
    }

    fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.args.id.clone(),
            status: self.status,
            subtask: self.subtask.clone(),
            collaborators: self.collaborators.clone(),
            outstanding: self.outstanding.clone(),
            answered: self.answered.clone(),
            queued: self.queue.len(),
            knowledge: self.knowledge.clone(),
            cache: self.cache.clone(),
            reported: self.reported,
        }
    }
}

pub struct WorkerActor;

impl WorkerActor {
    fn receive(state: &mut WorkerState, envelope: Envelope) {
        let sender = envelope.sender;
        match envelope.payload {
            Payload::TaskAssign(assign) if sender == state.args.leader => {
                Self::accept_assignment(state, assign);
            }
            Payload::CollabRequest(request) if state.collaborator(&sender).is_some() => {
                tracing::debug!(
                    "{} queued request {} from {}",
                    state.args.id,
                    request.request_id,
                    sender
                );
                state.queue.push_back(request);
            }
            Payload::CollabResponse(response) if state.collaborator(&sender).is_some() => {
                Self::accept_answer(state, &sender, response);
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

    fn accept_assignment(state: &mut WorkerState, assign: TaskAssign) {
        if state.subtask.is_some() || state.status != WorkerStatus::Idle {
            tracing::warn!(
                "{} already holds a subtask, ignoring {}",
                state.args.id,
                assign.subtask_id
            );
            return;
        }

        tracing::info!(
            "{} assigned {}: {}",
            state.args.id,
            assign.subtask_id,
            assign.subtask
        );
        state.cache.insert(
            assign.mission_id,
            TaskContext {
                mission: assign.mission,
                context: assign.context,
            },
        );
        state.subtask = Some(Subtask {
            id: assign.subtask_id,
            mission_id: assign.mission_id,
            worker: state.args.id.clone(),
            description: assign.subtask,
            focus: assign.focus,
        });
        state.collaborators = assign.collaborators;
        state.reported = false;
    }

    fn accept_answer(state: &mut WorkerState, sender: &AgentId, response: CollabResponse) {
        let Some(index) = state
            .outstanding
            .iter()
            .position(|r| r.id == response.request_id && &r.target == sender)
        else {
            tracing::debug!(
                "{} has no open request {} to {}",
                state.args.id,
                response.request_id,
                sender
            );
            return;
        };

        let mut request = state.outstanding.remove(index);
        request.state = RequestState::Answered;

        let focus = state
            .collaborator(sender)
            .map(|c| c.focus.clone())
            .unwrap_or_default();

        tracing::debug!(
            "{} received answer to {} from {} ({} still open)",
            state.args.id,
            request.id,
            sender,
            state.outstanding.len()
        );
        state.knowledge.push(Knowledge {
            from: sender.clone(),
            request_id: request.id.clone(),
            focus,
            response: response.response,
            received_at: Utc::now(),
        });
        state.answered.push(request);
    }

    /// Ask colleagues for help; returns the number of requests sent
    async fn reflect(state: &mut WorkerState) -> Result<usize> {
        let Some(subtask) = state.subtask.clone() else {
            return Ok(0);
        };

        let task = state.task_context(&subtask);
        let prompt = prompts::reflection(
            &state.args.id,
            &state.args.expertise,
            &subtask,
            &task,
            &state.collaborators,
        );
        let reflection: Reflection =
            consult(state.args.oracle.as_ref(), &prompt, &state.args.retry).await?;

        if !reflection.collaboration_required {
            tracing::debug!("{} needs no collaboration", state.args.id);
            return Ok(0);
        }

        let mut sent = 0;
        for requirement in reflection.requirement {
            state.outstanding.push(CollaborationRequest::open(
                requirement.request_id.clone(),
                state.args.id.clone(),
                requirement.worker_id.clone(),
                requirement.request_detail.clone(),
            ));
            state.args.router.send(
                &state.args.id,
                &requirement.worker_id,
                Payload::CollabRequest(CollabRequest {
                    request_id: requirement.request_id,
                    requester_id: state.args.id.clone(),
                    request_detail: requirement.request_detail,
                }),
            )?;
            sent += 1;
        }

        tracing::info!("{} sent {} collaboration requests", state.args.id, sent);
        Ok(sent)
    }

    /// Drain the request queue; returns the number of requests answered
    async fn collaborate(state: &mut WorkerState) -> Result<usize> {
        state.status = WorkerStatus::Pending;
        let served = Self::serve_queue(state).await;
        state.status = WorkerStatus::Idle;
        served
    }

    async fn serve_queue(state: &mut WorkerState) -> Result<usize> {
        let mut served = 0;
        while let Some(request) = state.queue.pop_front() {
            let prompt = prompts::collaboration(&state.args.id, &state.args.expertise, &request);
            let answer: CollaborationAnswer =
                consult(state.args.oracle.as_ref(), &prompt, &state.args.retry).await?;

            state.args.router.send(
                &state.args.id,
                &request.requester_id,
                Payload::CollabResponse(CollabResponse {
                    request_id: request.request_id,
                    sender_id: state.args.id.clone(),
                    response: answer.response,
                }),
            )?;
            served += 1;
        }
        Ok(served)
    }

    /// Execute the subtask once nothing is left open
    async fn work(state: &mut WorkerState) -> Result<WorkOutcome> {
        let Some(subtask) = state.subtask.clone() else {
            return Ok(WorkOutcome::NoTask);
        };
        if state.reported {
            return Ok(WorkOutcome::AlreadyReported);
        }
        if state.status != WorkerStatus::Idle {
            return Ok(WorkOutcome::Occupied);
        }
        if !state.outstanding.is_empty() || !state.queue.is_empty() {
            tracing::warn!(
                "{} deferring {}: {} requests open, {} queued",
                state.args.id,
                subtask.id,
                state.outstanding.len(),
                state.queue.len()
            );
            return Ok(WorkOutcome::Deferred {
                outstanding: state.outstanding.len(),
                queued: state.queue.len(),
            });
        }

        state.status = WorkerStatus::Busy;
        let executed = Self::execute(state, subtask).await;
        state.status = WorkerStatus::Idle;
        executed
    }

    async fn execute(state: &mut WorkerState, subtask: Subtask) -> Result<WorkOutcome> {
        let task = state.task_context(&subtask);
        let prompt = prompts::execution(
            &state.args.id,
            &state.args.expertise,
            &subtask,
            &task,
            &state.knowledge,
        );
        let answer: TaskAnswer =
            consult(state.args.oracle.as_ref(), &prompt, &state.args.retry).await?;

        let collaborator_inputs = state.knowledge.len();
        state.args.router.send(
            &state.args.id,
            &state.args.leader,
            Payload::TaskResponse(TaskResponse {
                worker_id: state.args.id.clone(),
                mission_id: subtask.mission_id,
                subtask_id: subtask.id.clone(),
                response: answer.response,
                collaborator_inputs,
            }),
        )?;
        state.reported = true;

        tracing::info!(
            "{} reported {} ({} collaborator inputs)",
            state.args.id,
            subtask.id,
            collaborator_inputs
        );
        Ok(WorkOutcome::Executed {
            collaborator_inputs,
        })
    }
}

#[ractor::async_trait]
impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        tracing::info!("Worker actor {} ({}) starting", args.id, args.expertise.title);
        Ok(WorkerState::new(args))
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Deliver(envelope) => Self::receive(state, envelope),
            WorkerMessage::Reflect(reply) => {
                let _ = reply.send(Self::reflect(state).await);
            }
            WorkerMessage::Collaborate(reply) => {
                let _ = reply.send(Self::collaborate(state).await);
            }
            WorkerMessage::Work(reply) => {
                let _ = reply.send(Self::work(state).await);
            }
            WorkerMessage::Reset(reply) => {
                state.reset();
                let _ = reply.send(());
            }
            WorkerMessage::Snapshot(reply) => {
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
        tracing::info!("Worker actor {} stopped", state.args.id);
        Ok(())
    }
}
