//! Mission Orchestrator
//!
//! Spawns the roster, seals the routing table and drives one mission at a
//! time through its phases:
//!
//! 1. **Assign**: leader decomposes and dispatches
//! 2. **Reflect**: every dispatched worker asks for help
//! 3. **Collaborate**: every dispatched worker answers queued asks
//! 4. **Work**: every dispatched worker executes and reports
//! 5. **Reports**: wait for the leader's pending set, expire stragglers
//! 6. **Review** (optional): wait for the inspector's verdict
//! 7. **Close**: process feedback, compute metrics, reset workers
//!
//! Each phase is a barrier: every call launched in a phase completes (or the
//! phase times out) before the next phase starts.

use crate::config::{DeadlineConfig, OrchestrationConfig, PrefrontalConfig, RosterConfig};
use crate::error::{PrefrontalError, Result};
use crate::orchestration::actors::{
    InspectorActor, InspectorArgs, LeaderActor, LeaderArgs, PipelineActor, WorkerActor,
    WorkerArgs,
};
use crate::orchestration::messages::{
    AssignOutcome, FeedbackOutcome, InspectorMessage, LeaderMessage, PipelineMessage,
    WorkOutcome, WorkerMessage,
};
use crate::orchestration::registry::{Route, Router};
use crate::orchestration::state::{
    InspectorSnapshot, LeaderSnapshot, MissionReport, MissionStatus, TaskMetrics, WorkerSnapshot,
};
use crate::services::Oracle;
use crate::types::AgentId;
use futures::future::join_all;
use ractor::concurrency::JoinHandle;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorRef, Message, RpcReplyPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Call an actor and wait at most `timeout` for its reply
async fn rpc<M, T, F>(actor: &ActorRef<M>, build: F, timeout: Duration, what: &str) -> Result<T>
where
    M: Message,
    T: Send + 'static,
    F: FnOnce(RpcReplyPort<T>) -> M,
{
    match actor.call(build, Some(timeout)).await {
        Ok(CallResult::Success(value)) => Ok(value),
        Ok(CallResult::Timeout) => Err(PrefrontalError::Timeout(format!(
            "{} did not finish within {}s",
            what,
            timeout.as_secs_f64()
        ))),
        Ok(CallResult::SenderError) => Err(PrefrontalError::Actor(format!(
            "{}: reply channel dropped",
            what
        ))),
        Err(e) => Err(PrefrontalError::Actor(format!("{}: {}", what, e))),
    }
}

/// Drives the leader and worker pool through one mission at a time
pub struct Orchestrator {
    roster: RosterConfig,
    deadlines: DeadlineConfig,
    options: OrchestrationConfig,
    leader: ActorRef<LeaderMessage>,
    workers: Vec<(AgentId, ActorRef<WorkerMessage>)>,
    inspector: ActorRef<InspectorMessage>,
    pipeline: ActorRef<PipelineMessage>,
    handles: Vec<JoinHandle<()>>,
    status: MissionStatus,
    error_count: u32,
}

impl Orchestrator {
    /// Spawn every actor of the roster and seal the routing table
    pub async fn new(config: &PrefrontalConfig, oracle: Arc<dyn Oracle>) -> Result<Self> {
        let roster = config.roster.clone();
        roster.validate()?;

        let router = Router::new();
        let mut routes = HashMap::new();
        let mut handles = Vec::new();

        let (leader, handle) = Actor::spawn(
            None,
            LeaderActor,
            LeaderArgs {
                id: roster.leader.clone(),
                inspector: roster.inspector.clone(),
                pipeline: roster.pipeline.clone(),
                workers: roster.workers.clone(),
                router: router.clone(),
                oracle: oracle.clone(),
                retry: config.retry.clone(),
            },
        )
        .await
        .map_err(|e| PrefrontalError::Actor(e.to_string()))?;
        routes.insert(roster.leader.clone(), Route::Leader(leader.clone()));
        handles.push(handle);

        let mut workers = Vec::with_capacity(roster.workers.len());
        for spec in &roster.workers {
            let (worker, handle) = Actor::spawn(
                None,
                WorkerActor,
                WorkerArgs {
                    id: spec.id.clone(),
                    leader: roster.leader.clone(),
                    expertise: spec.expertise.clone(),
                    router: router.clone(),
                    oracle: oracle.clone(),
                    retry: config.retry.clone(),
                },
            )
            .await
            .map_err(|e| PrefrontalError::Actor(e.to_string()))?;
            routes.insert(spec.id.clone(), Route::Worker(worker.clone()));
            workers.push((spec.id.clone(), worker));
            handles.push(handle);
        }

        let (inspector, handle) = Actor::spawn(
            None,
            InspectorActor,
            InspectorArgs {
                id: roster.inspector.clone(),
                leader: roster.leader.clone(),
                router: router.clone(),
                oracle,
                retry: config.retry.clone(),
            },
        )
        .await
        .map_err(|e| PrefrontalError::Actor(e.to_string()))?;
        routes.insert(roster.inspector.clone(), Route::Inspector(inspector.clone()));
        handles.push(handle);

        let (pipeline, handle) = Actor::spawn(None, PipelineActor, roster.pipeline.clone())
            .await
            .map_err(|e| PrefrontalError::Actor(e.to_string()))?;
        routes.insert(roster.pipeline.clone(), Route::Pipeline(pipeline.clone()));
        handles.push(handle);

        router.seal(routes)?;
        info!(
            "Orchestrator ready: {} workers, review phase {}",
            workers.len(),
            if config.orchestration.review_phase { "on" } else { "off" }
        );

        Ok(Self {
            roster,
            deadlines: config.deadlines.clone(),
            options: config.orchestration.clone(),
            leader,
            workers,
            inspector,
            pipeline,
            handles,
            status: MissionStatus::Pending,
            error_count: 0,
        })
    }

    pub fn roster(&self) -> &RosterConfig {
        &self.roster
    }

    /// Status of the most recent mission
    pub fn status(&self) -> MissionStatus {
        self.status
    }

    /// Failed missions so far
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Run one mission end to end
    ///
    /// Any failure marks the mission failed, increments the error count and
    /// is returned to the caller. Subtasks already dispatched are not rolled
    /// back.
    pub async fn execute_mission(
        &mut self,
        description: &str,
        context: Vec<String>,
    ) -> Result<MissionReport> {
        info!("Executing mission: {}", description);
        self.status = MissionStatus::Running;
        let started = Instant::now();

        match self.run_phases(description, context, started).await {
            Ok(report) => {
                self.status = report.status;
                Ok(report)
            }
            Err(e) => {
                self.status = MissionStatus::Failed;
                self.error_count += 1;
                error!("Mission failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_phases(
        &mut self,
        description: &str,
        context: Vec<String>,
        started: Instant,
    ) -> Result<MissionReport> {
        let phase_timeout = self.deadlines.phase_timeout();

        debug!("Phase: assign");
        let outcome = rpc(
            &self.leader,
            |reply| LeaderMessage::Assign {
                description: description.to_string(),
                context,
                reply,
            },
            phase_timeout,
            "assign",
        )
        .await??;

        let (mission_id, difficulty, dispatched) = match outcome {
            AssignOutcome::Accepted {
                mission_id,
                difficulty,
                dispatched,
            } => (mission_id, difficulty, dispatched),
            AssignOutcome::Busy => {
                warn!("Leader busy, mission rejected");
                return Ok(MissionReport {
                    mission_id: None,
                    status: MissionStatus::Rejected,
                    difficulty: None,
                    metrics: TaskMetrics {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        error_count: self.error_count,
                        ..Default::default()
                    },
                    responses: Vec::new(),
                    feedback: Vec::new(),
                });
            }
        };

        let active: Vec<(AgentId, ActorRef<WorkerMessage>)> = self
            .workers
            .iter()
            .filter(|(id, _)| dispatched.contains(id))
            .cloned()
            .collect();

        debug!("Phase: reflect ({} workers)", active.len());
        let sent = Self::barrier(&active, phase_timeout, "reflect", WorkerMessage::Reflect).await?;
        debug!("{} collaboration requests sent", sent.iter().sum::<usize>());

        debug!("Phase: collaborate");
        let served =
            Self::barrier(&active, phase_timeout, "collaborate", WorkerMessage::Collaborate)
                .await?;
        debug!("{} collaboration requests answered", served.iter().sum::<usize>());

        debug!("Phase: work");
        let outcomes = Self::barrier(&active, phase_timeout, "work", WorkerMessage::Work).await?;
        for ((id, _), outcome) in active.iter().zip(&outcomes) {
            match outcome {
                WorkOutcome::Executed { .. } => {}
                WorkOutcome::Deferred {
                    outstanding,
                    queued,
                } => warn!(
                    "{} did not execute: {} requests open, {} queued",
                    id, outstanding, queued
                ),
                other => debug!("{} work outcome: {:?}", id, other),
            }
        }

        debug!("Phase: reports");
        self.await_reports().await?;

        if self.options.review_phase {
            debug!("Phase: review");
            self.await_review().await?;
        }

        debug!("Phase: close");
        let mission = match rpc(
            &self.leader,
            LeaderMessage::ProcessFeedback,
            phase_timeout,
            "process feedback",
        )
        .await?
        {
            FeedbackOutcome::Closed(mission) => mission,
            FeedbackOutcome::Incomplete { pending } => {
                return Err(PrefrontalError::Other(format!(
                    "mission {} still waiting on {} workers",
                    mission_id,
                    pending.len()
                )));
            }
            FeedbackOutcome::NoMission => {
                return Err(PrefrontalError::Other(format!(
                    "mission {} is no longer open",
                    mission_id
                )));
            }
        };

        let metrics = TaskMetrics::from_inbox(
            &mission.inbox,
            started.elapsed().as_millis() as u64,
            self.error_count,
        );

        self.reset_workers().await?;

        info!(
            "Mission {} completed: completion {:.2}, collaboration {:.2}",
            mission_id, metrics.task_completion, metrics.collaboration_quality
        );

        Ok(MissionReport {
            mission_id: Some(mission_id),
            status: MissionStatus::Completed,
            difficulty: Some(difficulty),
            metrics,
            responses: mission.inbox,
            feedback: mission.feedback,
        })
    }

    /// Run one RPC on every worker concurrently; fails on the first error
    async fn barrier<T, F>(
        workers: &[(AgentId, ActorRef<WorkerMessage>)],
        timeout: Duration,
        phase: &str,
        build: F,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(RpcReplyPort<Result<T>>) -> WorkerMessage + Copy,
    {
        let calls = workers.iter().map(|(id, worker)| async move {
            let what = format!("{} on {}", phase, id);
            rpc(worker, build, timeout, &what).await?
        });

        join_all(calls).await.into_iter().collect()
    }

    /// Wait for every report; on deadline, expire whoever is still pending
    async fn await_reports(&self) -> Result<()> {
        let deadline = self.deadlines.report_timeout();
        match rpc(&self.leader, LeaderMessage::AwaitReports, deadline, "reports").await {
            Ok(()) => Ok(()),
            Err(PrefrontalError::Timeout(_)) => {
                let expired = rpc(
                    &self.leader,
                    LeaderMessage::ExpirePending,
                    self.deadlines.phase_timeout(),
                    "expire pending",
                )
                .await?;
                warn!(
                    "Report deadline of {}s expired, {} workers timed out",
                    deadline.as_secs(),
                    expired.len()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for the inspector's verdict; on deadline, continue without it
    async fn await_review(&self) -> Result<()> {
        let deadline = self.deadlines.review_timeout();
        match rpc(&self.leader, LeaderMessage::AwaitReview, deadline, "review").await {
            Ok(()) => Ok(()),
            Err(PrefrontalError::Timeout(_)) => {
                warn!(
                    "No review verdict within {}s, closing without it",
                    deadline.as_secs()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn reset_workers(&self) -> Result<()> {
        let timeout = self.deadlines.phase_timeout();
        let resets = self
            .workers
            .iter()
            .map(|(id, worker)| async move {
                rpc(worker, WorkerMessage::Reset, timeout, &format!("reset {}", id)).await
            });
        join_all(resets)
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    pub async fn leader_snapshot(&self) -> Result<LeaderSnapshot> {
        rpc(
            &self.leader,
            LeaderMessage::Snapshot,
            self.deadlines.phase_timeout(),
            "leader snapshot",
        )
        .await
    }

    pub async fn worker_snapshot(&self, id: &AgentId) -> Result<WorkerSnapshot> {
        let (_, worker) = self
            .workers
            .iter()
            .find(|(worker_id, _)| worker_id == id)
            .ok_or_else(|| PrefrontalError::UnknownRecipient(id.clone()))?;
        rpc(
            worker,
            WorkerMessage::Snapshot,
            self.deadlines.phase_timeout(),
            "worker snapshot",
        )
        .await
    }

    pub async fn inspector_snapshot(&self) -> Result<InspectorSnapshot> {
        rpc(
            &self.inspector,
            InspectorMessage::Snapshot,
            self.deadlines.phase_timeout(),
            "inspector snapshot",
        )
        .await
    }

    /// Allocation level recorded by the pipeline gate
    pub async fn allocation_level(&self) -> Result<Option<u8>> {
        rpc(
            &self.pipeline,
            PipelineMessage::AllocationLevel,
            self.deadlines.phase_timeout(),
            "allocation level",
        )
        .await
    }

    /// Stop every actor and wait for them to exit
    pub async fn shutdown(self) {
        info!("Stopping orchestrator");
        self.leader.stop(None);
        for (_, worker) in &self.workers {
            worker.stop(None);
        }
        self.inspector.stop(None);
        self.pipeline.stop(None);

        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Actor task ended abnormally: {}", e);
            }
        }
    }
}
