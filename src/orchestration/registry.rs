//! Routing Table
//!
//! Maps actor ids to actor references. The table is filled exactly once,
//! after every actor of the roster has been spawned, and is read-only from
//! then on; each actor holds a clone of the same [`Router`].

use crate::error::{PrefrontalError, Result};
use crate::orchestration::messages::{
    Envelope, InspectorMessage, LeaderMessage, Payload, PipelineMessage, WorkerMessage,
};
use crate::types::AgentId;
use once_cell::sync::OnceCell;
use ractor::ActorRef;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Reference to one routable actor
#[derive(Clone)]
pub enum Route {
    Leader(ActorRef<LeaderMessage>),
    Worker(ActorRef<WorkerMessage>),
    Inspector(ActorRef<InspectorMessage>),
    Pipeline(ActorRef<PipelineMessage>),
}

impl Route {
    fn deliver(&self, envelope: Envelope) -> Result<()> {
        let recipient = envelope.recipient.clone();
        let sent = match self {
            Route::Leader(actor) => actor
                .cast(LeaderMessage::Deliver(envelope))
                .map_err(|e| e.to_string()),
            Route::Worker(actor) => actor
                .cast(WorkerMessage::Deliver(envelope))
                .map_err(|e| e.to_string()),
            Route::Inspector(actor) => actor
                .cast(InspectorMessage::Deliver(envelope))
                .map_err(|e| e.to_string()),
            Route::Pipeline(actor) => actor
                .cast(PipelineMessage::Deliver(envelope))
                .map_err(|e| e.to_string()),
        };
        sent.map_err(|e| PrefrontalError::Actor(format!("delivery to {} failed: {}", recipient, e)))
    }
}

/// Shared, seal-once routing table
#[derive(Clone, Default)]
pub struct Router {
    routes: Arc<OnceCell<HashMap<AgentId, Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the routing table; fails if it was already installed
    pub fn seal(&self, routes: HashMap<AgentId, Route>) -> Result<()> {
        let count = routes.len();
        self.routes
            .set(routes)
            .map_err(|_| PrefrontalError::Actor("routing table already sealed".to_string()))?;
        debug!("Routing table sealed with {} actors", count);
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.routes.get().is_some()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.routes.get().is_some_and(|routes| routes.contains_key(id))
    }

    /// Wrap `payload` in an envelope and enqueue it for `recipient`
    pub fn send(&self, sender: &AgentId, recipient: &AgentId, payload: Payload) -> Result<()> {
        let routes = self
            .routes
            .get()
            .ok_or_else(|| PrefrontalError::Actor("routing table not sealed".to_string()))?;

        let route = routes
            .get(recipient)
            .ok_or_else(|| PrefrontalError::UnknownRecipient(recipient.clone()))?;

        debug!("{} -> {}: {}", sender, recipient, payload.kind());
        route.deliver(Envelope::new(sender.clone(), recipient.clone(), payload))
    }
}
