//! Scripted oracle
//!
//! Canned responses routed by prompt content. Concurrently running actors
//! query in no fixed order, so replies are selected by needles that must all
//! occur in the prompt rather than by call order. Each route replays its
//! replies in order and repeats the last one once exhausted.
//!
//! Script files (used by `prefrontal run --script`) are JSON arrays:
//!
//! ```json
//! [
//!   {"match": ["Mission Coordinator"], "replies": ["{\"difficulty\": \"low\", \"subtasks\": []}"]}
//! ]
//! ```

use crate::error::{PrefrontalError, Result};
use crate::services::oracle::Oracle;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Deserialize)]
struct ScriptRule {
    #[serde(rename = "match")]
    needles: Vec<String>,
    replies: Vec<String>,
}

#[derive(Debug)]
struct Route {
    needles: Vec<String>,
    replies: VecDeque<String>,
}

impl Route {
    fn matches(&self, prompt: &str) -> bool {
        self.needles.iter().all(|needle| prompt.contains(needle.as_str()))
    }

    fn next_reply(&mut self) -> Option<String> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Oracle returning scripted replies
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    routes: Mutex<Vec<Route>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a usable script
    fn routes(&self) -> MutexGuard<'_, Vec<Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prompt_log(&self) -> MutexGuard<'_, Vec<String>> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a route; earlier routes win when several match
    pub fn route<I, S>(self, needles: &[&str], replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes().push(Route {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            replies: replies.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Build from a JSON script
    pub fn from_json(script: &str) -> Result<Self> {
        let rules: Vec<ScriptRule> = serde_json::from_str(script)?;
        let oracle = Self::new();
        oracle.routes().extend(rules.into_iter().map(|rule| Route {
            needles: rule.needles,
            replies: rule.replies.into(),
        }));
        Ok(oracle)
    }

    /// Load a JSON script file
    pub fn from_file(path: &Path) -> Result<Self> {
        let script = std::fs::read_to_string(path)?;
        Self::from_json(&script)
    }

    /// Every prompt received, in arrival order
    pub fn prompts(&self) -> Vec<String> {
        self.prompt_log().clone()
    }

    /// Number of prompts containing every needle
    pub fn count_matching(&self, needles: &[&str]) -> usize {
        self.prompts()
            .iter()
            .filter(|prompt| needles.iter().all(|n| prompt.contains(n)))
            .count()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn query(&self, prompt: &str) -> Result<String> {
        self.prompt_log().push(prompt.to_string());

        self.routes()
            .iter_mut()
            .find(|route| route.matches(prompt))
            .and_then(Route::next_reply)
            .ok_or_else(|| {
                PrefrontalError::OracleApi("no scripted response matches prompt".to_string())
            })
    }
}
