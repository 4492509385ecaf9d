//! Validate-and-retry boundary around oracle calls
//!
//! `consult` loops query → parse → validate with the same prompt until a
//! typed response is produced or the attempt budget runs out. Transport
//! errors are returned on the spot; only unusable output is retried.

use crate::error::{PrefrontalError, Result};
use crate::orchestration::parser::{parse, ParsedResponse};
use crate::orchestration::schema::Schema;
use crate::services::Oracle;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempt budget and backoff between schema failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 250,
            max_delay_ms: 4000,
            jitter_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based),
    /// without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(exp))
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Query the oracle until its answer validates as `S`
pub async fn consult<S: Schema>(
    oracle: &dyn Oracle,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<S> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let raw = oracle.query(prompt).await?;

        let reason = match parse(&raw) {
            ParsedResponse::Object(value) => match S::from_value(value) {
                Ok(typed) => {
                    debug!("{} accepted on attempt {}", S::KIND, attempt);
                    return Ok(typed);
                }
                Err(violation) => violation.to_string(),
            },
            ParsedResponse::Malformed { reason } => reason,
        };

        if attempt < max_attempts {
            let delay = policy.delay_with_jitter(attempt);
            warn!(
                "Rejected {} output ({}), retrying after {}ms (attempt {}/{})",
                S::KIND,
                reason,
                delay.as_millis(),
                attempt,
                max_attempts
            );
            sleep(delay).await;
        } else {
            warn!("Rejected {} output ({}), giving up", S::KIND, reason);
        }
    }

    Err(PrefrontalError::RetriesExhausted {
        kind: S::KIND,
        attempts: max_attempts,
    })
}
