//! Caller-side retry around whole orchestration runs

use std::future::Future;
use std::time::Duration;
use log::{debug, warn};

use crate::orchestrator::Outcome;

/// Retry policy for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy
{   pub max_retries: usize
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_retries: usize
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_retries
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
        }
    }

    /// Never retry
    pub fn none() -> Self
    {   RetryPolicy::new(0, 1.0, 0)
    }

    pub fn from_config(config: &crate::config::RetryConfig) -> Self
    {   if !config.enabled
        {   return RetryPolicy::none();
        }
        RetryPolicy::new(
          config.max_retries
        , config.backoff_multiplier
        , config.initial_backoff_ms
        )
    }

    /// Calculate backoff duration for attempt number
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        let multiplier
          = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(
          (self.initial_backoff.as_millis() as f32
            * multiplier) as u64
        )
    }

    /// Re-run `attempt` while it fails transiently and retries remain
    pub async fn run<F, Fut>(&self, mut attempt: F) -> Outcome
    where
      F: FnMut() -> Fut
    , Fut: Future<Output = Outcome>
    {   let mut tries = 0;
        loop
        {   let outcome = attempt().await;
            let transient = match &outcome
            {   Outcome::Failed(e) => e.is_transient()
              , Outcome::Completed(_) => false
            };
            if !transient || tries >= self.max_retries
            {   return outcome;
            }
            let wait = self.backoff_for_attempt(tries);
            warn!(
              "Transient failure ({:?}), retrying in {:?}",
              outcome, wait
            );
            tokio::time::sleep(wait).await;
            tries += 1;
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::none()
    }
}
