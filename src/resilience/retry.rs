//! Bounded retry with exponential backoff, jitter and cancellation

use crate::error::{CacheError, Result as CacheResult};
use crate::resilience::classifier::ErrorClassifier;
use crate::resilience::report::{ErrorReport, RetryContext};
use crate::resilience::stats::{ErrorStatistics, ErrorStatsTracker, RunOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};

/// Delays never drop below this, jitter included
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Jitter perturbs a delay by up to this fraction either way
const JITTER_FRACTION: f64 = 0.25;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; at most `max_retries + 1` invocations
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound applied before jitter
    pub max_delay: Duration,

    pub backoff_multiplier: f64,

    /// Enable ±25% random jitter
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Slower schedule for long-running video renders
    pub fn video_generation() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(CacheError::ConfigError(
                "backoff_multiplier must be at least 1.0".to_string(),
            ));
        }

        if self.base_delay > self.max_delay {
            return Err(CacheError::ConfigError(
                "base_delay must not exceed max_delay".to_string(),
            ));
        }

        Ok(())
    }

    /// Backoff before retry number `attempt + 1`
    ///
    /// `min(max_delay, base_delay * multiplier^attempt)`, perturbed by up to
    /// ±25% when jitter is on, truncated to whole milliseconds and floored at
    /// 100ms.
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let mut delay_ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        delay_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        if self.jitter {
            let jitter_range = delay_ms * JITTER_FRACTION;
            delay_ms += (rng.gen::<f64>() - 0.5) * 2.0 * jitter_range;
        }

        let floored = delay_ms.floor().max(MIN_RETRY_DELAY.as_millis() as f64);
        Duration::from_millis(floored as u64)
    }
}

/// Errors surfaced by [`RetryController::run`]
#[derive(Error, Debug)]
pub enum RetryError {
    /// No further attempt will be made
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    Terminal {
        operation: String,
        attempts: u32,
        message: String,
        report: Box<ErrorReport>,
    },

    /// The cancellation signal fired between attempts
    #[error("{operation} cancelled after {attempts} attempt(s)")]
    Cancelled { operation: String, attempts: u32 },

    /// The retry configuration was rejected before the producer ran
    #[error("{operation} not attempted: {reason}")]
    InvalidConfig { operation: String, reason: String },
}

impl RetryError {
    /// Diagnostic report of a terminal failure
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            RetryError::Terminal { report, .. } => Some(report.as_ref()),
            RetryError::Cancelled { .. } | RetryError::InvalidConfig { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Terminal { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
            RetryError::InvalidConfig { .. } => 0,
        }
    }
}

/// Drives a fallible producer until it succeeds, is judged terminal, or is cancelled
pub struct RetryController {
    classifier: ErrorClassifier,
    rng: Mutex<StdRng>,
    stats: Mutex<ErrorStatsTracker>,
    cancel: Option<watch::Receiver<bool>>,
}

impl fmt::Debug for RetryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryController")
            .field("classifier", &self.classifier)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(ErrorClassifier::default())
    }
}

impl RetryController {
    pub fn new(classifier: ErrorClassifier) -> Self {
        Self::with_rng(classifier, StdRng::from_entropy())
    }

    /// Controller with reproducible jitter
    pub fn with_seed(classifier: ErrorClassifier, seed: u64) -> Self {
        Self::with_rng(classifier, StdRng::seed_from_u64(seed))
    }

    fn with_rng(classifier: ErrorClassifier, rng: StdRng) -> Self {
        Self {
            classifier,
            rng: Mutex::new(rng),
            stats: Mutex::new(ErrorStatsTracker::default()),
            cancel: None,
        }
    }

    /// Stop retrying once `cancel` becomes `true`
    ///
    /// Checked before every attempt and during backoff sleeps. An attempt
    /// already in flight runs to completion.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Run `producer` under the retry policy
    ///
    /// `context.retry_count` tracks the attempt in progress and every backoff
    /// delay is appended to `context.delays`. A config failing
    /// [`RetryConfig::validate`] is rejected before `producer` is called.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut producer: F,
        context: &mut RetryContext,
        config: &RetryConfig,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if let Err(e) = config.validate() {
            warn!("{} rejected retry config: {}", context.operation_name, e);
            return Err(RetryError::InvalidConfig {
                operation: context.operation_name.clone(),
                reason: e.to_string(),
            });
        }

        let mut attempt: u32 = 0;

        loop {
            if self.is_cancelled() {
                return Err(self.cancelled(context, attempt).await);
            }

            context.retry_count = attempt;

            let message = match producer().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            "{} succeeded after {} retries",
                            context.operation_name, attempt
                        );
                    }
                    self.stats
                        .lock()
                        .await
                        .record_run(attempt, RunOutcome::Succeeded);
                    return Ok(value);
                }
                Err(e) => e.to_string(),
            };

            let report = self.classifier.classify(&message, context);
            self.stats.lock().await.record_failure(&report);

            if attempt >= config.max_retries || !report.classification.retry_recommended {
                error!(
                    operation = %context.operation_name,
                    category = %report.classification.category,
                    attempts = attempt + 1,
                    "Operation failed terminally: {}",
                    message
                );
                self.stats
                    .lock()
                    .await
                    .record_run(attempt, RunOutcome::Terminal);
                return Err(RetryError::Terminal {
                    operation: context.operation_name.clone(),
                    attempts: attempt + 1,
                    message,
                    report: Box::new(report),
                });
            }

            let delay = {
                let mut rng = self.rng.lock().await;
                config.delay_for_attempt(attempt, &mut *rng)
            };
            warn!(
                "{} failed (attempt {}/{}), retrying after {:?}: {}",
                context.operation_name,
                attempt + 1,
                config.max_retries + 1,
                delay,
                message
            );
            context.delays.push(delay);

            if !self.sleep_unless_cancelled(delay).await {
                return Err(self.cancelled(context, attempt + 1).await);
            }

            attempt += 1;
        }
    }

    /// Snapshot of failure statistics since creation or the last reset
    pub async fn error_statistics(&self) -> ErrorStatistics {
        self.stats.lock().await.snapshot()
    }

    pub async fn reset_error_statistics(&self) {
        *self.stats.lock().await = ErrorStatsTracker::default();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    async fn cancelled(&self, context: &RetryContext, attempts: u32) -> RetryError {
        warn!(
            "{} cancelled after {} attempt(s)",
            context.operation_name, attempts
        );
        self.stats
            .lock()
            .await
            .record_run(attempts.saturating_sub(1), RunOutcome::Cancelled);
        RetryError::Cancelled {
            operation: context.operation_name.clone(),
            attempts,
        }
    }

    /// Returns `false` if cancellation fired before the delay elapsed
    async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        let Some(cancel) = &self.cancel else {
            tokio::time::sleep(delay).await;
            return true;
        };

        let mut cancel = cancel.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = wait_for_cancel(&mut cancel) => false,
        }
    }
}

/// Resolves once the flag is `true`; never resolves if the sender is gone
async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
