//! Asynchronous generation job polling.
//!
//! Image and video generation run as remote tasks: the caller submits, gets
//! a task id, then polls until the task reports `SUCCEEDED` or `FAILED`.
//! The poll budget is bounded; exhausting it is a [`ExecutionError::Timeout`],
//! distinct from a reported failure.

use crate::cancellation::CancellationToken;
use crate::errors::ExecutionError;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Remote task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Queued.
    Pending,
    /// Executing.
    Running,
    /// Finished with results.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Any status this client does not know; treated as still in progress.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Returns true if the task will not change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// The task id.
    pub task_id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Result URLs, populated on success.
    pub results: Vec<String>,
    /// Failure message, populated on failure.
    pub message: Option<String>,
}

impl TaskSnapshot {
    /// A snapshot with only a status.
    #[must_use]
    pub fn new(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            results: Vec::new(),
            message: None,
        }
    }

    /// Sets the result URLs.
    #[must_use]
    pub fn with_results(mut self, results: Vec<String>) -> Self {
        self.results = results;
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Fetches the status of a remote task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Polls `task_id` once.
    ///
    /// A non-success HTTP status must be returned as an error; it ends the
    /// wait immediately.
    async fn poll_task(&self, task_id: &str) -> Result<TaskSnapshot, ExecutionError>;
}

/// How the delay between polls grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// delay = interval
    #[default]
    Constant,
    /// delay = interval * (attempt + 1)
    Linear,
    /// delay = interval * 2^attempt
    Exponential,
}

/// Randomization applied to each poll delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterStrategy {
    /// No jitter.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Poll budget and pacing for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Maximum number of polls.
    pub max_attempts: usize,
    /// Base delay between polls in milliseconds.
    pub interval_ms: u64,
    /// Delay cap in milliseconds.
    pub max_interval_ms: u64,
    /// Delay growth.
    pub backoff: BackoffStrategy,
    /// Delay randomization.
    pub jitter: JitterStrategy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval_ms: 3000,
            max_interval_ms: 30_000,
            backoff: BackoffStrategy::Constant,
            jitter: JitterStrategy::None,
        }
    }
}

impl PollPolicy {
    /// Budget for image tasks: 60 polls, 3 s apart.
    #[must_use]
    pub fn image() -> Self {
        Self::default()
    }

    /// Budget for video tasks: 120 polls, 5 s apart.
    #[must_use]
    pub fn video() -> Self {
        Self {
            max_attempts: 120,
            interval_ms: 5000,
            ..Self::default()
        }
    }

    /// Creates a constant-interval policy.
    #[must_use]
    pub fn fixed(max_attempts: usize, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
            max_interval_ms: interval_ms.max(Self::default().max_interval_ms),
            ..Self::default()
        }
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Upper bound on the total time spent sleeping between polls.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.base_delay_ms(attempt))
            .fold(Duration::ZERO, |total, ms| total + Duration::from_millis(ms))
    }

    /// The delay to wait after the `attempt`-th poll (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let delay = self.base_delay_ms(attempt);
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };
        Duration::from_millis(jittered)
    }

    fn base_delay_ms(&self, attempt: usize) -> u64 {
        let base = self.interval_ms;
        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        let delay = match self.backoff {
            BackoffStrategy::Constant => base,
            BackoffStrategy::Linear => base.saturating_mul(u64::from(exponent).saturating_add(1)),
            BackoffStrategy::Exponential => base.saturating_mul(2_u64.saturating_pow(exponent)),
        };
        delay.min(self.max_interval_ms.max(base))
    }
}

/// The lifecycle of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Submitted, not yet polled.
    Submitted {
        /// The task id.
        task_id: String,
    },
    /// Polled at least once; still in progress.
    Polling {
        /// The task id.
        task_id: String,
        /// Polls performed so far.
        attempts: usize,
    },
    /// Finished with result URLs.
    Succeeded {
        /// Result URLs.
        results: Vec<String>,
    },
    /// The task reported failure.
    Failed {
        /// The reported message.
        message: String,
    },
    /// The poll budget ran out.
    TimedOut {
        /// The task id.
        task_id: String,
        /// Polls performed.
        attempts: usize,
    },
}

impl JobState {
    /// A freshly submitted job.
    #[must_use]
    pub fn submitted(task_id: impl Into<String>) -> Self {
        Self::Submitted {
            task_id: task_id.into(),
        }
    }

    /// Returns true if no further polling is needed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. } | Self::TimedOut { .. })
    }

    /// Polls performed so far.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Polling { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Advances the state with one poll result.
    ///
    /// Terminal states absorb further snapshots unchanged.
    #[must_use]
    pub fn observe(self, snapshot: TaskSnapshot, max_attempts: usize) -> Self {
        let (task_id, attempts) = match self {
            Self::Submitted { task_id } => (task_id, 0),
            Self::Polling { task_id, attempts } => (task_id, attempts),
            terminal => return terminal,
        };
        let attempts = attempts + 1;

        match snapshot.status {
            TaskStatus::Succeeded => Self::Succeeded {
                results: snapshot.results,
            },
            TaskStatus::Failed => Self::Failed {
                message: snapshot.message.unwrap_or_else(|| "Unknown error".to_string()),
            },
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Unknown => {
                if attempts >= max_attempts {
                    Self::TimedOut { task_id, attempts }
                } else {
                    Self::Polling { task_id, attempts }
                }
            }
        }
    }

    /// Converts a terminal state into the job's result.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::TaskFailed`] or [`ExecutionError::Timeout`]
    /// for the failing terminal states, and [`ExecutionError::MalformedResponse`]
    /// if the state is not terminal.
    pub fn into_result(self) -> Result<Vec<String>, ExecutionError> {
        match self {
            Self::Succeeded { results } => Ok(results),
            Self::Failed { message } => Err(ExecutionError::TaskFailed(message)),
            Self::TimedOut { task_id, attempts } => Err(ExecutionError::Timeout { task_id, attempts }),
            Self::Submitted { task_id } | Self::Polling { task_id, .. } => Err(
                ExecutionError::MalformedResponse(format!("Task {task_id} has not finished")),
            ),
        }
    }
}

/// Drives a submitted job to completion.
pub struct JobPoller<'a, A: TaskApi + ?Sized> {
    api: &'a A,
    policy: &'a PollPolicy,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, A: TaskApi + ?Sized> JobPoller<'a, A> {
    /// Creates a poller.
    #[must_use]
    pub fn new(api: &'a A, policy: &'a PollPolicy) -> Self {
        Self {
            api,
            policy,
            cancel: None,
        }
    }

    /// Stops waiting when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Polls `task_id` until it finishes, fails, or the budget runs out.
    ///
    /// # Errors
    ///
    /// Returns the poll error, [`ExecutionError::TaskFailed`],
    /// [`ExecutionError::Timeout`], or [`ExecutionError::Cancelled`].
    pub async fn wait(&self, task_id: &str) -> Result<Vec<String>, ExecutionError> {
        let mut state = JobState::submitted(task_id);
        loop {
            self.check_cancelled()?;
            let snapshot = self.api.poll_task(task_id).await?;
            debug!(task_id, status = ?snapshot.status, attempt = state.attempts() + 1, "Polled task");
            state = state.observe(snapshot, self.policy.max_attempts);

            if state.is_terminal() {
                return state.into_result();
            }

            let delay = self.policy.delay_for_attempt(state.attempts().saturating_sub(1));
            match self.cancel {
                Some(token) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = token.cancelled() => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), ExecutionError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(ExecutionError::Cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            )),
            _ => Ok(()),
        }
    }
}
