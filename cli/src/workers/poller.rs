//! Deadline-bounded polling

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::errors::CliError;

/// Poller options
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Delay between attempts
    pub interval: Duration,

    /// Wall-clock budget, fixed when polling starts
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

impl Options {
    /// Absolute expiry for a loop entered now
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }
}

/// Outcome of one poll attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Terminal value reached
    Done(T),

    /// Keep polling; `status` is the last observed state, if any
    Continue { status: Option<String> },
}

/// Run `options` against a deadline computed once, now
pub async fn poll_until<T, A, Fut, S, SF>(
    what: &str,
    options: &Options,
    action: A,
    sleep_fn: S,
) -> Result<T, CliError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, CliError>>,
    S: Fn(Duration) -> SF,
    SF: Future<Output = ()>,
{
    poll_until_deadline(what, options.interval, options.deadline(), action, sleep_fn).await
}

/// Invoke `action` until it returns `Done`, an error, or `deadline` passes.
///
/// The deadline is checked before every attempt, so an already expired
/// deadline fails without calling `action`.
pub async fn poll_until_deadline<T, A, Fut, S, SF>(
    what: &str,
    interval: Duration,
    deadline: Instant,
    mut action: A,
    sleep_fn: S,
) -> Result<T, CliError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStep<T>, CliError>>,
    S: Fn(Duration) -> SF,
    SF: Future<Output = ()>,
{
    let mut last_status: Option<String> = None;
    let mut attempt: u32 = 0;

    loop {
        if Instant::now() >= deadline {
            return Err(CliError::Timeout {
                what: what.to_string(),
                last_status,
            });
        }

        attempt += 1;
        match action().await? {
            PollStep::Done(value) => {
                debug!("{}: done after {} attempt(s)", what, attempt);
                return Ok(value);
            }
            PollStep::Continue { status } => {
                debug!("{}: attempt {} status {:?}", what, attempt, status);
                if status.is_some() {
                    last_status = status;
                }
            }
        }

        sleep_fn(interval).await;
    }
}
