use std::time::Duration;

/// Decides whether a failed transport attempt is retried.
///
/// Application-level errors (`ERR` bodies, malformed payloads) are
/// authoritative answers from the store and are never retried; the policy
/// only sees transport failures.
pub trait RetryPolicy: Send + Sync {
    /// Delay before retry number `attempt` (1-based), or `None` to give up.
    fn backoff(&self, attempt: u32) -> Option<Duration>;
}

/// Reference behavior: every operation gets exactly one attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn backoff(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

/// Retry up to `max_retries` times with a constant delay. Useful for the
/// bulk map load, where a single dropped fetch would otherwise leave the
/// catalog permanently short of the cache.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    pub delay: Duration,
    pub max_retries: u32,
}

impl RetryPolicy for FixedBackoff {
    fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt <= self.max_retries {
            Some(self.delay)
        } else {
            None
        }
    }
}
