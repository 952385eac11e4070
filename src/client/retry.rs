use crate::Error;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// HTTP statuses worth redispatching.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// What to do after a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep `delay`, then redispatch. `attempt` is 1-based.
    Retry { delay: Duration, attempt: u32 },
    Fail,
}

/// Per-key budget: attempts consumed and chains currently running on the key.
#[derive(Debug, Default)]
struct KeyBudget {
    attempts: u32,
    in_flight: u32,
}

/// Exponential backoff scheduler with attempt counters shared per retry key.
///
/// - `delay = base_delay * 2^attempts`, no jitter
/// - concurrent chains on the same key draw from one budget
/// - a key's counter is cleared when the last chain holding a [`ChainGuard`] for it finishes
pub struct RetryScheduler {
    max_attempts: u32,
    base_delay: Duration,
    budgets: Mutex<HashMap<String, KeyBudget>>,
}

/// Registers one running chain on a retry key; released on drop.
#[must_use = "the chain is unregistered as soon as the guard is dropped"]
pub struct ChainGuard<'a> {
    scheduler: &'a RetryScheduler,
    retry_key: String,
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.finish_chain(&self.retry_key);
    }
}

impl RetryScheduler {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            budgets: Mutex::new(HashMap::new()),
        }
    }

    fn budgets(&self) -> MutexGuard<'_, HashMap<String, KeyBudget>> {
        self.budgets.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Mark a chain as running on `retry_key` until the guard is dropped.
    pub fn begin_chain(&self, retry_key: &str) -> ChainGuard<'_> {
        self.budgets()
            .entry(retry_key.to_string())
            .or_default()
            .in_flight += 1;
        ChainGuard {
            scheduler: self,
            retry_key: retry_key.to_string(),
        }
    }

    fn finish_chain(&self, retry_key: &str) {
        let mut budgets = self.budgets();
        if let Some(budget) = budgets.get_mut(retry_key) {
            budget.in_flight = budget.in_flight.saturating_sub(1);
            if budget.in_flight == 0 {
                budgets.remove(retry_key);
            }
        }
    }

    /// Chains currently registered on `retry_key`.
    pub fn in_flight(&self, retry_key: &str) -> u32 {
        self.budgets().get(retry_key).map_or(0, |b| b.in_flight)
    }

    /// Decide whether `err` gets another dispatch, consuming one attempt if so.
    pub fn decide(&self, err: &Error, retry_key: &str, skip_retry: bool) -> Decision {
        if skip_retry || !err.is_retryable() {
            return Decision::Fail;
        }

        let mut budgets = self.budgets();
        let budget = budgets.entry(retry_key.to_string()).or_default();
        if budget.attempts >= self.max_attempts {
            return Decision::Fail;
        }
        let delay = self.backoff_delay(budget.attempts);
        budget.attempts += 1;
        Decision::Retry {
            delay,
            attempt: budget.attempts,
        }
    }

    pub fn attempts(&self, retry_key: &str) -> u32 {
        self.budgets().get(retry_key).map_or(0, |b| b.attempts)
    }

    /// Clear the consumed attempts for `retry_key`, keeping running chains registered.
    pub fn reset(&self, retry_key: &str) {
        let mut budgets = self.budgets();
        match budgets.get_mut(retry_key) {
            Some(budget) if budget.in_flight > 0 => budget.attempts = 0,
            Some(_) => {
                budgets.remove(retry_key);
            }
            None => {}
        }
    }
}
