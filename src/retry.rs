//! The Retry Wrapper (C9, §4.9): whole-operation retry with fixed backoff.
//! Orthogonal to every other component; used by the Executor's network
//! steps and the CL pipeline's push.

use std::thread;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_secs(1),
        }
    }
}

/// Invoke `action` up to `config.attempts` times, sleeping `config.interval`
/// between failures. Returns the final error if every attempt fails. There
/// is no per-step retry; `action` is treated as one indivisible unit.
pub fn retry<T, E, F>(config: RetryConfig, mut action: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut last_err = None;
    for attempt in 1..=config.attempts.max(1) {
        match action() {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, attempts = config.attempts, %err, "operation failed, retrying");
                last_err = Some(err);
                if attempt < config.attempts {
                    thread::sleep(config.interval);
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn succeeds_without_retry() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(
            RetryConfig {
                attempts: 3,
                interval: Duration::from_millis(0),
            },
            || {
                calls.set(calls.get() + 1);
                Ok(42)
            },
        );
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_until_success() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(
            RetryConfig {
                attempts: 3,
                interval: Duration::from_millis(0),
            },
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("not yet")
                } else {
                    Ok(7)
                }
            },
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn returns_final_error_after_exhausting_attempts() {
        let calls = Cell::new(0);
        let result: Result<i32, &str> = retry(
            RetryConfig {
                attempts: 2,
                interval: Duration::from_millis(0),
            },
            || {
                calls.set(calls.get() + 1);
                Err("nope")
            },
        );
        assert_eq!(result, Err("nope"));
        assert_eq!(calls.get(), 2);
    }
}
