//! Make multiple attempts, even concurrently.
//!
//! Each alternative carries a start delay. The first starts immediately;
//! later ones start when their delay expires (or earlier, if every
//! running attempt has already failed), up to a small concurrency cap.
//! The first success wins and aborts the stragglers. The point is that a
//! slow or unreachable bucket costs its configured delay, not a stall.
//!
//! Actions should avoid side effects, or keep them idempotent: a trailing
//! attempt may still complete after another has already won.

use std::collections::VecDeque;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

use plop_core::{Error, Result};

const DEFAULT_MAX_WORKERS: usize = 4;

pub(crate) struct Multiflight<T> {
    max_workers: usize,
    actions: Vec<(Duration, BoxFuture<'static, Result<T>>)>,
}

impl<T: Send + 'static> Multiflight<T> {
    pub fn new() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            actions: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    /// Queue an action to run later. It may or may not actually run.
    pub fn add(&mut self, delay: Duration, action: BoxFuture<'static, Result<T>>) {
        self.actions.push((delay, action));
    }

    /// Runs the actions until one succeeds.
    ///
    /// Failing with an empty action list is a programmer error. If every
    /// action fails, the collected errors come back as [`Error::Multi`].
    pub async fn run(mut self) -> Result<T> {
        if self.actions.is_empty() {
            return Err(Error::Config("multiflight: no actions to try".into()));
        }
        // Shortest delay first (stable), rebased so the first is at zero.
        self.actions.sort_by_key(|(delay, _)| *delay);
        let base = self.actions[0].0;
        let mut queue: VecDeque<_> = self
            .actions
            .into_iter()
            .map(|(delay, action)| (delay - base, action))
            .collect();

        let start = Instant::now();
        let mut workers: JoinSet<Result<T>> = JoinSet::new();
        let mut errors: Vec<Error> = Vec::new();

        loop {
            let mut start_more = workers.is_empty();
            if !workers.is_empty() {
                // Only worry about *when* to start more while something
                // is still in flight; with nothing running we start the
                // next alternative right away, delay or not.
                let next_deadline = if workers.len() < self.max_workers {
                    queue.front().map(|(delay, _)| start + *delay)
                } else {
                    None
                };
                let joined = match next_deadline {
                    Some(deadline) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(deadline) => {
                                debug!("slow progress, starting next alternative");
                                start_more = true;
                                None
                            }
                            joined = workers.join_next() => joined,
                        }
                    }
                    None => workers.join_next().await,
                };
                match joined {
                    Some(Ok(Ok(value))) => {
                        // Dropping the set aborts every straggler.
                        debug!("worker success");
                        return Ok(value);
                    }
                    Some(Ok(Err(err))) => {
                        debug!(error = %err, "worker error");
                        errors.push(err);
                    }
                    Some(Err(join_err)) => {
                        if join_err.is_panic() {
                            std::panic::resume_unwind(join_err.into_panic());
                        }
                    }
                    None => {}
                }
            }

            if start_more && workers.len() < self.max_workers {
                if let Some((_, action)) = queue.pop_front() {
                    workers.spawn(action);
                    debug!(running = workers.len(), "started worker");
                }
            }

            if workers.is_empty() && queue.is_empty() {
                // Nothing in flight and we're out of things to try.
                break;
            }
        }

        debug!(failures = errors.len(), "all alternatives failed");
        Err(Error::Multi(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config_err(msg: &str) -> Error {
        Error::Config(msg.into())
    }

    #[tokio::test]
    async fn empty_is_a_programmer_error() {
        let m: Multiflight<()> = Multiflight::new();
        let err = m.run().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn single_success() {
        let mut m = Multiflight::new();
        m.add(Duration::ZERO, Box::pin(async { Ok(42u32) }));
        assert_eq!(m.run().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn success_bypasses_earlier_errors() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut m = Multiflight::new();
        m.add(
            Duration::ZERO,
            Box::pin(async move {
                drop(tx);
                Err(config_err("fail for test"))
            }),
        );
        m.add(
            Duration::from_millis(1),
            Box::pin(async move {
                // Improve the chances that the failing action runs first.
                let _ = rx.await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok("Hello, world")
            }),
        );
        assert_eq!(m.run().await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn all_errors_are_aggregated() {
        let mut m: Multiflight<()> = Multiflight::new();
        m.add(Duration::ZERO, Box::pin(async { Err(config_err("one")) }));
        m.add(Duration::ZERO, Box::pin(async { Err(config_err("two")) }));
        let err = m.run().await.unwrap_err();
        let Error::Multi(errs) = err else {
            panic!("expected Error::Multi, got {err}");
        };
        // Ordering is not guaranteed.
        let messages: Vec<String> = errs.iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("one")));
        assert!(messages.iter().any(|m| m.contains("two")));
    }

    #[tokio::test]
    async fn winner_aborts_stragglers() {
        let mut m = Multiflight::new();
        m.add(
            Duration::ZERO,
            Box::pin(async {
                // Never resolves on its own; must be aborted.
                std::future::pending::<()>().await;
                unreachable!()
            }),
        );
        m.add(Duration::from_millis(1), Box::pin(async { Ok(7u8) }));
        let started = std::time::Instant::now();
        assert_eq!(m.run().await.unwrap(), 7);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn failed_worker_frees_a_slot_early() {
        // With one worker slot, the second action can only run because
        // the first one's failure freed the slot before its deadline.
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut m = Multiflight::new().with_max_workers(1);
        let a = attempts.clone();
        m.add(
            Duration::ZERO,
            Box::pin(async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(config_err("first fails"))
            }),
        );
        let a = attempts.clone();
        m.add(
            Duration::from_secs(3600),
            Box::pin(async move {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        m.run().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
