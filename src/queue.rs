//! Per-slide FIFO serialization of mutations.
//!
//! Each key maps to the tail of a chain of turns. A new operation waits for the
//! current tail, then becomes the tail itself. Operations on different keys never wait
//! on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

type Tail = Shared<BoxFuture<'static, ()>>;

/// Latest turn on a key and the number of turns still holding a place in it.
struct Chain {
    tail: Tail,
    pending: usize,
}

#[derive(Default)]
pub struct MutationQueue {
    chains: Mutex<HashMap<String, Chain>>,
}

impl std::fmt::Debug for MutationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationQueue")
            .field("active_keys", &self.len())
            .finish()
    }
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `op` once every earlier operation on `key` has settled, success or failure.
    ///
    /// The outcome of `op` is returned as-is and never affects later operations.
    /// Dropping the returned future gives up the turn without blocking the chain.
    pub async fn with_lock<T, F, Fut>(&self, key: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (release, released) = oneshot::channel::<()>();
        let previous = {
            let mut chains = self.chains();
            let previous = chains.get(key).map(|chain| chain.tail.clone());
            let waited_on = previous.clone();
            let tail: Tail = async move {
                if let Some(previous) = waited_on {
                    previous.await;
                }
                let _ = released.await;
            }
            .boxed()
            .shared();

            match chains.get_mut(key) {
                Some(chain) => {
                    chain.tail = tail;
                    chain.pending += 1;
                }
                None => {
                    chains.insert(key.to_string(), Chain { tail, pending: 1 });
                }
            }
            previous
        };

        let _turn = Turn {
            queue: self,
            key,
            release: Some(release),
        };
        if let Some(previous) = previous {
            previous.await;
        }
        op().await
    }

    /// True when nothing is running or waiting on `key`.
    pub fn is_idle(&self, key: &str) -> bool {
        !self.chains().contains_key(key)
    }

    /// Number of keys with a running or waiting operation.
    pub fn len(&self) -> usize {
        self.chains().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn chains(&self) -> MutexGuard<'_, HashMap<String, Chain>> {
        self.chains.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the successor when the owning operation finishes or is dropped.
///
/// A turn dropped while still waiting stays chained: its tail only resolves after the
/// operation ahead of it, so successors keep their order.
struct Turn<'a> {
    queue: &'a MutationQueue,
    key: &'a str,
    release: Option<oneshot::Sender<()>>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
        let mut chains = self.queue.chains();
        if let Some(chain) = chains.get_mut(self.key) {
            chain.pending = chain.pending.saturating_sub(1);
            if chain.pending == 0 {
                chains.remove(self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    type Log = Arc<Mutex<Vec<String>>>;

    async fn step(queue: &MutationQueue, key: &str, name: &str, delay_ms: u64, log: Log) {
        queue
            .with_lock(key, move || async move {
                log.lock().unwrap().push(format!("start {}", name));
                sleep(Duration::from_millis(delay_ms)).await;
                log.lock().unwrap().push(format!("end {}", name));
            })
            .await
    }

    #[tokio::test]
    async fn test_runs_in_enqueue_order_without_overlap() {
        let queue = MutationQueue::new();
        let log: Log = Arc::default();

        tokio::join!(
            step(&queue, "s1", "a", 30, log.clone()),
            step(&queue, "s1", "b", 10, log.clone()),
            step(&queue, "s1", "c", 0, log.clone()),
        );

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "end a", "start b", "end b", "start c", "end c"]
        );
        assert!(queue.is_idle("s1"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_break_the_chain() {
        let queue = MutationQueue::new();

        let (first, second) = tokio::join!(
            queue.with_lock("s1", || async {
                sleep(Duration::from_millis(5)).await;
                Err::<u32, String>("boom".into())
            }),
            queue.with_lock("s1", || async { Ok::<u32, String>(2) }),
        );

        assert_eq!(first, Err("boom".to_string()));
        assert_eq!(second, Ok(2));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_run_in_parallel() {
        let queue = MutationQueue::new();
        let log: Log = Arc::default();

        tokio::join!(
            step(&queue, "s1", "slow", 40, log.clone()),
            step(&queue, "s2", "fast", 0, log.clone()),
        );

        let log = log.lock().unwrap();
        let fast_end = log.iter().position(|l| l == "end fast").unwrap();
        let slow_end = log.iter().position(|l| l == "end slow").unwrap();
        assert!(fast_end < slow_end);
    }

    #[tokio::test]
    async fn test_dropped_waiter_keeps_ordering() {
        let queue = MutationQueue::new();
        let log: Log = Arc::default();

        let abandoned_log = log.clone();
        let abandoned = async {
            let waiter = queue.with_lock("s1", move || async move {
                abandoned_log.lock().unwrap().push("abandoned".to_string());
            });
            assert!(
                tokio::time::timeout(Duration::from_millis(5), waiter)
                    .await
                    .is_err()
            );
        };

        tokio::join!(
            step(&queue, "s1", "a", 30, log.clone()),
            async {
                abandoned.await;
                step(&queue, "s1", "b", 0, log.clone()).await;
            },
        );

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "end a", "start b", "end b"]
        );
        assert!(queue.is_idle("s1"));
    }

    #[tokio::test]
    async fn test_cancelled_last_waiter_leaves_key_idle() {
        let queue = MutationQueue::new();
        let log: Log = Arc::default();

        tokio::join!(step(&queue, "s1", "a", 20, log.clone()), async {
            let waiter = queue.with_lock("s1", || async {});
            assert!(
                tokio::time::timeout(Duration::from_millis(5), waiter)
                    .await
                    .is_err()
            );
            assert!(!queue.is_idle("s1"));
        });

        assert_eq!(*log.lock().unwrap(), vec!["start a", "end a"]);
        assert!(queue.is_idle("s1"));
        assert!(queue.is_empty());

        step(&queue, "s1", "b", 0, log.clone()).await;
        assert!(queue.is_idle("s1"));
    }

    #[tokio::test]
    async fn test_returns_operation_value() {
        let queue = MutationQueue::new();
        let value = queue.with_lock("s1", || async { 7 }).await;
        assert_eq!(value, 7);
        assert!(queue.is_idle("s1"));
    }
}
