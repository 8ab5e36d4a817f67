use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// A generic per-key single-flight coalescer.
///
/// While an operation for a key is in flight, further callers for the same
/// key do not start duplicate executions; they wait and receive the exact
/// same outcome as the in-flight execution. On completion the key is
/// cleared, so the next caller starts a fresh execution. Nothing is cached
/// across completed calls.
///
/// Failures are delivered to every waiter as a shared `Arc<E>`.
pub struct SingleFlight<T, E> {
    inflight: Mutex<HashMap<String, broadcast::Sender<Result<T, Arc<E>>>>>,
}

enum Role<T, E> {
    Leader(broadcast::Sender<Result<T, Arc<E>>>),
    Waiter(broadcast::Receiver<Result<T, Arc<E>>>),
}

impl<T: Clone, E> SingleFlight<T, E> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `op` under `key`, or joins the execution already in flight.
    ///
    /// The closure is invoked at most once per call, and only by the caller
    /// that becomes the leader for the key.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> Result<T, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut op = Some(op);
        loop {
            let role = {
                let mut inflight = self.inflight.lock().expect("single-flight mutex poisoned");
                match inflight.get(key) {
                    Some(tx) => Role::Waiter(tx.subscribe()),
                    None => {
                        let (tx, _rx) = broadcast::channel(1);
                        inflight.insert(key.to_string(), tx.clone());
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    let op = op.take().expect("leader executes at most once");
                    let result = op().await.map_err(Arc::new);
                    // Clear the key before publishing so callers arriving
                    // from here on start a fresh execution.
                    self.inflight
                        .lock()
                        .expect("single-flight mutex poisoned")
                        .remove(key);
                    let _ = tx.send(result.clone());
                    return result;
                }
                Role::Waiter(mut rx) => match rx.recv().await {
                    Ok(result) => return result,
                    // The leader was dropped before publishing; go around
                    // and race for leadership.
                    Err(_) => continue,
                },
            }
        }
    }
}

impl<T: Clone, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flight: Arc<SingleFlight<usize, String>> = Arc::new(SingleFlight::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = Arc::clone(&flight);
            let executions = Arc::clone(&executions);
            handles.push(tokio::spawn(async move {
                flight
                    .run("probe:mainnet", || async {
                        let run = executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<usize, String>(run)
                    })
                    .await
            }));
        }

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            // Everyone observed the single leader's run.
            assert_eq!(value, 0);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_shared_with_every_waiter() {
        let flight: Arc<SingleFlight<usize, String>> = Arc::new(SingleFlight::new());

        let leader = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<usize, String>("boom".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run("k", || async { Ok::<usize, String>(99) })
                    .await
            })
        };

        let leader_err = leader.await.unwrap().unwrap_err();
        let waiter_err = waiter.await.unwrap().unwrap_err();
        assert_eq!(*leader_err, "boom");
        // Same shared error, not a re-execution.
        assert!(Arc::ptr_eq(&leader_err, &waiter_err));
    }

    #[tokio::test]
    async fn key_is_cleared_after_completion() {
        let flight: SingleFlight<usize, String> = SingleFlight::new();
        let executions = AtomicUsize::new(0);

        for expected in 0..3 {
            let value = flight
                .run("k", || async {
                    Ok::<usize, String>(executions.fetch_add(1, Ordering::SeqCst))
                })
                .await
                .unwrap();
            // Sequential calls each get a fresh execution.
            assert_eq!(value, expected);
        }
    }

    #[tokio::test]
    async fn distinct_keys_do_not_coalesce() {
        let flight: Arc<SingleFlight<&'static str, String>> = Arc::new(SingleFlight::new());

        let a = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run("a", || async {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok::<&str, String>("a")
                    })
                    .await
            })
        };
        let b = {
            let flight = Arc::clone(&flight);
            tokio::spawn(
                async move { flight.run("b", || async { Ok::<&str, String>("b") }).await },
            )
        };

        assert_eq!(a.await.unwrap().unwrap(), "a");
        assert_eq!(b.await.unwrap().unwrap(), "b");
    }
}
