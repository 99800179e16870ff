//! Round-robin selection over read replicas with fail-over.
//!
//! The router owns its cursor; there is no process-wide rotation state.
//! Rotation is best effort and only serves read-only queries. Anything that
//! decides admission goes through the primary.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::CoreError;

#[derive(Debug)]
pub struct ReplicaRouter<T> {
    replicas: Vec<T>,
    cursor: AtomicUsize,
}

impl<T: Clone> ReplicaRouter<T> {
    /// Build a router over at least one replica.
    pub fn new(replicas: Vec<T>) -> Result<Self, CoreError> {
        if replicas.is_empty() {
            return Err(CoreError::Validation(
                "ReplicaRouter requires at least one replica".to_string(),
            ));
        }
        Ok(Self {
            replicas,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Advance the cursor and return the index it pointed at.
    fn advance(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.replicas.len()
    }

    /// The next replica in rotation.
    pub fn next(&self) -> T {
        self.replicas[self.advance()].clone()
    }

    /// Run `op` against the next replica, falling through to the following
    /// ones while `failover` says the error is a replica-level failure.
    ///
    /// Tries each replica at most once. The last error is returned when
    /// every replica failed, and non-failover errors are returned as soon as
    /// they occur.
    pub async fn with_failover<F, Fut, R, E, P>(&self, mut op: F, failover: P) -> Result<R, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        P: Fn(&E) -> bool,
    {
        let start = self.advance();
        let count = self.replicas.len();
        let mut tried = 0;
        loop {
            let index = (start + tried) % count;
            match op(self.replicas[index].clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tried += 1;
                    if !failover(&err) || tried >= count {
                        return Err(err);
                    }
                    tracing::warn!(replica = index, "Read replica failed, trying next");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn empty_router_is_rejected() {
        let result = ReplicaRouter::<&str>::new(Vec::new());
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn next_rotates_through_replicas() {
        let router = ReplicaRouter::new(vec!["a", "b", "c"]).unwrap();
        let picked: Vec<_> = (0..5).map(|_| router.next()).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b"]);
    }

    #[tokio::test]
    async fn failover_moves_to_next_replica() {
        let router = ReplicaRouter::new(vec!["down", "up"]).unwrap();
        let seen = Mutex::new(Vec::new());

        let result: Result<&str, &str> = router
            .with_failover(
                |replica| {
                    seen.lock().unwrap().push(replica);
                    async move {
                        if replica == "down" {
                            Err("connection refused")
                        } else {
                            Ok(replica)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok("up"));
        assert_eq!(*seen.lock().unwrap(), vec!["down", "up"]);
    }

    #[tokio::test]
    async fn failover_is_bounded_by_replica_count() {
        let router = ReplicaRouter::new(vec![1, 2, 3]).unwrap();
        let calls = Mutex::new(0);

        let result: Result<(), &str> = router
            .with_failover(
                |_| {
                    *calls.lock().unwrap() += 1;
                    async { Err("down") }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn query_errors_do_not_fail_over() {
        let router = ReplicaRouter::new(vec![1, 2]).unwrap();
        let calls = Mutex::new(0);

        let result: Result<(), &str> = router
            .with_failover(
                |_| {
                    *calls.lock().unwrap() += 1;
                    async { Err("syntax error") }
                },
                |e| *e == "connection refused",
            )
            .await;

        assert_eq!(result, Err("syntax error"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
