//! Per-device ordered execution of persistence work.
//!
//! Each device token gets a lane: an mpsc-fed task that runs its jobs one
//! after another in submission order. Lanes for different tokens run
//! concurrently. A lane task exits once its queue is empty and is spawned
//! again on the next submission.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::{SendError, TryRecvError};
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;
type LaneMap = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Job>>>>;

/// Resolves once the submitted job has run.
pub type Persisted = oneshot::Receiver<()>;

#[derive(Clone, Default)]
pub struct DeviceLanes {
    lanes: LaneMap,
}

fn lock(lanes: &LaneMap) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<Job>>> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DeviceLanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` behind every job already submitted for `token`.
    pub fn submit<F>(&self, token: &str, work: F) -> Persisted
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let mut job: Job = Box::pin(async move {
            work.await;
            let _ = done_tx.send(());
        });

        // Sending under the lock pairs with the lane's final empty check.
        let mut lanes = lock(&self.lanes);
        if let Some(tx) = lanes.get(token) {
            match tx.send(job) {
                Ok(()) => return done_rx,
                // The lane task died; start a fresh one.
                Err(SendError(returned)) => job = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        lanes.insert(token.to_string(), tx);
        drop(lanes);

        tokio::spawn(run_lane(
            Arc::clone(&self.lanes),
            token.to_string(),
            job,
            rx,
        ));
        done_rx
    }

    /// Number of tokens with a running lane.
    pub fn active(&self) -> usize {
        lock(&self.lanes).len()
    }
}

async fn run_lane(lanes: LaneMap, token: String, first: Job, mut rx: mpsc::UnboundedReceiver<Job>) {
    first.await;
    loop {
        let job = match rx.try_recv() {
            Ok(job) => job,
            Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {
                let mut map = lock(&lanes);
                if let Ok(job) = rx.try_recv() {
                    drop(map);
                    job
                } else {
                    map.remove(&token);
                    return;
                }
            }
        };
        job.await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn jobs_for_one_token_run_in_order() {
        let lanes = DeviceLanes::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut done = Vec::new();
        for i in 0..50u64 {
            let seen = Arc::clone(&seen);
            done.push(lanes.submit("t1", async move {
                // Earlier jobs sleep longer; order must still hold.
                tokio::time::sleep(Duration::from_millis(50 - i)).await;
                seen.lock().unwrap().push(i);
            }));
        }
        for rx in done {
            rx.await.unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn tokens_do_not_block_each_other() {
        let lanes = DeviceLanes::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocked = lanes.submit("slow", async move {
            let _ = release_rx.await;
        });
        tokio::time::timeout(Duration::from_secs(1), lanes.submit("fast", async {}))
            .await
            .unwrap()
            .unwrap();

        release_tx.send(()).unwrap();
        blocked.await.unwrap();
    }

    #[tokio::test]
    async fn idle_lane_is_removed_and_restarted() {
        let lanes = DeviceLanes::new();
        lanes.submit("t1", async {}).await.unwrap();
        // The lane removes itself after its queue drains.
        for _ in 0..100 {
            if lanes.active() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(lanes.active(), 0);

        lanes.submit("t1", async {}).await.unwrap();
    }
}
