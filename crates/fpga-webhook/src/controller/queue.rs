//! A deduplicating, rate limited work queue.
//!
//! Follows the client-go workqueue contract: an item waiting in the queue is
//! stored once no matter how often it is added, an item is never handed to
//! two workers at once, and an item added while being processed is handed
//! out again after [`WorkQueue::done`].

use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use flume::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-item exponential backoff: `base * 2^failures`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(1000))
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 1_u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

#[derive(Debug)]
struct QueueState<T> {
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shut_down: bool,
}

impl<T> Default for QueueState<T> {
    fn default() -> Self {
        Self {
            dirty: HashSet::new(),
            processing: HashSet::new(),
            failures: HashMap::new(),
            shut_down: false,
        }
    }
}

pub struct WorkQueue<T> {
    tx: flume::Sender<T>,
    rx: flume::Receiver<T>,
    state: Mutex<QueueState<T>>,
    backoff: BackoffPolicy,
    shutdown: CancellationToken,
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + std::fmt::Debug + 'static,
{
    /// `capacity` bounds the number of distinct items waiting at once; adds
    /// beyond it wait for workers to catch up.
    pub fn new(capacity: usize, backoff: BackoffPolicy) -> Self {
        let (tx, rx) = flume::bounded(capacity.max(1));
        Self {
            tx,
            rx,
            state: Mutex::new(QueueState::default()),
            backoff,
            shutdown: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `item` as needing processing.
    pub async fn add(&self, item: T) {
        {
            let mut state = self.lock();
            if state.shut_down || !state.dirty.insert(item.clone()) {
                return;
            }
            if state.processing.contains(&item) {
                return;
            }
        }

        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = self.tx.send_async(item) => {}
        }
    }

    /// Adds `item` once its backoff delay has passed and records the failure.
    pub fn add_rate_limited(self: &Arc<Self>, item: T) {
        let delay = {
            let mut state = self.lock();
            if state.shut_down {
                return;
            }
            let failures = state.failures.entry(item.clone()).or_default();
            let delay = self.backoff.delay(*failures);
            *failures = failures.saturating_add(1);
            delay
        };

        debug!(?item, ?delay, "requeueing with backoff");
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = queue.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => queue.add(item).await,
            }
        });
    }

    /// Waits for the next item. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<T> {
        loop {
            let item = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                item = self.rx.recv_async() => item.ok()?,
            };

            let mut state = self.lock();
            if state.shut_down {
                return None;
            }
            if state.dirty.remove(&item) {
                state.processing.insert(item.clone());
                return Some(item);
            }
        }
    }

    /// Ends processing of `item`, handing it out again if it was added
    /// in the meantime.
    pub fn done(&self, item: &T) {
        {
            let mut state = self.lock();
            state.processing.remove(item);
            if state.shut_down || !state.dirty.contains(item) {
                return;
            }
        }

        match self.tx.try_send(item.clone()) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(item)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send_async(item).await;
                });
            }
        }
    }

    /// Clears the failure count of `item`.
    pub fn forget(&self, item: &T) {
        self.lock().failures.remove(item);
    }

    pub fn num_requeues(&self, item: &T) -> u32 {
        self.lock().failures.get(item).copied().unwrap_or_default()
    }

    /// Number of items waiting to be handed out.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.dirty.difference(&state.processing).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the queue: waiting items are dropped, blocked `get` calls
    /// return `None` and further adds are ignored.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock();
            state.shut_down = true;
            state.dirty.clear();
        }
        self.shutdown.cancel();
        self.rx.drain().for_each(drop);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
