// ── Write debouncer ──
//
// Coalesces bursts of writes to the same facet. Scheduling a write for a
// key aborts the one still waiting for that key, so only the last value
// inside the window reaches the upstream.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::FacetKey;

struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Per-facet cancellable write timers.
#[derive(Default)]
pub struct WriteDebouncer {
    pending: Arc<DashMap<FacetKey, PendingWrite>>,
    generation: AtomicU64,
}

impl WriteDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `write` to run after `delay`, replacing any write still
    /// pending for `key`.
    pub fn debounce<F>(&self, key: FacetKey, delay: Duration, write: F)
    where
        F: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(key = %task_key, "sending debounced write");
            if let Err(e) = write.await {
                warn!(key = %task_key, error = %e, "debounced write failed");
            }
            pending.remove_if(&task_key, |_, p| p.generation == generation);
        });

        if let Some(previous) = self.pending.insert(key, PendingWrite { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Number of writes still waiting to be sent.
    pub fn pending(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| !p.value().handle.is_finished())
            .count()
    }

    /// Drop the pending write for one facet, if any.
    pub fn cancel(&self, key: &FacetKey) {
        if let Some((_, p)) = self.pending.remove(key) {
            p.handle.abort();
        }
    }

    /// Abort every pending write.
    pub fn cancel_all(&self) {
        let keys: Vec<FacetKey> = self.pending.iter().map(|p| p.key().clone()).collect();
        for key in &keys {
            self.cancel(key);
        }
        if !keys.is_empty() {
            debug!(count = keys.len(), "cancelled pending writes");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{FacetKind, Side};
    use std::sync::Mutex;

    fn key() -> FacetKey {
        FacetKey::new("B1", FacetKind::SleepNumber, Some(Side::Left))
    }

    fn record(
        sent: &Arc<Mutex<Vec<u8>>>,
        value: u8,
    ) -> impl Future<Output = Result<(), CoreError>> + Send + use<> {
        let sent = Arc::clone(sent);
        async move {
            sent.lock().unwrap().push(value);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_sends_only_last_value() {
        let debouncer = WriteDebouncer::new();
        let sent = Arc::new(Mutex::new(Vec::new()));

        debouncer.debounce(key(), Duration::from_secs(2), record(&sent, 40));
        tokio::time::sleep(Duration::from_millis(500)).await;
        debouncer.debounce(key(), Duration::from_secs(2), record(&sent, 45));
        assert_eq!(debouncer.pending(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(*sent.lock().unwrap(), vec![45]);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_keys_do_not_interfere() {
        let debouncer = WriteDebouncer::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let other = FacetKey::new("B1", FacetKind::SleepNumber, Some(Side::Right));

        debouncer.debounce(key(), Duration::from_secs(1), record(&sent, 30));
        debouncer.debounce(other, Duration::from_secs(1), record(&sent, 60));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let mut values = sent.lock().unwrap().clone();
        values.sort_unstable();
        assert_eq!(values, vec![30, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_drops_pending_writes() {
        let debouncer = WriteDebouncer::new();
        let sent = Arc::new(Mutex::new(Vec::new()));

        debouncer.debounce(key(), Duration::from_secs(2), record(&sent, 50));
        debouncer.cancel_all();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(debouncer.pending(), 0);
    }
}
