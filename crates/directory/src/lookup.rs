//! Bounded lookup for the call path.
//!
//! The call-state callback cannot suspend, so it sends the query to the
//! runtime's blocking pool and waits on a reply channel for at most
//! `timeout`. A late answer is simply dropped.

use crate::error::LookupError;
use crate::record::CallerRecord;
use crate::store::DirectoryStore;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Upper bound for a call-path lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct BlockingLookup {
    store: Arc<DirectoryStore>,
    runtime: Handle,
    timeout: Duration,
}

impl BlockingLookup {
    pub fn new(store: Arc<DirectoryStore>, runtime: Handle) -> Self {
        Self {
            store,
            runtime,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `number`, waiting no longer than the configured bound.
    #[tracing::instrument(level = "debug", skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub fn lookup(&self, number: &str) -> Result<Option<CallerRecord>, LookupError> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let store = Arc::clone(&self.store);
        let number = number.to_string();

        self.runtime.spawn_blocking(move || {
            // Receiver may already be gone after a timeout.
            let _ = reply_tx.send(store.lookup(&number));
        });

        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => Ok(result?),
            Err(RecvTimeoutError::Timeout) => Err(LookupError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(LookupError::WorkerGone),
        }
    }

    /// Like [`lookup`](Self::lookup), with every failure treated as a miss.
    pub fn lookup_or_none(&self, number: &str) -> Option<CallerRecord> {
        match self.lookup(number) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "caller lookup failed, treating as miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn store_with(records: &[CallerRecord]) -> Arc<DirectoryStore> {
        let store = DirectoryStore::open_in_memory().unwrap();
        for record in records {
            store.upsert(record).unwrap();
        }
        Arc::new(store)
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = store_with(&[CallerRecord::new("15551234567", "Alice")]);
        let lookup = BlockingLookup::new(store, runtime.handle().clone());

        let hit = lookup.lookup("+15551234567").unwrap();
        assert_eq!(hit.map(|r| r.name), Some("Alice".to_string()));
        assert!(lookup.lookup("999").unwrap().is_none());
    }

    #[test]
    fn test_lookup_is_bounded_while_store_busy() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = store_with(&[CallerRecord::new("15551234567", "Alice")]);
        let lookup = BlockingLookup::new(Arc::clone(&store), runtime.handle().clone())
            .with_timeout(Duration::from_millis(50));

        let (locked_tx, locked_rx) = mpsc::channel();
        let holder = std::thread::spawn(move || {
            store.with_connection(|_| {
                locked_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(600));
            });
        });
        locked_rx.recv().unwrap();

        let started = Instant::now();
        let result = lookup.lookup("15551234567");
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(LookupError::Timeout(_))));
        assert!(elapsed < Duration::from_millis(400), "waited {elapsed:?}");
        assert!(lookup.lookup_or_none("15551234567").is_none());

        holder.join().unwrap();
    }

    #[test]
    fn test_lookup_after_runtime_shutdown_is_a_miss() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = runtime.handle().clone();
        runtime.shutdown_background();

        let lookup = BlockingLookup::new(store_with(&[]), handle);
        assert!(lookup.lookup_or_none("15551234567").is_none());
    }
}
