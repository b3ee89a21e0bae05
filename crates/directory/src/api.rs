//! Write API used by the application layer.
//!
//! Every call runs on the blocking pool and reports plain `bool` / `Option`
//! results. Faults are logged here and never cross this boundary.

use crate::record::CallerRecord;
use crate::store::DirectoryStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Directory operations as seen by the application layer.
#[async_trait]
pub trait CallerDirectoryApi: Send + Sync {
    async fn upsert(
        &self,
        phone_number: &str,
        country_code: &str,
        name: &str,
        appointment: &str,
        city: &str,
        ios_row: &str,
    ) -> bool;

    async fn lookup(&self, phone_number: &str) -> Option<CallerRecord>;

    async fn remove(&self, phone_number: &str) -> bool;

    async fn list_all(&self) -> Vec<CallerRecord>;

    async fn list_keys(&self) -> Vec<String>;

    async fn clear(&self) -> bool;
}

pub struct CallerDirectory {
    store: Arc<DirectoryStore>,
    overlay_permission: Arc<AtomicBool>,
}

impl CallerDirectory {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        Self {
            store,
            overlay_permission: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Share the permission flag the call path is gated on.
    pub fn with_overlay_permission(mut self, flag: Arc<AtomicBool>) -> Self {
        self.overlay_permission = flag;
        self
    }

    pub fn store(&self) -> &Arc<DirectoryStore> {
        &self.store
    }

    pub fn has_overlay_permission(&self) -> bool {
        self.overlay_permission.load(Ordering::SeqCst)
    }

    pub async fn upsert_record(&self, record: CallerRecord) -> bool {
        let number = record.phone_number.clone();
        let ok = self
            .run("upsert", false, move |store| store.upsert(&record).map(|_| true))
            .await;
        if ok {
            tracing::debug!(number = %number, "caller stored");
        }
        ok
    }

    /// Store `record` under its number, dropping `original_number` in the
    /// same transaction. On failure the original record is kept.
    pub async fn update(&self, original_number: &str, record: CallerRecord) -> bool {
        let original = original_number.to_string();
        self.run("update", false, move |store| {
            store.rename(&original, &record).map(|_| true)
        })
        .await
    }

    async fn run<T, F>(&self, op: &'static str, fallback: T, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(&DirectoryStore) -> crate::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || f(&*store)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::error!(op, error = %e, "caller directory operation failed");
                fallback
            }
            Err(e) => {
                tracing::error!(op, error = %e, "caller directory task failed");
                fallback
            }
        }
    }
}

#[async_trait]
impl CallerDirectoryApi for CallerDirectory {
    async fn upsert(
        &self,
        phone_number: &str,
        country_code: &str,
        name: &str,
        appointment: &str,
        city: &str,
        ios_row: &str,
    ) -> bool {
        let record = CallerRecord {
            phone_number: phone_number.to_string(),
            country_code: country_code.to_string(),
            name: name.to_string(),
            appointment: appointment.to_string(),
            city: city.to_string(),
            ios_row: ios_row.to_string(),
        };
        self.upsert_record(record).await
    }

    async fn lookup(&self, phone_number: &str) -> Option<CallerRecord> {
        let number = phone_number.to_string();
        self.run("lookup", None, move |store| store.lookup(&number))
            .await
    }

    async fn remove(&self, phone_number: &str) -> bool {
        let number = phone_number.to_string();
        self.run("remove", false, move |store| store.remove(&number))
            .await
    }

    async fn list_all(&self) -> Vec<CallerRecord> {
        self.run("list_all", Vec::new(), |store| store.list_all())
            .await
    }

    async fn list_keys(&self) -> Vec<String> {
        self.run("list_keys", Vec::new(), |store| store.list_keys())
            .await
    }

    async fn clear(&self) -> bool {
        self.run("clear", false, |store| store.clear().map(|_| true))
            .await
    }
}
