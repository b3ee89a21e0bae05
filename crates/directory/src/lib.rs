//! Caller directory for callmark.
//!
//! Maps phone numbers to caller metadata in a single SQLite table and
//! answers lookups from two kinds of callers:
//!
//! - the application layer, through the async [`CallerDirectory`] write API
//!   whose results are plain `bool` / `Option` values;
//! - the call path, through [`BlockingLookup`], which waits for the
//!   asynchronous query for a bounded time and otherwise reports a miss.
//!
//! # Example
//!
//! ```ignore
//! use callmark_directory::{BlockingLookup, CallerRecord, DirectoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(DirectoryStore::open_in_memory()?);
//! store.upsert(&CallerRecord::new("15551234567", "Alice"))?;
//!
//! let lookup = BlockingLookup::new(store, runtime.handle().clone());
//! assert!(lookup.lookup_or_none("+15551234567").is_some());
//! ```

mod api;
mod error;
mod lookup;
pub mod phone;
mod record;
mod store;

pub use api::{CallerDirectory, CallerDirectoryApi};
pub use error::{DirectoryError, LookupError, Result};
pub use lookup::{BlockingLookup, DEFAULT_LOOKUP_TIMEOUT};
pub use record::CallerRecord;
pub use store::{DirectoryStore, SCHEMA_VERSION};
