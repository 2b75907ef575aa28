//! SQLite-backed audit cache.
//!
//! One row per audit hash holds the serialized report, the conditional-fetch
//! validators and two independent expiries (page and metrics). Access is
//! async via tokio-rusqlite. The module provides:
//!
//! - Content fingerprints and audit hashes (SHA-256)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Expiry updates and purge strategies (domain, oldest)

pub mod audits;
pub mod connection;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use audits::{CacheEntry, Validators};
pub use connection::CacheDb;
