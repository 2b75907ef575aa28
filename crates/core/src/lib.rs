//! Core types and shared functionality for crawliq.
//!
//! This crate provides:
//! - URL normalization and audit identity
//! - The audit report document
//! - Audit cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod report;
pub mod url;

pub use cache::{CacheDb, CacheEntry, Validators};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use key::{AnalysisProfile, AuditKey};
pub use report::{
    AuditReport, Category, Excerpt, Finding, HreflangAlternate, LighthouseScores, PageAttributes, PageImage, PageLink,
    PerformanceMetrics, Scores, Severity,
};
