//! Audit cache entries: one row per audit hash with two independent expiries.
//!
//! The page artifact (findings, content scores, suggestions) and the metrics
//! artifact (external performance document) expire separately. Invalidation
//! never deletes a row; it pushes the page expiry into the past so the old
//! report can still be served while a refresh runs.

use super::connection::CacheDb;
use crate::Error;
use crate::report::AuditReport;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Conditional-fetch validators remembered from the last full fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// SHA-256 of the last fetched body.
    pub content_hash: Option<String>,
}

/// A cached audit report and its freshness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub audit_hash: String,
    pub url: String,
    pub normalized_url: String,
    pub report: AuditReport,
    pub status_code: u16,
    pub validators: Validators,
    pub page_expires_at: DateTime<Utc>,
    pub metrics_expires_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn page_fresh(&self, now: DateTime<Utc>) -> bool {
        self.page_expires_at > now
    }

    pub fn metrics_fresh(&self, now: DateTime<Utc>) -> bool {
        self.metrics_expires_at > now
    }

    /// Fully fresh: page artifact unexpired and, when the metrics provider is
    /// enabled, metrics artifact unexpired too.
    pub fn is_fully_fresh(&self, now: DateTime<Utc>, metrics_enabled: bool) -> bool {
        self.page_fresh(now) && (!metrics_enabled || self.metrics_fresh(now))
    }
}

/// Column values as stored; converted into a `CacheEntry` outside the
/// connection thread so JSON and timestamp errors map onto `Error`.
struct StoredRow {
    audit_hash: String,
    url: String,
    url_norm: String,
    report_json: String,
    status_code: i64,
    etag: Option<String>,
    last_modified: Option<String>,
    content_hash: Option<String>,
    page_expires_at: String,
    metrics_expires_at: String,
    refreshed_at: String,
}

impl TryFrom<StoredRow> for CacheEntry {
    type Error = Error;

    fn try_from(row: StoredRow) -> Result<Self, Error> {
        let report: AuditReport = serde_json::from_str(&row.report_json)
            .map_err(|e| Error::CacheMiss(format!("{}: unreadable report: {e}", row.audit_hash)))?;
        Ok(CacheEntry {
            status_code: u16::try_from(row.status_code).unwrap_or_default(),
            page_expires_at: parse_ts(&row.page_expires_at)?,
            metrics_expires_at: parse_ts(&row.metrics_expires_at)?,
            refreshed_at: parse_ts(&row.refreshed_at)?,
            audit_hash: row.audit_hash,
            url: row.url,
            normalized_url: row.url_norm,
            report,
            validators: Validators {
                etag: row.etag,
                last_modified: row.last_modified,
                content_hash: row.content_hash,
            },
        })
    }
}

/// Fixed-width RFC 3339 so text ordering in SQL matches time ordering.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::CacheMiss(format!("invalid timestamp {value:?}: {e}")))
}

impl CacheDb {
    /// Get the entry for an audit hash, or None when absent.
    pub async fn get_entry(&self, audit_hash: &str) -> Result<Option<CacheEntry>, Error> {
        let audit_hash = audit_hash.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT audit_hash, url, url_norm, report_json, status_code,
                        etag, last_modified, content_hash,
                        page_expires_at, metrics_expires_at, refreshed_at
                    FROM audits WHERE audit_hash = ?1",
                )?;

                let result = stmt.query_row(params![audit_hash], |row| {
                    Ok(StoredRow {
                        audit_hash: row.get(0)?,
                        url: row.get(1)?,
                        url_norm: row.get(2)?,
                        report_json: row.get(3)?,
                        status_code: row.get(4)?,
                        etag: row.get(5)?,
                        last_modified: row.get(6)?,
                        content_hash: row.get(7)?,
                        page_expires_at: row.get(8)?,
                        metrics_expires_at: row.get(9)?,
                        refreshed_at: row.get(10)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(CacheEntry::try_from).transpose()
    }

    /// Insert or update the entry for its audit hash.
    ///
    /// Every column is replaced except the validators, which merge field by
    /// field: a new non-null value wins, a null keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `Error::CacheWrite` if the report cannot be serialized or the
    /// write fails.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let report_json =
            serde_json::to_string(&entry.report).map_err(|e| Error::CacheWrite(format!("serialize report: {e}")))?;
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO audits (
                        audit_hash, url, url_norm, report_json, status_code,
                        etag, last_modified, content_hash,
                        page_expires_at, metrics_expires_at, refreshed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(audit_hash) DO UPDATE SET
                        url = excluded.url,
                        url_norm = excluded.url_norm,
                        report_json = excluded.report_json,
                        status_code = excluded.status_code,
                        etag = COALESCE(excluded.etag, audits.etag),
                        last_modified = COALESCE(excluded.last_modified, audits.last_modified),
                        content_hash = COALESCE(excluded.content_hash, audits.content_hash),
                        page_expires_at = excluded.page_expires_at,
                        metrics_expires_at = excluded.metrics_expires_at,
                        refreshed_at = excluded.refreshed_at",
                    params![
                        &entry.audit_hash,
                        &entry.url,
                        &entry.normalized_url,
                        &report_json,
                        entry.status_code as i64,
                        &entry.validators.etag,
                        &entry.validators.last_modified,
                        &entry.validators.content_hash,
                        format_ts(&entry.page_expires_at),
                        format_ts(&entry.metrics_expires_at),
                        format_ts(&entry.refreshed_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::CacheWrite(Error::from(e).to_string()))
    }

    /// Move the page expiry without recomputing anything.
    ///
    /// Returns false when no row exists for the hash.
    pub async fn extend_page_expiry(&self, audit_hash: &str, expires_at: DateTime<Utc>) -> Result<bool, Error> {
        let audit_hash = audit_hash.to_string();
        let expires_at = format_ts(&expires_at);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed = conn.execute(
                    "UPDATE audits SET page_expires_at = ?2 WHERE audit_hash = ?1",
                    params![audit_hash, expires_at],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(|e| Error::CacheWrite(Error::from(e).to_string()))
    }

    /// Mark the page artifact stale by moving its expiry one second into the past.
    ///
    /// The row and its report are kept so they can still be served while a
    /// refresh runs. Returns false when no row exists for the hash.
    pub async fn expire_now(&self, audit_hash: &str) -> Result<bool, Error> {
        let past = Utc::now() - chrono::Duration::seconds(1);
        self.extend_page_expiry(audit_hash, past).await
    }

    /// Delete entries whose normalized URL contains the domain.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM audits WHERE url_norm LIKE ?1", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Keep the `max_entries` most recently refreshed entries, delete the rest.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_oldest_entries(&self, max_entries: usize) -> Result<u64, Error> {
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM audits", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM audits WHERE audit_hash IN (
                        SELECT audit_hash FROM audits ORDER BY refreshed_at ASC LIMIT ?1
                    )",
                    params![count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
