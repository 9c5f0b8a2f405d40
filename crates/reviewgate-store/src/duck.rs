//! DuckDB storage for the `reviews` relation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use duckdb::types::Value;
use duckdb::{Connection, params, params_from_iter};
use reviewgate_core::{NewReview, Review, ReviewId, ReviewStatus};
use tracing::{debug, info};

use crate::{ReviewStore, StoreError};

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS reviews_id_seq START 1;
CREATE TABLE IF NOT EXISTS reviews (
    id              BIGINT PRIMARY KEY DEFAULT nextval('reviews_id_seq'),
    business_id     VARCHAR NOT NULL,
    reviewer_name   VARCHAR NOT NULL,
    phone           VARCHAR NOT NULL,
    email           VARCHAR,
    content         VARCHAR NOT NULL,
    status          VARCHAR NOT NULL,
    sentiment_score DOUBLE  NOT NULL,
    is_positive     BOOLEAN NOT NULL,
    pinned          BOOLEAN NOT NULL DEFAULT false,
    created_at      TIMESTAMP NOT NULL
);";

const SELECT_COLUMNS: &str = "id, business_id, reviewer_name, phone, email, content, status, \
     sentiment_score, is_positive, pinned, epoch_us(created_at)";

/// DuckDB-backed [`ReviewStore`].
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// The schema is created on open if missing, so reopening an existing file
/// keeps its reviews.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened review database");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of rows in the `reviews` table.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT count(*)::BIGINT FROM reviews", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Fetch a review by id regardless of status.
    pub fn get(&self, id: ReviewId) -> Result<Review, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM reviews WHERE id = ?");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], read_row)?;
        match rows.next() {
            Some(raw) => raw?.into_review(),
            None => Err(StoreError::NoResults),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl ReviewStore for DuckStore {
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        // Stored at microsecond precision.
        let created_at = Utc::now().trunc_subsecs(6);
        let conn = self.lock()?;
        let id: ReviewId = conn.query_row(
            "INSERT INTO reviews (
                business_id, reviewer_name, phone, email, content,
                status, sentiment_score, is_positive, pinned, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, false, make_timestamp(?::BIGINT))
            RETURNING id",
            params![
                review.business_id,
                review.reviewer_name,
                review.phone,
                review.email,
                review.content,
                review.status.as_str(),
                review.sentiment_score,
                review.is_positive(),
                created_at.timestamp_micros(),
            ],
            |row| row.get(0),
        )?;
        debug!(review_id = id, business_id = %review.business_id, "inserted review");
        Ok(Review::from_new(id, created_at, review))
    }

    async fn approved_for_business(&self, business_id: &str) -> Result<Vec<Review>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM reviews
             WHERE business_id = ? AND status = 'approved'
             ORDER BY pinned DESC, created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
            .query_map([business_id], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawRow::into_review).collect()
    }

    async fn unpin_all(&self, business_id: &str) -> Result<u64, StoreError> {
        unpin_rows(&self.lock()?, business_id)
    }

    async fn pin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        pin_rows(&self.lock()?, business_id, ids)
    }

    async fn repin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        unpin_rows(&tx, business_id)?;
        let pinned = pin_rows(&tx, business_id, ids)?;
        tx.commit()?;
        debug!(business_id, pinned, "repinned");
        Ok(pinned)
    }

    async fn approved_business_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT business_id FROM reviews WHERE status = 'approved' ORDER BY business_id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

fn unpin_rows(conn: &Connection, business_id: &str) -> Result<u64, StoreError> {
    let n = conn.execute(
        "UPDATE reviews SET pinned = false WHERE business_id = ?",
        [business_id],
    )?;
    Ok(n as u64)
}

fn pin_rows(conn: &Connection, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE reviews SET pinned = true WHERE business_id = ? AND id IN ({placeholders})"
    );
    let values = std::iter::once(Value::Text(business_id.to_string()))
        .chain(ids.iter().map(|&id| Value::BigInt(id)));
    let n = conn.execute(&sql, params_from_iter(values))?;
    Ok(n as u64)
}

// ── Row mapping ──

struct RawRow {
    id: ReviewId,
    business_id: String,
    reviewer_name: String,
    phone: String,
    email: Option<String>,
    content: String,
    status: String,
    sentiment_score: f64,
    is_positive: bool,
    pinned: bool,
    created_at_us: i64,
}

fn read_row(row: &duckdb::Row<'_>) -> duckdb::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        business_id: row.get(1)?,
        reviewer_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        content: row.get(5)?,
        status: row.get(6)?,
        sentiment_score: row.get(7)?,
        is_positive: row.get(8)?,
        pinned: row.get(9)?,
        created_at_us: row.get(10)?,
    })
}

impl RawRow {
    fn into_review(self) -> Result<Review, StoreError> {
        let status: ReviewStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("review {}: {e}", self.id)))?;
        let created_at = DateTime::<Utc>::from_timestamp_micros(self.created_at_us)
            .ok_or_else(|| StoreError::Corrupt(format!("review {}: bad created_at", self.id)))?;
        Ok(Review {
            id: self.id,
            business_id: self.business_id,
            reviewer_name: self.reviewer_name,
            phone: self.phone,
            email: self.email,
            content: self.content,
            status,
            sentiment_score: self.sentiment_score,
            is_positive: self.is_positive,
            pinned: self.pinned,
            created_at,
        })
    }
}
