use async_trait::async_trait;
use jiff::Timestamp;
use linkhop_core::store::{ClickCounts, ClickStore, Result, UrlStore};
use linkhop_core::{LinkId, NewLink, ShortCode, ShortLink, StorageError};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, warn};

/// MySQL implementation of the store contracts, backed by the `short_links`
/// table (see `ddl/mysql/short_links.sql`).
///
/// Timestamps are stored as unix epoch microseconds. Rows are never deleted;
/// reads return expired records and leave the expiry decision to the caller.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, micros: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(micros).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{micros}': {e}"))
    })
}

fn row_to_link(row: &MySqlRow) -> Result<ShortLink> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let expire_at: i64 = row.try_get("expire_at").map_err(map_sqlx_error)?;
    let is_custom: bool = row.try_get("is_custom").map_err(map_sqlx_error)?;
    let clicks: u64 = row.try_get("clicks").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ShortLink {
        id: LinkId(id),
        code: ShortCode::new_unchecked(code),
        original_url,
        expire_at: parse_timestamp("expire_at", expire_at)?,
        is_custom,
        clicks,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl UrlStore for MySqlStore {
    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM short_links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn insert(&self, link: NewLink) -> Result<ShortLink> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (short_code, original_url, expire_at, is_custom, clicks, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(link.code.as_str())
        .bind(link.original_url.as_str())
        .bind(link.expire_at.as_microsecond())
        .bind(link.is_custom)
        .bind(link.created_at.as_microsecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = i64::try_from(done.last_insert_id()).map_err(|e| {
                    StorageError::InvalidData(format!("insert id out of range: {e}"))
                })?;
                Ok(link.into_link(LinkId(id)))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::DuplicateKey(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT id, short_code, original_url, expire_at, is_custom, clicks, created_at
            FROM short_links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }
}

#[async_trait]
impl ClickStore for MySqlStore {
    async fn add_counts(&self, counts: &ClickCounts) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for (id, count) in counts {
            if *count == 0 {
                continue;
            }

            let result = sqlx::query(
                r#"
                UPDATE short_links
                SET clicks = clicks + ?
                WHERE id = ?
                "#,
            )
            .bind(*count)
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() == 0 {
                warn!(link_id = %id, "Click batch references an unknown link, rolling back");
                tx.rollback().await.map_err(map_sqlx_error)?;
                return Err(StorageError::InvalidData(format!("unknown link id {id}")));
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(links = counts.len(), "Applied click batch");
        Ok(())
    }
}
