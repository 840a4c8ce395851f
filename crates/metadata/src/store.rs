//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::models::ImageRow;
use crate::repos::ImageRepo;
use crate::tx::{Transactor, TxState};
use async_trait::async_trait;
use gallery_core::Context;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult, SqliteRow,
};
use sqlx::{FromRow, Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ImageRepo {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// A transaction shared by every copy of one transactional handle.
/// `None` once the transaction has been committed or rolled back.
type SharedTx = Arc<Mutex<Option<Transaction<'static, Sqlite>>>>;

#[derive(Clone)]
enum Handle {
    Standalone,
    InTransaction(SharedTx),
}

/// SQLite-based metadata store.
///
/// Cloning is cheap. A clone made from a transactional handle joins the same
/// transaction.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    handle: Handle,
    query_timeout: Option<Duration>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("tx_state", &self.tx_state())
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
        busy_timeout: Duration,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            // SQLite allows one writer at a time; a single connection serializes
            // transactions instead of failing them with "database is locked".
            .max_connections(1)
            // An open transaction holds that connection. Waiting for it is
            // bounded like waiting for a lock held by another process.
            .acquire_timeout(busy_timeout)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            handle: Handle::Standalone,
            query_timeout: query_timeout_secs.map(Duration::from_secs),
        };
        store.migrate().await?;

        tracing::info!(path = %path.display(), "Opened SQLite metadata store");
        if let Some(timeout) = store.query_timeout {
            tracing::warn!(
                query_timeout_secs = timeout.as_secs(),
                "SQLite query timeout is enforced by abandoning the query future; \
                 the statement itself cannot be interrupted inside SQLite."
            );
        }

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Narrow the caller's context by the configured query timeout.
    fn scoped(&self, ctx: &Context) -> Context {
        match self.query_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    /// Run a write statement.
    ///
    /// On a standalone handle the statement gets its own transaction, so an
    /// interrupted write is rolled back instead of autocommitting once SQLite
    /// finishes it. The commit itself is not interruptible.
    async fn execute<'q>(
        &self,
        ctx: &Context,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> MetadataResult<SqliteQueryResult> {
        let ctx = self.scoped(ctx);
        match &self.handle {
            Handle::Standalone => {
                // Dropping `tx` on any early return queues its rollback.
                let (tx, result) = ctx
                    .run(async move {
                        let mut tx = self.pool.begin().await?;
                        let result = query.execute(&mut *tx).await?;
                        Ok::<_, MetadataError>((tx, result))
                    })
                    .await?;
                ctx.check()?;
                tx.commit().await?;
                Ok(result)
            }
            Handle::InTransaction(tx) => {
                ctx.run(async move {
                    let mut guard = tx.lock().await;
                    let conn = guard.as_mut().ok_or(MetadataError::TransactionClosed)?;
                    Ok::<_, MetadataError>(query.execute(&mut **conn).await?)
                })
                .await
            }
        }
    }

    async fn fetch_optional<'q, O>(
        &self,
        ctx: &Context,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> MetadataResult<Option<O>>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        self.scoped(ctx)
            .run(async move {
                let row = match &self.handle {
                    Handle::Standalone => query.fetch_optional(&self.pool).await?,
                    Handle::InTransaction(tx) => {
                        let mut guard = tx.lock().await;
                        let conn = guard.as_mut().ok_or(MetadataError::TransactionClosed)?;
                        query.fetch_optional(&mut **conn).await?
                    }
                };
                Ok::<_, MetadataError>(row)
            })
            .await
    }

    async fn fetch_all<'q, O>(
        &self,
        ctx: &Context,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> MetadataResult<Vec<O>>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        self.scoped(ctx)
            .run(async move {
                let rows = match &self.handle {
                    Handle::Standalone => query.fetch_all(&self.pool).await?,
                    Handle::InTransaction(tx) => {
                        let mut guard = tx.lock().await;
                        let conn = guard.as_mut().ok_or(MetadataError::TransactionClosed)?;
                        query.fetch_all(&mut **conn).await?
                    }
                };
                Ok::<_, MetadataError>(rows)
            })
            .await
    }

    /// Take the transaction out of a transactional handle, leaving it closed.
    async fn take_tx(&self) -> MetadataResult<Transaction<'static, Sqlite>> {
        let Handle::InTransaction(tx) = &self.handle else {
            return Err(MetadataError::NotInTransaction);
        };
        tx.lock()
            .await
            .take()
            .ok_or(MetadataError::TransactionClosed)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Transactor for SqliteStore {
    fn tx_state(&self) -> TxState {
        match self.handle {
            Handle::Standalone => TxState::Standalone,
            Handle::InTransaction(_) => TxState::InTransaction,
        }
    }

    async fn begin(&self, ctx: &Context) -> MetadataResult<Self> {
        if let Handle::InTransaction(_) = self.handle {
            return Err(MetadataError::NestedTransaction);
        }

        let tx = ctx
            .run(async { Ok::<_, MetadataError>(self.pool.begin().await?) })
            .await?;

        Ok(Self {
            pool: self.pool.clone(),
            handle: Handle::InTransaction(Arc::new(Mutex::new(Some(tx)))),
            query_timeout: self.query_timeout,
        })
    }

    async fn commit(&self) -> MetadataResult<()> {
        self.take_tx().await?.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> MetadataResult<()> {
        self.take_tx().await?.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl ImageRepo for SqliteStore {
    async fn create_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()> {
        let query = sqlx::query(
            "INSERT INTO images (image_id, image_url, user_id, date_uploaded) VALUES (?, ?, ?, ?)",
        )
        .bind(image.image_id)
        .bind(&image.image_url)
        .bind(&image.user_id)
        .bind(image.date_uploaded);

        match self.execute(ctx, query).await {
            Ok(_) => Ok(()),
            Err(MetadataError::AlreadyExists(_)) => Err(MetadataError::AlreadyExists(format!(
                "image_id {} already exists",
                image.image_id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn update_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()> {
        let query = sqlx::query(
            "UPDATE images SET image_url = ?, user_id = ?, date_uploaded = ? WHERE image_id = ?",
        )
        .bind(&image.image_url)
        .bind(&image.user_id)
        .bind(image.date_uploaded)
        .bind(image.image_id);

        let result = self.execute(ctx, query).await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!(
                "image_id {} not found",
                image.image_id
            )));
        }
        Ok(())
    }

    async fn delete_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<()> {
        let query = sqlx::query("DELETE FROM images WHERE image_id = ?").bind(image_id);

        let result = self.execute(ctx, query).await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!(
                "image_id {} not found",
                image_id
            )));
        }
        Ok(())
    }

    async fn list_images(
        &self,
        ctx: &Context,
        page: u32,
        page_size: u32,
    ) -> MetadataResult<Vec<ImageRow>> {
        if page < 1 || page_size < 1 {
            return Err(MetadataError::InvalidArgument(format!(
                "page and page_size must be at least 1 (got page={page}, page_size={page_size})"
            )));
        }
        let offset = i64::from(page - 1)
            .checked_mul(i64::from(page_size))
            .ok_or_else(|| {
                MetadataError::InvalidArgument(format!(
                    "page {page} of size {page_size} is out of range"
                ))
            })?;

        let query = sqlx::query_as::<_, ImageRow>(
            "SELECT * FROM images ORDER BY user_id, image_id LIMIT ? OFFSET ?",
        )
        .bind(i64::from(page_size))
        .bind(offset);

        self.fetch_all(ctx, query).await
    }

    async fn get_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<ImageRow> {
        let query =
            sqlx::query_as::<_, ImageRow>("SELECT * FROM images WHERE image_id = ?").bind(image_id);

        self.fetch_optional(ctx, query)
            .await?
            .ok_or_else(|| MetadataError::NotFound(format!("image_id {} not found", image_id)))
    }

    async fn list_images_by_owner(
        &self,
        ctx: &Context,
        user_id: &str,
    ) -> MetadataResult<Vec<ImageRow>> {
        let query = sqlx::query_as::<_, ImageRow>(
            "SELECT * FROM images WHERE user_id = ? ORDER BY date_uploaded, image_id",
        )
        .bind(user_id);

        self.fetch_all(ctx, query).await
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Images: one row per record, owner and last write time alongside
CREATE TABLE IF NOT EXISTS images (
    image_id BLOB PRIMARY KEY,
    image_url TEXT NOT NULL,
    user_id TEXT NOT NULL,
    date_uploaded TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_images_user ON images(user_id);
"#;
