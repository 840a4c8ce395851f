//! Common test utilities and fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use gallery_core::{Claims, Context, Role};
use gallery_metadata::{
    ImageRepo, ImageRow, MetadataResult, SqliteStore, Transactor, TxState,
};
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A SQLite store in a temporary directory that is removed on drop.
pub struct TestStore {
    pub store: SqliteStore,
    db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        init_tracing();
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&db_path, None, Duration::from_millis(500))
            .await
            .expect("Failed to open store");
        Self {
            store,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// Open a second connection to the same database, outside the store's pool.
    pub async fn connect(&self) -> SqliteConnection {
        SqliteConnection::connect(&format!("sqlite:{}", self.db_path.display()))
            .await
            .expect("Failed to open second connection")
    }

    pub async fn count_images(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(self.store.pool())
            .await
            .expect("count query failed")
    }
}

/// Store wrapper that counts storage calls and can stall updates.
#[derive(Clone, Debug)]
pub struct StubStore {
    inner: SqliteStore,
    calls: Arc<AtomicUsize>,
    update_delay: Option<Duration>,
}

impl StubStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
            update_delay: None,
        }
    }

    /// Make every update wait `delay` before writing.
    pub fn slow_updates(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transactor for StubStore {
    fn tx_state(&self) -> TxState {
        self.inner.tx_state()
    }

    async fn begin(&self, ctx: &Context) -> MetadataResult<Self> {
        let inner = self.inner.begin(ctx).await?;
        Ok(Self {
            inner,
            calls: self.calls.clone(),
            update_delay: self.update_delay,
        })
    }

    async fn commit(&self) -> MetadataResult<()> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> MetadataResult<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl ImageRepo for StubStore {
    async fn create_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()> {
        self.record();
        self.inner.create_image(ctx, image).await
    }

    async fn update_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()> {
        self.record();
        if let Some(delay) = self.update_delay {
            ctx.run(async {
                tokio::time::sleep(delay).await;
                Ok::<_, gallery_metadata::MetadataError>(())
            })
            .await?;
        }
        self.inner.update_image(ctx, image).await
    }

    async fn delete_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<()> {
        self.record();
        self.inner.delete_image(ctx, image_id).await
    }

    async fn list_images(
        &self,
        ctx: &Context,
        page: u32,
        page_size: u32,
    ) -> MetadataResult<Vec<ImageRow>> {
        self.record();
        self.inner.list_images(ctx, page, page_size).await
    }

    async fn get_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<ImageRow> {
        self.record();
        self.inner.get_image(ctx, image_id).await
    }

    async fn list_images_by_owner(
        &self,
        ctx: &Context,
        user_id: &str,
    ) -> MetadataResult<Vec<ImageRow>> {
        self.record();
        self.inner.list_images_by_owner(ctx, user_id).await
    }
}

/// A fixed, whole-second timestamp.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_546_300_800).expect("valid timestamp")
}

/// A later whole-second timestamp.
pub fn later() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_546_304_461).expect("valid timestamp")
}

pub fn admin(subject: &str) -> Claims {
    Claims::new(subject, [Role::Admin])
}

pub fn user(subject: &str) -> Claims {
    Claims::new(subject, [Role::User])
}
