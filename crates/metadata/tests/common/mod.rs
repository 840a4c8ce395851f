//! Common test utilities and fixtures.

use gallery_metadata::{ImageRow, MetadataResult, SqliteStore};
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

/// A test store backed by a SQLite file that is removed on drop.
pub struct TestMetadata {
    pub store: SqliteStore,
    db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestMetadata {
    pub async fn new() -> MetadataResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&db_path, None, Duration::from_millis(500)).await?;

        Ok(Self {
            store,
            db_path,
            _temp_dir: temp_dir,
        })
    }

    pub fn store(&self) -> SqliteStore {
        self.store.clone()
    }

    /// Open a second connection to the same database, outside the store's pool.
    #[allow(dead_code)]
    pub async fn connect(&self) -> SqliteConnection {
        SqliteConnection::connect(&format!("sqlite:{}", self.db_path.display()))
            .await
            .expect("Failed to open second connection")
    }

    /// Count rows directly, bypassing the repository.
    #[allow(dead_code)]
    pub async fn count_images(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(self.store.pool())
            .await
            .expect("count query failed")
    }
}

/// Build an image row with a fresh ID and a whole-second timestamp.
pub fn image_row(url: &str, owner: &str) -> ImageRow {
    ImageRow {
        image_id: Uuid::new_v4(),
        image_url: url.to_string(),
        user_id: owner.to_string(),
        date_uploaded: OffsetDateTime::from_unix_timestamp(1_546_300_800).expect("valid timestamp"),
    }
}
