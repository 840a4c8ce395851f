//! Transactional metadata store for gallery images.
//!
//! This crate provides the storage side of the image core:
//! - Image rows and the repository trait over them
//! - Store handles that are either standalone or bound to one transaction
//! - The `within_tran` unit-of-work operator
//! - Error classification for the SQLite backend

pub mod error;
pub mod models;
pub mod repos;
pub mod store;
pub mod tx;

pub use error::{MetadataError, MetadataResult};
pub use models::ImageRow;
pub use repos::ImageRepo;
pub use store::{MetadataStore, SqliteStore};
pub use tx::{Transactor, TxState, within_tran};

use gallery_core::config::MetadataConfig;
use std::time::Duration;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<SqliteStore> {
    config.validate().map_err(MetadataError::Config)?;

    match config {
        MetadataConfig::Sqlite {
            path,
            query_timeout_secs,
            busy_timeout_ms,
        } => {
            SqliteStore::new(
                path,
                *query_timeout_secs,
                Duration::from_millis(*busy_timeout_ms),
            )
            .await
        }
    }
}
