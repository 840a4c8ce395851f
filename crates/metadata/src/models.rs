//! Database models mapping to the metadata schema.

use gallery_core::{Image, ImageId};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One row of the `images` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ImageRow {
    pub image_id: Uuid,
    pub image_url: String,
    /// ID of the user who owns the image.
    pub user_id: String,
    pub date_uploaded: OffsetDateTime,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Image {
            id: ImageId::from(row.image_id),
            image_url: row.image_url,
            user_id: row.user_id,
            date_uploaded: row.date_uploaded,
        }
    }
}

impl From<&Image> for ImageRow {
    fn from(img: &Image) -> Self {
        ImageRow {
            image_id: *img.id.as_uuid(),
            image_url: img.image_url.clone(),
            user_id: img.user_id.clone(),
            date_uploaded: img.date_uploaded,
        }
    }
}
