//! Image repository.

use crate::error::MetadataResult;
use crate::models::ImageRow;
use crate::tx::Transactor;
use async_trait::async_trait;
use gallery_core::Context;
use uuid::Uuid;

/// Repository for image records.
///
/// Every call honours the cancellation signal and deadline carried by `ctx`.
#[async_trait]
pub trait ImageRepo: Transactor {
    /// Insert an image. Fails with `AlreadyExists` if the ID is taken.
    async fn create_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()>;

    /// Replace every column of an existing image. Fails with `NotFound` if no row matched.
    async fn update_image(&self, ctx: &Context, image: &ImageRow) -> MetadataResult<()>;

    /// Delete an image. Fails with `NotFound` if no row matched.
    async fn delete_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<()>;

    /// Page through images in a stable order. `page` is 1-indexed.
    async fn list_images(
        &self,
        ctx: &Context,
        page: u32,
        page_size: u32,
    ) -> MetadataResult<Vec<ImageRow>>;

    /// Get an image by ID. Fails with `NotFound` if absent.
    async fn get_image(&self, ctx: &Context, image_id: Uuid) -> MetadataResult<ImageRow>;

    /// List every image owned by `user_id`.
    async fn list_images_by_owner(
        &self,
        ctx: &Context,
        user_id: &str,
    ) -> MetadataResult<Vec<ImageRow>>;
}
