//! The image core: the only entry point transport code calls.
//!
//! Every operation checks identifiers and payloads before touching storage,
//! then runs against whichever store handle the core holds. A core built by
//! [`ImageCore::within_tran`] holds a transactional handle, so everything it
//! does belongs to that unit of work.

use crate::error::{ImageError, ImageResult};
use gallery_core::config::{AppConfig, ServiceConfig};
use gallery_core::validate;
use gallery_core::{
    Capability, Claims, Context, Image, ImageId, NewImage, UpdateImage, authorize,
};
use gallery_metadata::{ImageRepo, ImageRow, SqliteStore, TxState};
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;

/// Image operations over a store handle.
#[derive(Clone, Debug)]
pub struct ImageCore<S = SqliteStore> {
    store: S,
    request_timeout: Option<Duration>,
}

impl ImageCore<SqliteStore> {
    /// Open the configured store and build a core over it.
    pub async fn open(config: &AppConfig) -> ImageResult<Self> {
        let store = gallery_metadata::from_config(&config.metadata)
            .await
            .map_err(|e| ImageError::from_store("open", e))?;
        Ok(Self::with_config(store, &config.service))
    }
}

impl<S: ImageRepo> ImageCore<S> {
    /// Build a core over `store` with no per-operation timeout.
    pub fn new(store: S) -> Self {
        Self {
            store,
            request_timeout: None,
        }
    }

    /// Build a core over `store`, bounding each operation by `config`'s request timeout.
    pub fn with_config(store: S, config: &ServiceConfig) -> Self {
        Self {
            store,
            request_timeout: config.request_timeout(),
        }
    }

    /// The store handle this core runs against.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether this core is bound to an open transaction.
    pub fn tx_state(&self) -> TxState {
        self.store.tx_state()
    }

    /// Run `work` as one unit of work.
    ///
    /// `work` receives a core bound to the transaction. If this core is already
    /// bound to one, `work` joins it instead of opening another.
    ///
    /// `work` must only use the core it is given. Calling a standalone core
    /// from inside `work` fails with [`ImageError::Conflict`] once the busy
    /// timeout runs out.
    pub async fn within_tran<F, Fut, T>(&self, ctx: &Context, work: F) -> ImageResult<T>
    where
        F: FnOnce(ImageCore<S>) -> Fut,
        Fut: Future<Output = ImageResult<T>>,
    {
        let ctx = self.scoped(ctx);
        let request_timeout = self.request_timeout;
        gallery_metadata::within_tran(&self.store, &ctx, |store| {
            work(ImageCore {
                store,
                request_timeout,
            })
        })
        .await
    }

    /// Add a new image. The identifier is generated and the timestamp is `now`.
    pub async fn create(
        &self,
        ctx: &Context,
        ni: NewImage,
        now: OffsetDateTime,
    ) -> ImageResult<Image> {
        validate::check_new(&ni)?;

        let image = Image {
            id: ImageId::new(),
            image_url: ni.image_url,
            user_id: ni.user_id,
            date_uploaded: now,
        };

        let ctx = self.scoped(ctx);
        self.store
            .create_image(&ctx, &ImageRow::from(&image))
            .await
            .map_err(|e| ImageError::from_store("create", e))?;

        tracing::info!(image_id = %image.id, owner = %image.user_id, "Created image");
        Ok(image)
    }

    /// Apply a partial update to an image.
    ///
    /// The read and the write are separate statements. Wrap the call in
    /// [`ImageCore::within_tran`] to make them atomic.
    pub async fn update(
        &self,
        ctx: &Context,
        id: &str,
        up: UpdateImage,
        now: OffsetDateTime,
    ) -> ImageResult<Image> {
        let id = check_id(id)?;
        validate::check_update(&up)?;

        let ctx = self.scoped(ctx);
        let image = self.fetch(&ctx, id).await?;
        self.write_update(&ctx, image, up, now).await
    }

    /// Remove an image.
    pub async fn delete(&self, ctx: &Context, id: &str) -> ImageResult<()> {
        let id = check_id(id)?;

        let ctx = self.scoped(ctx);
        self.remove(&ctx, id).await
    }

    /// Update on behalf of `claims`. Only the owner or an admin may proceed.
    ///
    /// A missing image is reported as `NotFound` before any authorization
    /// decision. A denied caller gets `Forbidden` and nothing is written.
    pub async fn update_as(
        &self,
        ctx: &Context,
        claims: &Claims,
        id: &str,
        up: UpdateImage,
        now: OffsetDateTime,
    ) -> ImageResult<Image> {
        let id = check_id(id)?;
        validate::check_update(&up)?;

        let ctx = self.scoped(ctx);
        let image = self.fetch(&ctx, id).await?;
        check_access(claims, &image, "update")?;
        self.write_update(&ctx, image, up, now).await
    }

    /// Delete on behalf of `claims`. Only the owner or an admin may proceed.
    pub async fn delete_as(&self, ctx: &Context, claims: &Claims, id: &str) -> ImageResult<()> {
        let id = check_id(id)?;

        let ctx = self.scoped(ctx);
        let image = self.fetch(&ctx, id).await?;
        check_access(claims, &image, "delete")?;
        self.remove(&ctx, id).await
    }

    /// One page of images, unfiltered. `page` is 1-indexed.
    pub async fn query(
        &self,
        ctx: &Context,
        page: u32,
        page_size: u32,
    ) -> ImageResult<Vec<Image>> {
        validate::check_page(page, page_size)?;

        let ctx = self.scoped(ctx);
        let rows = self
            .store
            .list_images(&ctx, page, page_size)
            .await
            .map_err(|e| ImageError::from_store("query", e))?;
        Ok(rows.into_iter().map(Image::from).collect())
    }

    pub async fn query_by_id(&self, ctx: &Context, id: &str) -> ImageResult<Image> {
        let id = check_id(id)?;

        let ctx = self.scoped(ctx);
        self.fetch(&ctx, id).await
    }

    /// Every image owned by `owner`.
    pub async fn query_by_owner(&self, ctx: &Context, owner: &str) -> ImageResult<Vec<Image>> {
        validate::check_owner(owner).map_err(|_| ImageError::InvalidId(owner.to_string()))?;

        let ctx = self.scoped(ctx);
        let rows = self
            .store
            .list_images_by_owner(&ctx, owner)
            .await
            .map_err(|e| ImageError::from_store("query_by_owner", e))?;
        Ok(rows.into_iter().map(Image::from).collect())
    }

    fn scoped(&self, ctx: &Context) -> Context {
        match self.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    async fn fetch(&self, ctx: &Context, id: ImageId) -> ImageResult<Image> {
        let row = self
            .store
            .get_image(ctx, *id.as_uuid())
            .await
            .map_err(|e| ImageError::from_store("query_by_id", e))?;
        Ok(row.into())
    }

    async fn write_update(
        &self,
        ctx: &Context,
        mut image: Image,
        up: UpdateImage,
        now: OffsetDateTime,
    ) -> ImageResult<Image> {
        image.apply(up, now);
        self.store
            .update_image(ctx, &ImageRow::from(&image))
            .await
            .map_err(|e| ImageError::from_store("update", e))?;

        tracing::info!(image_id = %image.id, owner = %image.user_id, "Updated image");
        Ok(image)
    }

    async fn remove(&self, ctx: &Context, id: ImageId) -> ImageResult<()> {
        self.store
            .delete_image(ctx, *id.as_uuid())
            .await
            .map_err(|e| ImageError::from_store("delete", e))?;

        tracing::info!(image_id = %id, "Deleted image");
        Ok(())
    }
}

fn check_id(id: &str) -> ImageResult<ImageId> {
    validate::check_id(id).map_err(|_| ImageError::InvalidId(id.to_string()))
}

fn check_access(claims: &Claims, image: &Image, action: &str) -> ImageResult<()> {
    authorize(claims, &image.user_id, Capability::OwnerOrAdmin).map_err(|denied| {
        tracing::warn!(
            subject = %claims.subject,
            image_id = %image.id,
            action,
            "Denied access to image"
        );
        ImageError::from(denied)
    })
}
