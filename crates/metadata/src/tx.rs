//! Unit-of-work support.
//!
//! A store handle is either bound to the pool or to one open transaction. The
//! state is fixed when the handle is created, so passing a transactional handle
//! into another unit of work can never open a second transaction.

use crate::error::{MetadataError, MetadataResult};
use async_trait::async_trait;
use gallery_core::Context;
use std::future::Future;

/// Whether a handle executes against the pool or inside an open transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Standalone,
    InTransaction,
}

/// Transaction primitives a store handle provides.
///
/// Most callers want [`within_tran`] rather than these methods directly.
#[async_trait]
pub trait Transactor: Clone + Send + Sync + 'static {
    /// The state this handle was created with.
    fn tx_state(&self) -> TxState;

    /// Begin a transaction and return a handle bound to it.
    ///
    /// Fails with [`MetadataError::NestedTransaction`] on a handle that is
    /// already inside a transaction.
    async fn begin(&self, ctx: &Context) -> MetadataResult<Self>;

    /// Commit the transaction this handle is bound to.
    async fn commit(&self) -> MetadataResult<()>;

    /// Roll back the transaction this handle is bound to.
    async fn rollback(&self) -> MetadataResult<()>;
}

/// Run `work` atomically.
///
/// On a handle that is already inside a transaction, `work` runs directly on
/// that handle. Otherwise a transaction is opened, `work` receives a handle
/// bound to it, and the transaction is committed if `work` succeeds and rolled
/// back if it fails or the context is interrupted. The error from `work` is
/// returned unchanged; a failed rollback is logged, not substituted.
///
/// `work` must only use the handle it is given. The open transaction holds the
/// store's connection, so a call through any standalone handle inside `work`
/// waits for the busy timeout and then fails with [`MetadataError::Conflict`].
pub async fn within_tran<S, F, Fut, T, E>(store: &S, ctx: &Context, work: F) -> Result<T, E>
where
    S: Transactor,
    F: FnOnce(S) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<MetadataError>,
{
    match store.tx_state() {
        TxState::InTransaction => {
            tracing::debug!("already inside a transaction, running work on current handle");
            return work(store.clone()).await;
        }
        TxState::Standalone => {}
    }

    let tx = store.begin(ctx).await?;
    tracing::debug!("transaction started");

    let outcome = match ctx.guard(work(tx.clone())).await {
        Ok(result) => result,
        Err(interrupted) => Err(MetadataError::from(interrupted).into()),
    };

    let outcome = match (outcome, ctx.check()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(interrupted)) => Err(MetadataError::from(interrupted).into()),
        (Err(e), _) => Err(e),
    };

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            tracing::debug!("transaction committed");
            Ok(value)
        }
        Err(e) => {
            if let Err(rb_err) = tx.rollback().await {
                tracing::error!(error = %rb_err, "transaction rollback failed");
            } else {
                tracing::debug!("transaction rolled back");
            }
            Err(e)
        }
    }
}
