//! The caller-supplied source of fresh payloads

use fragcache_core::BoxError;
use futures::future::BoxFuture;
use std::future::Future;

/// Produces a fresh payload when nothing valid is cached
///
/// Implemented for any `Fn() -> impl Future<Output = Result<T, E>>` whose
/// error converts into [`BoxError`].
pub trait Producer<T>: Send + Sync {
    fn produce(&self) -> BoxFuture<'_, Result<T, BoxError>>;
}

impl<T, F, Fut, E> Producer<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn produce(&self) -> BoxFuture<'_, Result<T, BoxError>> {
        let fut = (self)();
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}
