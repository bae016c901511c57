//! Upstream term source seam.

use async_trait::async_trait;

use crate::entities::RawTerm;
use crate::error::UpstreamError;

/// A paginated upstream provider of raw terms.
///
/// `fetch_page(offset)` returns the terms starting at `offset`. An empty page
/// with no error means the source is exhausted. Implementations own any retry
/// or backoff policy; callers treat every error as fatal for the current pass.
#[async_trait]
pub trait TermSource: Send + Sync + 'static {
    async fn fetch_page(&self, offset: usize) -> Result<Vec<RawTerm>, UpstreamError>;
}

#[async_trait]
impl<T: TermSource + ?Sized> TermSource for std::sync::Arc<T> {
    async fn fetch_page(&self, offset: usize) -> Result<Vec<RawTerm>, UpstreamError> {
        (**self).fetch_page(offset).await
    }
}
