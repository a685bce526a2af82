//! HTTP transport trait.

use async_trait::async_trait;

use crate::Result;
use crate::http::{RequestOptions, Response};

/// A generic request-by-URL primitive.
///
/// Implementations return `Ok` for every HTTP status, including 4xx and 5xx.
/// `Err` is reserved for failures where no response was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response.
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<Response>;
}
