//! Refresh endpoint trait.

use async_trait::async_trait;

use crate::http::Credentials;
use crate::{RefreshToken, Result};

/// The network operation that exchanges a refresh token for new credentials.
#[async_trait]
pub trait RefreshEndpoint: Send + Sync {
    /// Exchange `refresh_token` for a new access token.
    ///
    /// A rejected credential must be reported as
    /// [`Error::Protocol`](crate::Error::Protocol) carrying the backend's 401
    /// or 403 status. Every other error is treated as transient.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<Credentials>;

    /// URL of the endpoint, if it is reachable through the same transport.
    ///
    /// Requests aimed at this URL never trigger refresh handling.
    fn endpoint_url(&self) -> Option<&str> {
        None
    }
}
