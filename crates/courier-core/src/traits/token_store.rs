//! Token store trait.

use async_trait::async_trait;

use crate::{AccessToken, RefreshToken, Result};

/// Read/write access to the current session credentials.
///
/// This is the capability the coordinator needs from whoever owns the
/// session. [`Session`](crate::Session) is the stock implementation.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current access token. Never fails.
    async fn access_token(&self) -> Option<AccessToken>;

    /// Current refresh token. Never fails.
    async fn refresh_token(&self) -> Option<RefreshToken>;

    /// Replace the access token and persist it.
    ///
    /// The in-memory value must be visible to readers once this returns,
    /// even when persisting failed.
    async fn set_access_token(&self, token: AccessToken) -> Result<()>;

    /// Replace the refresh token and persist it.
    async fn set_refresh_token(&self, token: RefreshToken) -> Result<()>;

    /// Clear all credentials and their persisted copy. Idempotent.
    async fn logout(&self) -> Result<()>;
}
