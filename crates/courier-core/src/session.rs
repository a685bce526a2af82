//! Session state holder.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, instrument};

use crate::traits::{SecureStore, TokenStore};
use crate::{AccessToken, RefreshToken, Result};

/// Storage key of the persisted access token.
pub const ACCESS_TOKEN_KEY: &str = "courier.access_token";

/// Storage key of the persisted refresh token.
pub const REFRESH_TOKEN_KEY: &str = "courier.refresh_token";

/// Coarse session state published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credentials have been set.
    SignedOut,
    /// An access token is held.
    Active,
    /// The session was torn down by [`Session::logout`].
    Ended,
}

/// The single source of truth for the session credentials.
///
/// Holds the access and refresh token in memory and mirrors every change
/// into a [`SecureStore`]. Cheap to clone; clones share state.
///
/// # Example
///
/// ```
/// use courier_core::{AccessToken, MemoryStore, RefreshToken, Session};
///
/// # async fn example() -> Result<(), courier_core::Error> {
/// let session = Session::new(MemoryStore::new());
/// session
///     .set_tokens(AccessToken::new("a"), Some(RefreshToken::new("r")))
///     .await?;
/// assert!(session.is_authenticated().await);
///
/// session.logout().await?;
/// session.logout().await?;
/// assert!(session.access_token().await.is_none());
/// # Ok(())
/// # }
/// ```
pub struct Session<S> {
    inner: Arc<SessionInner<S>>,
}

struct SessionInner<S> {
    store: S,
    tokens: RwLock<SessionTokens>,
    status: watch::Sender<SessionStatus>,
    logouts: AtomicUsize,
}

#[derive(Default)]
struct SessionTokens {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SecureStore> Session<S> {
    /// Create an empty session over `store`. Nothing is read from the store.
    pub fn new(store: S) -> Self {
        Self::with_tokens(store, SessionTokens::default())
    }

    /// Create a session from the credentials persisted in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(store))]
    pub async fn restore(store: S) -> Result<Self> {
        let access_token = store.get(ACCESS_TOKEN_KEY).await?.map(AccessToken::new);
        let refresh_token = store.get(REFRESH_TOKEN_KEY).await?.map(RefreshToken::new);

        debug!(
            has_access = access_token.is_some(),
            has_refresh = refresh_token.is_some(),
            "Restored session"
        );

        Ok(Self::with_tokens(
            store,
            SessionTokens {
                access_token,
                refresh_token,
            },
        ))
    }

    fn with_tokens(store: S, tokens: SessionTokens) -> Self {
        let initial = if tokens.access_token.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::SignedOut
        };
        let (status, _) = watch::channel(initial);

        Self {
            inner: Arc::new(SessionInner {
                store,
                tokens: RwLock::new(tokens),
                status,
                logouts: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the current access token.
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.inner.tokens.read().await.access_token.clone()
    }

    /// Returns the current refresh token.
    pub async fn refresh_token(&self) -> Option<RefreshToken> {
        self.inner.tokens.read().await.refresh_token.clone()
    }

    /// True while an access token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.tokens.read().await.access_token.is_some()
    }

    /// Replace the access token.
    ///
    /// The in-memory value is updated before the durable copy is written, so
    /// readers see the new token even when this returns an error.
    ///
    /// # Errors
    ///
    /// Returns the store's error if persisting failed.
    pub async fn set_access_token(&self, token: AccessToken) -> Result<()> {
        let value = token.as_str().to_string();
        self.inner.tokens.write().await.access_token = Some(token);
        self.inner.status.send_replace(SessionStatus::Active);

        self.inner.store.set(ACCESS_TOKEN_KEY, &value).await
    }

    /// Replace the refresh token.
    pub async fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        let value = token.as_str().to_string();
        self.inner.tokens.write().await.refresh_token = Some(token);

        self.inner.store.set(REFRESH_TOKEN_KEY, &value).await
    }

    /// Install a complete set of credentials, as produced by a login flow.
    ///
    /// A `None` refresh token removes any previously stored one.
    pub async fn set_tokens(
        &self,
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
    ) -> Result<()> {
        match refresh_token {
            Some(token) => self.set_refresh_token(token).await?,
            None => {
                self.inner.tokens.write().await.refresh_token = None;
                self.inner.store.remove(REFRESH_TOKEN_KEY).await?;
            }
        }
        self.set_access_token(access_token).await
    }

    /// Clear both tokens and erase the persisted copy.
    ///
    /// Observers registered through [`Session::subscribe`] see
    /// [`SessionStatus::Ended`] once per effective logout; logging out an
    /// empty session does not notify them again. Both stored keys are
    /// removed on every call, so a logout whose erase failed can be repeated.
    ///
    /// # Errors
    ///
    /// Returns the first store error. Both removals are attempted and the
    /// in-memory tokens are cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let had_tokens = {
            let mut tokens = self.inner.tokens.write().await;
            let had_tokens = tokens.access_token.is_some() || tokens.refresh_token.is_some();
            *tokens = SessionTokens::default();
            had_tokens
        };

        if had_tokens {
            info!("Logging out");
            self.inner.logouts.fetch_add(1, Ordering::SeqCst);
            self.inner.status.send_replace(SessionStatus::Ended);
        } else {
            debug!("Session already empty, erasing persisted copy");
        }

        let access = self.inner.store.remove(ACCESS_TOKEN_KEY).await;
        let refresh = self.inner.store.remove(REFRESH_TOKEN_KEY).await;
        access.and(refresh)
    }

    /// Current coarse status.
    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    /// Watch status changes, e.g. to send the user back to sign-in after a
    /// forced logout.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    /// Number of effective logouts performed on this session.
    pub fn logout_count(&self) -> usize {
        self.inner.logouts.load(Ordering::SeqCst)
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }
}

#[async_trait]
impl<S: SecureStore> TokenStore for Session<S> {
    async fn access_token(&self) -> Option<AccessToken> {
        Session::access_token(self).await
    }

    async fn refresh_token(&self) -> Option<RefreshToken> {
        Session::refresh_token(self).await
    }

    async fn set_access_token(&self, token: AccessToken) -> Result<()> {
        Session::set_access_token(self, token).await
    }

    async fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        Session::set_refresh_token(self, token).await
    }

    async fn logout(&self) -> Result<()> {
        Session::logout(self).await
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &*self.inner.status.borrow())
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
