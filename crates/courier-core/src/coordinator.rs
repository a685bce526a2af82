//! Authenticated request coordinator.
//!
//! [`AuthClient`] wraps every outbound call. A 401 starts a refresh cycle
//! unless one is already running, in which case the caller is parked in a
//! FIFO queue until the running cycle settles it. Only one cycle can be in
//! flight per client; the check of the cycle phase and the decision to lead
//! or wait happen under a single lock acquisition that is never held across
//! an `.await`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{AuthError, Error};
use crate::http::{RequestOptions, Response};
use crate::traits::{RefreshEndpoint, TokenStore, Transport};
use crate::{AccessToken, Result};

const ABANDONED: &str = "refresh cycle abandoned before completion";
const NO_REFRESH_TOKEN: &str = "no refresh token available";

/// HTTP client that keeps its caller authenticated.
///
/// Cloning is cheap and clones share one refresh cycle. Separate
/// `AuthClient::new` instances never share a cycle.
///
/// # Example
///
/// ```no_run
/// use courier_core::{AuthClient, RequestOptions, RefreshEndpoint, TokenStore, Transport};
///
/// # async fn example<T, R, K>(client: AuthClient<T, R, K>) -> Result<(), courier_core::Error>
/// # where T: Transport + 'static, R: RefreshEndpoint + 'static, K: TokenStore + 'static {
/// let response = client
///     .request("https://api.example.com/orders", RequestOptions::get())
///     .await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
pub struct AuthClient<T, R, K> {
    inner: Arc<ClientInner<T, R, K>>,
}

struct ClientInner<T, R, K> {
    transport: T,
    refresher: R,
    tokens: K,
    cycle: Mutex<Cycle>,
    refreshes: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Refreshing,
}

struct Cycle {
    phase: Phase,
    queue: Vec<Waiter>,
    /// Bumped each time a cycle installs a new access token.
    epoch: u64,
    /// Token installed by the last successful cycle.
    installed: Option<AccessToken>,
}

/// A caller parked while a refresh cycle is in flight.
enum Waiter {
    /// A request that got 401 and must be replayed with the new token.
    Request(PendingRequest),
    /// An explicit [`AuthClient::refresh`] call that only needs the outcome.
    Refresh(oneshot::Sender<Result<()>>),
}

struct PendingRequest {
    url: String,
    options: RequestOptions,
    reply: oneshot::Sender<Result<Response>>,
}

/// What a caller does after inspecting the cycle.
enum Role {
    Lead,
    Wait(oneshot::Receiver<Result<Response>>),
    Replay(AccessToken),
}

impl<T, R, K> Clone for AuthClient<T, R, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R, K> ClientInner<T, R, K> {
    fn cycle(&self) -> MutexGuard<'_, Cycle> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cycle to idle and hands back every parked caller.
    fn end_cycle(&self, installed: Option<AccessToken>) -> Vec<Waiter> {
        let mut cycle = self.cycle();
        cycle.phase = Phase::Idle;
        if installed.is_some() {
            cycle.epoch += 1;
        }
        cycle.installed = installed;
        std::mem::take(&mut cycle.queue)
    }
}

/// Owns a running refresh cycle. Dropping it without [`CycleGuard::finish`]
/// (leader cancelled or panicked) rejects the queue with a retryable error.
struct CycleGuard<'a, T, R, K> {
    inner: &'a ClientInner<T, R, K>,
    armed: bool,
}

impl<T, R, K> CycleGuard<'_, T, R, K> {
    fn finish(mut self, installed: Option<AccessToken>) -> Vec<Waiter> {
        self.armed = false;
        self.inner.end_cycle(installed)
    }
}

impl<T, R, K> Drop for CycleGuard<'_, T, R, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let waiters = self.inner.end_cycle(None);
        warn!(waiters = waiters.len(), "{}", ABANDONED);
        let err = AuthError::RefreshFailed {
            reason: ABANDONED.to_string(),
        };
        for waiter in waiters {
            reject(waiter, &err);
        }
    }
}

fn reject(waiter: Waiter, err: &AuthError) {
    // A receiver that is gone belongs to a caller that stopped waiting.
    match waiter {
        Waiter::Request(pending) => {
            let _ = pending.reply.send(Err(err.clone().into()));
        }
        Waiter::Refresh(reply) => {
            let _ = reply.send(Err(err.clone().into()));
        }
    }
}

impl<T, R, K> AuthClient<T, R, K>
where
    T: Transport + 'static,
    R: RefreshEndpoint + 'static,
    K: TokenStore + 'static,
{
    /// Create a client over `transport`, refreshing through `refresher` and
    /// reading and writing credentials through `tokens`.
    pub fn new(transport: T, refresher: R, tokens: K) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                refresher,
                tokens,
                cycle: Mutex::new(Cycle {
                    phase: Phase::Idle,
                    queue: Vec::new(),
                    epoch: 0,
                    installed: None,
                }),
                refreshes: AtomicUsize::new(0),
            }),
        }
    }

    /// The token store this client authenticates with.
    pub fn session(&self) -> &K {
        &self.inner.tokens
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// True while a refresh cycle is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.cycle().phase == Phase::Refreshing
    }

    /// Number of callers parked behind the in-flight refresh cycle.
    pub fn pending_requests(&self) -> usize {
        self.inner.cycle().queue.len()
    }

    /// Number of calls made to the refresh endpoint by this client.
    pub fn refresh_count(&self) -> usize {
        self.inner.refreshes.load(Ordering::SeqCst)
    }

    /// Send a request as if the caller always held a valid access token.
    ///
    /// Responses other than 401 are returned unchanged. A 401 is recovered
    /// through a single refresh cycle shared with every concurrent caller,
    /// after which the request is replayed once with the new token.
    ///
    /// # Errors
    ///
    /// - Transport failures of the request itself, unchanged.
    /// - [`AuthError::SessionEnded`] when the refresh credential is missing
    ///   or rejected. The session has been logged out.
    /// - [`AuthError::RefreshFailed`] when the refresh call failed for any
    ///   other reason. The session is intact.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let sent = self.inner.tokens.access_token().await;
        let response = self.send_with(url, &options, sent.as_ref()).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        if self.inner.refresher.endpoint_url() == Some(url) {
            debug!("401 from the refresh endpoint, not refreshing");
            return Ok(response);
        }

        let seen_epoch = self.inner.cycle().epoch;
        let current = self.inner.tokens.access_token().await;

        let role = {
            let mut cycle = self.inner.cycle();
            match cycle.phase {
                Phase::Refreshing => {
                    let (reply, rx) = oneshot::channel();
                    cycle.queue.push(Waiter::Request(PendingRequest {
                        url: url.to_string(),
                        options: options.clone(),
                        reply,
                    }));
                    debug!(position = cycle.queue.len(), "Queued behind refresh");
                    Role::Wait(rx)
                }
                Phase::Idle => match newer_token(sent.as_ref(), current, &cycle, seen_epoch) {
                    Some(token) => Role::Replay(token),
                    None => {
                        cycle.phase = Phase::Refreshing;
                        Role::Lead
                    }
                },
            }
        };

        match role {
            Role::Wait(rx) => rx.await.unwrap_or_else(|_| {
                Err(AuthError::RefreshFailed {
                    reason: ABANDONED.to_string(),
                }
                .into())
            }),
            Role::Replay(token) => {
                debug!("Token changed while the request was in flight, replaying");
                self.send_with(url, &options, Some(&token)).await
            }
            Role::Lead => {
                let token = self.lead_cycle().await?;
                self.send_with(url, &options, Some(&token)).await
            }
        }
    }

    /// GET `url`.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(url, RequestOptions::get()).await
    }

    /// POST `body` as JSON to `url`.
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        self.request(url, RequestOptions::post().json(body)?).await
    }

    /// Send a request and decode a 2xx JSON body.
    ///
    /// Non-2xx responses become [`Error::Protocol`].
    pub async fn request_json<D: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<D> {
        self.request(url, options).await?.error_for_status()?.json()
    }

    /// Run a refresh cycle now, or join the one already in flight.
    ///
    /// Queued callers are settled exactly as for a 401-triggered cycle.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let rx = {
            let mut cycle = self.inner.cycle();
            match cycle.phase {
                Phase::Refreshing => {
                    let (reply, rx) = oneshot::channel();
                    cycle.queue.push(Waiter::Refresh(reply));
                    Some(rx)
                }
                Phase::Idle => {
                    cycle.phase = Phase::Refreshing;
                    None
                }
            }
        };

        match rx {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(AuthError::RefreshFailed {
                    reason: ABANDONED.to_string(),
                }
                .into())
            }),
            None => self.lead_cycle().await.map(|_| ()),
        }
    }

    /// Drive the refresh protocol as the cycle leader and settle the queue.
    ///
    /// The caller must have moved the cycle to `Refreshing`.
    async fn lead_cycle(&self) -> Result<AccessToken> {
        let guard = CycleGuard {
            inner: self.inner.as_ref(),
            armed: true,
        };

        match self.exchange_refresh_token().await {
            Ok(token) => {
                let waiters = guard.finish(Some(token.clone()));
                info!(waiters = waiters.len(), "Refresh cycle succeeded");
                for waiter in waiters {
                    match waiter {
                        Waiter::Request(pending) => {
                            tokio::spawn(replay(Arc::clone(&self.inner), pending, token.clone()));
                        }
                        Waiter::Refresh(reply) => {
                            let _ = reply.send(Ok(()));
                        }
                    }
                }
                Ok(token)
            }
            Err(err) => {
                let waiters = guard.finish(None);
                info!(waiters = waiters.len(), error = %err, "Refresh cycle failed");
                for waiter in waiters {
                    reject(waiter, &err);
                }
                Err(err.into())
            }
        }
    }

    /// Exchange the refresh token and install the new credentials.
    async fn exchange_refresh_token(&self) -> std::result::Result<AccessToken, AuthError> {
        let Some(refresh_token) = self.inner.tokens.refresh_token().await else {
            warn!("No refresh token held, ending session");
            self.force_logout().await;
            return Err(AuthError::SessionEnded {
                reason: NO_REFRESH_TOKEN.to_string(),
            });
        };

        info!("Refreshing access token");
        self.inner.refreshes.fetch_add(1, Ordering::SeqCst);

        match self.inner.refresher.refresh(&refresh_token).await {
            Ok(credentials) => {
                if let Some(rotated) = credentials.refresh_token
                    && let Err(e) = self.inner.tokens.set_refresh_token(rotated).await
                {
                    warn!(error = %e, "Failed to persist refresh token, keeping it in memory");
                }
                let token = credentials.access_token;
                if let Err(e) = self.inner.tokens.set_access_token(token.clone()).await {
                    warn!(error = %e, "Failed to persist access token, keeping it in memory");
                }
                Ok(token)
            }
            Err(Error::Protocol(e)) if e.is_terminal_refresh_failure() => {
                warn!(status = e.status, "Refresh token rejected, ending session");
                self.force_logout().await;
                Err(AuthError::SessionEnded {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, session kept");
                Err(AuthError::RefreshFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn force_logout(&self) {
        if let Err(e) = self.inner.tokens.logout().await {
            warn!(error = %e, "Failed to erase persisted session");
        }
    }

    async fn send_with(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&AccessToken>,
    ) -> Result<Response> {
        let response = self
            .inner
            .transport
            .send(url, &options.authorized(token))
            .await?;
        trace!(status = response.status, "Response");
        Ok(response)
    }
}

/// The token a 401'd request should be replayed with instead of refreshing,
/// if the credential changed since `sent` went out.
///
/// `current` was read after `seen_epoch`; a cycle that completed in between
/// left its token in `cycle.installed`.
fn newer_token(
    sent: Option<&AccessToken>,
    current: Option<AccessToken>,
    cycle: &Cycle,
    seen_epoch: u64,
) -> Option<AccessToken> {
    match current {
        Some(current) if Some(&current) != sent => return Some(current),
        None if sent.is_some() => return None,
        _ => {}
    }
    if cycle.epoch != seen_epoch {
        return cycle.installed.clone().filter(|t| Some(t) != sent);
    }
    None
}

/// Re-issue a parked request with the refreshed token and settle its caller.
async fn replay<T, R, K>(inner: Arc<ClientInner<T, R, K>>, pending: PendingRequest, token: AccessToken)
where
    T: Transport,
{
    debug!(url = %pending.url, "Replaying queued request");
    let result = inner
        .transport
        .send(&pending.url, &pending.options.authorized(Some(&token)))
        .await;
    let _ = pending.reply.send(result);
}

impl<T, R, K> std::fmt::Debug for AuthClient<T, R, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cycle = self.inner.cycle();
        f.debug_struct("AuthClient")
            .field("phase", &cycle.phase)
            .field("pending", &cycle.queue.len())
            .finish()
    }
}
