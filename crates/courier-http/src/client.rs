//! Client assembly.

use courier_core::{AuthClient, Result, TokenStore};
use tracing::debug;

use crate::config::ClientConfig;
use crate::refresh::HttpRefreshEndpoint;
use crate::transport::ReqwestTransport;

/// An [`AuthClient`] talking HTTP to the backend.
pub type ApiClient<K> = AuthClient<ReqwestTransport, HttpRefreshEndpoint, K>;

/// Build an [`ApiClient`] for `config` authenticating with `tokens`.
///
/// The transport and refresh endpoint share one connection pool.
///
/// # Example
///
/// ```no_run
/// use courier_core::{ApiUrl, MemoryStore, Session};
/// use courier_http::{ClientConfig, connect};
///
/// # async fn example() -> Result<(), courier_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
/// let session = Session::restore(MemoryStore::new()).await?;
/// let client = connect(&config, session)?;
///
/// let orders = client.get(&config.api.endpoint("orders")).await?;
/// println!("{}", orders.text());
/// # Ok(())
/// # }
/// ```
pub fn connect<K: TokenStore + 'static>(config: &ClientConfig, tokens: K) -> Result<ApiClient<K>> {
    let transport = ReqwestTransport::new(config)?;
    let refresher = HttpRefreshEndpoint::with_transport(&transport, config);
    debug!(api = %config.api, refresh = %refresher.url(), "Built API client");
    Ok(AuthClient::new(transport, refresher, tokens))
}
