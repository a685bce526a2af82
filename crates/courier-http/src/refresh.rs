//! HTTP token refresh endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use courier_core::{AccessToken, Credentials, RefreshEndpoint, RefreshToken, Response, Result};

use crate::config::ClientConfig;
use crate::error::map_reqwest;
use crate::transport::ReqwestTransport;

/// Request body for the refresh call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from the refresh call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    #[serde(alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
}

/// [`RefreshEndpoint`] that POSTs the refresh token to the backend.
#[derive(Debug, Clone)]
pub struct HttpRefreshEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpRefreshEndpoint {
    /// Create an endpoint at `config.refresh_url()`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            url: config.refresh_url(),
        })
    }

    /// Create an endpoint sharing the transport's connection pool.
    pub fn with_transport(transport: &ReqwestTransport, config: &ClientConfig) -> Self {
        Self {
            client: transport.client().clone(),
            url: config.refresh_url(),
        }
    }

    /// URL the refresh token is posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RefreshEndpoint for HttpRefreshEndpoint {
    #[instrument(skip(self, refresh_token), fields(url = %self.url))]
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<Credentials> {
        debug!("Calling refresh endpoint");

        let response = self
            .client
            .post(&self.url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.as_str(),
            })
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status().as_u16();
        trace!(status, "Refresh response");

        let body = response.bytes().await.map_err(map_reqwest)?;
        let response = Response::new(status, body.to_vec());
        if !response.is_success() {
            return Err(response.error_body().into());
        }

        let body: RefreshResponse = response.json()?;

        Ok(Credentials {
            access_token: AccessToken::new(body.access_token),
            refresh_token: body.refresh_token.map(RefreshToken::new),
        })
    }

    fn endpoint_url(&self) -> Option<&str> {
        Some(&self.url)
    }
}
