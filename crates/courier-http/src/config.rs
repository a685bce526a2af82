//! Client configuration.

use std::time::Duration;

use courier_core::ApiUrl;

/// Default path of the token refresh endpoint, relative to the API base.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh";

/// Settings shared by the transport and the refresh endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend.
    pub api: ApiUrl,
    /// Path of the refresh endpoint, relative to `api`.
    pub refresh_path: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Per-request timeout. `None` leaves it to the OS.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(api: ApiUrl) -> Self {
        Self {
            api,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            user_agent: concat!("courier/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
        }
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Absolute URL of the refresh endpoint.
    pub fn refresh_url(&self) -> String {
        self.api.endpoint(&self.refresh_path)
    }

    /// Build the shared reqwest client.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, courier_core::Error> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(crate::error::map_reqwest)
    }
}
