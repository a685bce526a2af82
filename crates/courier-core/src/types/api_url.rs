//! Backend base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated base URL of the storefront backend.
///
/// Must use HTTPS, except that HTTP is accepted for loopback hosts so local
/// development servers and test doubles work.
///
/// # Example
///
/// ```
/// use courier_core::ApiUrl;
///
/// let api = ApiUrl::new("https://api.example.com/v1/").unwrap();
/// assert_eq!(api.endpoint("orders"), "https://api.example.com/v1/orders");
/// assert_eq!(api.endpoint("/auth/refresh"), "https://api.example.com/v1/auth/refresh");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Parse and validate a base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not absolute, has no host, or uses
    /// plain HTTP for a non-loopback host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(url))
    }

    /// Returns the absolute URL for a path relative to the base.
    ///
    /// Inputs that already carry an `http://` or `https://` scheme are
    /// returned unchanged.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let reject = |reason: &str| -> Error {
            InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if url.cannot_be_a_base() {
            return Err(reject("must be an absolute URL"));
        }
        let Some(host) = url.host_str() else {
            return Err(reject("must have a host"));
        };

        match url.scheme() {
            "https" => Ok(()),
            "http" if matches!(host, "localhost" | "127.0.0.1" | "[::1]") => Ok(()),
            _ => Err(reject("must use HTTPS (HTTP allowed only for loopback hosts)")),
        }
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ApiUrl {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ApiUrl> for String {
    fn from(api: ApiUrl) -> Self {
        api.0.into()
    }
}

impl AsRef<str> for ApiUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https() {
        let api = ApiUrl::new("https://api.example.com").unwrap();
        assert_eq!(api.host(), Some("api.example.com"));
    }

    #[test]
    fn accepts_loopback_http() {
        let api = ApiUrl::new("http://localhost:8080").unwrap();
        assert_eq!(api.host(), Some("localhost"));
        assert!(ApiUrl::new("http://127.0.0.1:9000").is_ok());
    }

    #[test]
    fn endpoint_joins_with_single_slash() {
        let api = ApiUrl::new("https://api.example.com").unwrap();
        assert_eq!(api.endpoint("orders/7"), "https://api.example.com/orders/7");
        assert_eq!(api.endpoint("/orders/7"), "https://api.example.com/orders/7");

        let nested = ApiUrl::new("https://api.example.com/v2/").unwrap();
        assert_eq!(nested.endpoint("cart"), "https://api.example.com/v2/cart");
    }

    #[test]
    fn endpoint_passes_absolute_urls_through() {
        let api = ApiUrl::new("https://api.example.com").unwrap();
        assert_eq!(
            api.endpoint("https://cdn.example.com/menu.json"),
            "https://cdn.example.com/menu.json"
        );
    }

    #[test]
    fn rejects_remote_http() {
        assert!(ApiUrl::new("http://api.example.com").is_err());
    }

    #[test]
    fn rejects_relative_url() {
        assert!(ApiUrl::new("/orders").is_err());
    }

    #[test]
    fn serde_goes_through_validation() {
        let api: ApiUrl = serde_json::from_str("\"https://api.example.com\"").unwrap();
        assert_eq!(serde_json::to_string(&api).unwrap(), "\"https://api.example.com/\"");
        assert!(serde_json::from_str::<ApiUrl>("\"ftp://api.example.com\"").is_err());
    }
}
