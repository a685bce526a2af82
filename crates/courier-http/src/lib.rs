//! courier-http - reqwest-backed collaborators for the courier client.
//!
//! Provides the HTTP [`Transport`](courier_core::Transport) and the
//! [`RefreshEndpoint`](courier_core::RefreshEndpoint) that talk to the
//! storefront backend, and [`connect`] to assemble them into an
//! [`AuthClient`](courier_core::AuthClient).

mod client;
mod config;
mod error;
mod refresh;
mod transport;

pub use client::{ApiClient, connect};
pub use config::{ClientConfig, DEFAULT_REFRESH_PATH};
pub use refresh::HttpRefreshEndpoint;
pub use transport::ReqwestTransport;
