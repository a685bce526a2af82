//! courier-core - Session state and authenticated request coordination.
//!
//! Every authenticated call in the courier client goes through an
//! [`AuthClient`]. It attaches the current bearer token, and when the backend
//! answers 401 it refreshes the access token at most once for all concurrent
//! callers, replays the requests that were waiting, and tears the
//! [`Session`] down when the refresh can never succeed.

pub mod coordinator;
pub mod error;
pub mod http;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use coordinator::AuthClient;
pub use error::Error;
pub use http::{Credentials, Method, RequestOptions, Response};
pub use session::{Session, SessionStatus};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{MemoryStore, RefreshEndpoint, SecureStore, TokenStore, Transport};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
