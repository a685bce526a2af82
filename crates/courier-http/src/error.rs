//! reqwest error mapping.

use courier_core::Error;
use courier_core::error::TransportError;

/// Classify a reqwest failure into the transport taxonomy.
pub(crate) fn map_reqwest(err: reqwest::Error) -> Error {
    let message = err.to_string();
    let transport = if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connection { message }
    } else {
        TransportError::Http { message }
    };
    Error::Transport(transport)
}
