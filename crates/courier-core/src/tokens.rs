//! Bearer credential types.

use std::fmt;

macro_rules! secret_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn new(token: impl Into<String>) -> Self {
                Self(token.into())
            }

            /// Raw value, for the wire only.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"[REDACTED]").finish()
            }
        }
    };
}

secret_token! {
    /// Short-lived bearer credential attached to every authenticated request.
    ///
    /// Opaque: the format belongs to the backend. Debug output is redacted.
    AccessToken
}

secret_token! {
    /// Longer-lived credential exchanged for a new access token. Only the
    /// refresh call ever sends it.
    RefreshToken
}

impl AccessToken {
    /// `Authorization` header value carrying this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}
