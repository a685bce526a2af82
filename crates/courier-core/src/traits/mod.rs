//! Collaborator traits consumed by the coordinator.

mod refresh;
mod store;
mod token_store;
mod transport;

pub use refresh::RefreshEndpoint;
pub use store::{MemoryStore, SecureStore};
pub use token_store::TokenStore;
pub use transport::Transport;
