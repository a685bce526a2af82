//! courier-file - File-backed secure store for courier sessions.

mod vault;

pub use vault::FileVault;
