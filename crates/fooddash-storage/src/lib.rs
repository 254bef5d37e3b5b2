//! Fooddash Storage Library
//!
//! Key-value persistence for client state that must survive a restart. The session
//! manager stores the current identity under [`USER_KEY`] and the bearer credential
//! under [`TOKEN_KEY`].

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};

/// Key holding the JSON-encoded current user.
pub const USER_KEY: &str = "user";

/// Key holding the current bearer credential.
pub const TOKEN_KEY: &str = "token";
