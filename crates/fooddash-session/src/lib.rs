//! Fooddash Session Library
//!
//! Owns the client's belief about who is logged in. The [`SessionManager`] rehydrates
//! from a [`KeyValueStore`](fooddash_storage::KeyValueStore) at start, performs login,
//! registration and logout, exposes the bearer credential to the transport and reacts
//! to rejected credentials reported on the auth event channel.

pub mod manager;

pub use manager::{SessionCredentials, SessionManager, DEFAULT_LOGIN_ERROR, DEFAULT_REGISTER_ERROR};
