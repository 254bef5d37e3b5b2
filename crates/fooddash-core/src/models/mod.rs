//! Data models for the client
//!
//! Wire types mirror the dashboard API's camelCase JSON. Session and upload task
//! types are the client-side state observed by the UI.

mod order;
mod restaurant;
mod session;
mod upload;
mod user;

pub use order::*;
pub use restaurant::*;
pub use session::*;
pub use upload::*;
pub use user::*;
