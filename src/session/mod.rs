//! Session capture and persistence

pub mod authenticator;
pub mod store;
pub mod types;

pub use authenticator::{AuthFailure, authenticate};
pub use store::{SessionError, SessionStore};
pub use types::{Session, SessionCookie};
