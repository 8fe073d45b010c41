//! Google Calendar backend for evsync.
//!
//! Talks to the Calendar v3 REST API directly. Events are encoded with
//! `ToGoogle` and decoded with `FromGoogle`; `GoogleGateway` plugs both into
//! the sync engine.

mod from_google;
mod gateway;
pub mod session;
mod to_google;
pub mod wire;

pub use from_google::FromGoogle;
pub use gateway::GoogleGateway;
pub use session::{OAuthClient, Session};
pub use to_google::ToGoogle;
