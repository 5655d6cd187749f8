//! Authentication state for a signed-in user.
//!
//! This module provides:
//! - `SessionStore`: the session-scoped credential pair, persisted to disk,
//!   with a generation counter the gateway uses to coordinate refreshes
//! - `TokenClaims`: expiry and identity read from the access token
//! - `CredentialStore`: optional password storage via the OS keyring

pub mod claims;
pub mod credentials;
pub mod session;

pub use claims::TokenClaims;
pub use credentials::CredentialStore;
pub use session::{CredentialPair, CredentialSnapshot, SessionStore};
