//! # courtside-session
//!
//! The editing session around a [`courtside_core::BracketTree`]: resolves the
//! caller's [`Role`] through an [`IdentityProvider`], authorizes every typed
//! [`Command`] before it touches the tree, and keeps a remote
//! [`DocumentStore`] in sync with the in-memory state.
//!
//! The in-memory tree is authoritative for the running session. Mutations
//! apply synchronously; the matching save is dispatched in the background and
//! a failed save leaves the session operating in a degraded, unsynced mode
//! rather than rolling anything back.

pub mod config;
pub mod contacts;
pub mod gate;
pub mod identity;
pub mod logger;
pub mod session;
pub mod store;

pub use config::Config;
pub use contacts::{ContactDirectory, ContactInfo, ContactsClient};
pub use gate::{authorize, Command, Denied, Gate, Role};
pub use identity::{
    Credentials, Identity, IdentityError, IdentityProvider, StaticProvider, UserRecord,
};
pub use session::{Outcome, Session, SessionEvent};
pub use store::{DocumentStore, FsStore, MemoryStore, StoreError};

use thiserror::Error;

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Bracket(#[from] courtside_core::Error),
    #[error("{0}")]
    Identity(#[from] IdentityError),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
