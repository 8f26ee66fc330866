//! Business operations over the record store
//!
//! Services take a `&Database` and run each operation in one read or one
//! transaction; HTTP concerns stay in `handlers`.

pub mod accounts;
pub mod chatbot;
pub mod customer_code;
pub mod missions;
pub mod oauth;
pub mod points;
pub mod reviews;
pub mod rewards;
pub mod stores;

pub use chatbot::{ChatProvider, Chatbot, ProviderKind};
pub use oauth::{HttpIdentityVerifier, IdentityVerifier, VerifiedIdentity};
