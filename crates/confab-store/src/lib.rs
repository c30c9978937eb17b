//! # confab-store
//!
//! The two storage collaborators behind the conversation engine.
//!
//! [`ConversationStore`] is the document store: it holds mutable
//! conversation records, applies tagged field-scoped updates (never a
//! whole-document overwrite), and fans every change out to subscribers as a
//! full snapshot.  [`ObjectStore`] is the media blob store: opaque bytes
//! filed under collision-resistant names, addressed by retrievable URLs.

pub mod config;
pub mod documents;
pub mod models;
pub mod objects;

mod error;

pub use config::StoreConfig;
pub use documents::{ConversationStore, ConversationUpdate, DocumentEvent, DocumentWatch, MemberWatch};
pub use error::StoreError;
pub use models::*;
pub use objects::ObjectStore;
