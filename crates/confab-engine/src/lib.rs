//! # confab-engine
//!
//! The conversation synchronization and resolution engine: decides when an
//! existing direct chat must be reused instead of duplicated, materializes
//! live ordered views of a conversation document, reconciles optimistic
//! sends, pipelines media attachments through upload before emission, and
//! manages group membership with soft-delete semantics.

pub mod membership;
pub mod resolver;
pub mod sender;
pub mod sync;
pub mod uploader;

mod error;

pub use error::EngineError;
pub use membership::{MembershipManager, MembershipOutcome};
pub use resolver::{new_direct, resolve, Resolution};
pub use sender::{Draft, MessageSender};
pub use sync::{subscribe, ConversationView, Materializer, Subscription};
pub use uploader::MediaUploader;
