//! # confab-client
//!
//! Session-aware facade over the conversation store and the sync engine:
//! sign-in state, chat-list summaries, message sending and group
//! management, exposed as one [`ChatClient`] handle that is cheap to clone
//! across tasks.

pub mod client;
pub mod state;
pub mod summary;

mod error;

use tracing_subscriber::{fmt, EnvFilter};

pub use client::ChatClient;
pub use error::ClientError;
pub use summary::ConversationSummary;

/// Initialise structured logging for the process.
///
/// Honours `RUST_LOG` when set; otherwise defaults to debug output for the
/// client and engine crates and info for the store. Call once at startup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("confab_client=debug,confab_engine=debug,confab_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
