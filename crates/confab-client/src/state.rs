//! Session state shared by every client operation.
//!
//! The [`ClientState`] struct is wrapped in `Arc<Mutex<>>` inside the
//! client so concurrent callers observe one consistent session.

use confab_shared::IdentityRef;

/// Central session state.
///
/// Holds the signed-in identity, `None` until the user signs in. Store and
/// engine handles are cheap clones held by the client itself.
pub struct ClientState {
    /// The current user's identity. `None` between sign-out and sign-in.
    pub identity: Option<IdentityRef>,
}

impl ClientState {
    /// Create a new, signed-out session state.
    pub fn new() -> Self {
        Self { identity: None }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
