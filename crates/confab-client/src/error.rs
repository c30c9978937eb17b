use confab_engine::EngineError;
use confab_store::StoreError;

/// Errors surfaced at the session boundary.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No identity is signed in; the operation needs a session.
    #[error("no identity signed in")]
    NoIdentity,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
