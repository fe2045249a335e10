use crate::directory::DirectoryError;
use crate::post::PostUrlError;

/// Every way a draw request can fail. The `Display` text is what the
/// caller sees in the `error` field of the response.
#[derive(thiserror::Error, Debug)]
pub enum PickError {
    /// Service credentials are missing from the environment.
    #[error("Server credentials are not configured.")]
    Config,

    /// Request rejected before any remote call.
    #[error("{0}")]
    Validation(&'static str),

    /// Post URL malformed or its owner could not be resolved.
    #[error("Post URL is invalid or inaccessible.")]
    InvalidPost(#[source] PostUrlError),

    /// The follower-check account does not exist.
    #[error("Account '{0}' not found.")]
    AccountNotFound(String),

    #[error("Remote request failed: {0}")]
    Remote(#[from] DirectoryError),

    #[error("No valid participants.")]
    NoEligibleParticipants,

    #[error("Failed to record draw: {0}")]
    Ledger(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PickError>;
