//! Identity providers: the collaborator that binds an email/password
//! credential to an opaque user id.

use async_trait::async_trait;
use uuid::Uuid;

pub mod local;
pub mod password;
pub mod supabase;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("provider response carried no usable identifier")]
    MissingIdentifier,
    #[error("provider rejected identity: {0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Uuid, IdentityError>;

    /// Removes an identity created by [`create_identity`](Self::create_identity).
    /// Used to undo a signup whose profile row could not be written.
    async fn delete_identity(&self, id: Uuid) -> anyhow::Result<()>;
}
