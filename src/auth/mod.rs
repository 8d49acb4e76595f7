pub mod claims;
pub mod oauth;
pub mod token_manager;
pub mod token_store;
pub mod tokens_file;

use thiserror::Error;

/// Opaque handle of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
}

impl UserIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Value for the `X-AnchorMailbox` routing header.
    pub fn anchor_mailbox(&self) -> String {
        self.username.clone()
    }
}

/// A bearer token together with the identity it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub access_token: String,
    pub identity: UserIdentity,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("sign-in was cancelled")]
    Cancelled,

    #[error("sign-in failed: {0}")]
    Failed(String),
}

/// Implementations are shared with worker threads, which call `acquire_silent`.
pub trait Authenticator: Send + Sync {
    /// Interactive sign-in; `previous` is the identity of the last session, if any.
    fn request(&self, previous: Option<&UserIdentity>) -> Result<Grant, AuthError>;

    /// Non-interactive token for `user`, refreshed if the cached one expired.
    fn acquire_silent(&self, user: &UserIdentity) -> Result<Grant, AuthError>;
}
