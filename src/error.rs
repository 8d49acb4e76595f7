//! Failures the viewer reports to the user.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("Sign-in failed: {0}")]
    AuthFailed(String),

    #[error("Sign-in was cancelled.")]
    AuthCancelled,

    #[error("Acquiring access token failed: {0}")]
    TokenRefresh(String),

    #[error("Folder not found: {0}")]
    NotFound(String),

    /// The display-name lookup for an unreachable folder did not yield exactly one folder.
    #[error("Cannot identify folder \"{name}\": display-name lookup returned {matches} folder(s)")]
    AmbiguousOrMissingFallbackMatch { name: String, matches: usize },

    #[error("API error: {0}")]
    GenericApiError(ApiError),

    #[error("Editor window is already opened.")]
    DuplicateEditorWindow,
}

impl From<AuthError> for ViewerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Cancelled => ViewerError::AuthCancelled,
            AuthError::Failed(reason) => ViewerError::AuthFailed(reason),
        }
    }
}

impl From<ApiError> for ViewerError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(msg) => ViewerError::NotFound(msg),
            other => ViewerError::GenericApiError(other),
        }
    }
}

impl ViewerError {
    /// Informational outcomes rather than failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ViewerError::AuthCancelled | ViewerError::DuplicateEditorWindow
        )
    }
}
