pub mod models;
pub mod outlook;

use std::sync::Arc;
use thiserror::Error;

use crate::api::models::{Calendar, ContactFolder, FolderRef, MailFolder};
use crate::auth::Grant;

/// OData error code the service returns for folders it refuses to open by id.
pub const ITEM_NOT_FOUND: &str = "ErrorItemNotFound";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("item not found: {0}")]
    NotFound(String),

    #[error("server returned {status} {code}: {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Folder queries against one mailbox, bound to a bearer token.
///
/// Calls block; the viewer runs them off the UI thread.
pub trait MailboxApi: Send + Sync {
    fn get_root_folder(&self) -> Result<FolderRef, ApiError>;

    /// All child mail folders of `parent_id`, across every result page.
    fn list_child_mail_folders(&self, parent_id: &str) -> Result<Vec<MailFolder>, ApiError>;
    fn list_child_contact_folders(&self, parent_id: &str)
    -> Result<Vec<ContactFolder>, ApiError>;
    fn list_calendars(&self) -> Result<Vec<Calendar>, ApiError>;

    fn get_mail_folder(&self, id: &str) -> Result<MailFolder, ApiError>;
    /// At most `limit` folders whose display name equals `name`. No paging.
    fn find_mail_folders_by_display_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<MailFolder>, ApiError>;
    fn get_contact_folder(&self, id: &str) -> Result<ContactFolder, ApiError>;
    fn get_calendar(&self, id: &str) -> Result<Calendar, ApiError>;

    /// GET `path` relative to the API base and return the body as text.
    fn raw_get(&self, path: &str) -> Result<String, ApiError>;
}

/// Builds an API client for a freshly acquired grant.
pub trait Connector: Send + Sync {
    fn connect(&self, grant: &Grant) -> Arc<dyn MailboxApi>;
}
