use log::debug;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::api::models::{Calendar, ContactFolder, ErrorEnvelope, FolderRef, MailFolder, Page};
use crate::api::{ApiError, Connector, ITEM_NOT_FOUND, MailboxApi};
use crate::auth::Grant;

pub const DEFAULT_API_BASE: &str = "https://outlook.office.com/api/v2.0";

const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Outlook REST v2.0 client for the signed-in user's mailbox.
pub struct OutlookClient {
    http: Client,
    base: String,
    access_token: String,
    anchor_mailbox: String,
}

impl OutlookClient {
    pub fn new(
        http: Client,
        base: impl Into<String>,
        access_token: impl Into<String>,
        anchor_mailbox: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base: base.into(),
            access_token: access_token.into(),
            anchor_mailbox: anchor_mailbox.into(),
        }
    }

    /// Base URL with `segments` appended, each one percent-encoded (folder ids carry `/`, `+`, `=`).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| ApiError::Transport(format!("invalid API base '{}': {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("API base '{}' cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn paged(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut()
            .append_pair("$top", &PAGE_SIZE.to_string());
        Ok(url)
    }

    fn get_text(&self, url: &str) -> Result<String, ApiError> {
        debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .header("X-AnchorMailbox", &self.anchor_mailbox)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!("GET {url} -> {status}");
            Err(error_from_body(status.as_u16(), &body))
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.get_text(url)?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Follow `@odata.nextLink` until the collection is exhausted.
    fn get_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, ApiError> {
        let mut out = Vec::new();
        let mut next = Some(first.to_string());
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url)?;
            out.extend(page.value);
            next = page.next_link;
        }
        Ok(out)
    }
}

fn error_from_body(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if env.error.code == ITEM_NOT_FOUND => ApiError::NotFound(env.error.message),
        Ok(env) => ApiError::Server {
            status,
            code: env.error.code,
            message: env.error.message,
        },
        Err(_) => ApiError::Server {
            status,
            code: String::new(),
            message: body.chars().take(200).collect(),
        },
    }
}

impl MailboxApi for OutlookClient {
    fn get_root_folder(&self) -> Result<FolderRef, ApiError> {
        let url = self.endpoint(&["me", "MailFolders", "msgfolderroot"])?;
        self.get_json(url.as_str())
    }

    fn list_child_mail_folders(&self, parent_id: &str) -> Result<Vec<MailFolder>, ApiError> {
        self.get_all(self.paged(&["me", "MailFolders", parent_id, "childfolders"])?)
    }

    fn list_child_contact_folders(
        &self,
        parent_id: &str,
    ) -> Result<Vec<ContactFolder>, ApiError> {
        self.get_all(self.paged(&["me", "ContactFolders", parent_id, "childfolders"])?)
    }

    fn list_calendars(&self) -> Result<Vec<Calendar>, ApiError> {
        self.get_all(self.paged(&["me", "Calendars"])?)
    }

    fn get_mail_folder(&self, id: &str) -> Result<MailFolder, ApiError> {
        let url = self.endpoint(&["me", "MailFolders", id])?;
        self.get_json(url.as_str())
    }

    fn find_mail_folders_by_display_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<MailFolder>, ApiError> {
        let mut url = self.endpoint(&["me", "MailFolders"])?;
        url.query_pairs_mut()
            .append_pair(
                "$filter",
                &format!("DisplayName eq '{}'", name.replace('\'', "''")),
            )
            .append_pair("$top", &limit.to_string());
        let page: Page<MailFolder> = self.get_json(url.as_str())?;
        Ok(page.value)
    }

    fn get_contact_folder(&self, id: &str) -> Result<ContactFolder, ApiError> {
        let url = self.endpoint(&["me", "ContactFolders", id])?;
        self.get_json(url.as_str())
    }

    fn get_calendar(&self, id: &str) -> Result<Calendar, ApiError> {
        let url = self.endpoint(&["me", "Calendars", id])?;
        self.get_json(url.as_str())
    }

    fn raw_get(&self, path: &str) -> Result<String, ApiError> {
        let path = path.trim();
        let url = if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        self.get_text(&url)
    }
}

/// Hands out [`OutlookClient`]s sharing one connection pool.
pub struct OutlookConnector {
    http: Client,
    base: String,
}

impl OutlookConnector {
    pub fn new(base: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: base.into(),
        })
    }
}

impl Connector for OutlookConnector {
    fn connect(&self, grant: &Grant) -> Arc<dyn MailboxApi> {
        Arc::new(OutlookClient::new(
            self.http.clone(),
            self.base.clone(),
            grant.access_token.clone(),
            grant.identity.anchor_mailbox(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> OutlookClient {
        OutlookClient::new(Client::new(), base, "tok", "me@contoso.com")
    }

    #[test]
    fn folder_ids_are_encoded_as_single_segments() {
        let c = client("https://outlook.office.com/api/v2.0/");
        let url = c.endpoint(&["me", "MailFolders", "AA/B+C="]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://outlook.office.com/api/v2.0/me/MailFolders/AA%2FB+C="
        );
    }

    #[test]
    fn item_not_found_maps_to_not_found() {
        let err = error_from_body(
            404,
            r#"{"error":{"code":"ErrorItemNotFound","message":"gone"}}"#,
        );
        assert_eq!(err, ApiError::NotFound("gone".into()));
    }

    #[test]
    fn other_errors_keep_status_and_code() {
        let err = error_from_body(
            403,
            r#"{"error":{"code":"ErrorAccessDenied","message":"no"}}"#,
        );
        assert_eq!(
            err,
            ApiError::Server {
                status: 403,
                code: "ErrorAccessDenied".into(),
                message: "no".into()
            }
        );
        assert!(matches!(
            error_from_body(502, "<html>bad gateway</html>"),
            ApiError::Server { status: 502, .. }
        ));
    }
}
