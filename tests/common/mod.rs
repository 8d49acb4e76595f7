//! In-memory stand-ins for the mailbox service and the sign-in flow.
//!
//! `FakeMailbox` answers folder queries from maps filled in by the test and
//! records every call, so tests can check which requests the viewer made.
//! `FakeAuth` returns scripted sign-in outcomes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use o365_mailbox_viewer::api::models::{
    Calendar, CalendarColor, ContactFolder, FolderRef, MailFolder,
};
use o365_mailbox_viewer::api::{ApiError, Connector, MailboxApi};
use o365_mailbox_viewer::auth::{AuthError, Authenticator, Grant, UserIdentity};
use o365_mailbox_viewer::viewer::MailboxViewer;

pub const ROOT_ID: &str = "ROOT";
pub const USER: &str = "adele@contoso.com";

pub fn mail_folder(id: &str, name: &str, parent: &str, children: i32) -> MailFolder {
    MailFolder {
        id: id.to_string(),
        display_name: name.to_string(),
        parent_folder_id: Some(parent.to_string()),
        child_folder_count: children,
        total_item_count: 0,
        unread_item_count: 0,
    }
}

pub fn contact_folder(id: &str, name: &str, parent: &str) -> ContactFolder {
    ContactFolder {
        id: id.to_string(),
        display_name: name.to_string(),
        parent_folder_id: Some(parent.to_string()),
    }
}

pub fn calendar(id: &str, name: &str) -> Calendar {
    Calendar {
        id: id.to_string(),
        name: name.to_string(),
        change_key: Some(format!("ck-{id}")),
        color: CalendarColor::LightBlue,
    }
}

/// Scripted mailbox. Lookups of unknown ids answer `NotFound`.
#[derive(Default)]
pub struct FakeMailbox {
    pub root_error: Option<ApiError>,
    pub mail_children: HashMap<String, Vec<MailFolder>>,
    pub contact_children: HashMap<String, Vec<ContactFolder>>,
    pub mail_child_errors: HashMap<String, ApiError>,
    pub calendars: Vec<Calendar>,
    /// Folders `get_mail_folder` refuses, although the name lookup finds them.
    pub hidden_by_id: Vec<String>,
    /// Extra folders only reachable through the display-name lookup.
    pub extra_by_name: Vec<MailFolder>,
    /// Canned answers for the display-name lookup, keyed by name.
    pub by_name_override: HashMap<String, Vec<MailFolder>>,
    pub contact_folders: HashMap<String, ContactFolder>,
    pub raw: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mail_children(mut self, parent: &str, folders: Vec<MailFolder>) -> Self {
        self.mail_children.insert(parent.to_string(), folders);
        self
    }

    pub fn with_contact_children(mut self, parent: &str, folders: Vec<ContactFolder>) -> Self {
        for f in &folders {
            self.contact_folders.insert(f.id.clone(), f.clone());
        }
        self.contact_children.insert(parent.to_string(), folders);
        self
    }

    pub fn with_calendars(mut self, calendars: Vec<Calendar>) -> Self {
        self.calendars = calendars;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn all_mail_folders(&self) -> impl Iterator<Item = &MailFolder> {
        self.mail_children
            .values()
            .flatten()
            .chain(self.extra_by_name.iter())
    }
}

impl MailboxApi for FakeMailbox {
    fn get_root_folder(&self) -> Result<FolderRef, ApiError> {
        self.record("root".into());
        match &self.root_error {
            Some(e) => Err(e.clone()),
            None => Ok(FolderRef {
                id: ROOT_ID.to_string(),
            }),
        }
    }

    fn list_child_mail_folders(&self, parent_id: &str) -> Result<Vec<MailFolder>, ApiError> {
        self.record(format!("mail_children {parent_id}"));
        if let Some(e) = self.mail_child_errors.get(parent_id) {
            return Err(e.clone());
        }
        Ok(self.mail_children.get(parent_id).cloned().unwrap_or_default())
    }

    fn list_child_contact_folders(
        &self,
        parent_id: &str,
    ) -> Result<Vec<ContactFolder>, ApiError> {
        self.record(format!("contact_children {parent_id}"));
        Ok(self
            .contact_children
            .get(parent_id)
            .cloned()
            .unwrap_or_default())
    }

    fn list_calendars(&self) -> Result<Vec<Calendar>, ApiError> {
        self.record("calendars".into());
        Ok(self.calendars.clone())
    }

    fn get_mail_folder(&self, id: &str) -> Result<MailFolder, ApiError> {
        self.record(format!("mail_folder {id}"));
        if self.hidden_by_id.iter().any(|h| h == id) {
            return Err(ApiError::NotFound(format!("{id} cannot be opened")));
        }
        if id == ROOT_ID {
            return Ok(mail_folder(ROOT_ID, "Top of Information Store", "", 1));
        }
        self.all_mail_folders()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn find_mail_folders_by_display_name(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<MailFolder>, ApiError> {
        self.record(format!("by_name {name} {limit}"));
        if let Some(canned) = self.by_name_override.get(name) {
            return Ok(canned.iter().take(limit).cloned().collect());
        }
        Ok(self
            .all_mail_folders()
            .filter(|f| f.display_name == name)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_contact_folder(&self, id: &str) -> Result<ContactFolder, ApiError> {
        self.record(format!("contact_folder {id}"));
        self.contact_folders
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn get_calendar(&self, id: &str) -> Result<Calendar, ApiError> {
        self.record(format!("calendar {id}"));
        self.calendars
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    fn raw_get(&self, path: &str) -> Result<String, ApiError> {
        self.record(format!("raw {path}"));
        self.raw
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.to_string()))
    }
}

/// Hands out the same fake for every grant and remembers the tokens it saw.
pub struct FakeConnector {
    api: Arc<FakeMailbox>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl Connector for FakeConnector {
    fn connect(&self, grant: &Grant) -> Arc<dyn MailboxApi> {
        self.tokens.lock().unwrap().push(grant.access_token.clone());
        self.api.clone()
    }
}

#[derive(Debug)]
pub struct AuthScript {
    pub interactive: Result<Grant, AuthError>,
    pub silent: Result<Grant, AuthError>,
    pub requests: usize,
    pub silent_calls: usize,
    pub last_previous: Option<UserIdentity>,
    /// How long `acquire_silent` takes, standing in for a token refresh round trip.
    pub silent_delay: Option<Duration>,
}

/// Sign-in that returns whatever the shared script says.
#[derive(Clone)]
pub struct FakeAuth {
    pub script: Arc<Mutex<AuthScript>>,
}

pub fn grant(token: &str) -> Grant {
    Grant {
        access_token: token.to_string(),
        identity: UserIdentity::new(USER),
    }
}

impl FakeAuth {
    pub fn succeeding() -> Self {
        Self::with(Ok(grant("token-1")))
    }

    pub fn with(interactive: Result<Grant, AuthError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(AuthScript {
                interactive,
                silent: Ok(grant("token-2")),
                requests: 0,
                silent_calls: 0,
                last_previous: None,
                silent_delay: None,
            })),
        }
    }

    pub fn set_interactive(&self, outcome: Result<Grant, AuthError>) {
        self.script.lock().unwrap().interactive = outcome;
    }

    pub fn set_silent(&self, outcome: Result<Grant, AuthError>) {
        self.script.lock().unwrap().silent = outcome;
    }

    pub fn set_silent_delay(&self, delay: Duration) {
        self.script.lock().unwrap().silent_delay = Some(delay);
    }

    pub fn requests(&self) -> usize {
        self.script.lock().unwrap().requests
    }
}

impl Authenticator for FakeAuth {
    fn request(&self, previous: Option<&UserIdentity>) -> Result<Grant, AuthError> {
        let mut s = self.script.lock().unwrap();
        s.requests += 1;
        s.last_previous = previous.cloned();
        s.interactive.clone()
    }

    fn acquire_silent(&self, _user: &UserIdentity) -> Result<Grant, AuthError> {
        let (outcome, delay) = {
            let mut s = self.script.lock().unwrap();
            s.silent_calls += 1;
            (s.silent.clone(), s.silent_delay)
        };
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        outcome
    }
}

pub struct Harness {
    pub viewer: MailboxViewer,
    pub api: Arc<FakeMailbox>,
    pub auth: FakeAuth,
    pub tokens: Arc<Mutex<Vec<String>>>,
}

pub fn harness(api: FakeMailbox, auth: FakeAuth) -> Harness {
    let api = Arc::new(api);
    let tokens = Arc::new(Mutex::new(Vec::new()));
    let connector = FakeConnector {
        api: api.clone(),
        tokens: tokens.clone(),
    };
    let viewer = MailboxViewer::new(Box::new(auth.clone()), Box::new(connector));
    Harness {
        viewer,
        api,
        auth,
        tokens,
    }
}
