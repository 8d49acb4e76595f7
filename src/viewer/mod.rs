//! Mailbox viewer screen: session lifecycle, lazy folder tree and property grid.
//!
//! All state lives on the UI thread. Network calls run on worker threads
//! through [`dispatch::Dispatcher`]; their results come back as
//! [`dispatch::Completion`]s that [`MailboxViewer::pump`] applies.

pub mod dispatch;
pub mod props;
pub mod tree;

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{ApiError, Connector, MailboxApi};
use crate::auth::{Authenticator, Grant, UserIdentity, claims};
use crate::domain::folder::{FolderInfo, FolderKind};
use crate::error::ViewerError;
use crate::viewer::dispatch::{Completion, Dispatcher};
use crate::viewer::props::PropertyGrid;
use crate::viewer::tree::{FolderTree, NewNode, NodeId};

pub const MSG_FOLDER_ROOT_LABEL: &str = "MsgFolderRoot";
pub const CALENDAR_ROOT_LABEL: &str = "Calendar Folders (Dummy Folder)";

/// How the user asked for an expand or collapse. Double clicks never change expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Glyph,
    Keyboard,
    DoubleClick,
}

/// Which menu actions are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub new_session: bool,
    pub close_session: bool,
}

impl MenuState {
    fn idle() -> Self {
        Self {
            new_session: true,
            close_session: false,
        }
    }

    fn in_session() -> Self {
        Self {
            new_session: false,
            close_session: true,
        }
    }
}

/// A modal message waiting for the user to dismiss it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub informational: bool,
}

impl From<&ViewerError> for Notice {
    fn from(e: &ViewerError) -> Self {
        Self {
            message: e.to_string(),
            informational: e.is_informational(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorWindow {
    pub input: String,
    pub response: Option<String>,
    pub busy: bool,
}

/// Secondary windows, shown stacked over the main screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    ContentTable { label: String, info: FolderInfo },
    Editor(EditorWindow),
    TokenViewer {
        identity: String,
        claims: Vec<(String, String)>,
    },
}

struct Session {
    grant: Grant,
    api: Arc<dyn MailboxApi>,
}

pub struct MailboxViewer {
    authenticator: Arc<dyn Authenticator>,
    connector: Arc<dyn Connector>,
    session: Option<Session>,
    last_identity: Option<UserIdentity>,
    tree: FolderTree,
    grid: PropertyGrid,
    menu: MenuState,
    notices: VecDeque<Notice>,
    windows: Vec<Window>,
    selection: Option<NodeId>,
    select_ticket: u64,
    dispatcher: Dispatcher,
}

impl MailboxViewer {
    pub fn new(authenticator: Box<dyn Authenticator>, connector: Box<dyn Connector>) -> Self {
        Self {
            authenticator: Arc::from(authenticator),
            connector: Arc::from(connector),
            session: None,
            last_identity: None,
            tree: FolderTree::new(),
            grid: PropertyGrid::default(),
            menu: MenuState::idle(),
            notices: VecDeque::new(),
            windows: Vec::new(),
            selection: None,
            select_ticket: 0,
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn title() -> String {
        let mut title = format!("Office365 Mailbox Viewer - {}", env!("CARGO_PKG_VERSION"));
        if cfg!(debug_assertions) {
            title.push_str(" [DEBUG]");
        }
        title.push_str(" - Mailbox Viewer");
        title
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn grid(&self) -> &PropertyGrid {
        &self.grid
    }

    pub fn menu(&self) -> MenuState {
        self.menu
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|s| &s.grant.identity)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) -> bool {
        self.notices.pop_front().is_some()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn top_window(&self) -> Option<&Window> {
        self.windows.last()
    }

    fn notify(&mut self, e: ViewerError) {
        if e.is_informational() {
            info!("{e}");
        } else {
            warn!("{e}");
        }
        self.notices.push_back(Notice::from(&e));
    }

    fn notify_text(&mut self, message: &str) {
        self.notices.push_back(Notice {
            message: message.to_string(),
            informational: true,
        });
    }

    fn api(&self) -> Option<Arc<dyn MailboxApi>> {
        self.session.as_ref().map(|s| Arc::clone(&s.api))
    }

    // ----- Session -----

    /// Sign in and load the top of the folder hierarchy.
    ///
    /// Returns `false`, leaving everything as it was, when a session is already
    /// open or sign-in did not succeed.
    pub fn new_session(&mut self) -> bool {
        if self.session.is_some() {
            debug!("new session ignored: one is already open");
            return false;
        }

        let grant = match self.authenticator.request(self.last_identity.as_ref()) {
            Ok(g) => g,
            Err(e) => {
                self.notify(e.into());
                return false;
            }
        };

        let api = self.connector.connect(&grant);
        info!("session started for {}", grant.identity.username);
        self.last_identity = Some(grant.identity.clone());
        self.session = Some(Session {
            grant,
            api: Arc::clone(&api),
        });
        self.menu = MenuState::in_session();

        let generation = self.tree.generation();
        let root_api = Arc::clone(&api);
        let _ = self.dispatcher.spawn("msg-folder-root", move || Completion::RootFolder {
            generation,
            result: root_api.get_root_folder(),
        });

        let calendar_root = self.tree.push_root(NewNode::leaf(
            CALENDAR_ROOT_LABEL,
            FolderInfo::dummy_calendar_root(),
        ));
        let _ = self.dispatcher.spawn("calendars", move || Completion::Calendars {
            parent: calendar_root,
            result: api.list_calendars(),
        });

        true
    }

    /// Drop the client, clear the grid and the tree. Safe to call without a session.
    pub fn close_session(&mut self) {
        if let Some(s) = self.session.take() {
            info!("session closed for {}", s.grant.identity.username);
        }
        self.grid.clear();
        self.tree.clear();
        self.selection = None;
        self.select_ticket += 1;
        self.menu = MenuState::idle();
    }

    // ----- Tree interaction -----

    /// Called before a node opens. Returns whether it opened.
    ///
    /// The first expand of a mail or contact node starts loading its children.
    pub fn before_expand(&mut self, id: NodeId, interaction: Interaction) -> bool {
        if interaction == Interaction::DoubleClick {
            debug!("expand suppressed after double click");
            return false;
        }
        let Some(node) = self.tree.get(id) else {
            return false;
        };

        if node.info.kind.loads_lazily() && !node.info.expanded {
            let Some(api) = self.api() else {
                return false;
            };
            let Some(folder_id) = self.tree.begin_load(id) else {
                return false;
            };
            self.load_children(id, folder_id, api);
            return true;
        }

        if !node.is_expandable() {
            return false;
        }
        self.tree.set_open(id, true)
    }

    /// Called before a node closes. Returns whether it closed.
    pub fn before_collapse(&mut self, id: NodeId, interaction: Interaction) -> bool {
        if interaction == Interaction::DoubleClick {
            debug!("collapse suppressed after double click");
            return false;
        }
        self.tree.set_open(id, false)
    }

    pub fn toggle(&mut self, id: NodeId, interaction: Interaction) -> bool {
        let Some(open) = self.tree.get(id).map(|n| n.open) else {
            return false;
        };
        if open {
            self.before_collapse(id, interaction)
        } else {
            self.before_expand(id, interaction)
        }
    }

    /// Double click opens the folder's content table; expansion is left alone.
    pub fn double_click(&mut self, id: NodeId) {
        self.open_content_table(id);
    }

    fn load_children(&mut self, parent: NodeId, folder_id: String, api: Arc<dyn MailboxApi>) {
        debug!("loading children of {folder_id}");
        let mail_api = Arc::clone(&api);
        let mail_id = folder_id.clone();
        let mail_started = self
            .dispatcher
            .spawn("child-mail-folders", move || Completion::ChildMailFolders {
                parent,
                result: mail_api.list_child_mail_folders(&mail_id),
            });
        let contact_started = self
            .dispatcher
            .spawn("child-contact-folders", move || Completion::ChildContactFolders {
                parent,
                result: api.list_child_contact_folders(&folder_id),
            });

        // a fetch that never started still counts as finished
        for started in [mail_started, contact_started] {
            if !started {
                self.tree.finish_fetch(parent);
            }
        }
    }

    /// Select a node and load its properties into the grid.
    ///
    /// The token is refreshed and the properties fetched on a worker; the grid
    /// is cleared right away.
    pub fn select(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let info = node.info.clone();
        let label = node.label.clone();
        self.selection = Some(id);
        self.select_ticket += 1;

        let Some(identity) = self.identity().cloned() else {
            return;
        };
        self.grid.clear();

        let ticket = self.select_ticket;
        let authenticator = Arc::clone(&self.authenticator);
        let connector = Arc::clone(&self.connector);
        let _ = self
            .dispatcher
            .spawn("folder-properties", move || match authenticator.acquire_silent(&identity) {
                Ok(grant) => {
                    let api = connector.connect(&grant);
                    Completion::Properties {
                        ticket,
                        result: props::fetch_properties(api.as_ref(), &info, &label),
                        grant: Some(grant),
                    }
                }
                Err(e) => Completion::Properties {
                    ticket,
                    grant: None,
                    result: Err(ViewerError::TokenRefresh(e.to_string())),
                },
            });
    }

    // ----- Windows -----

    pub fn open_content_table(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.info.kind.is_real_folder() {
            return;
        }
        debug!("opening content table of {}", node.label);
        self.windows.push(Window::ContentTable {
            label: node.label.clone(),
            info: node.info.clone(),
        });
    }

    pub fn new_editor(&mut self) {
        if self
            .windows
            .iter()
            .any(|w| matches!(w, Window::Editor(_)))
        {
            self.notify(ViewerError::DuplicateEditorWindow);
            return;
        }
        self.windows.push(Window::Editor(EditorWindow::default()));
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorWindow> {
        self.windows.iter_mut().find_map(|w| match w {
            Window::Editor(e) => Some(e),
            _ => None,
        })
    }

    /// Run the editor's request. Returns whether one was sent.
    pub fn submit_editor(&mut self) -> bool {
        let Some(api) = self.api() else {
            self.notify_text("Start a session before sending requests.");
            return false;
        };
        let Some(editor) = self.editor_mut() else {
            return false;
        };
        let path = editor.input.trim().to_string();
        if path.is_empty() || editor.busy {
            return false;
        }
        editor.busy = true;
        editor.response = None;
        let started = self
            .dispatcher
            .spawn("editor-request", move || Completion::EditorResponse {
                result: api.raw_get(&path),
            });
        if !started && let Some(editor) = self.editor_mut() {
            editor.busy = false;
        }
        started
    }

    pub fn open_token_viewer(&mut self) {
        let Some(session) = &self.session else {
            self.notify_text("No access token: start a session first.");
            return;
        };
        let window = Window::TokenViewer {
            identity: session.grant.identity.username.clone(),
            claims: claims::claim_rows(&session.grant.access_token),
        };
        self.windows.push(window);
    }

    pub fn close_window(&mut self) -> bool {
        self.windows.pop().is_some()
    }

    // ----- Completions -----

    /// Apply every completion that has arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(c) = self.dispatcher.try_next() {
            self.apply(c);
            applied += 1;
        }
        applied
    }

    /// Apply completions until nothing is in flight or `timeout` passes.
    /// Returns whether everything finished.
    pub fn pump_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.dispatcher.in_flight() > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if let Some(c) = self.dispatcher.next_timeout(deadline - now) {
                self.apply(c);
            }
        }
        true
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::RootFolder { generation, result } => {
                if generation != self.tree.generation() {
                    debug!("dropping root folder from a closed session");
                    return;
                }
                match result {
                    Ok(root) => {
                        self.tree.insert_root_first(NewNode::lazy(
                            MSG_FOLDER_ROOT_LABEL,
                            FolderInfo::new(root.id, FolderKind::MsgFolderRoot),
                        ));
                    }
                    Err(e) => self.notify(e.into()),
                }
            }

            Completion::Calendars { parent, result } => {
                if self.tree.get(parent).is_none() {
                    return;
                }
                match result {
                    Ok(calendars) => {
                        let batch = calendars
                            .into_iter()
                            .map(|c| NewNode::leaf(c.name, FolderInfo::new(c.id, FolderKind::Calendar)))
                            .collect();
                        self.tree.append_children(parent, batch);
                    }
                    Err(e) => self.notify(e.into()),
                }
            }

            Completion::ChildMailFolders { parent, result } => {
                let batch = result.map(|folders| {
                    folders
                        .into_iter()
                        .map(|f| {
                            let info = FolderInfo::new(f.id, FolderKind::Message);
                            if f.child_folder_count >= 1 {
                                NewNode::lazy(f.display_name, info)
                            } else {
                                NewNode::leaf(f.display_name, info)
                            }
                        })
                        .collect()
                });
                self.apply_children(parent, batch);
            }

            Completion::ChildContactFolders { parent, result } => {
                let batch = result.map(|folders| {
                    folders
                        .into_iter()
                        .map(|f| {
                            NewNode::lazy(f.display_name, FolderInfo::new(f.id, FolderKind::Contact))
                        })
                        .collect()
                });
                self.apply_children(parent, batch);
            }

            Completion::Properties {
                ticket,
                grant,
                result,
            } => {
                if ticket != self.select_ticket {
                    debug!("dropping properties of a previous selection");
                    return;
                }
                if let Some(grant) = grant
                    && self.session.is_some()
                {
                    let api = self.connector.connect(&grant);
                    self.session = Some(Session { grant, api });
                }
                self.grid.clear();
                match result {
                    Ok(Some(rows)) => self.grid.show(rows),
                    Ok(None) => {}
                    Err(e) => self.notify(e),
                }
            }

            Completion::EditorResponse { result } => {
                let Some(editor) = self.editor_mut() else {
                    return;
                };
                editor.busy = false;
                editor.response = Some(match result {
                    Ok(body) => pretty_json(&body),
                    Err(e) => e.to_string(),
                });
            }
        }
    }

    fn apply_children(&mut self, parent: NodeId, batch: Result<Vec<NewNode>, ApiError>) {
        if self.tree.get(parent).is_none() {
            debug!("dropping child folders for a node that no longer exists");
            return;
        }
        match batch {
            Ok(batch) => {
                if let Some(a) = self.tree.append_children(parent, batch)
                    && a.placeholder_removed
                {
                    debug!("placeholder replaced by {} children", a.added);
                }
            }
            Err(e) => self.notify(e.into()),
        }
        self.tree.finish_fetch(parent);
    }
}

fn pretty_json(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or_else(|_| body.to_string())
}
