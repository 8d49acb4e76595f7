/// What a tree node stands for. Drives expand eligibility and property dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderKind {
    MsgFolderRoot,
    Message,
    Contact,
    Calendar,
    /// Synthetic parent of the calendars; not a server-side folder.
    DummyCalendarRoot,
}

impl FolderKind {
    /// Whether children are fetched on demand when the node is first expanded.
    pub fn loads_lazily(self) -> bool {
        match self {
            FolderKind::MsgFolderRoot | FolderKind::Message | FolderKind::Contact => true,
            FolderKind::Calendar | FolderKind::DummyCalendarRoot => false,
        }
    }

    /// Whether the node maps to a real folder that can be opened or queried.
    pub fn is_real_folder(self) -> bool {
        !matches!(self, FolderKind::DummyCalendarRoot)
    }

    pub fn label(self) -> &'static str {
        match self {
            FolderKind::MsgFolderRoot => "MsgFolderRoot",
            FolderKind::Message => "Message",
            FolderKind::Contact => "Contact",
            FolderKind::Calendar => "Calendar",
            FolderKind::DummyCalendarRoot => "DummyCalendarRoot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInfo {
    pub id: String,
    pub kind: FolderKind,
    /// Set once, when the children fetch has been dispatched.
    pub expanded: bool,
}

impl FolderInfo {
    pub fn new(id: impl Into<String>, kind: FolderKind) -> Self {
        Self {
            id: id.into(),
            kind,
            expanded: false,
        }
    }

    pub fn dummy_calendar_root() -> Self {
        Self::new("", FolderKind::DummyCalendarRoot)
    }
}
