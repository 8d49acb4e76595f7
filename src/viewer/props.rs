use log::{debug, info};
use std::fmt;

use crate::api::{ApiError, MailboxApi};
use crate::api::models::{Calendar, CalendarColor, ContactFolder, MailFolder};
use crate::domain::folder::{FolderInfo, FolderKind};
use crate::error::ViewerError;

pub const GRID_COLUMNS: [&str; 3] = ["Property", "Value", "Type"];

/// The display-name lookup asks for two so that an ambiguous name is detectable.
const FALLBACK_LIMIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Int(i32),
    Text(String),
    Color(CalendarColor),
    Null,
}

impl PropertyValue {
    /// Name of the value's type, shown in the grid's third column.
    pub fn type_label(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "i32",
            PropertyValue::Text(_) => "String",
            PropertyValue::Color(_) => "CalendarColor",
            PropertyValue::Null => "null",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Color(c) => write!(f, "{c}"),
            PropertyValue::Null => Ok(()),
        }
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<Option<&str>> for PropertyValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(PropertyValue::Null, PropertyValue::from)
    }
}

impl From<CalendarColor> for PropertyValue {
    fn from(v: CalendarColor) -> Self {
        PropertyValue::Color(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub name: &'static str,
    pub value: PropertyValue,
}

impl PropertyRow {
    fn new(name: &'static str, value: impl Into<PropertyValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    pub fn type_label(&self) -> &'static str {
        self.value.type_label()
    }
}

pub fn mail_folder_rows(f: &MailFolder) -> Vec<PropertyRow> {
    vec![
        PropertyRow::new("ChildFolderCount", f.child_folder_count),
        PropertyRow::new("DisplayName", f.display_name.as_str()),
        PropertyRow::new("Id", f.id.as_str()),
        PropertyRow::new("ParentFolderId", f.parent_folder_id.as_deref()),
        PropertyRow::new("TotalItemCount", f.total_item_count),
        PropertyRow::new("UnreadItemCount", f.unread_item_count),
    ]
}

pub fn contact_folder_rows(f: &ContactFolder) -> Vec<PropertyRow> {
    vec![
        PropertyRow::new("DisplayName", f.display_name.as_str()),
        PropertyRow::new("Id", f.id.as_str()),
        PropertyRow::new("ParentFolderId", f.parent_folder_id.as_deref()),
    ]
}

pub fn calendar_rows(c: &Calendar) -> Vec<PropertyRow> {
    vec![
        PropertyRow::new("ChangeKey", c.change_key.as_deref()),
        PropertyRow::new("Color", c.color),
        PropertyRow::new("Id", c.id.as_str()),
        PropertyRow::new("Name", c.name.as_str()),
    ]
}

/// Get a mail folder by id, falling back to a display-name lookup when the
/// service refuses the id (it does so for the RSS Feeds folder).
pub fn fetch_mail_folder(
    api: &dyn MailboxApi,
    id: &str,
    display_name: &str,
) -> Result<MailFolder, ViewerError> {
    match api.get_mail_folder(id) {
        Ok(folder) => Ok(folder),
        Err(ApiError::NotFound(msg)) => {
            info!("folder {id} not found by id ({msg}); looking up \"{display_name}\" by name");
            let mut matches = api.find_mail_folders_by_display_name(display_name, FALLBACK_LIMIT)?;
            if matches.len() != 1 {
                return Err(ViewerError::AmbiguousOrMissingFallbackMatch {
                    name: display_name.to_string(),
                    matches: matches.len(),
                });
            }
            Ok(matches.remove(0))
        }
        Err(e) => Err(e.into()),
    }
}

/// Properties to show for a node. `None` for nodes that have none (the calendar group).
pub fn fetch_properties(
    api: &dyn MailboxApi,
    info: &FolderInfo,
    label: &str,
) -> Result<Option<Vec<PropertyRow>>, ViewerError> {
    debug!("fetching properties of {} {}", info.kind.label(), info.id);
    let rows = match info.kind {
        FolderKind::Message | FolderKind::MsgFolderRoot => {
            mail_folder_rows(&fetch_mail_folder(api, &info.id, label)?)
        }
        FolderKind::Contact => contact_folder_rows(&api.get_contact_folder(&info.id)?),
        FolderKind::Calendar => calendar_rows(&api.get_calendar(&info.id)?),
        FolderKind::DummyCalendarRoot => return Ok(None),
    };
    Ok(Some(rows))
}

/// Contents of the property grid. Columns exist only while rows are shown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropertyGrid {
    pub columns: Vec<&'static str>,
    pub rows: Vec<PropertyRow>,
}

impl PropertyGrid {
    pub fn clear(&mut self) {
        self.rows.clear();
        self.columns.clear();
    }

    pub fn show(&mut self, rows: Vec<PropertyRow>) {
        self.columns = GRID_COLUMNS.to_vec();
        self.rows = rows;
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
