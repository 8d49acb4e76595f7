use serde::Deserialize;
use std::fmt;

/// Minimal handle of the mailbox root folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FolderRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailFolder {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub child_folder_count: i32,
    #[serde(default)]
    pub total_item_count: i32,
    #[serde(default)]
    pub unread_item_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactFolder {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub parent_folder_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Calendar {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub change_key: Option<String>,
    #[serde(default)]
    pub color: CalendarColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CalendarColor {
    #[default]
    Auto,
    LightBlue,
    LightGreen,
    LightOrange,
    LightGray,
    LightYellow,
    LightTeal,
    LightPink,
    LightBrown,
    LightRed,
    MaxColor,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CalendarColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalendarColor::Auto => "Auto",
            CalendarColor::LightBlue => "LightBlue",
            CalendarColor::LightGreen => "LightGreen",
            CalendarColor::LightOrange => "LightOrange",
            CalendarColor::LightGray => "LightGray",
            CalendarColor::LightYellow => "LightYellow",
            CalendarColor::LightTeal => "LightTeal",
            CalendarColor::LightPink => "LightPink",
            CalendarColor::LightBrown => "LightBrown",
            CalendarColor::LightRed => "LightRed",
            CalendarColor::MaxColor => "MaxColor",
            CalendarColor::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One page of an OData collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
