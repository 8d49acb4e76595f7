use ratatui::layout::Rect;
use ratatui::widgets::{ListState, TableState};

use crate::terminal::events::ClickTracker;
use crate::viewer::MailboxViewer;
use crate::viewer::tree::{FlatRow, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Grid,
}

pub struct AppState {
    pub viewer: MailboxViewer,

    /// Visible tree rows, rebuilt every frame.
    pub rows: Vec<FlatRow>,
    pub list_state: ListState,
    /// Row under the cursor: node id and whether it is that node's placeholder line.
    pub cursor: Option<(NodeId, bool)>,

    pub grid_state: TableState,
    pub focus: Focus,

    /// Where the tree list was last drawn (inside its border), for mouse hit tests.
    pub tree_area: Rect,
    pub clicks: ClickTracker,

    pub status: Option<String>,
    pub editor_scroll: u16,
}

impl AppState {
    pub fn new(viewer: MailboxViewer) -> Self {
        Self {
            viewer,
            rows: vec![],
            list_state: ListState::default(),
            cursor: None,
            grid_state: TableState::default(),
            focus: Focus::Tree,
            tree_area: Rect::default(),
            clicks: ClickTracker::default(),
            status: None,
            editor_scroll: 0,
        }
    }

    /// Re-read the tree and keep the cursor on the same node if it is still visible.
    pub fn refresh_rows(&mut self) {
        self.rows = self.viewer.tree().flatten();
        if self.rows.is_empty() {
            self.list_state.select(None);
            self.cursor = None;
            return;
        }

        let pos = self.cursor.and_then(|(id, placeholder)| {
            self.rows
                .iter()
                .position(|r| r.id == id && r.is_placeholder == placeholder)
        });
        let idx = pos
            .or(self.list_state.selected())
            .unwrap_or(0)
            .min(self.rows.len() - 1);
        self.list_state.select(Some(idx));
        self.cursor = Some((self.rows[idx].id, self.rows[idx].is_placeholder));
    }

    pub fn selected_row(&self) -> Option<&FlatRow> {
        self.rows.get(self.list_state.selected()?)
    }

    /// Put the cursor on `idx` and select that node in the viewer.
    pub fn select_index(&mut self, idx: usize) {
        let Some(row) = self.rows.get(idx) else {
            return;
        };
        let (id, placeholder) = (row.id, row.is_placeholder);
        self.list_state.select(Some(idx));
        self.cursor = Some((id, placeholder));
        if !placeholder && self.viewer.selection() != Some(id) {
            self.viewer.select(id);
            self.grid_state.select(None);
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.rows.is_empty() {
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as i32;
        let len = self.rows.len() as i32;
        let next = (cur + delta).clamp(0, len - 1) as usize;
        self.select_index(next);
    }

    /// Move the cursor to the parent of the current node.
    pub fn select_parent(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let parent = if row.is_placeholder {
            Some(row.id)
        } else {
            self.viewer.tree().get(row.id).and_then(|n| n.parent)
        };
        if let Some(parent) = parent
            && let Some(idx) = self
                .rows
                .iter()
                .position(|r| r.id == parent && !r.is_placeholder)
        {
            self.select_index(idx);
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Grid,
            Focus::Grid => Focus::Tree,
        };
    }

    pub fn move_grid(&mut self, delta: i32) {
        let len = self.viewer.grid().rows.len() as i32;
        if len == 0 {
            self.grid_state.select(None);
            return;
        }
        let cur = self.grid_state.selected().unwrap_or(0) as i32;
        self.grid_state
            .select(Some((cur + delta).clamp(0, len - 1) as usize));
    }
}
