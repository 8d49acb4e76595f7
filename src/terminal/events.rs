use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use std::time::{Duration, Instant};

use crate::terminal::state::{AppState, Focus};
use crate::viewer::tree::{Glyph, NodeId};
use crate::viewer::{Interaction, Window};

/// Two presses on the same node closer together than this form a double click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Single,
    Double,
}

/// Classifies mouse presses. The result travels with the event; nothing is left set afterwards.
///
/// Presses are keyed by node, not screen row: rows shift whenever folders load.
#[derive(Debug, Default)]
pub struct ClickTracker {
    last: Option<(NodeId, Instant)>,
}

impl ClickTracker {
    pub fn classify(&mut self, node: NodeId, at: Instant) -> ClickKind {
        match self.last {
            Some((n, t)) if n == node && at.saturating_duration_since(t) <= DOUBLE_CLICK_WINDOW => {
                self.last = None;
                ClickKind::Double
            }
            _ => {
                self.last = Some((node, at));
                ClickKind::Single
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Sign-in blocks; the loop draws a status line first.
    SignIn,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> Result<Action> {
    if state.viewer.notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            state.viewer.dismiss_notice();
        }
        return Ok(Action::None);
    }

    let top_is_editor = state
        .viewer
        .top_window()
        .map(|w| matches!(w, Window::Editor(_)));
    match top_is_editor {
        Some(true) => return Ok(handle_editor_keys(key, state)),
        Some(false) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                state.viewer.close_window();
            }
            return Ok(Action::None);
        }
        None => {}
    }

    match key.code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('n') => {
            if state.viewer.menu().new_session {
                return Ok(Action::SignIn);
            }
            return Ok(Action::None);
        }
        KeyCode::Char('c') => {
            if state.viewer.menu().close_session {
                state.viewer.close_session();
                state.cursor = None;
                state.list_state.select(None);
                state.grid_state.select(None);
            }
            return Ok(Action::None);
        }
        KeyCode::Char('e') => {
            state.viewer.new_editor();
            state.editor_scroll = 0;
            return Ok(Action::None);
        }
        KeyCode::Char('t') => {
            state.viewer.open_token_viewer();
            return Ok(Action::None);
        }
        KeyCode::Tab => {
            state.toggle_focus();
            return Ok(Action::None);
        }
        _ => {}
    }

    match state.focus {
        Focus::Tree => handle_tree_keys(key, state),
        Focus::Grid => handle_grid_keys(key, state),
    }
    Ok(Action::None)
}

fn handle_tree_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Home => state.select_index(0),
        KeyCode::End => {
            if !state.rows.is_empty() {
                state.select_index(state.rows.len() - 1);
            }
        }
        KeyCode::Right | KeyCode::Char('l') => {
            if let Some(row) = state.selected_row().filter(|r| !r.is_placeholder) {
                let id = row.id;
                state.viewer.before_expand(id, Interaction::Keyboard);
            }
        }
        KeyCode::Left | KeyCode::Char('h') => {
            let current = state
                .selected_row()
                .map(|r| (r.id, !r.is_placeholder && r.glyph == Glyph::Open));
            match current {
                Some((id, true)) => {
                    state.viewer.before_collapse(id, Interaction::Keyboard);
                }
                Some((_, false)) => state.select_parent(),
                None => {}
            }
        }
        KeyCode::Char(' ') => {
            if let Some(row) = state.selected_row().filter(|r| !r.is_placeholder) {
                let id = row.id;
                state.viewer.toggle(id, Interaction::Keyboard);
            }
        }
        KeyCode::Enter | KeyCode::Char('o') => {
            if let Some(row) = state.selected_row().filter(|r| !r.is_placeholder) {
                let id = row.id;
                state.viewer.open_content_table(id);
            }
        }
        _ => {}
    }
}

fn handle_grid_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_grid(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_grid(-1),
        _ => {}
    }
}

fn handle_editor_keys(key: KeyEvent, state: &mut AppState) -> Action {
    match key.code {
        KeyCode::Esc => {
            state.viewer.close_window();
        }
        KeyCode::Enter => {
            state.editor_scroll = 0;
            state.viewer.submit_editor();
        }
        KeyCode::PageDown => state.editor_scroll = state.editor_scroll.saturating_add(10),
        KeyCode::PageUp => state.editor_scroll = state.editor_scroll.saturating_sub(10),
        KeyCode::Backspace => {
            if let Some(editor) = state.viewer.editor_mut() {
                editor.input.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(editor) = state.viewer.editor_mut() {
                editor.input.push(ch);
            }
        }
        _ => {}
    }
    Action::None
}

pub fn handle_mouse(ev: MouseEvent, state: &mut AppState) {
    if state.viewer.notice().is_some() || state.viewer.top_window().is_some() {
        return;
    }
    let area = state.tree_area;
    let inside = ev.column >= area.x
        && ev.column < area.x + area.width
        && ev.row >= area.y
        && ev.row < area.y + area.height;
    if !inside {
        return;
    }

    match ev.kind {
        MouseEventKind::ScrollDown => state.move_selection(1),
        MouseEventKind::ScrollUp => state.move_selection(-1),
        MouseEventKind::Down(MouseButton::Left) => {
            state.focus = Focus::Tree;
            let idx = state.list_state.offset() + (ev.row - area.y) as usize;
            let Some(row) = state.rows.get(idx) else {
                return;
            };
            if row.is_placeholder {
                return;
            }
            let id = row.id;
            let glyph_start = area.x + (row.depth as u16) * 2;
            let on_glyph =
                row.glyph != Glyph::Leaf && ev.column >= glyph_start && ev.column < glyph_start + 2;

            match state.clicks.classify(id, Instant::now()) {
                ClickKind::Double => state.viewer.double_click(id),
                ClickKind::Single if on_glyph => {
                    state.viewer.toggle(id, Interaction::Glyph);
                }
                ClickKind::Single => state.select_index(idx),
            }
        }
        _ => {}
    }
}
