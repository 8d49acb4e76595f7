use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
};

use crate::terminal::state::{AppState, Focus};
use crate::viewer::tree::{FlatRow, Glyph};
use crate::viewer::{EditorWindow, MailboxViewer, Window};

pub fn render(f: &mut Frame, state: &mut AppState) {
    let [menu_area, body, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(f.area());

    render_menu(f, menu_area, &state.viewer);

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
            .areas(body);

    let border = |focused: bool| {
        Style::default().fg(if focused {
            Color::Yellow
        } else {
            Color::DarkGray
        })
    };

    // LEFT: folder tree
    let tree_block = Block::default()
        .title(" Mailbox ")
        .borders(Borders::ALL)
        .border_style(border(state.focus == Focus::Tree));
    state.tree_area = tree_block.inner(left);

    let items: Vec<ListItem> = state.rows.iter().map(tree_item).collect();
    let list = List::new(items)
        .block(tree_block)
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_stateful_widget(list, left, &mut state.list_state);

    // RIGHT: property grid
    let grid_block = Block::default()
        .title(" Folder properties ")
        .borders(Borders::ALL)
        .border_style(border(state.focus == Focus::Grid));
    let grid = state.viewer.grid();
    if grid.columns.is_empty() {
        let hint = if state.viewer.has_session() {
            "Select a folder to see its properties."
        } else {
            "Press n to start a new session."
        };
        f.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::Gray))
                .block(grid_block),
            right,
        );
    } else {
        let header = Row::new(grid.columns.iter().map(|c| Cell::from(*c)))
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = grid.rows.iter().map(|r| {
            Row::new(vec![
                Cell::from(r.name),
                Cell::from(r.value.to_string()),
                Cell::from(r.type_label()).style(Style::default().fg(Color::Gray)),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(18),
                Constraint::Fill(1),
                Constraint::Length(14),
            ],
        )
        .header(header)
        .block(grid_block)
        .row_highlight_style(Style::default().fg(Color::Green));
        f.render_stateful_widget(table, right, &mut state.grid_state);
    }

    render_status(f, status_area, state);

    if let Some(window) = state.viewer.top_window() {
        render_window(f, window, state.editor_scroll);
    }
    if let Some(notice) = state.viewer.notice() {
        let area = centered(f.area(), 60, 7);
        f.render_widget(Clear, area);
        let (title, color) = if notice.informational {
            (" Office365 Mailbox Viewer ", Color::Cyan)
        } else {
            (" Error ", Color::Red)
        };
        let p = Paragraph::new(vec![
            Line::from(notice.message.clone()),
            Line::from(""),
            Line::from(Span::styled("[Enter] OK", Style::default().fg(Color::Gray))),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        f.render_widget(p, area);
    }
}

fn tree_item(row: &FlatRow) -> ListItem<'static> {
    let indent = "  ".repeat(row.depth);
    if row.is_placeholder {
        return ListItem::new(Line::from(Span::styled(
            format!("{indent}  loading…"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    let glyph = match row.glyph {
        Glyph::Leaf => "  ",
        Glyph::Closed => "▸ ",
        Glyph::Open => "▾ ",
    };
    ListItem::new(Line::from(vec![
        Span::raw(indent),
        Span::styled(glyph, Style::default().fg(Color::Yellow)),
        Span::raw(row.label.clone()),
    ]))
}

fn render_menu(f: &mut Frame, area: Rect, viewer: &MailboxViewer) {
    let menu = viewer.menu();
    let item = |key: &'static str, label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        vec![
            Span::styled(key, style.add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {label}  "), style),
        ]
    };
    let mut spans = vec![Span::styled(
        format!("{}  ", MailboxViewer::title()),
        Style::default().fg(Color::Cyan),
    )];
    spans.extend(item("n", "New Session", menu.new_session));
    spans.extend(item("c", "Close Session", menu.close_session));
    spans.extend(item("e", "New Editor", true));
    spans.extend(item("t", "Access Token Viewer", true));
    spans.extend(item("q", "Quit", true));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![
        Span::styled("j/k", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" move  "),
        Span::styled("l/h", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" expand/collapse  "),
        Span::styled("o", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" open content table  "),
        Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" focus  "),
    ];
    if let Some(who) = state.viewer.identity() {
        spans.push(Span::styled(
            format!("| {} ", who.username),
            Style::default().fg(Color::Cyan),
        ));
    }
    let busy = state.viewer.in_flight();
    if busy > 0 {
        spans.push(Span::styled(
            format!("| loading ({busy}) "),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(status) = &state.status {
        spans.push(Span::raw(format!("| {status}")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_window(f: &mut Frame, window: &Window, editor_scroll: u16) {
    let full = f.area();
    let area = centered(full, full.width.saturating_mul(3) / 4, full.height.saturating_mul(3) / 4);
    f.render_widget(Clear, area);

    match window {
        Window::ContentTable { label, info } => {
            let p = Paragraph::new(vec![
                Line::from(vec![Span::styled("Folder: ", bold()), Span::raw(label.clone())]),
                Line::from(vec![Span::styled("Kind:   ", bold()), Span::raw(info.kind.label())]),
                Line::from(vec![Span::styled("Id:     ", bold()), Span::raw(info.id.clone())]),
                Line::from(""),
                Line::from(Span::styled("[Esc] close", Style::default().fg(Color::Gray))),
            ])
            .wrap(Wrap { trim: false })
            .block(window_block(format!(" Content table - {label} ")));
            f.render_widget(p, area);
        }
        Window::Editor(editor) => render_editor(f, area, editor, editor_scroll),
        Window::TokenViewer { identity, claims } => {
            let rows = claims
                .iter()
                .map(|(k, v)| Row::new(vec![Cell::from(k.clone()), Cell::from(v.clone())]));
            let table = Table::new(rows, [Constraint::Length(22), Constraint::Fill(1)])
                .header(Row::new(vec!["Claim", "Value"]).style(bold()))
                .block(window_block(format!(" Access token - {identity} ")));
            f.render_widget(table, area);
        }
    }
}

fn render_editor(f: &mut Frame, area: Rect, editor: &EditorWindow, scroll: u16) {
    let block = window_block(" Request editor ".to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [input_area, body_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("GET ", bold()),
            Span::raw(editor.input.clone()),
            Span::styled("_", Style::default().fg(Color::Yellow)),
        ])),
        input_area,
    );

    let body = if editor.busy {
        "Sending…".to_string()
    } else {
        editor
            .response
            .clone()
            .unwrap_or_else(|| "Type a path such as me/MailFolders and press Enter.".to_string())
    };
    f.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        body_area,
    );
    f.render_widget(
        Paragraph::new("[Enter] send  [PgUp/PgDn] scroll  [Esc] close")
            .style(Style::default().fg(Color::Gray)),
        hint_area,
    );
}

fn window_block(title: String) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [h] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(area);
    let [v] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(h);
    v
}
