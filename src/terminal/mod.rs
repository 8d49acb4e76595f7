pub mod events;
pub mod state;
pub mod ui;

use anyhow::{Result, anyhow};
use log::info;
use ratatui::DefaultTerminal;
use ratatui::crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
};
use std::time::Duration;

use crate::terminal::events::{Action, handle_key, handle_mouse};
use crate::terminal::state::AppState;
use crate::viewer::MailboxViewer;

/// How long to wait for input before checking for finished requests.
const TICK: Duration = Duration::from_millis(100);

pub fn run_tui(viewer: MailboxViewer) -> Result<()> {
    color_eyre::install().map_err(|e| anyhow!("{e}"))?;

    let mut terminal = ratatui::init();
    execute!(std::io::stdout(), EnableMouseCapture)?;
    info!("{}", MailboxViewer::title());

    let mut state = AppState::new(viewer);
    let result = run(&mut terminal, &mut state);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, state: &mut AppState) -> Result<()> {
    loop {
        state.viewer.pump();
        state.refresh_rows();
        terminal.draw(|f| ui::render(f, state))?;

        if !event::poll(TICK)? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(key, state)?,
            Event::Mouse(ev) => {
                handle_mouse(ev, state);
                Action::None
            }
            _ => Action::None,
        };

        match action {
            Action::None => {}
            Action::Quit => break,
            Action::SignIn => {
                state.status = Some("Signing in… complete sign-in in your browser".into());
                terminal.draw(|f| ui::render(f, state))?;
                state.viewer.new_session();
                state.status = None;
            }
        }
    }
    Ok(())
}
