use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;

use o365_mailbox_viewer::api::outlook::OutlookConnector;
use o365_mailbox_viewer::auth::{token_manager::TokenManager, token_store};
use o365_mailbox_viewer::config::{Config, load_config, resolve_log_path};
use o365_mailbox_viewer::terminal::run_tui;
use o365_mailbox_viewer::viewer::MailboxViewer;

#[derive(Parser)]
#[command(name = "o365_mailbox_viewer")]
#[command(about = "Browse the folder hierarchy of an Office 365 mailbox", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the mailbox viewer (default)
    Tui,

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

/// The terminal owns stdout and stderr while the viewer runs, so logs go to a file.
fn init_logging(cfg: &Config) -> Result<()> {
    let path = resolve_log_path(cfg)?;
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd.unwrap_or(Command::Tui) {
        Command::SetClientSecret { client_id } => {
            env_logger::init();
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            let secret = secret.trim();
            token_store::save_client_secret(&client_id, secret)?;
            println!("Saved client secret for client_id {}", client_id);
            Ok(())
        }

        Command::Tui => {
            let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
            init_logging(&cfg)?;

            let token_mgr = TokenManager::from_config(&cfg)?;
            let connector = OutlookConnector::new(cfg.api_base())?;
            let viewer = MailboxViewer::new(Box::new(token_mgr), Box::new(connector));
            run_tui(viewer)
        }
    }
}
