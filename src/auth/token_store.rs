use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "o365_mailbox_viewer";

fn load(account: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, account);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

fn save(account: &str, secret: &str) -> Result<()> {
    Entry::new(SERVICE, account)?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))
}

/// Save a refresh token into the OS keyring for the given username
pub fn save_refresh_token(username: &str, refresh_token: &str) -> Result<()> {
    save(&format!("refresh:{username}"), refresh_token)
}

pub fn load_refresh_token(username: &str) -> Result<Option<String>> {
    load(&format!("refresh:{username}"))
}

/// Save a client secret into the keyring, keyed by client_id
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    save(&format!("client:{client_id}"), client_secret)
}

pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    load(&format!("client:{client_id}"))
}
