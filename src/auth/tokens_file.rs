use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;

/// Cached access token for one user; the refresh token lives in the keyring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at_epoch: i64, // epoch seconds
}

impl CachedToken {
    /// Valid for at least another minute at `now`.
    pub fn is_fresh(&self, now: i64) -> bool {
        now + 60 < self.expires_at_epoch
    }
}

/// Contents of `tokens.json`, keyed by username.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TokensFile {
    #[serde(default)]
    pub users: BTreeMap<String, CachedToken>,
}

pub fn tokens_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("tokens.json");
    Ok(p)
}

pub fn load_from(path: &Path) -> Result<TokensFile> {
    if !path.exists() {
        return Ok(TokensFile::default());
    }
    let s = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

pub fn save_to(path: &Path, tf: &TokensFile) -> Result<()> {
    let s = serde_json::to_string_pretty(tf)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn load_token(username: &str) -> Result<Option<CachedToken>> {
    let tf = load_from(&tokens_path()?)?;
    Ok(tf.users.get(username).cloned())
}

pub fn save_token(username: &str, token: CachedToken) -> Result<()> {
    let path = tokens_path()?;
    let mut tf = load_from(&path)?;
    tf.users.insert(username.to_string(), token);
    save_to(&path, &tf)
}
