use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::outlook::DEFAULT_API_BASE;

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_TENANT: &str = "common";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub tenant: Option<String>,
    pub redirect_uri: Option<String>,
    /// Login hint and `X-AnchorMailbox` value; read from the token when unset.
    pub user_email: Option<String>,
    pub api_base: Option<String>,
    pub log_path: Option<String>,
}

impl Config {
    pub fn tenant(&self) -> &str {
        self.tenant.as_deref().unwrap_or(DEFAULT_TENANT)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("o365_mailbox_viewer"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_log_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("viewer.log");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            client_id: "00000000-0000-0000-0000-000000000000".to_string(),
            tenant: Some(DEFAULT_TENANT.to_string()),
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            user_email: Some("you@contoso.com".to_string()),
            api_base: None,
            log_path: None,
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {}; register an app, edit client_id and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

pub fn resolve_log_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.log_path {
        Ok(PathBuf::from(p))
    } else {
        default_log_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_unset_fields() {
        let cfg: Config = toml::from_str(r#"client_id = "abc""#).unwrap();
        assert_eq!(cfg.tenant(), "common");
        assert_eq!(cfg.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(cfg.api_base(), "https://outlook.office.com/api/v2.0");
        assert!(cfg.user_email.is_none());
    }

    #[test]
    fn missing_file_writes_a_template() {
        let path = std::env::temp_dir().join(format!(
            "o365_mailbox_viewer_config_{}.toml",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        assert!(load_config_from(&path).is_err());
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.tenant(), "common");
        let _ = fs::remove_file(&path);
    }
}
