use anyhow::Result;
use log::{debug, info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::oauth::{self, Endpoints, SignInCancelled, Tokens};
use crate::auth::tokens_file::{self, CachedToken};
use crate::auth::{AuthError, Authenticator, Grant, UserIdentity, claims, token_store};
use crate::config::Config;

/// Lifetime assumed when the token endpoint omits `expires_in` or sends one out of range.
const DEFAULT_LIFETIME_SECS: i64 = 3500;

#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub endpoints: Endpoints,
    pub login_hint: Option<String>,
}

fn now_epoch() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

/// Expiry epoch for a token issued at `now`.
fn expires_at(now: i64, expires_in: Option<u64>) -> i64 {
    expires_in
        .and_then(|s| i64::try_from(s).ok())
        .and_then(|s| now.checked_add(s))
        .unwrap_or(now + DEFAULT_LIFETIME_SECS)
}

impl TokenManager {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_secret = token_store::load_client_secret(&cfg.client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id: cfg.client_id.clone(),
            client_secret,
            redirect_uri: cfg.redirect_uri().to_string(),
            endpoints: Endpoints::for_tenant(cfg.tenant()),
            login_hint: cfg.user_email.clone(),
        })
    }

    /// Cached token if still fresh, else a refreshed one. `None` when neither is possible.
    fn silent_token(&self, username: &str) -> Result<Option<String>> {
        let now = now_epoch()?;

        if let Some(cached) = tokens_file::load_token(username)?
            && cached.is_fresh(now)
        {
            debug!("using cached access token for {username}");
            return Ok(Some(cached.access_token));
        }

        let Some(rt) = token_store::load_refresh_token(username)? else {
            return Ok(None);
        };
        info!("refreshing access token for {username}");
        let t = oauth::refresh_access_token(
            &self.endpoints,
            &self.client_id,
            self.client_secret.as_deref(),
            &rt,
        )?;
        self.remember(username, &t, now);
        Ok(Some(t.access_token))
    }

    /// Persist tokens; failures only cost a future sign-in, so they are logged.
    fn remember(&self, username: &str, t: &Tokens, now: i64) {
        let exp = expires_at(now, t.expires_in);
        let cached = CachedToken {
            access_token: t.access_token.clone(),
            expires_at_epoch: exp,
        };
        if let Err(e) = tokens_file::save_token(username, cached) {
            warn!("couldn't cache access token: {e}");
        }
        if let Some(rt) = &t.refresh_token
            && let Err(e) = token_store::save_refresh_token(username, rt)
        {
            warn!("couldn't save refresh token to keyring: {e}");
        }
    }
}

fn classify(e: anyhow::Error) -> AuthError {
    if e.downcast_ref::<SignInCancelled>().is_some() {
        AuthError::Cancelled
    } else {
        AuthError::Failed(e.to_string())
    }
}

impl Authenticator for TokenManager {
    fn request(&self, previous: Option<&UserIdentity>) -> Result<Grant, AuthError> {
        let hint = previous
            .map(|u| u.username.clone())
            .or_else(|| self.login_hint.clone());

        if let Some(user) = &hint {
            match self.silent_token(user) {
                Ok(Some(access_token)) => {
                    return Ok(Grant {
                        access_token,
                        identity: UserIdentity::new(user.clone()),
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("silent sign-in for {user} failed, going interactive: {e}"),
            }
        }

        let tokens = oauth::perform_pkce_flow(
            &self.endpoints,
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            hint.as_deref(),
        )
        .map_err(classify)?;

        let username = claims::username_from_token(&tokens.access_token)
            .or(hint)
            .ok_or_else(|| {
                AuthError::Failed(
                    "could not tell who signed in; set user_email in the config".to_string(),
                )
            })?;

        let now = now_epoch().map_err(classify)?;
        self.remember(&username, &tokens, now);
        info!("signed in as {username}");

        Ok(Grant {
            access_token: tokens.access_token,
            identity: UserIdentity::new(username),
        })
    }

    fn acquire_silent(&self, user: &UserIdentity) -> Result<Grant, AuthError> {
        match self.silent_token(&user.username) {
            Ok(Some(access_token)) => Ok(Grant {
                access_token,
                identity: user.clone(),
            }),
            Ok(None) => Err(AuthError::Failed(format!(
                "no cached or refreshable token for {}",
                user.username
            ))),
            Err(e) => Err(classify(e)),
        }
    }
}
