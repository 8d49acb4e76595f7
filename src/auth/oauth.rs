use anyhow::{Result, anyhow};
use log::{info, warn};
use oauth2::TokenResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use thiserror::Error;
use tiny_http::{Response, Server};
use url::Url;

/// Delegated permissions the viewer needs on the Outlook resource.
pub const SCOPES: [&str; 4] = [
    "https://outlook.office.com/Mail.Read",
    "https://outlook.office.com/Contacts.Read",
    "https://outlook.office.com/Calendars.Read",
    "offline_access",
];

const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(120);

/// The user closed or declined the sign-in, or never finished it.
#[derive(Debug, Error)]
#[error("sign-in cancelled: {0}")]
pub struct SignInCancelled(pub String);

/// Tokens returned by the oauth flow (in-memory)
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Microsoft identity platform endpoints for one tenant.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
}

impl Endpoints {
    pub fn for_tenant(tenant: &str) -> Self {
        let base = format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0");
        Self {
            authorize: format!("{base}/authorize"),
            token: format!("{base}/token"),
        }
    }
}

fn oauth_client(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
) -> Result<BasicClient> {
    let client_id = ClientId::new(client_id.to_string());
    let client_secret = client_secret.map(|s| ClientSecret::new(s.to_string()));
    let auth_url = AuthUrl::new(endpoints.authorize.clone())?;
    let token_url = TokenUrl::new(endpoints.token.clone())?;
    Ok(BasicClient::new(
        client_id,
        client_secret,
        auth_url,
        Some(token_url),
    ))
}

fn tokens_from<T: TokenResponse<oauth2::basic::BasicTokenType>>(token: &T) -> Tokens {
    Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in().map(|d| d.as_secs()),
    }
}

/// Exchange a refresh token for a new access token.
pub fn refresh_access_token(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<Tokens> {
    let client = oauth_client(endpoints, client_id, client_secret)?;
    let token = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .request(http_client)
        .map_err(|e| anyhow!("refresh token exchange failed: {e}"))?;
    Ok(tokens_from(&token))
}

/// Authorization Code + PKCE flow. Opens the system browser and captures the
/// redirect on a loopback listener bound to `redirect_uri`.
pub fn perform_pkce_flow(
    endpoints: &Endpoints,
    client_id: &str,
    client_secret: Option<&str>,
    redirect_uri: &str,
    login_hint: Option<&str>,
) -> Result<Tokens> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;
    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect_uri}"))?
        .to_string();
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect_uri}"))?;

    let bind_ip: IpAddr = match host.as_str() {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };
    let bind_addr = SocketAddr::new(bind_ip, port);

    // Listen before the browser can redirect.
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    let client = oauth_client(endpoints, client_id, client_secret)?
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut request = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .set_pkce_challenge(pkce_challenge);
    if let Some(hint) = login_hint {
        request = request.add_extra_param("login_hint", hint);
    }
    let (auth_url, csrf) = request.url();

    info!("sign-in URL: {auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        warn!("could not open browser automatically: {e}");
    }

    let code = wait_for_code(&server, &host, port, csrf.secret())?;

    let token = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request(http_client)
        .map_err(|e| {
            warn!("token exchange failed: {e:#?}");
            anyhow!("Token exchange failed: {e}")
        })?;

    Ok(tokens_from(&token))
}

/// Block until the redirect delivers a code, the user declines, or the timeout hits.
fn wait_for_code(server: &Server, host: &str, port: u16, expected_state: &str) -> Result<String> {
    let wait_until = Instant::now() + SIGN_IN_TIMEOUT;

    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };
        let Some(request) = maybe_request else {
            continue;
        };

        // request.url() is a path+query like "/callback?code=...&state=..."
        let full = format!("http://{}:{}{}", host, port, request.url());
        let Ok(parsed) = Url::parse(&full) else {
            let _ = request.respond(Response::from_string("Bad redirect"));
            continue;
        };

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (k, v) in parsed.query_pairs() {
            match k.as_ref() {
                "code" => code = Some(v.into_owned()),
                "state" => state = Some(v.into_owned()),
                "error" => error = Some(v.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            let _ = request.respond(Response::from_string(
                "Sign-in did not complete. You can close this tab.",
            ));
            if error == "access_denied" {
                return Err(SignInCancelled(error).into());
            }
            return Err(anyhow!("authorization server returned '{error}'"));
        }

        match code {
            Some(code) if state.as_deref() == Some(expected_state) => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                return Ok(code);
            }
            Some(_) => {
                let _ = request.respond(Response::from_string("State mismatch; ignored."));
            }
            None => {
                let _ = request.respond(Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
        }
    }

    Err(SignInCancelled("no response within timeout".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_endpoints() {
        let e = Endpoints::for_tenant("contoso.onmicrosoft.com");
        assert_eq!(
            e.authorize,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/authorize"
        );
        assert!(e.token.ends_with("/oauth2/v2.0/token"));
    }
}
