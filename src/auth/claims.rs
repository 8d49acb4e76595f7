use base64::{Engine as _, engine::general_purpose};
use serde_json::{Map, Value};

/// Claims that name the user, most specific first.
const USERNAME_CLAIMS: [&str; 4] = ["upn", "preferred_username", "unique_name", "email"];

/// Decode the payload of a JWT access token. `None` when the token is opaque.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

pub fn username_from_token(token: &str) -> Option<String> {
    let claims = decode_claims(token)?;
    USERNAME_CLAIMS
        .iter()
        .find_map(|k| claims.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Rows for the access token viewer.
pub fn claim_rows(token: &str) -> Vec<(String, String)> {
    match decode_claims(token) {
        Some(claims) => claims
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect(),
        None => vec![
            ("(opaque token)".to_string(), format!("{} chars", token.len())),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        let enc = |s: &str| general_purpose::URL_SAFE_NO_PAD.encode(s);
        format!("{}.{}.sig", enc(r#"{"alg":"none"}"#), enc(payload))
    }

    #[test]
    fn picks_upn_over_email() {
        let t = jwt(r#"{"email":"b@contoso.com","upn":"a@contoso.com","aud":"https://outlook.office.com"}"#);
        assert_eq!(username_from_token(&t).as_deref(), Some("a@contoso.com"));
    }

    #[test]
    fn non_string_claims_are_rendered_as_json() {
        let t = jwt(r#"{"exp":1700000000,"scp":"Mail.Read"}"#);
        let rows = claim_rows(&t);
        assert!(rows.contains(&("exp".to_string(), "1700000000".to_string())));
        assert!(rows.contains(&("scp".to_string(), "Mail.Read".to_string())));
    }

    #[test]
    fn opaque_tokens_show_their_length() {
        let rows = claim_rows("EwB4A8l6BAAU");
        assert_eq!(rows, vec![("(opaque token)".to_string(), "12 chars".to_string())]);
        assert_eq!(username_from_token("EwB4A8l6BAAU"), None);
    }
}
