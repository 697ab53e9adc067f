//! Account identification from identity-provider session tokens.
//!
//! The provider issues HS256-signed JWTs whose `sub` claim is the account id.
//! Sign-in flows live entirely on the provider side.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use crate::response::AppError;

const SESSION_COOKIE_NAME: &str = "__session";
const SECRET_ENV: &str = "AUTH_JWT_SECRET";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccount {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing AUTH_JWT_SECRET")]
    MissingSecret,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let secret = std::env::var(SECRET_ENV).map_err(|_| AuthError::MissingSecret)?;
        let account = verify_session_token(&token, &secret).map_err(|err| {
            tracing::debug!(error = %err, "session token rejected");
            err
        })?;
        Ok(account)
    }
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    get_cookie(headers, SESSION_COOKIE_NAME)
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<AuthAccount, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_json = decode_json_segment(header_b64)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload = decode_json_segment(payload_b64)?;
    validate_registered_claims(&payload)?;

    let id = payload
        .get("sub")
        .and_then(|value| value.as_str())
        .filter(|value| !value.trim().is_empty())
        .ok_or(AuthError::InvalidToken)?
        .to_string();

    Ok(AuthAccount { id })
}

/// Sign an HS256 token for `sub`. Used by tooling and tests.
pub fn sign_session_token(sub: &str, secret: &str, expires_in_secs: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": sub,
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + expires_in_secs,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(format!("{header}.{payload}").as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{header}.{payload}.{signature}")
}

fn decode_json_segment(segment: &str) -> Result<serde_json::Value, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

fn validate_registered_claims(payload: &serde_json::Value) -> Result<(), AuthError> {
    let now = Utc::now().timestamp();

    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_sign_and_verify_round_trip() {
        let token = sign_session_token("user_123", SECRET, 3600);
        let account = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(account.id, "user_123");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_session_token("user_123", SECRET, 3600);
        assert!(matches!(
            verify_session_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign_session_token("user_123", SECRET, -10);
        assert!(verify_session_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(verify_session_token("abc", SECRET).is_err());
        assert!(verify_session_token("a.b.c.d", SECRET).is_err());
    }

    #[test]
    fn test_extract_token_from_bearer_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_token(&headers).as_deref(), Some("tok"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=cookie-tok"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-tok"));

        assert!(extract_token(&HeaderMap::new()).is_none());
    }
}
