//! Identity-provider webhooks (svix-style signed deliveries).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::response::{json_error, ok, AppError};
use crate::state::AppState;

const SECRET_ENV: &str = "WEBHOOK_SECRET";
const SECRET_PREFIX: &str = "whsec_";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

struct SvixHeaders<'a> {
    id: &'a str,
    timestamp: &'a str,
    signature: &'a str,
}

pub async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let secret = std::env::var(SECRET_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            tracing::error!("{SECRET_ENV} is not set");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "WEBHOOK_SECRET_MISSING",
                "Webhook secret is not set",
            )
        })?;

    let svix = svix_headers(&headers)
        .ok_or_else(|| AppError::bad_request("Missing svix headers"))?;

    if !verify_signature(&secret, &svix, &body) {
        tracing::warn!(svix_id = svix.id, "webhook signature rejected");
        return Err(AppError::bad_request("Error verifying webhook"));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("Invalid webhook payload"))?;

    if event.event_type == "user.created" {
        let user_id = event
            .data
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::bad_request("user.created event without user id"))?;

        state.store().init_progress(user_id).await.map_err(|err| {
            tracing::error!(error = %err, user_id, "error initializing user progress");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PROGRESS_INIT_FAILED",
                "Error initializing user progress",
            )
        })?;
        tracing::info!(user_id, "progress initialized for new account");
    } else {
        tracing::debug!(event_type = %event.event_type, "webhook event acknowledged");
    }

    Ok(ok(serde_json::json!({ "received": true })))
}

fn svix_headers(headers: &HeaderMap) -> Option<SvixHeaders<'_>> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };
    Some(SvixHeaders {
        id: get("svix-id")?,
        timestamp: get("svix-timestamp")?,
        signature: get("svix-signature")?,
    })
}

/// HMAC-SHA256 over `id.timestamp.body`, compared against every `v1,`
/// entry of the space-separated signature header.
fn verify_signature(secret: &str, svix: &SvixHeaders<'_>, body: &[u8]) -> bool {
    let key = match secret.strip_prefix(SECRET_PREFIX) {
        Some(encoded) => match STANDARD.decode(encoded) {
            Ok(key) => key,
            Err(_) => return false,
        },
        None => secret.as_bytes().to_vec(),
    };

    svix.signature.split_whitespace().any(|entry| {
        let Some(encoded) = entry.strip_prefix("v1,") else {
            return false;
        };
        let Ok(expected) = STANDARD.decode(encoded) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
            return false;
        };
        mac.update(svix.id.as_bytes());
        mac.update(b".");
        mac.update(svix.timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    })
}

/// Produce a `v1,` signature entry; used by tests and local tooling.
pub fn sign_payload(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> String {
    let key = secret
        .strip_prefix(SECRET_PREFIX)
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .unwrap_or_else(|| secret.as_bytes().to_vec());
    let mut mac = HmacSha256::new_from_slice(&key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(format!("{id}.{timestamp}.").as_bytes());
    mac.update(body);
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_c2VjcmV0LWtleQ==";

    fn headers<'a>(signature: &'a str) -> SvixHeaders<'a> {
        SvixHeaders {
            id: "msg_1",
            timestamp: "1700000000",
            signature,
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let signature = sign_payload(SECRET, "msg_1", "1700000000", body);
        assert!(verify_signature(SECRET, &headers(&signature), body));
    }

    #[test]
    fn test_any_listed_signature_may_match() {
        let body = b"{}";
        let good = sign_payload(SECRET, "msg_1", "1700000000", body);
        let header = format!("v1,AAAA {good}");
        assert!(verify_signature(SECRET, &headers(&header), body));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_payload(SECRET, "msg_1", "1700000000", b"{}");
        assert!(!verify_signature(SECRET, &headers(&signature), b"{ }"));
        assert!(!verify_signature(SECRET, &headers("garbage"), b"{}"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn signed_body_verifies(body in proptest::collection::vec(any::<u8>(), 0..256)) {
                let signature = sign_payload(SECRET, "msg_1", "1700000000", &body);
                prop_assert!(verify_signature(SECRET, &headers(&signature), &body));
            }

            #[test]
            fn changed_body_fails(
                body in proptest::collection::vec(any::<u8>(), 1..256),
                index in any::<prop::sample::Index>(),
            ) {
                let signature = sign_payload(SECRET, "msg_1", "1700000000", &body);
                let mut tampered = body.clone();
                let i = index.index(tampered.len());
                tampered[i] ^= 0x01;
                prop_assert!(!verify_signature(SECRET, &headers(&signature), &tampered));
            }
        }
    }
}
