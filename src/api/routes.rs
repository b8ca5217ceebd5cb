// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use axum::http::HeaderMap;
use chrono::Utc;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::AppState;
use crate::address::{addresses_match, to_canonical_address, Address};
use crate::error::ApiError;
use crate::signature::{SignedClaims, SignedEnvelope};

/// Pagination parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PaginationParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Whether a write handler accepts a bare payload when signatures are not enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Accept a direct payload unless the server requires signatures everywhere
    Optional,
    /// Always demand a signed envelope
    Required,
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn is_envelope(body: &Value) -> bool {
    ["message", "signature", "publicKey"]
        .iter()
        .all(|key| body.get(key).is_some_and(|v| !v.is_null()))
}

fn signed_timestamp(claims: &Map<String, Value>) -> Result<Option<i64>, ApiError> {
    match claims.get("timestamp") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("Signed timestamp must be an integer".to_string())),
    }
}

fn claimed_actor<T, F>(payload: &T, actor: F) -> Result<String, ApiError>
where
    F: FnOnce(&T) -> Option<&str>,
{
    actor(payload)
        .filter(|address| !address.trim().is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingFields(vec!["userAddress"]))
}

/// Decode a write request body.
///
/// A signed envelope whose message is a JSON object carries the whole payload; nothing
/// is read from the unsigned body. A human-readable message only commits to an address
/// and a timestamp, so it must name both: the address has to be the actor's and the
/// timestamp has to be fresh. `Required` handlers also insist on a timestamp in JSON
/// messages.
pub fn read_payload<T, F>(state: &AppState, body: Value, policy: SignaturePolicy, actor: F) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Option<&str>,
{
    if !is_envelope(&body) {
        if policy == SignaturePolicy::Required || state.config.server.require_signatures {
            return Err(ApiError::Unauthorized("Signature required".to_string()));
        }
        return serde_json::from_value(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)));
    }

    let envelope: SignedEnvelope = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid signed envelope: {}", e)))?;

    match envelope.signed_claims() {
        SignedClaims::Json(claims) => {
            let timestamp = signed_timestamp(&claims)?;
            if timestamp.is_none() && policy == SignaturePolicy::Required {
                return Err(ApiError::Unauthorized("Signed message must carry a timestamp".to_string()));
            }
            let payload: T = serde_json::from_value(Value::Object(claims))
                .map_err(|e| ApiError::BadRequest(format!("Invalid signed message: {}", e)))?;
            let claimed = claimed_actor(&payload, actor)?;
            envelope.authorize(&claimed, timestamp, now_ms())?;
            Ok(payload)
        }
        SignedClaims::Text(text) => {
            debug!("Signed message is text, reading fields from the request body");
            let address = text
                .address
                .ok_or_else(|| ApiError::Unauthorized("Signed message does not name an address".to_string()))?;
            let timestamp = text
                .timestamp
                .ok_or_else(|| ApiError::Unauthorized("Signed message must carry a timestamp".to_string()))?;

            let payload: T = serde_json::from_value(body)
                .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
            let claimed = claimed_actor(&payload, actor)?;
            if !addresses_match(&address, &claimed) {
                return Err(ApiError::Unauthorized(format!(
                    "Signed message names {} but the request acts for {}",
                    to_canonical_address(&address),
                    to_canonical_address(&claimed)
                )));
            }
            envelope.authorize(&claimed, Some(timestamp), now_ms())?;
            Ok(payload)
        }
    }
}

/// Validate and canonicalize an address taken from a request
pub fn canonical(address: &str) -> Result<String, ApiError> {
    Ok(Address::parse(address)?.into_string())
}

/// Post ids are strings off-chain; clients send them as either strings or numbers
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

/// Client IP as reported by the proxy in front of us
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers), "10.0.0.2");
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn post_ids_accept_numbers() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "string_or_number")]
            id: Option<String>,
        }
        let parse = |v: Value| serde_json::from_value::<Body>(v).map(|b| b.id);
        assert_eq!(parse(serde_json::json!({"id": 42})).unwrap(), Some("42".to_string()));
        assert_eq!(parse(serde_json::json!({"id": "42"})).unwrap(), Some("42".to_string()));
        assert_eq!(parse(serde_json::json!({})).unwrap(), None);
        assert!(parse(serde_json::json!({"id": [1]})).is_err());
    }
}
