// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

//! Ed25519 signature checks that bind a signed message to a claimed wallet address.

use std::collections::BTreeMap;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::address::{addresses_match, to_canonical_address};

/// Oldest accepted signed timestamp, relative to now
pub const MAX_SIGNATURE_AGE_MS: i64 = 5 * 60 * 1000;

/// How far in the future a signed timestamp may be (clock skew)
pub const MAX_CLOCK_SKEW_MS: i64 = 60 * 1000;

/// Authentication-key scheme byte for single ed25519 keys
const ED25519_SCHEME: u8 = 0x00;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid encoding: {0}")]
    Encoding(String),
    #[error("invalid public key length: expected 32 bytes, got {0}")]
    PublicKeyLength(usize),
    #[error("invalid signature length: expected 64 bytes, got {0}")]
    SignatureLength(usize),
    #[error("invalid public key: {0}")]
    PublicKey(String),
    #[error("signature verification failed")]
    Invalid,
    #[error("signer address {derived} does not match claimed address {claimed}")]
    AddressMismatch { derived: String, claimed: String },
    #[error("signature has expired")]
    Expired,
    #[error("signature timestamp is in the future")]
    FromTheFuture,
}

/// Key or signature material as wallets actually hand it over: a hex string, a JSON
/// byte array, a serialized `Uint8Array` (`{"0":12,"1":34,...}`), or any of those
/// wrapped in an object under `data`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawEncoding {
    Text(String),
    Bytes(Vec<u8>),
    Wrapped { data: Box<RawEncoding> },
    Indexed(BTreeMap<String, u8>),
}

/// The single canonical shape downstream code deals with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    HexString(String),
    ByteArray(Vec<u8>),
}

impl RawEncoding {
    /// Collapse any accepted input shape into [`Encoded`]
    pub fn normalize(self) -> Result<Encoded, SignatureError> {
        match self {
            RawEncoding::Text(text) => {
                let trimmed = text.trim();
                let without_scheme = trimmed
                    .strip_prefix("ed25519-pub-")
                    .or_else(|| trimmed.strip_prefix("ed25519-sig-"))
                    .unwrap_or(trimmed);
                let hex = without_scheme
                    .strip_prefix("0x")
                    .unwrap_or(without_scheme)
                    .to_ascii_lowercase();
                if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(SignatureError::Encoding(format!("not a hex string: {}", text)));
                }
                Ok(Encoded::HexString(hex))
            }
            RawEncoding::Bytes(bytes) => Ok(Encoded::ByteArray(bytes)),
            RawEncoding::Wrapped { data } => data.normalize(),
            RawEncoding::Indexed(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let index: usize = key
                        .parse()
                        .map_err(|_| SignatureError::Encoding(format!("unexpected key {:?}", key)))?;
                    entries.push((index, value));
                }
                entries.sort_by_key(|(index, _)| *index);
                if entries.iter().enumerate().any(|(pos, (index, _))| pos != *index) {
                    return Err(SignatureError::Encoding("byte indices are not contiguous".into()));
                }
                Ok(Encoded::ByteArray(entries.into_iter().map(|(_, b)| b).collect()))
            }
        }
    }
}

impl Encoded {
    pub fn into_bytes(self) -> Result<Vec<u8>, SignatureError> {
        match self {
            Encoded::ByteArray(bytes) => Ok(bytes),
            Encoded::HexString(hex) => {
                hex::decode(&hex).map_err(|e| SignatureError::Encoding(e.to_string()))
            }
        }
    }
}

impl From<&str> for RawEncoding {
    fn from(value: &str) -> Self {
        RawEncoding::Text(value.to_string())
    }
}

impl From<Vec<u8>> for RawEncoding {
    fn from(value: Vec<u8>) -> Self {
        RawEncoding::Bytes(value)
    }
}

/// Outcome of [`verify`]; never an error, failures carry a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verification {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn failed(reason: impl ToString) -> Self {
        Self { valid: false, error: Some(reason.to_string()) }
    }
}

fn verifying_key(public_key: RawEncoding) -> Result<VerifyingKey, SignatureError> {
    let bytes = public_key.normalize()?.into_bytes()?;
    let key_bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::PublicKeyLength(bytes.len()))?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|e| SignatureError::PublicKey(e.to_string()))
}

fn check_signature(
    message: &str,
    signature: RawEncoding,
    public_key: RawEncoding,
) -> Result<(), SignatureError> {
    let key = verifying_key(public_key)?;
    let bytes = signature.normalize()?.into_bytes()?;
    let sig_bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::SignatureLength(bytes.len()))?;
    let signature = Signature::from_bytes(&sig_bytes);
    key.verify(message.as_bytes(), &signature)
        .map_err(|_| SignatureError::Invalid)
}

/// Check `signature` over the UTF-8 bytes of `message`. Malformed input is reported in
/// the result, never raised.
pub fn verify(message: &str, signature: RawEncoding, public_key: RawEncoding) -> Verification {
    match check_signature(message, signature, public_key) {
        Ok(()) => Verification::ok(),
        Err(e) => Verification::failed(e),
    }
}

/// Derive the canonical on-chain address owned by an ed25519 public key:
/// `sha3_256(public_key || 0x00)`.
pub fn derive_address(public_key: RawEncoding) -> Result<String, SignatureError> {
    let key = verifying_key(public_key)?;
    let mut hasher = Sha3_256::new();
    hasher.update(key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    Ok(to_canonical_address(&hex::encode(hasher.finalize())))
}

/// Confirm that `public_key` owns `claimed_address`
pub fn check_address(public_key: RawEncoding, claimed_address: &str) -> Result<(), SignatureError> {
    let derived = derive_address(public_key)?;
    if addresses_match(&derived, claimed_address) {
        Ok(())
    } else {
        Err(SignatureError::AddressMismatch {
            derived,
            claimed: to_canonical_address(claimed_address),
        })
    }
}

/// Reject timestamps older than five minutes or more than a minute ahead.
/// Second-resolution timestamps are accepted and scaled to milliseconds.
pub fn check_freshness(timestamp: i64, now_ms: i64) -> Result<(), SignatureError> {
    let timestamp_ms = if timestamp < 1_000_000_000_000 {
        timestamp.checked_mul(1000).ok_or(SignatureError::Expired)?
    } else {
        timestamp
    };
    if now_ms.saturating_sub(timestamp_ms) > MAX_SIGNATURE_AGE_MS {
        return Err(SignatureError::Expired);
    }
    if timestamp_ms.saturating_sub(now_ms) > MAX_CLOCK_SKEW_MS {
        return Err(SignatureError::FromTheFuture);
    }
    Ok(())
}

/// Address and timestamp recovered from a human-readable signed message such as
/// `"Sign in to MoveFeed\naddress: 0x..\ntimestamp: 1700000000000"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextClaims {
    pub address: Option<String>,
    pub timestamp: Option<i64>,
}

impl TextClaims {
    pub fn parse(message: &str) -> Self {
        let mut claims = TextClaims::default();
        for line in message.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "address" | "wallet" | "wallet address" if claims.address.is_none() => {
                    claims.address = hex_token(value).map(str::to_string);
                }
                "timestamp" if claims.timestamp.is_none() => claims.timestamp = value.parse().ok(),
                _ => {}
            }
        }
        if claims.address.is_none() {
            claims.address = message.split_whitespace().find_map(hex_token).map(str::to_string);
        }
        claims
    }
}

fn hex_token(token: &str) -> Option<&str> {
    let token = token.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    let digits = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X"))?;
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit())).then_some(token)
}

/// What a signed message commits to
#[derive(Debug, Clone, PartialEq)]
pub enum SignedClaims {
    /// A JSON object carrying the request fields
    Json(serde_json::Map<String, serde_json::Value>),
    /// Free text naming only the signer's address and when it was signed
    Text(TextClaims),
}

/// Wire form of a signed request body
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    pub message: String,
    pub signature: RawEncoding,
    pub public_key: RawEncoding,
}

impl SignedEnvelope {
    /// Verify the signature, bind it to `claimed_address`, and check the embedded
    /// timestamp when there is one.
    pub fn authorize(
        &self,
        claimed_address: &str,
        timestamp: Option<i64>,
        now_ms: i64,
    ) -> Result<(), SignatureError> {
        check_signature(&self.message, self.signature.clone(), self.public_key.clone())?;
        check_address(self.public_key.clone(), claimed_address)?;
        if let Some(ts) = timestamp {
            check_freshness(ts, now_ms)?;
        }
        Ok(())
    }

    /// Classify the signed message: a JSON object, or text to scan for an address
    /// and timestamp
    pub fn signed_claims(&self) -> SignedClaims {
        match serde_json::from_str::<serde_json::Value>(&self.message) {
            Ok(serde_json::Value::Object(map)) => SignedClaims::Json(map),
            _ => SignedClaims::Text(TextClaims::parse(&self.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn envelope(message: &str) -> SignedEnvelope {
        let key = signing_key();
        let signature = key.sign(message.as_bytes());
        SignedEnvelope {
            message: message.to_string(),
            signature: RawEncoding::Text(format!("0x{}", hex::encode(signature.to_bytes()))),
            public_key: RawEncoding::Bytes(key.verifying_key().to_bytes().to_vec()),
        }
    }

    #[test]
    fn verifies_across_encodings() {
        let key = signing_key();
        let message = "hello movefeed";
        let sig = key.sign(message.as_bytes()).to_bytes();
        let pk = key.verifying_key().to_bytes();

        let hex_pk = RawEncoding::Text(hex::encode(pk));
        assert!(verify(message, RawEncoding::Bytes(sig.to_vec()), hex_pk).valid);

        let wrapped: RawEncoding =
            serde_json::from_value(serde_json::json!({ "data": sig.to_vec() })).unwrap();
        let indexed: RawEncoding = serde_json::from_value(serde_json::json!(
            pk.iter().enumerate().map(|(i, b)| (i.to_string(), *b)).collect::<BTreeMap<_, _>>()
        ))
        .unwrap();
        assert!(matches!(indexed, RawEncoding::Indexed(_)));
        assert!(verify(message, wrapped, indexed).valid);

        let prefixed = RawEncoding::Text(format!("ed25519-pub-0x{}", hex::encode(pk)));
        assert!(verify(message, RawEncoding::Bytes(sig.to_vec()), prefixed).valid);
    }

    #[test]
    fn malformed_input_is_reported_not_raised() {
        let result = verify("m", "zz".into(), "0x1234".into());
        assert!(!result.valid);
        assert!(result.error.is_some());

        let key = signing_key();
        let pk = key.verifying_key().to_bytes().to_vec();
        let short = verify("m", RawEncoding::Bytes(vec![1, 2, 3]), RawEncoding::Bytes(pk.clone()));
        assert_eq!(short.error.as_deref(), Some("invalid signature length: expected 64 bytes, got 3"));

        let sig = key.sign(b"other").to_bytes().to_vec();
        let wrong = verify("m", RawEncoding::Bytes(sig), RawEncoding::Bytes(pk));
        assert_eq!(wrong, Verification::failed(SignatureError::Invalid));
    }

    #[test]
    fn derived_address_is_canonical_and_matches() {
        let pk = signing_key().verifying_key().to_bytes().to_vec();
        let address = derive_address(RawEncoding::Bytes(pk.clone())).unwrap();
        assert_eq!(address.len(), 66);
        assert!(check_address(RawEncoding::Bytes(pk.clone()), &address.to_uppercase().replace("0X", "0x")).is_ok());
        assert!(matches!(
            check_address(RawEncoding::Bytes(pk), "0x1"),
            Err(SignatureError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn freshness_window() {
        let now = 1_700_000_000_000;
        assert!(check_freshness(now, now).is_ok());
        assert!(check_freshness(now - MAX_SIGNATURE_AGE_MS + 1, now).is_ok());
        assert_eq!(check_freshness(now - MAX_SIGNATURE_AGE_MS - 1, now), Err(SignatureError::Expired));
        assert!(check_freshness(now + MAX_CLOCK_SKEW_MS, now).is_ok());
        assert_eq!(check_freshness(now + MAX_CLOCK_SKEW_MS + 1, now), Err(SignatureError::FromTheFuture));
        assert!(check_freshness(now / 1000, now).is_ok());
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let now = 1_700_000_000_000;
        assert_eq!(check_freshness(-9_000_000_000_000_000_000, now), Err(SignatureError::Expired));
        assert_eq!(check_freshness(i64::MIN, now), Err(SignatureError::Expired));
        assert_eq!(check_freshness(i64::MAX, now), Err(SignatureError::FromTheFuture));
        assert_eq!(check_freshness(0, i64::MAX), Err(SignatureError::Expired));
    }

    #[test]
    fn text_messages_yield_address_and_timestamp() {
        let claims = TextClaims::parse("Sign in to MoveFeed\naddress: 0xAbC1\ntimestamp: 1700000000000");
        assert_eq!(claims.address.as_deref(), Some("0xAbC1"));
        assert_eq!(claims.timestamp, Some(1_700_000_000_000));

        let inline = TextClaims::parse("Welcome 0xbeef, please confirm.");
        assert_eq!(inline.address.as_deref(), Some("0xbeef"));
        assert_eq!(inline.timestamp, None);

        assert_eq!(TextClaims::parse("hello"), TextClaims::default());
        assert_eq!(TextClaims::parse("timestamp: soon").timestamp, None);
    }

    #[test]
    fn only_json_objects_count_as_structured_claims() {
        assert!(matches!(envelope(r#"{"userAddress":"0x1"}"#).signed_claims(), SignedClaims::Json(_)));
        assert!(matches!(envelope("12345").signed_claims(), SignedClaims::Text(_)));
        assert!(matches!(envelope("Sign in").signed_claims(), SignedClaims::Text(_)));
    }

    #[test]
    fn envelope_authorization() {
        let pk = signing_key().verifying_key().to_bytes().to_vec();
        let owner = derive_address(RawEncoding::Bytes(pk)).unwrap();
        let now = 1_700_000_000_000;
        let env = envelope(&format!(r#"{{"userAddress":"{}","timestamp":{}}}"#, owner, now));

        assert!(env.authorize(&owner, Some(now), now).is_ok());
        assert!(matches!(env.authorize("0xbeef", Some(now), now), Err(SignatureError::AddressMismatch { .. })));
        assert_eq!(env.authorize(&owner, Some(now), now + 10 * 60 * 1000), Err(SignatureError::Expired));

        match env.signed_claims() {
            SignedClaims::Json(claims) => assert_eq!(claims["userAddress"], owner),
            other => panic!("expected JSON claims, got {:?}", other),
        }
    }
}
