//! Compact signed tokens binding a resource reference to an expiry.
//!
//! Wire form: `base64url(claims) "." base64url(hmac_sha256(key, first segment))`
//! without padding, so a token can be dropped into a URL path as is. Claim
//! times are Unix nanoseconds, the full precision of the clock.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use thiserror::Error as ThisError;

use crate::error::ExplError;

type HmacSha256 = Hmac<Sha256>;

/// Signing key length in bytes.
pub const KEY_LEN: usize = 256 / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum TokenError {
    /// Malformed token or signature mismatch.
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(rename = "ref")]
    resource: String,
    exp: i64,
}

/// Mints and verifies tokens with a symmetric key that lives only in memory.
/// A new process gets a new key, which invalidates every token issued before.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenCodec { .. }")
    }
}

impl TokenCodec {
    /// Create a codec with a fresh key from the OS random source.
    pub fn generate() -> Result<Self, ExplError> {
        let mut key = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| ExplError::KeyGeneration(e.to_string()))?;
        Self::from_key(&key)
    }

    pub fn from_key(key: &[u8; KEY_LEN]) -> Result<Self, ExplError> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| ExplError::KeyGeneration(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Mint a token for `resource` that expires `validity` after `now`.
    pub fn mint(&self, resource: &str, validity: Duration, now: DateTime<Utc>) -> String {
        let validity = TimeDelta::from_std(validity).unwrap_or(TimeDelta::MAX);
        let expires = now
            .checked_add_signed(validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let claims = json!({
            "ref": resource,
            "iat": unix_nanos(now),
            "exp": unix_nanos(expires),
        });

        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    /// Check signature and expiry and return the resource reference.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::InvalidSignature)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(TokenError::InvalidSignature)?;

        if unix_nanos(now) >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims.resource)
    }
}

/// Saturates outside the years 1677..2262.
fn unix_nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt()
        .unwrap_or(if t.timestamp() < 0 { i64::MIN } else { i64::MAX })
}
