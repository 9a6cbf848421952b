use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::time::unix_now;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    email: Option<String>,
}

/// An opaque bearer token with an embedded expiry claim.
///
/// The token is held in memory only.  Its payload is decoded once, without
/// signature verification, purely to learn when it expires.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    raw: String,
    claims: Option<Claims>,
}

impl SessionToken {
    /// Wraps a raw JWT, decoding its claims if possible.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let claims = match decode_claims(&raw) {
            Ok(claims) => Some(claims),
            Err(err) => {
                tracing::warn!(error = %err, "could not decode session token claims");
                None
            }
        };
        Self { raw, claims }
    }

    /// Returns the bearer string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the `exp` claim, if the token carries one.
    pub fn expires_at(&self) -> Option<i64> {
        self.claims.as_ref().and_then(|claims| claims.exp)
    }

    /// Returns the `email` claim, if the token carries one.
    pub fn email(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|claims| claims.email.as_deref())
    }

    /// Returns true if the token is expired at `now` (seconds since epoch).
    ///
    /// A token whose payload cannot be decoded counts as expired.  A decoded
    /// token without an `exp` claim never expires.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match &self.claims {
            None => true,
            Some(Claims { exp: Some(exp), .. }) => *exp < now,
            Some(Claims { exp: None, .. }) => false,
        }
    }

    /// Returns true if the token is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("expires_at", &self.expires_at())
            .finish_non_exhaustive()
    }
}

fn decode_claims(raw: &str) -> Result<Claims> {
    let mut segments = raw.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::encoding("token is not a JWT", None));
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) fn unsigned_jwt(exp: Option<i64>, email: Option<&str>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let mut claims = serde_json::Map::new();
    if let Some(exp) = exp {
        claims.insert("exp".to_string(), exp.into());
    }
    if let Some(email) = email {
        claims.insert("email".to_string(), email.into());
    }
    let payload = URL_SAFE_NO_PAD.encode(serde_json::Value::Object(claims).to_string());
    format!("{header}.{payload}.signature")
}
