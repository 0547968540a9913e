//! Stateless session tokens.
//!
//! A token is `b64url(payload JSON) + "." + b64url(HMAC-SHA256(payload_b64))`,
//! where the payload carries the user id and issue time. Verification
//! recomputes the signature over the received payload, so there is no
//! server-side session table and a token stays valid until the signing
//! secret changes.

use anyhow::Result;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

/// Session cookie name. The cookie is a fallback carrier; clients normally
/// send the token in an Authorization header.
pub const SESSION_COOKIE: &str = "sessionId";

/// Claims carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,
}

/// Mints and verifies HMAC-signed session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    secret: String,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    fn sign(&self, input: &str) -> Result<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| anyhow::anyhow!("invalid HMAC key"))?;
        mac.update(input.as_bytes());
        Ok(BASE64URL.encode(mac.finalize().into_bytes()))
    }

    /// Creates a signed token for the given user, issued now.
    pub fn mint(&self, user_id: Uuid) -> Result<String> {
        let payload = SessionPayload {
            sub: user_id,
            iat: Utc::now().timestamp(),
        };
        let payload_b64 = BASE64URL.encode(serde_json::to_vec(&payload)?);
        let signature = self.sign(&payload_b64)?;

        Ok(format!("{payload_b64}.{signature}"))
    }

    /// Verifies a token and returns its payload. Any structural problem,
    /// bad signature, or undecodable payload yields `None`.
    pub fn verify(&self, token: &str) -> Option<SessionPayload> {
        let mut parts = token.split('.');
        let payload_b64 = parts.next()?;
        let signature = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let expected = self.sign(payload_b64).ok()?;
        if expected != signature {
            return None;
        }

        let json = BASE64URL.decode(payload_b64).ok()?;
        serde_json::from_slice(&json).ok()
    }
}
