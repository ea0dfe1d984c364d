//! Callback signature verification
//!
//! The signature is `base64(HMAC-SHA256(secret, secret + timestamp + nonce + body))`
//! and the timestamp must be no more than [`MAX_REQUEST_AGE_SECS`] old.

use crate::error::{WebhookError, WebhookResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Oldest accepted request, in seconds
pub const MAX_REQUEST_AGE_SECS: i64 = 300;

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, timestamp: &str, nonce: &str, body: &[u8]) -> WebhookResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::SignatureVerificationFailed)?;
        mac.update(self.secret.as_bytes());
        mac.update(timestamp.as_bytes());
        mac.update(nonce.as_bytes());
        mac.update(body);
        Ok(mac)
    }

    /// Compute the signature header value for a request
    pub fn sign(&self, timestamp: &str, nonce: &str, body: &[u8]) -> WebhookResult<String> {
        let mac = self.mac(timestamp, nonce, body)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verify a request against the current Unix time `now`
    ///
    /// Freshness is checked before the signature, so a stale request is
    /// rejected even when correctly signed.
    pub fn verify(
        &self,
        timestamp: &str,
        nonce: &str,
        signature: &str,
        body: &[u8],
        now: i64,
    ) -> WebhookResult<()> {
        let issued: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp(timestamp.to_string()))?;

        let age = now.saturating_sub(issued);
        if age > MAX_REQUEST_AGE_SECS {
            return Err(WebhookError::StaleTimestamp { age });
        }

        let provided = STANDARD
            .decode(signature.trim())
            .map_err(|_| WebhookError::SignatureVerificationFailed)?;
        self.mac(timestamp, nonce, body)?
            .verify_slice(&provided)
            .map_err(|_| WebhookError::SignatureVerificationFailed)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}
