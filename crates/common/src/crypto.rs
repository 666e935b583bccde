//! Signed, time-limited tokens for temporary image links.
//!
//! Token format is `<expiry_epoch_ms>:<hex_hmac>`, where the digest is
//! HMAC-SHA256 keyed with the shared link secret over the decimal expiry.
//! Clients may parse the expiry part, so the layout must stay byte-compatible.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Path prefix under which signed images are served.
pub const TEMP_IMAGES_PATH: &str = "/temp_images";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies link tokens. Cheap to clone.
#[derive(Clone)]
pub struct LinkSigner {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSigner").finish_non_exhaustive()
    }
}

impl LinkSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: Arc::from(secret.as_ref()) }
    }

    fn mac(&self, expiry: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC-SHA256 accepts any key length");
        mac.update(expiry.as_bytes());
        mac
    }

    /// Issue a token valid strictly before `expires_at`.
    ///
    /// # Examples
    /// ```
    /// use common::crypto::LinkSigner;
    /// let signer = LinkSigner::new("secret");
    /// let now = chrono::Utc::now();
    /// let token = signer.issue(now + chrono::Duration::minutes(5));
    /// assert!(signer.verify(&token, now).is_ok());
    /// ```
    pub fn issue(&self, expires_at: DateTime<Utc>) -> String {
        let expiry = expires_at.timestamp_millis().to_string();
        let digest = self.mac(&expiry).finalize().into_bytes();
        format!("{expiry}:{}", hex::encode(digest))
    }

    /// Verify a token at `now`; returns the expiry instant on success.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        let (expiry, digest_hex) = token.split_once(':').ok_or(TokenError::Malformed)?;
        if expiry.is_empty() || !expiry.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenError::Malformed);
        }
        // hex::decode also accepts upper case; only the canonical form is valid
        if !digest_hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(TokenError::Malformed);
        }
        let expected = hex::decode(digest_hex).map_err(|_| TokenError::Malformed)?;
        self.mac(expiry)
            .verify_slice(&expected)
            .map_err(|_| TokenError::BadSignature)?;

        let expiry_ms: i64 = expiry.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at = DateTime::<Utc>::from_timestamp_millis(expiry_ms).ok_or(TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok(expires_at)
    }

    /// Build `<base>/temp_images/<file>?token=<token>`.
    pub fn signed_url(&self, public_base_url: &str, file_name: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "{}{}/{}?token={}",
            public_base_url.trim_end_matches('/'),
            TEMP_IMAGES_PATH,
            file_name,
            self.issue(expires_at)
        )
    }
}
