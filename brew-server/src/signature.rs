//! Webhook signature verification (HMAC-SHA256)
//!
//! Inbound catalog webhooks carry two headers:
//!
//! | Header | Content |
//! |--------|---------|
//! | `X-Api-Key` | partner API key, compared in constant time |
//! | `X-Api-HMAC-SHA256` | hex HMAC-SHA256 of the raw request body |
//!
//! The raw body bytes are the canonical serialization: the signature is
//! computed over exactly what the sender transmitted, never over a
//! re-serialized JSON value.

use axum::http::HeaderMap;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::error::AppError;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SIGNATURE_HEADER: &str = "x-api-hmac-sha256";

type HmacSha256 = Hmac<Sha256>;

/// Output encoding of a computed digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestEncoding {
    Hex,
    Base64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("API key mismatch")]
    KeyMismatch,

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Signing secret is not configured")]
    MissingSecret,
}

impl From<SignatureError> for AppError {
    fn from(e: SignatureError) -> Self {
        match e {
            SignatureError::MissingSecret => AppError::internal("Webhook verification unavailable"),
            SignatureError::MissingHeader(_) => AppError::unauthorized(),
            other => AppError::invalid_signature(other.to_string()),
        }
    }
}

fn mac_for(secret: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(body);
    Ok(mac)
}

/// HMAC-SHA256 of `body` under `secret`, rendered in `encoding`
pub fn compute_signature(
    secret: &str,
    body: &[u8],
    encoding: DigestEncoding,
) -> Result<String, SignatureError> {
    let digest = mac_for(secret, body)?.finalize().into_bytes();
    Ok(match encoding {
        DigestEncoding::Hex => hex::encode(digest),
        DigestEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(digest),
    })
}

/// Check a hex signature over `body` in constant time
pub fn verify_hex(secret: &str, body: &[u8], claimed: &str) -> Result<(), SignatureError> {
    let claimed = hex::decode(claimed.trim()).map_err(|_| SignatureError::SignatureMismatch)?;
    mac_for(secret, body)?
        .verify_slice(&claimed)
        .map_err(|_| SignatureError::SignatureMismatch)
}

/// Constant-time string equality (length is not hidden)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verifier for partner webhooks keyed by API key + shared secret
#[derive(Clone)]
pub struct WebhookVerifier {
    api_key: String,
    secret: String,
}

impl WebhookVerifier {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }

    /// Verify a request body against the claimed key and signature.
    ///
    /// Pure check: callers must reject the request before any mutation.
    pub fn verify(
        &self,
        body: &[u8],
        claimed_key: Option<&str>,
        claimed_signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        let key = claimed_key.ok_or(SignatureError::MissingHeader("X-Api-Key"))?;
        let signature =
            claimed_signature.ok_or(SignatureError::MissingHeader("X-Api-HMAC-SHA256"))?;

        if !constant_time_eq(key, &self.api_key) {
            return Err(SignatureError::KeyMismatch);
        }
        verify_hex(&self.secret, body, signature)
    }

    /// Read both headers from `headers` and verify
    pub fn verify_headers(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
        let key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        self.verify(body, key, signature)
    }

    /// Sign an outbound body (partner token requests use base64)
    pub fn sign(&self, body: &[u8], encoding: DigestEncoding) -> Result<String, SignatureError> {
        compute_signature(&self.secret, body, encoding)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("api_key", &self.api_key)
            .field("secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BODY: &[u8] = br#"{"id":"prod_grape","title":"Grape Brewy","price":"49"}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new("key-123", "shh")
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature(
            "Jefe",
            b"what do ya want for nothing?",
            DigestEncoding::Hex,
        )
        .unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_base64_encoding_matches_hex_digest() {
        let hex_sig = compute_signature("shh", BODY, DigestEncoding::Hex).unwrap();
        let b64_sig = compute_signature("shh", BODY, DigestEncoding::Base64).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64_sig)
            .unwrap();
        assert_eq!(hex::encode(decoded), hex_sig);
    }

    #[test]
    fn test_verify_accepts_own_signature() {
        let v = verifier();
        let sig = v.sign(BODY, DigestEncoding::Hex).unwrap();
        assert_eq!(v.verify(BODY, Some("key-123"), Some(&sig)), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let v = verifier();
        let sig = v.sign(BODY, DigestEncoding::Hex).unwrap();
        let mut tampered = BODY.to_vec();
        tampered[10] ^= 0x01;
        assert_eq!(
            v.verify(&tampered, Some("key-123"), Some(&sig)),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_key_or_secret_rejected() {
        let v = verifier();
        let sig = v.sign(BODY, DigestEncoding::Hex).unwrap();
        assert_eq!(
            v.verify(BODY, Some("key-124"), Some(&sig)),
            Err(SignatureError::KeyMismatch)
        );

        let other = WebhookVerifier::new("key-123", "shhh");
        assert_eq!(
            other.verify(BODY, Some("key-123"), Some(&sig)),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_headers_rejected() {
        let v = verifier();
        assert_eq!(
            v.verify(BODY, None, Some("00")),
            Err(SignatureError::MissingHeader("X-Api-Key"))
        );
        assert_eq!(
            v.verify(BODY, Some("key-123"), None),
            Err(SignatureError::MissingHeader("X-Api-HMAC-SHA256"))
        );
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        assert_eq!(
            verifier().verify(BODY, Some("key-123"), Some("not-hex")),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn test_empty_secret_is_internal() {
        let v = WebhookVerifier::new("key", "");
        assert_eq!(
            v.verify(BODY, Some("key"), Some("00")),
            Err(SignatureError::MissingSecret)
        );
        let err: AppError = SignatureError::MissingSecret.into();
        assert_eq!(err.code, shared::error::ErrorCode::InternalError);
    }

    #[test]
    fn test_verify_headers() {
        let v = verifier();
        let sig = v.sign(BODY, DigestEncoding::Hex).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", HeaderValue::from_static("key-123"));
        headers.insert("X-Api-HMAC-SHA256", HeaderValue::from_str(&sig).unwrap());
        assert!(v.verify_headers(&headers, BODY).is_ok());
    }
}
