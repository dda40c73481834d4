//! Checkout partner client
//!
//! Cart tokens are minted by the partner's `POST /api/v1/access-token/checkout`.
//! Requests are authenticated with `X-Api-Key` plus a base64 HMAC-SHA256 of
//! the exact body bytes sent.

use async_trait::async_trait;
use serde::Serialize;

use crate::collaborator::{CollaboratorError, opt_str_field, read_json};
use crate::signature::{API_KEY_HEADER, DigestEncoding, SIGNATURE_HEADER, WebhookVerifier};

const SERVICE: &str = "checkout";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub variant_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartTokenRequest {
    pub items: Vec<CartLine>,
    pub redirect_url: Option<String>,
    /// Unix millis, part of the signed body
    pub timestamp: i64,
}

#[async_trait]
pub trait CheckoutPartner: Send + Sync {
    async fn create_cart_token(&self, request: CartTokenRequest) -> Result<String, CollaboratorError>;
}

pub struct HttpCheckoutPartner {
    client: reqwest::Client,
    base_url: String,
    /// Same key/secret pair the partner uses to sign its webhooks to us
    credentials: WebhookVerifier,
}

impl HttpCheckoutPartner {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: WebhookVerifier,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

/// Body sent to the partner; signed as serialized
fn token_body(request: &CartTokenRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "cart_data": { "items": request.items },
        "timestamp": request.timestamp,
    });
    if let Some(url) = &request.redirect_url {
        body["redirect_url"] = serde_json::Value::String(url.clone());
    }
    body
}

#[async_trait]
impl CheckoutPartner for HttpCheckoutPartner {
    async fn create_cart_token(&self, request: CartTokenRequest) -> Result<String, CollaboratorError> {
        let bytes = serde_json::to_vec(&token_body(&request))
            .map_err(|e| CollaboratorError::invalid(SERVICE, e.to_string()))?;
        let signature = self
            .credentials
            .sign(&bytes, DigestEncoding::Base64)
            .map_err(|e| CollaboratorError::invalid(SERVICE, e.to_string()))?;

        let resp = self
            .client
            .post(format!("{}/api/v1/access-token/checkout", self.base_url))
            .header(API_KEY_HEADER, self.credentials.api_key())
            .header(SIGNATURE_HEADER, signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(SERVICE, e))?;
        let body = read_json(SERVICE, resp).await?;

        opt_str_field(&body, "/token")
            .or_else(|| opt_str_field(&body, "/data/token"))
            .ok_or_else(|| CollaboratorError::invalid(SERVICE, "missing field /token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_body_shape() {
        let request = CartTokenRequest {
            items: vec![CartLine {
                variant_id: "var_1".into(),
                quantity: 2,
            }],
            redirect_url: None,
            timestamp: 1_700_000_000_000,
        };
        let body = token_body(&request);
        assert_eq!(body["cart_data"]["items"][0]["variant_id"], "var_1");
        assert_eq!(body["cart_data"]["items"][0]["quantity"], 2);
        assert!(body.get("redirect_url").is_none());

        let with_redirect = CartTokenRequest {
            redirect_url: Some("https://shop.example/thanks".into()),
            ..request
        };
        assert_eq!(
            token_body(&with_redirect)["redirect_url"],
            "https://shop.example/thanks"
        );
    }
}
