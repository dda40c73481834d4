//! Payment gateway client (REST, basic auth)
//!
//! | Call | Endpoint |
//! |------|----------|
//! | open a session | `POST /v1/orders` |
//! | query a session | `GET /v1/orders/{id}` |
//!
//! Amounts cross this boundary in minor units (paise/cents).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborator::{CollaboratorError, opt_str_field, read_json, str_field};

const SERVICE: &str = "payment";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRequest {
    pub amount_minor: i64,
    pub currency: String,
    /// Our order id, echoed back by the gateway
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Gateway-side order id
    pub session_ref: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_ref: String,
    /// `created` | `attempted` | `paid`
    pub status: String,
    pub amount_minor: i64,
    pub amount_paid_minor: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
}

impl SessionStatus {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: SessionRequest)
    -> Result<PaymentSession, CollaboratorError>;

    async fn fetch_session(&self, session_ref: &str) -> Result<SessionStatus, CollaboratorError>;

    /// Public key id handed to the browser checkout widget
    fn public_key(&self) -> &str;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

fn amount_field(body: &serde_json::Value, key: &str) -> i64 {
    body.get(key).and_then(|v| v.as_i64()).unwrap_or_default()
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<PaymentSession, CollaboratorError> {
        let resp = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": request.amount_minor,
                "currency": request.currency,
                "receipt": request.receipt,
                "notes": { "order_id": request.receipt },
            }))
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(SERVICE, e))?;
        let body = read_json(SERVICE, resp).await?;

        Ok(PaymentSession {
            session_ref: str_field(SERVICE, &body, "/id")?,
            amount_minor: amount_field(&body, "amount"),
            currency: opt_str_field(&body, "/currency").unwrap_or(request.currency),
            status: opt_str_field(&body, "/status").unwrap_or_else(|| "created".to_string()),
        })
    }

    async fn fetch_session(&self, session_ref: &str) -> Result<SessionStatus, CollaboratorError> {
        let resp = self
            .client
            .get(format!("{}/v1/orders/{}", self.base_url, session_ref))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(SERVICE, e))?;
        let body = read_json(SERVICE, resp).await?;

        Ok(SessionStatus {
            session_ref: str_field(SERVICE, &body, "/id")?,
            status: str_field(SERVICE, &body, "/status")?,
            amount_minor: amount_field(&body, "amount"),
            amount_paid_minor: amount_field(&body, "amount_paid"),
            receipt: opt_str_field(&body, "/receipt"),
        })
    }

    fn public_key(&self) -> &str {
        &self.key_id
    }
}
