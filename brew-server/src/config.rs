//! Server configuration, read from the environment

use std::path::PathBuf;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub http_port: u16,
    /// redb file
    pub store_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<String>,

    /// Admin JWT signing key
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Legacy shared admin secret; static-secret auth is off when unset
    pub admin_static_secret: Option<String>,
    /// Bootstrap elevated admin
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Catalog/checkout partner API key and HMAC secret
    pub catalog_api_key: String,
    pub catalog_api_secret: String,
    pub checkout_api_base_url: String,

    pub payment_key_id: String,
    pub payment_key_secret: String,
    pub payment_webhook_secret: String,
    pub payment_api_base_url: String,

    pub shipping_email: String,
    pub shipping_password: String,
    pub shipping_api_base_url: String,
    pub shipping_tracking_base_url: String,
    pub shipping_token_ttl_hours: u64,
    /// Shared token the carrier sends on status callbacks
    pub shipping_webhook_token: String,
    pub default_pickup_location: String,

    pub collaborator_timeout_secs: u64,
    pub currency: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match lookup(name) {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let optional = |name: &str| lookup(name).filter(|s| !s.is_empty());
        let number = |name: &str, default: u64| -> Result<u64, BoxError> {
            match lookup(name) {
                Some(v) => v
                    .parse()
                    .map_err(|_| format!("{name} must be a non-negative integer, got {v:?}").into()),
                None => Ok(default),
            }
        };

        Ok(Self {
            http_port: u16::try_from(number("HTTP_PORT", 8080)?)
                .map_err(|_| "HTTP_PORT out of range")?,
            store_path: PathBuf::from(var("STORE_PATH", "data/brew.redb")),
            log_level: var("LOG_LEVEL", "info"),
            log_dir: optional("LOG_DIR"),

            jwt_secret: Self::require_secret(&lookup, "JWT_SECRET", &environment)?,
            jwt_expiry_hours: number("JWT_EXPIRY_HOURS", 24)? as i64,
            admin_static_secret: optional("ADMIN_STATIC_SECRET"),
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),

            catalog_api_key: var("CATALOG_API_KEY", "dev-catalog-key"),
            catalog_api_secret: Self::require_secret(&lookup, "CATALOG_API_SECRET", &environment)?,
            checkout_api_base_url: var("CHECKOUT_API_BASE_URL", "https://checkout-api.shopflo.com"),

            payment_key_id: var("PAYMENT_KEY_ID", "rzp_test_key"),
            payment_key_secret: Self::require_secret(&lookup, "PAYMENT_KEY_SECRET", &environment)?,
            payment_webhook_secret: Self::require_secret(
                &lookup,
                "PAYMENT_WEBHOOK_SECRET",
                &environment,
            )?,
            payment_api_base_url: var("PAYMENT_API_BASE_URL", "https://api.razorpay.com"),

            shipping_email: var("SHIPPING_EMAIL", ""),
            shipping_password: Self::require_secret(&lookup, "SHIPPING_PASSWORD", &environment)?,
            shipping_api_base_url: var("SHIPPING_API_BASE_URL", "https://apiv2.shiprocket.in"),
            shipping_tracking_base_url: var(
                "SHIPPING_TRACKING_BASE_URL",
                "https://shiprocket.co/tracking",
            ),
            shipping_token_ttl_hours: number("SHIPPING_TOKEN_TTL_HOURS", 216)?,
            shipping_webhook_token: Self::require_secret(
                &lookup,
                "SHIPPING_WEBHOOK_TOKEN",
                &environment,
            )?,
            default_pickup_location: var("DEFAULT_PICKUP_LOCATION", "Primary"),

            collaborator_timeout_secs: number("COLLABORATOR_TIMEOUT_SECS", 15)?,
            currency: var("CURRENCY", "INR"),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    pub fn shipping_token_ttl(&self) -> Duration {
        Duration::from_secs(self.shipping_token_ttl_hours * 60 * 60)
    }
}
