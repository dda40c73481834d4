//! Shared application state

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{
    AdminDirectory, AuthChain, JwtAuthenticator, JwtConfig, JwtService,
    StaticSecretAuthenticator,
};
use crate::catalog::CatalogStore;
use crate::checkout::{CheckoutInitiator, CheckoutPartner, HttpCheckoutPartner};
use crate::collaborator::http_client;
use crate::config::Config;
use crate::ledger::OrderLedger;
use crate::payment::{HttpPaymentGateway, PaymentConfirmation, PaymentGateway};
use crate::shipping::{
    HttpShippingProvider, ShipmentCoordinator, ShippingProvider, ShippingSettings, TokenCache,
};
use crate::signature::WebhookVerifier;
use crate::store::DocumentStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// External services the server talks to
#[derive(Clone)]
pub struct Collaborators {
    pub payment: Arc<dyn PaymentGateway>,
    pub shipping: Arc<dyn ShippingProvider>,
    pub checkout: Arc<dyn CheckoutPartner>,
}

impl Collaborators {
    /// HTTP clients for every collaborator, sharing one connection pool
    pub fn http(config: &Config) -> Result<Self, BoxError> {
        let client = http_client(config.collaborator_timeout())?;
        Ok(Self {
            payment: Arc::new(HttpPaymentGateway::new(
                client.clone(),
                &config.payment_api_base_url,
                &config.payment_key_id,
                &config.payment_key_secret,
            )),
            shipping: Arc::new(HttpShippingProvider::new(
                client.clone(),
                &config.shipping_api_base_url,
                &config.shipping_email,
                &config.shipping_password,
                TokenCache::new(config.shipping_token_ttl()),
            )),
            checkout: Arc::new(HttpCheckoutPartner::new(
                client,
                &config.checkout_api_base_url,
                WebhookVerifier::new(&config.catalog_api_key, &config.catalog_api_secret),
            )),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub catalog: CatalogStore,
    pub ledger: OrderLedger,
    pub checkout: CheckoutInitiator,
    pub payment: PaymentConfirmation,
    pub shipping: ShipmentCoordinator,
    /// Inbound catalog webhook verifier
    pub catalog_verifier: WebhookVerifier,
    pub auth: AuthChain,
    pub admins: AdminDirectory,
    pub started_at: Instant,
}

impl AppState {
    /// Open the store and connect the HTTP collaborators
    pub fn from_config(config: &Config) -> Result<Self, BoxError> {
        let store = DocumentStore::open(&config.store_path)?;
        let collaborators = Collaborators::http(config)?;
        Ok(Self::build(config, store, collaborators))
    }

    pub fn build(config: &Config, store: DocumentStore, collaborators: Collaborators) -> Self {
        let catalog = CatalogStore::new(store.clone());
        let ledger = OrderLedger::new(store.clone());

        let jwt = JwtService::with_config(JwtConfig::new(
            &config.jwt_secret,
            config.jwt_expiry_hours * 60,
        ));
        let mut auth = AuthChain::new().with(JwtAuthenticator::new(jwt.clone()));
        if let Some(secret) = &config.admin_static_secret {
            auth = auth.with(StaticSecretAuthenticator::new(secret));
        }

        Self {
            checkout: CheckoutInitiator::new(
                catalog.clone(),
                ledger.clone(),
                collaborators.payment.clone(),
                collaborators.checkout,
                &config.currency,
            ),
            payment: PaymentConfirmation::new(
                ledger.clone(),
                collaborators.payment,
                &config.payment_key_secret,
                &config.payment_webhook_secret,
            ),
            shipping: ShipmentCoordinator::new(
                ledger.clone(),
                catalog.clone(),
                collaborators.shipping,
                ShippingSettings {
                    default_pickup_location: config.default_pickup_location.clone(),
                    tracking_base_url: config.shipping_tracking_base_url.clone(),
                    webhook_token: config.shipping_webhook_token.clone(),
                },
            ),
            catalog_verifier: WebhookVerifier::new(
                &config.catalog_api_key,
                &config.catalog_api_secret,
            ),
            admins: AdminDirectory::new(store.clone(), jwt),
            auth,
            catalog,
            ledger,
            store,
            started_at: Instant::now(),
        }
    }

    /// Create the configured bootstrap admin if it does not exist yet
    pub fn bootstrap_admin(&self, config: &Config) -> Result<(), BoxError> {
        if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
            && self.admins.bootstrap(username, password)?
        {
            tracing::info!(username = %username, "Bootstrap admin created");
        }
        Ok(())
    }
}
