//! Admin authentication strategies
//!
//! Two strategies are tried in a fixed order:
//!
//! 1. [`JwtAuthenticator`] - `Authorization: Bearer <jwt>` from `/admin/login`
//! 2. [`StaticSecretAuthenticator`] - legacy shared secret in `X-Admin-Secret`
//!
//! A strategy returns `Ok(None)` when the request carries no credential of
//! its kind, so the next one gets a chance. A credential that is present but
//! invalid fails the request immediately.

use std::sync::Arc;

use axum::http::HeaderMap;
use shared::error::AppError;
use shared::models::AdminRole;

use super::jwt::{JwtError, JwtService};
use crate::security_log;
use crate::signature::constant_time_eq;

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Jwt,
    StaticSecret,
}

/// Authenticated admin, injected into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAdmin {
    pub username: String,
    pub role: AdminRole,
    pub method: AuthMethod,
}

impl CurrentAdmin {
    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

pub trait Authenticator: Send + Sync {
    fn name(&self) -> &'static str;

    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<CurrentAdmin>, AppError>;
}

pub struct JwtAuthenticator {
    jwt: JwtService,
}

impl JwtAuthenticator {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

impl Authenticator for JwtAuthenticator {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<CurrentAdmin>, AppError> {
        let Some(header) = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            return Ok(None);
        };
        let token = JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

        match self.jwt.validate_token(token) {
            Ok(claims) => Ok(Some(CurrentAdmin {
                username: claims.sub,
                role: claims.role,
                method: AuthMethod::Jwt,
            })),
            Err(e) => {
                security_log!(WARN, "admin_token_rejected", error = %e);
                match e {
                    JwtError::ExpiredToken => Err(AppError::token_expired()),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}

/// Legacy shared-secret access, limited to the standard role
pub struct StaticSecretAuthenticator {
    secret: String,
}

impl StaticSecretAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for StaticSecretAuthenticator {
    fn name(&self) -> &'static str {
        "static_secret"
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<CurrentAdmin>, AppError> {
        let Some(claimed) = headers
            .get(ADMIN_SECRET_HEADER)
            .and_then(|h| h.to_str().ok())
        else {
            return Ok(None);
        };
        if self.secret.is_empty() || !constant_time_eq(claimed, &self.secret) {
            security_log!(WARN, "admin_secret_rejected", header = ADMIN_SECRET_HEADER);
            return Err(AppError::invalid_credentials());
        }
        Ok(Some(CurrentAdmin {
            username: "static-admin".to_string(),
            role: AdminRole::Standard,
            method: AuthMethod::StaticSecret,
        }))
    }
}

/// Ordered list of strategies
#[derive(Clone, Default)]
pub struct AuthChain {
    strategies: Vec<Arc<dyn Authenticator>>,
}

impl AuthChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl Authenticator + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentAdmin, AppError> {
        for strategy in &self.strategies {
            if let Some(admin) = strategy.authenticate(headers)? {
                tracing::debug!(
                    strategy = strategy.name(),
                    username = %admin.username,
                    "Admin authenticated"
                );
                return Ok(admin);
            }
        }
        security_log!(WARN, "admin_auth_missing", strategies = self.strategies.len());
        Err(AppError::unauthorized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtConfig;
    use axum::http::HeaderValue;
    use shared::error::ErrorCode;

    fn jwt() -> JwtService {
        JwtService::with_config(JwtConfig::new("test-secret-at-least-32-bytes-long!", 60))
    }

    fn chain() -> AuthChain {
        AuthChain::new()
            .with(JwtAuthenticator::new(jwt()))
            .with(StaticSecretAuthenticator::new("legacy-secret"))
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_jwt_strategy_carries_role() {
        let token = jwt().generate_token("ops", AdminRole::Elevated).unwrap();
        let admin = chain()
            .authenticate(&headers(&[(
                "authorization",
                format!("Bearer {token}").as_str(),
            )]))
            .unwrap();
        assert_eq!(admin.username, "ops");
        assert!(admin.is_elevated());
        assert_eq!(admin.method, AuthMethod::Jwt);
    }

    #[test]
    fn test_static_secret_is_standard_only() {
        let admin = chain()
            .authenticate(&headers(&[(ADMIN_SECRET_HEADER, "legacy-secret")]))
            .unwrap();
        assert_eq!(admin.role, AdminRole::Standard);
        assert_eq!(admin.method, AuthMethod::StaticSecret);
    }

    #[test]
    fn test_rejections() {
        let err = chain().authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);

        let err = chain()
            .authenticate(&headers(&[(ADMIN_SECRET_HEADER, "guess")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);

        let err = chain()
            .authenticate(&headers(&[("authorization", "Bearer not.a.jwt")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_empty_static_secret_never_matches() {
        let chain = AuthChain::new().with(StaticSecretAuthenticator::new(""));
        assert!(chain.authenticate(&headers(&[(ADMIN_SECRET_HEADER, "")])).is_err());
    }
}
