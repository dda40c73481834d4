//! Admin accounts and login

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Admin, AdminRole};
use shared::util::now_millis;

use super::jwt::JwtService;
use super::password::{hash_password, verify_password};
use crate::error::internal;
use crate::security_log;
use crate::store::{ADMINS, DocumentStore};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub role: AdminRole,
}

#[derive(Clone)]
pub struct AdminDirectory {
    store: DocumentStore,
    jwt: JwtService,
}

impl AdminDirectory {
    pub fn new(store: DocumentStore, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    pub fn find(&self, username: &str) -> AppResult<Option<Admin>> {
        Ok(self.store.get(ADMINS, username)?)
    }

    pub fn create(&self, username: &str, password: &str, role: AdminRole) -> AppResult<Admin> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }
        let admin = Admin {
            username: username.trim().to_string(),
            password_hash: hash_password(password)
                .map_err(|e| internal(ErrorCode::InternalError, e))?,
            role,
            created_at: now_millis(),
        };
        self.store.insert_new(ADMINS, &admin.username, &admin)?;
        tracing::info!(username = %admin.username, role = %admin.role, "Admin created");
        Ok(admin)
    }

    /// Create an elevated admin unless one with this name exists
    pub fn bootstrap(&self, username: &str, password: &str) -> AppResult<bool> {
        if self.find(username)?.is_some() {
            return Ok(false);
        }
        self.create(username, password, AdminRole::Elevated)?;
        Ok(true)
    }

    pub fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let admin = self.find(&request.username)?;
        let verified = match &admin {
            Some(admin) => verify_password(&request.password, &admin.password_hash)
                .map_err(|e| internal(ErrorCode::InternalError, e))?,
            None => false,
        };
        let Some(admin) = admin.filter(|_| verified) else {
            security_log!(WARN, "admin_login_failed", username = %request.username);
            return Err(AppError::invalid_credentials());
        };

        let token = self
            .jwt
            .generate_token(&admin.username, admin.role)
            .map_err(|e| internal(ErrorCode::InternalError, e))?;
        security_log!(INFO, "admin_login", username = %admin.username, role = %admin.role);
        Ok(LoginResponse {
            token,
            expires_in: self.jwt.expires_in_secs(),
            role: admin.role,
        })
    }
}
