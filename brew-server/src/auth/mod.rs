//! Admin authentication
//!
//! - [`JwtService`] - admin token issue/validation
//! - [`AuthChain`] - ordered [`Authenticator`] strategies
//! - [`AdminDirectory`] - stored accounts, login, bootstrap
//! - [`require_admin`] / [`require_elevated`] - route guards

pub mod authenticator;
pub mod directory;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use authenticator::{
    ADMIN_SECRET_HEADER, AuthChain, AuthMethod, Authenticator, CurrentAdmin, JwtAuthenticator,
    StaticSecretAuthenticator,
};
pub use directory::{AdminDirectory, LoginRequest, LoginResponse};
pub use jwt::{AdminClaims, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_elevated};
