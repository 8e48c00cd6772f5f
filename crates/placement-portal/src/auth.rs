//! Bearer-token identity check and role gate.
//!
//! Tokens are issued upstream; this module only verifies them. The caller's role always comes
//! from the verified claims and is matched against the fixed [`Role`] set.

use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::envelope::failure_response;
use crate::users::UserId;

/// Roles recognised by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Junior,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Junior => "junior",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            "junior" => Some(Role::Junior),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
}

/// Verified caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// HS256 verifier built from the configured secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            },
        )?;

        Ok(Identity {
            user_id: UserId(data.claims.sub),
            role: data.claims.role,
        })
    }
}

/// Identity gate failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No authorization header provided")]
    MissingHeader,
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Invalid or expired token")]
    Expired,
    #[error("Access denied. Required role: {required}")]
    Forbidden { required: Role },
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "MISSING_AUTH_HEADER",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::Invalid => "INVALID_TOKEN",
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::Forbidden { .. } => "INSUFFICIENT_PERMISSIONS",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        failure_response(status, self.code(), self.to_string())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;
    let raw = header.to_str().map_err(|_| AuthError::MissingToken)?;
    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::MissingToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let token = bearer_token(parts)?;
        verifier.verify(token)
    }
}

/// Caller authenticated with the `student` role.
#[derive(Debug, Clone, Copy)]
pub struct StudentIdentity(pub Identity);

/// Caller authenticated with the `admin` role.
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity(pub Identity);

async fn identity_with_role<S>(
    parts: &mut Parts,
    state: &S,
    required: Role,
) -> Result<Identity, AuthError>
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    let identity = Identity::from_request_parts(parts, state).await?;
    if identity.role != required {
        return Err(AuthError::Forbidden { required });
    }
    Ok(identity)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for StudentIdentity
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        identity_with_role(parts, state, Role::Student)
            .await
            .map(StudentIdentity)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        identity_with_role(parts, state, Role::Admin)
            .await
            .map(AdminIdentity)
    }
}
