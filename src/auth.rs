//! Bearer token issuing/validation and password hashing.
//!
//! Tokens are HS256 JWTs signed with `auth.session_secret`. The claims carry
//! the permissions granted to the account's role at issue time, so handlers
//! never re-read the user row to authorize.

use crate::app_config::AuthConfig;
use crate::orm::users::{self, Role};
use crate::permission::permissions_for_role;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

/// Secrets shorter than this are accepted but logged as weak.
pub const MIN_SECRET_LENGTH: usize = 32;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Authenticated caller, decoded once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))?;

        Ok(Self {
            id,
            username: claims.username,
            role: claims.role,
            permissions: claims.permissions,
        })
    }
}

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing authorization header
    MissingToken,
    /// Header present but not `Bearer <token>`
    InvalidTokenFormat,
    /// Signature or claim validation failed
    InvalidToken(String),
    /// Token expired
    TokenExpired,
    /// Signing failed
    Encoding(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Authorization header is required"),
            AuthError::InvalidTokenFormat => {
                write!(f, "Invalid authorization header. Expected: Bearer <token>")
            }
            AuthError::InvalidToken(e) => write!(f, "Invalid token: {}", e),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::Encoding(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

/// Signing and verification keys derived from the server secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_hours: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_hours: i64::from(ttl_hours.max(1)),
        }
    }

    /// Build keys from configuration. A missing secret is replaced with a
    /// random one, which invalidates every token on restart.
    pub fn from_config(config: &AuthConfig) -> Self {
        if config.session_secret.is_empty() {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();
            log::warn!(
                "SESSION_SECRET is not set. Tokens are signed with a random key and will be invalidated every time the application is restarted."
            );
            return Self::new(random_string.as_bytes(), config.token_ttl_hours);
        }

        if config.session_secret.len() < MIN_SECRET_LENGTH {
            log::warn!(
                "SESSION_SECRET is {} bytes; at least {} bytes is recommended.",
                config.session_secret.len(),
                MIN_SECRET_LENGTH
            );
        }

        Self::new(config.session_secret.as_bytes(), config.token_ttl_hours)
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &users::Model) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            permissions: permissions_for_role(user.role),
            iat: now,
            exp: now + self.ttl_hours * 3600,
        };

        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                    AuthError::TokenExpired
                } else {
                    AuthError::InvalidToken(e.to_string())
                }
            })
    }

    /// Resolve an `Authorization` header value into a caller.
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthUser, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = extract_token(header)?;
        AuthUser::try_from(self.validate(token)?)
    }
}

/// Strip the `Bearer ` scheme from an authorization header.
pub fn extract_token(auth_header: &str) -> Result<&str, AuthError> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidTokenFormat)
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}
