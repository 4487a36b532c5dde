use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use snapgram_types::AuthResponse;

use crate::config::AuthSettings;
use crate::db::repositories::UserRepository;
use crate::db::Database;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Basic `local@domain.tld` shape; deliverability is not checked
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Failed to compile email regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Unknown email and wrong password are deliberately the same error
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication token required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Identity embedded in every issued token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(id: i64, username: String, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }
}

/// Registration, login and bearer-token verification.
///
/// The signing secret, token lifetime and hashing cost all come from
/// [`AuthSettings`] at construction; nothing is read from process state.
#[derive(Clone)]
pub struct CredentialService {
    db: Database,
    params: Params,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl CredentialService {
    pub fn new(db: Database, settings: &AuthSettings) -> anyhow::Result<Self> {
        let params = Params::new(settings.hash_memory_kib, settings.hash_iterations, 1, None)
            .map_err(|e| anyhow!("Invalid password hashing parameters: {}", e))?;
        let secret = settings.jwt_secret.as_bytes();

        Ok(Self {
            db,
            params,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            token_ttl: Duration::hours(settings.token_ttl_hours),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC hash string. The cost
    /// parameters are read from the hash itself.
    pub fn verify_password(&self, password: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("Corrupt password hash: {}", e))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Create an account and return a token for it
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> CredentialResult<AuthResponse> {
        let username = username.trim();
        let email = email.trim();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CredentialError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CredentialError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if !is_valid_email(email) {
            return Err(CredentialError::Validation("Invalid email address".to_string()));
        }

        let users = UserRepository::new(self.db.pool.clone());
        if users.username_exists(username)? {
            return Err(CredentialError::Conflict("Username already taken".to_string()));
        }
        if users.email_exists(email)? {
            return Err(CredentialError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(password)?;
        let user = users
            .create(username, email, &password_hash)?
            .ok_or_else(|| {
                CredentialError::Conflict("Username or email already registered".to_string())
            })?;

        tracing::info!("Registered user {} ({})", user.id, user.username);
        self.issue(user.id, user.username)
    }

    /// Log in by email and password
    pub fn authenticate(&self, email: &str, password: &str) -> CredentialResult<AuthResponse> {
        let users = UserRepository::new(self.db.pool.clone());
        let credentials = users
            .get_credentials_by_email(email.trim())?
            .ok_or(CredentialError::InvalidCredentials)?;

        if !self.verify_password(password, &credentials.password_hash)? {
            tracing::debug!("Password mismatch for user {}", credentials.user.id);
            return Err(CredentialError::InvalidCredentials);
        }

        self.issue(credentials.user.id, credentials.user.username)
    }

    /// Validate a bearer token and return the identity it carries
    pub fn verify_token(&self, token: &str) -> CredentialResult<Claims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::MissingToken);
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                CredentialError::InvalidToken
            })
    }

    pub fn encode_claims(&self, claims: &Claims) -> anyhow::Result<String> {
        encode(&Header::default(), claims, &self.encoding_key).context("Failed to sign token")
    }

    fn issue(&self, id: i64, username: String) -> CredentialResult<AuthResponse> {
        let claims = Claims::new(id, username.clone(), self.token_ttl);
        let token = self.encode_claims(&claims)?;
        Ok(AuthResponse { token, id, username })
    }
}
