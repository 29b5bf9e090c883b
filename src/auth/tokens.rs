use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::AuthTokens;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub kind: TokenKind,
}

/// Issues and verifies HS256 access/refresh tokens
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: &str) -> Result<AuthTokens, AppError> {
        Ok(AuthTokens {
            access_token: self.issue(user_id, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(user_id, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(&self, user_id: &str, kind: TokenKind, ttl: Duration) -> Result<String, AppError> {
        let iat = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.as_secs(),
            kind,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify an access token and return the user id it was issued to
    pub fn verify_access(&self, token: &str) -> Result<String, AppError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<String, AppError> {
        self.verify(token, TokenKind::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<String, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        if data.claims.kind != expected {
            return Err(AppError::Unauthorized("Invalid token type".into()));
        }

        Ok(data.claims.sub)
    }
}
