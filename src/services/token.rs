//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying the user id, issue time, and expiry.
//! Password-change invalidation is checked against `iat` by the auth
//! middleware, not here.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Your token has expired. Please log in again")]
    Expired,

    #[error("Invalid token. Please log in again")]
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i32,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Signs a token for the given user, valid from now.
    pub fn issue(&self, user_id: i32) -> Result<(String, Claims), TokenError> {
        self.issue_at(user_id, chrono::Utc::now().timestamp())
    }

    /// Signs a token with an explicit issue time. Exposed for expiry and
    /// password-change-invalidation tests.
    pub fn issue_at(&self, user_id: i32, iat: i64) -> Result<(String, Claims), TokenError> {
        let claims = Claims {
            sub: user_id,
            iat,
            exp: iat + self.expiry_seconds,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Invalid)?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret", 3600)
    }

    #[test]
    fn issued_tokens_verify() {
        let svc = service();
        let (token, claims) = svc.issue(42).unwrap();
        let verified = svc.verify(&token).unwrap();
        assert_eq!(verified.sub, 42);
        assert_eq!(verified.iat, claims.iat);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let svc = service();
        let stale = chrono::Utc::now().timestamp() - 7200;
        let (token, _) = svc.issue_at(7, stale).unwrap();
        assert!(matches!(svc.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn garbage_and_wrong_secret_are_invalid() {
        let svc = service();
        assert!(matches!(
            svc.verify("not-a-token"),
            Err(TokenError::Invalid)
        ));

        let other = TokenService::new("different-secret", 3600);
        let (token, _) = other.issue(1).unwrap();
        assert!(matches!(svc.verify(&token), Err(TokenError::Invalid)));
    }
}
