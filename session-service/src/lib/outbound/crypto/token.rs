use auth::Claims;
use auth::JwtError;
use auth::JwtHandler;
use chrono::Duration;

use crate::domain::session::errors::TokenCodecError;
use crate::domain::session::models::AccessClaims;
use crate::domain::session::ports::TokenCodec;
use crate::domain::user::models::UserId;

/// HS256 JWT access credentials.
pub struct JwtTokenCodec {
    handler: JwtHandler,
}

impl JwtTokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            handler: JwtHandler::new(secret),
        }
    }
}

impl TokenCodec for JwtTokenCodec {
    fn sign(&self, claims: &AccessClaims, ttl: Duration) -> Result<String, TokenCodecError> {
        let jwt_claims = Claims::for_user(claims.owner_id, &claims.email, claims.is_active, ttl);

        self.handler
            .encode(&jwt_claims)
            .map_err(|e| TokenCodecError::SigningFailed(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenCodecError> {
        let claims: Claims = self.handler.decode(token).map_err(|e| match e {
            JwtError::TokenExpired => TokenCodecError::Expired,
            other => TokenCodecError::Invalid(other.to_string()),
        })?;

        let owner_id = claims
            .sub
            .as_deref()
            .ok_or_else(|| TokenCodecError::Invalid("missing subject".to_string()))
            .and_then(|sub| {
                UserId::from_string(sub).map_err(|e| TokenCodecError::Invalid(e.to_string()))
            })?;
        let email = claims
            .email()
            .ok_or_else(|| TokenCodecError::Invalid("missing email claim".to_string()))?
            .to_string();
        let is_active = claims
            .is_active()
            .ok_or_else(|| TokenCodecError::Invalid("missing active claim".to_string()))?;

        Ok(AccessClaims {
            owner_id,
            email,
            is_active,
        })
    }
}
