use std::collections::HashMap;

use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

const EMAIL_CLAIM: &str = "email";
const ACTIVE_CLAIM: &str = "active";

/// Access credential claims.
///
/// Standard RFC 7519 claims plus identity fields carried in the flattened
/// `extra` map (`email`, `active`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user identifier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration time (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build claims for an authenticated user, valid for `ttl` from now.
    ///
    /// # Arguments
    /// * `user_id` - Unique user identifier (becomes `sub`)
    /// * `email` - Email address of the user
    /// * `is_active` - Account status at issuance time
    /// * `ttl` - Lifetime of the credential
    pub fn for_user(user_id: impl ToString, email: &str, is_active: bool, ttl: Duration) -> Self {
        let now = Utc::now();

        Self::new()
            .with_subject(user_id)
            .with_issued_at(now.timestamp())
            .with_expiration((now + ttl).timestamp())
            .with_extra(EMAIL_CLAIM, email)
            .with_extra(ACTIVE_CLAIM, is_active)
    }

    pub fn with_subject(mut self, sub: impl ToString) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Set issued at (Unix timestamp).
    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Add a custom field.
    pub fn with_extra(mut self, key: impl ToString, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn email(&self) -> Option<&str> {
        self.extra.get(EMAIL_CLAIM).and_then(|v| v.as_str())
    }

    pub fn is_active(&self) -> Option<bool> {
        self.extra.get(ACTIVE_CLAIM).and_then(|v| v.as_bool())
    }
}
