use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::session::errors::RefreshTokenIdError;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PublicUser;
use crate::domain::user::models::UserId;

/// Refresh token record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefreshTokenId(pub Uuid);

impl RefreshTokenId {
    /// Generate a new random token ID (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, RefreshTokenIdError> {
        Uuid::parse_str(s)
            .map(RefreshTokenId)
            .map_err(|e| RefreshTokenIdError::InvalidFormat(e.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RefreshTokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-side bookkeeping for one single-use refresh secret.
///
/// Only the digest of the secret is ever stored. `revoked` moves from
/// `false` to `true` at most once, through a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub owner_id: UserId,
    pub secret_digest: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Build a fresh, unrevoked record valid for `ttl` from `issued_at`.
    pub fn new(
        owner_id: UserId,
        secret_digest: String,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: RefreshTokenId::new(),
            owner_id,
            secret_digest,
            issued_at,
            expires_at: issued_at + ttl,
            revoked: false,
            revoked_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn key(&self) -> RefreshTokenKey {
        RefreshTokenKey {
            id: self.id,
            owner_id: self.owner_id,
        }
    }
}

/// Primary key pair of a stored refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTokenKey {
    pub id: RefreshTokenId,
    pub owner_id: UserId,
}

/// Newly created refresh token.
///
/// `plaintext` is handed to the client exactly once and never stored.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub plaintext: String,
    pub record: RefreshTokenRecord,
}

/// Fields written by a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPatch {
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl TokenPatch {
    pub fn revoke(at: DateTime<Utc>) -> Self {
        Self {
            revoked: true,
            revoked_at: Some(at),
        }
    }
}

/// Predicate over the stored record that must hold for a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCondition {
    pub owner_id: UserId,
    pub revoked: bool,
}

impl TokenCondition {
    /// Record belongs to `owner_id` and is not yet revoked.
    pub fn active_for(owner_id: UserId) -> Self {
        Self {
            owner_id,
            revoked: false,
        }
    }

    pub fn holds_for(&self, record: &RefreshTokenRecord) -> bool {
        record.owner_id == self.owner_id && record.revoked == self.revoked
    }
}

/// Result of an insert guarded by "no record with this id exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

/// Result of a compare-and-set update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalWrite {
    Applied,
    ConditionFailed,
}

/// Opaque continuation token for paged store reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(pub Vec<u8>);

/// One page of a paged store read.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Why a presented refresh token was rejected.
///
/// `Revoked` and `Expired` are only reported once the presented secret has
/// matched the stored digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidToken {
    NotFound,
    DigestMismatch,
    Revoked { owner_id: UserId },
    Expired { owner_id: UserId },
}

/// Outcome of validating an `(id, plaintext)` pair. Never mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    Valid(RefreshTokenRecord),
    Invalid(InvalidToken),
}

/// Outcome of attempting to consume a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TombstoneOutcome {
    Tombstoned(RefreshTokenRecord),
    AlreadyTombstoned,
}

/// Identity claims signed into an access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub owner_id: UserId,
    pub email: String,
    pub is_active: bool,
}

/// Registration input, already parsed into domain types.
#[derive(Debug)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub password: String,
    pub name: DisplayName,
}

impl RegisterCommand {
    pub fn new(email: EmailAddress, password: String, name: DisplayName) -> Self {
        Self {
            email,
            password,
            name,
        }
    }
}

/// Credential pair handed to a client after login, registration or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token_id: String,
    pub refresh_token: String,
}

/// Result of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedSession {
    pub tokens: SessionTokens,
    pub user: PublicUser,
}
