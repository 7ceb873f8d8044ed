use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::session::errors::PasswordVerifierError;
use crate::domain::session::errors::SessionError;
use crate::domain::session::errors::StoreError;
use crate::domain::session::errors::TokenCodecError;
use crate::domain::session::models::AccessClaims;
use crate::domain::session::models::AuthenticatedSession;
use crate::domain::session::models::ConditionalWrite;
use crate::domain::session::models::Page;
use crate::domain::session::models::PageToken;
use crate::domain::session::models::PutOutcome;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenKey;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::SessionTokens;
use crate::domain::session::models::TokenCondition;
use crate::domain::session::models::TokenPatch;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PublicUser;
use crate::domain::user::models::UserId;

/// Maximum number of keys accepted by a single `batch_delete` call.
pub const BATCH_DELETE_LIMIT: usize = 25;

/// Port for the session operations exposed to the routing layer.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Create an account and open its first session.
    ///
    /// # Errors
    /// * `Conflict` - Email is already registered
    /// * `StorageFailure` - A store was unreachable
    async fn register(&self, command: RegisterCommand)
        -> Result<AuthenticatedSession, SessionError>;

    /// Open a session for existing credentials.
    ///
    /// # Errors
    /// * `Unauthorized` - Unknown email, wrong password or inactive account
    /// * `StorageFailure` - A store was unreachable
    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<AuthenticatedSession, SessionError>;

    /// Consume a refresh token and rotate it into a new credential pair.
    ///
    /// Must not be retried with the same secret after a timeout.
    ///
    /// # Errors
    /// * `Unauthorized` - Token invalid, expired, already used, or owner gone
    /// * `StorageFailure` - The credential store was unreachable
    async fn refresh(
        &self,
        id: &RefreshTokenId,
        plaintext: &str,
    ) -> Result<SessionTokens, SessionError>;

    /// End the session of one refresh token. Idempotent.
    ///
    /// # Errors
    /// * `StorageFailure` - The credential store was unreachable
    async fn logout(&self, id: &RefreshTokenId, plaintext: &str) -> Result<(), SessionError>;

    /// End every session of a user.
    ///
    /// # Errors
    /// * `StorageFailure` - The credential store was unreachable
    async fn logout_all(&self, owner_id: &UserId) -> Result<(), SessionError>;

    /// Verify a bearer access credential and resolve its current user.
    ///
    /// # Errors
    /// * `Unauthorized` - Token malformed, expired, badly signed, or user gone
    async fn verify_access_credential(&self, token: &str) -> Result<PublicUser, SessionError>;

    /// Delete every expired refresh token record.
    ///
    /// # Returns
    /// Number of records removed
    async fn sweep_expired(&self) -> Result<usize, SessionError>;
}

/// Key-value store holding refresh token records.
///
/// Mutual exclusion between concurrent callers relies entirely on
/// `put_if_absent` and `update_if` being atomic per record.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Fetch a record by id.
    async fn get(&self, id: &RefreshTokenId) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Insert a record unless one with the same id exists.
    async fn put_if_absent(&self, record: &RefreshTokenRecord) -> Result<PutOutcome, StoreError>;

    /// Apply `patch` only if `condition` holds for the stored record.
    ///
    /// A missing record fails the condition.
    async fn update_if(
        &self,
        id: &RefreshTokenId,
        patch: TokenPatch,
        condition: TokenCondition,
    ) -> Result<ConditionalWrite, StoreError>;

    /// One page of the keys owned by `owner_id`.
    async fn query_by_owner(
        &self,
        owner_id: &UserId,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError>;

    /// One page of the keys whose `expires_at` is at or before `now`.
    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError>;

    /// Delete up to `BATCH_DELETE_LIMIT` records. Missing keys are ignored.
    async fn batch_delete(&self, keys: &[RefreshTokenKey]) -> Result<(), StoreError>;
}

/// One-way hashing for passwords and refresh secrets.
#[async_trait]
pub trait PasswordVerifier: Send + Sync + 'static {
    async fn hash(&self, secret: &str) -> Result<String, PasswordVerifierError>;

    /// Compare a plaintext with a digest. A malformed digest never matches.
    async fn compare(&self, secret: &str, digest: &str) -> Result<bool, PasswordVerifierError>;
}

/// Signs and verifies stateless access credentials.
pub trait TokenCodec: Send + Sync + 'static {
    fn sign(&self, claims: &AccessClaims, ttl: Duration) -> Result<String, TokenCodecError>;

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenCodecError>;
}
