use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;

use crate::domain::session::errors::RefreshTokenError;
use crate::domain::session::models::ConditionalWrite;
use crate::domain::session::models::InvalidToken;
use crate::domain::session::models::IssuedRefreshToken;
use crate::domain::session::models::Page;
use crate::domain::session::models::PutOutcome;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenKey;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::TokenCondition;
use crate::domain::session::models::TokenPatch;
use crate::domain::session::models::TokenValidation;
use crate::domain::session::models::TombstoneOutcome;
use crate::domain::session::ports::CredentialStore;
use crate::domain::session::ports::PasswordVerifier;
use crate::domain::session::ports::BATCH_DELETE_LIMIT;
use crate::domain::user::models::UserId;

/// Lifecycle of refresh token records.
///
/// Creation, read-only validation, single-use consumption (tombstoning),
/// per-owner invalidation and the expiry sweep. Concurrency control is the
/// store's conditional write; this type holds no locks.
pub struct RefreshTokenManager<CS, PV>
where
    CS: CredentialStore,
    PV: PasswordVerifier,
{
    store: Arc<CS>,
    password_verifier: Arc<PV>,
    ttl: Duration,
}

impl<CS, PV> RefreshTokenManager<CS, PV>
where
    CS: CredentialStore,
    PV: PasswordVerifier,
{
    /// Create a manager issuing records valid for `ttl`.
    pub fn new(store: Arc<CS>, password_verifier: Arc<PV>, ttl: Duration) -> Self {
        Self {
            store,
            password_verifier,
            ttl,
        }
    }

    /// Issue a new refresh token for `owner_id`.
    ///
    /// # Returns
    /// The plaintext secret (for the client, once) and the stored record
    ///
    /// # Errors
    /// * `IdCollision` - A record with the generated id already exists
    /// * `Hashing` - Digest computation failed
    /// * `Storage` - Store unavailable
    pub async fn create(&self, owner_id: UserId) -> Result<IssuedRefreshToken, RefreshTokenError> {
        let plaintext = auth::generate_secret();
        let secret_digest = self.password_verifier.hash(&plaintext).await?;
        let record = RefreshTokenRecord::new(owner_id, secret_digest, Utc::now(), self.ttl);

        match self.store.put_if_absent(&record).await? {
            PutOutcome::Created => {
                tracing::debug!(
                    token_id = %record.id,
                    owner_id = %owner_id,
                    expires_at = %record.expires_at,
                    "Refresh token issued"
                );
                Ok(IssuedRefreshToken { plaintext, record })
            }
            PutOutcome::AlreadyExists => {
                tracing::error!(token_id = %record.id, "Refresh token id collision");
                Err(RefreshTokenError::IdCollision(record.id))
            }
        }
    }

    pub async fn find_by_id(
        &self,
        id: &RefreshTokenId,
    ) -> Result<Option<RefreshTokenRecord>, RefreshTokenError> {
        Ok(self.store.get(id).await?)
    }

    /// Check an `(id, plaintext)` pair without changing any state.
    ///
    /// Checks run in order: existence, digest, revocation, expiry. A revoked
    /// or expired record is only reported as such when the digest matched.
    ///
    /// # Errors
    /// * `Storage` - Store unavailable
    /// * `Hashing` - Digest comparison failed
    pub async fn validate(
        &self,
        id: &RefreshTokenId,
        plaintext: &str,
    ) -> Result<TokenValidation, RefreshTokenError> {
        let Some(record) = self.store.get(id).await? else {
            return Ok(TokenValidation::Invalid(InvalidToken::NotFound));
        };

        if !self
            .password_verifier
            .compare(plaintext, &record.secret_digest)
            .await?
        {
            return Ok(TokenValidation::Invalid(InvalidToken::DigestMismatch));
        }

        if record.revoked {
            return Ok(TokenValidation::Invalid(InvalidToken::Revoked {
                owner_id: record.owner_id,
            }));
        }

        if record.is_expired(Utc::now()) {
            return Ok(TokenValidation::Invalid(InvalidToken::Expired {
                owner_id: record.owner_id,
            }));
        }

        Ok(TokenValidation::Valid(record))
    }

    /// Consume a record by marking it revoked.
    ///
    /// Succeeds only if the stored record still belongs to the same owner and
    /// is unrevoked. Any other state, including a record deleted in the
    /// meantime, yields `AlreadyTombstoned`.
    ///
    /// # Errors
    /// * `Storage` - Store unavailable
    pub async fn tombstone(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<TombstoneOutcome, RefreshTokenError> {
        let revoked_at = Utc::now();

        let outcome = self
            .store
            .update_if(
                &record.id,
                TokenPatch::revoke(revoked_at),
                TokenCondition::active_for(record.owner_id),
            )
            .await?;

        match outcome {
            ConditionalWrite::Applied => {
                tracing::debug!(token_id = %record.id, "Refresh token tombstoned");
                Ok(TombstoneOutcome::Tombstoned(RefreshTokenRecord {
                    revoked: true,
                    revoked_at: Some(revoked_at),
                    ..record.clone()
                }))
            }
            ConditionalWrite::ConditionFailed => Ok(TombstoneOutcome::AlreadyTombstoned),
        }
    }

    /// Delete every record owned by `owner_id`. Idempotent.
    ///
    /// Passes over the owner's keys repeat until one finds nothing, so a
    /// record created while a pass is running is caught by the next one.
    ///
    /// # Returns
    /// Number of records deleted
    ///
    /// # Errors
    /// * `Storage` - Store unavailable; some records may already be gone
    pub async fn invalidate_all(&self, owner_id: &UserId) -> Result<usize, RefreshTokenError> {
        let mut removed = 0;

        loop {
            let pass = self.invalidation_pass(owner_id).await?;
            if pass == 0 {
                break;
            }
            removed += pass;
        }

        tracing::debug!(owner_id = %owner_id, removed, "Refresh tokens invalidated");
        Ok(removed)
    }

    async fn invalidation_pass(&self, owner_id: &UserId) -> Result<usize, RefreshTokenError> {
        let mut removed = 0;
        let mut page_token = None;

        loop {
            let Page { items, next } = self.store.query_by_owner(owner_id, page_token).await?;
            removed += self.delete_in_batches(&items).await?;

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(removed)
    }

    /// Delete every record past its expiry, system-wide.
    ///
    /// Intended for periodic background runs.
    ///
    /// # Returns
    /// Number of records deleted
    ///
    /// # Errors
    /// * `Storage` - Store unavailable; some records may already be gone
    pub async fn sweep_expired(&self) -> Result<usize, RefreshTokenError> {
        let now = Utc::now();
        let mut removed = 0;
        let mut page_token = None;

        loop {
            let Page { items, next } = self.store.scan_expired(now, page_token).await?;
            removed += self.delete_in_batches(&items).await?;

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(removed)
    }

    async fn delete_in_batches(&self, keys: &[RefreshTokenKey]) -> Result<usize, RefreshTokenError> {
        for batch in keys.chunks(BATCH_DELETE_LIMIT) {
            self.store.batch_delete(batch).await?;
        }
        Ok(keys.len())
    }
}
