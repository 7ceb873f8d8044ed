use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use super::errors::SessionError;
use super::models::AccessClaims;
use super::models::AuthenticatedSession;
use super::models::InvalidToken;
use super::models::RefreshTokenId;
use super::models::RegisterCommand;
use super::models::SessionTokens;
use super::models::TokenValidation;
use super::models::TombstoneOutcome;
use super::ports::CredentialStore;
use super::ports::PasswordVerifier;
use super::ports::SessionServicePort;
use super::ports::TokenCodec;
use super::refresh::RefreshTokenManager;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PublicUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

/// Credential lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
        }
    }
}

/// Session orchestrator.
///
/// Issues credential pairs, rotates refresh tokens and reacts to replays of
/// consumed tokens by ending every session of the owner.
pub struct SessionService<CS, PV, TC, UR>
where
    CS: CredentialStore,
    PV: PasswordVerifier,
    TC: TokenCodec,
    UR: UserRepository,
{
    refresh_tokens: RefreshTokenManager<CS, PV>,
    password_verifier: Arc<PV>,
    token_codec: Arc<TC>,
    users: Arc<UR>,
    access_ttl: Duration,
}

impl<CS, PV, TC, UR> SessionService<CS, PV, TC, UR>
where
    CS: CredentialStore,
    PV: PasswordVerifier,
    TC: TokenCodec,
    UR: UserRepository,
{
    pub fn new(
        credential_store: Arc<CS>,
        password_verifier: Arc<PV>,
        token_codec: Arc<TC>,
        users: Arc<UR>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            refresh_tokens: RefreshTokenManager::new(
                credential_store,
                Arc::clone(&password_verifier),
                policy.refresh_ttl,
            ),
            password_verifier,
            token_codec,
            users,
            access_ttl: policy.access_ttl,
        }
    }

    fn sign_access(&self, user: &User) -> Result<String, SessionError> {
        let claims = AccessClaims {
            owner_id: user.id,
            email: user.email.as_str().to_string(),
            is_active: user.is_active,
        };

        self.token_codec
            .sign(&claims, self.access_ttl)
            .map_err(|e| SessionError::Internal(e.to_string()))
    }

    async fn issue_tokens(&self, user: &User) -> Result<SessionTokens, SessionError> {
        let issued = self.refresh_tokens.create(user.id).await?;
        let access_token = self.sign_access(user)?;

        Ok(SessionTokens {
            access_token,
            access_expires_in: self.access_ttl.num_seconds(),
            refresh_token_id: issued.record.id.to_string(),
            refresh_token: issued.plaintext,
        })
    }

    async fn revoke_owner(&self, owner_id: &UserId, reason: &str) -> Result<(), SessionError> {
        let removed = self.refresh_tokens.invalidate_all(owner_id).await?;

        tracing::warn!(
            owner_id = %owner_id,
            removed,
            reason,
            "All sessions revoked"
        );

        Ok(())
    }
}

#[async_trait]
impl<CS, PV, TC, UR> SessionServicePort for SessionService<CS, PV, TC, UR>
where
    CS: CredentialStore,
    PV: PasswordVerifier,
    TC: TokenCodec,
    UR: UserRepository,
{
    async fn register(
        &self,
        command: RegisterCommand,
    ) -> Result<AuthenticatedSession, SessionError> {
        if self.users.find_by_email(&command.email).await?.is_some() {
            return Err(SessionError::Conflict(format!(
                "Email already registered: {}",
                command.email
            )));
        }

        // The repository still rejects a duplicate that slips past the check.
        let password_hash = self.password_verifier.hash(&command.password).await?;

        let user = self
            .users
            .create(User {
                id: UserId::new(),
                email: command.email,
                name: command.name,
                password_hash,
                is_active: true,
                created_at: Utc::now(),
            })
            .await?;

        let tokens = self.issue_tokens(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(AuthenticatedSession {
            tokens,
            user: user.to_public(),
        })
    }

    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<AuthenticatedSession, SessionError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            // Keep the unknown-email path as slow as a wrong password.
            self.password_verifier.hash(password).await?;
            tracing::debug!("Login rejected: unknown email");
            return Err(SessionError::Unauthorized);
        };

        if !self
            .password_verifier
            .compare(password, &user.password_hash)
            .await?
        {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(SessionError::Unauthorized);
        }

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login rejected: inactive account");
            return Err(SessionError::Unauthorized);
        }

        let tokens = self.issue_tokens(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthenticatedSession {
            tokens,
            user: user.to_public(),
        })
    }

    async fn refresh(
        &self,
        id: &RefreshTokenId,
        plaintext: &str,
    ) -> Result<SessionTokens, SessionError> {
        let record = match self.refresh_tokens.validate(id, plaintext).await? {
            TokenValidation::Valid(record) => record,
            TokenValidation::Invalid(InvalidToken::Revoked { owner_id }) => {
                self.revoke_owner(&owner_id, "consumed refresh token presented again")
                    .await?;
                return Err(SessionError::Unauthorized);
            }
            TokenValidation::Invalid(reason) => {
                tracing::debug!(token_id = %id, reason = ?reason, "Refresh rejected");
                return Err(SessionError::Unauthorized);
            }
        };

        match self.refresh_tokens.tombstone(&record).await? {
            TombstoneOutcome::Tombstoned(_) => {}
            TombstoneOutcome::AlreadyTombstoned => {
                // Lost the race to another presenter of the same secret.
                let current = self.refresh_tokens.find_by_id(&record.id).await?;
                if current.map_or(true, |current| current.revoked) {
                    self.revoke_owner(&record.owner_id, "concurrent use of refresh token")
                        .await?;
                }
                return Err(SessionError::Unauthorized);
            }
        }

        let user = match self.users.find_by_id(&record.owner_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.revoke_owner(&record.owner_id, "owner missing or inactive")
                    .await?;
                return Err(SessionError::Unauthorized);
            }
        };

        let tokens = self.issue_tokens(&user).await?;

        // A concurrent replay deletes the consumed record while we rotate;
        // the successor issued above must not outlive that revocation.
        if self.refresh_tokens.find_by_id(&record.id).await?.is_none() {
            self.revoke_owner(&record.owner_id, "sessions revoked during rotation")
                .await?;
        }

        tracing::debug!(
            user_id = %user.id,
            consumed = %record.id,
            issued = %tokens.refresh_token_id,
            "Refresh token rotated"
        );

        Ok(tokens)
    }

    async fn logout(&self, id: &RefreshTokenId, plaintext: &str) -> Result<(), SessionError> {
        match self.refresh_tokens.validate(id, plaintext).await? {
            TokenValidation::Valid(record) => match self.refresh_tokens.tombstone(&record).await? {
                TombstoneOutcome::Tombstoned(_) => {
                    tracing::info!(user_id = %record.owner_id, token_id = %id, "Session ended");
                }
                TombstoneOutcome::AlreadyTombstoned => {
                    // A concurrent refresh consumed the token; its successor stays live.
                    tracing::warn!(
                        user_id = %record.owner_id,
                        token_id = %id,
                        "Logout lost to a concurrent rotation, no session ended"
                    );
                }
            },
            TokenValidation::Invalid(reason) => {
                tracing::debug!(token_id = %id, reason = ?reason, "Logout ignored");
            }
        }

        Ok(())
    }

    async fn logout_all(&self, owner_id: &UserId) -> Result<(), SessionError> {
        let removed = self.refresh_tokens.invalidate_all(owner_id).await?;

        tracing::info!(user_id = %owner_id, removed, "All sessions ended");

        Ok(())
    }

    async fn verify_access_credential(&self, token: &str) -> Result<PublicUser, SessionError> {
        let claims = self.token_codec.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Access credential rejected");
            SessionError::Unauthorized
        })?;

        match self.users.find_by_id(&claims.owner_id).await? {
            Some(user) if user.is_active => Ok(user.to_public()),
            _ => Err(SessionError::Unauthorized),
        }
    }

    async fn sweep_expired(&self) -> Result<usize, SessionError> {
        let removed = self.refresh_tokens.sweep_expired().await?;

        tracing::info!(removed, "Expired refresh tokens swept");

        Ok(removed)
    }
}
