use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::session::errors::StoreError;
use crate::domain::session::models::ConditionalWrite;
use crate::domain::session::models::Page;
use crate::domain::session::models::PageToken;
use crate::domain::session::models::PutOutcome;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenKey;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::models::TokenCondition;
use crate::domain::session::models::TokenPatch;
use crate::domain::session::ports::CredentialStore;
use crate::domain::session::ports::BATCH_DELETE_LIMIT;
use crate::domain::user::models::UserId;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Process-local credential store.
///
/// Records live in an id-ordered map behind a mutex; every conditional write
/// is evaluated and applied under the lock. Page tokens are the last id
/// returned, so deleting records between pages never skips any.
pub struct InMemoryCredentialStore {
    records: Mutex<BTreeMap<RefreshTokenId, RefreshTokenRecord>>,
    page_size: usize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store returning at most `page_size` keys per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<RefreshTokenId, RefreshTokenRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError("in-memory store lock poisoned".to_string()))
    }

    /// Number of records currently stored for `owner_id`.
    pub fn count_for_owner(&self, owner_id: &UserId) -> usize {
        self.lock()
            .map(|records| {
                records
                    .values()
                    .filter(|record| record.owner_id == *owner_id)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Move a record's expiry one second into the past.
    pub fn expire(&self, id: &RefreshTokenId) {
        if let Ok(mut records) = self.lock() {
            if let Some(record) = records.get_mut(id) {
                record.expires_at = Utc::now() - Duration::seconds(1);
            }
        }
    }

    fn page<F>(
        &self,
        after: Option<PageToken>,
        matches: F,
    ) -> Result<Page<RefreshTokenKey>, StoreError>
    where
        F: Fn(&RefreshTokenRecord) -> bool,
    {
        let cursor = after.map(decode_cursor).transpose()?;
        let records = self.lock()?;

        let lower = cursor.map_or(Bound::Unbounded, Bound::Excluded);
        let mut candidates = records
            .range((lower, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| matches(record));

        let items: Vec<RefreshTokenKey> = candidates
            .by_ref()
            .take(self.page_size)
            .map(RefreshTokenRecord::key)
            .collect();

        let next = match (items.last(), candidates.next()) {
            (Some(last), Some(_)) => Some(PageToken(last.id.as_uuid().as_bytes().to_vec())),
            _ => None,
        };

        Ok(Page { items, next })
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_cursor(token: PageToken) -> Result<RefreshTokenId, StoreError> {
    Uuid::from_slice(&token.0)
        .map(RefreshTokenId)
        .map_err(|e| StoreError(format!("invalid page token: {}", e)))
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, id: &RefreshTokenId) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn put_if_absent(&self, record: &RefreshTokenRecord) -> Result<PutOutcome, StoreError> {
        let mut records = self.lock()?;

        if records.contains_key(&record.id) {
            return Ok(PutOutcome::AlreadyExists);
        }

        records.insert(record.id, record.clone());
        Ok(PutOutcome::Created)
    }

    async fn update_if(
        &self,
        id: &RefreshTokenId,
        patch: TokenPatch,
        condition: TokenCondition,
    ) -> Result<ConditionalWrite, StoreError> {
        let mut records = self.lock()?;

        match records.get_mut(id) {
            Some(record) if condition.holds_for(record) => {
                record.revoked = patch.revoked;
                record.revoked_at = patch.revoked_at;
                Ok(ConditionalWrite::Applied)
            }
            _ => Ok(ConditionalWrite::ConditionFailed),
        }
    }

    async fn query_by_owner(
        &self,
        owner_id: &UserId,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError> {
        self.page(page, |record| record.owner_id == *owner_id)
    }

    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError> {
        self.page(page, |record| record.is_expired(now))
    }

    async fn batch_delete(&self, keys: &[RefreshTokenKey]) -> Result<(), StoreError> {
        if keys.len() > BATCH_DELETE_LIMIT {
            return Err(StoreError(format!(
                "batch of {} keys exceeds limit of {}",
                keys.len(),
                BATCH_DELETE_LIMIT
            )));
        }

        let mut records = self.lock()?;
        for key in keys {
            records.remove(&key.id);
        }
        Ok(())
    }
}
