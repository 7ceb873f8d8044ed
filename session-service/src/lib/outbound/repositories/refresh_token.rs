use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use scylla::batch::Batch;
use scylla::query::Query;
use scylla::serialize::row::SerializeRow;
use scylla::QueryResult;
use scylla::Session;
use scylla::SessionBuilder;
use uuid::Uuid;

use crate::config::Config;
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

/// Rows fetched per page of an owner or expiry scan.
pub const PAGE_SIZE: i32 = 100;

type RecordRow = (
    Uuid,
    Uuid,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    bool,
    Option<DateTime<Utc>>,
);

/// Cassandra-backed credential store.
///
/// `refresh_tokens` holds records by id; `refresh_tokens_by_owner` is the
/// owner index. Conditional writes are lightweight transactions on
/// `refresh_tokens`.
pub struct CassandraCredentialStore {
    session: Arc<Session>,
}

impl CassandraCredentialStore {
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let session = SessionBuilder::new()
            .known_nodes(&config.cassandra.nodes)
            .build()
            .await?;

        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {}
                    WITH REPLICATION = {{
                        'class': 'SimpleStrategy',
                        'replication_factor': 1
                    }}",
                    &config.cassandra.keyspace
                ),
                &[],
            )
            .await?;

        session
            .use_keyspace(&config.cassandra.keyspace, false)
            .await?;

        session
            .query(
                "CREATE TABLE IF NOT EXISTS refresh_tokens (
                    id uuid PRIMARY KEY,
                    owner_id uuid,
                    secret_digest text,
                    issued_at timestamp,
                    expires_at timestamp,
                    revoked boolean,
                    revoked_at timestamp
                )",
                &[],
            )
            .await?;

        session
            .query(
                "CREATE TABLE IF NOT EXISTS refresh_tokens_by_owner (
                    owner_id uuid,
                    id uuid,
                    PRIMARY KEY (owner_id, id)
                )",
                &[],
            )
            .await?;

        Ok(Self {
            session: Arc::new(session),
        })
    }

    async fn delete_batch<V>(&self, statement: &str, values: Vec<V>) -> Result<(), StoreError>
    where
        V: SerializeRow,
    {
        let mut batch = Batch::default();
        for _ in 0..values.len() {
            batch.append_statement(statement);
        }

        self.session
            .batch(&batch, values)
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        Ok(())
    }
}

/// Read the `[applied]` column of a lightweight transaction result.
fn was_applied(result: &QueryResult) -> Result<bool, StoreError> {
    result
        .rows
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.columns.first())
        .and_then(|column| column.as_ref())
        .and_then(|value| value.as_boolean())
        .ok_or_else(|| StoreError("conditional write returned no [applied] column".to_string()))
}

fn keys_page(result: QueryResult) -> Result<Page<RefreshTokenKey>, StoreError> {
    let next = result.paging_state.as_ref().map(|state| PageToken(state.to_vec()));

    let mut items = Vec::new();
    if let Some(rows) = result.rows {
        for row in rows {
            let (id, owner_id): (Uuid, Uuid) = row
                .into_typed::<(Uuid, Uuid)>()
                .map_err(|e| StoreError(e.to_string()))?;

            items.push(RefreshTokenKey {
                id: RefreshTokenId(id),
                owner_id: UserId(owner_id),
            });
        }
    }

    Ok(Page { items, next })
}

#[async_trait]
impl CredentialStore for CassandraCredentialStore {
    async fn get(&self, id: &RefreshTokenId) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let result = self
            .session
            .query(
                "SELECT id, owner_id, secret_digest, issued_at, expires_at, revoked, revoked_at
                 FROM refresh_tokens
                 WHERE id = ?",
                (id.0,),
            )
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };

        let (id, owner_id, secret_digest, issued_at, expires_at, revoked, revoked_at) = row
            .into_typed::<RecordRow>()
            .map_err(|e| StoreError(e.to_string()))?;

        Ok(Some(RefreshTokenRecord {
            id: RefreshTokenId(id),
            owner_id: UserId(owner_id),
            secret_digest,
            issued_at,
            expires_at,
            revoked,
            revoked_at,
        }))
    }

    async fn put_if_absent(&self, record: &RefreshTokenRecord) -> Result<PutOutcome, StoreError> {
        // Index row first: a record is never stored without one.
        self.session
            .query(
                "INSERT INTO refresh_tokens_by_owner (owner_id, id) VALUES (?, ?)",
                (record.owner_id.0, record.id.0),
            )
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        let result = self
            .session
            .query(
                "INSERT INTO refresh_tokens
                    (id, owner_id, secret_digest, issued_at, expires_at, revoked, revoked_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 IF NOT EXISTS",
                (
                    record.id.0,
                    record.owner_id.0,
                    record.secret_digest.as_str(),
                    record.issued_at,
                    record.expires_at,
                    record.revoked,
                    record.revoked_at,
                ),
            )
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        if was_applied(&result)? {
            return Ok(PutOutcome::Created);
        }

        // The id belongs to another owner's record: drop the index row that
        // would point this owner at it.
        let existing = self.get(&record.id).await?;
        if existing.is_some_and(|existing| existing.owner_id != record.owner_id) {
            self.session
                .query(
                    "DELETE FROM refresh_tokens_by_owner WHERE owner_id = ? AND id = ?",
                    (record.owner_id.0, record.id.0),
                )
                .await
                .map_err(|e| StoreError(e.to_string()))?;
        }

        Ok(PutOutcome::AlreadyExists)
    }

    async fn update_if(
        &self,
        id: &RefreshTokenId,
        patch: TokenPatch,
        condition: TokenCondition,
    ) -> Result<ConditionalWrite, StoreError> {
        let result = self
            .session
            .query(
                "UPDATE refresh_tokens
                 SET revoked = ?, revoked_at = ?
                 WHERE id = ?
                 IF owner_id = ? AND revoked = ?",
                (
                    patch.revoked,
                    patch.revoked_at,
                    id.0,
                    condition.owner_id.0,
                    condition.revoked,
                ),
            )
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        if was_applied(&result)? {
            Ok(ConditionalWrite::Applied)
        } else {
            Ok(ConditionalWrite::ConditionFailed)
        }
    }

    async fn query_by_owner(
        &self,
        owner_id: &UserId,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError> {
        let mut query = Query::new(
            "SELECT id, owner_id FROM refresh_tokens_by_owner WHERE owner_id = ?",
        );
        query.set_page_size(PAGE_SIZE);

        let result = self
            .session
            .query_paged(query, (owner_id.0,), page.map(|token| token.0.into()))
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        keys_page(result)
    }

    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        page: Option<PageToken>,
    ) -> Result<Page<RefreshTokenKey>, StoreError> {
        let mut query = Query::new(
            "SELECT id, owner_id FROM refresh_tokens WHERE expires_at <= ? ALLOW FILTERING",
        );
        query.set_page_size(PAGE_SIZE);

        let result = self
            .session
            .query_paged(query, (now,), page.map(|token| token.0.into()))
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        keys_page(result)
    }

    async fn batch_delete(&self, keys: &[RefreshTokenKey]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        if keys.len() > BATCH_DELETE_LIMIT {
            return Err(StoreError(format!(
                "batch of {} keys exceeds limit of {}",
                keys.len(),
                BATCH_DELETE_LIMIT
            )));
        }

        // Records first: a leftover index row is re-found and re-deleted on
        // the next invalidation, a leftover record would not be.
        self.delete_batch(
            "DELETE FROM refresh_tokens WHERE id = ?",
            keys.iter().map(|key| (key.id.0,)).collect(),
        )
        .await?;

        self.delete_batch(
            "DELETE FROM refresh_tokens_by_owner WHERE owner_id = ? AND id = ?",
            keys.iter().map(|key| (key.owner_id.0, key.id.0)).collect(),
        )
        .await
    }
}
