//! `PostgreSQL` implementation of the `ProgressDocumentStore` trait.
//!
//! Each record is one JSONB row; merge-writes use the JSONB `||`
//! operator so absent patch fields are left untouched. Subscriptions are
//! driven by the `progress_changes` NOTIFY channel fed by a row trigger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use snowball_core::error::DomainError;
use snowball_core::ids::{RecordKey, SessionIdentity};
use snowball_core::record::{AttemptEntry, ProgressPatch, ProgressRecord};
use snowball_core::store::{ProgressDocumentStore, RecordSubscription, SnapshotSender, WriteGuard};

/// Channel the row trigger notifies with the changed record key.
pub const NOTIFY_CHANNEL: &str = "progress_changes";

/// PostgreSQL-backed progress document store.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}

fn encode(patch: &ProgressPatch) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(patch)
        .map_err(|e| DomainError::Infrastructure(format!("patch serialization failed: {e}")))
}

/// Re-reads the record and hands it to the subscriber. Returns `false`
/// once the subscriber has gone away.
async fn forward(store: &PgDocumentStore, key: &RecordKey, sender: &SnapshotSender) -> bool {
    match store.read(key).await {
        Ok(snapshot) => {
            if sender.send(snapshot).is_err() {
                debug!(key = %key, "subscriber gone, closing listener");
                return false;
            }
        }
        Err(e) => warn!(error = %e, key = %key, "failed to re-read record after notify"),
    }
    true
}

fn decode(document: serde_json::Value) -> Result<ProgressRecord, DomainError> {
    serde_json::from_value(document)
        .map_err(|e| DomainError::Infrastructure(format!("record deserialization failed: {e}")))
}

#[async_trait]
impl ProgressDocumentStore for PgDocumentStore {
    async fn sign_in_anonymously(&self) -> Result<SessionIdentity, DomainError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(infra)?;
        Ok(SessionIdentity::new(Uuid::new_v4().to_string()))
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn read(&self, key: &RecordKey) -> Result<Option<ProgressRecord>, DomainError> {
        let document: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM progress_records WHERE record_key = $1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(infra)?;
        document.map(decode).transpose()
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn merge_write(&self, key: &RecordKey, patch: &ProgressPatch) -> Result<(), DomainError> {
        let document = encode(patch)?;
        sqlx::query(
            r"
            INSERT INTO progress_records (record_key, document, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (record_key) DO UPDATE
                SET document = progress_records.document || EXCLUDED.document,
                    updated_at = NOW()
            ",
        )
        .bind(key.as_str())
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        debug!("record merged");
        Ok(())
    }

    #[instrument(skip_all, fields(key = %key, must_exist = guard.must_exist))]
    async fn merge_write_if(
        &self,
        key: &RecordKey,
        patch: &ProgressPatch,
        guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        let document = encode(patch)?;
        let below_step = guard.below_step.map(i64::from);
        let query = if guard.must_exist {
            sqlx::query(
                r"
                UPDATE progress_records
                SET document = document || $2,
                    updated_at = NOW()
                WHERE record_key = $1
                  AND ($3::BIGINT IS NULL
                       OR COALESCE((document->>'maxStepReached')::BIGINT, 0) < $3)
                ",
            )
        } else {
            sqlx::query(
                r"
                INSERT INTO progress_records (record_key, document, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (record_key) DO UPDATE
                    SET document = progress_records.document || EXCLUDED.document,
                        updated_at = NOW()
                    WHERE $3::BIGINT IS NULL
                       OR COALESCE((progress_records.document->>'maxStepReached')::BIGINT, 0) < $3
                ",
            )
        };
        let result = query
            .bind(key.as_str())
            .bind(document)
            .bind(below_step)
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        let written = result.rows_affected() > 0;
        debug!(written, "conditional merge");
        Ok(written)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &RecordKey) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM progress_records WHERE record_key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn subscribe(&self, key: &RecordKey) -> Result<RecordSubscription, DomainError> {
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(infra)?;
        listener.listen(NOTIFY_CHANNEL).await.map_err(infra)?;

        // Listen first, then read, so no change slips in between.
        let (sender, subscription) = RecordSubscription::channel();
        let initial = self.read(key).await?;
        let _ = sender.send(initial);

        let store = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            loop {
                // `None` means the connection dropped and the listener has
                // reconnected. Notifications sent meanwhile are lost.
                let resync = match listener.try_recv().await {
                    Ok(Some(notification)) => notification.payload() == key.as_str(),
                    Ok(None) => {
                        warn!(key = %key, "progress listener reconnected, re-reading record");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, key = %key, "progress listener stopped");
                        break;
                    }
                };
                if resync && !forward(&store, &key, &sender).await {
                    break;
                }
            }
        });

        Ok(subscription)
    }

    #[instrument(skip_all, fields(key = %key, riddle = %attempt.riddle_id))]
    async fn append_attempt(&self, key: &RecordKey, attempt: &AttemptEntry) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO progress_attempts
                (record_key, riddle_id, raw_answer_text, is_correct, attempted_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(key.as_str())
        .bind(&attempt.riddle_id)
        .bind(&attempt.raw_answer_text)
        .bind(attempt.is_correct)
        .bind(attempt.timestamp)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }

    async fn recent_attempts(
        &self,
        key: &RecordKey,
        limit: usize,
    ) -> Result<Vec<AttemptEntry>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(String, String, bool, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT riddle_id, raw_answer_text, is_correct, attempted_at
            FROM progress_attempts
            WHERE record_key = $1
            ORDER BY attempted_at DESC, attempt_id DESC
            LIMIT $2
            ",
        )
        .bind(key.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        Ok(rows
            .into_iter()
            .map(|(riddle_id, raw_answer_text, is_correct, timestamp)| AttemptEntry {
                riddle_id,
                raw_answer_text,
                is_correct,
                timestamp,
            })
            .collect())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn clear_attempts(&self, key: &RecordKey) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM progress_attempts WHERE record_key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(infra)?;
        Ok(result.rows_affected())
    }
}
