//! `PostgreSQL` archive for terminal steps and campaign snapshots.
//!
//! The in-memory store is authoritative during a run; the archive is the
//! durable history the operators inspect afterwards. Steps land once they
//! reach a terminal status, campaigns are snapshotted on every ledger
//! change. Inserts are batched with multi-row UNNEST statements to keep
//! round-trips low.

use agora_types::{ActivityStep, Campaign};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

/// Default batch size for step inserts.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Archive writer bound to a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PostgresArchive {
    pool: PgPool,
    batch_size: usize,
}

impl PostgresArchive {
    /// Connect to the archive database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(4).connect(url).await?;
        Ok(Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Create the archive tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] if schema creation fails.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS archived_steps (
                id UUID PRIMARY KEY,
                chain_id UUID NOT NULL,
                seq INT NOT NULL,
                kind TEXT NOT NULL,
                agent_id UUID NOT NULL,
                status TEXT NOT NULL,
                starts_at TIMESTAMPTZ NOT NULL,
                ends_at TIMESTAMPTZ NOT NULL,
                from_location UUID,
                to_location UUID,
                payload JSONB NOT NULL,
                failure_reason TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS campaign_snapshots (
                id UUID PRIMARY KEY,
                organizer UUID NOT NULL,
                status TEXT NOT NULL,
                reason TEXT,
                ledger JSONB NOT NULL,
                snapshot_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Batch-insert terminal steps into the archive.
    ///
    /// Each batch uses a single INSERT with UNNEST value arrays and is
    /// wrapped in a transaction, so either the whole batch is committed or
    /// none of it. Re-archiving a step is a no-op (`ON CONFLICT DO
    /// NOTHING`) because terminal steps never change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] on insert failure or
    /// [`StoreError::Serialization`] if a payload cannot be encoded.
    pub async fn archive_steps(&self, steps: &[ActivityStep]) -> Result<(), StoreError> {
        if steps.is_empty() {
            return Ok(());
        }

        for chunk in steps.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;

            let len = chunk.len();
            let mut ids = Vec::with_capacity(len);
            let mut chain_ids = Vec::with_capacity(len);
            let mut seqs: Vec<i32> = Vec::with_capacity(len);
            let mut kinds: Vec<String> = Vec::with_capacity(len);
            let mut agent_ids = Vec::with_capacity(len);
            let mut statuses: Vec<String> = Vec::with_capacity(len);
            let mut starts: Vec<DateTime<Utc>> = Vec::with_capacity(len);
            let mut ends: Vec<DateTime<Utc>> = Vec::with_capacity(len);
            let mut froms: Vec<Option<Uuid>> = Vec::with_capacity(len);
            let mut tos: Vec<Option<Uuid>> = Vec::with_capacity(len);
            let mut payloads: Vec<serde_json::Value> = Vec::with_capacity(len);
            let mut reasons: Vec<Option<String>> = Vec::with_capacity(len);
            let mut created: Vec<DateTime<Utc>> = Vec::with_capacity(len);

            for step in chunk {
                ids.push(step.id.into_inner());
                chain_ids.push(step.chain_id.into_inner());
                seqs.push(i32::try_from(step.seq).unwrap_or(i32::MAX));
                kinds.push(format!("{:?}", step.kind).to_lowercase());
                agent_ids.push(step.agent_id.into_inner());
                statuses.push(format!("{:?}", step.status).to_lowercase());
                starts.push(step.starts_at);
                ends.push(step.ends_at);
                froms.push(step.from_location.map(agora_types::LocationId::into_inner));
                tos.push(step.to_location.map(agora_types::LocationId::into_inner));
                payloads.push(serde_json::to_value(&step.payload)?);
                reasons.push(step.failure_reason.clone());
                created.push(step.created_at);
            }

            sqlx::query(
                r"INSERT INTO archived_steps (id, chain_id, seq, kind, agent_id, status, starts_at, ends_at, from_location, to_location, payload, failure_reason, created_at)
                  SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::INT[], $4::TEXT[], $5::UUID[], $6::TEXT[], $7::TIMESTAMPTZ[], $8::TIMESTAMPTZ[], $9::UUID[], $10::UUID[], $11::JSONB[], $12::TEXT[], $13::TIMESTAMPTZ[])
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(&ids)
            .bind(&chain_ids)
            .bind(&seqs)
            .bind(&kinds)
            .bind(&agent_ids)
            .bind(&statuses)
            .bind(&starts)
            .bind(&ends)
            .bind(&froms)
            .bind(&tos)
            .bind(&payloads)
            .bind(&reasons)
            .bind(&created)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }

        tracing::debug!(count = steps.len(), "Archived steps (batch UNNEST)");
        Ok(())
    }

    /// Upsert a campaign snapshot (latest state wins).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] on failure or
    /// [`StoreError::Serialization`] if the ledger cannot be encoded.
    pub async fn snapshot_campaign(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let ledger = serde_json::to_value(&campaign.ledger)?;
        sqlx::query(
            r"INSERT INTO campaign_snapshots (id, organizer, status, reason, ledger, snapshot_at)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (id) DO UPDATE
              SET status = EXCLUDED.status,
                  reason = EXCLUDED.reason,
                  ledger = EXCLUDED.ledger,
                  snapshot_at = EXCLUDED.snapshot_at",
        )
        .bind(campaign.id.into_inner())
        .bind(campaign.organizer.into_inner())
        .bind(format!("{:?}", campaign.status).to_lowercase())
        .bind(campaign.reason.clone())
        .bind(ledger)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch archived steps for one chain, ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] if the query fails.
    pub async fn steps_for_chain(&self, chain: Uuid) -> Result<Vec<ArchivedStepRow>, StoreError> {
        let rows = sqlx::query_as::<_, ArchivedStepRow>(
            r"SELECT id, chain_id, seq, kind, agent_id, status, starts_at, ends_at, from_location, to_location, payload, failure_reason, created_at
              FROM archived_steps
              WHERE chain_id = $1
              ORDER BY seq",
        )
        .bind(chain)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// A row from the `archived_steps` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArchivedStepRow {
    /// Step ID.
    pub id: Uuid,
    /// Owning chain ID.
    pub chain_id: Uuid,
    /// Position within the chain.
    pub seq: i32,
    /// Step kind as a lowercase string.
    pub kind: String,
    /// Acting agent ID.
    pub agent_id: Uuid,
    /// Terminal status as a lowercase string.
    pub status: String,
    /// Scheduled start.
    pub starts_at: DateTime<Utc>,
    /// Scheduled end.
    pub ends_at: DateTime<Utc>,
    /// Source location, if any.
    pub from_location: Option<Uuid>,
    /// Destination location, if any.
    pub to_location: Option<Uuid>,
    /// Kind-specific payload document.
    pub payload: serde_json::Value,
    /// Failure reason, if the step failed.
    pub failure_reason: Option<String>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}
