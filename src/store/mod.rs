//! Partitioned persistence engine
//!
//! Events land in daily child relations of a shared parent relation.
//! Partitions are created lazily on the first write of a day; creation is
//! idempotent, so concurrent writers racing on the same day cannot corrupt
//! each other or fail spuriously.

mod error;
mod partition;

pub use error::{classify_code, ErrorKind, StoreError};
pub use partition::{DayPartition, PARENT_RELATION, SCHEMA};

use async_trait::async_trait;
use deadpool_postgres::{Client, Config, Pool, PoolConfig, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::Json;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::types::Event;

/// Durable sink for events.
///
/// The worker pool persists through this seam, so alternative backends can
/// be substituted in tests.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist one event durably, or fail.
    async fn store(&self, event: &Event) -> Result<(), StoreError>;
}

/// Store writing events into day-partitioned PostgreSQL relations.
pub struct PartitionedStore {
    pool: Pool,
}

impl PartitionedStore {
    /// Connect to PostgreSQL with a pool of `pool_size` connections.
    pub fn connect(
        database_url: &str,
        pool_size: usize,
    ) -> Result<Self, deadpool_postgres::CreatePoolError> {
        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        config.pool = Some(PoolConfig::new(pool_size));

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(Self::new(pool))
    }

    /// Create a store on top of an existing connection pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the schema and parent relation if they do not exist yet.
    ///
    /// Daily partitions inherit the parent's columns, so it must be in
    /// place before the first write. Called once at startup.
    pub async fn ensure_parent(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE SCHEMA IF NOT EXISTS logsink;
                 CREATE TABLE IF NOT EXISTS logsink.events (
                     id uuid NOT NULL,
                     \"timestamp\" timestamptz NOT NULL,
                     message text,
                     fields jsonb NOT NULL DEFAULT '{}'::jsonb
                 );",
            )
            .await?;
        Ok(())
    }

    async fn insert(
        &self,
        client: &Client,
        partition: &DayPartition,
        event: &Event,
    ) -> Result<(), StoreError> {
        client
            .execute(
                partition.insert_sql().as_str(),
                &[
                    &event.id,
                    &event.timestamp,
                    &event.message,
                    &Json(&event.fields),
                ],
            )
            .await?;
        Ok(())
    }

    /// Create the daily partition, tolerating a concurrent creator winning
    /// the race.
    async fn create_partition(
        &self,
        client: &Client,
        partition: &DayPartition,
    ) -> Result<(), StoreError> {
        for statement in partition.create_sql() {
            if let Err(e) = client.execute(statement.as_str(), &[]).await {
                if !lost_creation_race(&e) {
                    return Err(e.into());
                }
                debug!(
                    relation = %partition.qualified_name(),
                    "partition already created by a concurrent writer"
                );
            }
        }
        info!(relation = %partition.qualified_name(), "created daily partition");
        Ok(())
    }
}

/// `IF NOT EXISTS` still surfaces a duplicate error when two sessions race
/// past the existence check; those outcomes mean the partition is usable.
fn lost_creation_race(error: &tokio_postgres::Error) -> bool {
    matches!(
        error.code(),
        Some(state)
            if *state == SqlState::DUPLICATE_TABLE
                || *state == SqlState::DUPLICATE_OBJECT
                || *state == SqlState::UNIQUE_VIOLATION
    )
}

#[async_trait]
impl EventSink for PartitionedStore {
    async fn store(&self, event: &Event) -> Result<(), StoreError> {
        let partition = DayPartition::for_timestamp(event.timestamp);

        // One scoped handle per attempt; dropping it returns the connection
        // to the pool on every exit path.
        let client = self.pool.get().await?;

        match self.insert(&client, &partition, event).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::MissingPartition => {
                self.create_partition(&client, &partition).await?;
                // Exactly one retry; a second failure goes back to the
                // queue through the worker.
                self.insert(&client, &partition, event).await
            }
            Err(e) => Err(e),
        }
    }
}
