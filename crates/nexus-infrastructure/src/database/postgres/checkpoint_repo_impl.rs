// ============================================================================
// NexusChain Infrastructure - PostgreSQL Checkpoint Repository
// File: crates/nexus-infrastructure/src/database/postgres/checkpoint_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use nexus_core::derive::DerivedState;
use nexus_core::domain::{Checkpoint, CheckpointWithHandler, HandlerBrief, UserRole};
use nexus_core::error::DomainError;
use nexus_core::repositories::CheckpointRepository;

pub struct PgCheckpointRepository {
    pool: PgPool,
}

impl PgCheckpointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct CheckpointRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub notes: Option<String>,
    pub handled_by: Uuid,
    pub blockchain_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<CheckpointRow> for Checkpoint {
    fn from(row: CheckpointRow) -> Self {
        Checkpoint {
            id: row.id,
            product_id: row.product_id,
            location: row.location,
            latitude: row.latitude,
            longitude: row.longitude,
            status: row.status,
            temperature: row.temperature,
            humidity: row.humidity,
            notes: row.notes,
            handled_by: row.handled_by,
            blockchain_hash: row.blockchain_hash,
            timestamp: row.timestamp,
            created_at: row.created_at,
        }
    }
}

/// Checkpoint columns plus the handler pulled in by the join.
#[derive(Debug, FromRow)]
struct CheckpointWithHandlerRow {
    #[sqlx(flatten)]
    checkpoint: CheckpointRow,
    pub h_name: String,
    pub h_company: Option<String>,
    pub h_role: String,
}

impl From<CheckpointWithHandlerRow> for CheckpointWithHandler {
    fn from(row: CheckpointWithHandlerRow) -> Self {
        let handler = HandlerBrief {
            id: row.checkpoint.handled_by,
            name: row.h_name,
            company: row.h_company,
            role: UserRole::from_str(&row.h_role).unwrap_or_default(),
        };
        CheckpointWithHandler { checkpoint: row.checkpoint.into(), handler }
    }
}

#[async_trait]
impl CheckpointRepository for PgCheckpointRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Checkpoint>, DomainError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "productId" AS product_id, "location",
                "latitude", "longitude", "status",
                "temperature", "humidity", "notes",
                "handledBy" AS handled_by,
                "blockchainHash" AS blockchain_hash,
                "timestamp",
                "createdAt" AS created_at
            FROM "Checkpoint"
            WHERE "id" = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding checkpoint by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_for_product(&self, product_id: &Uuid) -> Result<Vec<Checkpoint>, DomainError> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "productId" AS product_id, "location",
                "latitude", "longitude", "status",
                "temperature", "humidity", "notes",
                "handledBy" AS handled_by,
                "blockchainHash" AS blockchain_hash,
                "timestamp",
                "createdAt" AS created_at
            FROM "Checkpoint"
            WHERE "productId" = $1
            ORDER BY "timestamp" DESC, "createdAt" DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing checkpoints: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_for_product_with_handlers(
        &self,
        product_id: &Uuid,
    ) -> Result<Vec<CheckpointWithHandler>, DomainError> {
        let rows: Vec<CheckpointWithHandlerRow> = sqlx::query_as(
            r#"
            SELECT
                c."id", c."productId" AS product_id, c."location",
                c."latitude", c."longitude", c."status",
                c."temperature", c."humidity", c."notes",
                c."handledBy" AS handled_by,
                c."blockchainHash" AS blockchain_hash,
                c."timestamp",
                c."createdAt" AS created_at,
                h."name" AS h_name,
                h."company" AS h_company,
                h."role" AS h_role
            FROM "Checkpoint" c
            JOIN "User" h ON h."id" = c."handledBy"
            WHERE c."productId" = $1
            ORDER BY c."timestamp" DESC, c."createdAt" DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing checkpoints with handlers: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn latest_for_product(
        &self,
        product_id: &Uuid,
    ) -> Result<Option<Checkpoint>, DomainError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "productId" AS product_id, "location",
                "latitude", "longitude", "status",
                "temperature", "humidity", "notes",
                "handledBy" AS handled_by,
                "blockchainHash" AS blockchain_hash,
                "timestamp",
                "createdAt" AS created_at
            FROM "Checkpoint"
            WHERE "productId" = $1
            ORDER BY "timestamp" DESC, "createdAt" DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding latest checkpoint: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn count_for_product(&self, product_id: &Uuid) -> Result<i64, DomainError> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM "Checkpoint" WHERE "productId" = $1"#)
                .bind(product_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error counting checkpoints: {}", e);
                    DomainError::DatabaseError(e.to_string())
                })?;

        Ok(count)
    }

    async fn insert_with_product_state(
        &self,
        checkpoint: &Checkpoint,
        state: &DerivedState,
    ) -> Result<Checkpoint, DomainError> {
        info!(
            "Recording checkpoint for product {} at {}",
            checkpoint.product_id, checkpoint.location
        );

        let mut tx = self.pool.begin().await.map_err(|e: sqlx::Error| {
            error!("Database error starting transaction: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        let row: CheckpointRow = sqlx::query_as(
            r#"
            INSERT INTO "Checkpoint" (
                "id", "productId", "location", "latitude", "longitude",
                "status", "temperature", "humidity", "notes",
                "handledBy", "blockchainHash", "timestamp", "createdAt"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING
                "id", "productId" AS product_id, "location",
                "latitude", "longitude", "status",
                "temperature", "humidity", "notes",
                "handledBy" AS handled_by,
                "blockchainHash" AS blockchain_hash,
                "timestamp",
                "createdAt" AS created_at
            "#,
        )
        .bind(checkpoint.id)
        .bind(checkpoint.product_id)
        .bind(&checkpoint.location)
        .bind(checkpoint.latitude)
        .bind(checkpoint.longitude)
        .bind(&checkpoint.status)
        .bind(checkpoint.temperature)
        .bind(checkpoint.humidity)
        .bind(&checkpoint.notes)
        .bind(checkpoint.handled_by)
        .bind(&checkpoint.blockchain_hash)
        .bind(checkpoint.timestamp)
        .bind(checkpoint.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error inserting checkpoint: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        sqlx::query(
            r#"
            UPDATE "Product"
            SET "currentLocation" = $2, "currentStatus" = $3, "updatedAt" = NOW()
            WHERE "id" = $1
            "#,
        )
        .bind(checkpoint.product_id)
        .bind(&state.current_location)
        .bind(&state.current_status)
        .execute(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error writing product state: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e: sqlx::Error| {
            error!("Database error committing checkpoint insert: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn update_with_product_state(
        &self,
        checkpoint: &Checkpoint,
        state: Option<DerivedState>,
    ) -> Result<Checkpoint, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e: sqlx::Error| {
            error!("Database error starting transaction: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        let row: CheckpointRow = sqlx::query_as(
            r#"
            UPDATE "Checkpoint"
            SET
                "location" = $2,
                "latitude" = $3,
                "longitude" = $4,
                "status" = $5,
                "temperature" = $6,
                "humidity" = $7,
                "notes" = $8,
                "blockchainHash" = $9
            WHERE "id" = $1
            RETURNING
                "id", "productId" AS product_id, "location",
                "latitude", "longitude", "status",
                "temperature", "humidity", "notes",
                "handledBy" AS handled_by,
                "blockchainHash" AS blockchain_hash,
                "timestamp",
                "createdAt" AS created_at
            "#,
        )
        .bind(checkpoint.id)
        .bind(&checkpoint.location)
        .bind(checkpoint.latitude)
        .bind(checkpoint.longitude)
        .bind(&checkpoint.status)
        .bind(checkpoint.temperature)
        .bind(checkpoint.humidity)
        .bind(&checkpoint.notes)
        .bind(&checkpoint.blockchain_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating checkpoint: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        if let Some(state) = &state {
            sqlx::query(
                r#"
                UPDATE "Product"
                SET "currentLocation" = $2, "currentStatus" = $3, "updatedAt" = NOW()
                WHERE "id" = $1
                "#,
            )
            .bind(checkpoint.product_id)
            .bind(&state.current_location)
            .bind(&state.current_status)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error writing product state: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;
        }

        tx.commit().await.map_err(|e: sqlx::Error| {
            error!("Database error committing checkpoint update: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn delete_with_product_state(
        &self,
        id: &Uuid,
        product_id: &Uuid,
        state: &DerivedState,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e: sqlx::Error| {
            error!("Database error starting transaction: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        sqlx::query(r#"DELETE FROM "Checkpoint" WHERE "id" = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error deleting checkpoint: {}", e);
                DomainError::DatabaseError(e.to_string())
            })?;

        sqlx::query(
            r#"
            UPDATE "Product"
            SET "currentLocation" = $2, "currentStatus" = $3, "updatedAt" = NOW()
            WHERE "id" = $1
            "#,
        )
        .bind(product_id)
        .bind(&state.current_location)
        .bind(&state.current_status)
        .execute(&mut *tx)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error writing product state: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e: sqlx::Error| {
            error!("Database error committing checkpoint delete: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }
}
