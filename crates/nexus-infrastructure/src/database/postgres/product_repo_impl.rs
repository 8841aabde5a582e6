// ============================================================================
// NexusChain Infrastructure - PostgreSQL Product Repository
// File: crates/nexus-infrastructure/src/database/postgres/product_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexus_shared::Pagination;
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use nexus_core::domain::{
    CheckpointBrief, ManufacturerBrief, Product, ProductCategory, ProductSummary,
};
use nexus_core::error::DomainError;
use nexus_core::repositories::{ProductFilter, ProductRepository};

use super::violated_constraint;

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct ProductRow {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub manufacturer_id: Uuid,
    pub manufacturing_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
    pub origin_location: String,
    pub current_location: String,
    pub current_status: String,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub blockchain_hash: Option<String>,
    pub blockchain_id: Option<i64>,
    pub qr_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            description: row.description,
            category: ProductCategory::from_str(&row.category).unwrap_or_default(),
            manufacturer_id: row.manufacturer_id,
            manufacturing_date: row.manufacturing_date,
            expiry_date: row.expiry_date,
            batch_number: row.batch_number,
            origin_location: row.origin_location,
            current_location: row.current_location,
            current_status: row.current_status,
            min_temperature: row.min_temperature,
            max_temperature: row.max_temperature,
            blockchain_hash: row.blockchain_hash,
            blockchain_id: row.blockchain_id,
            qr_code: row.qr_code,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing row: product columns plus the manufacturer and checkpoint
/// roll-ups pulled in by the joins.
#[derive(Debug, FromRow)]
struct ProductSummaryRow {
    #[sqlx(flatten)]
    product: ProductRow,
    pub m_name: String,
    pub m_company: Option<String>,
    pub checkpoints_count: i64,
    pub lc_id: Option<Uuid>,
    pub lc_location: Option<String>,
    pub lc_status: Option<String>,
    pub lc_timestamp: Option<DateTime<Utc>>,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        let latest_checkpoint =
            match (row.lc_id, row.lc_location, row.lc_status, row.lc_timestamp) {
                (Some(id), Some(location), Some(status), Some(timestamp)) => {
                    Some(CheckpointBrief { id, location, status, timestamp })
                }
                _ => None,
            };
        let manufacturer = ManufacturerBrief {
            id: row.product.manufacturer_id,
            name: row.m_name,
            company: row.m_company,
        };
        ProductSummary {
            product: row.product.into(),
            manufacturer,
            checkpoints_count: row.checkpoints_count,
            latest_checkpoint,
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "productId" AS product_id, "name", "description", "category",
                "manufacturerId" AS manufacturer_id,
                "manufacturingDate" AS manufacturing_date,
                "expiryDate" AS expiry_date,
                "batchNumber" AS batch_number,
                "originLocation" AS origin_location,
                "currentLocation" AS current_location,
                "currentStatus" AS current_status,
                "minTemperature" AS min_temperature,
                "maxTemperature" AS max_temperature,
                "blockchainHash" AS blockchain_hash,
                "blockchainId" AS blockchain_id,
                "qrCode" AS qr_code,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            FROM "Product"
            WHERE "id" = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding product by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_product_key(
        &self,
        product_key: &str,
    ) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "productId" AS product_id, "name", "description", "category",
                "manufacturerId" AS manufacturer_id,
                "manufacturingDate" AS manufacturing_date,
                "expiryDate" AS expiry_date,
                "batchNumber" AS batch_number,
                "originLocation" AS origin_location,
                "currentLocation" AS current_location,
                "currentStatus" AS current_status,
                "minTemperature" AS min_temperature,
                "maxTemperature" AS max_temperature,
                "blockchainHash" AS blockchain_hash,
                "blockchainId" AS blockchain_id,
                "qrCode" AS qr_code,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            FROM "Product"
            WHERE "productId" = $1
            "#,
        )
        .bind(product_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding product by key: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, product: &Product) -> Result<Product, DomainError> {
        info!("Creating product: {}", product.product_id);

        let row: ProductRow = sqlx::query_as(
            r#"
            INSERT INTO "Product" (
                "id", "productId", "name", "description", "category",
                "manufacturerId", "manufacturingDate", "expiryDate", "batchNumber",
                "originLocation", "currentLocation", "currentStatus",
                "minTemperature", "maxTemperature",
                "blockchainHash", "blockchainId",
                "qrCode", "isActive", "createdAt", "updatedAt"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING
                "id", "productId" AS product_id, "name", "description", "category",
                "manufacturerId" AS manufacturer_id,
                "manufacturingDate" AS manufacturing_date,
                "expiryDate" AS expiry_date,
                "batchNumber" AS batch_number,
                "originLocation" AS origin_location,
                "currentLocation" AS current_location,
                "currentStatus" AS current_status,
                "minTemperature" AS min_temperature,
                "maxTemperature" AS max_temperature,
                "blockchainHash" AS blockchain_hash,
                "blockchainId" AS blockchain_id,
                "qrCode" AS qr_code,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            "#,
        )
        .bind(product.id)
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category.as_str())
        .bind(product.manufacturer_id)
        .bind(product.manufacturing_date)
        .bind(product.expiry_date)
        .bind(&product.batch_number)
        .bind(&product.origin_location)
        .bind(&product.current_location)
        .bind(&product.current_status)
        .bind(product.min_temperature)
        .bind(product.max_temperature)
        .bind(&product.blockchain_hash)
        .bind(product.blockchain_id)
        .bind(&product.qr_code)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating product: {}", e);
            let msg = e.to_string();
            match violated_constraint(&msg) {
                Some("Product_productId_key") => {
                    DomainError::ProductIdAlreadyExists(product.product_id.clone())
                }
                _ => DomainError::DatabaseError(msg),
            }
        })?;

        info!("Product created successfully: {}", row.id);
        Ok(row.into())
    }

    async fn update(&self, product: &Product) -> Result<Product, DomainError> {
        let row: ProductRow = sqlx::query_as(
            r#"
            UPDATE "Product"
            SET
                "name" = $2,
                "description" = $3,
                "currentLocation" = $4,
                "currentStatus" = $5,
                "minTemperature" = $6,
                "maxTemperature" = $7,
                "blockchainHash" = $8,
                "blockchainId" = $9,
                "isActive" = $10,
                "updatedAt" = $11
            WHERE "id" = $1
            RETURNING
                "id", "productId" AS product_id, "name", "description", "category",
                "manufacturerId" AS manufacturer_id,
                "manufacturingDate" AS manufacturing_date,
                "expiryDate" AS expiry_date,
                "batchNumber" AS batch_number,
                "originLocation" AS origin_location,
                "currentLocation" AS current_location,
                "currentStatus" AS current_status,
                "minTemperature" AS min_temperature,
                "maxTemperature" AS max_temperature,
                "blockchainHash" AS blockchain_hash,
                "blockchainId" AS blockchain_id,
                "qrCode" AS qr_code,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.current_location)
        .bind(&product.current_status)
        .bind(product.min_temperature)
        .bind(product.max_temperature)
        .bind(&product.blockchain_hash)
        .bind(product.blockchain_id)
        .bind(product.is_active)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating product: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn list(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<ProductSummary>, u64), DomainError> {
        let category = filter.category.map(|c| c.as_str());

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM "Product" p
            WHERE p."isActive" = true
              AND ($1::text IS NULL OR p."currentStatus" = $1)
              AND ($2::text IS NULL OR p."category" = $2)
              AND ($3::uuid IS NULL OR p."manufacturerId" = $3)
              AND ($4::text IS NULL OR (
                    p."name" ILIKE '%' || $4 || '%'
                    OR p."productId" ILIKE '%' || $4 || '%'
                    OR p."description" ILIKE '%' || $4 || '%'
              ))
            "#,
        )
        .bind(filter.status.as_deref())
        .bind(category)
        .bind(filter.manufacturer_id)
        .bind(filter.search.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error counting products: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        let rows: Vec<ProductSummaryRow> = sqlx::query_as(
            r#"
            SELECT
                p."id", p."productId" AS product_id, p."name", p."description",
                p."category",
                p."manufacturerId" AS manufacturer_id,
                p."manufacturingDate" AS manufacturing_date,
                p."expiryDate" AS expiry_date,
                p."batchNumber" AS batch_number,
                p."originLocation" AS origin_location,
                p."currentLocation" AS current_location,
                p."currentStatus" AS current_status,
                p."minTemperature" AS min_temperature,
                p."maxTemperature" AS max_temperature,
                p."blockchainHash" AS blockchain_hash,
                p."blockchainId" AS blockchain_id,
                p."qrCode" AS qr_code,
                p."isActive" AS is_active,
                p."createdAt" AS created_at,
                p."updatedAt" AS updated_at,
                m."name" AS m_name,
                m."company" AS m_company,
                (SELECT COUNT(*) FROM "Checkpoint" c
                  WHERE c."productId" = p."id") AS checkpoints_count,
                lc."id" AS lc_id,
                lc."location" AS lc_location,
                lc."status" AS lc_status,
                lc."timestamp" AS lc_timestamp
            FROM "Product" p
            JOIN "User" m ON m."id" = p."manufacturerId"
            LEFT JOIN LATERAL (
                SELECT c."id", c."location", c."status", c."timestamp"
                FROM "Checkpoint" c
                WHERE c."productId" = p."id"
                ORDER BY c."timestamp" DESC, c."createdAt" DESC
                LIMIT 1
            ) lc ON true
            WHERE p."isActive" = true
              AND ($1::text IS NULL OR p."currentStatus" = $1)
              AND ($2::text IS NULL OR p."category" = $2)
              AND ($3::uuid IS NULL OR p."manufacturerId" = $3)
              AND ($4::text IS NULL OR (
                    p."name" ILIKE '%' || $4 || '%'
                    OR p."productId" ILIKE '%' || $4 || '%'
                    OR p."description" ILIKE '%' || $4 || '%'
              ))
            ORDER BY p."createdAt" DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.status.as_deref())
        .bind(category)
        .bind(filter.manufacturer_id)
        .bind(filter.search.as_deref())
        .bind(pagination.limit as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error listing products: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        let summaries = rows.into_iter().map(|r| r.into()).collect();
        Ok((summaries, total as u64))
    }
}
