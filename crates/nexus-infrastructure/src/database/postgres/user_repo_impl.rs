// ============================================================================
// NexusChain Infrastructure - PostgreSQL User Repository
// File: crates/nexus-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info};
use uuid::Uuid;

use nexus_core::domain::{User, UserRole};
use nexus_core::error::DomainError;
use nexus_core::repositories::UserRepository;

use super::violated_constraint;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password: row.password,
            name: row.name,
            role: UserRole::from_str(&row.role).unwrap_or_default(),
            company: row.company,
            phone: row.phone,
            wallet_address: row.wallet_address,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "email", "password", "name", "role",
                "company", "phone",
                "walletAddress" AS wallet_address,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            FROM "User"
            WHERE "id" = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding user by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "email", "password", "name", "role",
                "company", "phone",
                "walletAddress" AS wallet_address,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            FROM "User"
            WHERE LOWER("email") = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding user by email: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT
                "id", "email", "password", "name", "role",
                "company", "phone",
                "walletAddress" AS wallet_address,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            FROM "User"
            WHERE "walletAddress" = $1
            "#,
        )
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding user by wallet: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        info!("Creating user with email: {}", user.email);

        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO "User" (
                "id", "email", "password", "name", "role",
                "company", "phone", "walletAddress",
                "isActive", "createdAt", "updatedAt"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                "id", "email", "password", "name", "role",
                "company", "phone",
                "walletAddress" AS wallet_address,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.company)
        .bind(&user.phone)
        .bind(&user.wallet_address)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating user: {}", e);
            let msg = e.to_string();
            match violated_constraint(&msg) {
                Some("User_email_key") => DomainError::EmailAlreadyExists(user.email.clone()),
                Some("User_walletAddress_key") => DomainError::WalletAddressAlreadyExists(
                    user.wallet_address.clone().unwrap_or_default(),
                ),
                _ => DomainError::DatabaseError(msg),
            }
        })?;

        info!("User created successfully: {}", row.id);
        Ok(row.into())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let row: UserRow = sqlx::query_as(
            r#"
            UPDATE "User"
            SET
                "email" = $2,
                "password" = $3,
                "name" = $4,
                "role" = $5,
                "company" = $6,
                "phone" = $7,
                "walletAddress" = $8,
                "isActive" = $9,
                "updatedAt" = $10
            WHERE "id" = $1
            RETURNING
                "id", "email", "password", "name", "role",
                "company", "phone",
                "walletAddress" AS wallet_address,
                "isActive" AS is_active,
                "createdAt" AS created_at,
                "updatedAt" AS updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.company)
        .bind(&user.phone)
        .bind(&user.wallet_address)
        .bind(user.is_active)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating user: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }
}
