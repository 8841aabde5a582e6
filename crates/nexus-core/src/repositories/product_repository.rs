//! Product repository trait (port)

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use nexus_shared::Pagination;
use uuid::Uuid;

use crate::domain::{Product, ProductCategory, ProductSummary};
use crate::error::DomainError;

/// Listing filters; all optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub status: Option<String>,
    pub category: Option<ProductCategory>,
    /// Case-insensitive substring over name, label key, and description.
    pub search: Option<String>,
    pub manufacturer_id: Option<Uuid>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Lookup by opaque row id. Returns soft-deleted products too;
    /// callers decide whether `is_active` matters.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Product>, DomainError>;

    /// Lookup by the business key printed on the label.
    async fn find_by_product_key(&self, product_key: &str)
        -> Result<Option<Product>, DomainError>;

    async fn create(&self, product: &Product) -> Result<Product, DomainError>;

    async fn update(&self, product: &Product) -> Result<Product, DomainError>;

    /// Active products only, newest first, with manufacturer and
    /// checkpoint roll-ups. Returns the page plus the unpaged total.
    async fn list(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<ProductSummary>, u64), DomainError>;
}
