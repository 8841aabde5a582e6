//! Read models composed for API responses
//!
//! These are projections over the entities: trimmed contact details for
//! the people involved plus checkpoint roll-ups. Wire casing is
//! camelCase throughout, matching the entities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::checkpoint::Checkpoint;
use super::product::{Product, ProductCategory};
use super::user::{User, UserRole};

/// Manufacturer as shown in product listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerBrief {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
}

impl From<&User> for ManufacturerBrief {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            company: user.company.clone(),
        }
    }
}

/// Manufacturer with contact details, for the full product view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

impl From<&User> for ManufacturerContact {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            company: user.company.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// Manufacturer identity exposed on the public verify endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerPublic {
    pub name: String,
    pub company: Option<String>,
}

impl From<&User> for ManufacturerPublic {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            company: user.company.clone(),
        }
    }
}

/// The user who recorded a checkpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerBrief {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub role: UserRole,
}

impl From<&User> for HandlerBrief {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            company: user.company.clone(),
            role: user.role,
        }
    }
}

/// Checkpoint roll-up used where only the latest scan matters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointBrief {
    pub id: Uuid,
    pub location: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Checkpoint> for CheckpointBrief {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            id: cp.id,
            location: cp.location.clone(),
            status: cp.status.clone(),
            timestamp: cp.timestamp,
        }
    }
}

/// Checkpoint together with who recorded it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointWithHandler {
    #[serde(flatten)]
    pub checkpoint: Checkpoint,
    pub handler: HandlerBrief,
}

/// Product identity attached to a single-checkpoint view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBrief {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub category: ProductCategory,
}

impl From<&Product> for ProductBrief {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            category: product.category,
        }
    }
}

/// Checkpoint with its handler and owning product.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointDetail {
    #[serde(flatten)]
    pub checkpoint: Checkpoint,
    pub handler: HandlerBrief,
    pub product: ProductBrief,
}

/// Product with its manufacturer attached, for mutation responses.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithManufacturer {
    #[serde(flatten)]
    pub product: Product,
    pub manufacturer: ManufacturerBrief,
}

/// One row of the paginated product listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub manufacturer: ManufacturerBrief,
    pub checkpoints_count: i64,
    pub latest_checkpoint: Option<CheckpointBrief>,
}

/// Full product view with the ordered checkpoint trail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub manufacturer: ManufacturerContact,
    pub checkpoints: Vec<CheckpointWithHandler>,
    pub checkpoints_count: i64,
}

/// Public projection returned by the QR verification endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedProduct {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub category: ProductCategory,
    pub manufacturer: ManufacturerPublic,
    pub manufacturing_date: DateTime<Utc>,
    pub current_status: String,
    pub current_location: String,
    pub checkpoints_count: i64,
    pub latest_checkpoint: Option<CheckpointBrief>,
}

impl VerifiedProduct {
    pub fn compose(
        product: &Product,
        manufacturer: ManufacturerPublic,
        checkpoints_count: i64,
        latest_checkpoint: Option<CheckpointBrief>,
    ) -> Self {
        // Products registered before location tracking went live carry
        // an empty current location; fall back to the origin.
        let current_location = if product.current_location.is_empty() {
            product.origin_location.clone()
        } else {
            product.current_location.clone()
        };
        Self {
            id: product.id,
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            category: product.category,
            manufacturer,
            manufacturing_date: product.manufacturing_date,
            current_status: product.current_status.clone(),
            current_location,
            checkpoints_count,
            latest_checkpoint,
        }
    }
}
