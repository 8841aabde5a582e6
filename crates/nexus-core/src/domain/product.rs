//! Product domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known lifecycle statuses.
///
/// `current_status` is an open string: checkpoints may introduce
/// site-specific stages (e.g. customs holds) without a schema change.
/// These constants cover the stages the backend itself assigns or
/// reacts to.
pub mod status {
    pub const REGISTERED: &str = "REGISTERED";
    pub const IN_TRANSIT: &str = "IN_TRANSIT";
    pub const DELIVERED: &str = "DELIVERED";
    pub const VERIFIED: &str = "VERIFIED";
}

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Pharmaceuticals,
    Electronics,
    LuxuryGoods,
    FoodBeverage,
    Automotive,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 6] = [
        ProductCategory::Pharmaceuticals,
        ProductCategory::Electronics,
        ProductCategory::LuxuryGoods,
        ProductCategory::FoodBeverage,
        ProductCategory::Automotive,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Pharmaceuticals => "PHARMACEUTICALS",
            ProductCategory::Electronics => "ELECTRONICS",
            ProductCategory::LuxuryGoods => "LUXURY_GOODS",
            ProductCategory::FoodBeverage => "FOOD_BEVERAGE",
            ProductCategory::Automotive => "AUTOMOTIVE",
            ProductCategory::Other => "OTHER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PHARMACEUTICALS" => Some(ProductCategory::Pharmaceuticals),
            "ELECTRONICS" => Some(ProductCategory::Electronics),
            "LUXURY_GOODS" => Some(ProductCategory::LuxuryGoods),
            "FOOD_BEVERAGE" => Some(ProductCategory::FoodBeverage),
            "AUTOMOTIVE" => Some(ProductCategory::Automotive),
            "OTHER" => Some(ProductCategory::Other),
            _ => None,
        }
    }
}

impl Default for ProductCategory {
    fn default() -> Self {
        ProductCategory::Other
    }
}

/// Tracked product.
///
/// `current_location` and `current_status` are denormalized from the
/// checkpoint trail; see `crate::derive` for the derivation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    /// Business key printed on the label; unique across all products.
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
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

/// Input for registering a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub manufacturer_id: Uuid,
    pub manufacturing_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
    pub origin_location: String,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
}

impl Product {
    pub fn new(input: NewProduct, qr_code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_id: input.product_id,
            name: input.name,
            description: input.description,
            category: input.category,
            manufacturer_id: input.manufacturer_id,
            manufacturing_date: input.manufacturing_date,
            expiry_date: input.expiry_date,
            batch_number: input.batch_number,
            current_location: input.origin_location.clone(),
            origin_location: input.origin_location,
            current_status: status::REGISTERED.to_string(),
            min_temperature: input.min_temperature,
            max_temperature: input.max_temperature,
            blockchain_hash: None,
            blockchain_id: None,
            qr_code,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product::new(
            NewProduct {
                product_id: "NEXUS-001".into(),
                name: "Insulin".into(),
                description: None,
                category: ProductCategory::Pharmaceuticals,
                manufacturer_id: Uuid::new_v4(),
                manufacturing_date: Utc::now(),
                expiry_date: None,
                batch_number: None,
                origin_location: "Jakarta Plant".into(),
                min_temperature: Some(2.0),
                max_temperature: Some(8.0),
            },
            "{}".into(),
        )
    }

    #[test]
    fn new_product_starts_registered_at_origin() {
        let product = sample();
        assert_eq!(product.current_status, status::REGISTERED);
        assert_eq!(product.current_location, "Jakarta Plant");
        assert!(product.is_active);
        assert!(product.blockchain_hash.is_none());
    }

    #[test]
    fn category_round_trips_through_wire_names() {
        for category in ProductCategory::ALL {
            assert_eq!(ProductCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(ProductCategory::from_str("WIDGETS"), None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["currentStatus"], "REGISTERED");
        assert!(json.get("originLocation").is_some());
        assert!(json.get("minTemperature").is_some());
        assert!(json.get("origin_location").is_none());
    }
}
