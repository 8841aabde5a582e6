//! Product lifecycle service
//!
//! Registration, listing, detail and public verification reads, partial
//! updates, ledger anchoring, and soft deletes. Every mutation runs its
//! role or ownership gate before touching storage, and publishes
//! notification events only after the write lands.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use nexus_shared::{PageMeta, Pagination};

use crate::authz;
use crate::derive::display_order;
use crate::domain::{
    CheckpointBrief, ManufacturerBrief, ManufacturerContact, ManufacturerPublic, NewProduct,
    Product, ProductCategory, ProductDetail, ProductSummary, ProductWithManufacturer, User,
    VerifiedProduct,
};
use crate::error::DomainError;
use crate::events::Notifier;
use crate::repositories::{CheckpointRepository, ProductFilter, ProductRepository, UserRepository};
use crate::services::{parse_date, required};

/// Payload for registering a product.
///
/// Dates arrive as strings; RFC 3339 timestamps and bare `YYYY-MM-DD`
/// dates are both accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub manufacturing_date: Option<String>,
    pub expiry_date: Option<String>,
    pub origin_location: Option<String>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub batch_number: Option<String>,
}

/// Query string accepted by the product listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub manufacturer_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One page of the product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub products: Vec<ProductSummary>,
    pub pagination: PageMeta,
}

/// Partial product update.
///
/// Nullable columns use a two-level `Option`: the outer level is
/// "was the key present", the inner is the new value, so an explicit
/// `null` clears the column while an absent key leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub current_status: Option<String>,
    pub current_location: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub min_temperature: Option<Option<f64>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub max_temperature: Option<Option<f64>>,
}

impl ProductPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.current_status.is_none()
            && self.current_location.is_none()
            && self.min_temperature.is_none()
            && self.max_temperature.is_none()
    }
}

/// Labeled-ledger reference for a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainRef {
    pub blockchain_hash: Option<String>,
    pub blockchain_id: Option<i64>,
}

pub struct ProductService {
    product_repo: Arc<dyn ProductRepository>,
    user_repo: Arc<dyn UserRepository>,
    checkpoint_repo: Arc<dyn CheckpointRepository>,
    notifier: Notifier,
}

impl ProductService {
    pub fn new(
        product_repo: Arc<dyn ProductRepository>,
        user_repo: Arc<dyn UserRepository>,
        checkpoint_repo: Arc<dyn CheckpointRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            product_repo,
            user_repo,
            checkpoint_repo,
            notifier,
        }
    }

    /// Registers a product for `actor` and announces it.
    pub async fn register(
        &self,
        actor: &User,
        req: RegisterProductRequest,
    ) -> Result<ProductWithManufacturer, DomainError> {
        authz::ensure_can_register_product(actor.role)?;

        let product_key = required(req.product_id).ok_or_else(required_product_fields)?;
        let name = required(req.name).ok_or_else(required_product_fields)?;
        let category_raw = required(req.category).ok_or_else(required_product_fields)?;
        let manufacturing_raw =
            required(req.manufacturing_date).ok_or_else(required_product_fields)?;
        let origin_location = required(req.origin_location).ok_or_else(required_product_fields)?;

        let category = parse_category(&category_raw)?;
        let manufacturing_date = parse_date(&manufacturing_raw)
            .ok_or_else(|| DomainError::ValidationError("Invalid manufacturing date".into()))?;
        let expiry_date = match required(req.expiry_date) {
            Some(raw) => Some(
                parse_date(&raw)
                    .ok_or_else(|| DomainError::ValidationError("Invalid expiry date".into()))?,
            ),
            None => None,
        };

        info!("Product registration attempt: {}", product_key);

        if self
            .product_repo
            .find_by_product_key(&product_key)
            .await?
            .is_some()
        {
            warn!("Product registration failed: key already in use: {}", product_key);
            return Err(DomainError::ProductIdAlreadyExists(product_key));
        }

        // The QR payload is the canonical JSON the label encodes;
        // rendering it as an image is a client concern.
        let qr_code = serde_json::json!({
            "productId": product_key,
            "name": name,
            "manufacturer": actor.name,
            "timestamp": Utc::now().to_rfc3339(),
        })
        .to_string();

        let product = Product::new(
            NewProduct {
                product_id: product_key,
                name,
                description: req.description,
                category,
                manufacturer_id: actor.id,
                manufacturing_date,
                expiry_date,
                batch_number: req.batch_number,
                origin_location,
                min_temperature: req.min_temperature,
                max_temperature: req.max_temperature,
            },
            qr_code,
        );

        let created = self.product_repo.create(&product).await?;
        info!("Product registered: {} ({})", created.product_id, created.id);
        self.notifier.product_created(&created);

        Ok(ProductWithManufacturer {
            product: created,
            manufacturer: ManufacturerBrief::from(actor),
        })
    }

    /// Paginated listing of active products.
    pub async fn list(&self, query: ListProductsQuery) -> Result<ProductListing, DomainError> {
        let category = match required(query.category) {
            Some(raw) => Some(parse_category(&raw)?),
            None => None,
        };
        let manufacturer_id = match required(query.manufacturer_id) {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| {
                DomainError::ValidationError("Invalid manufacturer ID".into())
            })?),
            None => None,
        };

        let filter = ProductFilter {
            status: required(query.status),
            category,
            search: required(query.search),
            manufacturer_id,
        };
        let pagination = Pagination::new(query.page, query.limit);

        let (products, total) = self.product_repo.list(&filter, &pagination).await?;
        Ok(ProductListing {
            products,
            pagination: PageMeta::new(total, &pagination),
        })
    }

    /// Full product view with manufacturer contact and the ordered
    /// checkpoint trail. Soft-deleted products stay readable.
    pub async fn get(&self, id: &Uuid) -> Result<ProductDetail, DomainError> {
        let product = self
            .product_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        let manufacturer = self.manufacturer_of(&product).await?;

        let mut checkpoints = self
            .checkpoint_repo
            .list_for_product_with_handlers(&product.id)
            .await?;
        checkpoints.sort_by(|a, b| display_order(&a.checkpoint, &b.checkpoint));
        let checkpoints_count = checkpoints.len() as i64;

        Ok(ProductDetail {
            product,
            manufacturer: ManufacturerContact::from(&manufacturer),
            checkpoints,
            checkpoints_count,
        })
    }

    /// Public QR verification by label key. No authentication, so the
    /// projection hides contact details and row-level identifiers.
    pub async fn verify(&self, product_key: &str) -> Result<VerifiedProduct, DomainError> {
        let product = self
            .product_repo
            .find_by_product_key(product_key)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        let manufacturer = self.manufacturer_of(&product).await?;

        let latest = self.checkpoint_repo.latest_for_product(&product.id).await?;
        let count = self.checkpoint_repo.count_for_product(&product.id).await?;

        Ok(VerifiedProduct::compose(
            &product,
            ManufacturerPublic::from(&manufacturer),
            count,
            latest.as_ref().map(CheckpointBrief::from),
        ))
    }

    /// Applies a partial update. An empty patch is a no-op: nothing is
    /// written and nothing is announced.
    pub async fn update(
        &self,
        actor: &User,
        id: &Uuid,
        patch: ProductPatch,
    ) -> Result<ProductWithManufacturer, DomainError> {
        let mut product = self
            .product_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        authz::ensure_can_update_product(&product, actor)?;

        let manufacturer = self.manufacturer_of(&product).await?;
        if patch.is_empty() {
            return Ok(ProductWithManufacturer {
                product,
                manufacturer: ManufacturerBrief::from(&manufacturer),
            });
        }

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(current_status) = patch.current_status {
            product.current_status = current_status;
        }
        if let Some(current_location) = patch.current_location {
            product.current_location = current_location;
        }
        if let Some(min_temperature) = patch.min_temperature {
            product.min_temperature = min_temperature;
        }
        if let Some(max_temperature) = patch.max_temperature {
            product.max_temperature = max_temperature;
        }
        product.touch();

        let updated = self.product_repo.update(&product).await?;
        info!("Product updated: {}", updated.id);
        self.notifier.product_updated(&updated);

        Ok(ProductWithManufacturer {
            product: updated,
            manufacturer: ManufacturerBrief::from(&manufacturer),
        })
    }

    /// Records the on-chain transaction reference for a product and
    /// announces the confirmation.
    pub async fn set_blockchain_ref(
        &self,
        actor: &User,
        id: &Uuid,
        req: BlockchainRef,
    ) -> Result<Product, DomainError> {
        let hash = required(req.blockchain_hash)
            .ok_or_else(|| DomainError::ValidationError("Blockchain hash is required".into()))?;

        let mut product = self
            .product_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        authz::ensure_can_update_product(&product, actor)?;

        product.blockchain_hash = Some(hash.clone());
        if let Some(block_id) = req.blockchain_id {
            product.blockchain_id = Some(block_id);
        }
        product.touch();

        let updated = self.product_repo.update(&product).await?;
        info!("Blockchain ref recorded for product {}", updated.id);
        self.notifier.blockchain_confirmed(&updated, &hash);
        Ok(updated)
    }

    /// Deactivates a product. The row and its trail remain for audit
    /// and verification; listings stop showing it.
    pub async fn soft_delete(&self, actor: &User, id: &Uuid) -> Result<(), DomainError> {
        let mut product = self
            .product_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ProductNotFound)?;
        authz::ensure_can_delete_product(&product, actor)?;

        product.is_active = false;
        product.touch();
        self.product_repo.update(&product).await?;
        info!("Product deactivated: {}", id);
        Ok(())
    }

    async fn manufacturer_of(&self, product: &Product) -> Result<User, DomainError> {
        self.user_repo
            .find_by_id(&product.manufacturer_id)
            .await?
            .ok_or_else(|| {
                DomainError::InternalError(format!(
                    "manufacturer {} missing for product {}",
                    product.manufacturer_id, product.id
                ))
            })
    }
}

fn required_product_fields() -> DomainError {
    DomainError::ValidationError(
        "Product ID, name, category, manufacturing date, and origin location are required".into(),
    )
}

fn parse_category(raw: &str) -> Result<ProductCategory, DomainError> {
    ProductCategory::from_str(raw).ok_or_else(|| {
        DomainError::ValidationError(format!(
            "Invalid category. Must be one of: {}",
            ProductCategory::ALL.map(|c| c.as_str()).join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{status, Checkpoint, CheckpointWithHandler, HandlerBrief, UserRole};
    use crate::events::testing::RecordingRelay;
    use crate::events::Address;
    use crate::repositories::{
        MockCheckpointRepository, MockProductRepository, MockUserRepository,
    };
    use chrono::{Duration, TimeZone};

    fn actor(role: UserRole) -> User {
        User::new(
            format!("{}@nexuschain.io", role.as_str().to_lowercase()),
            "$2b$10$hash".into(),
            "Dewi Lestari".into(),
            role,
            Some("Nusantara Pharma".into()),
            None,
            None,
        )
        .unwrap()
    }

    fn registered(owner: &User) -> Product {
        Product::new(
            NewProduct {
                product_id: "NEXUS-001".into(),
                name: "Insulin".into(),
                description: Some("Cold chain".into()),
                category: ProductCategory::Pharmaceuticals,
                manufacturer_id: owner.id,
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

    fn full_request() -> RegisterProductRequest {
        RegisterProductRequest {
            product_id: Some("NEXUS-001".into()),
            name: Some("Insulin".into()),
            description: Some("Cold chain".into()),
            category: Some("PHARMACEUTICALS".into()),
            manufacturing_date: Some("2024-01-15".into()),
            expiry_date: Some("2025-01-15T00:00:00Z".into()),
            origin_location: Some("Jakarta Plant".into()),
            min_temperature: Some(2.0),
            max_temperature: Some(8.0),
            batch_number: Some("BN-88".into()),
        }
    }

    fn service(
        products: MockProductRepository,
        users: MockUserRepository,
        checkpoints: MockCheckpointRepository,
    ) -> (Arc<RecordingRelay>, ProductService) {
        let relay = Arc::new(RecordingRelay::default());
        let svc = ProductService::new(
            Arc::new(products),
            Arc::new(users),
            Arc::new(checkpoints),
            Notifier::new(relay.clone()),
        );
        (relay, svc)
    }

    #[tokio::test]
    async fn register_rejects_roles_outside_the_gate() {
        let (_, svc) = service(
            MockProductRepository::new(),
            MockUserRepository::new(),
            MockCheckpointRepository::new(),
        );
        let consumer = actor(UserRole::Consumer);
        let err = svc
            .register(&consumer, full_request())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Access denied. Required roles: MANUFACTURER, ADMIN"
        );
    }

    #[tokio::test]
    async fn register_requires_labeling_fields() {
        let (_, svc) = service(
            MockProductRepository::new(),
            MockUserRepository::new(),
            MockCheckpointRepository::new(),
        );
        let mfr = actor(UserRole::Manufacturer);
        let err = svc
            .register(
                &mfr,
                RegisterProductRequest {
                    name: Some("Insulin".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationError(msg)
                if msg == "Product ID, name, category, manufacturing date, and origin location are required"
        ));
    }

    #[tokio::test]
    async fn register_rejects_unknown_category_and_bad_dates() {
        let (_, svc) = service(
            MockProductRepository::new(),
            MockUserRepository::new(),
            MockCheckpointRepository::new(),
        );
        let mfr = actor(UserRole::Manufacturer);

        let mut req = full_request();
        req.category = Some("WIDGETS".into());
        let err = svc.register(&mfr, req).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationError(msg)
                if msg == "Invalid category. Must be one of: PHARMACEUTICALS, ELECTRONICS, \
                    LUXURY_GOODS, FOOD_BEVERAGE, AUTOMOTIVE, OTHER"
        ));

        let mut req = full_request();
        req.manufacturing_date = Some("soon".into());
        let err = svc.register(&mfr, req).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationError(msg) if msg == "Invalid manufacturing date"
        ));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_label_key() {
        let mfr = actor(UserRole::Manufacturer);
        let existing = registered(&mfr);
        let mut products = MockProductRepository::new();
        products
            .expect_find_by_product_key()
            .returning(move |_| Ok(Some(existing.clone())));

        let (_, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let err = svc.register(&mfr, full_request()).await.unwrap_err();
        assert!(matches!(err, DomainError::ProductIdAlreadyExists(_)));
        assert_eq!(err.to_string(), "Product with this ID already exists");
    }

    #[tokio::test]
    async fn register_builds_qr_payload_and_notifies() {
        let mfr = actor(UserRole::Manufacturer);
        let mut products = MockProductRepository::new();
        products.expect_find_by_product_key().returning(|_| Ok(None));
        products
            .expect_create()
            .withf(|p: &Product| {
                p.current_status == status::REGISTERED
                    && p.current_location == "Jakarta Plant"
                    && p.qr_code.contains("\"productId\":\"NEXUS-001\"")
                    && p.qr_code.contains("\"manufacturer\":\"Dewi Lestari\"")
            })
            .returning(|p| Ok(p.clone()));

        let (relay, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let out = svc.register(&mfr, full_request()).await.unwrap();

        assert_eq!(out.manufacturer.id, mfr.id);
        assert_eq!(
            out.product.manufacturing_date,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            relay.summary(),
            vec![
                (Address::User(mfr.id), "product:created"),
                (Address::Role(UserRole::Admin), "product:created"),
            ]
        );
    }

    #[tokio::test]
    async fn list_normalizes_filters_and_rolls_up_pagination() {
        let mut products = MockProductRepository::new();
        products
            .expect_list()
            .withf(|filter: &ProductFilter, pagination: &Pagination| {
                filter.status.is_none()
                    && filter.category == Some(ProductCategory::Pharmaceuticals)
                    && filter.search.as_deref() == Some("insulin")
                    && filter.manufacturer_id.is_none()
                    && pagination.page == 2
                    && pagination.limit == 5
            })
            .returning(|_, _| Ok((Vec::new(), 12)));

        let (_, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let listing = svc
            .list(ListProductsQuery {
                status: Some(String::new()),
                category: Some("PHARMACEUTICALS".into()),
                search: Some("insulin".into()),
                manufacturer_id: None,
                page: Some(2),
                limit: Some(5),
            })
            .await
            .unwrap();

        assert_eq!(listing.pagination.total, 12);
        assert_eq!(listing.pagination.total_pages, 3);
    }

    #[tokio::test]
    async fn list_rejects_malformed_filters() {
        let (_, svc) = service(
            MockProductRepository::new(),
            MockUserRepository::new(),
            MockCheckpointRepository::new(),
        );

        let err = svc
            .list(ListProductsQuery {
                category: Some("WIDGETS".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));

        let err = svc
            .list(ListProductsQuery {
                manufacturer_id: Some("not-a-uuid".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationError(msg) if msg == "Invalid manufacturer ID"
        ));
    }

    #[tokio::test]
    async fn get_orders_the_trail_newest_first() {
        let mfr = actor(UserRole::Manufacturer);
        let product = registered(&mfr);
        let handler = HandlerBrief::from(&mfr);

        let base = Utc::now();
        let mut older = Checkpoint::new(crate::domain::NewCheckpoint {
            product_id: product.id,
            location: "Older".into(),
            latitude: None,
            longitude: None,
            status: "IN_TRANSIT".into(),
            temperature: None,
            humidity: None,
            notes: None,
            handled_by: mfr.id,
            blockchain_hash: None,
            timestamp: Some(base - Duration::hours(4)),
        });
        older.created_at = base - Duration::hours(4);
        let mut newer = older.clone();
        newer.id = Uuid::new_v4();
        newer.location = "Newer".into();
        newer.timestamp = base;
        newer.created_at = base;

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }
        let mut users = MockUserRepository::new();
        {
            let mfr = mfr.clone();
            users
                .expect_find_by_id()
                .returning(move |_| Ok(Some(mfr.clone())));
        }
        let mut checkpoints = MockCheckpointRepository::new();
        checkpoints
            .expect_list_for_product_with_handlers()
            .returning(move |_| {
                Ok(vec![
                    CheckpointWithHandler {
                        checkpoint: older.clone(),
                        handler: handler.clone(),
                    },
                    CheckpointWithHandler {
                        checkpoint: newer.clone(),
                        handler: handler.clone(),
                    },
                ])
            });

        let (_, svc) = service(products, users, checkpoints);
        let detail = svc.get(&product.id).await.unwrap();

        assert_eq!(detail.checkpoints_count, 2);
        assert_eq!(detail.checkpoints[0].checkpoint.location, "Newer");
        assert_eq!(detail.manufacturer.email, mfr.email);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let mut products = MockProductRepository::new();
        products.expect_find_by_id().returning(|_| Ok(None));
        let (_, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let err = svc.get(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound));
    }

    #[tokio::test]
    async fn verify_serves_deactivated_products() {
        let mfr = actor(UserRole::Manufacturer);
        let mut product = registered(&mfr);
        product.is_active = false;
        let latest = Checkpoint::new(crate::domain::NewCheckpoint {
            product_id: product.id,
            location: "Retail Store".into(),
            latitude: None,
            longitude: None,
            status: "DELIVERED".into(),
            temperature: None,
            humidity: None,
            notes: None,
            handled_by: mfr.id,
            blockchain_hash: None,
            timestamp: None,
        });

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_product_key()
                .withf(|key| key == "NEXUS-001")
                .returning(move |_| Ok(Some(product.clone())));
        }
        let mut users = MockUserRepository::new();
        {
            let mfr = mfr.clone();
            users
                .expect_find_by_id()
                .returning(move |_| Ok(Some(mfr.clone())));
        }
        let mut checkpoints = MockCheckpointRepository::new();
        {
            let latest = latest.clone();
            checkpoints
                .expect_latest_for_product()
                .returning(move |_| Ok(Some(latest.clone())));
        }
        checkpoints.expect_count_for_product().returning(|_| Ok(3));

        let (_, svc) = service(products, users, checkpoints);
        let view = svc.verify("NEXUS-001").await.unwrap();

        assert_eq!(view.checkpoints_count, 3);
        assert_eq!(view.latest_checkpoint.unwrap().location, "Retail Store");
        assert_eq!(view.manufacturer.name, mfr.name);
    }

    #[tokio::test]
    async fn verify_unknown_key_is_not_found() {
        let mut products = MockProductRepository::new();
        products
            .expect_find_by_product_key()
            .returning(|_| Ok(None));
        let (_, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let err = svc.verify("NEXUS-404").await.unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound));
    }

    #[tokio::test]
    async fn update_requires_ownership() {
        let owner = actor(UserRole::Manufacturer);
        let other = actor(UserRole::Manufacturer);
        let product = registered(&owner);

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }

        let (relay, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let err = svc
            .update(
                &other,
                &product.id,
                ProductPatch {
                    name: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Not authorized to update this product");
        assert!(relay.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_empty_patch_writes_and_announces_nothing() {
        let mfr = actor(UserRole::Manufacturer);
        let product = registered(&mfr);

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }
        let mut users = MockUserRepository::new();
        {
            let mfr = mfr.clone();
            users
                .expect_find_by_id()
                .returning(move |_| Ok(Some(mfr.clone())));
        }

        let (relay, svc) = service(products, users, MockCheckpointRepository::new());
        let out = svc
            .update(&mfr, &product.id, ProductPatch::default())
            .await
            .unwrap();

        assert_eq!(out.product.updated_at, product.updated_at);
        assert!(relay.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_patch_and_clears_explicit_nulls() {
        let mfr = actor(UserRole::Manufacturer);
        let product = registered(&mfr);

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }
        products
            .expect_update()
            .withf(|p: &Product| {
                p.description.is_none()
                    && p.current_status == "VERIFIED"
                    && p.min_temperature == Some(1.0)
                    && p.max_temperature == Some(8.0)
            })
            .returning(|p| Ok(p.clone()));
        let mut users = MockUserRepository::new();
        {
            let mfr = mfr.clone();
            users
                .expect_find_by_id()
                .returning(move |_| Ok(Some(mfr.clone())));
        }

        let (relay, svc) = service(products, users, MockCheckpointRepository::new());
        let out = svc
            .update(
                &mfr,
                &product.id,
                ProductPatch {
                    description: Some(None),
                    current_status: Some("VERIFIED".into()),
                    min_temperature: Some(Some(1.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(out.product.current_status, "VERIFIED");
        assert_eq!(
            relay.summary(),
            vec![
                (Address::Product(product.id), "product:updated"),
                (Address::User(mfr.id), "product:updated"),
            ]
        );
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"description":null,"minTemperature":2.5}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.min_temperature, Some(Some(2.5)));
        assert_eq!(patch.max_temperature, None);
        assert!(!patch.is_empty());
        assert!(ProductPatch::default().is_empty());
    }

    #[tokio::test]
    async fn blockchain_ref_requires_a_hash() {
        let (_, svc) = service(
            MockProductRepository::new(),
            MockUserRepository::new(),
            MockCheckpointRepository::new(),
        );
        let mfr = actor(UserRole::Manufacturer);
        let err = svc
            .set_blockchain_ref(&mfr, &Uuid::new_v4(), BlockchainRef::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationError(msg) if msg == "Blockchain hash is required"
        ));
    }

    #[tokio::test]
    async fn blockchain_ref_announces_confirmation() {
        let mfr = actor(UserRole::Manufacturer);
        let product = registered(&mfr);

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }
        products
            .expect_update()
            .withf(|p: &Product| {
                p.blockchain_hash.as_deref() == Some("0xabc") && p.blockchain_id == Some(7)
            })
            .returning(|p| Ok(p.clone()));

        let (relay, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        let out = svc
            .set_blockchain_ref(
                &mfr,
                &product.id,
                BlockchainRef {
                    blockchain_hash: Some("0xabc".into()),
                    blockchain_id: Some(7),
                },
            )
            .await
            .unwrap();

        assert_eq!(out.blockchain_hash.as_deref(), Some("0xabc"));
        assert_eq!(
            relay.summary(),
            vec![
                (Address::Product(product.id), "blockchain:confirmed"),
                (Address::User(mfr.id), "blockchain:confirmed"),
            ]
        );
    }

    #[tokio::test]
    async fn soft_delete_deactivates_without_events() {
        let mfr = actor(UserRole::Manufacturer);
        let product = registered(&mfr);

        let mut products = MockProductRepository::new();
        {
            let product = product.clone();
            products
                .expect_find_by_id()
                .returning(move |_| Ok(Some(product.clone())));
        }
        products
            .expect_update()
            .withf(|p: &Product| !p.is_active)
            .returning(|p| Ok(p.clone()));

        let (relay, svc) = service(products, MockUserRepository::new(), MockCheckpointRepository::new());
        svc.soft_delete(&mfr, &product.id).await.unwrap();
        assert!(relay.frames.lock().unwrap().is_empty());
    }
}
