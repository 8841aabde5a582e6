// ============================================================================
// NexusChain API - Product Handlers
// File: crates/nexus-api/src/handlers/products.rs
// ============================================================================
//! Product HTTP handlers: registration, listing, detail, public QR
//! verification, updates, ledger anchoring, and soft delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use nexus_core::domain::{Product, ProductDetail, ProductWithManufacturer, VerifiedProduct};
use nexus_core::services::{
    BlockchainRef, ListProductsQuery, ProductListing, ProductPatch, RegisterProductRequest,
};
use nexus_core::DomainError;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductBody<T: Serialize> {
    pub product: T,
}

/// Envelope of the public verify endpoint. It carries a top-level
/// `verified` flag next to `success`, unlike every other route.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ProductBody<VerifiedProduct>>,
}

/// Product registration handler - POST /api/products
pub async fn register_product(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<RegisterProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductBody<ProductWithManufacturer>>>), ApiError> {
    let product = state.product_service.register(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Product registered successfully",
            ProductBody { product },
        )),
    ))
}

/// Product listing handler - GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ApiResponse<ProductListing>>, ApiError> {
    let listing = state.product_service.list(query).await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// Product detail handler - GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductBody<ProductDetail>>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::ProductNotFound)?;
    let product = state.product_service.get(&id).await?;
    Ok(Json(ApiResponse::success(ProductBody { product })))
}

/// QR verification handler - GET /api/products/verify/{productId}
///
/// Public route keyed by the label's product key, not the row id.
pub async fn verify_product(
    State(state): State<AppState>,
    Path(product_key): Path<String>,
) -> Result<(StatusCode, Json<VerifyResponse>), ApiError> {
    match state.product_service.verify(&product_key).await {
        Ok(product) => Ok((
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                verified: true,
                message: None,
                data: Some(ProductBody { product }),
            }),
        )),
        Err(DomainError::ProductNotFound) => Ok((
            StatusCode::NOT_FOUND,
            Json(VerifyResponse {
                success: false,
                verified: false,
                message: Some("Product not found".into()),
                data: None,
            }),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Product update handler - PUT /api/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ApiResponse<ProductBody<ProductWithManufacturer>>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::ProductNotFound)?;
    let product = state.product_service.update(&actor, &id, patch).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Product updated successfully",
        ProductBody { product },
    )))
}

/// Ledger anchor handler - PUT /api/products/{id}/blockchain
pub async fn update_blockchain(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<BlockchainRef>,
) -> Result<Json<ApiResponse<ProductBody<Product>>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::ProductNotFound)?;
    let product = state
        .product_service
        .set_blockchain_ref(&actor, &id, req)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        "Blockchain hash updated successfully",
        ProductBody { product },
    )))
}

/// Product delete handler - DELETE /api/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::ProductNotFound)?;
    state.product_service.soft_delete(&actor, &id).await?;
    Ok(Json(ApiResponse::message_only(
        "Product deleted successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nexus_core::domain::{ManufacturerPublic, NewProduct, ProductCategory};

    #[test]
    fn verify_envelopes_carry_the_verified_flag() {
        let product = Product::new(
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
                min_temperature: None,
                max_temperature: None,
            },
            "{}".into(),
        );
        let view = VerifiedProduct::compose(
            &product,
            ManufacturerPublic {
                name: "Acme".into(),
                company: None,
            },
            0,
            None,
        );

        let found = serde_json::to_value(VerifyResponse {
            success: true,
            verified: true,
            message: None,
            data: Some(ProductBody { product: view }),
        })
        .unwrap();
        assert_eq!(found["verified"], true);
        assert_eq!(found["data"]["product"]["productId"], "NEXUS-001");
        assert!(found.get("message").is_none());

        let missing = serde_json::to_value(VerifyResponse {
            success: false,
            verified: false,
            message: Some("Product not found".into()),
            data: None,
        })
        .unwrap();
        assert_eq!(missing["verified"], false);
        assert_eq!(missing["message"], "Product not found");
        assert!(missing.get("data").is_none());
    }
}
