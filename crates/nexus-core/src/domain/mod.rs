//! # NexusChain Core - Domain Module
//!
//! Domain entities for the supply-chain backend.

pub mod user;
pub mod product;
pub mod checkpoint;
pub mod views;

// Re-export all entities and enums
pub use user::{User, UserRole};
pub use product::{status, NewProduct, Product, ProductCategory};
pub use checkpoint::{Checkpoint, NewCheckpoint};
pub use views::{
    CheckpointBrief, CheckpointDetail, CheckpointWithHandler, HandlerBrief, ManufacturerBrief,
    ManufacturerContact, ManufacturerPublic, ProductBrief, ProductDetail, ProductSummary,
    ProductWithManufacturer, VerifiedProduct,
};
