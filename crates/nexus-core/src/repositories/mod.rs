//! Repository traits (ports)

pub mod user_repository;
pub mod product_repository;
pub mod checkpoint_repository;

pub use user_repository::UserRepository;
pub use product_repository::{ProductFilter, ProductRepository};
pub use checkpoint_repository::CheckpointRepository;

#[cfg(test)]
pub use checkpoint_repository::MockCheckpointRepository;
#[cfg(test)]
pub use product_repository::MockProductRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
