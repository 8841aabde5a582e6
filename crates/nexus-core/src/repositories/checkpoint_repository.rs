//! Checkpoint repository trait (port)
//!
//! Checkpoint writes carry the product state derived from the trail;
//! adapters must commit both in a single transaction so the trail and
//! the denormalized product fields never diverge.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::derive::DerivedState;
use crate::domain::{Checkpoint, CheckpointWithHandler};
use crate::error::DomainError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Checkpoint>, DomainError>;

    async fn list_for_product(&self, product_id: &Uuid) -> Result<Vec<Checkpoint>, DomainError>;

    async fn list_for_product_with_handlers(
        &self,
        product_id: &Uuid,
    ) -> Result<Vec<CheckpointWithHandler>, DomainError>;

    /// Chronologically latest checkpoint (timestamp, then insertion
    /// order on ties).
    async fn latest_for_product(&self, product_id: &Uuid)
        -> Result<Option<Checkpoint>, DomainError>;

    async fn count_for_product(&self, product_id: &Uuid) -> Result<i64, DomainError>;

    /// Inserts the checkpoint and writes the product's derived state
    /// atomically.
    async fn insert_with_product_state(
        &self,
        checkpoint: &Checkpoint,
        state: &DerivedState,
    ) -> Result<Checkpoint, DomainError>;

    /// Persists an edited checkpoint; when the edit moved the derived
    /// state, `state` carries the recomputed values to write in the
    /// same transaction.
    async fn update_with_product_state(
        &self,
        checkpoint: &Checkpoint,
        state: Option<DerivedState>,
    ) -> Result<Checkpoint, DomainError>;

    /// Removes the checkpoint and writes the state re-derived from the
    /// remaining trail atomically.
    async fn delete_with_product_state(
        &self,
        id: &Uuid,
        product_id: &Uuid,
        state: &DerivedState,
    ) -> Result<(), DomainError>;
}
