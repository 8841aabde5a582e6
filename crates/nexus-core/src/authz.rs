//! Authorization rules
//!
//! Role gates and ownership checks for every mutation. The matches are
//! exhaustive over `UserRole` so adding a role forces a decision here.

use crate::domain::{Checkpoint, Product, User, UserRole};
use crate::error::DomainError;

/// Only manufacturers register products (admins can act for them).
pub fn can_register_product(role: UserRole) -> bool {
    match role {
        UserRole::Manufacturer | UserRole::Admin => true,
        UserRole::Logistics | UserRole::Retailer | UserRole::Consumer => false,
    }
}

/// Checkpoints come from the parties that physically handle goods.
pub fn can_add_checkpoint(role: UserRole) -> bool {
    match role {
        UserRole::Logistics | UserRole::Manufacturer | UserRole::Admin => true,
        UserRole::Retailer | UserRole::Consumer => false,
    }
}

pub fn ensure_can_register_product(role: UserRole) -> Result<(), DomainError> {
    if can_register_product(role) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Access denied. Required roles: MANUFACTURER, ADMIN".into(),
        ))
    }
}

pub fn ensure_can_add_checkpoint(role: UserRole) -> Result<(), DomainError> {
    if can_add_checkpoint(role) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Access denied. Required roles: LOGISTICS, MANUFACTURER, ADMIN".into(),
        ))
    }
}

/// A product is managed by its manufacturer; admins can manage any.
pub fn can_manage_product(product: &Product, actor: &User) -> bool {
    product.manufacturer_id == actor.id || actor.role == UserRole::Admin
}

pub fn ensure_can_update_product(product: &Product, actor: &User) -> Result<(), DomainError> {
    if can_manage_product(product, actor) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Not authorized to update this product".into(),
        ))
    }
}

pub fn ensure_can_delete_product(product: &Product, actor: &User) -> Result<(), DomainError> {
    if can_manage_product(product, actor) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Not authorized to delete this product".into(),
        ))
    }
}

/// A checkpoint is managed by whoever recorded it; admins can manage
/// any.
pub fn can_manage_checkpoint(checkpoint: &Checkpoint, actor: &User) -> bool {
    checkpoint.handled_by == actor.id || actor.role == UserRole::Admin
}

pub fn ensure_can_update_checkpoint(
    checkpoint: &Checkpoint,
    actor: &User,
) -> Result<(), DomainError> {
    if can_manage_checkpoint(checkpoint, actor) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Not authorized to update this checkpoint".into(),
        ))
    }
}

pub fn ensure_can_delete_checkpoint(
    checkpoint: &Checkpoint,
    actor: &User,
) -> Result<(), DomainError> {
    if can_manage_checkpoint(checkpoint, actor) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Not authorized to delete this checkpoint".into(),
        ))
    }
}
