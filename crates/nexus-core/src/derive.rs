//! Lifecycle state derivation
//!
//! A product's `current_location` / `current_status` are denormalized
//! from its checkpoint trail. All rules live here as pure functions so
//! the write paths (insert, edit, delete) share one definition of
//! "which checkpoint speaks for the product".

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{status, Checkpoint, Product};

/// How a freshly inserted checkpoint affects the product's denormalized
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationPolicy {
    /// The write order decides: whichever checkpoint lands last
    /// overwrites the product state, even if its event time is older.
    LastWriteWins,
    /// The event time decides: a checkpoint only overwrites the product
    /// state when its timestamp is at or after the newest one on file.
    /// Backdated scans from offline devices land in the trail without
    /// rewinding the product.
    LatestTimestampWins,
}

/// Policy applied by the services on every checkpoint write.
pub const ACTIVE_DERIVATION_POLICY: DerivationPolicy = DerivationPolicy::LatestTimestampWins;

/// Denormalized product state computed from the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedState {
    pub current_location: String,
    pub current_status: String,
}

impl DerivedState {
    fn from_checkpoint(cp: &Checkpoint) -> Self {
        Self {
            current_location: cp.location.clone(),
            current_status: cp.status.clone(),
        }
    }

    fn origin(product: &Product) -> Self {
        Self {
            current_location: product.origin_location.clone(),
            current_status: status::REGISTERED.to_string(),
        }
    }

    fn current(product: &Product) -> Self {
        Self {
            current_location: product.current_location.clone(),
            current_status: product.current_status.clone(),
        }
    }
}

/// State the product should carry after `incoming` is appended.
///
/// `newest_existing` is the chronologically latest checkpoint already on
/// file, if any.
pub fn state_after_insert(
    product: &Product,
    newest_existing: Option<&Checkpoint>,
    incoming: &Checkpoint,
    policy: DerivationPolicy,
) -> DerivedState {
    match policy {
        DerivationPolicy::LastWriteWins => DerivedState::from_checkpoint(incoming),
        DerivationPolicy::LatestTimestampWins => match newest_existing {
            Some(newest) if incoming.timestamp < newest.timestamp => {
                DerivedState::current(product)
            }
            _ => DerivedState::from_checkpoint(incoming),
        },
    }
}

/// Recomputes the product state from the full trail.
///
/// The chronologically latest checkpoint wins, with insertion order
/// (`created_at`) breaking timestamp ties. An empty trail resets to the
/// origin location and `REGISTERED`.
pub fn derive_current_state(product: &Product, checkpoints: &[Checkpoint]) -> DerivedState {
    checkpoints
        .iter()
        .max_by_key(|cp| (cp.timestamp, cp.created_at))
        .map(DerivedState::from_checkpoint)
        .unwrap_or_else(|| DerivedState::origin(product))
}

/// Display ordering for a trail: newest event first, later insert first
/// on timestamp ties.
pub fn display_order(a: &Checkpoint, b: &Checkpoint) -> Ordering {
    (b.timestamp, b.created_at).cmp(&(a.timestamp, a.created_at))
}

/// Orders a trail for display. See [`display_order`].
pub fn sort_for_display(checkpoints: &mut [Checkpoint]) {
    checkpoints.sort_by(display_order);
}

/// Kind of temperature violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    TooCold,
    TooHot,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::TooCold => "TOO_COLD",
            AlertType::TooHot => "TOO_HOT",
        }
    }
}

/// Classifies a temperature reading against the product's bounds.
///
/// Violations are strict: a reading exactly at a bound is compliant.
/// A bound set to 0.0 is still a bound; only an absent bound is
/// skipped. Readings without a temperature are never violations.
/// Returns the violated threshold alongside the kind, cold first.
pub fn classify_reading(
    min: Option<f64>,
    max: Option<f64>,
    temperature: Option<f64>,
) -> Option<(AlertType, f64)> {
    let temp = temperature?;
    if let Some(min) = min {
        if temp < min {
            return Some((AlertType::TooCold, min));
        }
    }
    if let Some(max) = max {
        if temp > max {
            return Some((AlertType::TooHot, max));
        }
    }
    None
}
