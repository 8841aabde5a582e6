//! Checkpoint domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scan event in a product's custody trail.
///
/// `timestamp` is the event time reported by the scanner and may lie in
/// the past when devices sync after being offline; `created_at` is when
/// the backend stored the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: Uuid,
    pub product_id: Uuid,

    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub status: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub notes: Option<String>,

    pub handled_by: Uuid,
    pub blockchain_hash: Option<String>,

    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a new checkpoint.
#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub product_id: Uuid,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub notes: Option<String>,
    pub handled_by: Uuid,
    pub blockchain_hash: Option<String>,
    /// Explicit event time; defaults to now when the scanner omits it.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Checkpoint {
    pub fn new(input: NewCheckpoint) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_id: input.product_id,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            status: input.status,
            temperature: input.temperature,
            humidity: input.humidity,
            notes: input.notes,
            handled_by: input.handled_by,
            blockchain_hash: input.blockchain_hash,
            timestamp: input.timestamp.unwrap_or(now),
            created_at: now,
        }
    }
}
