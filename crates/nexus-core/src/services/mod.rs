//! Domain services (business logic)

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

pub mod auth_service;
pub mod product_service;
pub mod checkpoint_service;

pub use auth_service::{AuthPayload, AuthService, ChangePasswordRequest, LoginRequest, RegisterRequest, UserPatch};
pub use product_service::{
    BlockchainRef, ListProductsQuery, ProductListing, ProductPatch, ProductService,
    RegisterProductRequest,
};
pub use checkpoint_service::{
    AddCheckpointRequest, CheckpointPatch, CheckpointService, TemperatureAlert,
    TemperatureAlertReport, TemperatureRange,
};

/// Treats missing and empty strings the same way the wire always has:
/// both count as "not provided" for required-field checks.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parses a wire date: RFC 3339 timestamp or bare `YYYY-MM-DD`, as UTC.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_drops_missing_and_empty_values() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(String::new())), None);
        assert_eq!(required(Some("x".into())), Some("x".to_string()));
    }

    #[test]
    fn dates_parse_both_wire_shapes() {
        assert_eq!(
            parse_date("2024-01-15"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-01-15T08:30:00+07:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap())
        );
        assert_eq!(parse_date("January"), None);
    }
}
