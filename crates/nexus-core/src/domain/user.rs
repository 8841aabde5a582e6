//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Supply-chain participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Manufacturer,
    Logistics,
    Retailer,
    Consumer,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Manufacturer,
        UserRole::Logistics,
        UserRole::Retailer,
        UserRole::Consumer,
        UserRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manufacturer => "MANUFACTURER",
            UserRole::Logistics => "LOGISTICS",
            UserRole::Retailer => "RETAILER",
            UserRole::Consumer => "CONSUMER",
            UserRole::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MANUFACTURER" => Some(UserRole::Manufacturer),
            "LOGISTICS" => Some(UserRole::Logistics),
            "RETAILER" => Some(UserRole::Retailer),
            "CONSUMER" => Some(UserRole::Consumer),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Consumer
    }
}

/// Registered participant of the supply chain.
///
/// The password hash never leaves the backend; the entity only
/// implements `Serialize` and skips the field.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    #[validate(email)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,

    pub name: String,
    pub role: UserRole,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: Option<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        name: String,
        role: UserRole,
        company: Option<String>,
        phone: Option<String>,
        wallet_address: Option<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let user = Self {
            id: Uuid::new_v4(),
            email,
            password: password_hash,
            name,
            role,
            company,
            phone,
            wallet_address,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        user.validate()?;
        Ok(user)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
