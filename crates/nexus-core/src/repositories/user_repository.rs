//! User repository trait (port)

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::domain::User;
use crate::error::DomainError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;

    /// Email lookup is case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    async fn find_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, DomainError>;

    async fn create(&self, user: &User) -> Result<User, DomainError>;

    async fn update(&self, user: &User) -> Result<User, DomainError>;
}
