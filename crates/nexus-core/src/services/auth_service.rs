//! Authentication service: register, login, profile, password change

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use nexus_security::jwt::JwtService;
use nexus_security::password::PasswordService;
use nexus_shared::constants::MIN_PASSWORD_LENGTH;
use nexus_shared::utils::mask_email;

use crate::domain::{User, UserRole};
use crate::error::DomainError;
use crate::repositories::UserRepository;
use crate::services::required;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Profile patch. A missing field is left untouched; an explicit null
/// clears the nullable fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub wallet_address: Option<Option<String>>,
}

/// Authenticated user plus their bearer token.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self { user_repo, jwt }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthPayload, DomainError> {
        let email = required(req.email)
            .ok_or_else(required_register_fields)?;
        let password = required(req.password).ok_or_else(required_register_fields)?;
        let name = required(req.name).ok_or_else(required_register_fields)?;
        let role_raw = required(req.role).ok_or_else(required_register_fields)?;

        info!("Registration attempt for email: {}", mask_email(&email));

        let role = UserRole::from_str(&role_raw).ok_or_else(|| {
            DomainError::ValidationError(format!(
                "Invalid role. Must be one of: {}",
                UserRole::ALL.map(|r| r.as_str()).join(", ")
            ))
        })?;

        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self.user_repo.find_by_email(&email).await?.is_some() {
            warn!("Registration failed: email already exists: {}", mask_email(&email));
            return Err(DomainError::EmailAlreadyExists(email));
        }

        let wallet_address = req.wallet_address.filter(|w| !w.is_empty());
        if let Some(wallet) = &wallet_address {
            if self.user_repo.find_by_wallet(wallet).await?.is_some() {
                warn!("Registration failed: wallet address already registered");
                return Err(DomainError::WalletAddressAlreadyExists(wallet.clone()));
            }
        }

        let password_hash = PasswordService::hash(&password)
            .map_err(|e| DomainError::PasswordHashError(e.to_string()))?;

        let user = User::new(
            email,
            password_hash,
            name,
            role,
            req.company,
            req.phone,
            wallet_address,
        )
        .map_err(|e| DomainError::ValidationError(e.to_string()))?;

        let created = self.user_repo.create(&user).await?;
        let token = self
            .jwt
            .generate_token(&created.id)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        info!("Registration successful for: {}", mask_email(&created.email));
        Ok(AuthPayload { user: created, token })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthPayload, DomainError> {
        let email = required(req.email).ok_or_else(|| {
            DomainError::ValidationError("Email and password are required".into())
        })?;
        let password = required(req.password).ok_or_else(|| {
            DomainError::ValidationError("Email and password are required".into())
        })?;

        info!("Login attempt for email: {}", mask_email(&email));

        let user = self.user_repo.find_by_email(&email).await?.ok_or_else(|| {
            warn!("Login failed: email not found: {}", mask_email(&email));
            DomainError::InvalidCredentials
        })?;

        if !user.is_active {
            warn!("Login failed: account deactivated: {}", mask_email(&email));
            return Err(DomainError::AccountDeactivated);
        }

        let password_valid = PasswordService::verify(&password, &user.password)
            .map_err(|_e| DomainError::InvalidCredentials)?;
        if !password_valid {
            warn!("Login failed: invalid password for: {}", mask_email(&email));
            return Err(DomainError::InvalidCredentials);
        }

        let token = self
            .jwt
            .generate_token(&user.id)
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        info!("Login successful for: {}", mask_email(&user.email));
        Ok(AuthPayload { user, token })
    }

    pub async fn update_profile(
        &self,
        actor_id: &Uuid,
        patch: UserPatch,
    ) -> Result<User, DomainError> {
        let mut user = self
            .user_repo
            .find_by_id(actor_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        if let Some(wallet_patch) = &patch.wallet_address {
            if let Some(wallet) = wallet_patch.as_deref().filter(|w| !w.is_empty()) {
                if let Some(existing) = self.user_repo.find_by_wallet(wallet).await? {
                    if existing.id != user.id {
                        return Err(DomainError::WalletAddressAlreadyExists(wallet.into()));
                    }
                }
            }
        }

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(company) = patch.company {
            user.company = company;
        }
        if let Some(phone) = patch.phone {
            user.phone = phone;
        }
        if let Some(wallet) = patch.wallet_address {
            user.wallet_address = wallet.filter(|w| !w.is_empty());
        }
        user.touch();

        self.user_repo.update(&user).await
    }

    pub async fn change_password(
        &self,
        actor_id: &Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), DomainError> {
        let current = required(req.current_password).ok_or_else(|| {
            DomainError::ValidationError("Current password and new password are required".into())
        })?;
        let new = required(req.new_password).ok_or_else(|| {
            DomainError::ValidationError("Current password and new password are required".into())
        })?;

        if new.len() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut user = self
            .user_repo
            .find_by_id(actor_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let current_valid = PasswordService::verify(&current, &user.password)
            .map_err(|e| DomainError::PasswordHashError(e.to_string()))?;
        if !current_valid {
            warn!("Password change rejected: wrong current password for user {}", user.id);
            return Err(DomainError::CurrentPasswordIncorrect);
        }

        user.password = PasswordService::hash(&new)
            .map_err(|e| DomainError::PasswordHashError(e.to_string()))?;
        user.touch();

        self.user_repo.update(&user).await?;
        info!("Password changed for user {}", user.id);
        Ok(())
    }
}

fn required_register_fields() -> DomainError {
    DomainError::ValidationError("Email, password, name, and role are required".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockUserRepository;

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new("test-secret".into(), 3600))
    }

    fn stored_user(password: &str, active: bool) -> User {
        let mut user = User::new(
            "factory@nexuschain.io".into(),
            PasswordService::hash(password).unwrap(),
            "Acme Factory".into(),
            UserRole::Manufacturer,
            Some("Acme".into()),
            None,
            None,
        )
        .unwrap();
        user.is_active = active;
        user
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: Some("factory@nexuschain.io".into()),
            password: Some("super-secret".into()),
            name: Some("Acme Factory".into()),
            role: Some("MANUFACTURER".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let mut repo = MockUserRepository::new();
        let existing = stored_user("whatever-pass", true);
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(existing.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let err = service.register(register_request()).await.unwrap_err();
        assert!(matches!(err, DomainError::EmailAlreadyExists(_)));
    }

    #[tokio::test]
    async fn register_rejects_unknown_role() {
        let service = AuthService::new(Arc::new(MockUserRepository::new()), jwt());
        let err = service
            .register(RegisterRequest {
                role: Some("SUPPLIER".into()),
                ..register_request()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Validation error: Invalid role"));
    }

    #[tokio::test]
    async fn register_requires_every_mandatory_field() {
        let service = AuthService::new(Arc::new(MockUserRepository::new()), jwt());
        let err = service
            .register(RegisterRequest {
                name: Some(String::new()),
                ..register_request()
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Email, password, name, and role are required"
        );
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let service = AuthService::new(Arc::new(MockUserRepository::new()), jwt());
        let err = service
            .register(RegisterRequest {
                password: Some("short".into()),
                ..register_request()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[tokio::test]
    async fn register_stores_hash_and_returns_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_create()
            .withf(|user: &User| {
                user.password != "super-secret" && user.password.starts_with("$2")
            })
            .returning(|user| Ok(user.clone()));

        let service = AuthService::new(Arc::new(repo), jwt());
        let payload = service.register(register_request()).await.unwrap();
        assert!(!payload.token.is_empty());
        assert_eq!(payload.user.role, UserRole::Manufacturer);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let mut repo = MockUserRepository::new();
        let user = stored_user("right-password", true);
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let err = service
            .login(LoginRequest {
                email: Some("factory@nexuschain.io".into()),
                password: Some("wrong-password".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_rejects_deactivated_account() {
        let mut repo = MockUserRepository::new();
        let user = stored_user("right-password", false);
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let err = service
            .login(LoginRequest {
                email: Some("factory@nexuschain.io".into()),
                password: Some("right-password".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccountDeactivated));
    }

    #[tokio::test]
    async fn login_returns_token_for_valid_credentials() {
        let mut repo = MockUserRepository::new();
        let user = stored_user("right-password", true);
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let payload = service
            .login(LoginRequest {
                email: Some("factory@nexuschain.io".into()),
                password: Some("right-password".into()),
            })
            .await
            .unwrap();
        assert!(!payload.token.is_empty());
    }

    #[tokio::test]
    async fn update_profile_rejects_wallet_taken_by_other_user() {
        let mut repo = MockUserRepository::new();
        let me = stored_user("pass-123456", true);
        let me_id = me.id;
        let other = stored_user("pass-123456", true);
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(me.clone())));
        repo.expect_find_by_wallet()
            .returning(move |_| Ok(Some(other.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let err = service
            .update_profile(
                &me_id,
                UserPatch {
                    wallet_address: Some(Some("0xabc".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::WalletAddressAlreadyExists(_)));
    }

    #[tokio::test]
    async fn update_profile_clears_wallet_on_explicit_null() {
        let mut repo = MockUserRepository::new();
        let mut me = stored_user("pass-123456", true);
        me.wallet_address = Some("0xabc".into());
        let me_id = me.id;
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(me.clone())));
        repo.expect_update()
            .withf(|user: &User| user.wallet_address.is_none())
            .returning(|user| Ok(user.clone()));

        let service = AuthService::new(Arc::new(repo), jwt());
        let updated = service
            .update_profile(
                &me_id,
                UserPatch {
                    wallet_address: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.wallet_address.is_none());
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current() {
        let mut repo = MockUserRepository::new();
        let user = stored_user("current-pass", true);
        let user_id = user.id;
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());
        let err = service
            .change_password(
                &user_id,
                ChangePasswordRequest {
                    current_password: Some("not-the-current".into()),
                    new_password: Some("brand-new-pass".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CurrentPasswordIncorrect));
    }

    #[test]
    fn user_patch_distinguishes_missing_from_null() {
        let patch: UserPatch = serde_json::from_str(r#"{"walletAddress": null}"#).unwrap();
        assert_eq!(patch.wallet_address, Some(None));
        assert!(patch.company.is_none());

        let patch: UserPatch =
            serde_json::from_str(r#"{"company": "Acme", "name": "New Name"}"#).unwrap();
        assert_eq!(patch.company, Some(Some("Acme".into())));
        assert_eq!(patch.name.as_deref(), Some("New Name"));
    }
}
