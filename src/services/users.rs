//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::{AuthConfig, PaginationConfig},
    error::{AppError, AppResult},
    models::user::{AccountType, CreateUser, UpdateProfile, UpdateUser, User, UserClaims, UserQuery, UserShort},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    pagination: PaginationConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, pagination: PaginationConfig) -> Self {
        Self { repository, config, pagination }
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            tracing::info!(login = %login, "Rejected login attempt");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, account_type = %user.account_type, "User logged in");

        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            account_type: user.account_type,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create the configured administrator when no admin account exists yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(login), Some(password)) = (&self.config.admin_login, &self.config.admin_password) else {
            return Ok(());
        };

        if self.repository.users.count_by_account_type(AccountType::Admin).await? > 0 {
            return Ok(());
        }

        let admin = CreateUser {
            login: login.clone(),
            password: Some(password.clone()),
            firstname: None,
            lastname: None,
            email: None,
            phone: None,
            address: None,
            account_type: Some(AccountType::Admin),
        };
        let created = self.create_user(admin).await?;
        tracing::warn!(login = %created.login, "Created initial administrator account; change its password");

        Ok(())
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if let Some(ref hash) = user.password {
            let parsed_hash = PasswordHash::new(hash)
                .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }

        // Accounts without a password cannot log in
        Ok(false)
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64, i64, i64)> {
        let (page, per_page, offset) = self.pagination.resolve(query.page, query.per_page);
        let (users, total) = self.repository.users.search(query, per_page, offset).await?;
        Ok((users, total, page, per_page))
    }

    /// Create a new user
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.login_exists(&user.login, None).await? {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let password = match user.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        let created = self.repository.users.create(&user, password).await?;
        tracing::info!(user_id = created.id, account_type = %created.account_type, "User created");
        Ok(created)
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;

        if let Some(ref login) = user.login {
            if self.repository.users.login_exists(login, Some(id)).await? {
                return Err(AppError::Conflict("Login already exists".to_string()));
            }
        }

        let password = match user.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository.users.update(id, &user, password).await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i32, acting_user_id: i32) -> AppResult<()> {
        if id == acting_user_id {
            return Err(AppError::BusinessRule("Cannot delete your own account".to_string()));
        }

        // Loans keep a reference to their borrower
        if self.repository.loans.count_for_user(id).await? > 0 {
            return Err(AppError::Conflict("User has loans and cannot be deleted".to_string()));
        }

        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Update user's own profile (contact details, password)
    pub async fn update_profile(&self, user_id: i32, profile: UpdateProfile) -> AppResult<User> {
        profile.validate()?;

        let user = self.repository.users.get_by_id(user_id).await?;

        // If changing password, verify current password
        let password = match profile.new_password {
            Some(ref new_password) => {
                let current_password = profile.current_password.as_ref().ok_or_else(|| {
                    AppError::Validation("Current password required to change password".to_string())
                })?;

                if !self.verify_password(&user, current_password)? {
                    return Err(AppError::Authentication("Current password is incorrect".to_string()));
                }
                Some(self.hash_password(new_password)?)
            }
            None => None,
        };

        self.repository.users.update_profile(user_id, &profile, password).await
    }
}
