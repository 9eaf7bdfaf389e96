//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Account type, stored as its lowercase slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Admin,
    Librarian,
    /// May hold loans; cannot use staff endpoints
    Borrower,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Admin => "admin",
            AccountType::Librarian => "librarian",
            AccountType::Borrower => "borrower",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, AccountType::Admin | AccountType::Librarian)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(AccountType::Admin),
            "librarian" => Ok(AccountType::Librarian),
            "borrower" => Ok(AccountType::Borrower),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

// SQLx conversion for AccountType (VARCHAR column)
impl sqlx::Type<Postgres> for AccountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AccountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AccountType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub account_type: AccountType,
    pub crea_date: DateTime<Utc>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl User {
    /// "Firstname Lastname", falling back to the login
    pub fn display_name(&self) -> String {
        let name = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.login.clone()
        } else {
            name
        }
    }
}

/// Short user representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub login: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub account_type: AccountType,
    /// Number of open loans
    pub nb_loans: i64,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Matches login, first name or last name
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 100, message = "Login must be 3 to 100 characters"))]
    pub login: String,
    /// Borrower accounts may be created without a password
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub account_type: Option<AccountType>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 100, message = "Login must be 3 to 100 characters"))]
    pub login: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub account_type: Option<AccountType>,
}

/// Update own profile request (for authenticated users)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Current password (required to change password)
    pub current_password: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub new_password: Option<String>,
}

/// JWT Claims for authenticated users.
///
/// Handlers receive these through the `AuthenticatedUser` extractor; holding a
/// value is the proof that the caller passed authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.account_type.is_staff()
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require a librarian or admin account
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Library staff privileges required".to_string()))
        }
    }

    /// Staff may access any user's records, others only their own
    pub fn require_self_or_staff(&self, user_id: i32) -> Result<(), AppError> {
        if self.is_staff() || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization("Cannot access another user's records".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(account_type: AccountType) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "maria".to_string(),
            user_id: 7,
            account_type,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let token = claims(AccountType::Librarian).create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();

        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.sub, "maria");
        assert_eq!(decoded.account_type, AccountType::Librarian);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = claims(AccountType::Admin).create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut expired = claims(AccountType::Admin);
        expired.iat -= 10_000;
        expired.exp = expired.iat + 60;
        let token = expired.create_token("secret").unwrap();

        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn role_checks() {
        let admin = claims(AccountType::Admin);
        let librarian = claims(AccountType::Librarian);
        let borrower = claims(AccountType::Borrower);

        assert!(admin.require_admin().is_ok());
        assert!(librarian.require_admin().is_err());
        assert!(librarian.require_staff().is_ok());
        assert!(borrower.require_staff().is_err());

        assert!(borrower.require_self_or_staff(7).is_ok());
        assert!(borrower.require_self_or_staff(8).is_err());
        assert!(librarian.require_self_or_staff(8).is_ok());
    }

    #[test]
    fn account_type_parses_slugs() {
        assert_eq!("Borrower".parse::<AccountType>(), Ok(AccountType::Borrower));
        assert_eq!(AccountType::Librarian.to_string(), "librarian");
        assert!("guest".parse::<AccountType>().is_err());
        assert_eq!(
            serde_json::to_string(&AccountType::Admin).unwrap(),
            "\"admin\""
        );
    }

    #[test]
    fn create_user_validation() {
        let request = CreateUser {
            login: "ab".to_string(),
            password: Some("123".to_string()),
            firstname: None,
            lastname: None,
            email: Some("not-an-email".to_string()),
            phone: None,
            address: None,
            account_type: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("login"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn display_name_falls_back_to_login() {
        let mut user = User {
            id: 1,
            login: "jperez".to_string(),
            password: None,
            firstname: None,
            lastname: None,
            email: None,
            phone: None,
            address: None,
            account_type: AccountType::Borrower,
            crea_date: Utc::now(),
            modif_date: None,
        };
        assert_eq!(user.display_name(), "jperez");

        user.firstname = Some("Juan".to_string());
        user.lastname = Some("Pérez".to_string());
        assert_eq!(user.display_name(), "Juan Pérez");
    }
}
