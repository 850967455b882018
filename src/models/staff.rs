//! Staff accounts and the claims carried in their bearer tokens

use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, FromRow, Postgres,
};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Staff roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Employee,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Employee => "employee",
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(StaffRole::Admin),
            "employee" => Ok(StaffRole::Employee),
            _ => Err(format!("Invalid staff role: {}", s)),
        }
    }
}

// Stored as text
impl sqlx::Type<Postgres> for StaffRole {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for StaffRole {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for StaffRole {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Staff account from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Staff {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip)]
    pub password_hash: String,
    pub role: StaffRole,
}

/// Sign-up request for a new staff account
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStaff {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters"))]
    pub password: String,
    pub role: StaffRole,
}

/// Account update, authorized by the current email and password
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStaff {
    pub email: String,
    pub password: String,
    #[validate(email(message = "Invalid email format"))]
    pub new_email: Option<String>,
    #[validate(length(min = 8, message = "Password must have at least 8 characters"))]
    pub new_password: Option<String>,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
}

/// Row to insert, password already hashed
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: StaffRole,
}

/// Column changes; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct StaffChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl Staff {
    pub fn apply(&mut self, changes: &StaffChanges) {
        if let Some(ref name) = changes.name {
            self.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            self.email = email.clone();
        }
        if let Some(ref hash) = changes.password_hash {
            self.password_hash = hash.clone();
        }
    }
}

/// JWT claims for an authenticated staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Staff account id
    pub sub: i32,
    pub name: String,
    pub role: StaffRole,
    /// Expiration (seconds since epoch)
    pub exp: usize,
}

impl StaffClaims {
    /// Sign the claims with the shared secret
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

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == StaffRole::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator rights required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: StaffRole) -> StaffClaims {
        StaffClaims {
            sub: 1,
            name: "Maria".to_string(),
            role,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        }
    }

    #[test]
    fn test_token_roundtrip_and_roles() {
        let token = claims(StaffRole::Employee).create_token("secret").unwrap();
        let parsed = StaffClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.role, StaffRole::Employee);
        assert!(matches!(parsed.require_admin(), Err(AppError::Authorization(_))));
        assert!(claims(StaffRole::Admin).require_admin().is_ok());
        assert!(StaffClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_unknown_role_is_not_staff() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({
                "sub": 2,
                "name": "Visitor",
                "role": "reader",
                "exp": chrono::Utc::now().timestamp() + 3600,
            }),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(StaffClaims::from_token(&token, "secret").is_err());
        assert_eq!("Admin".parse::<StaffRole>(), Ok(StaffRole::Admin));
        assert!("reader".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let staff = Staff {
            id: 3,
            name: "Joana".to_string(),
            email: "joana@libris.example".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: StaffRole::Employee,
        };
        let json = serde_json::to_value(&staff).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "employee");
    }
}
