//! Reader model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Reader model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reader {
    pub id: i32,
    pub name: String,
    pub email: String,
    /// National ID, 11 digits without punctuation
    pub cpf: String,
}

impl Reader {
    /// Merge the fields present in `update`, leaving absent ones untouched
    pub fn apply(&mut self, update: &UpdateReader) {
        if let Some(ref name) = update.new_name {
            self.name = name.clone();
        }
        if let Some(ref email) = update.new_email {
            self.email = email.clone();
        }
    }
}

/// Natural keys a reader can be looked up by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderKey {
    Id(i32),
    Cpf(String),
    Email(String),
}

impl ReaderKey {
    pub fn column(&self) -> &'static str {
        match self {
            ReaderKey::Id(_) => "id",
            ReaderKey::Cpf(_) => "cpf",
            ReaderKey::Email(_) => "email",
        }
    }

    pub fn matches(&self, reader: &Reader) -> bool {
        match self {
            ReaderKey::Id(id) => reader.id == *id,
            ReaderKey::Cpf(cpf) => reader.cpf == *cpf,
            ReaderKey::Email(email) => reader.email == *email,
        }
    }
}

/// Create reader request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// CPF without "." and "-"
    #[validate(length(equal = 11, message = "CPF must have exactly 11 characters"))]
    pub cpf: String,
}

/// Update reader request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReader {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub new_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub new_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> Reader {
        Reader {
            id: 1,
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            cpf: "12345678901".to_string(),
        }
    }

    #[test]
    fn test_apply_only_present_fields() {
        let mut r = reader();
        r.apply(&UpdateReader {
            new_name: None,
            new_email: Some("ana.souza@example.com".to_string()),
        });
        assert_eq!(r.name, "Ana Souza");
        assert_eq!(r.email, "ana.souza@example.com");
    }

    #[test]
    fn test_create_reader_validation() {
        let ok = CreateReader {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            cpf: "12345678901".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateReader {
            cpf: "123".to_string(),
            email: "not-an-email".to_string(),
            ..ok
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cpf"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_key_matches() {
        let r = reader();
        assert!(ReaderKey::Cpf("12345678901".to_string()).matches(&r));
        assert!(!ReaderKey::Id(2).matches(&r));
        assert_eq!(ReaderKey::Email(String::new()).column(), "email");
    }
}
