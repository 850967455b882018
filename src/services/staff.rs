//! Staff account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::staff::{CreateStaff, NewStaff, Staff, StaffChanges, UpdateStaff},
    repository::Repository,
};

#[derive(Clone)]
pub struct StaffService {
    repository: Repository,
}

impl StaffService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a staff account
    pub async fn create(&self, data: CreateStaff) -> AppResult<Staff> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self
            .repository
            .staff
            .find_by_email(&data.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                data.email
            )));
        }

        let staff = self
            .repository
            .staff
            .create(&NewStaff {
                name: data.name,
                email: data.email,
                password_hash: hash_password(&data.password)?,
                role: data.role,
            })
            .await?;
        tracing::info!(staff_id = staff.id, role = %staff.role, "Staff account created");
        Ok(staff)
    }

    pub async fn get(&self, id: i32) -> AppResult<Staff> {
        self.repository
            .staff
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff account with id {} not found", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<Staff>> {
        self.repository.staff.list().await
    }

    /// Change name, email or password of the account the current
    /// credentials belong to
    pub async fn update(&self, data: UpdateStaff) -> AppResult<Staff> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let invalid = || AppError::Authentication("Invalid email or password".to_string());
        let staff = self
            .repository
            .staff
            .find_by_email(&data.email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&staff, &data.password)? {
            return Err(invalid());
        }

        if let Some(ref email) = data.new_email {
            let owner = self.repository.staff.find_by_email(email).await?;
            if owner.is_some_and(|s| s.id != staff.id) {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        let password_hash = match data.new_password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };
        let changes = StaffChanges {
            name: data.name,
            email: data.new_email,
            password_hash,
        };

        let updated = self
            .repository
            .staff
            .update(staff.id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Staff account not found".to_string()))?;
        tracing::info!(staff_id = updated.id, "Staff account updated");
        Ok(updated)
    }
}

fn verify_password(staff: &Staff, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&staff.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::staff::StaffRole;

    fn sign_up(email: &str, role: StaffRole) -> CreateStaff {
        CreateStaff {
            name: "Conceição".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role,
        }
    }

    fn credentials(email: &str, password: &str) -> UpdateStaff {
        UpdateStaff {
            email: email.to_string(),
            password: password.to_string(),
            new_email: None,
            new_password: None,
            name: None,
        }
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let service = StaffService::new(Repository::memory());
        let staff = service
            .create(sign_up("desk@libris.example", StaffRole::Employee))
            .await
            .unwrap();

        assert_ne!(staff.password_hash, "correct horse");
        assert!(staff.password_hash.starts_with("$argon2"));
        assert!(verify_password(&staff, "correct horse").unwrap());
        assert!(!verify_password(&staff, "wrong horse").unwrap());
        assert_eq!(service.get(staff.id).await.unwrap().email, "desk@libris.example");
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_and_bad_input() {
        let service = StaffService::new(Repository::memory());
        service
            .create(sign_up("desk@libris.example", StaffRole::Employee))
            .await
            .unwrap();

        assert!(matches!(
            service
                .create(sign_up("desk@libris.example", StaffRole::Admin))
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            service.create(sign_up("not-an-email", StaffRole::Admin)).await,
            Err(AppError::Validation(_))
        ));
        let mut short = sign_up("short@libris.example", StaffRole::Admin);
        short.password = "abc".to_string();
        assert!(matches!(
            service.create(short).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(service.get(99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_needs_current_credentials() {
        let service = StaffService::new(Repository::memory());
        let staff = service
            .create(sign_up("desk@libris.example", StaffRole::Employee))
            .await
            .unwrap();

        let wrong = UpdateStaff {
            name: Some("Intruder".to_string()),
            ..credentials("desk@libris.example", "guess")
        };
        assert!(matches!(
            service.update(wrong).await,
            Err(AppError::Authentication(_))
        ));
        let unknown = credentials("nobody@libris.example", "correct horse");
        assert!(matches!(
            service.update(unknown).await,
            Err(AppError::Authentication(_))
        ));

        let change = UpdateStaff {
            new_email: Some("front@libris.example".to_string()),
            new_password: Some("battery staple".to_string()),
            name: Some("Conceição Evaristo".to_string()),
            ..credentials("desk@libris.example", "correct horse")
        };
        let updated = service.update(change).await.unwrap();
        assert_eq!(updated.id, staff.id);
        assert_eq!(updated.email, "front@libris.example");
        assert_eq!(updated.name, "Conceição Evaristo");
        assert_eq!(updated.role, StaffRole::Employee);
        assert!(verify_password(&updated, "battery staple").unwrap());

        let stale = credentials("front@libris.example", "correct horse");
        assert!(matches!(
            service.update(stale).await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_update_cannot_take_another_email() {
        let service = StaffService::new(Repository::memory());
        service
            .create(sign_up("desk@libris.example", StaffRole::Employee))
            .await
            .unwrap();
        service
            .create(sign_up("boss@libris.example", StaffRole::Admin))
            .await
            .unwrap();

        let change = UpdateStaff {
            new_email: Some("boss@libris.example".to_string()),
            ..credentials("desk@libris.example", "correct horse")
        };
        assert!(matches!(
            service.update(change).await,
            Err(AppError::Conflict(_))
        ));
    }
}
