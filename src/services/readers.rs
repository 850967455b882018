//! Reader management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::{Page, PageQuery},
        reader::{CreateReader, Reader, ReaderKey, UpdateReader},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
}

impl ReadersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: CreateReader) -> AppResult<Reader> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if !data.cpf.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(
                "CPF must contain digits only".to_string(),
            ));
        }

        if self
            .repository
            .readers
            .find_by(&ReaderKey::Email(data.email.clone()))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                data.email
            )));
        }
        if self
            .repository
            .readers
            .find_by(&ReaderKey::Cpf(data.cpf.clone()))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("CPF is already registered".to_string()));
        }

        let reader = self.repository.readers.create(&data).await?;
        tracing::info!(reader_id = reader.id, "Reader created");
        Ok(reader)
    }

    pub async fn get(&self, id: i32) -> AppResult<Reader> {
        self.find_by(&ReaderKey::Id(id)).await
    }

    /// Lookup by id, CPF or email
    pub async fn find_by(&self, key: &ReaderKey) -> AppResult<Reader> {
        self.repository
            .readers
            .find_by(key)
            .await?
            .ok_or_else(AppError::reader_not_found)
    }

    /// List readers, returning the window that was applied and the total count
    pub async fn list(&self, query: PageQuery) -> AppResult<(Vec<Reader>, Option<Page>, i64)> {
        let page = Page::from_parts(query.skip, query.limit)?;
        let total = self.repository.readers.count().await?;
        if let Some(page) = page {
            page.check_within(total)?;
        }

        let readers = self
            .repository
            .readers
            .list(page, query.order_by.unwrap_or_default())
            .await?;
        Ok((readers, page, total))
    }

    pub async fn update(&self, id: i32, data: UpdateReader) -> AppResult<Reader> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref email) = data.new_email {
            let owner = self
                .repository
                .readers
                .find_by(&ReaderKey::Email(email.clone()))
                .await?;
            if owner.is_some_and(|r| r.id != id) {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        self.repository
            .readers
            .update(id, &data)
            .await?
            .ok_or_else(AppError::reader_not_found)
    }

    /// Delete a reader together with its loans
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.readers.delete(id).await? {
            return Err(AppError::reader_not_found());
        }
        tracing::info!(reader_id = id, "Reader deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(email: &str, cpf: &str) -> CreateReader {
        CreateReader {
            name: "Machado de Assis".to_string(),
            email: email.to_string(),
            cpf: cpf.to_string(),
        }
    }

    #[tokio::test]
    async fn test_natural_keys_are_unique() {
        let service = ReadersService::new(Repository::memory());
        service
            .create(reader("machado@example.com", "12345678901"))
            .await
            .unwrap();

        let same_email = service
            .create(reader("machado@example.com", "10987654321"))
            .await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));

        let same_cpf = service
            .create(reader("other@example.com", "12345678901"))
            .await;
        assert!(matches!(same_cpf, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cpf_and_email_format() {
        let service = ReadersService::new(Repository::memory());
        assert!(matches!(
            service.create(reader("a@example.com", "123.456.789")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(reader("a@example.com", "1234567890x")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(reader("not-an-email", "12345678901")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let service = ReadersService::new(Repository::memory());
        let created = service
            .create(reader("machado@example.com", "12345678901"))
            .await
            .unwrap();
        let other = service
            .create(reader("bentinho@example.com", "22222222222"))
            .await
            .unwrap();

        let renamed = service
            .update(
                created.id,
                UpdateReader {
                    new_name: Some("Joaquim Maria".to_string()),
                    new_email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Joaquim Maria");
        assert_eq!(renamed.email, "machado@example.com");

        let taken = service
            .update(
                created.id,
                UpdateReader {
                    new_name: None,
                    new_email: Some(other.email.clone()),
                },
            )
            .await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));

        // Re-submitting one's own email is not a conflict
        service
            .update(
                created.id,
                UpdateReader {
                    new_name: None,
                    new_email: Some("machado@example.com".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.update(999, UpdateReader::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let service = ReadersService::new(Repository::memory());
        for i in 0..3 {
            service
                .create(reader(
                    &format!("r{}@example.com", i),
                    &format!("{:011}", i),
                ))
                .await
                .unwrap();
        }

        let (readers, page, total) = service
            .list(PageQuery {
                skip: Some(1),
                limit: Some(5),
                order_by: None,
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page, Some(Page { skip: 1, limit: 5 }));
        assert_eq!(readers.len(), 2);

        let beyond = service
            .list(PageQuery {
                skip: Some(3),
                limit: Some(5),
                order_by: None,
            })
            .await;
        assert!(matches!(beyond, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_reader() {
        let service = ReadersService::new(Repository::memory());
        assert!(matches!(service.delete(1).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.get(1).await, Err(AppError::NotFound(_))));
    }
}
