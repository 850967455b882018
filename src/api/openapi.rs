//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, readers, staff};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library loan management REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Loans
        loans::create_loans,
        loans::list_loans,
        loans::get_loan,
        loans::loan_fine,
        loans::return_loan,
        loans::delete_loan,
        loans::pending_loans,
        loans::book_availability,
        loans::top_books,
        // Readers
        readers::create_reader,
        readers::list_readers,
        readers::get_reader,
        readers::update_reader,
        readers::delete_reader,
        // Books
        books::create_book,
        books::list_books,
        books::get_book,
        books::update_book,
        books::delete_book,
        // Staff
        staff::sign_up,
        staff::list_staff,
        staff::get_staff,
        staff::update_staff,
    ),
    components(
        schemas(
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanDetails,
            crate::models::loan::CreateLoans,
            crate::models::loan::LoanDateField,
            crate::models::loan::PendingLoan,
            crate::models::loan::PendingLoans,
            crate::models::loan::ReturnedLoan,
            loans::LoanFine,
            // Readers
            crate::models::reader::Reader,
            crate::models::reader::CreateReader,
            crate::models::reader::UpdateReader,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookAvailability,
            crate::models::book::BookLoanCount,
            // Staff
            crate::models::staff::Staff,
            crate::models::staff::StaffRole,
            crate::models::staff::CreateStaff,
            crate::models::staff::UpdateStaff,
            // Pagination
            crate::models::pagination::Page,
            crate::models::pagination::SortOrder,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "readers", description = "Reader management"),
        (name = "books", description = "Book catalog"),
        (name = "staff", description = "Staff accounts")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_loan_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/loans",
            "/loans/{id}",
            "/loans/{id}/return",
            "/loans/{id}/fine",
            "/loans/pending/{reader_id}",
            "/loans/books/{book_id}/availability",
            "/loans/top-books",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_document_lists_staff_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/auth/sign-up", "/auth", "/auth/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
