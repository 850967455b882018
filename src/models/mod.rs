//! Data models for Libris

pub mod book;
pub mod loan;
pub mod pagination;
pub mod reader;
pub mod staff;

// Re-export commonly used types
pub use book::{Book, BookAvailability, BookLoanCount};
pub use loan::{Loan, LoanDetails, LoanFilter, LoanStatus};
pub use pagination::{Page, SortOrder};
pub use reader::{Reader, ReaderKey};
pub use staff::{StaffClaims, StaffRole};
