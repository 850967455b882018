//! Business logic services

pub mod books;
pub mod clock;
pub mod fines;
pub mod loans;
pub mod readers;
pub mod staff;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub readers: readers::ReadersService,
    pub books: books::BooksService,
    pub loans: loans::LoansService,
    pub staff: staff::StaffService,
}

impl Services {
    /// Create all services with the given repository, on wall-clock time
    pub fn new(repository: Repository, loans_config: LoansConfig) -> Self {
        Self::with_clock(repository, loans_config, Arc::new(clock::SystemClock))
    }

    pub fn with_clock(
        repository: Repository,
        loans_config: LoansConfig,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        Self {
            readers: readers::ReadersService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            staff: staff::StaffService::new(repository.clone()),
            loans: loans::LoansService::new(repository, loans_config, clock),
        }
    }
}
