//! Business logic services

pub mod catalog;
pub mod loans;
pub mod stats;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            users: users::UsersService::new(
                repository.clone(),
                config.auth.clone(),
                config.pagination.clone(),
            ),
            catalog: catalog::CatalogService::new(repository.clone(), config.pagination.clone()),
            loans: loans::LoansService::new(repository.clone(), config.pagination.clone()),
            stats: stats::StatsService::new(repository),
        }
    }
}
