//! Existence lookups for domains and applications

use crate::domain::{Application, Domain};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::{FromRow, MySqlPool};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn find_domain_by_id(&self, id: &str) -> Result<Option<Domain>>;
    async fn find_application_by_id(&self, id: &str) -> Result<Option<Application>>;
}

#[derive(Debug, FromRow)]
struct DomainRow {
    id: String,
    environment_id: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: String,
    domain: String,
    name: String,
}

pub struct ResourceRepositoryImpl {
    pool: MySqlPool,
}

impl ResourceRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceRepository for ResourceRepositoryImpl {
    async fn find_domain_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, environment_id, name FROM domains WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Domain {
            id: r.id,
            environment_id: r.environment_id,
            name: r.name,
        }))
    }

    async fn find_application_by_id(&self, id: &str) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            "SELECT id, domain, name FROM applications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Application {
            id: r.id,
            domain: r.domain,
            name: r.name,
        }))
    }
}
