//! Role resolution and default role seeding

use crate::domain::{DefaultRole, ReferenceType, Role};
use crate::error::{AppError, Result};
use crate::repository::RoleRepository;
use std::sync::Arc;
use tracing::info;

pub struct RoleService<R: RoleRepository> {
    repo: Arc<R>,
}

impl<R: RoleRepository> RoleService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        self.repo.find_by_id(id).await
    }

    pub async fn get_role(&self, id: &str) -> Result<Role> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    /// Seeded default role of an organization. `None` means the organization
    /// was never seeded.
    pub async fn find_default_role(
        &self,
        organization_id: &str,
        role: DefaultRole,
        reference_type: ReferenceType,
    ) -> Result<Option<Role>> {
        self.repo
            .find_default_role(organization_id, role.name(), reference_type)
            .await
    }

    /// Create the default roles an organization is missing. Returns the
    /// roles created by this call.
    pub async fn seed_default_roles(&self, organization_id: &str) -> Result<Vec<Role>> {
        let mut created = Vec::new();
        for default_role in DefaultRole::ALL {
            let existing = self
                .find_default_role(organization_id, default_role, default_role.reference_type())
                .await?;
            if existing.is_some() {
                continue;
            }
            let role = self.repo.create(&default_role.to_role(organization_id)).await?;
            info!(
                "Seeded default role {} ({}) for organization {}",
                role.name, role.id, organization_id
            );
            created.push(role);
        }
        Ok(created)
    }
}
