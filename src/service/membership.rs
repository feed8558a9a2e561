//! Membership store operations

use crate::domain::{
    Actor, MemberType, Membership, MembershipCriteria, MembershipMetadata, MetadataEntry,
    ReferenceType,
};
use crate::error::{AppError, Result};
use crate::repository::{GroupRepository, MembershipRepository, RoleRepository, UserRepository};
use crate::telemetry::metrics;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

pub struct MembershipService<M, R, U, G>
where
    M: MembershipRepository,
    R: RoleRepository,
    U: UserRepository,
    G: GroupRepository,
{
    repo: Arc<M>,
    role_repo: Arc<R>,
    user_repo: Arc<U>,
    group_repo: Arc<G>,
}

impl<M, R, U, G> MembershipService<M, R, U, G>
where
    M: MembershipRepository,
    R: RoleRepository,
    U: UserRepository,
    G: GroupRepository,
{
    pub fn new(repo: Arc<M>, role_repo: Arc<R>, user_repo: Arc<U>, group_repo: Arc<G>) -> Self {
        Self {
            repo,
            role_repo,
            user_repo,
            group_repo,
        }
    }

    /// Create the membership, or replace the role of the member's existing
    /// membership on the same reference.
    ///
    /// The role must belong to the organization and be assignable on the
    /// membership's reference type.
    pub async fn add_or_update(
        &self,
        organization_id: &str,
        membership: &Membership,
        actor: &Actor,
    ) -> Result<Membership> {
        let role = self
            .role_repo
            .find_by_id(&membership.role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", membership.role_id)))?;

        if role.organization_id != organization_id {
            return Err(AppError::NotFound(format!(
                "Role {} not found in organization {}",
                role.id, organization_id
            )));
        }
        if role.reference_type != membership.reference_type {
            return Err(AppError::BadRequest(format!(
                "Role {} applies to {} and cannot be assigned on {}",
                role.name, role.reference_type, membership.reference_type
            )));
        }

        let saved = self.repo.add_or_update(membership).await?;
        metrics::record_membership_write("add_or_update");
        info!(
            "Membership {} of {} {} on {} set to role {} by {}",
            saved.id,
            saved.member_type,
            saved.member_id,
            saved.reference(),
            role.name,
            actor.id
        );
        Ok(saved)
    }

    pub async fn get(&self, id: &str) -> Result<Membership> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Membership {} not found", id)))
    }

    pub async fn find_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
    ) -> Result<Vec<Membership>> {
        self.repo
            .find_by_reference(reference_id, reference_type)
            .await
    }

    pub async fn find_by_criteria(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        criteria: &MembershipCriteria,
    ) -> Result<Vec<Membership>> {
        self.repo
            .find_by_criteria(reference_type, reference_id, criteria)
            .await
    }

    /// Display names of the members and roles of `memberships`.
    pub async fn get_metadata(&self, memberships: &[Membership]) -> Result<MembershipMetadata> {
        let ids_of = |member_type: MemberType| -> Vec<String> {
            memberships
                .iter()
                .filter(|m| m.member_type == member_type)
                .map(|m| m.member_id.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let user_ids = ids_of(MemberType::User);
        let group_ids = ids_of(MemberType::Group);
        let role_ids: Vec<String> = memberships
            .iter()
            .map(|m| m.role_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut metadata = MembershipMetadata::default();
        for user in self.user_repo.find_by_ids(&user_ids).await? {
            let entry = MetadataEntry {
                id: user.id.clone(),
                name: user.display().to_string(),
            };
            metadata.users.insert(user.id, entry);
        }
        for group in self.group_repo.find_by_ids(&group_ids).await? {
            let entry = MetadataEntry {
                id: group.id.clone(),
                name: group.name,
            };
            metadata.groups.insert(group.id, entry);
        }
        for role in self.role_repo.find_by_ids(&role_ids).await? {
            let entry = MetadataEntry {
                id: role.id.clone(),
                name: role.name,
            };
            metadata.roles.insert(role.id, entry);
        }
        Ok(metadata)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<()> {
        self.repo.delete(id).await?;
        metrics::record_membership_write("delete");
        info!("Membership {} deleted by {}", id, actor.id);
        Ok(())
    }

    /// Remove every membership on a resource that is being deleted.
    pub async fn delete_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<u64> {
        let removed = self
            .repo
            .delete_by_reference(reference_type, reference_id)
            .await?;
        if removed > 0 {
            metrics::record_membership_write("delete_by_reference");
            info!(
                "Removed {} memberships of deleted {} {}",
                removed, reference_type, reference_id
            );
        }
        Ok(removed)
    }
}
