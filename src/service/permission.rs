//! Hierarchical permission resolution
//!
//! A permission check walks the resource path from the most specific scope
//! (e.g. an application) to the least specific one (the organization) and
//! succeeds as soon as one scope grants the permission. Grants come from the
//! actor's own memberships and from the memberships of the groups the actor
//! belongs to; group expansion is one level deep.

use crate::domain::{
    merge_permission_acls, Acl, Actor, MembershipCriteria, Permission, PermissionAcls, Reference,
    ReferenceType, ResourcePath,
};
use crate::error::Result;
use crate::repository::{GroupRepository, MembershipRepository, RoleRepository};
use crate::telemetry::metrics;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub struct PermissionService<M, R, G>
where
    M: MembershipRepository,
    R: RoleRepository,
    G: GroupRepository,
{
    membership_repo: Arc<M>,
    role_repo: Arc<R>,
    group_repo: Arc<G>,
}

impl<M, R, G> PermissionService<M, R, G>
where
    M: MembershipRepository,
    R: RoleRepository,
    G: GroupRepository,
{
    pub fn new(membership_repo: Arc<M>, role_repo: Arc<R>, group_repo: Arc<G>) -> Self {
        Self {
            membership_repo,
            role_repo,
            group_repo,
        }
    }

    /// Whether any scope of `path` grants `permission` with `acl` to the actor.
    ///
    /// Denial is `Ok(false)`; mapping it to a rejection is the caller's job.
    pub async fn has_any_permission(
        &self,
        actor: &Actor,
        permission: Permission,
        acl: Acl,
        path: &ResourcePath,
    ) -> Result<bool> {
        let started = Instant::now();
        let result = self.resolve_any(actor, permission, acl, path).await;

        let outcome = match &result {
            Ok(true) => "granted",
            Ok(false) => "denied",
            Err(_) => "error",
        };
        metrics::record_permission_check(outcome, started.elapsed());
        result
    }

    /// Same as [`has_any_permission`](Self::has_any_permission) with the path
    /// given as organization/environment/domain/application identifiers.
    #[allow(clippy::too_many_arguments)]
    pub async fn check_any_permission(
        &self,
        actor: &Actor,
        organization_id: &str,
        environment_id: Option<&str>,
        domain_id: Option<&str>,
        application_id: Option<&str>,
        permission: Permission,
        acl: Acl,
    ) -> Result<bool> {
        let path =
            ResourcePath::from_parts(organization_id, environment_id, domain_id, application_id)?;
        self.has_any_permission(actor, permission, acl, &path).await
    }

    /// Union of every permission bundle the actor holds on exactly this
    /// scope. Ancestors are not consulted.
    pub async fn find_all_permissions(
        &self,
        actor: &Actor,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<PermissionAcls> {
        let criteria = self.actor_criteria(actor).await?;
        self.permissions_at(&criteria, &Reference::new(reference_type, reference_id))
            .await
    }

    async fn resolve_any(
        &self,
        actor: &Actor,
        permission: Permission,
        acl: Acl,
        path: &ResourcePath,
    ) -> Result<bool> {
        if path.is_empty() {
            return Ok(false);
        }

        let criteria = self.actor_criteria(actor).await?;
        for scope in path.scopes() {
            let acls = self.permissions_at(&criteria, scope).await?;
            if acls.get(&permission).is_some_and(|a| a.contains(&acl)) {
                debug!(
                    "Actor {} granted {}[{}] by scope {}",
                    actor.id, permission, acl, scope
                );
                return Ok(true);
            }
        }

        debug!(
            "Actor {} has no {}[{}] on any of {} scopes",
            actor.id,
            permission,
            acl,
            path.len()
        );
        Ok(false)
    }

    async fn actor_criteria(&self, actor: &Actor) -> Result<MembershipCriteria> {
        let group_ids = self
            .group_repo
            .find_by_member(&actor.id)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        Ok(MembershipCriteria::for_user_with_groups(&actor.id, group_ids))
    }

    async fn permissions_at(
        &self,
        criteria: &MembershipCriteria,
        scope: &Reference,
    ) -> Result<PermissionAcls> {
        let memberships = self
            .membership_repo
            .find_by_criteria(scope.reference_type, &scope.reference_id, criteria)
            .await?;
        if memberships.is_empty() {
            return Ok(PermissionAcls::new());
        }

        let role_ids: Vec<String> = memberships
            .into_iter()
            .map(|m| m.role_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut acls = PermissionAcls::new();
        for role in self.role_repo.find_by_ids(&role_ids).await? {
            merge_permission_acls(&mut acls, &role.permission_acls);
        }
        Ok(acls)
    }
}
