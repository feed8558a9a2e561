//! Parent-scope grant cascade
//!
//! When a member is granted a role on a child scope, the member must also
//! hold some role on the immediate parent scope. The cascade only fills an
//! absence: an existing parent grant, explicit or derived, is never touched.
//!
//! The lookup and the write are not atomic. Two concurrent cascades for the
//! same member and parent can both see no grant; the store's uniqueness on
//! the membership tuple turns the second write into an update of the first.

use crate::domain::{Actor, DefaultRole, Membership, MembershipCriteria, Reference, ReferenceType};
use crate::error::{AppError, Result};
use crate::repository::{MembershipRepository, RoleRepository};
use crate::telemetry::metrics;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of [`MembershipCascade::ensure_parent_grant`].
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOutcome {
    /// The member already held a grant on the parent scope.
    Existing,
    /// A default-role membership was created on the parent scope.
    Granted(Membership),
}

/// Parent scope a new membership cascades to, if any.
///
/// Application memberships carrying their domain cascade to it. Callers
/// resolve the domain of an application membership that lacks one.
pub fn cascade_target(membership: &Membership) -> Option<Reference> {
    match membership.reference_type {
        ReferenceType::Application => membership
            .domain
            .as_ref()
            .map(|domain| Reference::new(ReferenceType::Domain, domain.clone())),
        _ => None,
    }
}

pub struct MembershipCascade<M: MembershipRepository, R: RoleRepository> {
    membership_repo: Arc<M>,
    role_repo: Arc<R>,
}

impl<M: MembershipRepository, R: RoleRepository> MembershipCascade<M, R> {
    pub fn new(membership_repo: Arc<M>, role_repo: Arc<R>) -> Self {
        Self {
            membership_repo,
            role_repo,
        }
    }

    /// Make sure the member of `membership` holds a grant on the parent scope,
    /// granting the parent type's default user role when it holds none.
    pub async fn ensure_parent_grant(
        &self,
        organization_id: &str,
        parent_type: ReferenceType,
        parent_id: &str,
        membership: &Membership,
        actor: &Actor,
    ) -> Result<CascadeOutcome> {
        let result = self
            .grant_if_absent(organization_id, parent_type, parent_id, membership, actor)
            .await;

        let outcome = match &result {
            Ok(CascadeOutcome::Existing) => "existing",
            Ok(CascadeOutcome::Granted(_)) => "granted",
            Err(_) => "error",
        };
        metrics::record_cascade(outcome);
        result
    }

    async fn grant_if_absent(
        &self,
        organization_id: &str,
        parent_type: ReferenceType,
        parent_id: &str,
        membership: &Membership,
        actor: &Actor,
    ) -> Result<CascadeOutcome> {
        let criteria = MembershipCriteria::for_member(&membership.member_id, membership.member_type);
        let existing = self
            .membership_repo
            .find_by_criteria(parent_type, parent_id, &criteria)
            .await?;
        if !existing.is_empty() {
            debug!(
                "{} {} already has {} grant(s) on {} {}",
                membership.member_type,
                membership.member_id,
                existing.len(),
                parent_type,
                parent_id
            );
            return Ok(CascadeOutcome::Existing);
        }

        let default_role = DefaultRole::user_role_for(parent_type).ok_or_else(|| {
            error!("No default user role is defined for {}", parent_type);
            AppError::InvalidState(format!("No default user role for {}", parent_type))
        })?;

        let role = self
            .role_repo
            .find_default_role(organization_id, default_role.name(), parent_type)
            .await?
            .ok_or_else(|| {
                error!(
                    "Default role {} missing for organization {}",
                    default_role.name(),
                    organization_id
                );
                AppError::InvalidState(format!(
                    "Default role {} for {} is not seeded in organization {}",
                    default_role.name(),
                    parent_type,
                    organization_id
                ))
            })?;

        let parent_membership = Membership::new(
            membership.member_id.clone(),
            membership.member_type,
            parent_id,
            parent_type,
            role.id.clone(),
        );
        let saved = self.membership_repo.add_or_update(&parent_membership).await?;
        metrics::record_membership_write("cascade");
        info!(
            "Cascaded {} on {} {} to {} {} for {}",
            role.name, parent_type, parent_id, membership.member_type, membership.member_id, actor.id
        );
        Ok(CascadeOutcome::Granted(saved))
    }
}
