//! Application member management
//!
//! Every operation checks the actor's permission on the application path
//! before touching the store, then checks that the domain and application
//! exist. A denied check is reported as [`AppError::Forbidden`] and nothing
//! past it runs.

use crate::domain::{
    Acl, Actor, Application, Membership, MembershipListItem, NewMembership, Permission, Reference,
    ReferenceType, ResourcePath,
};
use crate::error::{AppError, Result};
use crate::repository::ResourceRepository;
use crate::service::cascade::cascade_target;
use crate::state::HasServices;
use tracing::warn;
use validator::Validate;

pub struct MemberService<S: HasServices> {
    state: S,
}

impl<S: HasServices> MemberService<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    /// Add or update a membership, then make sure the member holds a grant
    /// on the parent scope.
    ///
    /// The primary write is never rolled back. If the cascade fails the
    /// error is [`AppError::CascadeFailed`], carrying the committed
    /// membership.
    pub async fn add_or_update_membership(
        &self,
        organization_id: &str,
        membership: &Membership,
        actor: &Actor,
    ) -> Result<Membership> {
        let saved = self
            .state
            .membership_service()
            .add_or_update(organization_id, membership, actor)
            .await?;

        let parent = match self.parent_scope(&saved).await {
            Ok(Some(parent)) => parent,
            Ok(None) => return Ok(saved),
            Err(e) => return Err(cascade_failed(saved, e)),
        };

        match self
            .state
            .membership_cascade()
            .ensure_parent_grant(
                organization_id,
                parent.reference_type,
                &parent.reference_id,
                &saved,
                actor,
            )
            .await
        {
            Ok(_) => Ok(saved),
            Err(e) => Err(cascade_failed(saved, e)),
        }
    }

    /// Scope the membership cascades to. An application membership that
    /// does not carry its domain resolves it from the application.
    async fn parent_scope(&self, membership: &Membership) -> Result<Option<Reference>> {
        if let Some(parent) = cascade_target(membership) {
            return Ok(Some(parent));
        }
        if membership.reference_type != ReferenceType::Application {
            return Ok(None);
        }

        let application = self
            .state
            .resource_repo()
            .find_application_by_id(&membership.reference_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Application {} not found", membership.reference_id))
            })?;
        Ok(Some(Reference::new(ReferenceType::Domain, application.domain)))
    }

    /// Memberships of the application with member and role display names.
    pub async fn list_members(
        &self,
        actor: &Actor,
        path: &ResourcePath,
    ) -> Result<MembershipListItem> {
        self.ensure_permitted(actor, Permission::ApplicationMember, Acl::List, path)
            .await?;
        let application = self.find_application(path).await?;

        let memberships = self
            .state
            .membership_service()
            .find_by_reference(&application.id, ReferenceType::Application)
            .await?;
        let metadata = self
            .state
            .membership_service()
            .get_metadata(&memberships)
            .await?;

        Ok(MembershipListItem {
            memberships,
            metadata,
        })
    }

    /// Grant `input.role` on the application to the member, cascading a
    /// domain user grant when the member has no role on the domain yet.
    pub async fn add_or_update_member(
        &self,
        actor: &Actor,
        path: &ResourcePath,
        input: NewMembership,
    ) -> Result<Membership> {
        input.validate()?;
        self.ensure_permitted(actor, Permission::ApplicationMember, Acl::Create, path)
            .await?;
        let application = self.find_application(path).await?;

        let mut membership = input.to_membership(&Reference::new(
            ReferenceType::Application,
            application.id.clone(),
        ));
        membership.domain = Some(application.domain.clone());

        self.add_or_update_membership(organization_id(path)?, &membership, actor)
            .await
    }

    /// Flattened `<permission>_<acl>` strings the actor holds on the
    /// application itself.
    pub async fn member_permissions(
        &self,
        actor: &Actor,
        path: &ResourcePath,
    ) -> Result<Vec<String>> {
        self.ensure_permitted(actor, Permission::Application, Acl::Read, path)
            .await?;
        let application = self.find_application(path).await?;

        let acls = self
            .state
            .permission_service()
            .find_all_permissions(actor, ReferenceType::Application, &application.id)
            .await?;
        Ok(Permission::flatten(&acls))
    }

    /// Delete one membership of the application.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        path: &ResourcePath,
        membership_id: &str,
    ) -> Result<()> {
        self.ensure_permitted(actor, Permission::ApplicationMember, Acl::Delete, path)
            .await?;
        let application = self.find_application(path).await?;

        let membership = self.state.membership_service().get(membership_id).await?;
        if membership.reference_type != ReferenceType::Application
            || membership.reference_id != application.id
        {
            return Err(AppError::NotFound(format!(
                "Membership {} not found on application {}",
                membership_id, application.id
            )));
        }

        self.state
            .membership_service()
            .delete(&membership.id, actor)
            .await
    }

    async fn ensure_permitted(
        &self,
        actor: &Actor,
        permission: Permission,
        acl: Acl,
        path: &ResourcePath,
    ) -> Result<()> {
        let granted = self
            .state
            .permission_service()
            .has_any_permission(actor, permission, acl, path)
            .await?;
        if !granted {
            return Err(AppError::Forbidden(format!(
                "Missing {}[{}] permission",
                permission, acl
            )));
        }
        Ok(())
    }

    /// Domain, then application of the path; both must exist and the
    /// application must belong to the domain.
    async fn find_application(&self, path: &ResourcePath) -> Result<Application> {
        let domain_id = path
            .id_of(ReferenceType::Domain)
            .ok_or_else(|| AppError::BadRequest("Path has no domain".to_string()))?;
        let application_id = path
            .id_of(ReferenceType::Application)
            .ok_or_else(|| AppError::BadRequest("Path has no application".to_string()))?;

        let repo = self.state.resource_repo();
        repo.find_domain_by_id(domain_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", domain_id)))?;

        repo.find_application_by_id(application_id)
            .await?
            .filter(|app| app.domain == domain_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Application {} not found in domain {}",
                    application_id, domain_id
                ))
            })
    }
}

fn cascade_failed(saved: Membership, source: AppError) -> AppError {
    warn!(
        "Membership {} saved but cascade failed ({}): {}",
        saved.id,
        source.kind(),
        source
    );
    AppError::CascadeFailed {
        membership: Box::new(saved),
        source: Box::new(source),
    }
}

fn organization_id(path: &ResourcePath) -> Result<&str> {
    path.id_of(ReferenceType::Organization)
        .ok_or_else(|| AppError::BadRequest("Path has no organization".to_string()))
}
