//! Application state traits for dependency injection
//!
//! The member workflow is written against [`HasServices`], so the same code
//! runs over the MySQL-backed [`AppState`] and over in-memory test states.

use crate::config::Config;
use crate::repository::group::GroupRepositoryImpl;
use crate::repository::membership::MembershipRepositoryImpl;
use crate::repository::resource::ResourceRepositoryImpl;
use crate::repository::role::RoleRepositoryImpl;
use crate::repository::user::UserRepositoryImpl;
use crate::repository::{
    DbPool, GroupRepository, MembershipRepository, ResourceRepository, RoleRepository,
    UserRepository,
};
use crate::service::{
    MembershipCascade, MembershipService, PermissionService, RoleService, UserService,
};
use std::sync::Arc;

/// Trait for application state that provides access to all services.
pub trait HasServices: Clone + Send + Sync + 'static {
    /// The membership repository type
    type MembershipRepo: MembershipRepository;
    /// The role repository type
    type RoleRepo: RoleRepository;
    /// The user repository type
    type UserRepo: UserRepository;
    /// The group repository type
    type GroupRepo: GroupRepository;
    /// The domain/application lookup type
    type ResourceRepo: ResourceRepository;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the permission resolver
    fn permission_service(
        &self,
    ) -> &PermissionService<Self::MembershipRepo, Self::RoleRepo, Self::GroupRepo>;

    /// Get the membership store
    fn membership_service(
        &self,
    ) -> &MembershipService<Self::MembershipRepo, Self::RoleRepo, Self::UserRepo, Self::GroupRepo>;

    /// Get the membership cascade
    fn membership_cascade(&self) -> &MembershipCascade<Self::MembershipRepo, Self::RoleRepo>;

    /// Get the role service
    fn role_service(&self) -> &RoleService<Self::RoleRepo>;

    /// Get the user service
    fn user_service(&self) -> &UserService<Self::UserRepo, Self::GroupRepo>;

    /// Get the domain/application lookup
    fn resource_repo(&self) -> &Self::ResourceRepo;
}

/// Production state over MySQL repositories
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: DbPool,
    pub permission_service: Arc<
        PermissionService<MembershipRepositoryImpl, RoleRepositoryImpl, GroupRepositoryImpl>,
    >,
    pub membership_service: Arc<
        MembershipService<
            MembershipRepositoryImpl,
            RoleRepositoryImpl,
            UserRepositoryImpl,
            GroupRepositoryImpl,
        >,
    >,
    pub membership_cascade: Arc<MembershipCascade<MembershipRepositoryImpl, RoleRepositoryImpl>>,
    pub role_service: Arc<RoleService<RoleRepositoryImpl>>,
    pub user_service: Arc<UserService<UserRepositoryImpl, GroupRepositoryImpl>>,
    pub resource_repo: Arc<ResourceRepositoryImpl>,
}

impl AppState {
    pub fn new(config: Config, db_pool: DbPool) -> Self {
        let pool = db_pool.inner().clone();
        let membership_repo = Arc::new(MembershipRepositoryImpl::new(pool.clone()));
        let role_repo = Arc::new(RoleRepositoryImpl::new(pool.clone()));
        let user_repo = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let group_repo = Arc::new(GroupRepositoryImpl::new(pool.clone()));
        let resource_repo = Arc::new(ResourceRepositoryImpl::new(pool));

        Self {
            config: Arc::new(config),
            db_pool,
            permission_service: Arc::new(PermissionService::new(
                membership_repo.clone(),
                role_repo.clone(),
                group_repo.clone(),
            )),
            membership_service: Arc::new(MembershipService::new(
                membership_repo.clone(),
                role_repo.clone(),
                user_repo.clone(),
                group_repo.clone(),
            )),
            membership_cascade: Arc::new(MembershipCascade::new(
                membership_repo,
                role_repo.clone(),
            )),
            role_service: Arc::new(RoleService::new(role_repo)),
            user_service: Arc::new(UserService::new(user_repo, group_repo)),
            resource_repo,
        }
    }
}

impl HasServices for AppState {
    type MembershipRepo = MembershipRepositoryImpl;
    type RoleRepo = RoleRepositoryImpl;
    type UserRepo = UserRepositoryImpl;
    type GroupRepo = GroupRepositoryImpl;
    type ResourceRepo = ResourceRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn permission_service(
        &self,
    ) -> &PermissionService<MembershipRepositoryImpl, RoleRepositoryImpl, GroupRepositoryImpl> {
        &self.permission_service
    }

    fn membership_service(
        &self,
    ) -> &MembershipService<
        MembershipRepositoryImpl,
        RoleRepositoryImpl,
        UserRepositoryImpl,
        GroupRepositoryImpl,
    > {
        &self.membership_service
    }

    fn membership_cascade(&self) -> &MembershipCascade<MembershipRepositoryImpl, RoleRepositoryImpl> {
        &self.membership_cascade
    }

    fn role_service(&self) -> &RoleService<RoleRepositoryImpl> {
        &self.role_service
    }

    fn user_service(&self) -> &UserService<UserRepositoryImpl, GroupRepositoryImpl> {
        &self.user_service
    }

    fn resource_repo(&self) -> &ResourceRepositoryImpl {
        &self.resource_repo
    }
}
