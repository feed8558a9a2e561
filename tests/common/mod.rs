//! Common test utilities
//!
//! In-memory repositories and a [`TestState`] implementing `HasServices`, so
//! the permission, cascade and member workflows run without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tenantry_core::config::{Config, DatabaseConfig, MembershipConfig, TelemetryConfig};
use tenantry_core::domain::{
    Application, DefaultRole, Domain, Group, MemberType, Membership, MembershipCriteria,
    PermissionAcls, Reference, ReferenceType, Role, User,
};
use tenantry_core::error::{AppError, Result};
use tenantry_core::repository::{
    GroupRepository, MembershipRepository, ResourceRepository, RoleRepository, UserRepository,
};
use tenantry_core::service::{
    MembershipCascade, MembershipService, PermissionService, RoleService, UserService,
};
use tenantry_core::state::HasServices;
use tokio::sync::RwLock;

/// Ensure .env file is loaded once
static ENV_INIT: Once = Once::new();

fn init_env() {
    ENV_INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// Connect to the database named by DATABASE_URL, or `None` when tests
/// should skip because no database is reachable.
pub async fn get_test_pool() -> Option<MySqlPool> {
    init_env();

    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    match MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            eprintln!("Database not reachable ({}), skipping database test", e);
            None
        }
    }
}

pub fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: "mysql://localhost/tenantry_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        telemetry: TelemetryConfig::default(),
        membership: MembershipConfig {
            default_organization_id: ORG.to_string(),
        },
    }
}

pub const ORG: &str = "org-1";
pub const ENV: &str = "env-1";
pub const DOMAIN: &str = "dom-1";
pub const APP: &str = "app-1";

// ============================================================================
// Test Repository Implementations
// ============================================================================

/// In-memory membership store; one row per member tuple.
#[derive(Default)]
pub struct TestMembershipRepository {
    memberships: RwLock<Vec<Membership>>,
}

impl TestMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Membership> {
        self.memberships.read().await.clone()
    }

    /// Rows held by a member on one scope.
    pub async fn rows_for(
        &self,
        member_id: &str,
        member_type: MemberType,
        reference: &Reference,
    ) -> Vec<Membership> {
        self.memberships
            .read()
            .await
            .iter()
            .filter(|m| {
                m.member_id == member_id
                    && m.member_type == member_type
                    && m.reference_type == reference.reference_type
                    && m.reference_id == reference.reference_id
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MembershipRepository for TestMembershipRepository {
    async fn add_or_update(&self, membership: &Membership) -> Result<Membership> {
        // Check and write under one lock, like the unique key of the table.
        let mut memberships = self.memberships.write().await;
        if let Some(existing) = memberships.iter_mut().find(|m| m.same_tuple(membership)) {
            existing.role_id = membership.role_id.clone();
            if membership.domain.is_some() {
                existing.domain = membership.domain.clone();
            }
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        memberships.push(membership.clone());
        Ok(membership.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Membership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships.iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
    ) -> Result<Vec<Membership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|m| m.reference_id == reference_id && m.reference_type == reference_type)
            .cloned()
            .collect())
    }

    async fn find_by_criteria(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        criteria: &MembershipCriteria,
    ) -> Result<Vec<Membership>> {
        let found: Vec<Membership> = {
            let memberships = self.memberships.read().await;
            memberships
                .iter()
                .filter(|m| {
                    m.reference_type == reference_type
                        && m.reference_id == reference_id
                        && criteria.matches(m)
                })
                .cloned()
                .collect()
        };
        // Let concurrent callers interleave between lookup and write.
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut memberships = self.memberships.write().await;
        let pos = memberships
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Membership {} not found", id)))?;
        memberships.remove(pos);
        Ok(())
    }

    async fn delete_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<u64> {
        let mut memberships = self.memberships.write().await;
        let before = memberships.len();
        memberships
            .retain(|m| !(m.reference_type == reference_type && m.reference_id == reference_id));
        Ok((before - memberships.len()) as u64)
    }
}

#[derive(Default)]
pub struct TestRoleRepository {
    roles: RwLock<Vec<Role>>,
}

impl TestRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_role(&self, role: Role) {
        self.roles.write().await.push(role);
    }
}

#[async_trait]
impl RoleRepository for TestRoleRepository {
    async fn create(&self, role: &Role) -> Result<Role> {
        self.roles.write().await.push(role.clone());
        Ok(role.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.iter().filter(|r| ids.contains(&r.id)).cloned().collect())
    }

    async fn find_default_role(
        &self,
        organization_id: &str,
        name: &str,
        reference_type: ReferenceType,
    ) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles
            .iter()
            .find(|r| {
                r.default_role
                    && r.organization_id == organization_id
                    && r.name == name
                    && r.reference_type == reference_type
            })
            .cloned())
    }
}

#[derive(Default)]
pub struct TestUserRepository {
    users: RwLock<Vec<User>>,
}

impl TestUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.push(user);
    }

    /// Stored direct roles of a user; empty when the user is unknown.
    pub async fn all_roles(&self, id: &str) -> Vec<String> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.roles.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn update_roles(&self, id: &str, roles: &[String]) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.roles = roles.to_vec();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[derive(Default)]
pub struct TestGroupRepository {
    groups: RwLock<Vec<Group>>,
}

impl TestGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_group(&self, group: Group) {
        self.groups.write().await.push(group);
    }
}

#[async_trait]
impl GroupRepository for TestGroupRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>> {
        let groups = self.groups.read().await;
        Ok(groups.iter().find(|g| g.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(groups.iter().filter(|g| ids.contains(&g.id)).cloned().collect())
    }

    async fn find_by_member(&self, user_id: &str) -> Result<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(groups
            .iter()
            .filter(|g| g.members.iter().any(|m| m == user_id))
            .cloned()
            .collect())
    }

    async fn update_roles(&self, id: &str, roles: &[String]) -> Result<Group> {
        let mut groups = self.groups.write().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))?;
        group.roles = roles.to_vec();
        group.updated_at = Utc::now();
        Ok(group.clone())
    }
}

#[derive(Default)]
pub struct TestResourceRepository {
    domains: RwLock<Vec<Domain>>,
    applications: RwLock<Vec<Application>>,
}

impl TestResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_domain(&self, id: &str, environment_id: &str) {
        self.domains.write().await.push(Domain {
            id: id.to_string(),
            environment_id: environment_id.to_string(),
            name: format!("Domain {}", id),
        });
    }

    pub async fn add_application(&self, id: &str, domain: &str) {
        self.applications.write().await.push(Application {
            id: id.to_string(),
            domain: domain.to_string(),
            name: format!("Application {}", id),
        });
    }
}

#[async_trait]
impl ResourceRepository for TestResourceRepository {
    async fn find_domain_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let domains = self.domains.read().await;
        Ok(domains.iter().find(|d| d.id == id).cloned())
    }

    async fn find_application_by_id(&self, id: &str) -> Result<Option<Application>> {
        let applications = self.applications.read().await;
        Ok(applications.iter().find(|a| a.id == id).cloned())
    }
}

// ============================================================================
// Test State
// ============================================================================

/// State over in-memory repositories; the repositories stay reachable for
/// seeding and assertions.
#[derive(Clone)]
pub struct TestState {
    pub config: Arc<Config>,
    pub memberships: Arc<TestMembershipRepository>,
    pub roles: Arc<TestRoleRepository>,
    pub users: Arc<TestUserRepository>,
    pub groups: Arc<TestGroupRepository>,
    pub resources: Arc<TestResourceRepository>,
    permission_service: Arc<
        PermissionService<TestMembershipRepository, TestRoleRepository, TestGroupRepository>,
    >,
    membership_service: Arc<
        MembershipService<
            TestMembershipRepository,
            TestRoleRepository,
            TestUserRepository,
            TestGroupRepository,
        >,
    >,
    membership_cascade: Arc<MembershipCascade<TestMembershipRepository, TestRoleRepository>>,
    role_service: Arc<RoleService<TestRoleRepository>>,
    user_service: Arc<UserService<TestUserRepository, TestGroupRepository>>,
}

impl TestState {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let memberships = Arc::new(TestMembershipRepository::new());
        let roles = Arc::new(TestRoleRepository::new());
        let users = Arc::new(TestUserRepository::new());
        let groups = Arc::new(TestGroupRepository::new());
        let resources = Arc::new(TestResourceRepository::new());

        Self {
            config: Arc::new(config),
            permission_service: Arc::new(PermissionService::new(
                memberships.clone(),
                roles.clone(),
                groups.clone(),
            )),
            membership_service: Arc::new(MembershipService::new(
                memberships.clone(),
                roles.clone(),
                users.clone(),
                groups.clone(),
            )),
            membership_cascade: Arc::new(MembershipCascade::new(
                memberships.clone(),
                roles.clone(),
            )),
            role_service: Arc::new(RoleService::new(roles.clone())),
            user_service: Arc::new(UserService::new(users.clone(), groups.clone())),
            memberships,
            roles,
            users,
            groups,
            resources,
        }
    }

    /// Seed the organization's default roles, keyed by role name.
    pub async fn seed_default_roles(&self) -> HashMap<String, Role> {
        self.role_service
            .seed_default_roles(ORG)
            .await
            .expect("Failed to seed default roles")
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect()
    }

    /// Seed roles plus domain `DOMAIN` and application `APP` under it.
    pub async fn with_application(self) -> (Self, HashMap<String, Role>) {
        let roles = self.seed_default_roles().await;
        self.resources.add_domain(DOMAIN, ENV).await;
        self.resources.add_application(APP, DOMAIN).await;
        (self, roles)
    }

    /// Store a custom, non-default role.
    pub async fn add_role(
        &self,
        id: &str,
        reference_type: ReferenceType,
        permission_acls: PermissionAcls,
    ) -> Role {
        let role = Role {
            id: id.to_string(),
            organization_id: ORG.to_string(),
            name: id.to_uppercase(),
            reference_type,
            permission_acls,
            ..Default::default()
        };
        self.roles.add_role(role.clone()).await;
        role
    }

    /// Write a membership straight into the store.
    pub async fn grant(
        &self,
        member_id: &str,
        member_type: MemberType,
        reference: &Reference,
        role_id: &str,
    ) -> Membership {
        self.memberships
            .add_or_update(&Membership::new(
                member_id,
                member_type,
                reference.reference_id.clone(),
                reference.reference_type,
                role_id,
            ))
            .await
            .expect("Failed to write membership")
    }

    pub async fn add_user(&self, id: &str, roles: &[&str]) -> User {
        let user = User {
            id: id.to_string(),
            username: format!("{}-login", id),
            display_name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            updated_at: Utc::now(),
        };
        self.users.add_user(user.clone()).await;
        user
    }

    pub async fn add_group(&self, id: &str, members: &[&str], roles: &[&str]) -> Group {
        let group = Group {
            id: id.to_string(),
            name: format!("Group {}", id),
            members: members.iter().map(|m| m.to_string()).collect(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            updated_at: Utc::now(),
        };
        self.groups.add_group(group.clone()).await;
        group
    }
}

impl Default for TestState {
    fn default() -> Self {
        Self::new()
    }
}

impl HasServices for TestState {
    type MembershipRepo = TestMembershipRepository;
    type RoleRepo = TestRoleRepository;
    type UserRepo = TestUserRepository;
    type GroupRepo = TestGroupRepository;
    type ResourceRepo = TestResourceRepository;

    fn config(&self) -> &Config {
        &self.config
    }

    fn permission_service(
        &self,
    ) -> &PermissionService<TestMembershipRepository, TestRoleRepository, TestGroupRepository> {
        &self.permission_service
    }

    fn membership_service(
        &self,
    ) -> &MembershipService<
        TestMembershipRepository,
        TestRoleRepository,
        TestUserRepository,
        TestGroupRepository,
    > {
        &self.membership_service
    }

    fn membership_cascade(&self) -> &MembershipCascade<TestMembershipRepository, TestRoleRepository> {
        &self.membership_cascade
    }

    fn role_service(&self) -> &RoleService<TestRoleRepository> {
        &self.role_service
    }

    fn user_service(&self) -> &UserService<TestUserRepository, TestGroupRepository> {
        &self.user_service
    }

    fn resource_repo(&self) -> &TestResourceRepository {
        &self.resources
    }
}

/// Role id of a seeded default role.
pub fn role_id(roles: &HashMap<String, Role>, role: DefaultRole) -> String {
    roles[role.name()].id.clone()
}
