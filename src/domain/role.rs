//! Roles, permissions and ACL actions

use super::reference::ReferenceType;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Acl {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Acl {
    pub const ALL: [Acl; 5] = [Acl::Create, Acl::Read, Acl::Update, Acl::Delete, Acl::List];

    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Create => "CREATE",
            Acl::Read => "READ",
            Acl::Update => "UPDATE",
            Acl::Delete => "DELETE",
            Acl::List => "LIST",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Acl::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown acl '{}'", s)))
    }
}

/// Protected resource kinds of the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Organization,
    OrganizationSettings,
    OrganizationMember,
    OrganizationRole,
    OrganizationGroup,
    Environment,
    Domain,
    DomainSettings,
    DomainMember,
    Application,
    ApplicationSettings,
    ApplicationMember,
}

impl Permission {
    pub const ALL: [Permission; 12] = [
        Permission::Organization,
        Permission::OrganizationSettings,
        Permission::OrganizationMember,
        Permission::OrganizationRole,
        Permission::OrganizationGroup,
        Permission::Environment,
        Permission::Domain,
        Permission::DomainSettings,
        Permission::DomainMember,
        Permission::Application,
        Permission::ApplicationSettings,
        Permission::ApplicationMember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Organization => "ORGANIZATION",
            Permission::OrganizationSettings => "ORGANIZATION_SETTINGS",
            Permission::OrganizationMember => "ORGANIZATION_MEMBER",
            Permission::OrganizationRole => "ORGANIZATION_ROLE",
            Permission::OrganizationGroup => "ORGANIZATION_GROUP",
            Permission::Environment => "ENVIRONMENT",
            Permission::Domain => "DOMAIN",
            Permission::DomainSettings => "DOMAIN_SETTINGS",
            Permission::DomainMember => "DOMAIN_MEMBER",
            Permission::Application => "APPLICATION",
            Permission::ApplicationSettings => "APPLICATION_SETTINGS",
            Permission::ApplicationMember => "APPLICATION_MEMBER",
        }
    }

    /// Flatten a permission bundle into `"<permission>_<acl>"` strings,
    /// e.g. `application_member_read`, in permission then acl order.
    pub fn flatten(acls: &PermissionAcls) -> Vec<String> {
        acls.iter()
            .flat_map(|(permission, actions)| {
                actions.iter().map(move |acl| {
                    format!("{}_{}", permission.as_str(), acl.as_str()).to_lowercase()
                })
            })
            .collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown permission '{}'", s)))
    }
}

/// Permission bundle: each permission with its allowed actions.
pub type PermissionAcls = BTreeMap<Permission, BTreeSet<Acl>>;

/// Union `other` into `target`.
pub fn merge_permission_acls(target: &mut PermissionAcls, other: &PermissionAcls) {
    for (permission, acls) in other {
        target
            .entry(*permission)
            .or_default()
            .extend(acls.iter().copied());
    }
}

/// Role entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    /// Organization owning the role
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Resource type the role can be assigned on
    pub reference_type: ReferenceType,
    /// Built-in role, not editable by administrators
    pub system: bool,
    /// Seeded default role of the organization (e.g. DOMAIN_USER)
    pub default_role: bool,
    pub permission_acls: PermissionAcls,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Role {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: String::new(),
            name: String::new(),
            description: None,
            reference_type: ReferenceType::Organization,
            system: false,
            default_role: false,
            permission_acls: PermissionAcls::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Role {
    pub fn has_permission(&self, permission: Permission, acl: Acl) -> bool {
        self.permission_acls
            .get(&permission)
            .is_some_and(|acls| acls.contains(&acl))
    }
}

/// Roles seeded for every organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefaultRole {
    OrganizationOwner,
    OrganizationUser,
    DomainOwner,
    DomainUser,
    ApplicationOwner,
}

impl DefaultRole {
    pub const ALL: [DefaultRole; 5] = [
        DefaultRole::OrganizationOwner,
        DefaultRole::OrganizationUser,
        DefaultRole::DomainOwner,
        DefaultRole::DomainUser,
        DefaultRole::ApplicationOwner,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DefaultRole::OrganizationOwner => "ORGANIZATION_OWNER",
            DefaultRole::OrganizationUser => "ORGANIZATION_USER",
            DefaultRole::DomainOwner => "DOMAIN_OWNER",
            DefaultRole::DomainUser => "DOMAIN_USER",
            DefaultRole::ApplicationOwner => "APPLICATION_OWNER",
        }
    }

    pub fn reference_type(&self) -> ReferenceType {
        match self {
            DefaultRole::OrganizationOwner | DefaultRole::OrganizationUser => {
                ReferenceType::Organization
            }
            DefaultRole::DomainOwner | DefaultRole::DomainUser => ReferenceType::Domain,
            DefaultRole::ApplicationOwner => ReferenceType::Application,
        }
    }

    /// Minimal standing role for a scope, granted by the membership cascade.
    pub fn user_role_for(reference_type: ReferenceType) -> Option<DefaultRole> {
        match reference_type {
            ReferenceType::Organization => Some(DefaultRole::OrganizationUser),
            ReferenceType::Domain => Some(DefaultRole::DomainUser),
            ReferenceType::Environment | ReferenceType::Application => None,
        }
    }

    /// Permission bundle seeded for this role.
    pub fn permission_acls(&self) -> PermissionAcls {
        let all: BTreeSet<Acl> = Acl::ALL.into_iter().collect();
        let only = |acls: &[Acl]| acls.iter().copied().collect::<BTreeSet<Acl>>();

        match self {
            DefaultRole::OrganizationOwner => Permission::ALL
                .into_iter()
                .map(|p| (p, all.clone()))
                .collect(),
            DefaultRole::OrganizationUser => PermissionAcls::from([
                (Permission::Organization, only(&[Acl::Read])),
                (Permission::Environment, only(&[Acl::Read, Acl::List])),
            ]),
            DefaultRole::DomainOwner => [
                Permission::Domain,
                Permission::DomainSettings,
                Permission::DomainMember,
                Permission::Application,
                Permission::ApplicationSettings,
                Permission::ApplicationMember,
            ]
            .into_iter()
            .map(|p| (p, all.clone()))
            .collect(),
            DefaultRole::DomainUser => {
                PermissionAcls::from([(Permission::Domain, only(&[Acl::Read]))])
            }
            DefaultRole::ApplicationOwner => PermissionAcls::from([
                (
                    Permission::Application,
                    only(&[Acl::Read, Acl::Update, Acl::Delete]),
                ),
                (
                    Permission::ApplicationSettings,
                    only(&[Acl::Read, Acl::Update]),
                ),
                (Permission::ApplicationMember, all.clone()),
            ]),
        }
    }

    /// Build the seeded role for an organization.
    pub fn to_role(&self, organization_id: &str) -> Role {
        Role {
            organization_id: organization_id.to_string(),
            name: self.name().to_string(),
            reference_type: self.reference_type(),
            system: true,
            default_role: true,
            permission_acls: self.permission_acls(),
            ..Default::default()
        }
    }
}

impl fmt::Display for DefaultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
