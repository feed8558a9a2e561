//! Membership domain models

use super::reference::{Reference, ReferenceType};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Kind of grantee of a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberType {
    User,
    Group,
}

impl MemberType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberType::User => "USER",
            MemberType::Group => "GROUP",
        }
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(MemberType::User),
            "GROUP" => Ok(MemberType::Group),
            _ => Err(AppError::BadRequest(format!("Unknown member type '{}'", s))),
        }
    }
}

/// Grant of one role to one member on one resource.
///
/// At most one membership exists per (member_id, member_type, reference_id,
/// reference_type); writes to an existing tuple replace `role_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub member_id: String,
    pub member_type: MemberType,
    pub reference_id: String,
    pub reference_type: ReferenceType,
    pub role_id: String,
    /// Owning domain, set on application memberships
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(
        member_id: impl Into<String>,
        member_type: MemberType,
        reference_id: impl Into<String>,
        reference_type: ReferenceType,
        role_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            member_id: member_id.into(),
            member_type,
            reference_id: reference_id.into(),
            reference_type,
            role_id: role_id.into(),
            domain: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reference(&self) -> Reference {
        Reference::new(self.reference_type, self.reference_id.clone())
    }

    /// Whether both memberships target the same member on the same scope.
    pub fn same_tuple(&self, other: &Membership) -> bool {
        self.member_id == other.member_id
            && self.member_type == other.member_type
            && self.reference_id == other.reference_id
            && self.reference_type == other.reference_type
    }
}

/// Input for adding or updating a member on a resource
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMembership {
    #[validate(length(min = 1, max = 64))]
    pub member_id: String,
    pub member_type: MemberType,
    #[validate(length(min = 1, max = 64))]
    pub role: String,
}

impl NewMembership {
    /// Membership on `reference` for this member.
    pub fn to_membership(&self, reference: &Reference) -> Membership {
        Membership::new(
            self.member_id.clone(),
            self.member_type,
            reference.reference_id.clone(),
            reference.reference_type,
            self.role.clone(),
        )
    }
}

/// Query for any grant held by a member, without a specific role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipCriteria {
    pub user_id: Option<String>,
    pub group_ids: Option<Vec<String>>,
}

impl MembershipCriteria {
    /// Criteria matching exactly the given member.
    pub fn for_member(member_id: &str, member_type: MemberType) -> Self {
        match member_type {
            MemberType::User => Self {
                user_id: Some(member_id.to_string()),
                group_ids: None,
            },
            MemberType::Group => Self {
                user_id: None,
                group_ids: Some(vec![member_id.to_string()]),
            },
        }
    }

    /// Criteria matching a user directly or through any of its groups.
    pub fn for_user_with_groups(user_id: &str, group_ids: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            group_ids: if group_ids.is_empty() {
                None
            } else {
                Some(group_ids)
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.group_ids.as_ref().map_or(true, |g| g.is_empty())
    }

    pub fn matches(&self, membership: &Membership) -> bool {
        match membership.member_type {
            MemberType::User => self.user_id.as_deref() == Some(membership.member_id.as_str()),
            MemberType::Group => self
                .group_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| *id == membership.member_id)),
        }
    }
}

/// Display name of a member or role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub id: String,
    pub name: String,
}

/// Display metadata for a set of memberships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipMetadata {
    pub users: BTreeMap<String, MetadataEntry>,
    pub groups: BTreeMap<String, MetadataEntry>,
    pub roles: BTreeMap<String, MetadataEntry>,
}

/// Memberships of a resource with their display metadata
#[derive(Debug, Clone, Serialize)]
pub struct MembershipListItem {
    pub memberships: Vec<Membership>,
    pub metadata: MembershipMetadata,
}
