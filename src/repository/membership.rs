//! Membership repository

use crate::domain::{MemberType, Membership, MembershipCriteria, ReferenceType};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Create the membership, or replace the role of the existing membership
    /// with the same (member, reference) tuple. Must be atomic per tuple.
    async fn add_or_update(&self, membership: &Membership) -> Result<Membership>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Membership>>;
    async fn find_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
    ) -> Result<Vec<Membership>>;
    /// Memberships on exactly this scope held by any member the criteria
    /// matches. Empty when there is none.
    async fn find_by_criteria(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        criteria: &MembershipCriteria,
    ) -> Result<Vec<Membership>>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<u64>;
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: String,
    member_id: String,
    member_type: String,
    reference_id: String,
    reference_type: String,
    role_id: String,
    domain: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = AppError;

    fn try_from(row: MembershipRow) -> Result<Self> {
        Ok(Membership {
            id: row.id,
            member_id: row.member_id,
            member_type: row.member_type.parse()?,
            reference_id: row.reference_id,
            reference_type: row.reference_type.parse()?,
            role_id: row.role_id,
            domain: row.domain,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_MEMBERSHIP: &str = "SELECT id, member_id, member_type, reference_id, reference_type, role_id, domain, created_at, updated_at FROM memberships";

fn into_memberships(rows: Vec<MembershipRow>) -> Result<Vec<Membership>> {
    rows.into_iter().map(Membership::try_from).collect()
}

pub struct MembershipRepositoryImpl {
    pool: MySqlPool,
}

impl MembershipRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn find_by_tuple(&self, membership: &Membership) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "{} WHERE member_id = ? AND member_type = ? AND reference_id = ? AND reference_type = ?",
            SELECT_MEMBERSHIP
        ))
        .bind(&membership.member_id)
        .bind(membership.member_type.as_str())
        .bind(&membership.reference_id)
        .bind(membership.reference_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Membership::try_from).transpose()
    }
}

#[async_trait]
impl MembershipRepository for MembershipRepositoryImpl {
    async fn add_or_update(&self, membership: &Membership) -> Result<Membership> {
        // uq_membership_tuple turns a concurrent second insert into an update
        sqlx::query(
            r#"
            INSERT INTO memberships (id, member_id, member_type, reference_id, reference_type, role_id, domain, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            ON DUPLICATE KEY UPDATE
                role_id = VALUES(role_id),
                domain = COALESCE(VALUES(domain), domain),
                updated_at = NOW()
            "#,
        )
        .bind(&membership.id)
        .bind(&membership.member_id)
        .bind(membership.member_type.as_str())
        .bind(&membership.reference_id)
        .bind(membership.reference_type.as_str())
        .bind(&membership.role_id)
        .bind(&membership.domain)
        .execute(&self.pool)
        .await?;

        self.find_by_tuple(membership)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to write membership")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!("{} WHERE id = ?", SELECT_MEMBERSHIP))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Membership::try_from).transpose()
    }

    async fn find_by_reference(
        &self,
        reference_id: &str,
        reference_type: ReferenceType,
    ) -> Result<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "{} WHERE reference_id = ? AND reference_type = ? ORDER BY created_at",
            SELECT_MEMBERSHIP
        ))
        .bind(reference_id)
        .bind(reference_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        into_memberships(rows)
    }

    async fn find_by_criteria(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        criteria: &MembershipCriteria,
    ) -> Result<Vec<Membership>> {
        if criteria.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(SELECT_MEMBERSHIP);
        builder
            .push(" WHERE reference_type = ")
            .push_bind(reference_type.as_str())
            .push(" AND reference_id = ")
            .push_bind(reference_id.to_string())
            .push(" AND (");

        let mut has_clause = false;
        if let Some(user_id) = &criteria.user_id {
            builder
                .push("(member_type = ")
                .push_bind(MemberType::User.as_str())
                .push(" AND member_id = ")
                .push_bind(user_id.clone())
                .push(")");
            has_clause = true;
        }
        if let Some(group_ids) = criteria.group_ids.as_ref().filter(|g| !g.is_empty()) {
            if has_clause {
                builder.push(" OR ");
            }
            builder
                .push("(member_type = ")
                .push_bind(MemberType::Group.as_str())
                .push(" AND member_id IN (");
            let mut separated = builder.separated(", ");
            for group_id in group_ids {
                separated.push_bind(group_id.clone());
            }
            separated.push_unseparated("))");
        }
        builder.push(")");

        let rows = builder
            .build_query_as::<MembershipRow>()
            .fetch_all(&self.pool)
            .await?;

        into_memberships(rows)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Membership {} not found", id)));
        }

        Ok(())
    }

    async fn delete_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM memberships WHERE reference_type = ? AND reference_id = ?")
                .bind(reference_type.as_str())
                .bind(reference_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(member_type: &str, reference_type: &str) -> MembershipRow {
        MembershipRow {
            id: "m1".to_string(),
            member_id: "u1".to_string(),
            member_type: member_type.to_string(),
            reference_id: "app-1".to_string(),
            reference_type: reference_type.to_string(),
            role_id: "r1".to_string(),
            domain: Some("d1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let membership = Membership::try_from(row("USER", "APPLICATION")).unwrap();

        assert_eq!(membership.member_type, MemberType::User);
        assert_eq!(membership.reference_type, ReferenceType::Application);
        assert_eq!(membership.domain.as_deref(), Some("d1"));
    }

    #[test]
    fn test_row_conversion_rejects_unknown_reference_type() {
        let result = Membership::try_from(row("USER", "PLATFORM"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_membership_repository() {
        let mut mock = MockMembershipRepository::new();
        mock.expect_find_by_criteria()
            .withf(|ty, id, criteria| {
                *ty == ReferenceType::Domain
                    && id == "d1"
                    && criteria.user_id.as_deref() == Some("u1")
            })
            .returning(|_, _, _| Ok(vec![]));

        let criteria = MembershipCriteria::for_member("u1", MemberType::User);
        let result = mock
            .find_by_criteria(ReferenceType::Domain, "d1", &criteria)
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
