//! Role repository

use crate::domain::{PermissionAcls, ReferenceType, Role};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: &Role) -> Result<Role>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Role>>;
    /// Seeded default role of an organization for a reference type.
    async fn find_default_role(
        &self,
        organization_id: &str,
        name: &str,
        reference_type: ReferenceType,
    ) -> Result<Option<Role>>;
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: String,
    organization_id: String,
    name: String,
    description: Option<String>,
    reference_type: String,
    is_system: bool,
    is_default: bool,
    permission_acls: Json<PermissionAcls>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = AppError;

    fn try_from(row: RoleRow) -> Result<Self> {
        Ok(Role {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            description: row.description,
            reference_type: row.reference_type.parse()?,
            system: row.is_system,
            default_role: row.is_default,
            permission_acls: row.permission_acls.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ROLE: &str = "SELECT id, organization_id, name, description, reference_type, is_system, is_default, permission_acls, created_at, updated_at FROM roles";

pub struct RoleRepositoryImpl {
    pool: MySqlPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn create(&self, role: &Role) -> Result<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, organization_id, name, description, reference_type, is_system, is_default, permission_acls, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(&role.id)
        .bind(&role.organization_id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.reference_type.as_str())
        .bind(role.system)
        .bind(role.default_role)
        .bind(Json(&role.permission_acls))
        .execute(&self.pool)
        .await?;

        self.find_by_id(&role.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create role")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!("{} WHERE id = ?", SELECT_ROLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Role::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Role>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(SELECT_ROLE);
        builder.push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<RoleRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn find_default_role(
        &self,
        organization_id: &str,
        name: &str,
        reference_type: ReferenceType,
    ) -> Result<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "{} WHERE organization_id = ? AND name = ? AND reference_type = ? AND is_default = TRUE",
            SELECT_ROLE
        ))
        .bind(organization_id)
        .bind(name)
        .bind(reference_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Role::try_from).transpose()
    }
}
