//! Group repository

use crate::domain::Group;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Group>>;
    /// Groups the user directly belongs to.
    async fn find_by_member(&self, user_id: &str) -> Result<Vec<Group>>;
    async fn update_roles(&self, id: &str, roles: &[String]) -> Result<Group>;
}

#[derive(Debug, FromRow)]
struct GroupRow {
    id: String,
    name: String,
    roles: Json<Vec<String>>,
    updated_at: DateTime<Utc>,
}

pub struct GroupRepositoryImpl {
    pool: MySqlPool,
}

impl GroupRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn with_members(&self, rows: Vec<GroupRow>) -> Result<Vec<Group>> {
        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let members: Vec<String> =
                sqlx::query_scalar("SELECT user_id FROM group_members WHERE group_id = ?")
                    .bind(&row.id)
                    .fetch_all(&self.pool)
                    .await?;
            groups.push(Group {
                id: row.id,
                name: row.name,
                members,
                roles: row.roles.0,
                updated_at: row.updated_at,
            });
        }
        Ok(groups)
    }
}

#[async_trait]
impl GroupRepository for GroupRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, roles, updated_at FROM `groups` WHERE id = ?",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.with_members(rows).await?.into_iter().next())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Group>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("SELECT id, name, roles, updated_at FROM `groups` WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<GroupRow>()
            .fetch_all(&self.pool)
            .await?;

        self.with_members(rows).await
    }

    async fn find_by_member(&self, user_id: &str) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.roles, g.updated_at
            FROM `groups` g
            INNER JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_members(rows).await
    }

    async fn update_roles(&self, id: &str, roles: &[String]) -> Result<Group> {
        let result = sqlx::query("UPDATE `groups` SET roles = ?, updated_at = NOW() WHERE id = ?")
            .bind(Json(roles))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))
    }
}
