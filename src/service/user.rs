//! Direct role assignments of users and groups

use crate::domain::{revoke_from, Member};
use crate::error::{AppError, Result};
use crate::repository::{GroupRepository, UserRepository};
use std::sync::Arc;
use tracing::info;

pub struct UserService<U: UserRepository, G: GroupRepository> {
    user_repo: Arc<U>,
    group_repo: Arc<G>,
}

impl<U: UserRepository, G: GroupRepository> UserService<U, G> {
    pub fn new(user_repo: Arc<U>, group_repo: Arc<G>) -> Self {
        Self {
            user_repo,
            group_repo,
        }
    }

    /// Remove `role_ids` from the direct roles of a user, or of `group_id`
    /// when given. With a group, `member_id` must belong to it.
    ///
    /// Returns the member as stored after the update. Revoking roles the
    /// member does not hold is a no-op.
    pub async fn revoke_roles(
        &self,
        member_id: &str,
        role_ids: &[String],
        group_id: Option<&str>,
    ) -> Result<Member> {
        match group_id {
            None => {
                let mut user = self
                    .user_repo
                    .find_by_id(member_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {} not found", member_id)))?;

                if !revoke_from(&mut user.roles, role_ids) {
                    return Ok(Member::User(user));
                }
                let user = self.user_repo.update_roles(&user.id, &user.roles).await?;
                info!("Revoked roles {:?} from user {}", role_ids, user.id);
                Ok(Member::User(user))
            }
            Some(group_id) => {
                let mut group = self
                    .group_repo
                    .find_by_id(group_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))?;

                if !group.members.iter().any(|m| m == member_id) {
                    return Err(AppError::NotFound(format!(
                        "User {} is not a member of group {}",
                        member_id, group_id
                    )));
                }

                if !revoke_from(&mut group.roles, role_ids) {
                    return Ok(Member::Group(group));
                }
                let group = self.group_repo.update_roles(&group.id, &group.roles).await?;
                info!("Revoked roles {:?} from group {}", role_ids, group.id);
                Ok(Member::Group(group))
            }
        }
    }
}
