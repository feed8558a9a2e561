//! Data access layer (Repository pattern)

pub mod group;
pub mod membership;
pub mod resource;
pub mod role;
pub mod user;

pub use group::GroupRepository;
pub use membership::MembershipRepository;
pub use resource::ResourceRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use sqlx::MySqlPool;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pool: MySqlPool,
}

impl DbPool {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &MySqlPool {
        &self.pool
    }
}

impl std::ops::Deref for DbPool {
    type Target = MySqlPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
