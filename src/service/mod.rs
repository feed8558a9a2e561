//! Business logic layer

pub mod cascade;
pub mod member;
pub mod membership;
pub mod permission;
pub mod role;
pub mod user;

pub use cascade::{CascadeOutcome, MembershipCascade};
pub use member::MemberService;
pub use membership::MembershipService;
pub use permission::PermissionService;
pub use role::RoleService;
pub use user::UserService;
