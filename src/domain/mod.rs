//! Domain models for Tenantry Core

pub mod member;
pub mod membership;
pub mod reference;
pub mod resource;
pub mod role;

pub use member::*;
pub use membership::*;
pub use reference::*;
pub use resource::*;
pub use role::*;
