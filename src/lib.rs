//! Tenantry Core - hierarchical permission resolution and membership cascade
//!
//! Resolves whether an actor holds a permission on a resource or any of its
//! ancestors (application, domain, environment, organization), and keeps
//! parent-scope grants consistent when members are added to a child scope.

pub mod config;
pub mod domain;
pub mod error;
pub mod migration;
pub mod repository;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
