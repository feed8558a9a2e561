//! Configuration management for Tenantry Core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
    /// Membership defaults
    pub membership: MembershipConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub service_name: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            service_name: "tenantry-core".to_string(),
            metrics_enabled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Organization used when a command does not name one
    pub default_organization_id: String,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            default_organization_id: "DEFAULT".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                service_name: env::var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|_| "tenantry-core".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
            },
            membership: MembershipConfig {
                default_organization_id: env::var("DEFAULT_ORGANIZATION_ID")
                    .unwrap_or_else(|_| "DEFAULT".to_string()),
            },
        })
    }
}
