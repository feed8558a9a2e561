use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sqlx::mysql::MySqlPoolOptions;
use tenantry_core::config::Config;
use tenantry_core::domain::{
    Acl, Actor, MemberType, NewMembership, Permission, ReferenceType, ResourcePath,
};
use tenantry_core::repository::DbPool;
use tenantry_core::service::MemberService;
use tenantry_core::state::{AppState, HasServices};
use tenantry_core::{migration, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tenantry-core")]
#[command(about = "Hierarchical permission resolution and membership management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database if needed and run migrations
    Migrate,
    /// Seed the default roles of an organization
    SeedRoles {
        /// Organization to seed (defaults to DEFAULT_ORGANIZATION_ID)
        #[arg(long)]
        organization: Option<String>,
    },
    /// Check whether an actor holds a permission on a resource path
    Check {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        permission: Permission,
        #[arg(long)]
        acl: Acl,
        #[command(flatten)]
        path: PathArgs,
    },
    /// List the flattened permissions an actor holds on one scope
    Permissions {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        reference_type: ReferenceType,
        #[arg(long)]
        reference_id: String,
    },
    /// Grant a role on an application to a user or group
    Grant {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        member: String,
        #[arg(long, default_value = "USER")]
        member_type: MemberType,
        /// Role id
        #[arg(long)]
        role: String,
        #[command(flatten)]
        path: PathArgs,
    },
}

#[derive(Args, Debug)]
struct PathArgs {
    /// Organization (defaults to DEFAULT_ORGANIZATION_ID)
    #[arg(long)]
    organization: Option<String>,
    #[arg(long)]
    environment: Option<String>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    application: Option<String>,
}

impl PathArgs {
    fn to_path(&self, config: &Config) -> Result<ResourcePath> {
        let organization = self
            .organization
            .as_deref()
            .unwrap_or(&config.membership.default_organization_id);
        Ok(ResourcePath::from_parts(
            organization,
            self.environment.as_deref(),
            self.domain.as_deref(),
            self.application.as_deref(),
        )?)
    }
}

async fn connect(config: &Config) -> Result<AppState> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    Ok(AppState::new(config.clone(), DbPool::new(pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let prometheus = telemetry::init(&config.telemetry)?;

    info!("Starting {}", config.telemetry.service_name);

    match cli.command {
        Command::Migrate => migration::run_migrations(&config).await?,
        Command::SeedRoles { organization } => {
            let organization =
                organization.unwrap_or_else(|| config.membership.default_organization_id.clone());
            let created = migration::seed_default_roles(&config, &organization).await?;
            for role in created {
                println!("{}\t{}\t{}", role.id, role.name, role.reference_type);
            }
        }
        Command::Check {
            actor,
            permission,
            acl,
            path,
        } => {
            let path = path.to_path(&config)?;
            let state = connect(&config).await?;
            let granted = state
                .permission_service()
                .has_any_permission(&Actor::new(actor), permission, acl, &path)
                .await?;
            println!("{}", if granted { "granted" } else { "denied" });
        }
        Command::Permissions {
            actor,
            reference_type,
            reference_id,
        } => {
            let state = connect(&config).await?;
            let acls = state
                .permission_service()
                .find_all_permissions(&Actor::new(actor), reference_type, &reference_id)
                .await?;
            for permission in Permission::flatten(&acls) {
                println!("{}", permission);
            }
        }
        Command::Grant {
            actor,
            member,
            member_type,
            role,
            path,
        } => {
            let path = path.to_path(&config)?;
            let state = connect(&config).await?;
            let membership = MemberService::new(state)
                .add_or_update_member(
                    &Actor::new(actor),
                    &path,
                    NewMembership {
                        member_id: member,
                        member_type,
                        role,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&membership)?);
        }
    }

    if let Some(handle) = prometheus {
        print!("{}", handle.render());
    }
    Ok(())
}
