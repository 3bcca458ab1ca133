//! MedSynEval RS administration CLI
//!
//! Database setup, image set loading and account bootstrap.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mse_core::config::AppConfig;
use mse_db::{Database, Stores};
use mse_services::{
    ImageSetLoader, InvitationService, LoadOptions, RegistrationService, SuperuserParams,
};
use mse_storage::LocalStorage;

mod cli;

use cli::{Cli, Commands, CreateInvitationArgs, CreateSuperuserArgs, LoadImagesetArgs};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("medsyn error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path)),
        None => AppConfig::discover(),
    }
    .context("failed to load configuration")?;

    let db = Database::connect(&config.database)
        .await
        .with_context(|| format!("failed to connect to {}", redact(&config.database.url)))?;

    let result = match cli.command {
        Commands::Migrate => migrate(&db).await,
        Commands::CheckSetup => check_setup(&db, &config).await,
        Commands::LoadImageset(args) => load_imageset(&db, &config, args).await,
        Commands::CreateInvitation(args) => create_invitation(&db, args).await,
        Commands::CreateSuperuser(args) => create_superuser(&db, &config, args).await,
    };

    db.close().await;
    result
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "debug,sqlx=warn"
    } else {
        "warn,mse_cli=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to initialize tracing")?;
    Ok(())
}

fn stores(db: &Database) -> Stores {
    Stores::postgres(db.pool().clone())
}

/// Database URL with the password masked
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

async fn migrate(db: &Database) -> anyhow::Result<()> {
    let pending = db.pending_migrations().await?;
    db.migrate().await.context("migration failed")?;
    if pending.is_empty() {
        println!("No pending migrations.");
    } else {
        println!("Applied {} migration(s): {:?}", pending.len(), pending);
    }
    Ok(())
}

async fn check_setup(db: &Database, config: &AppConfig) -> anyhow::Result<()> {
    db.ping().await.context("database is not reachable")?;
    println!("Database: OK ({})", redact(&config.database.url));

    let pending = db.pending_migrations().await?;
    if pending.is_empty() {
        println!("Migrations: up to date");
    } else {
        println!("Migrations: {} pending {:?}", pending.len(), pending);
    }

    let media_root = std::path::Path::new(&config.storage.media_root);
    if media_root.is_dir() {
        println!("Media root: OK ({})", media_root.display());
    } else {
        println!("Media root: missing ({})", media_root.display());
    }

    if !pending.is_empty() {
        bail!("run `medsyn migrate` before starting the server");
    }
    Ok(())
}

async fn load_imageset(
    db: &Database,
    config: &AppConfig,
    args: LoadImagesetArgs,
) -> anyhow::Result<()> {
    let storage = Arc::new(LocalStorage::new(&config.storage.media_root));
    let loader = ImageSetLoader::new(stores(db), storage);

    let options = LoadOptions {
        description: args.description,
        admin_username: args.admin_username,
    };
    let report = loader.load(&args.folder, &args.name, options).await?;

    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    info!(image_set_id = report.image_set.id, "Image set loaded");
    println!(
        "Image set '{}' created with {} images ({} real, {} synthetic)",
        report.image_set.name,
        report.total(),
        report.real,
        report.synthetic
    );
    Ok(())
}

async fn create_invitation(db: &Database, args: CreateInvitationArgs) -> anyhow::Result<()> {
    let invitations = InvitationService::new(stores(db)).create(args.count).await?;

    println!("Created {} invitation(s):", invitations.len());
    for invitation in &invitations {
        println!("  {}  {}", invitation.token, invitation.registration_path());
    }
    Ok(())
}

async fn create_superuser(
    db: &Database,
    config: &AppConfig,
    args: CreateSuperuserArgs,
) -> anyhow::Result<()> {
    let service =
        RegistrationService::with_password_min_length(stores(db), config.auth.password_min_length);
    let clinician = service
        .create_superuser(SuperuserParams {
            username: args.username,
            email: args.email,
            password: args.password,
        })
        .await?;

    println!(
        "Superuser '{}' created (id {})",
        clinician.username, clinician.id
    );
    Ok(())
}
