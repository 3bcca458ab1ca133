use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level parser for the `medsyn` binary.
#[derive(Debug, Parser)]
#[command(name = "medsyn", version, about = "MedSynEval administration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (overrides MSE_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Check database connectivity and migration state.
    CheckSetup,
    /// Load a folder with `real/` and `synthetic/` subfolders as an image set.
    LoadImageset(LoadImagesetArgs),
    /// Create single-use registration invitations.
    CreateInvitation(CreateInvitationArgs),
    /// Create an administrator account.
    CreateSuperuser(CreateSuperuserArgs),
}

#[derive(Clone, Debug, Args)]
pub struct LoadImagesetArgs {
    /// Folder holding the `real` and `synthetic` subfolders
    pub folder: PathBuf,
    /// Unique image set name
    pub name: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Administrator recorded as the set's creator
    #[arg(long)]
    pub admin_username: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct CreateInvitationArgs {
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Clone, Debug, Args)]
pub struct CreateSuperuserArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "MSE_SUPERUSER_PASSWORD")]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn load_imageset_parses_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "medsyn",
            "load-imageset",
            "/data/study1",
            "Study 1",
            "--description",
            "Chest X-rays",
            "--admin-username",
            "admin",
        ])
        .expect("cli should parse");

        let Commands::LoadImageset(args) = cli.command else {
            panic!("expected load-imageset");
        };
        assert_eq!(args.folder, PathBuf::from("/data/study1"));
        assert_eq!(args.name, "Study 1");
        assert_eq!(args.description, "Chest X-rays");
        assert_eq!(args.admin_username.as_deref(), Some("admin"));
    }

    #[test]
    fn load_imageset_requires_name() {
        assert!(Cli::try_parse_from(["medsyn", "load-imageset", "/data/study1"]).is_err());
    }

    #[test]
    fn create_invitation_defaults_to_one() {
        let cli = Cli::try_parse_from(["medsyn", "create-invitation"]).expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::CreateInvitation(CreateInvitationArgs { count: 1 })
        ));

        let cli = Cli::try_parse_from(["medsyn", "create-invitation", "--count", "5"])
            .expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::CreateInvitation(CreateInvitationArgs { count: 5 })
        ));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["medsyn", "migrate", "--verbose", "-c", "medsyn.toml"])
            .expect("cli should parse");
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("medsyn.toml")));
        assert!(matches!(cli.command, Commands::Migrate));
    }

    #[test]
    fn create_superuser_takes_named_arguments() {
        let cli = Cli::try_parse_from([
            "medsyn",
            "create-superuser",
            "--username",
            "admin",
            "--email",
            "admin@example.com",
            "--password",
            "s3cret-pass",
        ])
        .expect("cli should parse");

        let Commands::CreateSuperuser(args) = cli.command else {
            panic!("expected create-superuser");
        };
        assert_eq!(args.username, "admin");
        assert_eq!(args.email, "admin@example.com");
        assert_eq!(args.password, "s3cret-pass");
    }
}
