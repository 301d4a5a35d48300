use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stacklet-provider")]
#[command(version)]
#[command(about = "Reconcile a Stacklet deployment with a declarative manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider configuration file [default: ~/.config/stacklet/provider.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State file
    #[arg(long, global = true, value_name = "PATH", default_value = crate::state::DEFAULT_STATE_FILE)]
    pub state: PathBuf,

    /// Manifest file
    #[arg(long, global = true, value_name = "PATH", default_value = crate::manifest::DEFAULT_MANIFEST_FILE)]
    pub manifest: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan,

    /// Make the remote match the manifest
    Apply(ApplyArgs),

    /// Re-read every resource in state from the remote
    Refresh,

    /// Adopt an existing remote resource into state
    Import {
        /// Resource type, e.g. stacklet_account
        #[arg(value_name = "TYPE")]
        kind: String,

        /// Local address name, e.g. prod
        name: String,

        /// Remote identifier in the type's import format
        id: String,
    },

    /// Delete every resource in state
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Show platform details (external ID, execution regions)
    Platform,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub auto_approve: bool,

    /// Number of resources applied concurrently
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,

    /// Plan and show, but change nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::parse_from(["stacklet-provider", "-vv", "apply", "--auto-approve", "--jobs", "8"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert!(args.auto_approve);
                assert_eq!(args.jobs, 8);
                assert!(!args.dry_run);
            }
            _ => panic!("expected apply"),
        }
        assert_eq!(cli.state, PathBuf::from("stacklet.state.json"));
    }

    #[test]
    fn test_import_positionals() {
        let cli = Cli::parse_from([
            "stacklet-provider",
            "--state",
            "/tmp/s.json",
            "import",
            "stacklet_account",
            "prod",
            "aws:123456789012",
        ]);
        assert_eq!(cli.state, PathBuf::from("/tmp/s.json"));
        assert!(matches!(
            cli.command,
            Command::Import { ref kind, ref name, ref id }
                if kind == "stacklet_account" && name == "prod" && id == "aws:123456789012"
        ));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["stacklet-provider", "apply", "--jobs", "0"]).is_err());
    }
}
