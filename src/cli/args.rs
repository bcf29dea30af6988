//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read settings from this file
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never prompt for missing values
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// bulkpush - Publish large file sets to a git remote in bounded chunks
#[derive(Parser, Debug)]
#[command(name = "bulkpush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read settings from this config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Never prompt for missing values
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if neither `--no-interactive` nor `--quiet` was set and
    /// stdin is a TTY.
    pub fn interactive(&self) -> bool {
        if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// Source selection and chunking, shared by `publish` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Folder whose files are published
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Files per chunk (default 6000; invalid values fall back to it)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub chunk_size: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a folder into a repository and push it chunk by chunk
    #[command(
        name = "publish",
        long_about = "Publish every file under a source folder into a git repository and \
            push it to a remote, a bounded chunk at a time.\n\n\
            The repository is created and initialized when it does not exist. The \
            'origin' remote is created or repointed at --remote. Each chunk is staged, \
            committed as \"Add files from chunk i/n (Source: <folder>)\" and pushed \
            before the next one starts. The first failing chunk stops the run.\n\n\
            Re-running after a failure is safe: files that are already committed \
            produce no new commit, and a commit whose push failed is pushed again.",
        after_help = "\
EXAMPLES:
    # Publish a dataset living inside the repository working tree
    bulkpush publish --source /srv/mirror/tiles --repository /srv/mirror \\
        --remote git@example.com:org/mirror.git

    # Smaller chunks for a remote with tight pack limits
    bulkpush publish --chunk-size 1000

    # See the chunk layout without touching the repository
    bulkpush publish --dry-run

    # Machine-readable summary for scripts
    bulkpush publish --json --no-interactive"
    )]
    Publish {
        #[command(flatten)]
        source: SourceArgs,

        /// Working tree to commit into (created if absent)
        #[arg(long, value_name = "DIR")]
        repository: Option<PathBuf>,

        /// URL for the 'origin' remote
        #[arg(long, value_name = "URL")]
        remote: Option<String>,

        /// Plan only; do not touch the repository
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a folder would be split into chunks
    Plan {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported by `completion`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn publish_flags_parse() {
        let cli = Cli::try_parse_from([
            "bulkpush",
            "--no-interactive",
            "publish",
            "--source",
            "/data/tiles",
            "--repository",
            "/srv/mirror",
            "--remote",
            "https://example.com/m.git",
            "--chunk-size",
            "-5",
            "--dry-run",
        ])
        .unwrap();

        assert!(!cli.interactive());
        match cli.command {
            Command::Publish {
                source,
                repository,
                remote,
                dry_run,
                json,
            } => {
                assert_eq!(source.source, Some(PathBuf::from("/data/tiles")));
                assert_eq!(source.chunk_size.as_deref(), Some("-5"));
                assert_eq!(repository, Some(PathBuf::from("/srv/mirror")));
                assert_eq!(remote.as_deref(), Some("https://example.com/m.git"));
                assert!(dry_run);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bulkpush", "plan", "-q", "--config", "c.toml"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(!cli.interactive());
    }

    #[test]
    fn completion_requires_known_shell() {
        assert!(Cli::try_parse_from(["bulkpush", "completion", "tcsh"]).is_err());
        let cli = Cli::try_parse_from(["bulkpush", "completion", "zsh"]).unwrap();
        assert!(matches!(cli.command, Command::Completion { shell: Shell::Zsh }));
    }
}
