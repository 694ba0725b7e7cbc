//! gitperm: keeps file mode, owner and group under git
//!
//! # Usage
//!
//! ```bash
//! # Install hooks (pre-commit records, post-merge restores)
//! gitperm init
//!
//! # Install the dev-mode pre-commit hook only
//! gitperm dev init
//!
//! # What the hooks run
//! gitperm commit
//! gitperm merge
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gitperm_core::{ops, stat, GitCli, HookInstaller, NativeApplier, RepoContext};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gitperm")]
#[command(author = "gitperm Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Record and restore file permissions and ownership in a git repository")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Run(Action),

    /// Run a command in dev mode: only register new paths with a placeholder
    /// record and never restore
    Dev {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Action {
    /// Record metadata for every tracked path and stage the store (pre-commit)
    Commit,

    /// Restore stored metadata onto the work tree (post-merge)
    Merge,

    /// Install the git hooks
    Init,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());

    let (action, dev_mode) = match cli.command {
        Commands::Run(action) => (action, false),
        Commands::Dev { action } => (action, true),
    };

    let result = match action {
        Action::Commit => cmd_commit(dev_mode),
        Action::Merge => cmd_merge(dev_mode),
        Action::Init => cmd_init(dev_mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gitperm: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Filter used when neither `-v` nor a valid `RUST_LOG` is given
const DEFAULT_DIRECTIVE: &str = "gitperm=warn";

fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn init_logging(verbose: bool, rust_log: Option<&str>) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(verbose, rust_log))
        .init();
}

/// Resolve the repository around the working directory.
fn open_repo() -> Result<(GitCli, RepoContext)> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let vcs = GitCli::discover(&cwd)?;
    let ctx = RepoContext::from_vcs(&vcs).context("Failed to load gitperm configuration")?;
    tracing::debug!("Store directory: {}", ctx.store_dir());
    Ok((vcs, ctx))
}

fn cmd_commit(dev_mode: bool) -> Result<()> {
    let (vcs, ctx) = open_repo()?;
    let stat = stat::provider(ctx.config().stat_backend);

    let report = ops::commit(&vcs, &ctx, stat.as_ref(), dev_mode)
        .context("Failed to record metadata")?;

    for change in &report.changes {
        println!("{}", change);
    }
    if dev_mode {
        println!("Summary: {} ({} skipped)", report, report.skipped);
    }
    Ok(())
}

fn cmd_merge(dev_mode: bool) -> Result<()> {
    let (_vcs, ctx) = open_repo()?;

    match ops::merge(&ctx, &NativeApplier, dev_mode).context("Failed to restore metadata")? {
        Some(report) if report.skipped > 0 => {
            eprintln!("gitperm: {} entries could not be restored", report.skipped);
        }
        Some(_) => {}
        None => println!("Dev mode: metadata restore skipped"),
    }
    Ok(())
}

fn cmd_init(dev_mode: bool) -> Result<()> {
    let (_vcs, ctx) = open_repo()?;
    let installer = HookInstaller::new(ctx.hooks_dir());

    let changed = installer.install_all(&ctx.config().command, dev_mode)?;
    if changed.is_empty() {
        println!("Hooks already installed in {}", ctx.hooks_dir().display());
    }
    for event in changed {
        println!("Installed {} hook: {}", event.name(), installer.hook_path(event).display());
    }
    Ok(())
}
