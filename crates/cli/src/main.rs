//! giiter command-line tool.
//!
//! Lists the commits of a feature branch next to their review branches and
//! keeps the review branches in step with the rewritten history.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::Confirm;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use giiter_core::config::{resolve_base, resolve_feature, GiiterConfig};
use giiter_core::models::{short_sha, Record};
use giiter_core::{EngineConfig, GitClient, ReviewEngine};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Keep one review branch per commit of a stacked feature branch.
#[derive(Parser, Debug)]
#[command(name = "giiter", version)]
struct Cli {
    /// Path to the TOML configuration file
    /// [default: <config dir>/giiter/config.toml].
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run inside this repository.
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    repo: PathBuf,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct BranchArgs {
    /// Base branch; remembered for the feature branch once given.
    #[arg(short, long)]
    base: Option<String>,

    /// Feature branch [default: the checked-out branch].
    #[arg(short, long)]
    feature: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct FeatureArgs {
    /// Feature branch [default: the checked-out branch].
    #[arg(short, long)]
    feature: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path [default: the configuration path].
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(flatten)]
    Repo(RepoCommand),
}

/// Commands that work inside a repository and need the loaded configuration.
#[derive(Subcommand, Debug)]
enum RepoCommand {
    /// Show feature commits and their review branches.
    #[command(alias = "l")]
    List {
        #[command(flatten)]
        branches: BranchArgs,

        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Move stale review branches and drop orphaned ones.
    #[command(alias = "r")]
    Refresh {
        #[command(flatten)]
        branches: BranchArgs,
    },

    /// Refresh, then create review branches for new commits.
    #[command(alias = "m")]
    Make {
        #[command(flatten)]
        branches: BranchArgs,
    },

    /// Move the review branch listed at BRANCH_POS onto the commit at COMMIT_POS.
    #[command(alias = "a")]
    Assign {
        commit_pos: usize,
        branch_pos: usize,

        #[command(flatten)]
        branches: BranchArgs,
    },

    /// List the review branches of a feature branch.
    Branches {
        #[command(flatten)]
        feature: FeatureArgs,
    },

    /// Delete every review branch of a feature branch.
    Delete {
        #[command(flatten)]
        feature: FeatureArgs,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the change of the commit listed at POS.
    #[command(alias = "d")]
    Diff {
        pos: usize,

        #[command(flatten)]
        branches: BranchArgs,

        /// Extra arguments for `git diff`.
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Rebase the feature branch onto its base.
    Rebase {
        #[command(flatten)]
        branches: BranchArgs,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = tokio::select! {
        result = run(cli) => result,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => Err(anyhow!("interrupted")),
            Err(e) => Err(e).context("failed to listen for interrupt"),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config,
        repo,
        verbose,
        command,
    } = cli;
    let config_path = match config {
        Some(path) => path,
        None => default_config_path()
            .ok_or_else(|| anyhow!("no configuration directory, pass --config"))?,
    };

    match command {
        Commands::Init { output } => {
            init_logging(verbose, "warn");
            cmd_init(output.as_deref().unwrap_or(config_path.as_path()))
        }
        Commands::Repo(command) => {
            let config = load_config(&config_path)?;
            init_logging(verbose, &config.log.level);
            let mut session = Session {
                config,
                config_path,
                client: GitClient::new(repo),
            };
            session.run(command).await
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("giiter").join("config.toml"))
}

fn load_config(path: &Path) -> Result<GiiterConfig> {
    let config = GiiterConfig::load_or_default(path).context("failed to load configuration file")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Loaded configuration plus the repository being worked on.
struct Session {
    config: GiiterConfig,
    config_path: PathBuf,
    client: GitClient,
}

impl Session {
    async fn resolve_feature(&self, explicit: Option<&str>) -> Result<String> {
        let current = match explicit {
            Some(_) => None,
            None => self
                .client
                .current_branch()
                .await
                .context("failed to read current branch")?,
        };
        Ok(resolve_feature(explicit, current.as_deref())?)
    }

    /// Engine for commands working on the base..feature range. A given base
    /// is remembered in the config file.
    async fn engine(&mut self, args: &BranchArgs) -> Result<ReviewEngine<GitClient>> {
        let feature = self.resolve_feature(args.feature.as_deref()).await?;
        let (base, changed) = resolve_base(&mut self.config, &feature, args.base.as_deref())?;
        if changed {
            self.config
                .save_to_file(&self.config_path)
                .context("failed to remember base branch")?;
            info!(feature = %feature, base = %base, "remembered base branch");
        }
        debug!(feature = %feature, base = %base, "resolved branches");
        Ok(ReviewEngine::new(
            self.client.clone(),
            EngineConfig::from_config(&self.config, base, feature),
        ))
    }

    /// Engine for commands that only look at review branches.
    async fn feature_engine(&self, args: &FeatureArgs) -> Result<ReviewEngine<GitClient>> {
        let feature = self.resolve_feature(args.feature.as_deref()).await?;
        let base = self.config.remembered_base(&feature).unwrap_or_default().to_string();
        Ok(ReviewEngine::new(
            self.client.clone(),
            EngineConfig::from_config(&self.config, base, feature),
        ))
    }

    async fn run(&mut self, command: RepoCommand) -> Result<()> {
        match command {
            RepoCommand::List { branches, json } => {
                let engine = self.engine(&branches).await?;
                let records = engine.reconcile().await?;
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&records).context("failed to encode listing")?
                    );
                } else {
                    print_records(&records);
                }
            }
            RepoCommand::Refresh { branches } => {
                let engine = self.engine(&branches).await?;
                print_records(&engine.refresh().await?);
            }
            RepoCommand::Make { branches } => {
                let engine = self.engine(&branches).await?;
                print_records(&engine.make().await?);
            }
            RepoCommand::Assign {
                commit_pos,
                branch_pos,
                branches,
            } => {
                let engine = self.engine(&branches).await?;
                print_records(&engine.assign(commit_pos, branch_pos).await?);
            }
            RepoCommand::Branches { feature } => {
                let engine = self.feature_engine(&feature).await?;
                let branches = engine.review_branches().await?;
                if branches.is_empty() {
                    println!("{}", style::dim("no review branches"));
                }
                for branch in branches {
                    println!("{} {}", short_sha(&branch.tip_sha), branch.name);
                }
            }
            RepoCommand::Delete { feature, yes } => {
                let engine = self.feature_engine(&feature).await?;
                cmd_delete(&engine, yes).await?;
            }
            RepoCommand::Diff {
                pos,
                branches,
                args,
            } => {
                let engine = self.engine(&branches).await?;
                let record = engine.record_at(pos).await?;
                self.client
                    .show_diff(record.display_sha(), &args)
                    .await
                    .context("failed to show diff")?;
            }
            RepoCommand::Rebase { branches } => {
                let engine = self.engine(&branches).await?;
                let config = engine.config();
                self.client
                    .rebase(&config.base, &config.feature)
                    .await
                    .context("rebase failed")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn print_records(records: &[Record]) {
    for (i, record) in records.iter().enumerate() {
        let mark = style::mark(record.state());
        let sha = short_sha(record.display_sha());
        let subject = style::subject(record.subject());
        if record.is_new() {
            println!("{}) {} {} {}", i + 1, mark, sha, subject);
        } else {
            println!(
                "{}) {} {} [{}] {}",
                i + 1,
                mark,
                sha,
                record.branch_names().join(","),
                subject
            );
        }
    }
}

async fn cmd_delete(engine: &ReviewEngine<GitClient>, yes: bool) -> Result<()> {
    let branches = engine.review_branches().await?;
    if branches.is_empty() {
        println!("{}", style::dim("no review branches"));
        return Ok(());
    }

    if !yes {
        for branch in &branches {
            println!("  {}", branch.name);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} review branches?", branches.len()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !confirmed {
            println!("{}", style::warn("Nothing deleted."));
            return Ok(());
        }
    }

    let deleted = engine.delete_all().await?;
    println!(
        "{}",
        style::success(&format!("Deleted {} review branches", deleted.len()))
    );
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    std::fs::write(output, GiiterConfig::default_template())
        .context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!(
            "Default configuration written to {}",
            output.display()
        ))
    );
    Ok(())
}
