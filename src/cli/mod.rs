//! CLI module - command-line interface for cinevault.
//!
//! Structured with `clap` derive, one module per command family under
//! `cli::commands`, mirroring the teacher's per-command-file layout.

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};

/// cinevault - personal video library ingestion and organization tool
#[derive(Parser)]
#[command(name = "cinevault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with the cron scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run one ingestion pass and one association scan, then exit
    #[command(alias = "-c", alias = "--check")]
    Check,

    /// Scan the downloads roots and queue/auto-validate new files
    #[command(alias = "s")]
    Scan,

    /// List or show pending validations
    Pending {
        #[command(subcommand)]
        command: PendingCommands,
    },

    /// Accept a candidate for a pending validation
    Accept {
        /// Pending validation id
        pending_id: i32,
        /// External id of the chosen candidate
        candidate_external_id: String,
    },

    /// Reject a pending validation (no candidate matched)
    Reject {
        /// Pending validation id
        pending_id: i32,
    },

    /// Reset a validated/rejected item back to pending
    Reset {
        /// Pending validation id
        pending_id: i32,
    },

    /// Search a catalog manually, without persisting anything
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Media type to search
        #[arg(long, value_enum)]
        r#type: SearchType,
        /// Restrict results to a release year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Look a catalog entry up by its external id
    SearchId {
        /// tmdb | tvdb | imdb
        source: String,
        /// External catalog id
        external_id: String,
    },

    /// Transfer every validated item into storage
    Transfer {
        /// Perform every check without touching the filesystem
        #[arg(long)]
        dry_run: bool,
        /// Resolution applied automatically to any conflict
        #[arg(long, value_enum, default_value = "skip")]
        on_conflict: ConflictPolicy,
    },

    /// Scan already-validated entries for catalog/file drift
    ScanSuspicious,

    /// Mark a suspicious association as confirmed correct
    Confirm {
        /// movie | episode
        entity_type: String,
        /// Entity id
        entity_id: i32,
    },

    /// Inspect and restore soft-deleted entries
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },

    /// Inspect the movie library
    Movies {
        #[command(subcommand)]
        command: MoviesCommands,
    },

    /// Inspect the series library
    Series {
        #[command(subcommand)]
        command: SeriesCommands,
    },

    /// List episodes for a series
    Episodes {
        /// Series id
        series_id: i32,
    },

    /// Create a default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Subcommand)]
pub enum PendingCommands {
    /// List items awaiting review
    #[command(alias = "ls")]
    List,
    /// Show one pending item and its candidates
    Show {
        /// Pending validation id
        id: i32,
    },
}

#[derive(Subcommand)]
pub enum TrashCommands {
    /// List trashed entries
    #[command(alias = "ls")]
    List {
        /// Restrict to Movie | Series | Episode
        #[arg(long)]
        entity_type: Option<String>,
    },
    /// Restore a trashed entry
    Restore {
        /// Trash row id
        id: i32,
    },
    /// Permanently remove a trashed entry's snapshot
    #[command(alias = "rm")]
    Remove {
        /// Trash row id
        id: i32,
    },
}

#[derive(Subcommand)]
pub enum MoviesCommands {
    /// List all movies
    #[command(alias = "ls")]
    List,
    /// Search movies by title
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum SeriesCommands {
    /// List all series
    #[command(alias = "ls")]
    List,
    /// Search series by title
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum SearchType {
    Movie,
    Series,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum ConflictPolicy {
    KeepOld,
    KeepNew,
    KeepBoth,
    Skip,
}

pub async fn execute(
    cli: Cli,
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        let created = Config::create_default_if_missing()?;
        if created {
            println!("config file created. edit config.toml and run again.");
        } else {
            println!("config file already exists.");
        }
        return Ok(());
    }

    let state = std::sync::Arc::new(crate::state::SharedState::new(config).await?);

    match command {
        Commands::Init => unreachable!("handled above"),

        Commands::Daemon => commands::daemon::cmd_daemon(state, prometheus_handle).await,
        Commands::Check => commands::daemon::cmd_check(&state).await,
        Commands::Scan => commands::scan::cmd_scan(&state).await,

        Commands::Pending { command } => match command {
            PendingCommands::List => commands::pending::cmd_pending_list(&state).await,
            PendingCommands::Show { id } => commands::pending::cmd_pending_show(&state, id).await,
        },
        Commands::Accept { pending_id, candidate_external_id } => {
            commands::pending::cmd_accept(&state, pending_id, &candidate_external_id).await
        }
        Commands::Reject { pending_id } => commands::pending::cmd_reject(&state, pending_id).await,
        Commands::Reset { pending_id } => commands::pending::cmd_reset(&state, pending_id).await,

        Commands::Search { query, r#type, year } => {
            commands::search::cmd_search(&state, &query.join(" "), r#type, year).await
        }
        Commands::SearchId { source, external_id } => {
            commands::search::cmd_search_id(&state, &source, &external_id).await
        }

        Commands::Transfer { dry_run, on_conflict } => {
            commands::transfer::cmd_transfer(&state, dry_run, on_conflict).await
        }

        Commands::ScanSuspicious => commands::association::cmd_scan_suspicious(&state).await,
        Commands::Confirm { entity_type, entity_id } => {
            commands::association::cmd_confirm(&state, &entity_type, entity_id).await
        }

        Commands::Trash { command } => match command {
            TrashCommands::List { entity_type } => {
                commands::trash::cmd_trash_list(&state, entity_type.as_deref()).await
            }
            TrashCommands::Restore { id } => commands::trash::cmd_trash_restore(&state, id).await,
            TrashCommands::Remove { id } => commands::trash::cmd_trash_remove(&state, id).await,
        },

        Commands::Movies { command } => match command {
            MoviesCommands::List => commands::library::cmd_movies_list(&state).await,
            MoviesCommands::Search { query } => {
                commands::library::cmd_movies_search(&state, &query.join(" ")).await
            }
        },
        Commands::Series { command } => match command {
            SeriesCommands::List => commands::library::cmd_series_list(&state).await,
            SeriesCommands::Search { query } => {
                commands::library::cmd_series_search(&state, &query.join(" ")).await
            }
        },
        Commands::Episodes { series_id } => commands::library::cmd_episodes_list(&state, series_id).await,
    }
}
