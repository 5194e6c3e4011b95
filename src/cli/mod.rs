//! # CLI Module
//!
//! Command-line interface for inspecting and maintaining the photo cache.
//!
//! ## Usage
//! ```bash
//! # Allocate a scratch file and tombstone it
//! photo-cache temp create --photo 42
//! photo-cache temp tombstone 1
//!
//! # Reclaim tombstones past their retention
//! photo-cache temp reclaim
//!
//! # Cache statistics as JSON
//! photo-cache --output json feed stats
//!
//! # Drop stale gallery entries
//! photo-cache feed prune --kind gallery
//! ```

use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use photo_feed_cache::config::EngineConfig;
use photo_feed_cache::core::clock::{Clock, SystemClock};
use photo_feed_cache::core::photo::{FeedItem, FeedKind, GalleryPhoto, ReceivedPhoto, UploadedPhoto};
use photo_feed_cache::core::store::{LocalPhotoStore, SqlitePhotoStore, StoreStats};
use photo_feed_cache::core::tempfiles::{
    ReclaimReport, SqliteTempFileStore, SweepReport, TempFile, TempFileLifecycle,
};
use photo_feed_cache::error::Result;
use photo_feed_cache::events::{Event, EventChannel, EventReceiver, TempFileEvent};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Photo Feed Cache - inspect and maintain the local photo cache
#[derive(Parser, Debug)]
#[command(name = "photo-cache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Scratch file directory (overrides the config file)
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Print every lifecycle event
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage scratch files
    #[command(subcommand)]
    Temp(TempCommand),

    /// Inspect and maintain cached feeds
    #[command(subcommand)]
    Feed(FeedCommand),
}

#[derive(Subcommand, Debug)]
enum TempCommand {
    /// Create an empty scratch file
    Create {
        /// Photo the file will hold
        #[arg(long)]
        photo: Option<String>,
    },
    /// Link a scratch file to a photo
    Link { id: i64, photo: String },
    /// Soft-delete a scratch file
    Tombstone { id: i64 },
    /// List all scratch file records
    List,
    /// Reclaim tombstoned files
    Reclaim {
        /// Reclaim tombstones older than this many seconds instead of the
        /// configured retention
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
    /// Reclaim the N oldest tombstoned files
    ReclaimOldest { count: usize },
    /// Reclaim every empty scratch file
    SweepEmpty,
    /// Remove unrecorded files and records without files
    SweepOrphans,
    /// Show disk usage of the scratch directory
    Size,
}

#[derive(Subcommand, Debug)]
enum FeedCommand {
    /// Show cache statistics
    Stats {
        /// Only this feed (all feeds when omitted)
        #[arg(short, long)]
        kind: Option<Kind>,
    },
    /// Remove entries outside the freshness window
    Prune {
        #[arg(short, long)]
        kind: Kind,
    },
    /// Remove every cached entry of a feed
    Clear {
        #[arg(short, long)]
        kind: Kind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Public gallery feed
    Gallery,
    /// Photos the user uploaded
    Uploaded,
    /// Photos the user received
    Received,
}

impl From<Kind> for FeedKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Gallery => FeedKind::Gallery,
            Kind::Uploaded => FeedKind::Uploaded,
            Kind::Received => FeedKind::Received,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.global)?;

    match cli.command {
        Commands::Temp(command) => run_temp(command, &config, &cli.global),
        Commands::Feed(command) => run_feed(command, &config, cli.global.output),
    }
}

fn load_config(global: &GlobalArgs) -> Result<EngineConfig> {
    let mut config = EngineConfig::load_or_default(global.config.as_deref())?;
    if let Some(database) = &global.database {
        config.database_path = database.clone();
    }
    if let Some(temp_dir) = &global.temp_dir {
        config.temp_directory = temp_dir.clone();
    }
    // Overrides can break what the file validated
    config.validate()?;
    tracing::debug!(database = %config.database_path.display(), "using config");
    Ok(config)
}

fn run_temp(command: TempCommand, config: &EngineConfig, global: &GlobalArgs) -> Result<()> {
    let store = SqliteTempFileStore::open(&config.database_path)?;
    let (sender, receiver) = EventChannel::new();
    let lifecycle = TempFileLifecycle::new(
        config.temp_file_config(),
        Arc::new(store),
        Arc::new(SystemClock),
    )?
    .with_events(sender);

    let output = global.output;
    let term = Term::stdout();

    match command {
        TempCommand::Create { photo } => {
            let file = match photo {
                Some(photo) => lifecycle.create_linked(&photo)?,
                None => lifecycle.create()?,
            };
            print_records(&term, output, &[file]);
        }
        TempCommand::Link { id, photo } => {
            let file = lifecycle.link_photo(id, &photo)?;
            print_records(&term, output, &[file]);
        }
        TempCommand::Tombstone { id } => {
            let file = lifecycle.mark_deleted_by_id(id)?;
            print_records(&term, output, &[file]);
        }
        TempCommand::List => {
            print_records(&term, output, &lifecycle.find_all()?);
        }
        TempCommand::Reclaim { older_than_secs } => {
            let report = match older_than_secs {
                Some(secs) => {
                    let retention_ms = i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000);
                    let cutoff_ms = SystemClock.now_ms().saturating_sub(retention_ms);
                    lifecycle.delete_old(cutoff_ms)?
                }
                None => lifecycle.reclaim_expired()?,
            };
            print_reclaim(&term, output, &report);
        }
        TempCommand::ReclaimOldest { count } => {
            let oldest = lifecycle.find_oldest(count)?;
            let report = lifecycle.delete_many(&oldest)?;
            print_reclaim(&term, output, &report);
        }
        TempCommand::SweepEmpty => {
            let report = lifecycle.delete_empty_temp_files()?;
            print_reclaim(&term, output, &report);
        }
        TempCommand::SweepOrphans => {
            let report = lifecycle.sweep_orphans()?;
            print_sweep(&term, output, &report);
        }
        TempCommand::Size => {
            let total = lifecycle.calculate_total_directory_size(lifecycle.directory())?;
            let referenced = lifecycle.referenced_size()?;
            print_size(&term, output, total, referenced);
        }
    }

    if global.verbose {
        print_events(&Term::stderr(), &receiver);
    }
    Ok(())
}

fn run_feed(command: FeedCommand, config: &EngineConfig, output: OutputFormat) -> Result<()> {
    let term = Term::stdout();
    let now_ms = SystemClock.now_ms();
    let fresh_since_ms = config.feed_config().fresh_since(now_ms);

    match command {
        FeedCommand::Stats { kind } => {
            let kinds = match kind {
                Some(kind) => vec![kind.into()],
                None => vec![FeedKind::Gallery, FeedKind::Uploaded, FeedKind::Received],
            };
            let mut stats = Vec::with_capacity(kinds.len());
            for kind in kinds {
                let store = open_feed(kind, config)?;
                stats.push(store.stats(fresh_since_ms)?);
            }
            print_stats(&term, output, &stats);
        }
        FeedCommand::Prune { kind } => {
            let kind = kind.into();
            let removed = open_feed(kind, config)?.prune(fresh_since_ms)?;
            print_removed(&term, output, kind, "pruned", removed);
        }
        FeedCommand::Clear { kind } => {
            let kind = kind.into();
            let removed = open_feed(kind, config)?.clear()?;
            print_removed(&term, output, kind, "cleared", removed);
        }
    }
    Ok(())
}

/// Maintenance operations that do not depend on the item type
trait FeedMaintenance {
    fn stats(&self, fresh_since_ms: i64) -> Result<StoreStats>;
    fn prune(&self, cutoff_ms: i64) -> Result<usize>;
    fn clear(&self) -> Result<usize>;
}

impl<T: FeedItem> FeedMaintenance for SqlitePhotoStore<T> {
    fn stats(&self, fresh_since_ms: i64) -> Result<StoreStats> {
        Ok(LocalPhotoStore::stats(self, fresh_since_ms)?)
    }

    fn prune(&self, cutoff_ms: i64) -> Result<usize> {
        Ok(self.prune_older_than(cutoff_ms)?)
    }

    fn clear(&self) -> Result<usize> {
        Ok(LocalPhotoStore::clear(self)?)
    }
}

fn open_feed(kind: FeedKind, config: &EngineConfig) -> Result<Box<dyn FeedMaintenance>> {
    let path = &config.database_path;
    Ok(match kind {
        FeedKind::Gallery => Box::new(SqlitePhotoStore::<GalleryPhoto>::open(path)?),
        FeedKind::Uploaded => Box::new(SqlitePhotoStore::<UploadedPhoto>::open(path)?),
        FeedKind::Received => Box::new(SqlitePhotoStore::<ReceivedPhoto>::open(path)?),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("failed to encode output: {}", e),
    }
}

fn print_records(term: &Term, output: OutputFormat, records: &[TempFile]) {
    if let OutputFormat::Json = output {
        print_json(records);
        return;
    }

    if records.is_empty() {
        term.write_line(&format!("{}", style("No scratch files.").dim())).ok();
        return;
    }

    for record in records {
        let state = if record.is_tombstoned() {
            style(record.state().as_str()).yellow()
        } else {
            style(record.state().as_str()).green()
        };
        let mut line = format!(
            "{:>5}  {:<10}  {}  {}",
            style(record.id).bold(),
            state,
            format_timestamp(record.created_on_ms),
            record.path.display()
        );
        if let Some(deleted_on_ms) = record.deleted_on_ms {
            line.push_str(&format!(
                "  {} {}",
                style("deleted").dim(),
                format_timestamp(deleted_on_ms)
            ));
        }
        if let Some(photo) = &record.linked_photo_id {
            line.push_str(&format!("  {} {}", style("photo").dim(), photo));
        }
        term.write_line(&line).ok();
    }
}

fn print_reclaim(term: &Term, output: OutputFormat, report: &ReclaimReport) {
    if let OutputFormat::Json = output {
        print_json(report);
        return;
    }

    term.write_line(&format!(
        "{} Reclaimed {} scratch files, {} freed",
        style("✓").green().bold(),
        style(report.reclaimed_count()).cyan(),
        style(format_bytes(report.bytes_freed)).yellow()
    ))
    .ok();

    for failure in &report.failures {
        term.write_line(&format!(
            "  {} {} {}: {}",
            style("!").red().bold(),
            failure.id,
            failure.path.display(),
            style(&failure.message).dim()
        ))
        .ok();
    }
    if !report.is_clean() {
        term.write_line(&format!(
            "{}",
            style("Files left behind are removed by `temp sweep-orphans`.").dim()
        ))
        .ok();
    }
}

fn print_sweep(term: &Term, output: OutputFormat, report: &SweepReport) {
    if let OutputFormat::Json = output {
        print_json(report);
        return;
    }

    term.write_line(&format!(
        "{} Removed {} orphaned files ({}), dropped {} dangling records",
        style("✓").green().bold(),
        style(report.files_removed.len()).cyan(),
        style(format_bytes(report.bytes_freed)).yellow(),
        style(report.records_dropped.len()).cyan()
    ))
    .ok();
}

fn print_size(term: &Term, output: OutputFormat, total: u64, referenced: u64) {
    if let OutputFormat::Json = output {
        print_json(&serde_json::json!({
            "total_bytes": total,
            "referenced_bytes": referenced,
            "unreferenced_bytes": total.saturating_sub(referenced),
        }));
        return;
    }

    term.write_line(&format!("  {} on disk", style(format_bytes(total)).cyan())).ok();
    term.write_line(&format!(
        "  {} referenced by records",
        style(format_bytes(referenced)).cyan()
    ))
    .ok();
    if total > referenced {
        term.write_line(&format!(
            "  {} unreferenced",
            style(format_bytes(total - referenced)).yellow()
        ))
        .ok();
    }
}

fn print_stats(term: &Term, output: OutputFormat, stats: &[StoreStats]) {
    if let OutputFormat::Json = output {
        print_json(stats);
        return;
    }

    for s in stats {
        term.write_line(&format!("{}", style(s.kind.display_name()).bold())).ok();
        term.write_line(&format!(
            "  {} entries, {} fresh, {} stale",
            style(s.total_entries).cyan(),
            style(s.fresh_entries).green(),
            style(s.stale_entries()).yellow()
        ))
        .ok();
        if let (Some(oldest), Some(newest)) = (s.oldest_inserted_ms, s.newest_inserted_ms) {
            term.write_line(&format!(
                "  {} {} .. {}",
                style("inserted").dim(),
                format_timestamp(oldest),
                format_timestamp(newest)
            ))
            .ok();
        }
    }
}

fn print_removed(term: &Term, output: OutputFormat, kind: FeedKind, action: &str, removed: usize) {
    if let OutputFormat::Json = output {
        print_json(&serde_json::json!({
            "kind": kind,
            "action": action,
            "removed": removed,
        }));
        return;
    }

    term.write_line(&format!(
        "{} {} {} entries from {}",
        style("✓").green().bold(),
        action,
        style(removed).cyan(),
        kind.display_name()
    ))
    .ok();
}

fn print_events(term: &Term, receiver: &EventReceiver) {
    for event in receiver.drain() {
        let line = match event {
            Event::TempFile(TempFileEvent::Created { id, path }) => {
                format!("created {} at {}", id, path.display())
            }
            Event::TempFile(TempFileEvent::Tombstoned { id, deleted_on_ms }) => {
                format!("tombstoned {} at {}", id, format_timestamp(deleted_on_ms))
            }
            Event::TempFile(TempFileEvent::Reclaimed { id, path }) => {
                format!("reclaimed {} ({})", id, path.display())
            }
            Event::TempFile(TempFileEvent::ReclaimFailed { id, path, message }) => {
                format!("failed to reclaim {} ({}): {}", id, path.display(), message)
            }
            Event::TempFile(TempFileEvent::OrphanRemoved { path }) => {
                format!("removed orphan {}", path.display())
            }
            Event::Feed(_) => continue,
        };
        term.write_line(&format!("{} {}", style("·").dim(), style(line).dim())).ok();
    }
}

fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
