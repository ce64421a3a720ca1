use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::storage;
use crate::store::RecordStore;
use crate::timeline::SystemClock;

pub mod commands;

use self::commands::{
    AddArgs, ClearArgs, DeleteArgs, EditArgs, ExportArgs, ImportArgs, ListArgs, PrintArgs,
    SearchArgs, ShowArgs, TrackArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "recdesk",
    version,
    about = "Local record keeping with spreadsheet import and export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RECDESK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RECDESK_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Register a new record
    Add(AddArgs),
    /// Print records, newest first
    List(ListArgs),
    /// Print every field of one record
    Show(ShowArgs),
    /// Change fields of an existing record
    Edit(EditArgs),
    /// Remove a record
    Delete(DeleteArgs),
    /// Search and filter records
    Search(SearchArgs),
    /// Time tracking overview with status and elapsed time
    Track(TrackArgs),
    /// Show today's milestone notifications
    Notify,
    /// Write records to an xlsx workbook
    Export(ExportArgs),
    /// Append records from an xlsx workbook
    Import(ImportArgs),
    /// Write a printable HTML document for one record
    Print(PrintArgs),
    /// Remove every record
    Clear(ClearArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("RECDESK_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("RECDESK_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let kv = storage::init(loader.paths(), &config.storage)?;
    let mut store = RecordStore::open(
        kv,
        config.storage.storage_key.clone(),
        Arc::new(SystemClock),
    );

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config, store);
            commands::run_tui(&mut app)
        }
        Commands::Add(args) => commands::add_record(&mut store, args),
        Commands::List(args) => commands::list_records(&store, args),
        Commands::Show(args) => commands::show_record(&store, args),
        Commands::Edit(args) => commands::edit_record(&mut store, args),
        Commands::Delete(args) => commands::delete_record(&mut store, args),
        Commands::Search(args) => commands::search_records(&config, &store, args),
        Commands::Track(args) => commands::track_records(&config, &store, args),
        Commands::Notify => commands::show_notifications(&store),
        Commands::Export(args) => commands::export_records(&config, &store, args),
        Commands::Import(args) => commands::import_records(&mut store, args),
        Commands::Print(args) => commands::print_record(&config, &store, args),
        Commands::Clear(args) => commands::clear_records(&mut store, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::parse_from(["recdesk"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn export_targets_are_exclusive() {
        assert!(Cli::try_parse_from(["recdesk", "export", "--master", "--new"]).is_err());
        let cli = Cli::parse_from(["recdesk", "export", "--new"]);
        assert_matches!(cli.command, Some(Commands::Export(args)) if args.new && !args.master);
    }

    #[test]
    fn search_flags_parse_into_filters() {
        let cli = Cli::parse_from([
            "recdesk",
            "search",
            "khan",
            "--scope",
            "name",
            "--hard-copy",
            "not-given",
            "--from",
            "2024-01-01",
        ]);
        assert_matches!(
            cli.command,
            Some(Commands::Search(args))
                if args.term == vec!["khan".to_string()]
                    && args.scope == crate::views::SearchScope::Name
                    && args.hard_copy == crate::views::HardCopyFilter::NotGiven
                    && args.from.is_some()
        );
    }
}
