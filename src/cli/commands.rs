use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};
use time::{Date, OffsetDateTime};

use crate::app::App;
use crate::config::AppConfig;
use crate::markup::strip_markup;
use crate::notify;
use crate::print;
use crate::records::{date_label, parse_date_label, time_label, Record, RecordDraft, RecordPatch};
use crate::spreadsheet::{self, SpreadsheetError};
use crate::storage::KeyValueStore;
use crate::store::RecordStore;
use crate::timeline::{format_time_spent, time_tracking, Status, TimeTrackingEntry};
use crate::views::{
    newest_first, HardCopyFilter, RecordFilter, SearchScope, SortOrder, TimeTrackingQuery,
    TimeTrackingSort, TimeTrackingStats,
};

#[derive(Args, Debug, Clone, Default)]
pub struct AddArgs {
    /// Full name (prompted if omitted)
    #[arg(long)]
    pub name: Option<String>,
    /// Contact number (prompted if omitted)
    #[arg(long)]
    pub number: Option<String>,
    /// Email address (prompted if omitted)
    #[arg(long)]
    pub email: Option<String>,
    /// Identity number (prompted if omitted)
    #[arg(long)]
    pub cnic: Option<String>,
    /// Mark the hard copy as already received
    #[arg(long)]
    pub hard_copy: bool,
    /// Notes; read from stdin when omitted and stdin is piped
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Print at most this many records, newest first
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Record identifier
    pub id: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Record identifier
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub cnic: Option<String>,
    /// Set the hard copy flag (true or false)
    #[arg(long)]
    pub hard_copy: Option<bool>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Record identifier
    pub id: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Case-insensitive text to look for
    #[arg()]
    pub term: Vec<String>,
    /// Field the term applies to (all, name, email, cnic)
    #[arg(long, default_value_t = SearchScope::All)]
    pub scope: SearchScope,
    /// Hard copy status (all, given, not-given)
    #[arg(long, default_value_t = HardCopyFilter::All)]
    pub hard_copy: HardCopyFilter,
    /// Earliest date added, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<Date>,
    /// Latest date added, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<Date>,
    /// Limit the number of results printed (defaults to search.max_results)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Also export the matches to a timestamped workbook
    #[arg(long)]
    pub export: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TrackArgs {
    /// Only show one status (active, completed, overdue)
    #[arg(long)]
    pub status: Option<Status>,
    /// Sort key (name, days, status); defaults to time_tracking.default_sort
    #[arg(long)]
    pub sort: Option<TimeTrackingSort>,
    /// Sort direction (asc, desc); defaults to time_tracking.default_order
    #[arg(long)]
    pub order: Option<SortOrder>,
    /// Also export the rows to a time tracking workbook
    #[arg(long)]
    pub export: bool,
}

#[derive(Args, Debug, Clone, Default)]
#[command(group(ArgGroup::new("target").args(["master", "new", "path"])))]
pub struct ExportArgs {
    /// Overwrite master_records.xlsx in the export directory (default)
    #[arg(long)]
    pub master: bool,
    /// Write a timestamped backup workbook
    #[arg(long)]
    pub new: bool,
    /// Write a single-sheet workbook to this path
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Workbook to read (first sheet only)
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PrintArgs {
    /// Record identifier
    pub id: String,
    /// Write the document without opening it
    #[arg(long)]
    pub no_open: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClearArgs {
    /// Confirm removal of every record
    #[arg(long)]
    pub yes: bool,
}

fn parse_date_arg(raw: &str) -> Result<Date, String> {
    parse_date_label(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got `{raw}`"))
}

pub fn run_tui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    app.run()
}

pub fn add_record<S: KeyValueStore>(store: &mut RecordStore<S>, args: AddArgs) -> Result<()> {
    let mut draft = RecordDraft {
        name: value_or_prompt(args.name, "Name")?,
        number: value_or_prompt(args.number, "Number")?,
        email: value_or_prompt(args.email, "Email")?,
        cnic: value_or_prompt(args.cnic, "CNIC")?,
        hard_copy_given: args.hard_copy,
        notes: String::new(),
    };
    draft.notes = match args.notes {
        Some(notes) => notes,
        None => read_stdin()?.unwrap_or_default(),
    };
    print!("{}", create_record(store, draft)?);
    Ok(())
}

fn create_record<S: KeyValueStore>(store: &mut RecordStore<S>, draft: RecordDraft) -> Result<String> {
    draft.validate().context("record not saved")?;
    let record = store.add(draft);
    Ok(format!("Added {} ({})\n", record.id, record.name))
}

pub fn list_records<S: KeyValueStore>(store: &RecordStore<S>, args: ListArgs) -> Result<()> {
    print!("{}", render_list(store.records(), args.limit));
    Ok(())
}

fn render_list(records: &[Record], limit: Option<usize>) -> String {
    let ordered = newest_first(records);
    let shown = limit.unwrap_or(ordered.len());
    format_records(ordered.into_iter().take(shown))
}

pub fn show_record<S: KeyValueStore>(store: &RecordStore<S>, args: ShowArgs) -> Result<()> {
    let Some(record) = store.get(&args.id) else {
        bail!("record {} not found", args.id);
    };
    print!("{}", render_detail(record));
    Ok(())
}

fn render_detail(record: &Record) -> String {
    let notes = strip_markup(&record.notes);
    let mut out = String::new();
    let _ = writeln!(out, "{}", record.id);
    for (label, value) in [
        ("Name", record.name.as_str()),
        ("Number", record.number.as_str()),
        ("Email", record.email.as_str()),
        ("CNIC", record.cnic.as_str()),
        ("Hard copy", record.hard_copy_label()),
    ] {
        let _ = writeln!(out, "  {label:<12}{value}");
    }
    let _ = writeln!(
        out,
        "  {:<12}{} {} ({})",
        "Added",
        date_label(record.date_added),
        time_label(record.time_added),
        day_count(record.days_since_added)
    );
    let notes = notes.trim();
    let _ = writeln!(
        out,
        "  {:<12}{}",
        "Notes",
        if notes.is_empty() { "-" } else { notes }
    );
    out
}

pub fn edit_record<S: KeyValueStore>(store: &mut RecordStore<S>, args: EditArgs) -> Result<()> {
    print!("{}", apply_edit(store, args)?);
    Ok(())
}

fn apply_edit<S: KeyValueStore>(store: &mut RecordStore<S>, args: EditArgs) -> Result<String> {
    let Some(record) = store.get(&args.id) else {
        bail!("record {} not found", args.id);
    };
    let patch = RecordPatch {
        name: args.name,
        number: args.number,
        email: args.email,
        cnic: args.cnic,
        hard_copy_given: args.hard_copy,
        notes: args.notes,
    };
    if patch.is_empty() {
        return Ok(format!("Nothing to change for {}\n", args.id));
    }
    let mut preview = record.clone();
    preview.apply(patch.clone());
    preview.to_draft().validate().context("record not saved")?;

    store.update(&args.id, patch);
    Ok(format!("Updated {}\n", args.id))
}

pub fn delete_record<S: KeyValueStore>(store: &mut RecordStore<S>, args: DeleteArgs) -> Result<()> {
    if store.delete(&args.id) {
        println!("Deleted {}", args.id);
    } else {
        println!("No record with id {}", args.id);
    }
    Ok(())
}

pub fn search_records<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: SearchArgs,
) -> Result<()> {
    let output = run_search(config, store, &args)?;
    print!("{output}");
    Ok(())
}

fn run_search<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: &SearchArgs,
) -> Result<String> {
    let filter = RecordFilter {
        term: args.term.join(" ").trim().to_string(),
        scope: args.scope,
        hard_copy: args.hard_copy,
        date_from: args.from,
        date_to: args.to,
    };
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            bail!("--from {} is after --to {}", date_label(from), date_label(to));
        }
    }
    let matches = filter.apply(store.records());
    let limit = args.limit.unwrap_or(config.search.max_results);

    let mut out = format!(
        "{} of {} records match ({} active filters)\n",
        matches.len(),
        store.len(),
        filter.active_filter_count()
    );
    if !matches.is_empty() {
        out.push_str(&format_records(matches.iter().copied().take(limit)));
    }
    if args.export {
        let owned: Vec<Record> = matches.into_iter().cloned().collect();
        out.push_str(&export_outcome(spreadsheet::export_new(
            &owned,
            &config.export.export_dir,
            store.clock().now(),
        ))?);
    }
    Ok(out)
}

pub fn track_records<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: TrackArgs,
) -> Result<()> {
    print!("{}", run_track(config, store, &args)?);
    Ok(())
}

fn run_track<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: &TrackArgs,
) -> Result<String> {
    let query = TimeTrackingQuery {
        status: args.status,
        sort: args.sort.unwrap_or(config.time_tracking.default_sort),
        order: args.order.unwrap_or(config.time_tracking.default_order),
    };
    let entries = query.apply(&time_tracking(store.records(), store.clock().today()));
    let stats = TimeTrackingStats::compute(&entries);

    let mut out = format!(
        "{} records: {} active, {} completed, {} overdue, average {}\n",
        stats.total,
        stats.active,
        stats.completed,
        stats.overdue,
        day_count(stats.avg_days)
    );
    for entry in &entries {
        let _ = writeln!(out, "{}", format_entry(entry));
    }
    if args.export {
        out.push_str(&export_outcome(spreadsheet::export_time_tracking(
            &entries,
            &config.export.export_dir,
            store.clock().now(),
        ))?);
    }
    Ok(out)
}

fn format_entry(entry: &TimeTrackingEntry) -> String {
    format!(
        "{:<10}{:<24}{:<32}{} {}  {}",
        entry.status.to_string(),
        entry.name,
        entry.email,
        date_label(entry.date_added),
        time_label(entry.time_added),
        format_time_spent(entry.hours_spent)
    )
}

pub fn show_notifications<S: KeyValueStore>(store: &RecordStore<S>) -> Result<()> {
    print!("{}", render_notifications(store.records(), store.clock().now()));
    Ok(())
}

fn render_notifications(records: &[Record], now: OffsetDateTime) -> String {
    let notes = notify::generate(records, now);
    if notes.is_empty() {
        return "No notifications.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(out, "[{}] {}: {}", note.kind, note.title, note.message);
    }
    out
}

pub fn export_records<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: ExportArgs,
) -> Result<()> {
    print!("{}", run_export(config, store, args)?);
    Ok(())
}

fn run_export<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: ExportArgs,
) -> Result<String> {
    let records = store.records();
    let dir = &config.export.export_dir;
    let now = store.clock().now();
    let outcome = if let Some(path) = args.path {
        spreadsheet::export_records(records, &path).map(|()| path)
    } else if args.new {
        spreadsheet::export_new(records, dir, now)
    } else {
        spreadsheet::export_master(records, dir, now)
    };
    export_outcome(outcome)
}

/// An empty export is an advisory, not a failure.
fn export_outcome(outcome: Result<PathBuf, SpreadsheetError>) -> Result<String> {
    match outcome {
        Ok(path) => Ok(format!("Exported to {}\n", path.display())),
        Err(SpreadsheetError::NoRecords) => Ok("No records to export.\n".to_string()),
        Err(err) => Err(err).context("exporting workbook"),
    }
}

pub fn import_records<S: KeyValueStore>(store: &mut RecordStore<S>, args: ImportArgs) -> Result<()> {
    print!("{}", run_import(store, &args)?);
    Ok(())
}

fn run_import<S: KeyValueStore>(store: &mut RecordStore<S>, args: &ImportArgs) -> Result<String> {
    let records = spreadsheet::import_records(&args.file, store.clock().today())
        .with_context(|| format!("importing {}", args.file.display()))?;
    let count = store.import_many(records);
    Ok(format!(
        "Imported {count} record{} from {}\n",
        if count == 1 { "" } else { "s" },
        args.file.display()
    ))
}

pub fn print_record<S: KeyValueStore>(
    config: &AppConfig,
    store: &RecordStore<S>,
    args: PrintArgs,
) -> Result<()> {
    let Some(record) = store.get(&args.id) else {
        bail!("record {} not found", args.id);
    };
    let open = config.export.open_printed && !args.no_open;
    let path = print::print_record(record, &config.export.print_dir, open)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn clear_records<S: KeyValueStore>(store: &mut RecordStore<S>, args: ClearArgs) -> Result<()> {
    if !args.yes {
        bail!("refusing to remove {} records without --yes", store.len());
    }
    let count = store.len();
    store.clear();
    println!("Removed {count} records");
    Ok(())
}

fn format_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{:<24}{:<28}{:<18}{} {}  {:<4}{}",
            record.name,
            record.email,
            record.cnic,
            date_label(record.date_added),
            time_label(record.time_added),
            record.hard_copy_label(),
            record.id
        );
    }
    if out.is_empty() {
        out.push_str("No records.\n");
    }
    out
}

fn day_count(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLoader, ConfigPaths};
    use crate::storage::{self, SqliteKv};
    use crate::timeline::{Clock, FixedClock};
    use std::sync::Arc;
    use tempfile::TempDir;
    use time::macros::{date, datetime, time};

    type TestResult<T = ()> = Result<T>;

    const NOW: OffsetDateTime = datetime!(2024-05-10 09:30 UTC);

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NOW))
    }

    fn seeded(name: &str, id: &str, date: Date, given: bool) -> Record {
        let mut draft = RecordDraft::sample(name);
        draft.hard_copy_given = given;
        draft.into_record(id.into(), date, time!(09:00))
    }

    fn setup_storage() -> TestResult<(TempDir, AppConfig, RecordStore<SqliteKv>)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let root = temp.path();
        let paths = ConfigPaths::rooted(
            root.join("config"),
            root.join("config/config.toml"),
            root.join("data"),
            root.join("state"),
        );
        let config = ConfigLoader::from_paths(paths.clone()).load_or_init()?;
        let kv = storage::init(&paths, &config.storage)?;
        let mut store = RecordStore::open(kv, config.storage.storage_key.clone(), fixed_clock());
        store.import_many(vec![
            seeded("Amir Sohail", "record-a", date!(2024 - 05 - 10), false),
            seeded("Bushra Ansari", "record-b", date!(2024 - 05 - 02), true),
            seeded("Kashif Iqbal", "record-c", date!(2024 - 04 - 30), false),
        ]);
        store.refresh_derived();
        Ok((temp, config, store))
    }

    #[test]
    fn cli_list_prints_newest_first() -> TestResult {
        let (_temp, _config, store) = setup_storage()?;
        insta::assert_snapshot!(render_list(store.records(), Some(2)), @r###"
        Amir Sohail             amir.sohail@example.com     35202-1234567-1   2024-05-10 09:00  No  record-a
        Bushra Ansari           bushra.ansari@example.com   35202-1234567-1   2024-05-02 09:00  Yes record-b
        "###);
        Ok(())
    }

    #[test]
    fn cli_show_renders_details() -> TestResult {
        let (_temp, _config, store) = setup_storage()?;
        let record = store.get("record-c").context("seeded record")?;
        insta::assert_snapshot!(render_detail(record), @r###"
        record-c
          Name        Kashif Iqbal
          Number      0300-1234567
          Email       kashif.iqbal@example.com
          CNIC        35202-1234567-1
          Hard copy   No
          Added       2024-04-30 09:00 (10 days)
          Notes       -
        "###);
        Ok(())
    }

    #[test]
    fn cli_add_rejects_invalid_drafts() -> TestResult {
        let (_temp, _config, mut store) = setup_storage()?;
        let mut draft = RecordDraft::sample("Nida");
        draft.email = "nida".into();
        let err = create_record(&mut store, draft).unwrap_err();
        assert!(format!("{err:#}").contains("Email is invalid"));
        assert_eq!(store.len(), 3);

        let output = create_record(&mut store, RecordDraft::sample("Nida"))?;
        assert!(output.starts_with("Added record-"));
        assert_eq!(store.len(), 4);
        Ok(())
    }

    #[test]
    fn cli_edit_validates_merged_record() -> TestResult {
        let (_temp, _config, mut store) = setup_storage()?;
        let blank_name = EditArgs {
            id: "record-a".into(),
            name: Some("  ".into()),
            ..EditArgs::default()
        };
        assert!(apply_edit(&mut store, blank_name).is_err());

        let toggle = EditArgs {
            id: "record-a".into(),
            hard_copy: Some(true),
            ..EditArgs::default()
        };
        assert_eq!(apply_edit(&mut store, toggle)?, "Updated record-a\n");
        let record = store.get("record-a").context("record")?;
        assert!(record.hard_copy_given);
        assert_eq!(record.name, "Amir Sohail");
        Ok(())
    }

    #[test]
    fn cli_search_applies_filters() -> TestResult {
        let (_temp, config, store) = setup_storage()?;
        let args = SearchArgs {
            term: vec!["ansari".into()],
            ..SearchArgs::default()
        };
        let output = run_search(&config, &store, &args)?;
        assert!(output.starts_with("1 of 3 records match (1 active filters)"));
        assert!(output.contains("Bushra Ansari"));

        let args = SearchArgs {
            hard_copy: HardCopyFilter::NotGiven,
            from: Some(date!(2024 - 05 - 01)),
            ..SearchArgs::default()
        };
        let output = run_search(&config, &store, &args)?;
        assert!(output.contains("Amir Sohail"));
        assert!(!output.contains("Kashif Iqbal"));
        Ok(())
    }

    #[test]
    fn cli_search_rejects_inverted_range() -> TestResult {
        let (_temp, config, store) = setup_storage()?;
        let args = SearchArgs {
            from: Some(date!(2024 - 05 - 10)),
            to: Some(date!(2024 - 05 - 01)),
            ..SearchArgs::default()
        };
        assert!(run_search(&config, &store, &args).is_err());
        Ok(())
    }

    #[test]
    fn cli_track_summarizes_statuses() -> TestResult {
        let (_temp, config, store) = setup_storage()?;
        let output = run_track(&config, &store, &TrackArgs::default())?;
        insta::assert_snapshot!(output, @r###"
        3 records: 1 active, 1 completed, 1 overdue, average 6 days
        overdue   Kashif Iqbal            kashif.iqbal@example.com        2024-04-30 09:00  10 days
        completed Bushra Ansari           bushra.ansari@example.com       2024-05-02 09:00  8 days
        active    Amir Sohail             amir.sohail@example.com         2024-05-10 09:00  0 hours
        "###);
        Ok(())
    }

    #[test]
    fn cli_export_reports_empty_store_as_advisory() -> TestResult {
        let (_temp, config, mut store) = setup_storage()?;
        store.clear();
        let output = run_export(&config, &store, ExportArgs::default())?;
        assert_eq!(output, "No records to export.\n");
        assert_eq!(std::fs::read_dir(&config.export.export_dir)?.count(), 0);
        Ok(())
    }

    #[test]
    fn cli_export_then_import_appends_copies() -> TestResult {
        let (_temp, config, mut store) = setup_storage()?;
        let output = run_export(&config, &store, ExportArgs::default())?;
        let path = config.export.export_dir.join(spreadsheet::MASTER_FILE_NAME);
        assert_eq!(output, format!("Exported to {}\n", path.display()));

        let output = run_import(&mut store, &ImportArgs { file: path })?;
        assert!(output.starts_with("Imported 3 records"));
        assert_eq!(store.len(), 6);
        assert_eq!(
            store
                .records()
                .iter()
                .filter(|r| r.id.starts_with("imported-"))
                .count(),
            3
        );
        Ok(())
    }

    #[test]
    fn cli_notify_lists_milestones() -> TestResult {
        let (_temp, _config, store) = setup_storage()?;
        assert_eq!(
            render_notifications(store.records(), NOW),
            "No notifications.\n"
        );
        let records = vec![seeded("Hamza", "record-h", date!(2024 - 05 - 03), false)];
        insta::assert_snapshot!(render_notifications(&records, NOW), @r###"
        [warning] 1 Week Overdue: Hamza - 7 days completed, hard copy still pending!
        "###);
        Ok(())
    }

    #[test]
    fn cli_clear_requires_confirmation() -> TestResult {
        let (_temp, _config, mut store) = setup_storage()?;
        assert!(clear_records(&mut store, ClearArgs { yes: false }).is_err());
        assert_eq!(store.len(), 3);
        clear_records(&mut store, ClearArgs { yes: true })?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn date_arguments_parse_iso_days() {
        assert_eq!(parse_date_arg("2024-02-29"), Ok(date!(2024 - 02 - 29)));
        assert!(parse_date_arg("29/02/2024").is_err());
    }
}
