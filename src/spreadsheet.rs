//! `.xlsx` export and import of records.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use crossbeam_channel::{Receiver, TryRecvError};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::{date, format_description};
use time::{Date, Duration, OffsetDateTime, Time};

use crate::markup::strip_markup;
use crate::records::{new_import_id, yes_no, Record};
use crate::timeline::{days_since, TimeTrackingEntry};

pub const MASTER_FILE_NAME: &str = "master_records.xlsx";

const RECORD_COLUMNS: [&str; 8] = [
    "Name",
    "Number",
    "Email",
    "CNIC",
    "Hard Copy Given",
    "Date Added",
    "Time Added",
    "Notes",
];

const MASTER_COLUMNS: [&str; 9] = [
    "Name",
    "Number",
    "Email",
    "CNIC",
    "Hard Copy Given",
    "Date Added",
    "Time Added",
    "Days Since Added",
    "Notes",
];

const INFO_COLUMNS: [&str; 5] = [
    "File Type",
    "Total Records",
    "Last Updated",
    "Export Date",
    "Export Time",
];

const TRACKING_COLUMNS: [&str; 8] = [
    "Name",
    "Email",
    "Date Added",
    "Time Added",
    "Days Since Added",
    "Hours Spent",
    "Status",
    "Last Activity",
];

const DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_SECONDS: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const FILE_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

/// Day zero of the 1900 date system as spreadsheet applications count it.
const SERIAL_EPOCH: Date = date!(1899 - 12 - 30);

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("no records to export")]
    NoRecords,
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("row {row}: `{value}` is not a valid {column}")]
    InvalidCell {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("failed to write workbook")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to read workbook")]
    Read(#[from] calamine::XlsxError),
    #[error("failed to format timestamp")]
    Format(#[from] time::error::Format),
    #[error("i/o failure on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("import worker stopped before reporting")]
    WorkerGone,
}

pub type Result<T, E = SpreadsheetError> = std::result::Result<T, E>;

enum Cell {
    Text(String),
    Number(f64),
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str],
    rows: impl IntoIterator<Item = Vec<Cell>>,
) -> Result<()> {
    let bold = Format::new().set_bold();
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        sheet.set_column_width(col as u16, 16)?;
    }
    for (idx, row) in rows.into_iter().enumerate() {
        let row_num = idx as u32 + 1;
        for (col, cell) in row.into_iter().enumerate() {
            match cell {
                Cell::Text(text) => sheet.write_string(row_num, col as u16, text)?,
                Cell::Number(number) => sheet.write_number(row_num, col as u16, number)?,
            };
        }
    }
    workbook.push_worksheet(sheet);
    Ok(())
}

fn record_row(record: &Record, with_days: bool) -> Result<Vec<Cell>> {
    let mut row: Vec<Cell> = vec![
        record.name.as_str().into(),
        record.number.as_str().into(),
        record.email.as_str().into(),
        record.cnic.as_str().into(),
        record.hard_copy_label().into(),
        record.date_added.format(DATE)?.into(),
        record.time_added.format(TIME)?.into(),
    ];
    if with_days {
        row.push(record.days_since_added.into());
    }
    row.push(strip_markup(&record.notes).into());
    Ok(row)
}

fn records_workbook(records: &[Record]) -> Result<Workbook> {
    let rows = records
        .iter()
        .map(|record| record_row(record, false))
        .collect::<Result<Vec<_>>>()?;
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, "User Records", &RECORD_COLUMNS, rows)?;
    Ok(workbook)
}

fn save(mut workbook: Workbook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SpreadsheetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    workbook.save(path)?;
    tracing::info!(path = %path.display(), "workbook written");
    Ok(())
}

fn stamped_name(prefix: &str, now: OffsetDateTime) -> Result<String> {
    Ok(format!("{prefix}_{}.xlsx", now.format(FILE_STAMP)?))
}

pub fn export_records(records: &[Record], path: &Path) -> Result<()> {
    if records.is_empty() {
        return Err(SpreadsheetError::NoRecords);
    }
    save(records_workbook(records)?, path)
}

/// Overwrites `master_records.xlsx` in `dir` with every record plus a file-info sheet.
pub fn export_master(records: &[Record], dir: &Path, now: OffsetDateTime) -> Result<PathBuf> {
    if records.is_empty() {
        return Err(SpreadsheetError::NoRecords);
    }
    let rows = records
        .iter()
        .map(|record| record_row(record, true))
        .collect::<Result<Vec<_>>>()?;
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, "Master Records", &MASTER_COLUMNS, rows)?;

    let info: Vec<Cell> = vec![
        "Master Records File".into(),
        (records.len() as i64).into(),
        format!("{} {}", now.format(DATE)?, now.format(TIME_SECONDS)?).into(),
        now.format(DATE)?.into(),
        now.format(TIME)?.into(),
    ];
    write_sheet(&mut workbook, "File Info", &INFO_COLUMNS, [info])?;

    let path = dir.join(MASTER_FILE_NAME);
    save(workbook, &path)?;
    Ok(path)
}

pub fn export_new(records: &[Record], dir: &Path, now: OffsetDateTime) -> Result<PathBuf> {
    if records.is_empty() {
        return Err(SpreadsheetError::NoRecords);
    }
    let path = dir.join(stamped_name("records_backup", now)?);
    save(records_workbook(records)?, &path)?;
    Ok(path)
}

pub fn export_time_tracking(
    entries: &[TimeTrackingEntry],
    dir: &Path,
    now: OffsetDateTime,
) -> Result<PathBuf> {
    if entries.is_empty() {
        return Err(SpreadsheetError::NoRecords);
    }
    let rows = entries
        .iter()
        .map(|entry| -> Result<Vec<Cell>> {
            Ok(vec![
                entry.name.as_str().into(),
                entry.email.as_str().into(),
                entry.date_added.format(DATE)?.into(),
                entry.time_added.format(TIME)?.into(),
                entry.days_since_added.into(),
                entry.hours_spent.into(),
                entry.status.to_string().into(),
                entry.last_activity.format(DATE)?.into(),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, "Time Tracking", &TRACKING_COLUMNS, rows)?;
    let path = dir.join(stamped_name("time_tracking", now)?);
    save(workbook, &path)?;
    Ok(path)
}

pub fn import_records(path: &Path, today: Date) -> Result<Vec<Record>> {
    let bytes = fs::read(path).map_err(|source| SpreadsheetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = import_from_bytes(bytes, today)?;
    tracing::info!(path = %path.display(), count = records.len(), "workbook imported");
    Ok(records)
}

/// Parses the first sheet. Unknown columns are ignored; a bad date or time cell
/// rejects the whole workbook.
pub fn import_from_bytes(bytes: Vec<u8>, today: Date) -> Result<Vec<Record>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;
    let range = workbook.worksheet_range(&first)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::locate(header);

    let mut records = Vec::new();
    for (idx, row) in rows.enumerate() {
        if row.iter().all(is_blank) {
            continue;
        }
        // header is row 1, first data row is row 2
        records.push(columns.record(row, idx + 2, today)?);
    }
    Ok(records)
}

#[derive(Debug, Default)]
struct Columns {
    name: Option<usize>,
    number: Option<usize>,
    email: Option<usize>,
    cnic: Option<usize>,
    hard_copy: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn locate(header: &[Data]) -> Self {
        let mut columns = Self::default();
        for (idx, cell) in header.iter().enumerate() {
            let slot = match cell_text(cell).trim() {
                "Name" => &mut columns.name,
                "Number" => &mut columns.number,
                "Email" => &mut columns.email,
                "CNIC" => &mut columns.cnic,
                "Hard Copy Given" => &mut columns.hard_copy,
                "Date Added" => &mut columns.date,
                "Time Added" => &mut columns.time,
                "Notes" => &mut columns.notes,
                _ => continue,
            };
            slot.get_or_insert(idx);
        }
        columns
    }

    fn record(&self, row: &[Data], row_num: usize, today: Date) -> Result<Record> {
        let cell = |col: Option<usize>| col.and_then(|idx| row.get(idx)).filter(|c| !is_blank(c));
        let text = |col: Option<usize>| cell(col).map(cell_text).unwrap_or_default();

        let date_added = match cell(self.date) {
            Some(value) => parse_date(value).ok_or_else(|| SpreadsheetError::InvalidCell {
                row: row_num,
                column: "Date Added",
                value: cell_text(value),
            })?,
            None => today,
        };
        let time_added = match cell(self.time) {
            Some(value) => parse_time(value).ok_or_else(|| SpreadsheetError::InvalidCell {
                row: row_num,
                column: "Time Added",
                value: cell_text(value),
            })?,
            None => Time::MIDNIGHT,
        };

        Ok(Record {
            id: new_import_id(),
            name: text(self.name),
            number: text(self.number),
            email: text(self.email),
            cnic: text(self.cnic),
            hard_copy_given: text(self.hard_copy) == yes_no(true),
            date_added,
            time_added,
            notes: text(self.notes),
            days_since_added: days_since(date_added, today),
        })
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::Error(err) => err.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_date(cell: &Data) -> Option<Date> {
    match cell {
        Data::DateTime(dt) => serial_date(dt.as_f64()),
        Data::Float(f) => serial_date(*f),
        Data::Int(i) => serial_date(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            let day = s.get(..10).unwrap_or(s);
            Date::parse(day, DATE).ok()
        }
        _ => None,
    }
}

fn parse_time(cell: &Data) -> Option<Time> {
    match cell {
        Data::DateTime(dt) => serial_time(dt.as_f64()),
        Data::Float(f) => serial_time(*f),
        Data::String(s) => {
            let s = s.trim();
            Time::parse(s, TIME)
                .or_else(|_| Time::parse(s, TIME_SECONDS))
                .ok()
        }
        _ => None,
    }
}

fn serial_date(serial: f64) -> Option<Date> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    SERIAL_EPOCH.checked_add(Duration::days(serial.floor() as i64))
}

fn serial_time(serial: f64) -> Option<Time> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let seconds = (serial.fract() * 86_400.0).round() as u32 % 86_400;
    Time::from_hms((seconds / 3600) as u8, (seconds / 60 % 60) as u8, 0).ok()
}

/// A workbook import running on a worker thread.
#[derive(Debug)]
pub struct ImportJob {
    path: PathBuf,
    rx: Receiver<Result<Vec<Record>>>,
    finished: bool,
}

impl ImportJob {
    pub fn spawn(path: PathBuf, today: Date) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let worker_path = path.clone();
        thread::spawn(move || {
            let result = import_records(&worker_path, today);
            if tx.send(result).is_err() {
                tracing::debug!(path = %worker_path.display(), "import result dropped");
            }
        });
        Self {
            path,
            rx,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` while the worker is still reading; the result is handed out once.
    pub fn try_finish(&mut self) -> Option<Result<Vec<Record>>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(SpreadsheetError::WorkerGone))
            }
        }
    }
}
