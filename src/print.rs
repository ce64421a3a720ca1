//! Printable single-record HTML documents.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::markup::{escape_html, sanitize_html};
use crate::records::{date_label, Record};

const STYLE: &str = "\
body { font-family: Arial, sans-serif; padding: 20px; }
.header { border-bottom: 2px solid #3B82F6; margin-bottom: 20px; padding-bottom: 10px; }
.field { margin: 10px 0; }
.label { font-weight: bold; color: #374151; }
.value { margin-left: 10px; }
.notes { margin-top: 20px; padding: 15px; background: #F9FAFB; border-radius: 8px; }";

pub fn render_document(record: &Record) -> String {
    let date = date_label(record.date_added);
    let fields = [
        ("Name", record.name.as_str()),
        ("Number", record.number.as_str()),
        ("Email", record.email.as_str()),
        ("CNIC", record.cnic.as_str()),
        ("Hard Copy Given", record.hard_copy_label()),
        ("Date Added", date.as_str()),
    ];
    let notes = if record.notes.trim().is_empty() {
        "No notes available".to_string()
    } else {
        sanitize_html(&record.notes)
    };

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>User Record - {}</title>\n<style>\n{STYLE}\n</style>\n</head>\n\
         <body onload=\"window.print()\">\n<div class=\"header\"><h1>User Record</h1></div>\n",
        escape_html(&record.name)
    );
    for (label, value) in fields {
        let _ = writeln!(
            html,
            "<div class=\"field\"><span class=\"label\">{label}:</span> \
             <span class=\"value\">{}</span></div>",
            escape_html(value)
        );
    }
    let _ = write!(
        html,
        "<div class=\"notes\"><div class=\"label\">Notes:</div>\
         <div class=\"value\">{notes}</div></div>\n</body>\n</html>\n"
    );
    html
}

/// File name safe on every platform: alphanumerics kept, everything else `_`.
pub fn document_file_name(record: &Record) -> String {
    let stem: String = record
        .name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if !stem.chars().any(char::is_alphanumeric) {
        format!("record_{}.html", record.id)
    } else {
        format!("record_{stem}.html")
    }
}

pub fn write_document(record: &Record, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(document_file_name(record));
    fs::write(&path, render_document(record))
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(record_id = %record.id, path = %path.display(), "print document written");
    Ok(path)
}

/// Writes the document and hands it to the platform opener when `open` is set.
pub fn print_record(record: &Record, dir: &Path, open: bool) -> Result<PathBuf> {
    let path = write_document(record, dir)?;
    if open {
        open_in_viewer(&path);
    }
    Ok(path)
}

/// Blocks until the platform launcher has handed the file off and exited.
fn open_in_viewer(path: &Path) {
    if let Err(err) = open::that(path) {
        tracing::debug!(?err, path = %path.display(), "could not open print document");
    }
}
