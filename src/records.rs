//! The record entity and the field-level rules around it.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};
use thiserror::Error;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Time};
use uuid::Uuid;

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");
time::serde::format_description!(time_format, Time, "[hour]:[minute]");

const DATE_LABEL: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_LABEL: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub name: String,
    pub number: String,
    pub email: String,
    pub cnic: String,
    pub hard_copy_given: bool,
    #[serde(with = "date_format")]
    pub date_added: Date,
    #[serde(with = "time_format")]
    pub time_added: Time,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub days_since_added: i64,
}

impl Record {
    /// Applies every field present in `patch`. Identity and creation stamps are
    /// not part of a patch.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(number) = patch.number {
            self.number = number;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(cnic) = patch.cnic {
            self.cnic = cnic;
        }
        if let Some(given) = patch.hard_copy_given {
            self.hard_copy_given = given;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }

    pub fn hard_copy_label(&self) -> &'static str {
        yes_no(self.hard_copy_given)
    }

    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            name: self.name.clone(),
            number: self.number.clone(),
            email: self.email.clone(),
            cnic: self.cnic.clone(),
            hard_copy_given: self.hard_copy_given,
            notes: self.notes.clone(),
        }
    }
}

pub fn date_label(date: Date) -> String {
    date.format(DATE_LABEL).unwrap_or_else(|_| date.to_string())
}

/// Parses the `YYYY-MM-DD` form produced by [`date_label`].
pub fn parse_date_label(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_LABEL).ok()
}

pub fn time_label(time: Time) -> String {
    time.format(TIME_LABEL).unwrap_or_else(|_| time.to_string())
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// User-editable fields of a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub name: String,
    pub number: String,
    pub email: String,
    pub cnic: String,
    pub hard_copy_given: bool,
    pub notes: String,
}

impl RecordDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.trim().is_empty() {
            errors.insert(Field::Name, "Name is required");
        }
        if self.number.trim().is_empty() {
            errors.insert(Field::Number, "Number is required");
        }
        if self.email.trim().is_empty() {
            errors.insert(Field::Email, "Email is required");
        } else if !EMAIL.is_match(&self.email) {
            errors.insert(Field::Email, "Email is invalid");
        }
        if self.cnic.trim().is_empty() {
            errors.insert(Field::Cnic, "CNIC is required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn into_record(self, id: String, date_added: Date, time_added: Time) -> Record {
        Record {
            id,
            name: self.name,
            number: self.number,
            email: self.email,
            cnic: self.cnic,
            hard_copy_given: self.hard_copy_given,
            date_added,
            time_added,
            notes: self.notes,
            days_since_added: 0,
        }
    }

    /// Patch that overwrites every editable field with this draft's values.
    pub fn into_patch(self) -> RecordPatch {
        RecordPatch {
            name: Some(self.name),
            number: Some(self.number),
            email: Some(self.email),
            cnic: Some(self.cnic),
            hard_copy_given: Some(self.hard_copy_given),
            notes: Some(self.notes),
        }
    }

    #[cfg(test)]
    pub(crate) fn sample(name: &str) -> Self {
        Self {
            name: name.to_string(),
            number: "0300-1234567".to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            cnic: "35202-1234567-1".to_string(),
            hard_copy_given: false,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub number: Option<String>,
    pub email: Option<String>,
    pub cnic: Option<String>,
    pub hard_copy_given: Option<bool>,
    pub notes: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum Field {
    Name,
    Number,
    Email,
    #[strum(serialize = "CNIC")]
    Cnic,
}

/// Field-level validation failures, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summarize(.fields))]
pub struct ValidationErrors {
    fields: IndexMap<Field, String>,
}

impl ValidationErrors {
    fn insert(&mut self, field: Field, message: &str) {
        self.fields.insert(field, message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, msg)| (*field, msg.as_str()))
    }
}

fn summarize(fields: &IndexMap<Field, String>) -> String {
    fields.values().cloned().collect::<Vec<_>>().join("; ")
}

pub fn new_record_id() -> String {
    format!("record-{}", Uuid::new_v4().simple())
}

pub fn new_import_id() -> String {
    format!("imported-{}", Uuid::new_v4().simple())
}
