//! Day counting and status derivation for records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use time::{Date, OffsetDateTime, Time};

use crate::records::Record;

/// Records left without a hard copy for more than this many days are overdue.
pub const OVERDUE_AFTER_DAYS: i64 = 7;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall clock in the local offset, or UTC when the offset cannot be determined.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Active,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeTrackingEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub date_added: Date,
    pub time_added: Time,
    pub days_since_added: i64,
    pub hours_spent: i64,
    pub status: Status,
    pub last_activity: Date,
}

/// Whole calendar days between `date` and `today`, in either direction.
pub fn days_since(date: Date, today: Date) -> i64 {
    (today - date).whole_days().abs()
}

/// Completion always wins over elapsed time.
pub fn classify(hard_copy_given: bool, days: i64) -> Status {
    if hard_copy_given {
        Status::Completed
    } else if days > OVERDUE_AFTER_DAYS {
        Status::Overdue
    } else {
        Status::Active
    }
}

pub fn hours_spent(days: i64) -> i64 {
    days * 24
}

pub fn format_time_spent(hours: i64) -> String {
    if hours < 24 {
        return format!("{hours} hours");
    }
    let days = hours / 24;
    let remaining = hours % 24;
    if remaining > 0 {
        format!("{days} days {remaining} hours")
    } else {
        format!("{days} days")
    }
}

pub fn time_tracking(records: &[Record], today: Date) -> Vec<TimeTrackingEntry> {
    records
        .iter()
        .map(|record| {
            let days = days_since(record.date_added, today);
            TimeTrackingEntry {
                id: record.id.clone(),
                name: record.name.clone(),
                email: record.email.clone(),
                date_added: record.date_added,
                time_added: record.time_added,
                days_since_added: days,
                hours_spent: hours_spent(days),
                status: classify(record.hard_copy_given, days),
                last_activity: record.date_added,
            }
        })
        .collect()
}
