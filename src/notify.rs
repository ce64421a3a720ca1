//! Milestone advisories derived from record age.
//!
//! Each milestone is a single-day bucket, so a record is flagged only on the day it
//! crosses the threshold. Nothing is persisted; callers are expected to generate
//! at most once per calendar day.

use strum::{Display, EnumIter};
use time::OffsetDateTime;

use crate::records::Record;
use crate::timeline::days_since;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: OffsetDateTime,
    pub read: bool,
    pub record_id: Option<String>,
}

impl Notification {
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

pub fn generate(records: &[Record], now: OffsetDateTime) -> Vec<Notification> {
    let today = now.date();
    let mut out = Vec::new();
    for record in records {
        let days = days_since(record.date_added, today);
        let pending = !record.hard_copy_given;
        let make = |prefix: &str, kind, title: &str, message: String| Notification {
            id: format!("{prefix}-{}", record.id),
            kind,
            title: title.to_string(),
            message,
            timestamp: now,
            read: false,
            record_id: Some(record.id.clone()),
        };

        if (1..2).contains(&days) && pending {
            out.push(make(
                "day1",
                NotificationKind::Info,
                "1 Day Completed",
                format!(
                    "{} completed 1 day since registration. Hard copy status: Pending",
                    record.name
                ),
            ));
        }
        if (7..8).contains(&days) && pending {
            out.push(make(
                "week1",
                NotificationKind::Warning,
                "1 Week Overdue",
                format!("{} - 7 days completed, hard copy still pending!", record.name),
            ));
        }
        if (30..31).contains(&days) {
            let (kind, status) = if pending {
                (NotificationKind::Error, "Still Pending")
            } else {
                (NotificationKind::Success, "Completed")
            };
            out.push(make(
                "month1",
                kind,
                "1 Month Milestone",
                format!("{} - 30 days completed. Status: {status}", record.name),
            ));
        }
    }
    if !out.is_empty() {
        tracing::debug!(count = out.len(), "generated notifications");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordDraft;
    use time::macros::{datetime, time};
    use time::Duration;

    fn aged(name: &str, days: i64, given: bool, now: OffsetDateTime) -> Record {
        let mut draft = RecordDraft::sample(name);
        draft.hard_copy_given = given;
        draft.into_record(
            format!("record-{name}"),
            now.date() - Duration::days(days),
            time!(09:00),
        )
    }

    #[test]
    fn flags_each_milestone_once() {
        let now = datetime!(2024-06-15 12:00 UTC);
        let records = vec![
            aged("zero", 0, false, now),
            aged("one", 1, false, now),
            aged("two", 2, false, now),
            aged("seven", 7, false, now),
            aged("eight", 8, false, now),
            aged("thirty", 30, false, now),
        ];
        let notes = generate(&records, now);
        let ids: Vec<_> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["day1-record-one", "week1-record-seven", "month1-record-thirty"]
        );
        assert_eq!(notes[0].kind, NotificationKind::Info);
        assert_eq!(notes[1].kind, NotificationKind::Warning);
        assert_eq!(notes[2].kind, NotificationKind::Error);
        assert!(notes.iter().all(|n| !n.read && n.timestamp == now));
    }

    #[test]
    fn completed_records_only_get_month_success() {
        let now = datetime!(2024-06-15 12:00 UTC);
        let records = vec![
            aged("one", 1, true, now),
            aged("seven", 7, true, now),
            aged("thirty", 30, true, now),
        ];
        let notes = generate(&records, now);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Success);
        assert_eq!(
            notes[0].message,
            "thirty - 30 days completed. Status: Completed"
        );
        assert_eq!(notes[0].record_id.as_deref(), Some("record-thirty"));
    }

    #[test]
    fn messages_name_the_record() {
        let now = datetime!(2024-06-15 12:00 UTC);
        let notes = generate(&[aged("Rehan", 1, false, now)], now);
        assert_eq!(
            notes[0].message,
            "Rehan completed 1 day since registration. Hard copy status: Pending"
        );
        assert_eq!(notes[0].title, "1 Day Completed");
    }
}
