//! Read-only projections that each screen renders from the store's record list.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use time::Date;

use crate::records::Record;
use crate::timeline::{days_since, Status, TimeTrackingEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub hard_copy_given: usize,
    pub pending: usize,
    pub recent: usize,
    /// Share of records with the hard copy given, as a whole percentage.
    pub completion_rate: u8,
}

impl DashboardStats {
    pub fn compute(records: &[Record], today: Date, recent_window_days: i64) -> Self {
        let hard_copy_given = records.iter().filter(|r| r.hard_copy_given).count();
        let recent = records
            .iter()
            .filter(|r| days_since(r.date_added, today) <= recent_window_days)
            .count();
        Self {
            total: records.len(),
            hard_copy_given,
            pending: records.len() - hard_copy_given,
            recent,
            completion_rate: completion_rate(hard_copy_given, records.len()),
        }
    }
}

/// Rounds half up; zero when there are no records.
fn completion_rate(given: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (given * 200 + total) / (total * 2);
    u8::try_from(rate).unwrap_or(100)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SearchScope {
    #[default]
    All,
    Name,
    Email,
    Cnic,
}

impl SearchScope {
    pub fn next(self) -> Self {
        match self {
            SearchScope::All => SearchScope::Name,
            SearchScope::Name => SearchScope::Email,
            SearchScope::Email => SearchScope::Cnic,
            SearchScope::Cnic => SearchScope::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum HardCopyFilter {
    #[default]
    All,
    Given,
    NotGiven,
}

impl HardCopyFilter {
    pub fn next(self) -> Self {
        match self {
            HardCopyFilter::All => HardCopyFilter::Given,
            HardCopyFilter::Given => HardCopyFilter::NotGiven,
            HardCopyFilter::NotGiven => HardCopyFilter::All,
        }
    }
}

/// Search/filter criteria; every criterion left at its default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub term: String,
    pub scope: SearchScope,
    pub hard_copy: HardCopyFilter,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        self.matches_term(record) && self.matches_hard_copy(record) && self.matches_dates(record)
    }

    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|record| self.matches(record)).collect()
    }

    pub fn active_filter_count(&self) -> usize {
        [
            !self.term.is_empty(),
            self.hard_copy != HardCopyFilter::All,
            self.date_from.is_some(),
            self.date_to.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn matches_term(&self, record: &Record) -> bool {
        if self.term.is_empty() {
            return true;
        }
        let needle = self.term.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&needle);
        match self.scope {
            SearchScope::All => {
                hit(&record.name) || hit(&record.email) || hit(&record.cnic) || hit(&record.number)
            }
            SearchScope::Name => hit(&record.name),
            SearchScope::Email => hit(&record.email),
            SearchScope::Cnic => hit(&record.cnic),
        }
    }

    fn matches_hard_copy(&self, record: &Record) -> bool {
        match self.hard_copy {
            HardCopyFilter::All => true,
            HardCopyFilter::Given => record.hard_copy_given,
            HardCopyFilter::NotGiven => !record.hard_copy_given,
        }
    }

    fn matches_dates(&self, record: &Record) -> bool {
        if let Some(from) = self.date_from {
            if record.date_added < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.date_added > to {
                return false;
            }
        }
        true
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum TimeTrackingSort {
    Name,
    #[default]
    Days,
    Status,
}

impl TimeTrackingSort {
    pub fn next(self) -> Self {
        match self {
            TimeTrackingSort::Name => TimeTrackingSort::Days,
            TimeTrackingSort::Days => TimeTrackingSort::Status,
            TimeTrackingSort::Status => TimeTrackingSort::Name,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeTrackingQuery {
    /// `None` keeps every status.
    pub status: Option<Status>,
    pub sort: TimeTrackingSort,
    pub order: SortOrder,
}

impl TimeTrackingQuery {
    pub fn apply(&self, entries: &[TimeTrackingEntry]) -> Vec<TimeTrackingEntry> {
        let mut out: Vec<_> = entries
            .iter()
            .filter(|entry| self.status.map_or(true, |status| entry.status == status))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            let ordering = match self.sort {
                TimeTrackingSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                TimeTrackingSort::Days => a.days_since_added.cmp(&b.days_since_added),
                TimeTrackingSort::Status => a.status.to_string().cmp(&b.status.to_string()),
            };
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        out
    }

    pub fn cycle_status(&mut self) {
        self.status = match self.status {
            None => Some(Status::Active),
            Some(Status::Active) => Some(Status::Completed),
            Some(Status::Completed) => Some(Status::Overdue),
            Some(Status::Overdue) => None,
        };
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeTrackingStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
    pub avg_days: i64,
}

impl TimeTrackingStats {
    pub fn compute(entries: &[TimeTrackingEntry]) -> Self {
        let count = |status: Status| entries.iter().filter(|e| e.status == status).count();
        let total = entries.len();
        let avg_days = if total == 0 {
            0
        } else {
            let sum: i64 = entries.iter().map(|e| e.days_since_added).sum();
            (sum as f64 / total as f64).round() as i64
        };
        Self {
            total,
            active: count(Status::Active),
            completed: count(Status::Completed),
            overdue: count(Status::Overdue),
            avg_days,
        }
    }
}

/// Newest records first; ties keep insertion order.
pub fn newest_first(records: &[Record]) -> Vec<&Record> {
    let mut out: Vec<&Record> = records.iter().collect();
    out.sort_by(|a, b| match b.date_added.cmp(&a.date_added) {
        Ordering::Equal => b.time_added.cmp(&a.time_added),
        other => other,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordDraft;
    use crate::timeline::time_tracking;
    use time::macros::{date, time};
    use time::Duration;

    const TODAY: Date = date!(2024 - 04 - 20);

    fn record(name: &str, days_ago: i64, given: bool) -> Record {
        let mut draft = RecordDraft::sample(name);
        draft.hard_copy_given = given;
        draft.into_record(
            format!("record-{}", name.to_lowercase()),
            TODAY - Duration::days(days_ago),
            time!(10:00),
        )
    }

    fn fixture() -> Vec<Record> {
        let mut imran = record("Imran", 10, false);
        imran.cnic = "42101-7654321-3".into();
        vec![
            record("Amna", 0, false),
            record("Bashir", 3, true),
            imran,
            record("Danish", 30, true),
        ]
    }

    #[test]
    fn dashboard_counts() {
        let stats = DashboardStats::compute(&fixture(), TODAY, 7);
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                hard_copy_given: 2,
                pending: 2,
                recent: 2,
                completion_rate: 50,
            }
        );

        let empty = DashboardStats::compute(&[], TODAY, 7);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.completion_rate, 0);
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(3, 3), 100);
    }

    #[test]
    fn term_search_respects_scope() {
        let records = fixture();
        let mut filter = RecordFilter {
            term: "42101".into(),
            ..RecordFilter::default()
        };
        let names: Vec<_> = filter.apply(&records).iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Imran"]);

        filter.scope = SearchScope::Name;
        assert!(filter.apply(&records).is_empty());

        filter.term = "BASH".into();
        assert_eq!(filter.apply(&records).len(), 1);
    }

    #[test]
    fn hard_copy_and_date_filters_combine() {
        let records = fixture();
        let filter = RecordFilter {
            hard_copy: HardCopyFilter::NotGiven,
            date_from: Some(TODAY - Duration::days(10)),
            date_to: Some(TODAY),
            ..RecordFilter::default()
        };
        let names: Vec<_> = filter.apply(&records).iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Amna", "Imran"]);
        assert_eq!(filter.active_filter_count(), 3);
    }

    #[test]
    fn time_tracking_filters_and_sorts() {
        let entries = time_tracking(&fixture(), TODAY);
        let query = TimeTrackingQuery {
            status: None,
            sort: TimeTrackingSort::Days,
            order: SortOrder::Desc,
        };
        let names: Vec<_> = query.apply(&entries).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Danish", "Imran", "Bashir", "Amna"]);

        let overdue = TimeTrackingQuery {
            status: Some(Status::Overdue),
            sort: TimeTrackingSort::Name,
            order: SortOrder::Asc,
        };
        let names: Vec<_> = overdue.apply(&entries).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Imran"]);
    }

    #[test]
    fn time_tracking_stats_round_average() {
        let entries = time_tracking(&fixture(), TODAY);
        let stats = TimeTrackingStats::compute(&entries);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.overdue, 1);
        // (0 + 3 + 10 + 30) / 4 = 10.75
        assert_eq!(stats.avg_days, 11);
        assert_eq!(TimeTrackingStats::compute(&[]).avg_days, 0);
    }

    #[test]
    fn newest_first_orders_by_date_then_time() {
        let records = fixture();
        let names: Vec<_> = newest_first(&records).iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Amna", "Bashir", "Imran", "Danish"]);
    }
}
