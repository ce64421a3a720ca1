use strum::{Display, EnumIter, IntoEnumIterator};
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

use crate::notify::Notification;
use crate::records::{date_label, Field, Record, RecordDraft, ValidationErrors};
use crate::timeline::{time_tracking, TimeTrackingEntry};
use crate::views::{newest_first, RecordFilter, TimeTrackingQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Tab {
    Dashboard,
    Records,
    Search,
    #[strum(serialize = "Time Tracking")]
    TimeTracking,
}

impl Tab {
    pub fn index(self) -> usize {
        Tab::iter().position(|tab| tab == self).unwrap_or(0)
    }

    pub fn from_index(idx: usize) -> Option<Tab> {
        Tab::iter().nth(idx)
    }

    fn shifted(self, delta: isize) -> Tab {
        let count = Tab::iter().count() as isize;
        let next = (self.index() as isize + delta).rem_euclid(count);
        Tab::from_index(next as usize).unwrap_or(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum FormField {
    Name,
    Number,
    Email,
    Cnic,
    HardCopy,
    Notes,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Number => "Number",
            FormField::Email => "Email",
            FormField::Cnic => "CNIC",
            FormField::HardCopy => "Hard Copy Given",
            FormField::Notes => "Notes",
        }
    }

    /// Validation key for fields that can fail validation.
    pub fn validated(self) -> Option<Field> {
        match self {
            FormField::Name => Some(Field::Name),
            FormField::Number => Some(Field::Number),
            FormField::Email => Some(Field::Email),
            FormField::Cnic => Some(Field::Cnic),
            FormField::HardCopy | FormField::Notes => None,
        }
    }

    fn shifted(self, delta: isize) -> FormField {
        let all: Vec<_> = FormField::iter().collect();
        let idx = all.iter().position(|f| *f == self).unwrap_or(0) as isize;
        let next = (idx + delta).rem_euclid(all.len() as isize);
        all[next as usize]
    }
}

const FIELD_LIMIT: usize = 200;
const NOTES_LIMIT: usize = 4000;

#[derive(Debug, Clone, Default)]
pub struct FormOverlay {
    /// `Some(id)` when editing an existing record.
    pub editing: Option<String>,
    pub draft: RecordDraft,
    pub focus: Option<FormField>,
    pub errors: ValidationErrors,
}

impl FormOverlay {
    pub fn focused(&self) -> FormField {
        self.focus.unwrap_or(FormField::Name)
    }

    pub fn next_field(&mut self) {
        self.focus = Some(self.focused().shifted(1));
    }

    pub fn previous_field(&mut self) {
        self.focus = Some(self.focused().shifted(-1));
    }

    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Name => self.draft.name.clone(),
            FormField::Number => self.draft.number.clone(),
            FormField::Email => self.draft.email.clone(),
            FormField::Cnic => self.draft.cnic.clone(),
            FormField::HardCopy => {
                if self.draft.hard_copy_given {
                    "[x]".to_string()
                } else {
                    "[ ]".to_string()
                }
            }
            FormField::Notes => self.draft.notes.clone(),
        }
    }

    fn text_mut(&mut self, field: FormField) -> Option<(&mut String, usize)> {
        match field {
            FormField::Name => Some((&mut self.draft.name, FIELD_LIMIT)),
            FormField::Number => Some((&mut self.draft.number, FIELD_LIMIT)),
            FormField::Email => Some((&mut self.draft.email, FIELD_LIMIT)),
            FormField::Cnic => Some((&mut self.draft.cnic, FIELD_LIMIT)),
            FormField::Notes => Some((&mut self.draft.notes, NOTES_LIMIT)),
            FormField::HardCopy => None,
        }
    }

    pub fn push_char(&mut self, ch: char) {
        let field = self.focused();
        if field == FormField::HardCopy {
            if ch == ' ' {
                self.draft.hard_copy_given = !self.draft.hard_copy_given;
            }
            return;
        }
        if let Some((text, limit)) = self.text_mut(field) {
            if text.graphemes(true).count() < limit {
                text.push(ch);
            }
        }
    }

    pub fn pop_char(&mut self) {
        let field = self.focused();
        if let Some((text, _)) = self.text_mut(field) {
            pop_grapheme(text);
        }
    }

    pub fn error_for(&self, field: FormField) -> Option<&str> {
        field.validated().and_then(|key| self.errors.get(key))
    }
}

#[derive(Debug, Clone)]
pub struct DeleteOverlay {
    pub record_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOverlay {
    pub path: String,
}

/// Which end of the search date range an input edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DateBound {
    From,
    To,
}

#[derive(Debug, Clone)]
pub struct DateFilterOverlay {
    pub bound: DateBound,
    pub input: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Form(FormOverlay),
    ConfirmDelete(DeleteOverlay),
    Import(ImportOverlay),
    DateFilter(DateFilterOverlay),
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub active: bool,
    pub filter: RecordFilter,
}

/// Everything a frame needs apart from the records themselves.
#[derive(Debug, Clone)]
pub struct AppState {
    pub tab: Tab,
    pub selected: usize,
    pub search: SearchState,
    pub tracking: TimeTrackingQuery,
    pub notifications: Vec<Notification>,
    pub notification_selected: usize,
    pub recent_window_days: i64,
    pub status_message: Option<String>,
    pub overlay: Option<OverlayState>,
    pub import_pending: bool,
}

impl AppState {
    pub fn new(tracking: TimeTrackingQuery, recent_window_days: i64) -> Self {
        Self {
            tab: Tab::Dashboard,
            selected: 0,
            search: SearchState::default(),
            tracking,
            notifications: Vec::new(),
            notification_selected: 0,
            recent_window_days,
            status_message: None,
            overlay: None,
            import_pending: false,
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.selected = 0;
        }
        if tab != Tab::Search {
            self.search.active = false;
        }
    }

    pub fn next_tab(&mut self) {
        self.set_tab(self.tab.shifted(1));
    }

    pub fn previous_tab(&mut self) {
        self.set_tab(self.tab.shifted(-1));
    }

    /// Records listed on the current tab, in display order.
    pub fn visible_records<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        match self.tab {
            Tab::Search => {
                let mut matches = self.search.filter.apply(records);
                matches.sort_by(|a, b| {
                    b.date_added
                        .cmp(&a.date_added)
                        .then(b.time_added.cmp(&a.time_added))
                });
                matches
            }
            _ => newest_first(records),
        }
    }

    pub fn tracking_entries(&self, records: &[Record], today: Date) -> Vec<TimeTrackingEntry> {
        self.tracking.apply(&time_tracking(records, today))
    }

    pub fn list_len(&self, records: &[Record], today: Date) -> usize {
        match self.tab {
            Tab::Dashboard => self.notifications.len(),
            Tab::Records | Tab::Search => self.visible_records(records).len(),
            Tab::TimeTracking => self.tracking_entries(records, today).len(),
        }
    }

    pub fn selected_record_id(&self, records: &[Record], today: Date) -> Option<String> {
        match self.tab {
            Tab::Dashboard => self
                .notifications
                .get(self.notification_selected)
                .and_then(|note| note.record_id.clone()),
            Tab::Records | Tab::Search => self
                .visible_records(records)
                .get(self.selected)
                .map(|record| record.id.clone()),
            Tab::TimeTracking => self
                .tracking_entries(records, today)
                .get(self.selected)
                .map(|entry| entry.id.clone()),
        }
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        let slot = if self.tab == Tab::Dashboard {
            &mut self.notification_selected
        } else {
            &mut self.selected
        };
        if len == 0 {
            *slot = 0;
            return;
        }
        let next = (*slot as isize + delta).clamp(0, len as isize - 1);
        *slot = next as usize;
    }

    pub fn normalize_selection(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        if self.notification_selected >= self.notifications.len() {
            self.notification_selected = self.notifications.len().saturating_sub(1);
        }
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|note| !note.read).count()
    }

    pub fn mark_selected_notification_read(&mut self) -> bool {
        match self.notifications.get_mut(self.notification_selected) {
            Some(note) if !note.read => {
                note.mark_read();
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_notifications_read(&mut self) {
        self.notifications.iter_mut().for_each(Notification::mark_read);
    }

    pub fn begin_search(&mut self) {
        self.set_tab(Tab::Search);
        self.search.active = true;
    }

    pub fn finish_search(&mut self) {
        self.search.active = false;
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.search.filter.term.push(ch);
        self.selected = 0;
    }

    pub fn pop_search_char(&mut self) {
        pop_grapheme(&mut self.search.filter.term);
        self.selected = 0;
    }

    pub fn cycle_search_scope(&mut self) {
        self.search.filter.scope = self.search.filter.scope.next();
        self.selected = 0;
    }

    pub fn cycle_hard_copy_filter(&mut self) {
        self.search.filter.hard_copy = self.search.filter.hard_copy.next();
        self.selected = 0;
    }

    /// Sets one end of the date range. A range whose start falls after its end
    /// is refused and leaves the filter untouched.
    pub fn set_date_bound(&mut self, bound: DateBound, date: Option<Date>) -> Result<(), String> {
        let filter = &mut self.search.filter;
        let (from, to) = match bound {
            DateBound::From => (date, filter.date_to),
            DateBound::To => (filter.date_from, date),
        };
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(format!(
                    "From {} is after To {}",
                    date_label(from),
                    date_label(to)
                ));
            }
        }
        filter.date_from = from;
        filter.date_to = to;
        self.selected = 0;
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.search.filter.clear();
        self.search.active = false;
        self.selected = 0;
    }

    pub fn cycle_tracking_status(&mut self) {
        self.tracking.cycle_status();
        self.selected = 0;
    }

    pub fn cycle_tracking_sort(&mut self) {
        self.tracking.sort = self.tracking.sort.next();
    }

    pub fn flip_tracking_order(&mut self) {
        self.tracking.order = self.tracking.order.flip();
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn open_new_record(&mut self) {
        self.overlay = Some(OverlayState::Form(FormOverlay::default()));
    }

    pub fn open_edit_record(&mut self, record: &Record) {
        self.overlay = Some(OverlayState::Form(FormOverlay {
            editing: Some(record.id.clone()),
            draft: record.to_draft(),
            focus: None,
            errors: ValidationErrors::default(),
        }));
    }

    pub fn open_delete_record(&mut self, record: &Record) {
        self.overlay = Some(OverlayState::ConfirmDelete(DeleteOverlay {
            record_id: record.id.clone(),
            name: record.name.clone(),
        }));
    }

    pub fn open_import(&mut self) {
        self.overlay = Some(OverlayState::Import(ImportOverlay::default()));
    }

    pub fn open_date_filter(&mut self, bound: DateBound) {
        let current = match bound {
            DateBound::From => self.search.filter.date_from,
            DateBound::To => self.search.filter.date_to,
        };
        self.overlay = Some(OverlayState::DateFilter(DateFilterOverlay {
            bound,
            input: current.map(date_label).unwrap_or_default(),
            error: None,
        }));
    }

    pub fn form_overlay_mut(&mut self) -> Option<&mut FormOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::Form(form)) => Some(form),
            _ => None,
        }
    }

    pub fn import_overlay_mut(&mut self) -> Option<&mut ImportOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::Import(import)) => Some(import),
            _ => None,
        }
    }

    pub fn date_filter_overlay_mut(&mut self) -> Option<&mut DateFilterOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::DateFilter(overlay)) => Some(overlay),
            _ => None,
        }
    }
}

/// Removes the last user-perceived character.
pub fn pop_grapheme(text: &mut String) {
    if let Some((idx, _)) = text.grapheme_indices(true).next_back() {
        text.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::timeline::Status;
    use assert_matches::assert_matches;
    use time::macros::{date, datetime, time};

    fn record(name: &str, id: &str, date: Date) -> Record {
        RecordDraft::sample(name).into_record(id.into(), date, time!(08:00))
    }

    #[test]
    fn tabs_wrap_in_both_directions() {
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        state.previous_tab();
        assert_eq!(state.tab, Tab::TimeTracking);
        state.next_tab();
        assert_eq!(state.tab, Tab::Dashboard);
        assert_eq!(Tab::TimeTracking.to_string(), "Time Tracking");
    }

    #[test]
    fn form_fields_cycle_and_toggle() {
        let mut form = FormOverlay::default();
        assert_eq!(form.focused(), FormField::Name);
        form.push_char('Z');
        form.previous_field();
        assert_eq!(form.focused(), FormField::Notes);
        form.previous_field();
        assert_eq!(form.focused(), FormField::HardCopy);
        form.push_char('x');
        assert!(!form.draft.hard_copy_given);
        form.push_char(' ');
        assert!(form.draft.hard_copy_given);
        form.pop_char();
        assert_eq!(form.draft.name, "Z");
    }

    #[test]
    fn backspace_removes_whole_graphemes() {
        let mut text = String::from("Zoe\u{301}");
        pop_grapheme(&mut text);
        assert_eq!(text, "Zo");
        let mut empty = String::new();
        pop_grapheme(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn search_tab_lists_filtered_newest_first() {
        let records = vec![
            record("Adeel", "record-1", date!(2024 - 01 - 01)),
            record("Adnan", "record-2", date!(2024 - 01 - 05)),
            record("Saba", "record-3", date!(2024 - 01 - 03)),
        ];
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        state.begin_search();
        for ch in "ad".chars() {
            state.push_search_char(ch);
        }
        let ids: Vec<_> = state
            .visible_records(&records)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["record-2", "record-1"]);
        assert_eq!(
            state.selected_record_id(&records, date!(2024 - 01 - 10)),
            Some("record-2".into())
        );
    }

    #[test]
    fn date_bounds_narrow_search_and_refuse_inverted_ranges() {
        let records = vec![
            record("Adeel", "record-1", date!(2024 - 01 - 01)),
            record("Adnan", "record-2", date!(2024 - 01 - 05)),
            record("Saba", "record-3", date!(2024 - 01 - 03)),
        ];
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        state.set_tab(Tab::Search);
        assert_eq!(state.set_date_bound(DateBound::From, Some(date!(2024 - 01 - 02))), Ok(()));
        assert_eq!(state.set_date_bound(DateBound::To, Some(date!(2024 - 01 - 04))), Ok(()));
        let ids: Vec<_> = state
            .visible_records(&records)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["record-3"]);

        let err = state
            .set_date_bound(DateBound::From, Some(date!(2024 - 01 - 09)))
            .unwrap_err();
        assert_eq!(err, "From 2024-01-09 is after To 2024-01-04");
        assert_eq!(state.search.filter.date_from, Some(date!(2024 - 01 - 02)));

        state.open_date_filter(DateBound::To);
        assert_matches!(
            state.overlay(),
            Some(OverlayState::DateFilter(DateFilterOverlay { input, .. })) if input == "2024-01-04"
        );
        assert_eq!(state.set_date_bound(DateBound::To, None), Ok(()));
        assert_eq!(state.visible_records(&records).len(), 2);
    }

    #[test]
    fn tracking_selection_follows_query() {
        let records = vec![
            record("Old", "record-old", date!(2024 - 01 - 01)),
            record("New", "record-new", date!(2024 - 01 - 09)),
        ];
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        state.set_tab(Tab::TimeTracking);
        let today = date!(2024 - 01 - 10);
        assert_eq!(state.selected_record_id(&records, today), Some("record-old".into()));
        state.cycle_tracking_status();
        assert_eq!(state.tracking.status, Some(Status::Active));
        assert_eq!(state.list_len(&records, today), 1);
        assert_eq!(state.selected_record_id(&records, today), Some("record-new".into()));
    }

    #[test]
    fn selection_clamps_to_list() {
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        state.set_tab(Tab::Records);
        state.move_selection(5, 3);
        assert_eq!(state.selected, 2);
        state.move_selection(-9, 3);
        assert_eq!(state.selected, 0);
        state.selected = 4;
        state.normalize_selection(2);
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn notifications_are_marked_read_individually() {
        let mut state = AppState::new(TimeTrackingQuery::default(), 7);
        let note = Notification {
            id: "day1-record-1".into(),
            kind: NotificationKind::Info,
            title: "1 Day Completed".into(),
            message: "x".into(),
            timestamp: datetime!(2024-01-02 09:00 UTC),
            read: false,
            record_id: Some("record-1".into()),
        };
        state.notifications = vec![note.clone(), note];
        assert_eq!(state.unread_notifications(), 2);
        assert!(state.mark_selected_notification_read());
        assert!(!state.mark_selected_notification_read());
        assert_eq!(state.unread_notifications(), 1);
        state.mark_all_notifications_read();
        assert_eq!(state.unread_notifications(), 0);
    }
}
