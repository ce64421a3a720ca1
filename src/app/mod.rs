use std::io::Stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::widgets::ListState;
use ratatui::Terminal;
use strum::IntoEnumIterator;
use time::Date;

use crate::config::AppConfig;
use crate::notify;
use crate::print;
use crate::records::{date_label, parse_date_label};
use crate::spreadsheet::{self, ImportJob, SpreadsheetError};
use crate::storage::KeyValueStore;
use crate::store::RecordStore;
use crate::ui;

pub mod state;

pub use state::{AppState, DateBound, FormField, FormOverlay, OverlayState, Tab};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextTab,
    PreviousTab,
    GoToTab(Tab),
    NewRecord,
    EditRecord,
    DeleteRecord,
    ToggleHardCopy,
    PrintRecord,
    ExportMaster,
    ExportNew,
    Import,
    StartSearch,
    CycleScope,
    CycleHardCopyFilter,
    EditDateBound(DateBound),
    ClearFilters,
    CycleStatusFilter,
    CycleSort,
    FlipOrder,
    MarkRead,
    MarkAllRead,
}

pub struct App<S: KeyValueStore> {
    pub config: Arc<AppConfig>,
    store: RecordStore<S>,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
    import_job: Option<ImportJob>,
    today: Date,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: Arc<AppConfig>, store: RecordStore<S>) -> Self {
        let tracking = crate::views::TimeTrackingQuery {
            status: None,
            sort: config.time_tracking.default_sort,
            order: config.time_tracking.default_order,
        };
        let mut state = AppState::new(tracking, config.dashboard.recent_window_days);
        let now = store.clock().now();
        state.notifications = notify::generate(store.records(), now);
        let unread = state.unread_notifications();
        if unread > 0 {
            state.set_status_message(Some(format!(
                "{unread} new notification(s) on the dashboard"
            )));
        }
        Self {
            config,
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
            import_job: None,
            today: now.date(),
            store,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            self.draw(terminal)?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let len = self.state.list_len(self.store.records(), self.today);
        self.state.normalize_selection(len);
        let selected = match self.state.tab {
            Tab::Dashboard => self.state.notification_selected,
            _ => self.state.selected,
        };
        let list_len = match self.state.tab {
            Tab::Dashboard => self.state.notifications.len(),
            _ => len,
        };
        self.list_state
            .select((list_len > 0).then_some(selected));
        let view = ui::View {
            records: self.store.records(),
            today: self.today,
        };
        terminal
            .draw(|frame| ui::draw_app(frame, &self.state, &view, &mut self.list_state))
            .context("rendering frame")?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.search.active {
            match key.code {
                KeyCode::Esc => {
                    self.state.clear_filters();
                    return;
                }
                KeyCode::Enter => {
                    self.state.finish_search();
                    return;
                }
                KeyCode::Backspace => {
                    self.state.pop_search_char();
                    return;
                }
                KeyCode::Char(ch) if !has_command_modifier(key) => {
                    self.state.push_search_char(ch);
                    return;
                }
                _ => {}
            }
        }

        let plain = !has_command_modifier(key);
        let tab = self.state.tab;
        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Tab | KeyCode::Right => Some(Action::NextTab),
            KeyCode::BackTab | KeyCode::Left => Some(Action::PreviousTab),
            KeyCode::Char(ch @ '1'..='4') => ch
                .to_digit(10)
                .and_then(|n| Tab::from_index(n as usize - 1))
                .map(Action::GoToTab),
            KeyCode::Char('a') if plain => Some(Action::NewRecord),
            KeyCode::Char('e') if plain => Some(Action::EditRecord),
            KeyCode::Enter if tab == Tab::Dashboard => Some(Action::MarkRead),
            KeyCode::Enter => Some(Action::EditRecord),
            KeyCode::Char('d') if plain => Some(Action::DeleteRecord),
            KeyCode::Char(' ') => Some(Action::ToggleHardCopy),
            KeyCode::Char('p') if plain => Some(Action::PrintRecord),
            KeyCode::Char('m') if plain => Some(Action::ExportMaster),
            KeyCode::Char('n') if plain => Some(Action::ExportNew),
            KeyCode::Char('i') if plain => Some(Action::Import),
            KeyCode::Char('/') => Some(Action::StartSearch),
            KeyCode::Char('f') if tab == Tab::Search => Some(Action::CycleScope),
            KeyCode::Char('h') if tab == Tab::Search => Some(Action::CycleHardCopyFilter),
            KeyCode::Char('[') if tab == Tab::Search => {
                Some(Action::EditDateBound(DateBound::From))
            }
            KeyCode::Char(']') if tab == Tab::Search => Some(Action::EditDateBound(DateBound::To)),
            KeyCode::Char('c') if tab == Tab::Search => Some(Action::ClearFilters),
            KeyCode::Char('s') if tab == Tab::TimeTracking => Some(Action::CycleStatusFilter),
            KeyCode::Char('o') if tab == Tab::TimeTracking => Some(Action::CycleSort),
            KeyCode::Char('r') if tab == Tab::TimeTracking => Some(Action::FlipOrder),
            KeyCode::Char('x') if tab == Tab::Dashboard => Some(Action::MarkAllRead),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => {
                let len = self.current_len();
                self.state.move_selection(1, len);
            }
            Action::SelectPrevious => {
                let len = self.current_len();
                self.state.move_selection(-1, len);
            }
            Action::NextTab => self.state.next_tab(),
            Action::PreviousTab => self.state.previous_tab(),
            Action::GoToTab(tab) => self.state.set_tab(tab),
            Action::NewRecord => {
                self.state.open_new_record();
                self.state
                    .set_status_message(Some("Tab/↓ next field • Space toggles hard copy"));
            }
            Action::EditRecord => self.handle_edit_record(),
            Action::DeleteRecord => self.handle_delete_record(),
            Action::ToggleHardCopy => self.handle_toggle_hard_copy(),
            Action::PrintRecord => self.handle_print_record(),
            Action::ExportMaster => self.handle_export(false),
            Action::ExportNew => self.handle_export(true),
            Action::Import => {
                if self.import_job.is_some() {
                    self.state
                        .set_status_message(Some("An import is already running"));
                } else {
                    self.state.open_import();
                }
            }
            Action::StartSearch => self.state.begin_search(),
            Action::CycleScope => self.state.cycle_search_scope(),
            Action::CycleHardCopyFilter => self.state.cycle_hard_copy_filter(),
            Action::EditDateBound(bound) => self.state.open_date_filter(bound),
            Action::ClearFilters => {
                self.state.clear_filters();
                self.state.set_status_message(Some("Filters cleared"));
            }
            Action::CycleStatusFilter => self.state.cycle_tracking_status(),
            Action::CycleSort => self.state.cycle_tracking_sort(),
            Action::FlipOrder => self.state.flip_tracking_order(),
            Action::MarkRead => {
                self.state.mark_selected_notification_read();
            }
            Action::MarkAllRead => {
                self.state.mark_all_notifications_read();
                self.state
                    .set_status_message(Some("All notifications marked as read"));
            }
        }
    }

    fn on_tick(&mut self) {
        if let Some(job) = self.import_job.as_mut() {
            if let Some(result) = job.try_finish() {
                let path = job.path().to_path_buf();
                self.import_job = None;
                self.state.import_pending = false;
                self.finish_import(path, result);
            }
        }

        let now = self.store.clock().now();
        if now.date() != self.today {
            self.today = now.date();
            self.store.refresh_derived();
            self.state.notifications = notify::generate(self.store.records(), now);
            tracing::debug!(today = %self.today, "calendar day rolled over");
        }
    }

    fn current_len(&self) -> usize {
        self.state.list_len(self.store.records(), self.today)
    }

    fn selected_record_id(&self) -> Option<String> {
        self.state
            .selected_record_id(self.store.records(), self.today)
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::Form(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled"));
                    }
                    KeyCode::Enter => self.submit_form(),
                    KeyCode::Tab | KeyCode::Down => {
                        if let Some(form) = self.state.form_overlay_mut() {
                            form.next_field();
                        }
                    }
                    KeyCode::BackTab | KeyCode::Up => {
                        if let Some(form) = self.state.form_overlay_mut() {
                            form.previous_field();
                        }
                    }
                    KeyCode::Backspace => {
                        if let Some(form) = self.state.form_overlay_mut() {
                            form.pop_char();
                        }
                    }
                    KeyCode::Char(ch) if !has_command_modifier(key) => {
                        if let Some(form) = self.state.form_overlay_mut() {
                            form.push_char(ch);
                        }
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::ConfirmDelete(_)) => {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    KeyCode::Enter | KeyCode::Char('y') => self.submit_delete(),
                    _ => {}
                }
                true
            }
            Some(OverlayState::Import(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Import canceled"));
                    }
                    KeyCode::Enter => self.submit_import(),
                    KeyCode::Backspace => {
                        if let Some(import) = self.state.import_overlay_mut() {
                            state::pop_grapheme(&mut import.path);
                        }
                    }
                    KeyCode::Char(ch) if !has_command_modifier(key) => {
                        if let Some(import) = self.state.import_overlay_mut() {
                            import.path.push(ch);
                        }
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::DateFilter(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Date filter unchanged"));
                    }
                    KeyCode::Enter => self.submit_date_filter(),
                    KeyCode::Backspace => {
                        if let Some(overlay) = self.state.date_filter_overlay_mut() {
                            state::pop_grapheme(&mut overlay.input);
                            overlay.error = None;
                        }
                    }
                    KeyCode::Char(ch) if !has_command_modifier(key) => {
                        if let Some(overlay) = self.state.date_filter_overlay_mut() {
                            overlay.input.push(ch);
                            overlay.error = None;
                        }
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.state.form_overlay_mut() else {
            return;
        };
        if let Err(errors) = form.draft.validate() {
            let first = errors.iter().next().map(|(field, _)| field);
            form.focus = FormField::iter()
                .find(|candidate| candidate.validated().is_some() && candidate.validated() == first)
                .or(form.focus);
            form.errors = errors;
            self.state
                .set_status_message(Some("Fix the highlighted fields"));
            return;
        }

        let editing = form.editing.clone();
        let draft = form.draft.clone();
        match editing {
            Some(id) => {
                if self.store.update(&id, draft.into_patch()) {
                    self.state.set_status_message(Some("Record updated"));
                } else {
                    self.state
                        .set_status_message(Some("Record no longer exists"));
                }
            }
            None => {
                let record = self.store.add(draft);
                let message = format!("Added {}", record.name);
                self.state.set_status_message(Some(message));
            }
        }
        self.state.close_overlay();
    }

    fn handle_edit_record(&mut self) {
        let record = self
            .selected_record_id()
            .and_then(|id| self.store.get(&id).cloned());
        match record {
            Some(record) => self.state.open_edit_record(&record),
            None => self.state.set_status_message(Some("No record selected")),
        }
    }

    fn handle_delete_record(&mut self) {
        let record = self
            .selected_record_id()
            .and_then(|id| self.store.get(&id).cloned());
        match record {
            Some(record) => self.state.open_delete_record(&record),
            None => self.state.set_status_message(Some("No record selected")),
        }
    }

    fn submit_delete(&mut self) {
        let Some(OverlayState::ConfirmDelete(overlay)) = self.state.overlay().cloned() else {
            return;
        };
        self.state.close_overlay();
        if self.store.delete(&overlay.record_id) {
            self.state
                .set_status_message(Some(format!("Deleted {}", overlay.name)));
        } else {
            self.state.set_status_message(Some("Record already gone"));
        }
    }

    fn handle_toggle_hard_copy(&mut self) {
        let Some(record) = self
            .selected_record_id()
            .and_then(|id| self.store.get(&id).cloned())
        else {
            self.state.set_status_message(Some("No record selected"));
            return;
        };
        let patch = crate::records::RecordPatch {
            hard_copy_given: Some(!record.hard_copy_given),
            ..Default::default()
        };
        self.store.update(&record.id, patch);
        let label = if record.hard_copy_given { "pending" } else { "given" };
        self.state
            .set_status_message(Some(format!("Hard copy {label} for {}", record.name)));
    }

    fn handle_print_record(&mut self) {
        let Some(record) = self
            .selected_record_id()
            .and_then(|id| self.store.get(&id).cloned())
        else {
            self.state.set_status_message(Some("Select a record to print"));
            return;
        };
        match print::print_record(
            &record,
            &self.config.export.print_dir,
            self.config.export.open_printed,
        ) {
            Ok(path) => self
                .state
                .set_status_message(Some(format!("Print document: {}", path.display()))),
            Err(err) => {
                tracing::error!(?err, record_id = %record.id, "failed to print record");
                self.state
                    .set_status_message(Some("Failed to write print document"));
            }
        }
    }

    /// Master export always covers every record; a new export follows the current tab.
    fn handle_export(&mut self, new_file: bool) {
        let dir = self.config.export.export_dir.clone();
        let now = self.store.clock().now();
        let outcome = if !new_file {
            spreadsheet::export_master(self.store.records(), &dir, now)
        } else {
            match self.state.tab {
                Tab::TimeTracking => {
                    let entries = self
                        .state
                        .tracking_entries(self.store.records(), self.today);
                    spreadsheet::export_time_tracking(&entries, &dir, now)
                }
                Tab::Search => {
                    let matches: Vec<_> = self
                        .state
                        .visible_records(self.store.records())
                        .into_iter()
                        .cloned()
                        .collect();
                    spreadsheet::export_new(&matches, &dir, now)
                }
                _ => spreadsheet::export_new(self.store.records(), &dir, now),
            }
        };
        match outcome {
            Ok(path) => self
                .state
                .set_status_message(Some(format!("Exported to {}", path.display()))),
            Err(SpreadsheetError::NoRecords) => {
                self.state.set_status_message(Some("No records to export"))
            }
            Err(err) => {
                tracing::error!(?err, "export failed");
                self.state
                    .set_status_message(Some(format!("Export failed: {err}")));
            }
        }
    }

    fn submit_import(&mut self) {
        let Some(OverlayState::Import(overlay)) = self.state.overlay().cloned() else {
            return;
        };
        let raw = overlay.path.trim();
        if raw.is_empty() {
            self.state.set_status_message(Some("Enter a workbook path"));
            return;
        }
        let path = PathBuf::from(raw);
        self.state.close_overlay();
        self.state.import_pending = true;
        self.state
            .set_status_message(Some(format!("Importing {}…", path.display())));
        self.import_job = Some(ImportJob::spawn(path, self.today));
    }

    /// A blank input clears the bound.
    fn submit_date_filter(&mut self) {
        let Some(OverlayState::DateFilter(overlay)) = self.state.overlay().cloned() else {
            return;
        };
        let raw = overlay.input.trim();
        let date = if raw.is_empty() {
            None
        } else if let Some(date) = parse_date_label(raw) {
            Some(date)
        } else {
            if let Some(overlay) = self.state.date_filter_overlay_mut() {
                overlay.error = Some("Use YYYY-MM-DD".into());
            }
            return;
        };

        match self.state.set_date_bound(overlay.bound, date) {
            Ok(()) => {
                self.state.close_overlay();
                let message = match date {
                    Some(date) => format!("{} date set to {}", overlay.bound, date_label(date)),
                    None => format!("{} date cleared", overlay.bound),
                };
                self.state.set_status_message(Some(message));
            }
            Err(message) => {
                if let Some(overlay) = self.state.date_filter_overlay_mut() {
                    overlay.error = Some(message);
                }
            }
        }
    }

    fn finish_import(
        &mut self,
        path: PathBuf,
        result: spreadsheet::Result<Vec<crate::records::Record>>,
    ) {
        match result {
            Ok(records) => {
                let count = self.store.import_many(records);
                self.state.set_status_message(Some(format!(
                    "Imported {count} record(s) from {}",
                    path.display()
                )));
            }
            Err(err) => {
                tracing::error!(?err, path = %path.display(), "import failed");
                self.state
                    .set_status_message(Some(format!("Import failed: {err}")));
            }
        }
    }
}

fn has_command_modifier(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Field;
    use crate::storage::MemoryKv;
    use crate::timeline::Clock;
    use ratatui::backend::TestBackend;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    struct SteppingClock(Rc<Cell<OffsetDateTime>>);

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            self.0.get()
        }
    }

    fn app(dir: &TempDir) -> (App<MemoryKv>, Rc<Cell<OffsetDateTime>>) {
        let now = Rc::new(Cell::new(datetime!(2024-05-10 09:30 UTC)));
        let store = RecordStore::open(
            MemoryKv::new(),
            "records",
            Arc::new(SteppingClock(Rc::clone(&now))),
        );
        let mut config = AppConfig::default();
        config.export.export_dir = dir.path().join("exports");
        config.export.print_dir = dir.path().join("print");
        config.export.open_printed = false;
        (App::new(Arc::new(config), store), now)
    }

    fn press(app: &mut App<MemoryKv>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<MemoryKv>, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn add_via_form(app: &mut App<MemoryKv>, name: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, name);
        press(app, KeyCode::Tab);
        type_text(app, "0300-1112223");
        press(app, KeyCode::Tab);
        type_text(app, "someone@example.com");
        press(app, KeyCode::Tab);
        type_text(app, "35202-0000000-1");
        press(app, KeyCode::Enter);
    }

    #[test]
    fn form_submission_adds_record() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Ayesha");
        assert!(app.state().overlay().is_none());
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.store().records()[0].name, "Ayesha");
        assert_eq!(app.state().status_message.as_deref(), Some("Added Ayesha"));
        Ok(())
    }

    #[test]
    fn invalid_form_stays_open_on_first_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Bilal");
        press(&mut app, KeyCode::Enter);
        assert_matches::assert_matches!(
            app.state().overlay(),
            Some(OverlayState::Form(form))
                if form.focused() == FormField::Number
                    && form.errors.get(Field::Email) == Some("Email is required")
        );
        assert!(app.store().is_empty());

        press(&mut app, KeyCode::Esc);
        assert!(app.state().overlay().is_none());
        Ok(())
    }

    #[test]
    fn delete_waits_for_confirmation() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Kamran");
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.state().tab, Tab::Records);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store().len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store().is_empty());
        assert_eq!(app.state().status_message.as_deref(), Some("Deleted Kamran"));
        Ok(())
    }

    #[test]
    fn space_toggles_hard_copy_of_selection() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Zara");
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char(' '));
        assert!(app.store().records()[0].hard_copy_given);
        press(&mut app, KeyCode::Char(' '));
        assert!(!app.store().records()[0].hard_copy_given);
        Ok(())
    }

    #[test]
    fn search_input_captures_letters_until_enter() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Adeel");
        add_via_form(&mut app, "Saba");
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "qad");
        assert_eq!(app.state().search.filter.term, "qad");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "ad");
        press(&mut app, KeyCode::Enter);
        assert!(!app.state().search.active);
        assert_eq!(app.state().visible_records(app.store().records()).len(), 1);

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
        Ok(())
    }

    #[test]
    fn bracket_keys_edit_the_search_date_range() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Adeel");
        press(&mut app, KeyCode::Char('3'));

        press(&mut app, KeyCode::Char('['));
        type_text(&mut app, "2024-13-01");
        press(&mut app, KeyCode::Enter);
        assert_matches::assert_matches!(
            app.state().overlay(),
            Some(OverlayState::DateFilter(overlay))
                if overlay.error.as_deref() == Some("Use YYYY-MM-DD")
        );
        for _ in 0..5 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "05-11");
        press(&mut app, KeyCode::Enter);
        assert!(app.state().overlay().is_none());
        assert_eq!(app.state().search.filter.date_from, Some(date!(2024 - 05 - 11)));
        assert_eq!(app.state().visible_records(app.store().records()).len(), 0);

        press(&mut app, KeyCode::Char(']'));
        type_text(&mut app, "2024-05-10");
        press(&mut app, KeyCode::Enter);
        assert_matches::assert_matches!(
            app.state().overlay(),
            Some(OverlayState::DateFilter(overlay)) if overlay.error.is_some()
        );
        assert_eq!(app.state().search.filter.date_to, None);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('['));
        for _ in 0.."2024-05-11".len() {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state().search.filter.date_from, None);
        assert_eq!(app.state().visible_records(app.store().records()).len(), 1);
        Ok(())
    }

    #[test]
    fn exports_report_empty_store_and_write_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(
            app.state().status_message.as_deref(),
            Some("No records to export")
        );

        add_via_form(&mut app, "Hina");
        press(&mut app, KeyCode::Char('m'));
        assert!(dir.path().join("exports/master_records.xlsx").exists());
        Ok(())
    }

    #[test]
    fn print_writes_document_for_selection() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Nadia");
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('p'));
        assert!(dir.path().join("print/record_Nadia.html").exists());
        Ok(())
    }

    #[test]
    fn day_rollover_refreshes_counts_and_notifications() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, now) = app(&dir);
        add_via_form(&mut app, "Imran");
        assert!(app.state().notifications.is_empty());

        now.set(datetime!(2024-05-11 08:00 UTC));
        app.on_tick();
        assert_eq!(app.store().records()[0].days_since_added, 1);
        assert_eq!(app.state().notifications.len(), 1);
        assert_eq!(app.state().notifications[0].title, "1 Day Completed");
        Ok(())
    }

    #[test]
    fn frames_render_on_every_tab() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (mut app, _) = app(&dir);
        add_via_form(&mut app, "Tariq");
        let mut terminal = Terminal::new(TestBackend::new(100, 30))?;
        for tab in Tab::iter() {
            app.state.set_tab(tab);
            app.draw(&mut terminal)?;
        }
        press(&mut app, KeyCode::Char('a'));
        app.draw(&mut terminal)?;
        Ok(())
    }
}
