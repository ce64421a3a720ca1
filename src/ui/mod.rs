use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use regex::Regex;
use strum::IntoEnumIterator;
use time::Date;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, FormField, FormOverlay, OverlayState, Tab};
use crate::highlight::{build_highlight_regex, segments};
use crate::markup::strip_markup;
use crate::notify::NotificationKind;
use crate::records::{date_label, time_label, Record};
use crate::timeline::{format_time_spent, Status};
use crate::views::{newest_first, DashboardStats, HardCopyFilter, TimeTrackingStats};

const RECENT_ON_DASHBOARD: usize = 8;

/// Borrowed data a frame renders alongside [`AppState`].
pub struct View<'a> {
    pub records: &'a [Record],
    pub today: Date,
}

pub fn draw_app(frame: &mut Frame, state: &AppState, view: &View, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    draw_tabs(frame, state, vertical[0]);
    match state.tab {
        Tab::Dashboard => draw_dashboard(frame, state, view, list_state, vertical[1]),
        Tab::Records => draw_records(frame, state, view, list_state, vertical[1]),
        Tab::Search => draw_search(frame, state, view, list_state, vertical[1]),
        Tab::TimeTracking => draw_tracking(frame, state, view, list_state, vertical[1]),
    }

    let status = Paragraph::new(build_status_line(state, view))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, vertical[2]);

    render_overlay(frame, state);
}

fn draw_tabs(frame: &mut Frame, state: &AppState, area: Rect) {
    let titles: Vec<Line> = Tab::iter()
        .enumerate()
        .map(|(idx, tab)| {
            let label = match tab {
                Tab::Dashboard if state.unread_notifications() > 0 => {
                    format!("{} {tab} ({})", idx + 1, state.unread_notifications())
                }
                _ => format!("{} {tab}", idx + 1),
            };
            Line::from(label)
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(state.tab.index())
        .block(Block::default().title("Record Desk").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn selected_style() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn hard_copy_span(given: bool) -> Span<'static> {
    if given {
        Span::styled("Hard copy: Yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("Hard copy: No", Style::default().fg(Color::Yellow))
    }
}

fn stamp(record: &Record) -> String {
    format!(
        "{} {}",
        date_label(record.date_added),
        time_label(record.time_added)
    )
}

fn draw_dashboard(
    frame: &mut Frame,
    state: &AppState,
    view: &View,
    list_state: &mut ListState,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let stats = DashboardStats::compute(view.records, view.today, state.recent_window_days);
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(rows[0]);
    let recent_label = format!("Last {} days", state.recent_window_days);
    let values = [
        ("Total Records", stats.total.to_string(), Color::Cyan),
        ("Hard Copy Given", stats.hard_copy_given.to_string(), Color::Green),
        ("Pending", stats.pending.to_string(), Color::Yellow),
        (recent_label.as_str(), stats.recent.to_string(), Color::Magenta),
        ("Completion Rate", format!("{}%", stats.completion_rate), Color::Blue),
    ];
    for ((label, value, color), slot) in values.into_iter().zip(cards.iter()) {
        let card = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().title(label).borders(Borders::ALL));
        frame.render_widget(card, *slot);
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    let mut items: Vec<ListItem> = state
        .notifications
        .iter()
        .map(|note| {
            let color = match note.kind {
                NotificationKind::Info => Color::Cyan,
                NotificationKind::Warning => Color::Yellow,
                NotificationKind::Error => Color::Red,
                NotificationKind::Success => Color::Green,
            };
            let title_style = if note.read {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(color).add_modifier(Modifier::BOLD)
            };
            let marker = if note.read { "  " } else { "● " };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(color)),
                    Span::styled(note.title.clone(), title_style),
                ]),
                Line::from(Span::styled(
                    format!("  {}", note.message),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No notifications today."));
    }
    let title = format!("Notifications ({} unread)", state.unread_notifications());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(selected_style())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, columns[0], list_state);

    let mut recent: Vec<ListItem> = newest_first(view.records)
        .into_iter()
        .take(RECENT_ON_DASHBOARD)
        .map(|record| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    record.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(stamp(record), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();
    if recent.is_empty() {
        recent.push(ListItem::new("No records yet. Press `a` to add one."));
    }
    let recent = List::new(recent).block(
        Block::default()
            .title("Recent Records")
            .borders(Borders::ALL),
    );
    frame.render_widget(recent, columns[1]);
}

fn record_item(record: &Record, regex: Option<&Regex>) -> ListItem<'static> {
    let highlight = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let mut meta = vec![Span::styled(
        format!("{}  ", stamp(record)),
        Style::default().fg(Color::Gray),
    )];
    meta.push(hard_copy_span(record.hard_copy_given));
    let mut contact = highlight_line(
        &record.email,
        regex,
        highlight,
        Style::default().fg(Color::Gray),
    );
    contact.push(Span::raw("  "));
    contact.extend(highlight_line(
        &record.cnic,
        regex,
        highlight,
        Style::default().fg(Color::Gray),
    ));
    ListItem::new(vec![
        Line::from(highlight_line(
            &record.name,
            regex,
            highlight,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(contact),
        Line::from(meta),
    ])
}

fn draw_records(
    frame: &mut Frame,
    state: &AppState,
    view: &View,
    list_state: &mut ListState,
    area: Rect,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let visible = state.visible_records(view.records);
    let mut items: Vec<ListItem> = visible
        .iter()
        .map(|record| record_item(record, None))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No records yet. Press `a` to add one."));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!("Records ({})", visible.len()))
                .borders(Borders::ALL),
        )
        .highlight_style(selected_style())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, columns[0], list_state);

    let detail = match visible.get(state.selected) {
        Some(record) => record_detail(record, view.today),
        None => Text::from(Span::styled(
            "Select a record to see its details.",
            Style::default().fg(Color::Gray),
        )),
    };
    let detail = Paragraph::new(detail)
        .block(Block::default().title("Details").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, columns[1]);
}

fn record_detail(record: &Record, today: Date) -> Text<'static> {
    let label = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD);
    let days = crate::timeline::days_since(record.date_added, today);
    let mut lines = vec![
        Line::from(Span::styled(
            record.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (name, value) in [
        ("Number", record.number.clone()),
        ("Email", record.email.clone()),
        ("CNIC", record.cnic.clone()),
        ("Added", stamp(record)),
        ("Days since added", days.to_string()),
    ] {
        lines.push(Line::from(vec![
            Span::styled(format!("{name:<18}"), label),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled(format!("{:<18}", "Hard copy"), label),
        hard_copy_span(record.hard_copy_given),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Notes", label)));
    let notes = strip_markup(&record.notes);
    if notes.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            "No notes",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.extend(notes.lines().map(|line| Line::from(line.to_string())));
    }
    Text::from(lines)
}

fn draw_search(
    frame: &mut Frame,
    state: &AppState,
    view: &View,
    list_state: &mut ListState,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let filter = &state.search.filter;
    let mut input = vec![Span::styled(
        "/",
        if state.search.active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        },
    )];
    if filter.term.is_empty() && !state.search.active {
        input.push(Span::styled(
            "(press / to type)",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        input.push(Span::styled(
            filter.term.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    if state.search.active {
        input.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    }
    input.push(Span::raw("  "));
    input.push(Span::styled(
        format!("[scope: {}]", filter.scope),
        Style::default().fg(Color::Green),
    ));
    if filter.hard_copy != HardCopyFilter::All {
        input.push(Span::raw(" "));
        input.push(Span::styled(
            format!("[hard copy: {}]", filter.hard_copy),
            Style::default().fg(Color::Green),
        ));
    }
    for (label, bound) in [("from", filter.date_from), ("to", filter.date_to)] {
        if let Some(date) = bound {
            input.push(Span::raw(" "));
            input.push(Span::styled(
                format!("[{label}: {}]", date_label(date)),
                Style::default().fg(Color::Green),
            ));
        }
    }
    let active = filter.active_filter_count();
    if active > 0 {
        input.push(Span::styled(
            format!("  {active} active filter(s)"),
            Style::default().fg(Color::Gray),
        ));
    }
    let input = Paragraph::new(Line::from(input))
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(input, rows[0]);

    let regex = build_highlight_regex(&filter.term);
    let visible = state.visible_records(view.records);
    let mut items: Vec<ListItem> = visible
        .iter()
        .map(|record| record_item(record, regex.as_ref()))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No records match the current filters."));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(
                    "Results ({} of {})",
                    visible.len(),
                    view.records.len()
                ))
                .borders(Borders::ALL),
        )
        .highlight_style(selected_style())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, rows[1], list_state);
}

fn status_style(status: Status) -> Style {
    let color = match status {
        Status::Active => Color::Yellow,
        Status::Completed => Color::Green,
        Status::Overdue => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn draw_tracking(
    frame: &mut Frame,
    state: &AppState,
    view: &View,
    list_state: &mut ListState,
    area: Rect,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let all = crate::timeline::time_tracking(view.records, view.today);
    let stats = TimeTrackingStats::compute(&all);
    let query = &state.tracking;
    let status_filter = query
        .status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "all".to_string());
    let summary = Line::from(vec![
        Span::raw(format!("Total {}  ", stats.total)),
        Span::styled(
            format!("Active {}  ", stats.active),
            status_style(Status::Active),
        ),
        Span::styled(
            format!("Completed {}  ", stats.completed),
            status_style(Status::Completed),
        ),
        Span::styled(
            format!("Overdue {}  ", stats.overdue),
            status_style(Status::Overdue),
        ),
        Span::raw(format!("Avg days {}", stats.avg_days)),
        Span::styled(
            format!(
                "   [status: {status_filter}] [sort: {} {}]",
                query.sort, query.order
            ),
            Style::default().fg(Color::Green),
        ),
    ]);
    let summary = Paragraph::new(summary)
        .block(Block::default().title("Time Tracking").borders(Borders::ALL));
    frame.render_widget(summary, rows[0]);

    let entries = state.tracking_entries(view.records, view.today);
    let name_width = entries
        .iter()
        .map(|entry| entry.name.width())
        .max()
        .unwrap_or(0)
        .min(28);
    let mut items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let pad = name_width.saturating_sub(entry.name.width());
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", entry.status.to_string()),
                    status_style(entry.status),
                ),
                Span::styled(
                    format!("{}{}  ", entry.name, " ".repeat(pad)),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{:>4} days  ", entry.days_since_added)),
                Span::styled(
                    format!("{:<20}", format_time_spent(entry.hours_spent)),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!(
                        "{} {}",
                        date_label(entry.date_added),
                        time_label(entry.time_added)
                    ),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("Nothing to track."));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!("Entries ({})", entries.len()))
                .borders(Borders::ALL),
        )
        .highlight_style(selected_style())
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, rows[1], list_state);
}

fn build_status_line(state: &AppState, view: &View) -> Text<'static> {
    let mut spans = vec![
        Span::raw(format!("Records: {}", view.records.len())),
        Span::raw(" | Today: "),
        Span::styled(
            date_label(view.today),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if state.import_pending {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "importing…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    if let Some(message) = &state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let keys = match state.tab {
        Tab::Dashboard => "Enter mark read • x mark all read • a add • m/n export • i import • q quit",
        Tab::Records => {
            "a add • e edit • d delete • Space hard copy • p print • m/n export • i import • q quit"
        }
        Tab::Search if state.search.active => "type to search • Enter done • Esc clear",
        Tab::Search => {
            "/ search • f scope • h hard copy • [/] date range • c clear • n export results • q quit"
        }
        Tab::TimeTracking => "s status • o sort • r order • n export • Space hard copy • q quit",
    };
    Text::from(vec![
        Line::from(spans),
        Line::from(vec![
            Span::styled(
                "Keys: ",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(keys, Style::default().fg(Color::DarkGray)),
        ]),
    ])
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    segments(text, regex)
        .into_iter()
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(hit, piece)| {
            let style = if hit {
                base_style.patch(highlight_style)
            } else {
                base_style
            };
            Span::styled(piece.to_string(), style)
        })
        .collect()
}

fn render_overlay(frame: &mut Frame, state: &AppState) {
    match state.overlay() {
        Some(OverlayState::Form(form)) => {
            let area = centered_rect(60, 70, frame.size());
            frame.render_widget(Clear, area);
            let title = if form.editing.is_some() {
                "Edit Record"
            } else {
                "New Record"
            };
            let paragraph = Paragraph::new(form_lines(form))
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::ConfirmDelete(overlay)) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("Delete {}?", overlay.name),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "This cannot be undone.",
                    Style::default().fg(Color::Gray),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "y/Enter to delete • n/Esc to cancel",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(
                Block::default()
                    .title("Confirm Delete")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::Import(overlay)) => {
            let area = centered_rect(60, 25, frame.size());
            frame.render_widget(Clear, area);
            let mut path = overlay.path.clone();
            path.push('▌');
            let paragraph = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Path to an .xlsx workbook",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(path),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter to import • Esc to cancel",
                    Style::default().fg(Color::Gray),
                )),
            ])
            .block(
                Block::default()
                    .title("Import Records")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        Some(OverlayState::DateFilter(overlay)) => {
            let area = centered_rect(50, 30, frame.size());
            frame.render_widget(Clear, area);
            let mut input = overlay.input.clone();
            input.push('▌');
            let mut lines = vec![
                Line::from(Span::styled(
                    format!("{} date (YYYY-MM-DD, blank clears)", overlay.bound),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(input),
            ];
            if let Some(error) = &overlay.error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter to apply • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
            let paragraph = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title("Date Range")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn form_lines(form: &FormOverlay) -> Vec<Line<'static>> {
    let focused = form.focused();
    let mut lines = Vec::new();
    for field in FormField::iter() {
        let is_focused = field == focused;
        let label_style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let required = if field.validated().is_some() { " *" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("{}{required}", field.label()),
            label_style,
        )));
        let mut value = form.value(field);
        if is_focused && field != FormField::HardCopy {
            value.push('▌');
        }
        lines.push(Line::from(format!("  {value}")));
        if let Some(error) = form.error_for(field) {
            lines.push(Line::from(Span::styled(
                format!("  {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab/↓ next • Shift-Tab/↑ previous • Space toggles hard copy • Enter save • Esc cancel",
        Style::default().fg(Color::Gray),
    )));
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
