use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{JobApplication, JobStatus, Theme, ViewMode};
use crate::state::Tracker;
use crate::store::Store;

struct UiState {
    accent: Color,
    view: ViewMode,
    selected: usize,
    column: usize,
    row: usize,
    query: String,
    searching: bool,
    filter: Option<JobStatus>,
    /// Id of the card currently picked up for a cross-column move.
    held: Option<String>,
    show_reminders: bool,
    scroll_offset: u16,
}

fn theme_accent(theme: Theme) -> Color {
    match theme {
        Theme::Light => Color::Blue,
        Theme::Dark => Color::White,
        Theme::Indigo => Color::LightBlue,
        Theme::Sage => Color::Green,
        Theme::Sunset => Color::LightRed,
    }
}

impl UiState {
    fn new(view: ViewMode, accent: Color) -> Self {
        Self {
            accent,
            view,
            selected: 0,
            column: 0,
            row: 0,
            query: String::new(),
            searching: false,
            filter: None,
            held: None,
            show_reminders: false,
            scroll_offset: 0,
        }
    }

    fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(JobStatus::ALL[0]),
            Some(current) => {
                let idx = JobStatus::ALL
                    .iter()
                    .position(|&s| s == current)
                    .unwrap_or(JobStatus::ALL.len());
                JobStatus::ALL.get(idx + 1).copied()
            }
        };
    }
}

fn visible_ids(tracker: &Tracker, ui: &UiState) -> Vec<String> {
    tracker
        .filtered(&ui.query, ui.filter)
        .iter()
        .map(|a| a.id.clone())
        .collect()
}

fn column_ids(tracker: &Tracker, status: JobStatus) -> Vec<String> {
    tracker
        .applications()
        .iter()
        .filter(|a| a.status == status)
        .map(|a| a.id.clone())
        .collect()
}

pub fn run_board(tracker: &mut Tracker, store: &Store) -> Result<()> {
    let accent = theme_accent(tracker.profile().theme);
    let mut ui = UiState::new(store.load_view_mode()?, accent);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, tracker, store, &mut ui);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    tracker: &mut Tracker,
    store: &Store,
    ui: &mut UiState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        let visible = visible_ids(tracker, ui);
        if ui.selected >= visible.len() {
            ui.selected = visible.len().saturating_sub(1);
        }
        if ui.view == ViewMode::Board {
            let len = column_ids(tracker, JobStatus::ALL[ui.column]).len();
            if ui.row >= len {
                ui.row = len.saturating_sub(1);
            }
        }
        list_state.select(if visible.is_empty() {
            None
        } else {
            Some(ui.selected)
        });

        terminal.draw(|frame| draw(frame, tracker, ui, &mut list_state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if ui.searching {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => ui.searching = false,
                KeyCode::Backspace => {
                    ui.query.pop();
                }
                KeyCode::Char(c) => ui.query.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Esc => {
                if ui.show_reminders {
                    ui.show_reminders = false;
                } else if ui.held.is_some() {
                    ui.held = None;
                } else {
                    break;
                }
            }
            KeyCode::Char('v') => {
                ui.view = ui.view.toggled();
                let _ = store.save_view_mode(ui.view);
            }
            KeyCode::Char('/') => {
                ui.searching = true;
                ui.query.clear();
            }
            KeyCode::Char('f') => ui.cycle_filter(),
            KeyCode::Char('d') => ui.show_reminders = !ui.show_reminders,
            KeyCode::Down | KeyCode::Char('j') => match ui.view {
                ViewMode::Grid => {
                    if ui.selected + 1 < visible.len() {
                        ui.selected += 1;
                        ui.scroll_offset = 0;
                    }
                }
                ViewMode::Board => {
                    let len = column_ids(tracker, JobStatus::ALL[ui.column]).len();
                    if ui.row + 1 < len {
                        ui.row += 1;
                    }
                }
            },
            KeyCode::Up | KeyCode::Char('k') => match ui.view {
                ViewMode::Grid => {
                    ui.selected = ui.selected.saturating_sub(1);
                    ui.scroll_offset = 0;
                }
                ViewMode::Board => ui.row = ui.row.saturating_sub(1),
            },
            KeyCode::Left | KeyCode::Char('h') => {
                if ui.view == ViewMode::Board {
                    ui.column = ui.column.saturating_sub(1);
                    ui.row = 0;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if ui.view == ViewMode::Board && ui.column + 1 < JobStatus::ALL.len() {
                    ui.column += 1;
                    ui.row = 0;
                }
            }
            KeyCode::Char('J') | KeyCode::PageDown => {
                ui.scroll_offset = ui.scroll_offset.saturating_add(3);
            }
            KeyCode::Char('K') | KeyCode::PageUp => {
                ui.scroll_offset = ui.scroll_offset.saturating_sub(3);
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if ui.view == ViewMode::Board {
                    match ui.held.take() {
                        // Drop: the target column's status becomes the card's.
                        Some(id) => {
                            if tracker.change_status(&id, JobStatus::ALL[ui.column]) {
                                let _ = store.save_applications(tracker.applications());
                            }
                        }
                        None => {
                            let ids = column_ids(tracker, JobStatus::ALL[ui.column]);
                            ui.held = ids.get(ui.row).cloned();
                        }
                    }
                }
            }
            KeyCode::Char(c @ '1'..='6') => {
                let status = JobStatus::ALL[c as usize - '1' as usize];
                let target = match ui.view {
                    ViewMode::Grid => visible.get(ui.selected).cloned(),
                    ViewMode::Board => {
                        column_ids(tracker, JobStatus::ALL[ui.column]).get(ui.row).cloned()
                    }
                };
                if let Some(id) = target {
                    if tracker.change_status(&id, status) {
                        let _ = store.save_applications(tracker.applications());
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn status_icon(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Wishlist => "~",
        JobStatus::Applied => "+",
        JobStatus::Interviewing => "*",
        JobStatus::Offer => "o",
        JobStatus::Rejected => "x",
        JobStatus::Ghosted => "-",
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Wishlist => Style::default().fg(Color::Magenta),
        JobStatus::Applied => Style::default().fg(Color::Cyan),
        JobStatus::Interviewing => Style::default().fg(Color::Yellow),
        JobStatus::Offer => Style::default().fg(Color::Green),
        JobStatus::Rejected => Style::default().fg(Color::Red),
        JobStatus::Ghosted => Style::default().fg(Color::DarkGray),
    }
}

fn fmt_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn draw(frame: &mut Frame, tracker: &Tracker, ui: &UiState, list_state: &mut ListState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let filter_label = ui.filter.map_or("All".to_string(), |f| f.to_string());
    let header = Paragraph::new(format!(
        " {} view | filter: {} | search: {}{}",
        match ui.view {
            ViewMode::Grid => "grid",
            ViewMode::Board => "board",
        },
        filter_label,
        ui.query,
        if ui.searching { "_" } else { "" }
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(header, outer[0]);

    match ui.view {
        ViewMode::Grid => draw_grid(frame, outer[1], tracker, ui, list_state),
        ViewMode::Board => draw_board(frame, outer[1], tracker, ui),
    }

    let help = Paragraph::new(match ui.view {
        ViewMode::Grid => {
            " j/k:navigate  J/K:scroll  1-6:set status  /:search  f:filter  d:reminders  v:board  q:quit"
        }
        ViewMode::Board => {
            " h/l:column  j/k:card  space:pick up/drop  1-6:set status  d:reminders  v:grid  q:quit"
        }
    })
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, outer[2]);

    if ui.show_reminders {
        draw_reminders(frame, tracker, ui.accent);
    }
}

fn draw_grid(
    frame: &mut Frame,
    area: Rect,
    tracker: &Tracker,
    ui: &UiState,
    list_state: &mut ListState,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    let apps = tracker.filtered(&ui.query, ui.filter);

    let items: Vec<ListItem> = apps
        .iter()
        .map(|app| {
            let company = if app.company.len() > 18 {
                format!("{}...", &app.company[..15])
            } else {
                app.company.clone()
            };
            ListItem::new(format!(
                "{} {} | {}",
                status_icon(app.status),
                company,
                app.role
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ui.accent))
                .title(format!(" Applications ({}) ", apps.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = apps
        .get(ui.selected)
        .map(|app| build_detail(app))
        .unwrap_or_else(|| Text::raw("No application selected"));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((ui.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);
}

fn draw_board(frame: &mut Frame, area: Rect, tracker: &Tracker, ui: &UiState) {
    let constraints: Vec<Constraint> = JobStatus::ALL
        .iter()
        .map(|_| Constraint::Ratio(1, JobStatus::ALL.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (idx, &status) in JobStatus::ALL.iter().enumerate() {
        let cards: Vec<&JobApplication> = tracker
            .applications()
            .iter()
            .filter(|a| a.status == status)
            .collect();

        let items: Vec<ListItem> = cards
            .iter()
            .enumerate()
            .map(|(row, app)| {
                let marker = if ui.held.as_deref() == Some(app.id.as_str()) {
                    "*"
                } else if idx == ui.column && row == ui.row {
                    ">"
                } else {
                    " "
                };
                ListItem::new(format!("{} {}\n   {}", marker, app.company, app.role))
            })
            .collect();

        let border_style = if idx == ui.column {
            status_style(status).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" {} ({}) ", status, cards.len())),
        );
        frame.render_widget(list, columns[idx]);
    }
}

fn draw_reminders(frame: &mut Frame, tracker: &Tracker, accent: Color) {
    let deadlines = tracker.upcoming_deadlines(Utc::now());

    let mut lines: Vec<Line> = vec![];
    if deadlines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No urgent deadlines.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for d in &deadlines {
        lines.push(Line::from(Span::styled(
            d.label.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {} @ {}", d.role, d.company)));
        lines.push(Line::from(Span::styled(
            format!("  Due: {}", d.when.format("%Y-%m-%d %H:%M")),
            Style::default().fg(Color::Red),
        )));
    }

    let area = frame.area();
    let width = 48u16.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: (area.width - width) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent))
                    .title(" Next 48 hours "),
            )
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn build_detail(app: &JobApplication) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} @ {}", app.role, app.company),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status),
        status_style(app.status),
    )));
    if !app.url.is_empty() {
        lines.push(Line::from(format!("URL: {}", app.url)));
    }
    if !app.location.is_empty() {
        lines.push(Line::from(format!("Location: {}", app.location)));
    }
    if !app.salary.is_empty() {
        lines.push(Line::from(format!("Salary: {}", app.salary)));
    }
    if !app.applied_date.is_empty() {
        lines.push(Line::from(format!("Applied: {}", app.applied_date)));
    }
    lines.push(Line::from(format!(
        "Updated: {}",
        fmt_millis(app.last_updated)
    )));

    if !app.important_dates.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Important Dates",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for d in &app.important_dates {
            lines.push(Line::from(format!("  {} - {}", d.date, d.label)));
        }
    }

    if !app.notes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&app.notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    if !app.activity_log.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Activity",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for entry in &app.activity_log {
            lines.push(Line::from(format!(
                "  {}  {}",
                fmt_millis(entry.timestamp),
                entry.note
            )));
        }
    }

    Text::from(lines)
}
