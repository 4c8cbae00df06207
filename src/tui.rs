use std::time::Duration;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::sync::watch;
use tracing::info;

use task_tracker::{
    application::{
        task_store::TaskStore,
        views::{day_progress, filter_by_day, weekly_summary},
    },
    domain::{
        repository::KeyValueStore,
        task::{CATEGORIES, NewTask, Task, TaskId, TaskPatch, TaskStatus, parse_date, today},
    },
    error::TrackerError,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, Create, EditTitle, ConfirmDelete }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field { Title, Description, Date, Time, Category }

impl Field {
    fn next(self) -> Self {
        match self { Field::Title => Field::Description, Field::Description => Field::Date, Field::Date => Field::Time, Field::Time => Field::Category, Field::Category => Field::Title }
    }

    fn label(self) -> &'static str {
        match self { Field::Title => "Title", Field::Description => "Desc", Field::Date => "Date", Field::Time => "Time", Field::Category => "Category" }
    }
}

#[derive(Default)]
struct Draft {
    title: String,
    description: String,
    date: String,
    time: String,
    category: usize,
}

impl Draft {
    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Description => Some(&mut self.description),
            Field::Date => Some(&mut self.date),
            Field::Time => Some(&mut self.time),
            Field::Category => None,
        }
    }

    fn shown(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Date => &self.date,
            Field::Time => &self.time,
            Field::Category => CATEGORIES[self.category],
        }
    }
}

pub struct App<S: KeyValueStore> {
    store: TaskStore<S>,
    updates: watch::Receiver<Vec<Task>>,
    tasks: Vec<Task>,
    filter_date: NaiveDate,
    show_completed: bool,
    selected: usize,
    list_state: ListState,
    mode: Mode,
    field: Field,
    draft: Draft,
    message: Option<String>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(store: TaskStore<S>) -> Self {
        let updates = store.subscribe();
        let tasks = store.tasks().to_vec();
        Self {
            store,
            updates,
            tasks,
            filter_date: today(),
            show_completed: true,
            selected: 0,
            list_state: ListState::default(),
            mode: Mode::View,
            field: Field::Title,
            draft: Draft::default(),
            message: None,
        }
    }

    fn visible(&self) -> Vec<&Task> { filter_by_day(&self.tasks, self.filter_date, self.show_completed) }

    fn selected_id(&self) -> Option<TaskId> { self.visible().get(self.selected).map(|t| t.id.clone()) }

    /// Picks up the latest collection published by the store and clamps the selection.
    fn refresh(&mut self) {
        if self.updates.has_changed().unwrap_or(false) {
            self.tasks = self.updates.borrow_and_update().clone();
        }
        let len = self.visible().len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn shift_day(&mut self, forward: bool) {
        let step = Days::new(1);
        let moved = if forward { self.filter_date.checked_add_days(step) } else { self.filter_date.checked_sub_days(step) };
        if let Some(d) = moved { self.filter_date = d; self.selected = 0; }
    }

    fn open_form(&mut self) {
        self.draft = Draft { date: self.filter_date.to_string(), ..Draft::default() };
        self.field = Field::Title;
        self.mode = Mode::Create;
    }

    async fn submit_form(&mut self) {
        let date = match self.draft.date.trim() {
            "" => None,
            raw => match parse_date(raw) {
                Some(d) => Some(d),
                None => { self.message = Some(TrackerError::InvalidDate(raw.to_string()).to_string()); return; }
            },
        };
        let input = NewTask {
            title: self.draft.title.clone(),
            description: self.draft.description.clone(),
            date,
            time: Some(self.draft.time.clone()),
            category: Some(CATEGORIES[self.draft.category].to_string()),
        };
        match self.store.create(input).await {
            Ok(task) => { self.message = Some(format!("added \"{}\" on {}", task.title, task.date)); self.mode = Mode::View; }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::View => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Up => { if self.selected > 0 { self.selected -= 1; } }
                KeyCode::Down => { if self.selected + 1 < self.visible().len() { self.selected += 1; } }
                KeyCode::Left => self.shift_day(false),
                KeyCode::Right => self.shift_day(true),
                KeyCode::Char('t') => { self.filter_date = today(); self.selected = 0; }
                KeyCode::Char('c') => self.show_completed = !self.show_completed,
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(id) = self.selected_id() { self.store.toggle_done(&id).await; }
                }
                KeyCode::Char('s') => {
                    if let Some(id) = self.selected_id() { self.store.toggle_doing(&id).await; }
                }
                KeyCode::Char('n') => self.open_form(),
                KeyCode::Char('e') => {
                    if let Some(title) = self.visible().get(self.selected).map(|t| t.title.clone()) {
                        self.draft = Draft { title, ..Draft::default() };
                        self.mode = Mode::EditTitle;
                    }
                }
                KeyCode::Char('d') => { if self.selected_id().is_some() { self.mode = Mode::ConfirmDelete; } }
                _ => {}
            },
            Mode::ConfirmDelete => {
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    if let Some(id) = self.selected_id() {
                        self.store.delete(&id).await;
                        if self.selected > 0 { self.selected -= 1; }
                    }
                }
                self.mode = Mode::View;
            }
            Mode::EditTitle => match key.code {
                KeyCode::Esc => self.mode = Mode::View,
                KeyCode::Enter => {
                    if let Some(id) = self.selected_id() {
                        if let Err(e) = self.store.update(&id, TaskPatch::title(self.draft.title.clone())).await {
                            self.message = Some(e.to_string());
                        }
                    }
                    self.mode = Mode::View;
                }
                KeyCode::Backspace => { self.draft.title.pop(); }
                KeyCode::Char(c) => self.draft.title.push(c),
                _ => {}
            },
            Mode::Create => match key.code {
                KeyCode::Esc => self.mode = Mode::View,
                KeyCode::Enter => self.submit_form().await,
                KeyCode::Tab => self.field = self.field.next(),
                KeyCode::Left | KeyCode::Right if self.field == Field::Category => {
                    let n = CATEGORIES.len();
                    self.draft.category = if key.code == KeyCode::Right { (self.draft.category + 1) % n } else { (self.draft.category + n - 1) % n };
                }
                KeyCode::Backspace => { if let Some(text) = self.draft.text_mut(self.field) { text.pop(); } }
                KeyCode::Char(c) => { if let Some(text) = self.draft.text_mut(self.field) { text.push(c); } }
                _ => {}
            },
        }
        false
    }
}

pub async fn run<B: Backend, S: KeyValueStore>(terminal: &mut Terminal<B>, mut app: App<S>) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    app.refresh();
    loop {
        terminal.draw(|f| draw(f, &mut app))?;
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                app.message = None;
                if app.handle_key(key).await { break; }
                app.refresh();
            }
        }
    }
    info!(tasks = app.tasks.len(), synced = app.store.is_synced(), "leaving tracker");
    Ok(())
}

fn draw<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(f.size());

    let header = Paragraph::new("Enter/space: done, s: start/stop, n: new, e: edit title, d: delete, ←/→: day, t: today, c: completed, q: quit")
        .block(Block::default().borders(Borders::ALL).title("task-tracker"));
    f.render_widget(header, chunks[0]);

    let visible = app.visible();
    let progress = day_progress(visible.iter().copied());
    let controls = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    let filter = Paragraph::new(format!("Day {}  |  completed shown: {}", app.filter_date, if app.show_completed { "yes" } else { "no" }))
        .block(Block::default().borders(Borders::ALL).title("filter"));
    f.render_widget(filter, controls[0]);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(u16::from(progress.percent))
        .label(progress.to_string());
    f.render_widget(gauge, controls[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    let items: Vec<ListItem> = visible.iter().map(|t| {
        let mark = match t.status { TaskStatus::Todo => "[ ]", TaskStatus::Doing => "[~]", TaskStatus::Done => "[x]" };
        let time = t.time.as_deref().map(|tm| format!(" • {tm}")).unwrap_or_default();
        ListItem::new(format!("{mark} {}  ({}{time})", t.title, t.category))
    }).collect();
    let empty = items.is_empty();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!("tasks for {}", app.filter_date)))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");
    let detail = match visible.get(app.selected) {
        Some(t) => format!(
            "Title:\n{}\n\nStatus: {}\nCategory: {}\nTime: {}\nCreated: {}\n\nDescription:\n{}",
            t.title,
            t.status.as_str().to_uppercase(),
            t.category,
            t.time.as_deref().unwrap_or("-"),
            t.created_at.format("%Y-%m-%d %H:%M"),
            if t.description.is_empty() { "(no description)" } else { t.description.as_str() },
        ),
        None if empty => "No task for this day. Press n to add one.".to_string(),
        None => String::new(),
    };
    drop(visible);
    f.render_stateful_widget(list, middle[0], &mut app.list_state);
    let details = Paragraph::new(detail).wrap(Wrap { trim: false }).block(Block::default().borders(Borders::ALL).title("details"));
    f.render_widget(details, middle[1]);

    draw_week(f, app, chunks[3]);

    let footer_text = match app.mode {
        Mode::View => match (&app.message, app.store.is_synced()) {
            (Some(msg), _) => msg.clone(),
            (None, false) => "storage unavailable: changes are kept in memory only".to_string(),
            (None, true) => format!("{} tasks stored", app.tasks.len()),
        },
        Mode::ConfirmDelete => "Delete this task? (y/n)".to_string(),
        Mode::EditTitle => format!("Edit title: {}_  |  (Enter to save, Esc to cancel)", app.draft.title),
        Mode::Create => {
            let hint = if app.field == Field::Category { "←/→ to pick" } else { "Tab to switch" };
            let err = app.message.as_deref().map(|m| format!("  |  {m}")).unwrap_or_default();
            format!("New — {}: {}_  |  ({hint}, Enter to save, Esc to cancel){err}", app.field.label(), app.draft.shown(app.field))
        }
    };
    let footer = Paragraph::new(footer_text)
        .block(Block::default().borders(Borders::ALL).title(match app.mode { Mode::View => "info", Mode::Create => "create", Mode::EditTitle => "edit", Mode::ConfirmDelete => "delete" }));
    f.render_widget(footer, chunks[4]);
}

fn draw_week<S: KeyValueStore>(f: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("last 7 days");
    let inner = block.inner(area);
    f.render_widget(block, area);
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(inner);
    for (day, cell) in weekly_summary(&app.tasks, today()).iter().zip(cells.iter()) {
        let text = format!("{}\n{} tasks\n{}%", day.label(), day.total, day.percent);
        f.render_widget(Paragraph::new(text), *cell);
    }
}
