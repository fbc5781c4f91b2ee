use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::{ApiClient, JobPayload};
use crate::models::{JobApplication, JobStatus};

struct AppState {
    jobs: Vec<JobApplication>,
    filter: Option<JobStatus>,
    selected: usize,
    scroll_offset: u16,
    message: Option<String>,
    pending_delete: bool,
}

impl AppState {
    fn new(jobs: Vec<JobApplication>, filter: Option<JobStatus>) -> Self {
        Self {
            jobs,
            filter,
            selected: 0,
            scroll_offset: 0,
            message: None,
            pending_delete: false,
        }
    }

    /// Indices into `jobs` matching the current filter, original order kept.
    fn visible(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| self.filter.is_none_or(|s| j.status == s))
            .map(|(i, _)| i)
            .collect()
    }

    fn current_job(&self) -> Option<&JobApplication> {
        let visible = self.visible();
        visible.get(self.selected).map(|&i| &self.jobs[i])
    }

    fn filter_label(&self) -> &'static str {
        match self.filter {
            None => "All",
            Some(status) => status.as_str(),
        }
    }

    fn next(&mut self) {
        let count = self.visible().len();
        if count > 0 && self.selected < count - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(JobStatus::ALL[0]),
            Some(current) => {
                let pos = JobStatus::ALL.iter().position(|s| *s == current);
                match pos {
                    Some(i) if i + 1 < JobStatus::ALL.len() => Some(JobStatus::ALL[i + 1]),
                    _ => None,
                }
            }
        };
        self.selected = 0;
        self.scroll_offset = 0;
    }

    /// Refetch the full list after a mutation; the server is the source of
    /// truth, no optimistic updates.
    fn reload(&mut self, api: &ApiClient, token: &str) {
        match api.get_jobs(token) {
            Ok(jobs) => {
                self.jobs = jobs;
                let count = self.visible().len();
                if self.selected >= count {
                    self.selected = count.saturating_sub(1);
                }
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn set_status(&mut self, api: &ApiClient, token: &str, status: JobStatus) {
        let Some(job) = self.current_job() else { return };
        if job.status == status {
            return;
        }
        let mut payload = JobPayload::from_application(job);
        payload.status = status;
        let job_id = job.id.clone();
        match api.update_job(token, &job_id, &payload) {
            Ok(_) => {
                self.message = None;
                self.reload(api, token);
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    fn delete_current(&mut self, api: &ApiClient, token: &str) {
        let Some(job) = self.current_job() else { return };
        let job_id = job.id.clone();
        match api.delete_job(token, &job_id) {
            Ok(response) => {
                self.message = Some(response.message);
                self.reload(api, token);
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }
}

pub fn run_browse(api: &ApiClient, token: &str, filter: Option<JobStatus>) -> Result<()> {
    let jobs = api.get_jobs(token)?;
    if jobs.is_empty() {
        println!("No applications yet. Add one to get started!");
        return Ok(());
    }

    let mut state = AppState::new(jobs, filter);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, api, token);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    api: &ApiClient,
    token: &str,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if state.pending_delete {
                match key.code {
                    KeyCode::Char('y') => {
                        state.pending_delete = false;
                        state.delete_current(api, token);
                    }
                    _ => {
                        state.pending_delete = false;
                        state.message = None;
                    }
                }
                list_state.select(Some(state.selected));
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('f') | KeyCode::Tab => state.cycle_filter(),
                KeyCode::Char('r') => {
                    state.message = None;
                    state.reload(api, token);
                }
                KeyCode::Char('a') => state.set_status(api, token, JobStatus::Applied),
                KeyCode::Char('i') => state.set_status(api, token, JobStatus::Interview),
                KeyCode::Char('o') => state.set_status(api, token, JobStatus::Offer),
                KeyCode::Char('x') => state.set_status(api, token, JobStatus::Rejected),
                KeyCode::Char('A') => state.set_status(api, token, JobStatus::Accepted),
                KeyCode::Char('d') => {
                    if let Some(job) = state.current_job() {
                        let prompt = format!("Delete '{} at {}'? (y/n)", job.role, job.company);
                        state.message = Some(prompt);
                        state.pending_delete = true;
                    }
                }
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: filtered application list with a live count badge
    let visible = state.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|&i| {
            let job = &state.jobs[i];
            let status_icon = match job.status {
                JobStatus::Applied => "+",
                JobStatus::Interview => "*",
                JobStatus::Offer => "o",
                JobStatus::Rejected => "x",
                JobStatus::Accepted => "#",
            };
            ListItem::new(format!(
                "{} {} | {}",
                status_icon,
                truncate(&job.role, 28),
                truncate(&job.company, 18)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ({}) ",
            state.filter_label(),
            visible.len()
        )))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, panes[0], list_state);

    // Right panel: application detail
    let detail_widget = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, panes[1]);

    // Footer: pending message, or the key help
    let footer = match &state.message {
        Some(message) => Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " j/k:navigate  J/K:scroll  f:filter  a/i/o/x/A:status  d:delete  r:refresh  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[1]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(job) = state.current_job() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &job.role,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));

    let status_style = match job.status {
        JobStatus::Applied => Style::default().fg(Color::Cyan),
        JobStatus::Interview => Style::default().fg(Color::Yellow),
        JobStatus::Offer => Style::default().fg(Color::Magenta),
        JobStatus::Rejected => Style::default().fg(Color::Red),
        JobStatus::Accepted => Style::default().fg(Color::Green),
    };
    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status),
        status_style,
    )));
    lines.push(Line::from(format!("Created: {}", job.created_date())));
    lines.push(Line::from(""));

    if job.notes.is_empty() {
        lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for paragraph in job.notes.lines() {
            if paragraph.is_empty() {
                lines.push(Line::from(""));
                continue;
            }
            for wrapped in textwrap::fill(paragraph, 70).lines() {
                lines.push(Line::from(format!("  {}", wrapped)));
            }
        }
    }

    Text::from(lines)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
