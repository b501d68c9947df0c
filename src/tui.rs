use std::cell::Cell;
use std::io::stdout;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use jobsieve::models::{FacetDefinition, FacetKind, FacetValue, JobRecord};
use jobsieve::{FacetCatalog, FacetSelection, FilterState, FilterStore, query};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pane {
    Facets,
    Candidates,
    Jobs,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Pane::Facets => Pane::Candidates,
            Pane::Candidates => Pane::Jobs,
            Pane::Jobs => Pane::Facets,
        }
    }
}

/// One row of the candidates pane.
struct Row {
    value: Option<FacetValue>,
    label: String,
    checked: bool,
}

struct AppState {
    store: FilterStore,
    jobs: Vec<JobRecord>,
    visible: Vec<usize>,
    dirty: Rc<Cell<bool>>,
    pane: Pane,
    facet_index: usize,
    candidate_index: usize,
    job_index: usize,
    input: String,
    message: Option<String>,
}

impl AppState {
    fn new(catalog: Arc<FacetCatalog>, jobs: Vec<JobRecord>, initial: FilterState) -> Result<Self> {
        let mut store = FilterStore::new(catalog);
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        store.subscribe(move |_| flag.set(true));
        store.replace_state(initial)?;

        let mut state = Self {
            store,
            jobs,
            visible: Vec::new(),
            dirty,
            pane: Pane::Facets,
            facet_index: 0,
            candidate_index: 0,
            job_index: 0,
            input: String::new(),
            message: None,
        };
        state.refresh();
        Ok(state)
    }

    /// Re-filters after a change notification.
    fn refresh(&mut self) {
        if !self.dirty.replace(false) {
            return;
        }
        let predicate = self.store.predicate();
        self.visible = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| predicate.matches(job))
            .map(|(i, _)| i)
            .collect();
        if self.job_index >= self.visible.len() {
            self.job_index = self.visible.len().saturating_sub(1);
        }
    }

    fn facet(&self) -> Option<&FacetDefinition> {
        self.store.catalog().iter().nth(self.facet_index)
    }

    fn current_job(&self) -> Option<&JobRecord> {
        self.visible.get(self.job_index).and_then(|&i| self.jobs.get(i))
    }

    fn rows(&self) -> Vec<Row> {
        let Some(facet) = self.facet() else { return Vec::new() };
        let selection = self.store.state().get(&facet.key);

        if facet.kind == FacetKind::Boolean {
            let on = matches!(selection, Some(FacetSelection::Toggle(true)));
            return vec![Row {
                value: None,
                label: facet.label.clone(),
                checked: on,
            }];
        }

        // Free-text picks stay listed so they can be unselected whatever
        // the suggestions show.
        let candidates = match selection {
            Some(FacetSelection::FreeText(picked)) => {
                let suggested = self.store.suggest(&facet.key, &self.input).unwrap_or_default();
                let mut rows = picked.clone();
                rows.extend(suggested.into_iter().filter(|v| !picked.iter().any(|p| p.id == v.id)));
                rows
            }
            _ => facet.candidates.clone(),
        };

        candidates
            .into_iter()
            .map(|value| {
                let checked = match selection {
                    Some(FacetSelection::Single(id)) => id.as_deref() == Some(value.id.as_str()),
                    Some(FacetSelection::Multi(ids)) => ids.contains(&value.id),
                    Some(FacetSelection::FreeText(values)) => values.iter().any(|v| v.id == value.id),
                    _ => false,
                };
                let label = match &value.subtitle {
                    Some(subtitle) => format!("{} ({})", value.title, subtitle),
                    None => value.title.clone(),
                };
                Row {
                    value: Some(value),
                    label,
                    checked,
                }
            })
            .collect()
    }

    fn select_facet(&mut self, index: usize) {
        self.facet_index = index;
        self.candidate_index = 0;
        self.input.clear();
    }

    fn next_facet(&mut self) {
        let count = self.store.catalog().len();
        if count > 0 {
            self.select_facet((self.facet_index + 1) % count);
        }
    }

    fn prev_facet(&mut self) {
        let count = self.store.catalog().len();
        if count > 0 {
            self.select_facet((self.facet_index + count - 1) % count);
        }
    }

    fn down(&mut self) {
        match self.pane {
            Pane::Facets => self.next_facet(),
            Pane::Candidates => {
                let rows = self.rows().len();
                if rows > 0 && self.candidate_index < rows - 1 {
                    self.candidate_index += 1;
                }
            }
            Pane::Jobs => {
                if !self.visible.is_empty() && self.job_index < self.visible.len() - 1 {
                    self.job_index += 1;
                }
            }
        }
    }

    fn up(&mut self) {
        match self.pane {
            Pane::Facets => self.prev_facet(),
            Pane::Candidates => self.candidate_index = self.candidate_index.saturating_sub(1),
            Pane::Jobs => self.job_index = self.job_index.saturating_sub(1),
        }
    }

    /// Flips the highlighted candidate in or out of the selection.
    fn activate(&mut self) {
        let Some(facet) = self.facet().cloned() else { return };
        let rows = self.rows();
        let Some(row) = rows.get(self.candidate_index) else { return };

        let result = match (facet.kind, &row.value) {
            (FacetKind::Boolean, _) => self.store.set_boolean(&facet.key, !row.checked),
            (FacetKind::SingleSelect, Some(value)) => {
                let next = if row.checked { None } else { Some(value.id.as_str()) };
                self.store.set_single_select(&facet.key, next)
            }
            (FacetKind::MultiSelect, Some(value)) => {
                self.store.toggle_multi_select(&facet.key, &value.id, !row.checked)
            }
            (FacetKind::FreeTextAutocomplete, Some(value)) => {
                if row.checked {
                    self.store.remove_free_text_selection(&facet.key, &value.id)
                } else {
                    self.input.clear();
                    self.candidate_index = 0;
                    self.store.add_free_text_selection(&facet.key, value.clone())
                }
            }
            (_, None) => Ok(()),
        };
        self.message = result.err().map(|e| e.to_string());
    }

    fn type_char(&mut self, c: char) {
        if self.facet().map(|f| f.kind) == Some(FacetKind::FreeTextAutocomplete) {
            self.input.push(c);
            self.candidate_index = 0;
        }
    }
}

/// Runs the interactive browser and returns the final query string.
pub fn run_browse(catalog: Arc<FacetCatalog>, jobs: Vec<JobRecord>, initial: FilterState) -> Result<String> {
    let mut state = AppState::new(catalog, jobs, initial)?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result?;
    Ok(query::encode(state.store.catalog(), state.store.state()))
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, state: &mut AppState) -> Result<()> {
    loop {
        state.refresh();
        terminal.draw(|frame| draw(frame, state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => break,
            KeyCode::Char('x') if ctrl => state.store.clear_all(),
            KeyCode::Esc => {
                if state.input.is_empty() {
                    break;
                }
                state.input.clear();
            }
            KeyCode::Tab => state.pane = state.pane.next(),
            KeyCode::Left => state.prev_facet(),
            KeyCode::Right => state.next_facet(),
            KeyCode::Down => state.down(),
            KeyCode::Up => state.up(),
            KeyCode::Enter => {
                if state.pane == Pane::Candidates {
                    state.activate();
                }
            }
            KeyCode::Backspace => {
                state.input.pop();
                state.candidate_index = 0;
            }
            KeyCode::Char(' ') if state.input.is_empty() && state.pane == Pane::Candidates => {
                state.activate();
            }
            KeyCode::Char(c) if state.pane == Pane::Candidates => state.type_char(c),
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20), Constraint::Percentage(30), Constraint::Percentage(50)])
        .split(outer[0]);

    let focused = |pane: Pane| {
        if state.pane == pane {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    // Facets
    let facet_items: Vec<ListItem> = state
        .store
        .catalog()
        .iter()
        .map(|facet| {
            let active = state
                .store
                .state()
                .get(&facet.key)
                .is_some_and(|s| !s.is_default());
            let marker = if active { "*" } else { " " };
            ListItem::new(format!("{} {}", marker, facet.label))
        })
        .collect();
    let mut facet_list_state = ListState::default();
    facet_list_state.select(Some(state.facet_index));
    let facets = List::new(facet_items)
        .block(Block::default().borders(Borders::ALL).border_style(focused(Pane::Facets)).title(" Filters "))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(facets, columns[0], &mut facet_list_state);

    // Candidates
    let rows = state.rows();
    let title = match state.facet() {
        Some(facet) if facet.kind == FacetKind::FreeTextAutocomplete => {
            format!(" {}: {}_ ", facet.label, state.input)
        }
        Some(facet) => format!(" {} ", facet.label),
        None => " - ".to_string(),
    };
    let candidate_items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let check = if row.checked { "[x]" } else { "[ ]" };
            ListItem::new(format!("{} {}", check, row.label))
        })
        .collect();
    let mut candidate_list_state = ListState::default();
    if !rows.is_empty() {
        candidate_list_state.select(Some(state.candidate_index.min(rows.len() - 1)));
    }
    let candidates = List::new(candidate_items)
        .block(Block::default().borders(Borders::ALL).border_style(focused(Pane::Candidates)).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(candidates, columns[1], &mut candidate_list_state);

    // Jobs and detail
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(columns[2]);

    let job_items: Vec<ListItem> = state
        .visible
        .iter()
        .filter_map(|&i| state.jobs.get(i))
        .map(|job| {
            let title = if job.title.len() > 35 {
                format!("{}...", job.title.chars().take(32).collect::<String>())
            } else {
                job.title.clone()
            };
            let company = job.company.as_deref().unwrap_or("?");
            ListItem::new(format!("#{:<4} {} | {}", job.id, title, company))
        })
        .collect();
    let filtered = if state.store.has_active_filters() { " (filtered)" } else { "" };
    let mut job_list_state = ListState::default();
    if !state.visible.is_empty() {
        job_list_state.select(Some(state.job_index));
    }
    let jobs = List::new(job_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focused(Pane::Jobs))
                .title(format!(" Jobs ({}/{}){} ", state.visible.len(), state.jobs.len(), filtered)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(jobs, right[0], &mut job_list_state);

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, right[1]);

    // Query string and help
    let encoded = query::encode(state.store.catalog(), state.store.state());
    let status = match &state.message {
        Some(message) => Span::styled(format!(" {}", message), Style::default().fg(Color::Red)),
        None => Span::styled(format!(" ?{}", encoded), Style::default().fg(Color::Cyan)),
    };
    frame.render_widget(Paragraph::new(Line::from(status)), outer[1]);

    let help = Paragraph::new(
        " tab:pane  arrows:move  enter/space:toggle  type:search  ctrl-x:clear all  esc:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, outer[2]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(job) = state.current_job() else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if let Some(company) = &job.company {
        lines.push(Line::from(format!("at {}", company)));
    }
    if !job.location.is_empty() {
        lines.push(Line::from(format!("Location: {}", job.location)));
    }
    lines.push(Line::from(format!(
        "{} | {} | {}",
        job.work_mode, job.job_type, job.experience_level
    )));

    let mut flags = Vec::new();
    if job.is_remote {
        flags.push("remote");
    }
    if job.visa_sponsorship {
        flags.push("visa sponsorship");
    }
    if !flags.is_empty() {
        lines.push(Line::from(Span::styled(flags.join(", "), Style::default().fg(Color::Green))));
    }
    if !job.skills.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Skills: {}", job.skills.join(", ")),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(format!("Posted: {}", job.posted_at.format("%Y-%m-%d"))));
    lines.push(Line::from(""));

    match &job.description {
        Some(description) => {
            for line in textwrap::fill(description, 70).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No description)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}
