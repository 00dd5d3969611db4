use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use std::io::stdout;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::actions::Panel;
use crate::api::ApiClient;
use crate::app::App;
use crate::config::Config;
use crate::dispatch::{Command, Dispatcher, Envelope};
use crate::filters::FilterField;
use crate::forms::{
    company_options, filter_options, location_options, ComboOption, EditableForm,
};
use crate::models::{ApplicationStatus, Job, Role, WorkType};
use crate::pagination::PageButton;
use crate::session::Session;
use crate::view::{AuthMode, Tab, ViewState};
use crate::truncate;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisInput {
    City,
    Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    ResumeUrl,
    GoToPage,
}

struct Prompt {
    kind: PromptKind,
    buffer: String,
}

struct UiState {
    view: ViewState,
    selected: usize,
    list_state: ListState,
    role_cursor: usize,
    field: usize,
    editing: bool,
    analysis_input: AnalysisInput,
    prompt: Option<Prompt>,
    scroll: u16,
}

impl UiState {
    fn new() -> Self {
        Self {
            view: ViewState::NoRole,
            selected: 0,
            list_state: ListState::default(),
            role_cursor: 0,
            field: 0,
            editing: false,
            analysis_input: AnalysisInput::City,
            prompt: None,
            scroll: 0,
        }
    }

    /// Resets per-screen cursors whenever the screen changes.
    fn sync(&mut self, app: &App) {
        let view = app.view();
        if view != self.view {
            self.view = view;
            self.selected = 0;
            self.field = 0;
            self.scroll = 0;
            self.editing = matches!(
                view,
                ViewState::Auth { .. } | ViewState::LoggedIn { tab: Tab::PostJob, .. }
            );
            if matches!(view, ViewState::NoRole) {
                self.prompt = None;
            }
        }
        let len = row_count(app);
        if len == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll = 0;
        }
    }
}

enum Flow {
    Continue(Command),
    Quit,
}

pub fn run_browse(runtime: &Runtime, api: ApiClient, config: &Config) -> Result<()> {
    let (dispatcher, mut completions) =
        Dispatcher::new(api, runtime.handle().clone(), config.dislike_delay());
    let mut app = App::new(config.page_size);
    let mut ui = UiState::new();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut app, &mut ui, &dispatcher, &mut completions);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    ui: &mut UiState,
    dispatcher: &Dispatcher,
    completions: &mut UnboundedReceiver<Envelope>,
) -> Result<()> {
    loop {
        while let Ok(envelope) = completions.try_recv() {
            let follow_up = app.handle(envelope);
            dispatcher.run(app.serial(), follow_up);
        }

        ui.sync(app);
        terminal.draw(|frame| draw(frame, app, ui))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(app, ui, key) {
                Flow::Quit => break,
                Flow::Continue(command) => dispatcher.run(app.serial(), command),
            }
        }
    }
    Ok(())
}

// --- Input ---

fn handle_key(app: &mut App, ui: &mut UiState, key: KeyEvent) -> Flow {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }
    if app.alert().is_some() {
        app.dismiss_alert();
        return Flow::Continue(Command::None);
    }
    if ui.prompt.is_some() {
        return Flow::Continue(handle_prompt(app, ui, key.code));
    }

    match app.view() {
        ViewState::NoRole => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Flow::Quit,
            KeyCode::Down | KeyCode::Char('j') => {
                ui.role_cursor = 1;
                Flow::Continue(Command::None)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                ui.role_cursor = 0;
                Flow::Continue(Command::None)
            }
            KeyCode::Char('1') => Flow::Continue(app.select_role(Role::Employee)),
            KeyCode::Char('2') => Flow::Continue(app.select_role(Role::Employer)),
            KeyCode::Enter => {
                let role = if ui.role_cursor == 0 {
                    Role::Employee
                } else {
                    Role::Employer
                };
                Flow::Continue(app.select_role(role))
            }
            _ => Flow::Continue(Command::None),
        },
        ViewState::Auth { mode, .. } => Flow::Continue(handle_auth_key(app, ui, mode, key.code)),
        ViewState::LoggedIn { tab, .. } => handle_session_key(app, ui, tab, key.code),
    }
}

/// Applies a field-editing key to a form. Returns false for keys forms do
/// not use.
fn edit_form(form: &mut dyn EditableForm, field: &mut usize, code: KeyCode) -> bool {
    let len = form.len();
    match code {
        KeyCode::Tab | KeyCode::Down => *field = (*field + 1) % len,
        KeyCode::BackTab | KeyCode::Up => *field = (*field + len - 1) % len,
        KeyCode::Backspace => {
            if let Some(value) = form.value_mut(*field) {
                value.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(value) = form.value_mut(*field) {
                value.push(c);
            }
        }
        _ => return false,
    }
    true
}

fn handle_auth_key(app: &mut App, ui: &mut UiState, mode: AuthMode, code: KeyCode) -> Command {
    match code {
        KeyCode::Esc => {
            app.back_to_roles();
            Command::None
        }
        KeyCode::F(2) => {
            ui.field = 0;
            app.set_auth_mode(match mode {
                AuthMode::Login => AuthMode::Signup,
                AuthMode::Signup => AuthMode::Login,
            });
            Command::None
        }
        KeyCode::Enter => match mode {
            AuthMode::Login => app.submit_login(),
            AuthMode::Signup => app.submit_signup(),
        },
        code => {
            let form: &mut dyn EditableForm = match mode {
                AuthMode::Login => &mut app.login_form,
                AuthMode::Signup => &mut app.signup_form,
            };
            edit_form(form, &mut ui.field, code);
            Command::None
        }
    }
}

fn handle_prompt(app: &mut App, ui: &mut UiState, code: KeyCode) -> Command {
    let Some(prompt) = ui.prompt.as_mut() else {
        return Command::None;
    };
    match code {
        KeyCode::Esc => {
            ui.prompt = None;
            Command::None
        }
        KeyCode::Backspace => {
            prompt.buffer.pop();
            Command::None
        }
        KeyCode::Char(c) => {
            prompt.buffer.push(c);
            Command::None
        }
        KeyCode::Enter => {
            let Some(Prompt { kind, buffer }) = ui.prompt.take() else {
                return Command::None;
            };
            let Some(session) = app.session_mut() else {
                return Command::None;
            };
            match kind {
                PromptKind::ResumeUrl => session.update_resume(&buffer),
                PromptKind::GoToPage => {
                    ui.selected = 0;
                    session.go_to_page_input(&buffer)
                }
            }
        }
        _ => Command::None,
    }
}

fn handle_session_key(app: &mut App, ui: &mut UiState, tab: Tab, code: KeyCode) -> Flow {
    if ui.editing {
        return Flow::Continue(handle_editing_key(app, ui, tab, code));
    }

    match code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Tab | KeyCode::Right => return Flow::Continue(app.cycle_tab(1)),
        KeyCode::BackTab | KeyCode::Left => return Flow::Continue(app.cycle_tab(-1)),
        KeyCode::Char('o') => {
            app.sign_out();
            return Flow::Continue(Command::None);
        }
        KeyCode::Char('u') => {
            if let Some(session) = app.session() {
                if session.role() == Role::Employee {
                    ui.prompt = Some(Prompt {
                        kind: PromptKind::ResumeUrl,
                        buffer: session.profile().resume_url.clone().unwrap_or_default(),
                    });
                }
            }
            return Flow::Continue(Command::None);
        }
        _ => {}
    }

    let len = row_count(app);
    match code {
        KeyCode::Down | KeyCode::Char('j') => {
            ui.next(len);
            return Flow::Continue(Command::None);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            ui.prev();
            return Flow::Continue(Command::None);
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            ui.scroll = ui.scroll.saturating_add(3);
            return Flow::Continue(Command::None);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            ui.scroll = ui.scroll.saturating_sub(3);
            return Flow::Continue(Command::None);
        }
        _ => {}
    }

    let selected = ui.selected;
    let references_locations = app.references.locations().to_vec();
    let references_companies = app.references.companies().to_vec();
    let Some(session) = app.session_mut() else {
        return Flow::Continue(Command::None);
    };

    let command = match tab {
        Tab::Jobs => {
            let job_id = session.listing().jobs().get(selected).map(|job| job.job_id);
            match (code, job_id) {
                (KeyCode::Char('/'), _) => {
                    ui.editing = true;
                    ui.field = 0;
                    Command::None
                }
                (KeyCode::Char('R'), _) => session.reset_filters(),
                (KeyCode::Char('n'), _) => session.next_page(),
                (KeyCode::Char('p'), _) => session.prev_page(),
                (KeyCode::Char('g'), _) => session.refresh_jobs(),
                (KeyCode::Home, _) => session.go_to_page(0),
                // a digit starts a page number
                (KeyCode::Char(c @ '0'..='9'), _) => {
                    ui.prompt = Some(Prompt {
                        kind: PromptKind::GoToPage,
                        buffer: c.to_string(),
                    });
                    Command::None
                }
                (KeyCode::Char('G'), _) => {
                    ui.prompt = Some(Prompt {
                        kind: PromptKind::GoToPage,
                        buffer: String::new(),
                    });
                    Command::None
                }
                (KeyCode::End, _) => {
                    let last = session.listing().pagination().total_pages().saturating_sub(1);
                    session.go_to_page(last)
                }
                (KeyCode::Enter | KeyCode::Char('d'), Some(id)) => {
                    session.toggle_details(id);
                    Command::None
                }
                (KeyCode::Char('r'), Some(id)) => session.toggle_recommendations(id),
                (KeyCode::Char('a'), Some(id)) => session.apply(id),
                (KeyCode::Char('s'), Some(id)) => session.toggle_shortlist(id),
                (KeyCode::Char('x'), Some(id)) => session.dislike(id),
                _ => Command::None,
            }
        }
        Tab::Applications => match code {
            KeyCode::Char('g') => session.refresh_applications(),
            _ => Command::None,
        },
        Tab::Shortlist => {
            let job_id = session
                .shortlisted_jobs()
                .data()
                .and_then(|jobs| jobs.get(selected))
                .map(|job| job.job_id);
            match (code, job_id) {
                (KeyCode::Char('g'), _) => session.activate_tab(Tab::Shortlist),
                (KeyCode::Char('s') | KeyCode::Delete, Some(id)) => session.toggle_shortlist(id),
                (KeyCode::Char('a'), Some(id)) => session.apply(id),
                (KeyCode::Enter | KeyCode::Char('d'), Some(id)) => {
                    session.toggle_details(id);
                    Command::None
                }
                _ => Command::None,
            }
        }
        Tab::PostJob => match code {
            KeyCode::Enter | KeyCode::Char('e') => {
                ui.editing = true;
                Command::None
            }
            _ => Command::None,
        },
        Tab::Applicants => {
            let target = session
                .applicants()
                .data()
                .and_then(|apps| apps.get(selected))
                .map(|app| (app.employee_id, app.job_id));
            match (code, target) {
                (KeyCode::Char('g'), _) => session.refresh_applicants(),
                (KeyCode::Char('A'), Some((employee_id, job_id))) => {
                    session.change_applicant_status(employee_id, job_id, ApplicationStatus::Accepted)
                }
                (KeyCode::Char('X'), Some((employee_id, job_id))) => {
                    session.change_applicant_status(employee_id, job_id, ApplicationStatus::Rejected)
                }
                _ => Command::None,
            }
        }
        Tab::Analysis => match code {
            KeyCode::Char('m') => session.toggle_salary_metric(),
            KeyCode::Char('n') => {
                session.next_salary_page();
                Command::None
            }
            KeyCode::Char('p') => {
                session.prev_salary_page();
                Command::None
            }
            KeyCode::Char('c') => {
                ui.analysis_input = AnalysisInput::City;
                ui.editing = true;
                Command::None
            }
            KeyCode::Char('C') => {
                ui.analysis_input = AnalysisInput::Company;
                ui.editing = true;
                Command::None
            }
            KeyCode::Enter => match ui.analysis_input {
                AnalysisInput::City => session.load_location_stats(&references_locations),
                AnalysisInput::Company => session.load_company_stats(&references_companies),
            },
            _ => Command::None,
        },
    };
    Flow::Continue(command)
}

fn handle_editing_key(app: &mut App, ui: &mut UiState, tab: Tab, code: KeyCode) -> Command {
    let locations = app.references.locations().to_vec();
    let companies = app.references.companies().to_vec();
    let Some(session) = app.session_mut() else {
        return Command::None;
    };

    if code == KeyCode::Esc {
        ui.editing = false;
        return Command::None;
    }

    match tab {
        Tab::Jobs => {
            let fields = FilterField::ALL;
            let field = fields[ui.field % fields.len()];
            let mut value = session.filters().inputs().get(field).to_string();
            match code {
                KeyCode::Enter => {
                    ui.editing = false;
                    ui.selected = 0;
                    return session.search(&locations, &companies);
                }
                KeyCode::Tab | KeyCode::Down => ui.field = (ui.field + 1) % fields.len(),
                KeyCode::BackTab | KeyCode::Up => {
                    ui.field = (ui.field + fields.len() - 1) % fields.len()
                }
                KeyCode::Backspace => {
                    value.pop();
                    session.set_filter_input(field, value);
                }
                KeyCode::Char(c) => {
                    value.push(c);
                    session.set_filter_input(field, value);
                }
                _ => {}
            }
            Command::None
        }
        Tab::PostJob => {
            if code == KeyCode::Enter {
                return session.submit_post_job(&locations);
            }
            edit_form(&mut session.post_job, &mut ui.field, code);
            Command::None
        }
        Tab::Analysis => {
            let analysis = session.analysis_mut();
            let input = match ui.analysis_input {
                AnalysisInput::City => &mut analysis.city_input,
                AnalysisInput::Company => &mut analysis.company_input,
            };
            match code {
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                KeyCode::Enter => {
                    ui.editing = false;
                    return match ui.analysis_input {
                        AnalysisInput::City => session.load_location_stats(&locations),
                        AnalysisInput::Company => session.load_company_stats(&companies),
                    };
                }
                _ => {}
            }
            Command::None
        }
        _ => {
            ui.editing = false;
            Command::None
        }
    }
}

fn row_count(app: &App) -> usize {
    let (Some(session), ViewState::LoggedIn { tab, .. }) = (app.session(), app.view()) else {
        return 0;
    };
    match tab {
        Tab::Jobs => session.listing().jobs().len(),
        Tab::Applications => session.applications().entries().len(),
        Tab::Shortlist => session.shortlisted_jobs().data().map_or(0, Vec::len),
        Tab::Applicants => session.applicants().data().map_or(0, Vec::len),
        Tab::PostJob | Tab::Analysis => 0,
    }
}

// --- Rendering ---

fn draw(frame: &mut Frame, app: &App, ui: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    match app.view() {
        ViewState::NoRole => draw_roles(frame, chunks[0], ui),
        ViewState::Auth { role, mode } => draw_auth(frame, chunks[0], app, ui, role, mode),
        ViewState::LoggedIn { role, tab } => {
            if let Some(session) = app.session() {
                draw_session(frame, chunks[0], app, session, ui, role, tab);
            }
        }
    }

    let help = Paragraph::new(help_text(app.view(), ui)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);

    if let Some(prompt) = &ui.prompt {
        let title = match prompt.kind {
            PromptKind::ResumeUrl => " Resume URL ",
            PromptKind::GoToPage => " Go to page ",
        };
        let area = centered(frame.area(), 60, 3);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(format!("{}_", prompt.buffer))
                .block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    if let Some(alert) = app.alert() {
        let area = centered(frame.area(), 60, 5);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(alert)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Notice (any key) ")
                        .border_style(Style::default().fg(Color::Yellow)),
                ),
            area,
        );
    }
}

fn help_text(view: ViewState, ui: &UiState) -> &'static str {
    if let Some(prompt) = &ui.prompt {
        return match prompt.kind {
            PromptKind::ResumeUrl => " Enter:save  Esc:cancel",
            PromptKind::GoToPage => " Enter:go  Esc:cancel",
        };
    }
    match view {
        ViewState::NoRole => " 1:job seeker  2:employer  j/k:move  Enter:select  q:quit",
        ViewState::Auth { .. } => " Tab:next field  Enter:submit  F2:login/signup  Esc:back  Ctrl-C:quit",
        ViewState::LoggedIn { .. } if ui.editing => " Tab:next field  Enter:submit  Esc:stop editing",
        ViewState::LoggedIn { tab, .. } => match tab {
            Tab::Jobs => " j/k:move d:details r:similar a:apply s:shortlist x:dislike /:filter R:reset n/p/0-9:page g:refresh Tab:tabs u:resume o:sign out q:quit",
            Tab::Applications => " j/k:move  g:refresh  Tab:tabs  u:resume  o:sign out  q:quit",
            Tab::Shortlist => " j/k:move  d:details  s:remove  a:apply  g:refresh  Tab:tabs  o:sign out  q:quit",
            Tab::PostJob => " e:edit form  Tab:tabs  o:sign out  q:quit",
            Tab::Applicants => " j/k:move  A:accept  X:reject  g:refresh  Tab:tabs  o:sign out  q:quit",
            Tab::Analysis => " m:min/max salary  n/p:page  c:city stats  C:company stats  Tab:tabs  o:sign out  q:quit",
        },
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn bold(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn dim(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

fn draw_roles(frame: &mut Frame, area: Rect, ui: &UiState) {
    let items: Vec<ListItem> = [Role::Employee, Role::Employer]
        .iter()
        .map(|role| ListItem::new(format!("  {}", role.label())))
        .collect();
    let mut state = ListState::default();
    state.select(Some(ui.role_cursor));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Job Board - I am a... "))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, centered(area, 40, 4), &mut state);
}

fn form_lines(form: &dyn EditableForm, focused: Option<usize>) -> Vec<Line<'static>> {
    (0..form.len())
        .map(|i| {
            let value = if form.is_secret(i) {
                "*".repeat(form.value(i).chars().count())
            } else {
                form.value(i).to_string()
            };
            let is_focused = focused == Some(i);
            let label_style = if is_focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let cursor = if is_focused { "_" } else { "" };
            Line::from(vec![
                Span::styled(format!("{:>20}: ", form.labels()[i]), label_style),
                Span::raw(format!("{}{}", value, cursor)),
            ])
        })
        .collect()
}

fn suggestion_lines(options: &[ComboOption], input: &str) -> Vec<Line<'static>> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    let matches = filter_options(options, input);
    let mut lines = vec![dim(format!("  {} match(es):", matches.len()))];
    lines.extend(
        matches
            .iter()
            .take(SUGGESTIONS)
            .map(|opt| dim(format!("    {}", opt.label))),
    );
    lines
}

fn work_type_hint() -> Line<'static> {
    let names: Vec<&str> = WorkType::ALL.iter().map(|w| w.label()).collect();
    dim(format!("  Work types: {}", names.join(", ")))
}

fn draw_auth(frame: &mut Frame, area: Rect, app: &App, ui: &UiState, role: Role, mode: AuthMode) {
    let (title, form): (String, &dyn EditableForm) = match mode {
        AuthMode::Login => (format!(" {} Login ", role.label()), &app.login_form),
        AuthMode::Signup => (format!(" {} Signup ", role.label()), &app.signup_form),
    };
    let mut lines = form_lines(form, Some(ui.field));
    lines.push(Line::from(""));
    if app.is_submitting() {
        lines.push(dim("  Submitting..."));
    }
    if mode == AuthMode::Signup {
        match ui.field {
            5 => lines.extend(suggestion_lines(
                &location_options(app.references.locations()),
                &app.signup_form.location,
            )),
            6 => lines.extend(suggestion_lines(
                &company_options(app.references.companies()),
                &app.signup_form.company,
            )),
            _ => {}
        }
        if role == Role::Employer {
            lines.push(dim("  Employers must select a company."));
        }
    }

    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, centered(area, 80, 20));
}

fn draw_session(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    session: &Session,
    ui: &mut UiState,
    role: Role,
    tab: Tab,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let tabs = Tab::for_role(role);
    let titles: Vec<Line> = tabs.iter().map(|t| Line::from(t.title())).collect();
    let selected = tabs.iter().position(|t| *t == tab).unwrap_or(0);
    let profile = session.profile();
    let header = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} ({}) ",
            profile.user_name,
            role.label()
        )))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    match tab {
        Tab::Jobs => draw_jobs(frame, chunks[1], app, session, ui),
        Tab::Applications => draw_applications(frame, chunks[1], session, ui),
        Tab::Shortlist => draw_shortlist(frame, chunks[1], session, ui),
        Tab::PostJob => draw_post_job(frame, chunks[1], app, session, ui),
        Tab::Applicants => draw_applicants(frame, chunks[1], session, ui),
        Tab::Analysis => draw_analysis(frame, chunks[1], session, ui),
    }
}

fn job_item(session: &Session, job: &Job) -> ListItem<'static> {
    let star = if session.actions().is_shortlisting(job.job_id) {
        "…"
    } else if session.shortlist().contains(job.job_id) {
        "★"
    } else {
        "☆"
    };
    let status = if session.actions().is_applying(job.job_id) {
        "applying"
    } else if session.actions().is_disliking(job.job_id) {
        "hiding"
    } else if session.has_applied(job.job_id) {
        "applied"
    } else {
        ""
    };
    ListItem::new(format!(
        "{} {:<32} {:<18} {:>14} {}",
        star,
        truncate(&job.title, 32),
        truncate(&job.company_name, 18),
        job.salary_range(),
        status
    ))
}

fn job_detail(session: &Session, job: &Job) -> Text<'static> {
    let mut lines = vec![bold(job.title.clone()), Line::from(format!("at {}", job.company_name))];
    lines.push(Line::from(format!("Location: {}", job.location())));
    lines.push(Line::from(format!("Salary: {}", job.salary_range())));
    lines.push(Line::from(format!("Work type: {}", job.work_type)));
    if let Some(date) = &job.post_date {
        lines.push(Line::from(format!("Posted: {}", date)));
    }
    lines.push(Line::from(format!(
        "Applied: {}  Shortlisted: {}  Disliked: {}",
        job.apply_count.unwrap_or(0),
        job.shortlist_count.unwrap_or(0),
        job.dislike_count.unwrap_or(0)
    )));
    if session.has_applied(job.job_id) {
        lines.push(Line::from(Span::styled(
            "You have applied to this job",
            Style::default().fg(Color::Green),
        )));
    }
    lines.push(Line::from(""));

    match session.actions().panel(job.job_id) {
        Some(Panel::Details) => {
            lines.push(bold("Description"));
            for line in textwrap::fill(&job.description, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        Some(Panel::Recommendations) => {
            lines.push(bold("Similar jobs"));
            match session.recommendations(job.job_id) {
                Some(recs) if recs.loading => lines.push(dim("  Loading recommendations...")),
                Some(recs) if recs.error.is_some() => lines.push(Line::from(Span::styled(
                    format!("  {}", recs.error.as_deref().unwrap_or_default()),
                    Style::default().fg(Color::Red),
                ))),
                Some(recs) => match recs.data() {
                    Some(jobs) if !jobs.is_empty() => {
                        for rec in jobs {
                            lines.push(Line::from(format!(
                                "  #{} {} | {} | {}",
                                rec.job_id,
                                rec.title,
                                rec.company_name,
                                rec.salary_range()
                            )));
                        }
                    }
                    _ => lines.push(dim("  No similar jobs found")),
                },
                None => lines.push(dim("  No similar jobs found")),
            }
        }
        None => lines.push(dim("(d: description, r: similar jobs)")),
    }
    Text::from(lines)
}

fn pagination_line(session: &Session) -> Line<'static> {
    let pagination = session.listing().pagination();
    let mut spans = vec![Span::raw(" « p  ")];
    for button in pagination.buttons() {
        match button {
            PageButton::Page { index, current: true } => spans.push(Span::styled(
                format!("[{}] ", index + 1),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            PageButton::Page { index, .. } => spans.push(Span::raw(format!("{} ", index + 1))),
            PageButton::Ellipsis => spans.push(Span::raw("… ")),
        }
    }
    spans.push(Span::raw(format!(
        " n »   {} jobs",
        pagination.total_count()
    )));
    Line::from(spans)
}

fn draw_jobs(frame: &mut Frame, area: Rect, app: &App, session: &Session, ui: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    // Filter bar
    let inputs = session.filters().inputs();
    let mut spans = Vec::new();
    for (i, field) in FilterField::ALL.iter().enumerate() {
        let focused = ui.editing && ui.field % FilterField::ALL.len() == i;
        let style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{}: ", field.label()), style));
        let value = inputs.get(*field);
        spans.push(Span::raw(format!(
            "{}{}  ",
            if value.is_empty() && !focused { "any" } else { value },
            if focused { "_" } else { "" }
        )));
    }
    let filters = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(
            if session.filters().committed().is_empty() {
                " Filters (/ to edit) "
            } else {
                " Filters active (/ to edit, R to reset) "
            },
        ));
    frame.render_widget(filters, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let listing = session.listing();
    let title = if listing.is_loading() {
        if listing.jobs().is_empty() {
            " Loading jobs... ".to_string()
        } else {
            " Loading more jobs... ".to_string()
        }
    } else {
        format!(" Available Jobs ({}) ", listing.pagination().total_count())
    };

    if ui.editing {
        // Suggestions replace the job list while a filter is being typed
        let field = FilterField::ALL[ui.field % FilterField::ALL.len()];
        let mut lines = match field {
            FilterField::City => suggestion_lines(
                &location_options(app.references.locations()),
                &inputs.city,
            ),
            FilterField::Company => suggestion_lines(
                &company_options(app.references.companies()),
                &inputs.company,
            ),
            FilterField::WorkType => vec![work_type_hint()],
            _ => vec![dim("  Amounts in thousands")],
        };
        lines.insert(0, dim("  Enter to search, Esc to stop editing"));
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(Block::default().borders(Borders::ALL).title(title)),
            body[0],
        );
    } else if let Some(error) = listing.error() {
        frame.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(title)),
            body[0],
        );
    } else if listing.jobs().is_empty() && !listing.is_loading() {
        frame.render_widget(
            Paragraph::new("No jobs available. Press g to refresh.")
                .block(Block::default().borders(Borders::ALL).title(title)),
            body[0],
        );
    } else {
        let items: Vec<ListItem> = listing.jobs().iter().map(|job| job_item(session, job)).collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, body[0], &mut ui.list_state);
    }

    let detail = match listing.jobs().get(ui.selected) {
        Some(job) => job_detail(session, job),
        None => Text::raw("No job selected"),
    };
    frame.render_widget(
        Paragraph::new(detail)
            .block(Block::default().borders(Borders::ALL).title(" Detail "))
            .wrap(Wrap { trim: false })
            .scroll((ui.scroll, 0)),
        body[1],
    );

    if listing.pagination().total_pages() > 1 {
        frame.render_widget(Paragraph::new(pagination_line(session)), chunks[2]);
    }
}

fn status_style(status: ApplicationStatus) -> Style {
    match status {
        ApplicationStatus::Pending => Style::default().fg(Color::Yellow),
        ApplicationStatus::Accepted => Style::default().fg(Color::Green),
        ApplicationStatus::Rejected => Style::default().fg(Color::Red),
    }
}

fn draw_applications(frame: &mut Frame, area: Rect, session: &Session, ui: &mut UiState) {
    let applications = session.applications();
    let title = if applications.is_loading() {
        " My Applications (loading...) ".to_string()
    } else {
        format!(" My Applications ({}) ", applications.entries().len())
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(error) = applications.error() {
        frame.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }
    if applications.entries().is_empty() {
        frame.render_widget(
            Paragraph::new("You haven't applied to any jobs yet.").block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = applications
        .entries()
        .iter()
        .map(|app| {
            let title = app
                .job_title
                .clone()
                .unwrap_or_else(|| format!("Job #{}", app.job_id));
            ListItem::new(Line::from(vec![
                Span::raw(format!(
                    "{:<34} {:<20} {:<12} ",
                    truncate(&title, 32),
                    truncate(app.company_name.as_deref().unwrap_or("-"), 18),
                    app.application_date.as_deref().unwrap_or("-"),
                )),
                Span::styled(app.status.label(), status_style(app.status)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut ui.list_state);
}

fn draw_shortlist(frame: &mut Frame, area: Rect, session: &Session, ui: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let shortlisted = session.shortlisted_jobs();
    let block = Block::default().borders(Borders::ALL).title(if session.shortlist().is_empty() {
        " Shortlisted Jobs ".to_string()
    } else {
        format!(" Shortlisted Jobs ({}) ", session.shortlist().len())
    });

    if shortlisted.loading {
        frame.render_widget(Paragraph::new("Loading shortlisted jobs...").block(block), chunks[0]);
        return;
    }
    if let Some(error) = &shortlisted.error {
        frame.render_widget(
            Paragraph::new(error.clone())
                .style(Style::default().fg(Color::Red))
                .block(block),
            chunks[0],
        );
        return;
    }
    let jobs = shortlisted.data().map_or(&[][..], Vec::as_slice);
    if jobs.is_empty() {
        frame.render_widget(
            Paragraph::new("You haven't shortlisted any jobs yet.").block(block),
            chunks[0],
        );
        return;
    }

    let items: Vec<ListItem> = jobs.iter().map(|job| job_item(session, job)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut ui.list_state);

    if let Some(job) = jobs.get(ui.selected) {
        frame.render_widget(
            Paragraph::new(job_detail(session, job))
                .block(Block::default().borders(Borders::ALL).title(" Detail "))
                .wrap(Wrap { trim: false })
                .scroll((ui.scroll, 0)),
            chunks[1],
        );
    }
}

fn draw_post_job(frame: &mut Frame, area: Rect, app: &App, session: &Session, ui: &UiState) {
    let focused = ui.editing.then_some(ui.field);
    let mut lines = form_lines(&session.post_job, focused);
    lines.push(Line::from(""));
    match focused {
        Some(1) => lines.extend(suggestion_lines(
            &location_options(app.references.locations()),
            &session.post_job.location,
        )),
        Some(2) => lines.push(work_type_hint()),
        _ => {}
    }
    if !ui.editing {
        lines.push(dim("  Press e to edit, then Enter to post the job."));
    }
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Post a New Job ")),
        area,
    );
}

fn draw_applicants(frame: &mut Frame, area: Rect, session: &Session, ui: &mut UiState) {
    let applicants = session.applicants();
    let block = Block::default().borders(Borders::ALL).title(" Applicants ");
    if applicants.loading {
        frame.render_widget(Paragraph::new("Loading applications...").block(block), area);
        return;
    }
    if let Some(error) = &applicants.error {
        frame.render_widget(
            Paragraph::new(error.clone())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }
    let apps = applicants.data().map_or(&[][..], Vec::as_slice);
    if apps.is_empty() {
        frame.render_widget(Paragraph::new("No applications yet.").block(block), area);
        return;
    }

    let items: Vec<ListItem> = apps
        .iter()
        .map(|app| {
            let name = app
                .employee_name
                .clone()
                .unwrap_or_else(|| format!("Employee #{}", app.employee_id));
            let title = app
                .job_title
                .clone()
                .unwrap_or_else(|| format!("Job #{}", app.job_id));
            ListItem::new(Line::from(vec![
                Span::raw(format!(
                    "{:<22} {:<34} {:<12} ",
                    truncate(&name, 20),
                    truncate(&title, 32),
                    app.application_date.as_deref().unwrap_or("-")
                )),
                Span::styled(app.status.label(), status_style(app.status)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut ui.list_state);
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn draw_analysis(frame: &mut Frame, area: Rect, session: &Session, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let analysis = session.analysis();

    // Salary table
    let mut lines = vec![bold(format!(
        "Average {} by location",
        analysis.salary_metric.label()
    ))];
    if analysis.salaries.loading {
        lines.push(dim("Loading statistics..."));
    } else if let Some(error) = &analysis.salaries.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    } else {
        lines.push(Line::from(format!("{:<20} {:<16} {:>10}", "City", "Country", "Salary(k)")));
        for row in analysis.salary_rows() {
            lines.push(Line::from(format!(
                "{:<20} {:<16} {:>10}",
                truncate(&row.city_name, 20),
                truncate(&row.country_name, 16),
                row.value(analysis.salary_metric)
                    .map_or_else(|| "-".to_string(), |v| format!("${:.0}", v))
            )));
        }
        let pages = analysis.salary_pages.total_pages().max(1);
        lines.push(dim(format!(
            "Page {} of {}",
            analysis.salary_pages.current_page() + 1,
            pages
        )));
    }
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::ALL).title(" Salaries ")),
        chunks[0],
    );

    // Stats
    let input_line = |label: &str, value: &str, active: bool| {
        let style = if active && ui.editing {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{}: ", label), style),
            Span::raw(format!("{}{}", value, if active && ui.editing { "_" } else { "" })),
        ])
    };
    let mut lines = vec![input_line(
        "City",
        &analysis.city_input,
        ui.analysis_input == AnalysisInput::City,
    )];
    if let Some(stats) = analysis.location_stats.data() {
        lines.push(Line::from(format!(
            "  avg apply {}  dislike {}  shortlist {}",
            fmt_stat(stats.averages.avg_apply),
            fmt_stat(stats.averages.avg_dislike),
            fmt_stat(stats.averages.avg_shortlist)
        )));
        lines.push(Line::from(format!(
            "  top 10% apply {}  dislike {}  shortlist {}",
            fmt_stat(stats.top_decile.top_apply),
            fmt_stat(stats.top_decile.top_dislike),
            fmt_stat(stats.top_decile.top_shortlist)
        )));
    } else if let Some(error) = &analysis.location_stats.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    lines.push(input_line(
        "Company",
        &analysis.company_input,
        ui.analysis_input == AnalysisInput::Company,
    ));
    if let Some(stats) = analysis.company_stats.data() {
        lines.push(Line::from(format!(
            "  avg apply {}  dislike {}  shortlist {}",
            fmt_stat(stats.company_averages.avg_apply),
            fmt_stat(stats.company_averages.avg_dislike),
            fmt_stat(stats.company_averages.avg_shortlist)
        )));
        lines.push(Line::from(format!(
            "  industry top 10% apply {}  dislike {}  shortlist {}",
            fmt_stat(stats.industry_top_decile.top_apply),
            fmt_stat(stats.industry_top_decile.top_dislike),
            fmt_stat(stats.industry_top_decile.top_shortlist)
        )));
    } else if let Some(error) = &analysis.company_stats.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }

    if session.role() == Role::Employer {
        lines.push(Line::from(""));
        lines.push(bold("Shortlist to application ratio"));
        match analysis.shortlist_ratio.data() {
            Some(rows) if !rows.is_empty() => {
                for row in rows {
                    lines.push(Line::from(format!(
                        "  #{:<5} {:<28} {:>4}/{:<4} {}",
                        row.job_id,
                        truncate(row.title.as_deref().unwrap_or("-"), 28),
                        row.shortlist_count.unwrap_or(0),
                        row.application_count.unwrap_or(0),
                        fmt_stat(row.ratio)
                    )));
                }
            }
            _ if analysis.shortlist_ratio.loading => lines.push(dim("  Loading...")),
            _ => lines.push(dim("  No data")),
        }
    }
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Statistics ")),
        chunks[1],
    );
}
