use crate::executor::Launcher;
use crate::model::{FieldKind, FieldSpec};
use crate::prompt::pick_path;
use crate::session::{Session, Submission};
use crate::validation::{validate_form, FormValues, InputValue, ValidationResult};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use std::io::{stdout, Stdout};

/// Lines each field occupies in the form body.
const FIELD_HEIGHT: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct FieldState {
    pub buffer: String,
    pub choice: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

pub struct App<'a> {
    pub session: &'a Session,
    pub fields: Vec<FieldState>,
    /// Index into the entries; `entries.len()` is the submit button.
    pub focus: usize,
    pub status: Option<(StatusKind, String)>,
}

/// What the event loop should do after handling a key.
enum Action {
    None,
    Quit,
    Pick,
    Submit,
}

impl<'a> App<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            fields: vec![FieldState::default(); session.schema().entries.len()],
            focus: 0,
            status: None,
        }
    }

    fn entries(&self) -> &'a [FieldSpec] {
        &self.session.schema().entries
    }

    fn focused_spec(&self) -> Option<&'a FieldSpec> {
        self.entries().get(self.focus)
    }

    fn next(&mut self) {
        self.focus = (self.focus + 1) % (self.entries().len() + 1);
    }

    fn prev(&mut self) {
        let slots = self.entries().len() + 1;
        self.focus = (self.focus + slots - 1) % slots;
    }

    /// Snapshot of the current field contents for one submission attempt.
    pub fn values(&self) -> FormValues {
        self.entries()
            .iter()
            .zip(&self.fields)
            .map(|(spec, state)| {
                let value = if spec.is_choice() {
                    InputValue::Choice(
                        spec.acceptable_answers
                            .get(state.choice)
                            .cloned()
                            .unwrap_or_default(),
                    )
                } else if spec.is_picker() {
                    InputValue::Path(state.buffer.clone())
                } else {
                    InputValue::Text(state.buffer.clone())
                };
                (spec.name.clone(), value)
            })
            .collect()
    }

    /// Copy per-field results into the inline error slots.
    pub fn apply_results(&mut self, results: &[ValidationResult]) {
        for (state, result) in self.fields.iter_mut().zip(results) {
            state.error = result.message();
        }
        let failed = results.iter().filter(|r| !r.is_valid()).count();
        self.status = if failed == 0 {
            None
        } else {
            Some((
                StatusKind::Error,
                format!("{} field(s) need attention", failed),
            ))
        };
        if let Some(first) = results.iter().position(|r| !r.is_valid()) {
            self.focus = first;
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Action {
        if modifiers.contains(KeyModifiers::CONTROL) {
            return match code {
                KeyCode::Char('s') => Action::Submit,
                KeyCode::Char('c') => Action::Quit,
                _ => Action::None,
            };
        }

        let Some(spec) = self.focused_spec() else {
            // Submit button.
            return match code {
                KeyCode::Esc => Action::Quit,
                KeyCode::Enter | KeyCode::Char(' ') => Action::Submit,
                KeyCode::Tab | KeyCode::Down => {
                    self.next();
                    Action::None
                }
                KeyCode::BackTab | KeyCode::Up => {
                    self.prev();
                    Action::None
                }
                _ => Action::None,
            };
        };

        let choices = spec.acceptable_answers.len();
        let state = &mut self.fields[self.focus];
        match code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Tab | KeyCode::Down => self.next(),
            KeyCode::BackTab | KeyCode::Up => self.prev(),
            KeyCode::Enter if spec.is_picker() => return Action::Pick,
            KeyCode::Enter => self.next(),
            KeyCode::Left if spec.is_choice() => {
                state.choice = (state.choice + choices - 1) % choices;
            }
            KeyCode::Right | KeyCode::Char(' ') if spec.is_choice() => {
                state.choice = (state.choice + 1) % choices;
            }
            KeyCode::Backspace if !spec.is_choice() => {
                state.buffer.pop();
            }
            KeyCode::Char(c) if !spec.is_choice() && !spec.is_picker() => {
                state.buffer.push(c);
            }
            _ => {}
        }
        Action::None
    }
}

/// Run the form until it is submitted successfully or abandoned.
///
/// With a launcher, a valid submission launches the script. Without one the
/// form only validates. Returns the submitted values, or `None` on quit.
pub fn run_tui(session: &Session, launcher: Option<&dyn Launcher>) -> Result<Option<FormValues>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, session, launcher);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    terminal.show_cursor()?;

    res
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &Session,
    launcher: Option<&dyn Launcher>,
) -> Result<Option<FormValues>> {
    let mut app = App::new(session);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if !event::poll(std::time::Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        match app.handle_key(code, modifiers) {
            Action::None => {}
            Action::Quit => return Ok(None),
            Action::Pick => {
                let Some(spec) = app.focused_spec() else {
                    continue;
                };
                let current = app.fields[app.focus].buffer.clone();

                // The path prompt needs the normal screen.
                disable_raw_mode()?;
                execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                let picked = pick_path(spec, &current);
                execute!(terminal.backend_mut(), EnterAlternateScreen)?;
                enable_raw_mode()?;
                terminal.clear()?;

                match picked {
                    Ok(Some(path)) => {
                        app.status = Some((StatusKind::Info, format!("Selected {}", path)));
                        let state = &mut app.fields[app.focus];
                        state.buffer = path;
                        state.error = None;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        app.status = Some((StatusKind::Error, format!("{:#}", e)));
                    }
                }
            }
            Action::Submit => {
                let values = app.values();
                let Some(launcher) = launcher else {
                    let form = validate_form(&session.schema().entries, &values);
                    if form.all_valid {
                        return Ok(Some(values));
                    }
                    app.apply_results(&form.results);
                    continue;
                };

                match session.submit(&values, launcher) {
                    Ok(Submission::Launched(_)) => return Ok(Some(values)),
                    Ok(Submission::Invalid(results)) => app.apply_results(&results),
                    Err(e) => {
                        tracing::debug!(error = %e, "submission failed");
                        for state in &mut app.fields {
                            state.error = None;
                        }
                        app.status = Some((
                            StatusKind::Error,
                            format!("{:#}", anyhow::Error::new(e)),
                        ));
                    }
                }
            }
        }
    }
}

fn input_line<'s>(spec: &'s FieldSpec, state: &'s FieldState, focused: bool) -> Line<'s> {
    let dim = Style::default().fg(Color::DarkGray);
    let cursor = if focused { "▏" } else { "" };

    if spec.is_choice() {
        let answer = spec
            .acceptable_answers
            .get(state.choice)
            .map(String::as_str)
            .unwrap_or("");
        return Line::from(vec![
            Span::styled("◀ ", dim),
            Span::raw(answer),
            Span::styled(" ▶", dim),
        ]);
    }

    if spec.is_picker() {
        if state.buffer.is_empty() {
            let hint = match spec.kind {
                FieldKind::FolderPicker => "(Enter to choose a folder)",
                _ => "(Enter to choose a file)",
            };
            return Line::from(Span::styled(hint, dim));
        }
        return Line::from(state.buffer.as_str());
    }

    if state.buffer.is_empty() {
        let placeholder = spec.placeholder.as_deref().unwrap_or("");
        return Line::from(vec![Span::raw(cursor), Span::styled(placeholder, dim)]);
    }

    let shown = match spec.kind {
        FieldKind::Password => "•".repeat(state.buffer.chars().count()),
        _ => state.buffer.clone(),
    };
    Line::from(vec![Span::raw(shown), Span::raw(cursor)])
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let size = f.area();
    let schema = app.session.schema();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // header
                Constraint::Min(3),    // fields
                Constraint::Length(1), // status bar
            ]
            .as_ref(),
        )
        .split(size);

    let header = Paragraph::new(Line::from(Span::styled(
        schema.header.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    for (idx, (spec, state)) in schema.entries.iter().zip(&app.fields).enumerate() {
        let focused = idx == app.focus;
        let marker = if focused { "➤ " } else { "  " };
        let label_style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let label = if spec.question.is_empty() {
            spec.name.as_str()
        } else {
            spec.question.as_str()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(label, label_style),
        ]));

        let mut input = input_line(spec, state, focused);
        input.spans.insert(0, Span::raw("    "));
        lines.push(input);

        match &state.error {
            Some(message) => lines.push(Line::from(Span::styled(
                format!("    {}", message),
                Style::default().fg(Color::Red),
            ))),
            None => lines.push(Line::from("")),
        }
        lines.push(Line::from(""));
    }

    let submit_style = if app.focus == schema.entries.len() {
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("[ {} ]", schema.submit_label), submit_style),
    ]));

    // Keep the focused field in view.
    let visible = chunks[1].height.saturating_sub(2) as usize;
    let focus_top = app.focus * FIELD_HEIGHT;
    let scroll = (focus_top + FIELD_HEIGHT).saturating_sub(visible);

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    f.render_widget(body, chunks[1]);

    let status_line = match &app.status {
        Some((kind, message)) => Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(match kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            }),
        )),
        None => Line::from(Span::raw(
            " Tab/↑↓=Move | ←→=Choose | Enter=Browse/Submit | Ctrl+S=Submit | Esc=Quit",
        )),
    };
    f.render_widget(Paragraph::new(status_line), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::model::Schema;
    use std::path::Path;

    fn session() -> Session {
        let schema = Schema::parse(
            Path::new("form.json"),
            r#"{
                "Header": "Form",
                "exec": "run.sh",
                "Entries": [
                    {"VariableName": "PORT", "Question": "Port", "Type": "int"},
                    {"VariableName": "MODE", "Question": "Mode", "Type": "string",
                     "AcceptableAnswers": ["fast", "safe"]},
                    {"VariableName": "KEY", "Question": "Key", "Type": "password"},
                    {"VariableName": "DIR", "Question": "Dir", "Type": "string",
                     "Placeholder": "FOLDERPICKER", "CanBeNull": true}
                ]
            }"#,
        )
        .unwrap();
        Session::new(schema)
    }

    fn press(app: &mut App, code: KeyCode) -> Action {
        app.handle_key(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_and_choices_feed_values() {
        let session = session();
        let mut app = App::new(&session);

        for c in "80801".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('s'));

        let values = app.values();
        assert_eq!(values.get("PORT"), Some(&InputValue::Text("8080".into())));
        assert_eq!(values.get("MODE"), Some(&InputValue::Choice("safe".into())));
        assert_eq!(values.get("KEY"), Some(&InputValue::Text("s".into())));
        assert_eq!(values.get("DIR"), Some(&InputValue::Path(String::new())));
    }

    #[test]
    fn focus_wraps_through_submit_button() {
        let session = session();
        let mut app = App::new(&session);

        press(&mut app, KeyCode::Up);
        assert_eq!(app.focus, 4);
        assert!(matches!(press(&mut app, KeyCode::Enter), Action::Submit));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.focus, 0);
    }

    #[test]
    fn picker_fields_ignore_typing_and_request_pick() {
        let session = session();
        let mut app = App::new(&session);
        app.focus = 3;

        press(&mut app, KeyCode::Char('x'));
        assert!(app.fields[3].buffer.is_empty());
        assert!(matches!(press(&mut app, KeyCode::Enter), Action::Pick));
    }

    #[test]
    fn control_keys_submit_and_quit() {
        let session = session();
        let mut app = App::new(&session);
        assert!(matches!(
            app.handle_key(KeyCode::Char('s'), KeyModifiers::CONTROL),
            Action::Submit
        ));
        assert!(matches!(press(&mut app, KeyCode::Esc), Action::Quit));
    }

    #[test]
    fn results_show_inline_and_focus_first_error() {
        let session = session();
        let mut app = App::new(&session);
        app.focus = 4;

        let form = validate_form(&session.schema().entries, &app.values());
        app.apply_results(&form.results);

        assert_eq!(app.focus, 0);
        assert_eq!(
            app.fields[0].error.as_deref(),
            Some(ValidationError::Required.to_string().as_str())
        );
        assert!(app.fields[1].error.is_none());
        assert!(app.fields[2].error.is_some());
        assert!(app.fields[3].error.is_none());
        assert!(matches!(app.status, Some((StatusKind::Error, _))));
    }
}
