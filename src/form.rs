use std::io::Write;

use anyhow::{Context, Result};
use log::info;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::dispatcher::Dispatcher;
use crate::session::{Session, SubmitOutcome};
use crate::task::{FieldInput, FieldSpec, TaskKind};
use crate::ui::TerminalUI;

/// Terminator for multiline fields; end of input also finishes the field.
const END_OF_TEXT: &str = ".";
/// Entered as a line of its own, stands for a literal "." line.
const ESCAPED_DOT: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuChoice {
    Task(TaskKind),
    Quit,
    Invalid,
}

/// Interpret the answer to the task menu: a number, a task name or `q`.
pub fn parse_menu_choice(input: &str) -> MenuChoice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return MenuChoice::Quit;
    }
    if let Ok(n) = input.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| TaskKind::ALL.get(i)) {
            Some(kind) => MenuChoice::Task(*kind),
            None => MenuChoice::Invalid,
        };
    }
    input
        .parse::<TaskKind>()
        .map(MenuChoice::Task)
        .unwrap_or(MenuChoice::Invalid)
}

/// Interpret the answer for a choice field: an option number, free text, or
/// blank to keep `fallback`.
pub fn resolve_choice(input: &str, options: &[&str], fallback: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return fallback.to_string();
    }
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= options.len() => options[n - 1].to_string(),
        _ => input.to_string(),
    }
}

/// Interactive form loop over any line source.
pub struct Form<'a, R> {
    lines: Lines<R>,
    ui: &'a TerminalUI,
    dispatcher: &'a Dispatcher,
    api_key: Option<String>,
}

impl<'a, R: AsyncBufRead + Unpin> Form<'a, R> {
    pub fn new(
        reader: R,
        ui: &'a TerminalUI,
        dispatcher: &'a Dispatcher,
        api_key: Option<String>,
    ) -> Self {
        Self {
            lines: reader.lines(),
            ui,
            dispatcher,
            api_key,
        }
    }

    /// Run until the user quits or input ends.
    pub async fn run(&mut self, session: &mut Session) -> Result<()> {
        loop {
            println!();
            self.ui.print_task_menu(session.selected());
            let Some(answer) = self.ask("> ").await? else {
                return Ok(());
            };
            let kind = match parse_menu_choice(&answer) {
                MenuChoice::Quit => return Ok(()),
                MenuChoice::Invalid => {
                    self.ui.display_error(&format!("'{}' is not a task", answer.trim()));
                    continue;
                }
                MenuChoice::Task(kind) => kind,
            };

            self.select(session, kind);
            if let (Some(previous), Some(last)) = (session.result(), session.last_task()) {
                self.ui
                    .display_section(&format!("Last {} result:", last.display_name()));
                println!("{}", previous);
            }

            self.ui
                .display_section(&format!("Parameters for {}:", kind.display_name()));
            for spec in kind.field_specs() {
                let current = session.fields().get(spec.name).cloned();
                self.ui.print_field_prompt(spec, current.as_deref());
                let Some(value) = self.read_field(spec, current.as_deref()).await? else {
                    return Ok(());
                };
                session.set_field(spec.name, value);
            }

            self.submit(session).await?;
        }
    }

    fn select(&self, session: &mut Session, kind: TaskKind) {
        if session.select_task(kind) {
            info!("Cleared previous result on switch to {}", kind.slug());
            self.ui.display_notice("Previous result cleared.");
        }
    }

    async fn submit(&self, session: &mut Session) -> Result<()> {
        let kind = session.selected();
        let missing = session.missing_required();
        if !missing.is_empty() {
            self.ui.display_warning(&missing);
            return Ok(());
        }

        self.ui.start_spinner(kind.display_name())?;
        let outcome = session
            .submit(self.dispatcher, self.api_key.as_deref())
            .await;
        self.ui.stop_spinner();

        match outcome {
            SubmitOutcome::Incomplete(missing) => self.ui.display_warning(&missing),
            SubmitOutcome::Finished(result) => self.ui.display_result(kind.slug(), &result)?,
        }
        Ok(())
    }

    /// Returns `None` at end of input.
    async fn read_field(
        &mut self,
        spec: &FieldSpec,
        current: Option<&str>,
    ) -> Result<Option<String>> {
        let fallback = current.filter(|c| !c.is_empty()).or(spec.default).unwrap_or("");
        match spec.input {
            FieldInput::Line => Ok(self.ask("> ").await?.map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    fallback.to_string()
                } else {
                    line.to_string()
                }
            })),
            FieldInput::Choice(options) => Ok(self
                .ask("> ")
                .await?
                .map(|line| resolve_choice(&line, options, fallback))),
            FieldInput::Multiline => {
                let mut collected = Vec::new();
                loop {
                    match self.next_line().await? {
                        Some(line) if line.trim_end() == END_OF_TEXT => break,
                        Some(line) if line.trim_end() == ESCAPED_DOT => {
                            collected.push(END_OF_TEXT.to_string())
                        }
                        Some(line) => collected.push(line),
                        None if collected.is_empty() => return Ok(None),
                        None => break,
                    }
                }
                if collected.iter().all(|line| line.trim().is_empty()) {
                    Ok(Some(fallback.to_string()))
                } else {
                    Ok(Some(collected.join("\n")))
                }
            }
        }
    }

    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush().context("Failed to flush stdout")?;
        self.next_line().await
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        self.lines
            .next_line()
            .await
            .context("Failed to read from stdin")
    }
}
