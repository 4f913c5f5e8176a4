use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use colored::*;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use crate::config::{OutputFormat, UIConfig};
use crate::dispatcher::CompletionResult;
use crate::event_bus::{Event, EventBus};
use crate::task::{FieldInput, FieldSpec, TaskKind};

/// Terminal rendering for the task form, the spinner and the result panel.
pub struct TerminalUI {
    config: UIConfig,
    spinner: Arc<Mutex<Option<ProgressBar>>>,
    event_bus: Option<Arc<EventBus>>,
    start_time: Instant,
}

impl TerminalUI {
    pub fn new(config: UIConfig) -> Self {
        if !config.colorful {
            colored::control::set_override(false);
        }
        Self {
            config,
            spinner: Arc::new(Mutex::new(None)),
            event_bus: None,
            start_time: Instant::now(),
        }
    }

    /// Follow dispatcher events to keep the spinner message current.
    pub fn attach(&mut self, bus: Arc<EventBus>) {
        let spinner = self.spinner.clone();
        let mut receiver = bus.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                Self::handle_event(event, &spinner);
            }
        });
        self.event_bus = Some(bus);
    }

    pub fn print_header(&self) -> Result<()> {
        if self.config.output_format != OutputFormat::Terminal {
            return Ok(());
        }
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        println!("{}", "=".repeat(80).bright_magenta());
        println!("{}", "AI Task Assistant".bright_white().bold());
        println!(
            "{}",
            "Pick a task, fill in the fields and let the model do the work.".white()
        );
        println!("{}", "=".repeat(80).bright_magenta());
        println!();
        Ok(())
    }

    pub fn print_task_menu(&self, selected: TaskKind) {
        println!("{}", "Choose a task:".bright_white().bold());
        for (i, kind) in TaskKind::ALL.iter().enumerate() {
            let marker = if *kind == selected { "▶" } else { " " };
            println!(
                "{} {} {}",
                marker.bright_magenta(),
                format!("{}.", i + 1).bright_cyan(),
                kind.display_name()
            );
        }
        println!("  {} Quit", "q.".bright_cyan());
    }

    /// Listing used by the `tasks` subcommand.
    pub fn print_catalog(&self) {
        for kind in TaskKind::ALL {
            println!(
                "{} {}",
                kind.slug().bright_cyan().bold(),
                format!("({})", kind.display_name()).white()
            );
            println!("  fields: {}", kind.required_fields().join(", "));
            for spec in kind.field_specs() {
                println!("    {}", describe_field(spec));
            }
        }
    }

    pub fn print_field_prompt(&self, spec: &FieldSpec, current: Option<&str>) {
        println!();
        println!("{}", describe_field(spec).bright_white());
        match spec.input {
            FieldInput::Choice(options) => {
                for (i, option) in options.iter().enumerate() {
                    println!("  {} {}", format!("{}.", i + 1).bright_cyan(), option);
                }
            }
            FieldInput::Multiline => {
                println!(
                    "{}",
                    "(end with a single '.' line or end of input; '..' enters a literal '.')"
                        .dimmed()
                );
            }
            FieldInput::Line => {}
        }
        if let Some(current) = current.filter(|c| !c.is_empty()) {
            println!("{} {}", "current:".dimmed(), current.dimmed());
        }
    }

    pub fn display_section(&self, title: &str) {
        if self.config.output_format == OutputFormat::Terminal {
            println!();
            println!("{}", "-".repeat(80).bright_magenta());
            println!("{}", title.bright_white().bold());
        }
    }

    pub fn display_warning(&self, missing: &[&str]) {
        eprintln!(
            "{} {}",
            "⚠ Please fill in the required fields:".yellow().bold(),
            missing.join(", ")
        );
    }

    pub fn display_notice(&self, message: &str) {
        if self.config.output_format == OutputFormat::Terminal {
            println!("{}", message.dimmed());
        }
    }

    pub fn display_error(&self, error: &str) {
        eprintln!("{} {}", "✗ Error:".red().bold(), error.white());
    }

    /// Start a spinner for one submission.
    pub fn start_spinner(&self, task_label: &str) -> Result<()> {
        if !self.config.spinner || self.config.output_format != OutputFormat::Terminal {
            return Ok(());
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner().template("{spinner:.magenta} [{elapsed}] {msg}")?,
        );
        spinner.set_message(format!("Processing your '{}' request...", task_label));
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
        Ok(())
    }

    pub fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    /// Render a result in the configured output format.
    pub fn display_result(&self, task: &str, result: &CompletionResult) -> Result<()> {
        match self.config.output_format {
            OutputFormat::Terminal => {
                self.display_section("AI result:");
                if result.is_success() {
                    println!("{}", result.message());
                } else {
                    self.display_error(result.message());
                }
            }
            OutputFormat::Plain => {
                if result.is_success() {
                    println!("{}", result.message());
                } else {
                    eprintln!("{}", result);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&result_json(task, result))?);
            }
        }
        Ok(())
    }

    /// Print the session summary.
    pub async fn finish(&self) {
        if self.config.output_format != OutputFormat::Terminal {
            return;
        }
        let Some(bus) = &self.event_bus else {
            return;
        };
        let metrics = bus.get_metrics().await;
        let elapsed = self.start_time.elapsed();

        println!();
        println!("{}", "=".repeat(80).bright_magenta());
        println!("{}", "Session Summary".bright_white().bold());
        println!("{}", "=".repeat(80).bright_magenta());
        println!(
            "⏱️  Duration: {}:{:02}",
            elapsed.as_secs() / 60,
            elapsed.as_secs() % 60
        );
        println!(
            "✅ Tasks Completed: {}",
            metrics.tasks_completed.to_string().bright_green()
        );
        println!(
            "❌ Tasks Failed: {}",
            metrics.tasks_failed.to_string().bright_red()
        );
        println!(
            "🤖 API Calls: {}",
            metrics.total_api_calls.to_string().bright_cyan()
        );
        println!(
            "🪙  Tokens: {}",
            metrics.total_tokens.to_string().bright_cyan()
        );
        println!();
    }

    fn handle_event(event: Event, spinner: &Mutex<Option<ProgressBar>>) {
        let Ok(slot) = spinner.lock() else {
            return;
        };
        let Some(pb) = slot.as_ref() else {
            return;
        };
        match event {
            Event::APICallStarted { provider, model } => {
                pb.set_message(format!("🤖 Calling {} ({})", provider.bright_cyan(), model));
            }
            Event::APICallCompleted { tokens, .. } => {
                pb.set_message(format!("✅ Received response ({} tokens)", tokens));
            }
            Event::APIError { error, .. } => {
                pb.set_message(format!("❌ {}", error.bright_red()));
            }
            _ => {}
        }
    }
}

fn describe_field(spec: &FieldSpec) -> String {
    match (spec.required, spec.default) {
        (true, _) => format!("{} [{}] (required)", spec.label, spec.name),
        (false, Some(default)) => format!("{} [{}] (default: {})", spec.label, spec.name, default),
        (false, None) => format!("{} [{}]", spec.label, spec.name),
    }
}

fn result_json(task: &str, result: &CompletionResult) -> serde_json::Value {
    match result {
        CompletionResult::Success(text) => json!({
            "task": task,
            "ok": true,
            "text": text,
        }),
        CompletionResult::Failure(message) => json!({
            "task": task,
            "ok": false,
            "error": message,
        }),
    }
}
