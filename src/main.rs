use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncReadExt, BufReader};

mod config;
mod dispatcher;
mod error;
mod event_bus;
mod form;
mod logger;
mod prompt;
mod providers;
mod session;
mod task;
mod ui;

use config::{Config, OutputFormat};
use dispatcher::Dispatcher;
use event_bus::EventBus;
use form::Form;
use providers::OpenRouterProvider;
use session::Session;
use task::{
    FIELD_AUDIENCE, FIELD_CONCEPT, FIELD_TARGET_LANGUAGE, FIELD_TEXT, FIELD_TOPIC, Fields,
    TaskKind,
};
use ui::TerminalUI;

#[derive(Parser)]
#[command(name = "ai_task_assistant", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,
    /// Plain output without colors, header or spinner
    #[arg(long, global = true)]
    headless: bool,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Debug logging (includes raw provider responses)
    #[arg(long, global = true)]
    debug: bool,
    /// Output format for results
    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single task and print the result
    Run(RunArgs),
    /// Fill in the task form interactively (default)
    Interactive,
    /// List the available tasks and their fields
    Tasks,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Task to run: translate, summarize, brainstorm, explain or proofread
    task: String,
    /// Field value as NAME=VALUE (repeatable); a value of '-' is read from stdin
    #[arg(short, long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
    /// Shorthand for --field text=...
    #[arg(long)]
    text: Option<String>,
    /// Shorthand for --field targetLanguage=...
    #[arg(long = "to")]
    target_language: Option<String>,
    /// Shorthand for --field topic=...
    #[arg(long)]
    topic: Option<String>,
    /// Shorthand for --field concept=...
    #[arg(long)]
    concept: Option<String>,
    /// Shorthand for --field audience=...
    #[arg(long)]
    audience: Option<String>,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

impl RunArgs {
    /// Collect explicit and shorthand fields; stdin is read at most once.
    async fn into_fields(self) -> Result<Fields> {
        let shorthands = [
            (FIELD_TEXT, self.text),
            (FIELD_TARGET_LANGUAGE, self.target_language),
            (FIELD_TOPIC, self.topic),
            (FIELD_CONCEPT, self.concept),
            (FIELD_AUDIENCE, self.audience),
        ];
        let pairs = self.fields.into_iter().chain(
            shorthands
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name.to_string(), v))),
        );

        let mut fields = Fields::new();
        let mut stdin_used = false;
        for (name, value) in pairs {
            let value = if value == "-" {
                if stdin_used {
                    bail!("only one field can be read from stdin");
                }
                stdin_used = true;
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .context("Failed to read field value from stdin")?;
                buf
            } else {
                value
            };
            fields.insert(name, value);
        }
        Ok(fields)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();
    logger::init(args.verbose, args.debug);

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.headless, args.output);
    info!("Using completion endpoint {}", config.provider.base_url);

    let event_bus = Arc::new(EventBus::new(100));
    let provider = OpenRouterProvider::new(config.provider.base_url.clone())?;
    let dispatcher = Dispatcher::new(Arc::new(provider)).with_event_bus(event_bus.clone());
    let mut ui = TerminalUI::new(config.ui.clone());
    ui.attach(event_bus.clone());

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!(
            "{} is not set; submissions will fail until it is configured",
            config.provider.api_key_env
        );
    }

    match args.command.unwrap_or(Command::Interactive) {
        Command::Tasks => ui.print_catalog(),
        Command::Run(run) => {
            let task_name = run.task.clone();
            let fields = run.into_fields().await?;
            let task_label = task_name
                .parse::<TaskKind>()
                .map(|kind| kind.slug())
                .unwrap_or(task_name.as_str());

            ui.start_spinner(task_label)?;
            let result = dispatcher
                .execute_named(api_key.as_deref(), &task_name, &fields)
                .await;
            ui.stop_spinner();
            ui.display_result(task_label, &result)?;

            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Command::Interactive => {
            ui.print_header()?;
            let mut session = Session::new(config.default_task.unwrap_or(TaskKind::Translate));
            let mut form = Form::new(
                BufReader::new(tokio::io::stdin()),
                &ui,
                &dispatcher,
                api_key,
            );
            form.run(&mut session).await?;
            ui.finish().await;
        }
    }

    Ok(())
}
