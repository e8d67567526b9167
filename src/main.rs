mod error;
mod executor;
mod logging;
mod model;
mod paths;
mod platform;
mod prompt;
mod session;
mod template;
mod tui;
mod validation;

use anyhow::{Context, Result};
use clap::Parser;
use executor::{Launcher, TerminalLauncher};
use platform::Platform;
use session::{Prepared, Session, Submission};
use std::path::PathBuf;
use std::process::ExitCode;

/// Collect input for a script through a schema-driven form, then run the
/// script in a new terminal.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Path to the JSON schema describing the form and the script.
    schema: String,

    /// Ask for each field on the command line instead of the full-screen form.
    #[arg(long)]
    plain: bool,

    /// Load and check the schema, print a summary, and exit.
    #[arg(long)]
    check: bool,

    /// Print the rendered script instead of launching it.
    #[arg(long, conflicts_with = "check")]
    dry_run: bool,

    /// Terminal emulator used on Linux.
    #[arg(long, env = "CONFIGURATOR_TERMINAL")]
    terminal: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init(&cli.log_level, cli.log_file.as_deref())?;

    let schema_path = PathBuf::from(paths::expand(&cli.schema));
    let session = Session::open(&schema_path).context("Failed to load configuration")?;

    if cli.check {
        print_summary(&session);
        return Ok(());
    }

    let platform = Platform::host();
    let launcher = TerminalLauncher::with_terminal(platform.clone(), cli.terminal);

    if cli.plain {
        let Some(values) = prompt::collect(session.schema())? else {
            return Ok(());
        };
        if cli.dry_run {
            return print_rendered(&session, &values, &platform);
        }
        match prompt::submit(&session, &values, &launcher)? {
            Some(Submission::Launched(script)) => println!("Launched {}", script.display()),
            Some(Submission::Invalid(results)) => report_invalid(&results),
            None => {}
        }
        return Ok(());
    }

    if cli.dry_run {
        let Some(values) = tui::run_tui(&session, None)? else {
            return Ok(());
        };
        return print_rendered(&session, &values, &platform);
    }

    if let Some(values) = tui::run_tui(&session, Some(&launcher as &dyn Launcher))? {
        tracing::info!(fields = values.len(), "script launched");
    }
    Ok(())
}

fn print_rendered(
    session: &Session,
    values: &validation::FormValues,
    platform: &Platform,
) -> Result<()> {
    match session.prepare(values, platform)? {
        Prepared::Ready(script) => print!("{}", script),
        Prepared::Invalid(results) => {
            report_invalid(&results);
            anyhow::bail!("Form is not valid");
        }
    }
    Ok(())
}

fn report_invalid(results: &[validation::ValidationResult]) {
    for result in results {
        if let Some(message) = result.message() {
            eprintln!("{}: {}", result.field, message);
        }
    }
}

fn print_summary(session: &Session) {
    let schema = session.schema();
    println!("{}", schema.header);
    println!("script: {}", session.script_path(&Platform::host()).display());
    for entry in &schema.entries {
        let mut rules = vec![entry.value_type.to_string()];
        if entry.nullable {
            rules.push("nullable".into());
        }
        if let Some(min) = entry.min_length {
            rules.push(format!("min {}", min));
        }
        if let Some(max) = entry.max_length {
            rules.push(format!("max {}", max));
        }
        if let Some(pattern) = &entry.allowed_chars {
            rules.push(format!("pattern {}", pattern.as_str()));
        }
        if entry.is_choice() {
            rules.push(format!("one of {}", entry.acceptable_answers.join("|")));
        }
        println!("  {:<20} {:?} [{}]", entry.name, entry.kind, rules.join(", "));
    }
}
