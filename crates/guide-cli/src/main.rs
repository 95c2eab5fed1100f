//! # guide-cli
//!
//! Binary entry point for prompt-guide.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Draft capture from the argument, piped stdin, or the terminal
//! - Rendering of the guided session on stderr
//! - Mapping of outcomes to exit codes; the final prompt is the only thing
//!   ever written to stdout

mod display;
mod runner;

use std::io::{self, BufRead, BufReader, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use guide_adapters::{CliBackend, CliExecutor};
use guide_core::GuideConfig;
use guide_proto::DraftPrompt;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::display::{Presenter, RenderMode, StatusKind};
use crate::runner::{GuideError, GuideOptions, run_guide};

/// Color output mode for the interactive channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Use colors when stderr is a terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    /// Returns true if rich rendering should be used.
    fn should_use_colors(self) -> bool {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        let term_dumb = std::env::var("TERM").is_ok_and(|term| term == "dumb");
        self.should_use_colors_with(io::stderr().is_terminal(), no_color, term_dumb)
    }

    fn should_use_colors_with(self, stderr_tty: bool, no_color: bool, term_dumb: bool) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stderr_tty && !no_color && !term_dumb,
        }
    }
}

/// How much the run says on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No interactive output; every question is skipped
    Quiet,
    /// The guided session (default)
    #[default]
    Normal,
    /// The guided session plus debug logs
    Verbose,
}

impl Verbosity {
    /// Resolves verbosity from CLI args and env vars.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags: `--quiet`/`-q` or `--verbose`/`-v`
    /// 2. Environment variables: `PROMPT_GUIDE_QUIET` or `PROMPT_GUIDE_VERBOSE`
    /// 3. Default: Normal
    fn resolve(cli_verbose: bool, cli_quiet: bool) -> Self {
        let env_quiet = std::env::var("PROMPT_GUIDE_QUIET").is_ok();
        let env_verbose = std::env::var("PROMPT_GUIDE_VERBOSE").is_ok();
        Self::resolve_with_env(cli_verbose, cli_quiet, env_quiet, env_verbose)
    }

    #[allow(clippy::fn_params_excessive_bools)]
    fn resolve_with_env(
        cli_verbose: bool,
        cli_quiet: bool,
        env_quiet: bool,
        env_verbose: bool,
    ) -> Self {
        if cli_quiet {
            return Verbosity::Quiet;
        }
        if cli_verbose {
            return Verbosity::Verbose;
        }

        if env_quiet {
            return Verbosity::Quiet;
        }
        if env_verbose {
            return Verbosity::Verbose;
        }

        Verbosity::Normal
    }

    fn default_log_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "off",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    /// A prompt was written to stdout.
    Success,
    /// I/O or configuration failure.
    Failure,
    /// No draft prompt, or stdin was not UTF-8.
    MalformedInput,
    /// The external CLI is not installed.
    CliNotFound,
    /// The user cancelled.
    Cancelled,
}

impl ExitStatus {
    fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::MalformedInput => 65,
            ExitStatus::CliNotFound => 127,
            ExitStatus::Cancelled => 130,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Where the draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftOrigin {
    Argument,
    Piped,
    Typed,
}

#[derive(Debug, Error)]
enum DraftError {
    #[error("stdin is not valid UTF-8")]
    NotUtf8,

    #[error("failed to read the prompt: {0}")]
    Io(#[from] io::Error),
}

/// prompt-guide - asks the follow-up questions your coding agent would,
/// before you send the prompt
#[derive(Parser, Debug)]
#[command(name = "prompt-guide", version, about)]
struct Cli {
    /// The draft prompt. Read from stdin when omitted.
    prompt: Option<String>,

    /// No interactive output; skip every question and print the result
    #[arg(short, long)]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: ./prompt-guide.yml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Timeout in seconds for each call to the AI CLI
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = Verbosity::resolve(cli.verbose, cli.quiet);
    let mode = RenderMode::from_colors(cli.color.should_use_colors());
    colored::control::set_override(mode == RenderMode::Rich);
    init_logging(verbosity, mode);
    watch_for_interrupt();

    match run(cli, verbosity, mode).await {
        Ok(status) => status.into(),
        Err(err) => {
            report_fatal(mode, &format!("{err:#}"));
            ExitStatus::Failure.into()
        }
    }
}

async fn run(cli: Cli, verbosity: Verbosity, mode: RenderMode) -> Result<ExitStatus> {
    let quiet = verbosity == Verbosity::Quiet;
    let mut presenter = if quiet {
        Presenter::silent(io::stderr())
    } else {
        Presenter::stderr(mode)
    };

    let (raw, origin) = match read_draft(cli.prompt, &mut presenter) {
        Ok(captured) => captured,
        Err(DraftError::NotUtf8) => {
            report_fatal(mode, "stdin is not valid UTF-8");
            return Ok(ExitStatus::MalformedInput);
        }
        Err(err) => return Err(err.into()),
    };
    let Ok(draft) = DraftPrompt::new(&raw) else {
        report_fatal(mode, "no prompt provided");
        return Ok(ExitStatus::MalformedInput);
    };

    let cwd = std::env::current_dir().context("failed to determine the working directory")?;
    let mut config = GuideConfig::load(cli.config.as_deref(), &cwd)?;
    if let Some(secs) = cli.timeout {
        config.override_timeouts(secs);
    }

    let executor = match CliExecutor::detect(CliBackend::from_config(&config.cli)) {
        Ok(executor) => executor,
        Err(err) => {
            report_fatal(mode, &err.to_string());
            return Ok(ExitStatus::CliNotFound);
        }
    };
    debug!(
        "Using {} at {}",
        executor.backend().name,
        executor.program().display()
    );

    let mut reader = if quiet { None } else { answer_reader(origin) };
    let input = reader
        .as_mut()
        .map(|reader| &mut **reader as &mut dyn BufRead);

    let options = GuideOptions::from_config(&config);
    let outcome = match run_guide(&draft, &executor, &mut presenter, input, &options).await {
        Ok(outcome) => outcome,
        Err(GuideError::CliNotFound(err)) => {
            report_fatal(mode, &err.to_string());
            return Ok(ExitStatus::CliNotFound);
        }
        Err(err) => return Err(err.into()),
    };

    match outcome.emitted() {
        Some(text) => {
            write_prompt(text)?;
            presenter.show_status(StatusKind::Success, "Prompt written to stdout");
            Ok(ExitStatus::Success)
        }
        None => {
            presenter.show_status(StatusKind::Dim, "Cancelled; nothing was sent");
            Ok(ExitStatus::Cancelled)
        }
    }
}

fn init_logging(verbosity: Verbosity, mode: RenderMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_log_filter()));

    // Logs share stderr with the session; stdout stays reserved for the prompt.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(mode == RenderMode::Rich)
        .with_target(false)
        .init();
}

/// Exits with the cancelled status on Ctrl-C, wherever the run is blocked.
fn watch_for_interrupt() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            std::process::exit(i32::from(ExitStatus::Cancelled.code()));
        }
    });
}

/// Captures the draft from the argument, piped stdin, or one typed line.
fn read_draft<W: Write>(
    arg: Option<String>,
    presenter: &mut Presenter<W>,
) -> Result<(String, DraftOrigin), DraftError> {
    if let Some(prompt) = arg {
        return Ok((prompt, DraftOrigin::Argument));
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut raw = String::new();
        return match stdin.lock().read_to_string(&mut raw) {
            Ok(_) => Ok((raw, DraftOrigin::Piped)),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => Err(DraftError::NotUtf8),
            Err(err) => Err(err.into()),
        };
    }

    presenter.prompt("What do you want to ask?");
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok((line, DraftOrigin::Typed))
}

/// The reader answers come from, if anyone can answer.
///
/// A piped draft has consumed stdin, so answers come from the controlling
/// terminal instead.
fn answer_reader(origin: DraftOrigin) -> Option<Box<dyn BufRead>> {
    match origin {
        DraftOrigin::Piped => open_terminal(),
        DraftOrigin::Argument | DraftOrigin::Typed => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                Some(Box::new(stdin.lock()))
            } else {
                None
            }
        }
    }
}

#[cfg(unix)]
fn open_terminal() -> Option<Box<dyn BufRead>> {
    match std::fs::File::open("/dev/tty") {
        Ok(tty) => Some(Box::new(BufReader::new(tty))),
        Err(err) => {
            debug!("No controlling terminal ({}); questions will be skipped", err);
            None
        }
    }
}

#[cfg(not(unix))]
fn open_terminal() -> Option<Box<dyn BufRead>> {
    None
}

fn write_prompt(text: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{text}").context("failed to write the prompt to stdout")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}

/// One line on stderr, shown even in quiet mode.
fn report_fatal(mode: RenderMode, message: &str) {
    Presenter::new(io::stderr(), mode).show_status(StatusKind::Error, message);
}
