//! Rendering on the interactive channel (stderr).
//!
//! Nothing in this module writes to stdout. The render mode is decided once
//! at startup and handed to [`Presenter::new`].

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use colored::Colorize;
use guide_core::QuestionView;
use guide_proto::Question;
use indicatif::{ProgressBar, ProgressStyle};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const DEFAULT_WIDTH: usize = 80;
const MIN_WIDTH: usize = 40;
const MAX_WIDTH: usize = 100;

/// How the interactive channel is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Boxed panels, colors and spinners.
    Rich,
    /// Labeled plain lines, safe for logs and dumb terminals.
    Plain,
}

impl RenderMode {
    pub fn from_colors(use_colors: bool) -> Self {
        if use_colors {
            RenderMode::Rich
        } else {
            RenderMode::Plain
        }
    }
}

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
    Dim,
}

/// Writes panels, questions and status lines for the human at the terminal.
pub struct Presenter<W: Write> {
    out: W,
    mode: RenderMode,
    width: usize,
    silent: bool,
    spinners: bool,
}

impl Presenter<io::Stderr> {
    /// A presenter on the process's stderr, sized to the terminal.
    pub fn stderr(mode: RenderMode) -> Self {
        let live = io::stderr().is_terminal();
        let width = crossterm::terminal::size()
            .map(|(cols, _)| usize::from(cols).clamp(MIN_WIDTH, MAX_WIDTH))
            .unwrap_or(DEFAULT_WIDTH);
        Self {
            spinners: mode == RenderMode::Rich && live,
            ..Self::new(io::stderr(), mode)
        }
        .with_width(width)
    }
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W, mode: RenderMode) -> Self {
        Self {
            out,
            mode,
            width: DEFAULT_WIDTH,
            silent: false,
            spinners: false,
        }
    }

    /// A presenter that renders nothing at all.
    pub fn silent(out: W) -> Self {
        Self {
            silent: true,
            ..Self::new(out, RenderMode::Plain)
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(MIN_WIDTH);
        self
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Shows `body` under `title`, as a box in rich mode.
    pub fn show_panel(&mut self, title: &str, body: &str) {
        if self.silent {
            return;
        }
        let rendered = match self.mode {
            RenderMode::Rich => render_box(title, body, self.width),
            RenderMode::Plain => format!("\n--- {title} ---\n{body}\n---\n"),
        };
        self.emit(&rendered);
    }

    pub fn show_status(&mut self, kind: StatusKind, message: &str) {
        if self.silent {
            return;
        }
        let line = match self.mode {
            RenderMode::Rich => match kind {
                StatusKind::Info => format!("{} {}", "•".cyan(), message),
                StatusKind::Success => format!("{} {}", "✓".green(), message),
                StatusKind::Warning => format!("{} {}", "⚠".yellow(), message.yellow()),
                StatusKind::Error => format!("{} {}", "✗".red(), message.red()),
                StatusKind::Dim => message.dimmed().to_string(),
            },
            RenderMode::Plain => match kind {
                StatusKind::Warning => format!("warning: {message}"),
                StatusKind::Error => format!("error: {message}"),
                StatusKind::Info | StatusKind::Success | StatusKind::Dim => message.to_string(),
            },
        };
        self.emit(&format!("{line}\n"));
    }

    /// Writes an input prompt without a trailing newline.
    pub fn prompt(&mut self, label: &str) {
        if self.silent {
            return;
        }
        let rendered = match self.mode {
            RenderMode::Rich => format!("{} ", label.bold()),
            RenderMode::Plain => format!("{label} "),
        };
        self.emit(&rendered);
    }

    /// Starts a progress indicator for an external call.
    ///
    /// Rich mode on a live terminal gets an animated spinner; elsewhere a
    /// single dim status line is written instead.
    pub fn start_spinner(&mut self, message: &str) -> Spinner {
        if self.silent {
            return Spinner::Idle;
        }
        if self.spinners {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .template("{spinner:.cyan} {msg}")
            {
                bar.set_style(style);
            }
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(80));
            return Spinner::Live(bar);
        }
        self.show_status(StatusKind::Dim, &format!("{message}..."));
        Spinner::Idle
    }

    fn emit(&mut self, text: &str) {
        // A closed stderr leaves nobody to tell.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write> QuestionView for Presenter<W> {
    fn ask_question(&mut self, number: usize, total: usize, question: &Question) {
        if self.silent {
            return;
        }
        let mut text = String::from("\n");
        match self.mode {
            RenderMode::Rich => {
                text.push_str(&format!(
                    "{} {}\n",
                    format!("[{number}/{total}]").cyan().bold(),
                    question.prompt_text.bold()
                ));
                if let Some(hint) = &question.hint {
                    text.push_str(&format!("      {}\n", hint.dimmed()));
                }
                if let Some(example) = &question.example {
                    text.push_str(&format!("      {}\n", format!("e.g. {example}").dimmed()));
                }
                text.push_str(&format!("{} ", "›".cyan()));
            }
            RenderMode::Plain => {
                text.push_str(&format!(
                    "Question {number}/{total}: {}\n",
                    question.prompt_text
                ));
                if let Some(hint) = &question.hint {
                    text.push_str(&format!("  hint: {hint}\n"));
                }
                if let Some(example) = &question.example {
                    text.push_str(&format!("  example: {example}\n"));
                }
                text.push_str("> ");
            }
        }
        self.emit(&text);
    }
}

/// Handle to an in-flight progress indicator.
pub enum Spinner {
    Live(ProgressBar),
    Idle,
}

impl Spinner {
    pub fn finish(self) {
        if let Spinner::Live(bar) = self {
            bar.finish_and_clear();
        }
    }
}

fn render_box(title: &str, body: &str, width: usize) -> String {
    let inner = width.saturating_sub(4);
    let title_width = UnicodeWidthStr::width(title);
    let fill = width.saturating_sub(5 + title_width);

    let mut out = String::from("\n");
    out.push_str(&format!(
        "{}{}{}\n",
        "╭─ ".cyan(),
        title.bold(),
        format!(" {}╮", "─".repeat(fill)).cyan()
    ));
    for line in wrap_text(body, inner) {
        let pad = inner.saturating_sub(UnicodeWidthStr::width(line.as_str()));
        out.push_str(&format!(
            "{} {}{} {}\n",
            "│".cyan(),
            line,
            " ".repeat(pad),
            "│".cyan()
        ));
    }
    out.push_str(&format!(
        "{}\n",
        format!("╰{}╯", "─".repeat(width.saturating_sub(2))).cyan()
    ));
    out
}

/// Greedy word wrap by display width. Words wider than `width` are split.
///
/// Leading whitespace of each source line is kept and repeated on its
/// continuation lines, unless it would take more than half the width.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let body = source_line.trim_start();
        let mut indent = source_line[..source_line.len() - body.len()].replace('\t', "    ");
        if UnicodeWidthStr::width(indent.as_str()) * 2 > width {
            indent.clear();
        }
        let indent_width = UnicodeWidthStr::width(indent.as_str());
        let mut current = indent.clone();
        let mut current_width = indent_width;

        for word in body.split_whitespace() {
            let word_width = UnicodeWidthStr::width(word);
            if current_width > indent_width && current_width + 1 + word_width > width {
                lines.push(std::mem::replace(&mut current, indent.clone()));
                current_width = indent_width;
            }
            if indent_width + word_width > width {
                for ch in word.chars() {
                    let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
                    if current_width > indent_width && current_width + ch_width > width {
                        lines.push(std::mem::replace(&mut current, indent.clone()));
                        current_width = indent_width;
                    }
                    current.push(ch);
                    current_width += ch_width;
                }
                continue;
            }
            if current_width > indent_width {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
        }
        if body.is_empty() {
            current.clear();
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
