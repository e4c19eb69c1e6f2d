//! User-facing message routing and progress reporting.
//!
//! Diagnostics go through `tracing`; this is for the messages a person running
//! a scan is meant to read.

use std::io::Write;
use std::sync::Mutex;

use crate::colors::ColorScheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Success,
    Debug,
    Critical,
}

/// Where a message should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    All,
    GuiOnly,
    CliOnly,
    LogOnly,
}

pub trait ProgressHandle: Send {
    fn update(&mut self, n: usize, label: &str);
    fn finish(&mut self);
}

pub trait MessageSink: Send + Sync {
    fn message(&self, level: MessageLevel, target: MessageTarget, text: &str);

    /// Start a progress display for `total` items.
    fn progress(&self, label: &str, total: usize) -> Box<dyn ProgressHandle>;

    fn info(&self, text: &str) {
        self.message(MessageLevel::Info, MessageTarget::All, text);
    }

    fn warning(&self, text: &str) {
        self.message(MessageLevel::Warning, MessageTarget::All, text);
    }

    fn error(&self, text: &str) {
        self.message(MessageLevel::Error, MessageTarget::All, text);
    }

    fn success(&self, text: &str) {
        self.message(MessageLevel::Success, MessageTarget::All, text);
    }
}

/// Progress handle that ignores updates.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressHandle for NullProgress {
    fn update(&mut self, _n: usize, _label: &str) {}
    fn finish(&mut self) {}
}

/// Terminal sink: information on stdout, problems on stderr.
#[derive(Debug, Clone)]
pub struct CliSink {
    colors: ColorScheme,
    no_emoji: bool,
    show_progress: bool,
}

impl CliSink {
    pub fn new(use_colors: bool, show_progress: bool) -> Self {
        Self {
            colors: ColorScheme::new(use_colors),
            no_emoji: !use_colors,
            show_progress,
        }
    }

    fn prefix(&self, level: MessageLevel) -> &'static str {
        if self.no_emoji {
            return "crashscan:";
        }
        match level {
            MessageLevel::Warning => "⚠️ ",
            MessageLevel::Error => "❌",
            MessageLevel::Critical => "💀",
            MessageLevel::Success => "✔️ ",
            MessageLevel::Info | MessageLevel::Debug => "🔹",
        }
    }

    fn color(&self, level: MessageLevel) -> &'static str {
        match level {
            MessageLevel::Info => self.colors.info,
            MessageLevel::Success => self.colors.success,
            MessageLevel::Warning => self.colors.warning,
            MessageLevel::Error => self.colors.error,
            MessageLevel::Critical => self.colors.critical,
            MessageLevel::Debug => self.colors.debug,
        }
    }
}

impl MessageSink for CliSink {
    fn message(&self, level: MessageLevel, target: MessageTarget, text: &str) {
        match target {
            MessageTarget::GuiOnly => return,
            MessageTarget::LogOnly => {
                tracing::info!("{}", text);
                return;
            }
            MessageTarget::All | MessageTarget::CliOnly => {}
        }

        match level {
            MessageLevel::Debug => tracing::debug!("{}", text),
            MessageLevel::Info => println!("{}", text),
            MessageLevel::Success => println!(
                "{}{} {}{}",
                self.color(level),
                self.prefix(level),
                text,
                self.colors.reset
            ),
            MessageLevel::Warning | MessageLevel::Error | MessageLevel::Critical => eprintln!(
                "{}{} {}{}",
                self.color(level),
                self.prefix(level),
                text,
                self.colors.reset
            ),
        }
    }

    fn progress(&self, label: &str, total: usize) -> Box<dyn ProgressHandle> {
        if self.show_progress && total > 0 {
            Box::new(CliProgress::new(label, total, self.colors.dim, self.colors.reset))
        } else {
            Box::new(NullProgress)
        }
    }
}

const BAR_WIDTH: usize = 40;

/// Single-line progress bar redrawn on stderr.
pub struct CliProgress {
    label: String,
    total: usize,
    current: usize,
    dim: &'static str,
    reset: &'static str,
    finished: bool,
}

impl CliProgress {
    fn new(label: &str, total: usize, dim: &'static str, reset: &'static str) -> Self {
        Self {
            label: label.to_string(),
            total,
            current: 0,
            dim,
            reset,
            finished: false,
        }
    }

    fn render(&self, item: &str) -> String {
        let done = self.current.min(self.total);
        let filled = BAR_WIDTH * done / self.total.max(1);
        let percent = 100 * done / self.total.max(1);
        format!(
            "\r{}{}: [{}{}] {}% {}{}",
            self.dim,
            self.label,
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled),
            percent,
            item,
            self.reset
        )
    }
}

impl ProgressHandle for CliProgress {
    fn update(&mut self, n: usize, label: &str) {
        if self.finished {
            return;
        }
        self.current += n;
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}\x1b[K", self.render(label));
        let _ = stderr.flush();
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            eprintln!();
        }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Sink that keeps every message in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(MessageLevel, MessageTarget, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(MessageLevel, MessageTarget, String)> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Concatenated text of every message at `level`.
    pub fn text_at(&self, level: MessageLevel) -> String {
        self.messages()
            .into_iter()
            .filter(|(l, _, _)| *l == level)
            .map(|(_, _, text)| text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl MessageSink for RecordingSink {
    fn message(&self, level: MessageLevel, target: MessageTarget, text: &str) {
        let mut messages = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push((level, target, text.to_string()));
    }

    fn progress(&self, _label: &str, _total: usize) -> Box<dyn ProgressHandle> {
        Box::new(NullProgress)
    }
}
