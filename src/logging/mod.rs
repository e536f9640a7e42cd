//! Logging and output control
//!
//! This module provides the [`Logger`] used for all user-visible output. Whether
//! output goes to an interactive terminal is decided once at startup and passed
//! in explicitly; on a terminal lines are printed bare, otherwise every line is
//! prefixed with an RFC 3339 timestamp and its severity.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use is_terminal::IsTerminal;
use std::fmt;

/// Severity attached to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub to_terminal: bool,
    pub quiet: bool,
}

impl Logger {
    pub fn new(to_terminal: bool) -> Self {
        Self {
            to_terminal,
            quiet: false,
        }
    }

    /// Logger whose output mode follows whether stdout is a terminal
    pub fn detect() -> Self {
        Self::new(std::io::stdout().is_terminal())
    }

    pub fn new_quiet() -> Self {
        Self {
            to_terminal: false,
            quiet: true,
        }
    }

    /// Empty separator line
    pub fn blank(&self) {
        self.info("");
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", self.format_line(Level::Info, message, &Local::now()));
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{}", self.format_line(Level::Warn, message, &Local::now()));
        }
    }

    /// Error message
    pub fn error(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.format_line(Level::Error, message, &Local::now()));
        }
    }

    /// Log the error of a failed result. Returns whether there was one.
    pub fn log_error<T, E: fmt::Display>(&self, result: &Result<T, E>) -> bool {
        match result {
            Ok(_) => false,
            Err(e) => {
                self.error(&e.to_string());
                true
            }
        }
    }

    pub fn format_line<Tz>(&self, level: Level, message: &str, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let message = message.trim_end_matches('\n');
        if self.to_terminal {
            message.to_string()
        } else {
            format!(
                "{} [{}] {}",
                now.to_rfc3339_opts(SecondsFormat::Secs, true),
                level,
                message
            )
        }
    }
}
