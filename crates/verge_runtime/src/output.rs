//! Checker output: the process-wide print lock, ANSI styling, XML
//! escaping, and diagnostic tracing.
//!
//! All report text goes to stdout and all traces to stderr, both guarded
//! by one lock so that multi-line messages from different threads never
//! interleave. Colour is resolved once at startup from the configured
//! tristate and whether stdout is a terminal.

use crate::config::{Config, Tristate};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// ANSI escape codes, applied only when colour is resolved on.
struct Codes;

impl Codes {
    const RESET: &'static str = "\x1b[0m";
    const BOLD: &'static str = "\x1b[1m";
    const RED: &'static str = "\x1b[31m";
    const GREEN: &'static str = "\x1b[32m";
    const YELLOW: &'static str = "\x1b[33m";
}

/// Shared output sink for a checker run.
pub struct Output {
    lock: Mutex<()>,
    color: bool,
    pub machine_readable: bool,
    traces: u64,
}

impl Output {
    pub fn new(cfg: &Config) -> Self {
        let color = match cfg.color {
            Tristate::On => true,
            Tristate::Off => false,
            Tristate::Auto => unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 },
        };
        Self {
            lock: Mutex::new(()),
            color,
            machine_readable: cfg.machine_readable,
            traces: cfg.traces,
        }
    }

    /// Acquires the print lock. Hold the guard across every multi-line
    /// message.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn red(&self) -> &'static str {
        if self.color {
            Codes::RED
        } else {
            ""
        }
    }

    pub fn green(&self) -> &'static str {
        if self.color {
            Codes::GREEN
        } else {
            ""
        }
    }

    pub fn yellow(&self) -> &'static str {
        if self.color {
            Codes::YELLOW
        } else {
            ""
        }
    }

    pub fn bold(&self) -> &'static str {
        if self.color {
            Codes::BOLD
        } else {
            ""
        }
    }

    pub fn reset(&self) -> &'static str {
        if self.color {
            Codes::RESET
        } else {
            ""
        }
    }

    /// Writes report text to stdout. The caller holds the lock.
    pub fn put(&self, text: &str) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
    }

    pub fn flush(&self) {
        let _ = std::io::stdout().flush();
    }

    /// Emits a diagnostic line to stderr when the category is enabled.
    pub fn trace(&self, category: u64, text: &str) {
        if self.traces & category == 0 {
            return;
        }
        let _guard = self.lock();
        eprintln!("{}{}TRACE{}: {}", self.yellow(), self.bold(), self.reset(), text);
    }

    /// Whether any of the given trace categories is enabled.
    pub fn tracing(&self, category: u64) -> bool {
        self.traces & category != 0
    }
}

/// Closes stdin: a generated checker never reads it. Called from the
/// generated `main` before anything else.
pub fn close_stdin() {
    unsafe {
        libc::close(libc::STDIN_FILENO);
    }
}

/// Escapes text for inclusion in XML element content or attributes.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_covers_reserved_characters() {
        assert_eq!(
            xml_escape("a < b & \"c\" > 'd'"),
            "a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn color_off_produces_empty_codes() {
        let cfg = Config {
            color: Tristate::Off,
            ..Config::default()
        };
        let out = Output::new(&cfg);
        assert_eq!(out.red(), "");
        assert_eq!(out.reset(), "");
    }

    #[test]
    fn color_on_produces_codes() {
        let cfg = Config {
            color: Tristate::On,
            ..Config::default()
        };
        let out = Output::new(&cfg);
        assert_eq!(out.red(), "\x1b[31m");
        assert_eq!(out.bold(), "\x1b[1m");
    }
}
