//! Leveled stderr logging with ANSI styling.
//!
//! Four levels, selected by `--quiet`/`--verbose`/`--debug`: silent,
//! warnings (the default), info, debug. All output goes to stderr;
//! stdout belongs to nothing — the generated checker goes to a file.

/// ANSI escape code styling utilities.
pub struct Style;

impl Style {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const RED: &'static str = "\x1b[31m";
    pub const YELLOW: &'static str = "\x1b[33m";
    pub const CYAN: &'static str = "\x1b[36m";

    pub fn red(s: &str) -> String {
        format!("{}{}{}", Self::RED, s, Self::RESET)
    }

    pub fn yellow(s: &str) -> String {
        format!("{}{}{}", Self::YELLOW, s, Self::RESET)
    }

    pub fn cyan(s: &str) -> String {
        format!("{}{}{}", Self::CYAN, s, Self::RESET)
    }

    pub fn bold_red(s: &str) -> String {
        format!("{}{}{}{}", Self::BOLD, Self::RED, s, Self::RESET)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Warnings,
    Info,
    Debug,
}

/// A logger writing to stderr at or below its level.
pub struct Logger {
    level: LogLevel,
    color: bool,
}

impl Logger {
    pub fn new(level: LogLevel, color: bool) -> Self {
        Self { level, color }
    }

    fn paint(&self, painted: String, plain: &str) -> String {
        if self.color {
            painted
        } else {
            plain.to_string()
        }
    }

    pub fn warn(&self, message: &str) {
        if self.level >= LogLevel::Warnings {
            eprintln!("{}: {}", self.paint(Style::yellow("warning"), "warning"), message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.level >= LogLevel::Info {
            eprintln!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.level >= LogLevel::Debug {
            eprintln!("{}: {}", self.paint(Style::cyan("debug"), "debug"), message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_from_silent_to_debug() {
        assert!(LogLevel::Silent < LogLevel::Warnings);
        assert!(LogLevel::Warnings < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn styles_wrap_and_reset() {
        let painted = Style::bold_red("Error");
        assert!(painted.starts_with(Style::BOLD));
        assert!(painted.ends_with(Style::RESET));
    }
}
