//! Terminal output for the giveaway CLI
//!
//! Colors are skipped when `NO_COLOR` is set or stdout is not a terminal.

use std::io::IsTerminal;

/// Role of a piece of output, mapped to an ANSI SGR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Link,
    Good,
    Bad,
    Rank,
    Muted,
    Strong,
}

impl Tone {
    fn sgr(self) -> &'static str {
        match self {
            Tone::Link => "36",
            Tone::Good => "32",
            Tone::Bad => "31",
            Tone::Rank => "33",
            Tone::Muted => "2",
            Tone::Strong => "1",
        }
    }

    pub fn paint(self, text: &str) -> String {
        paint_with(colors_enabled(), self, text)
    }
}

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

fn paint_with(enabled: bool, tone: Tone, text: &str) -> String {
    if enabled {
        format!("\x1b[{}m{}\x1b[0m", tone.sgr(), text)
    } else {
        text.to_string()
    }
}

pub fn success(msg: &str) {
    println!("{} {}", Tone::Good.paint("✓"), msg);
}

pub fn failure(msg: &str) {
    eprintln!("{} {}", Tone::Bad.paint("✗"), msg);
}

pub fn note(msg: &str) {
    println!("{} {}", Tone::Link.paint("ℹ"), msg);
}

/// Title followed by an underline of the same width.
pub fn heading(title: &str) {
    println!();
    println!("{}", Tone::Strong.paint(title));
    println!("{}", "─".repeat(title.chars().count()));
}

/// Render a handle as `@handle`, tolerating an existing leading `@`.
pub fn at_handle(handle: &str) -> String {
    format!("@{}", handle.trim_start_matches('@'))
}

/// Shorten an ISO 8601 timestamp to `YYYY-MM-DD HH:MM` for tables.
pub fn short_time(timestamp: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => timestamp.chars().take(16).collect(),
    }
}
