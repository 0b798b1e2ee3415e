//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with tag and level formatting
//! - Fixed-width tag alignment
//! - Broken pipe handling for piped commands

use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

use super::levels::LogLevel;
use super::tags::LogTag;

/// Fixed width for the tag column
const TAG_WIDTH: usize = 10;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();

    let tag_str = format_tag(&tag);
    let level_str = format_level(level);

    let line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        tag_str,
        level_str,
        message
    );

    // Piped consumers (head, grep -q) may close stdout early; swallow that
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            return;
        }
    }
    let _ = out.flush();
}

/// Format the tag with a per-module color, padded to TAG_WIDTH
fn format_tag(tag: &LogTag) -> String {
    let padded = format!("{:<width$}", tag.label(), width = TAG_WIDTH);
    match tag {
        LogTag::Main => padded.bright_white().bold().to_string(),
        LogTag::Config => padded.bright_blue().to_string(),
        LogTag::Pool => padded.bright_green().bold().to_string(),
        LogTag::Link => padded.cyan().bold().to_string(),
        LogTag::Keepalive => padded.magenta().to_string(),
        LogTag::Topics => padded.yellow().bold().to_string(),
        LogTag::Processor => padded.bright_yellow().to_string(),
    }
}

/// Format the level with its severity color
fn format_level(level: LogLevel) -> String {
    match level {
        LogLevel::Error => level.as_str().red().bold().to_string(),
        LogLevel::Warning => level.as_str().yellow().bold().to_string(),
        LogLevel::Info => level.as_str().normal().to_string(),
        LogLevel::Debug => level.as_str().purple().to_string(),
        LogLevel::Verbose => level.as_str().dimmed().to_string(),
    }
}
