//! Shared styling utilities for the CLI.

use console::Style;

use giiter_core::models::RecordState;

/// Two-character mark shown in front of every listed record.
pub fn mark(state: RecordState) -> String {
    let (text, style) = match state {
        RecordState::New => ("++", Style::new().yellow()),
        RecordState::Stale => ("**", Style::new().yellow()),
        RecordState::Current => ("ok", Style::new().green()),
        RecordState::Orphan => ("--", Style::new().red()),
    };
    style.apply_to(text).to_string()
}

/// Commit subject (yellow).
pub fn subject(msg: &str) -> String {
    Style::new().yellow().apply_to(msg).to_string()
}

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}
