//! YAML utilities for session info preprocessing
//!
//! The simulator's session YAML has several non-standard issues that need correction:
//! - Unescaped quotes and commas in free-text values (driver and team names)
//! - Control characters that break YAML parsers
//! - NUL padding after the document
//!
//! This module provides low-level YAML cleaning without parsing.

/// Keys whose values are free text typed by users and routinely break YAML.
const FREE_TEXT_KEYS: &[&str] = &[
    "AbbrevName:",
    "TeamName:",
    "UserName:",
    "Initials:",
    "DriverSetupName:",
    "CarDesignStr:", // livery color codes, can start with a comma
];

/// Extract the session YAML from its capture region.
///
/// Stops at the first NUL and decodes lossily; the caller has already checked that
/// `region` lies within the capture.
pub fn extract_session_yaml(region: &[u8]) -> String {
    let end = region.iter().position(|&b| b == 0).unwrap_or(region.len());
    String::from_utf8_lossy(&region[..end]).into_owned()
}

/// Clean session YAML so a standard parser accepts it.
///
/// Removes control characters other than `\n`, `\r` and `\t`, then single-quotes
/// unquoted values of free-text keys. See
/// <https://forums.iracing.com/discussion/comment/374646#Comment_374646>.
pub fn preprocess_session_yaml(yaml: &str) -> String {
    if yaml.trim().is_empty() {
        return String::new();
    }

    let cleaned: String = yaml
        .chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect();

    cleaned.lines().map(quote_free_text).collect::<Vec<_>>().join("\n")
}

fn quote_free_text(line: &str) -> String {
    let body = line.trim_start_matches([' ', '\t', '-']);
    let Some(&key) = FREE_TEXT_KEYS.iter().find(|key| body.starts_with(**key)) else {
        return line.to_string();
    };

    let after_colon = line.len() - body.len() + key.len();
    let value = line[after_colon..].trim();
    if value.is_empty() || value.starts_with('\'') || value.starts_with('"') {
        return line.to_string();
    }

    format!("{} '{}'", &line[..after_colon], value.replace('\'', "''"))
}
