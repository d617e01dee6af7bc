//! Result formatting and argument normalization for the binary.
//!
//! Pure functions — (result, OutputFormat, name) → String.
//! No I/O, no side effects.

use serde::Serialize;

use crate::types::OutputFormat;

/// Variable name used for shell output when the caller didn't pick one.
pub const DEFAULT_VARIABLE: &str = "REPLY";

// ============================================================================
// ARGUMENTS
// ============================================================================

/// Only the literal `true` turns the legend on.
pub fn parse_legend_flag(value: &str) -> bool {
    value == "true"
}

/// Map `"true"`/`"false"` strings to flags. Anything but `true` is false.
pub fn parse_defaults<S: AsRef<str>>(values: &[S]) -> Vec<bool> {
    values.iter().map(|v| v.as_ref() == "true").collect()
}

/// Whether `name` can be assigned to in a POSIX shell.
pub fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// An explicit format wins; naming a variable implies shell output.
pub fn resolve_format(format: Option<OutputFormat>, name: Option<&str>) -> OutputFormat {
    match (format, name) {
        (Some(format), _) => format,
        (None, Some(_)) => OutputFormat::Shell,
        (None, None) => OutputFormat::Plain,
    }
}

// ============================================================================
// FORMATTING
// ============================================================================

#[derive(Serialize)]
struct CheckedJson<'a> {
    checked: &'a [bool],
}

#[derive(Serialize)]
struct SelectedJson<'a> {
    selected: Option<&'a str>,
}

/// Format a multi-select result: one flag per option, option order kept.
pub fn format_multi(checked: &[bool], format: OutputFormat, name: Option<&str>) -> String {
    match format {
        OutputFormat::Plain => checked.iter().map(|flag| format!("{}\n", flag)).collect(),
        OutputFormat::Shell => {
            let values: Vec<String> = checked.iter().map(bool::to_string).collect();
            format!(
                "{}=({})\n",
                name.unwrap_or(DEFAULT_VARIABLE),
                values.join(" ")
            )
        }
        OutputFormat::Json => format_json(&CheckedJson { checked }),
    }
}

/// Format a single-select result. Nothing selected is the empty string.
pub fn format_single(selected: Option<&str>, format: OutputFormat, name: Option<&str>) -> String {
    match format {
        OutputFormat::Plain => format!("{}\n", selected.unwrap_or("")),
        OutputFormat::Shell => format!(
            "{}={}\n",
            name.unwrap_or(DEFAULT_VARIABLE),
            shell_quote(selected.unwrap_or(""))
        ),
        OutputFormat::Json => format_json(&SelectedJson { selected }),
    }
}

/// Single-quote `value` for a POSIX shell; `'` becomes `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn format_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|e| {
        // Plain structs of bools and strings always serialize
        panic!("Failed to serialize result to JSON: {}", e)
    });
    format!("{}\n", json)
}

// ============================================================================
// TESTS
// ============================================================================
