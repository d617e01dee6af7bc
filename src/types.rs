//! Domain types for termselect.
//!
//! Configuration, session geometry, output format and the error type.
//! No I/O here.

use std::time::Duration;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How long the decoder waits for the rest of an escape sequence.
///
/// Arrow keys arrive as `ESC [ A` in one burst; a lone ESC keypress
/// is followed by nothing. 100ms separates the two on any sane link.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);

/// Per-session menu configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    /// Print the navigation legend above the options.
    pub legend: bool,
    /// Bounded wait for the two bytes following ESC.
    pub escape_timeout: Duration,
}

impl Default for MenuConfig {
    fn default() -> Self {
        MenuConfig {
            legend: false,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
        }
    }
}

/// Output format for the binary's result printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One value per line (or the bare label).
    #[default]
    Plain,
    /// `NAME=value` assignment, ready for `eval`.
    Shell,
    /// Machine-readable JSON.
    Json,
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Where the option block lives on screen, fixed for one session.
///
/// Rows are 1-based terminal rows, as reported by `ESC[6n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Row of option 0.
    pub start_row: u16,
    /// Row directly below the option block.
    pub last_row: u16,
}

impl Geometry {
    /// Derive geometry from the cursor row reported after printing
    /// `count` blank lines.
    ///
    /// Clamped so option 0 never lands above row 1.
    pub fn from_reserved(row_after: u16, count: usize) -> Self {
        let count = u16::try_from(count).unwrap_or(u16::MAX);
        let start_row = row_after.saturating_sub(count).max(1);
        Geometry {
            start_row,
            last_row: row_after,
        }
    }

    /// Terminal row for the option at `index`.
    pub fn row_of(&self, index: usize) -> u16 {
        let offset = u16::try_from(index).unwrap_or(u16::MAX);
        self.start_row.saturating_add(offset)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Everything that can go wrong in a menu session.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("No options to choose from")]
    EmptyOptions,

    #[error("Default selection {index} is out of range for {len} option(s)")]
    DefaultOutOfRange { index: usize, len: usize },

    #[error("Terminal did not report the cursor position: {0}")]
    CursorReport(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// TESTS
// ============================================================================
