//! Glyphs and the single highlight/checkmark style.
//!
//! - Reverse video: the highlighted row's label
//! - Green (xterm-256 46): the checkmark inside a checked box
//!
//! Everything else prints in the terminal's own colors.

use crossterm::style::{Attribute, Color};

// ============================================================================
// GLYPHS
// ============================================================================

/// The mark that gets colored when a prefix contains it.
pub const CHECKMARK: &str = "✔";

/// Checkbox prefix: checked.
pub const CHECKBOX_ON: &str = "[✔]";

/// Checkbox prefix: unchecked.
pub const CHECKBOX_OFF: &str = "[ ]";

/// Radio prefix: selected.
pub const RADIO_ON: &str = "◉";

/// Radio prefix: not selected.
pub const RADIO_OFF: &str = "◯";

// ============================================================================
// STYLES
// ============================================================================

/// Checkmark foreground.
pub const CHECKMARK_COLOR: Color = Color::AnsiValue(46);

/// Highlighted row on.
pub const HIGHLIGHT_ON: Attribute = Attribute::Reverse;

/// Highlighted row off.
pub const HIGHLIGHT_OFF: Attribute = Attribute::NoReverse;

// ============================================================================
// LEGEND
// ============================================================================

/// Navigation help printed above the options when asked for.
pub const LEGEND: [&str; 4] = [
    "  ↑/↓    move",
    "  space  toggle selection",
    "  enter  confirm",
    "  ctrl-c abort",
];

// ============================================================================
// TESTS
// ============================================================================
