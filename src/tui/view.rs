//! Rendering: selection state → escape-coded lines.
//!
//! Every function writes through crossterm's `queue!` into any `Write`;
//! the session flushes once per frame. Rows are absolute, so a redraw
//! overwrites the previous frame in place.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetAttribute, SetForegroundColor};

use crate::terminal::move_cursor;
use crate::types::Geometry;

use super::state::Selection;
use super::theme;

/// Line break for raw mode, where `\n` alone doesn't return the carriage.
pub const NEWLINE: &str = "\r\n";

// ============================================================================
// LINE PRIMITIVES
// ============================================================================

/// Draw `prefix` and `label` in normal style.
pub fn draw_inactive<W: Write>(out: &mut W, label: &str, prefix: &str) -> io::Result<()> {
    draw_prefix(out, prefix)?;
    queue!(out, Print(' '), Print(label))
}

/// Draw `prefix` and `label`, the label in reverse video.
pub fn draw_active<W: Write>(out: &mut W, label: &str, prefix: &str) -> io::Result<()> {
    draw_prefix(out, prefix)?;
    queue!(
        out,
        Print(' '),
        SetAttribute(theme::HIGHLIGHT_ON),
        Print(label),
        SetAttribute(theme::HIGHLIGHT_OFF)
    )
}

/// A prefix containing the checkmark is redrawn as a bracketed green mark.
fn draw_prefix<W: Write>(out: &mut W, prefix: &str) -> io::Result<()> {
    if prefix.contains(theme::CHECKMARK) {
        queue!(
            out,
            Print('['),
            SetForegroundColor(theme::CHECKMARK_COLOR),
            Print(theme::CHECKMARK),
            ResetColor,
            Print(']')
        )
    } else {
        queue!(out, Print(prefix))
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// Draw every option at its row. `highlight = None` draws all rows
/// inactive, which is how the confirmed state is shown.
pub fn print_options<W, S, L>(
    out: &mut W,
    geometry: &Geometry,
    options: &[L],
    selection: &S,
    highlight: Option<usize>,
) -> io::Result<()>
where
    W: Write,
    S: Selection,
    L: AsRef<str>,
{
    for (index, label) in options.iter().enumerate() {
        move_cursor(out, geometry.row_of(index), 1)?;
        let prefix = selection.prefix(index);
        if highlight == Some(index) {
            draw_active(out, label.as_ref(), prefix)?;
        } else {
            draw_inactive(out, label.as_ref(), prefix)?;
        }
    }
    Ok(())
}

/// The four-line navigation legend followed by a blank line.
pub fn print_legend<W: Write>(out: &mut W) -> io::Result<()> {
    for line in theme::LEGEND {
        queue!(out, Print(line), Print(NEWLINE))?;
    }
    queue!(out, Print(NEWLINE))
}

/// Print `count` blank lines to use as the drawing canvas.
pub fn reserve_rows<W: Write>(out: &mut W, count: usize) -> io::Result<()> {
    for _ in 0..count {
        queue!(out, Print(NEWLINE))?;
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
