//! Menu state algebra: pure types, zero effects.
//!
//! The two selection machines share one command set ([`Key`]) and one
//! transition type. Only the cursor and the selection live here; the
//! option labels are borrowed by the renderer and never copied in.

use super::theme;

// ============================================================================
// KEYS
// ============================================================================

/// A decoded logical command.
///
/// Unrecognized input never becomes a `Key`; the decoder reports it as
/// `None` and the loop simply redraws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Space,
    Enter,
    /// Ctrl-C typed in raw mode, or a caught SIGINT/SIGTERM.
    Interrupt,
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Result of applying one key to a selection.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition<S> {
    /// Keep looping with this state.
    Continue(S),
    /// The user confirmed; this state is final.
    Confirm(S),
    /// The user cancelled the session.
    Abort,
}

/// Behaviour shared by both menu kinds, as seen by the session loop.
pub trait Selection: Sized {
    /// Currently highlighted row.
    fn cursor(&self) -> usize;

    /// Indicator drawn before the label at `index`.
    fn prefix(&self, index: usize) -> &'static str;

    /// Apply one key. Pure: consumes the old state, returns the next.
    fn update(self, key: Key) -> Transition<Self>;
}

// ============================================================================
// MULTI-SELECT
// ============================================================================

/// Checkbox menu: any subset of options may be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelect {
    /// Highlighted row, always `< checked.len()`.
    pub cursor: usize,
    /// One flag per option, in option order.
    pub checked: Vec<bool>,
}

impl MultiSelect {
    /// Start at row 0 with `defaults` applied.
    ///
    /// Missing defaults are unchecked; surplus defaults are ignored.
    pub fn new(len: usize, defaults: &[bool]) -> Self {
        let checked = (0..len)
            .map(|i| defaults.get(i).copied().unwrap_or(false))
            .collect();
        MultiSelect { cursor: 0, checked }
    }
}

impl Selection for MultiSelect {
    fn cursor(&self) -> usize {
        self.cursor
    }

    fn prefix(&self, index: usize) -> &'static str {
        if self.checked.get(index).copied().unwrap_or(false) {
            theme::CHECKBOX_ON
        } else {
            theme::CHECKBOX_OFF
        }
    }

    fn update(self, key: Key) -> Transition<Self> {
        super::update::update_multi(self, key)
    }
}

// ============================================================================
// SINGLE-SELECT
// ============================================================================

/// Radio menu: zero or one option selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSelect {
    /// Highlighted row, always `< len`.
    pub cursor: usize,
    /// Selected row, `None` once the user toggled it off.
    pub selected: Option<usize>,
    pub len: usize,
}

impl SingleSelect {
    /// Start at row 0 with `default` selected.
    pub fn new(len: usize, default: usize) -> Self {
        SingleSelect {
            cursor: 0,
            selected: Some(default),
            len,
        }
    }
}

impl Selection for SingleSelect {
    fn cursor(&self) -> usize {
        self.cursor
    }

    fn prefix(&self, index: usize) -> &'static str {
        if self.selected == Some(index) {
            theme::RADIO_ON
        } else {
            theme::RADIO_OFF
        }
    }

    fn update(self, key: Key) -> Transition<Self> {
        super::update::update_single(self, key)
    }
}

// ============================================================================
// TESTS
// ============================================================================
