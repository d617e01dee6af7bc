//! Pure state transitions: (Selection, Key) → Transition.
//!
//! Fully testable without a terminal. `Enter` is the only key that ends
//! a session normally; `Interrupt` aborts it.

use super::state::{Key, MultiSelect, SingleSelect, Transition};

/// Move the cursor one row up, wrapping from the first row to the last.
pub fn step_up(cursor: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cursor + len - 1) % len
}

/// Move the cursor one row down, wrapping from the last row to the first.
pub fn step_down(cursor: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (cursor + 1) % len
}

/// Checkbox menu: space toggles the highlighted row.
pub fn update_multi(mut menu: MultiSelect, key: Key) -> Transition<MultiSelect> {
    let len = menu.checked.len();
    match key {
        Key::Up => menu.cursor = step_up(menu.cursor, len),
        Key::Down => menu.cursor = step_down(menu.cursor, len),
        Key::Space => {
            if let Some(flag) = menu.checked.get_mut(menu.cursor) {
                *flag = !*flag;
            }
        }
        Key::Enter => return Transition::Confirm(menu),
        Key::Interrupt => return Transition::Abort,
    }
    Transition::Continue(menu)
}

/// Radio menu: space selects the highlighted row, or clears the
/// selection if that row was already selected.
pub fn update_single(mut menu: SingleSelect, key: Key) -> Transition<SingleSelect> {
    match key {
        Key::Up => menu.cursor = step_up(menu.cursor, menu.len),
        Key::Down => menu.cursor = step_down(menu.cursor, menu.len),
        Key::Space => {
            menu.selected = if menu.selected == Some(menu.cursor) {
                None
            } else {
                Some(menu.cursor)
            };
        }
        Key::Enter => return Transition::Confirm(menu),
        Key::Interrupt => return Transition::Abort,
    }
    Transition::Continue(menu)
}

// ============================================================================
// TESTS
// ============================================================================
