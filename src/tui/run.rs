//! Effects boundary: one full menu session against a terminal.
//!
//! The only module that sequences side effects. It wires the pure layers
//! (state, update, view) and the key decoder to a [`Console`]: a key
//! source, a writer and whether to enter raw mode.
//!
//! Session shape: validate → acquire guard → legend → reserve rows →
//! query geometry → hide cursor → render/decode/update loop → final
//! inactive redraw → release.

use std::io::{self, Write};
use std::sync::Once;

use crossterm::queue;
use crossterm::style::Print;

use crate::terminal::{move_cursor, query_cursor_row, restore_terminal, KeySource, TerminalGuard};
use crate::types::{Geometry, MenuConfig, MenuError};

#[cfg(unix)]
use crate::terminal::StdinKeys;

use super::keys::read_key;
use super::state::{MultiSelect, Selection, SingleSelect, Transition};
use super::view::{print_legend, print_options, reserve_rows, NEWLINE};

// ============================================================================
// CONSOLE
// ============================================================================

/// Where a session reads keys from and draws to.
pub struct Console<K, W> {
    pub keys: K,
    pub out: W,
    /// Enter raw mode for the session. Off when driving a script.
    pub raw_mode: bool,
}

#[cfg(unix)]
impl Console<StdinKeys, io::Stderr> {
    /// The controlling terminal: raw stdin in, stderr out.
    ///
    /// Drawing on stderr keeps stdout free for the result. SIGINT and
    /// SIGTERM are caught until the console is dropped, so a signal ends
    /// the session through its guard instead of killing the process.
    pub fn stdio() -> io::Result<Self> {
        Ok(Console {
            keys: StdinKeys::new().with_interrupts()?,
            out: io::stderr(),
            raw_mode: true,
        })
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Checkbox menu on the controlling terminal.
///
/// Returns one flag per option, in option order.
#[cfg(unix)]
pub fn multiselect<L: AsRef<str>>(
    options: &[L],
    defaults: &[bool],
    config: &MenuConfig,
) -> Result<Vec<bool>, MenuError> {
    validate_options(options)?;
    install_panic_hook();
    run_multiselect(Console::stdio()?, options, defaults, config)
}

/// Radio menu on the controlling terminal.
///
/// Returns the chosen label, or `None` if the user cleared the selection.
#[cfg(unix)]
pub fn singleselect<L: AsRef<str>>(
    options: &[L],
    default: usize,
    config: &MenuConfig,
) -> Result<Option<String>, MenuError> {
    validate_default(options, default)?;
    install_panic_hook();
    run_singleselect(Console::stdio()?, options, default, config)
}

/// Checkbox menu on any console.
pub fn run_multiselect<K, W, L>(
    console: Console<K, W>,
    options: &[L],
    defaults: &[bool],
    config: &MenuConfig,
) -> Result<Vec<bool>, MenuError>
where
    K: KeySource,
    W: Write,
    L: AsRef<str>,
{
    validate_options(options)?;
    let menu = MultiSelect::new(options.len(), defaults);
    let done = run_session(console, options, menu, config)?;
    tracing::debug!(checked = ?done.checked, "multi-select confirmed");
    Ok(done.checked)
}

/// Radio menu on any console.
pub fn run_singleselect<K, W, L>(
    console: Console<K, W>,
    options: &[L],
    default: usize,
    config: &MenuConfig,
) -> Result<Option<String>, MenuError>
where
    K: KeySource,
    W: Write,
    L: AsRef<str>,
{
    validate_default(options, default)?;
    let menu = SingleSelect::new(options.len(), default);
    let done = run_session(console, options, menu, config)?;
    tracing::debug!(selected = ?done.selected, "single-select confirmed");
    Ok(done
        .selected
        .and_then(|index| options.get(index))
        .map(|label| label.as_ref().to_string()))
}

/// Reject configurations that can't produce a menu.
///
/// Runs before the terminal is touched, so a failure needs no cleanup.
pub fn validate_options<L: AsRef<str>>(options: &[L]) -> Result<(), MenuError> {
    if options.is_empty() {
        return Err(MenuError::EmptyOptions);
    }
    Ok(())
}

/// [`validate_options`], plus a default that names one of them.
pub fn validate_default<L: AsRef<str>>(options: &[L], default: usize) -> Result<(), MenuError> {
    validate_options(options)?;
    if default >= options.len() {
        return Err(MenuError::DefaultOutOfRange {
            index: default,
            len: options.len(),
        });
    }
    Ok(())
}

// ============================================================================
// SESSION LOOP
// ============================================================================

/// Drive one selection machine until it confirms or aborts.
fn run_session<K, W, L, S>(
    console: Console<K, W>,
    options: &[L],
    mut selection: S,
    config: &MenuConfig,
) -> Result<S, MenuError>
where
    K: KeySource,
    W: Write,
    L: AsRef<str>,
    S: Selection,
{
    // `term` is declared after `keys`, so the guard releases the terminal
    // before any signal handlers owned by `keys` are put back
    let Console {
        mut keys,
        out,
        raw_mode,
    } = console;
    let mut term = TerminalGuard::acquire(out, raw_mode)?;

    if config.legend {
        print_legend(&mut term)?;
    }
    reserve_rows(&mut term, options.len())?;
    let row_after = query_cursor_row(&mut term, &mut keys)?;
    let geometry = Geometry::from_reserved(row_after, options.len());
    tracing::debug!(
        start_row = geometry.start_row,
        last_row = geometry.last_row,
        options = options.len(),
        "menu session started"
    );

    term.hide_cursor()?;

    let confirmed = loop {
        print_options(&mut term, &geometry, options, &selection, Some(selection.cursor()))?;
        term.flush()?;

        let Some(key) = read_key(&mut keys, config.escape_timeout)? else {
            continue;
        };
        tracing::trace!(?key, cursor = selection.cursor(), "key decoded");

        match selection.update(key) {
            Transition::Continue(next) => selection = next,
            Transition::Confirm(done) => break done,
            Transition::Abort => {
                leave_block(&mut term, &geometry)?;
                tracing::debug!("menu session interrupted");
                return Err(MenuError::Interrupted);
            }
        }
    };

    print_options(&mut term, &geometry, options, &confirmed, None)?;
    leave_block(&mut term, &geometry)?;
    term.release()?;
    Ok(confirmed)
}

/// Park the cursor below the option block on a fresh line.
fn leave_block<W: Write>(out: &mut W, geometry: &Geometry) -> io::Result<()> {
    move_cursor(out, geometry.last_row, 1)?;
    queue!(out, Print(NEWLINE))
}

// ============================================================================
// PANIC SAFETY
// ============================================================================

/// Restore the terminal before the panic message prints.
///
/// The guard's drop would also run during unwinding, but only after the
/// message, which raw mode would have mangled. Installed once per process.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = restore_terminal();
            original_hook(panic_info);
        }));
    });
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedKeys;

    /// Cursor reply placing the end of a 3-row block on row 10.
    const REPLY: &[u8] = b"\x1b[10;1R";

    const ABC: [&str; 3] = ["A", "B", "C"];

    fn console(keys: ScriptedKeys, out: &mut Vec<u8>) -> Console<ScriptedKeys, &mut Vec<u8>> {
        Console {
            keys,
            out,
            raw_mode: false,
        }
    }

    fn multi(keys: &[u8], defaults: &[bool]) -> (Result<Vec<bool>, MenuError>, String) {
        let mut out = Vec::new();
        let result = run_multiselect(console(script(keys), &mut out), &ABC, defaults, &MenuConfig::default());
        (result, String::from_utf8(out).unwrap())
    }

    fn single(keys: ScriptedKeys, default: usize) -> (Result<Option<String>, MenuError>, String) {
        let mut out = Vec::new();
        let result = run_singleselect(console(keys, &mut out), &ABC, default, &MenuConfig::default());
        (result, String::from_utf8(out).unwrap())
    }

    /// The cursor reply followed by `bytes`.
    fn script(bytes: &[u8]) -> ScriptedKeys {
        ScriptedKeys::new(REPLY).then(bytes)
    }

    // --- Multi-select sessions ---

    #[test]
    fn multi_enter_returns_defaults_unchanged() {
        let (result, _) = multi(b"\r", &[true, false, true]);
        assert_eq!(result.unwrap(), vec![true, false, true]);
    }

    #[test]
    fn multi_toggles_follow_the_cursor() {
        // down, space, down, space, up, space, enter
        let (result, _) = multi(b"\x1b[B \x1b[B \x1b[A \r", &[]);
        assert_eq!(result.unwrap(), vec![false, false, true]);
    }

    #[test]
    fn multi_result_length_matches_options_with_short_defaults() {
        let (result, _) = multi(b"\r", &[true]);
        assert_eq!(result.unwrap(), vec![true, false, false]);
    }

    #[test]
    fn session_output_has_expected_frame_sequence() {
        let (_, screen) = multi(b"\r", &[false, true, false]);

        // Canvas, position query, hidden cursor
        assert!(screen.starts_with("\r\n\r\n\r\n\x1b[6n\x1b[?25l"));
        // First frame highlights row 0 at start_row = 10 - 3
        assert!(screen.contains("\x1b[7;1H[ ] \x1b[7mA\x1b[27m"));
        assert!(screen.contains("\x1b[8;1H[\x1b[38;5;46m✔\x1b[0m] B"));
        // Final frame draws everything inactive, then parks and shows the cursor
        assert!(screen.ends_with("\x1b[9;1H[ ] C\x1b[10;1H\r\n\x1b[?25h"));
        assert_eq!(screen.matches("\x1b[7m").count(), 1);
    }

    #[test]
    fn unrecognized_keys_redraw_without_changing_state() {
        let (result, screen) = multi(b"xq\r", &[true, false, true]);
        assert_eq!(result.unwrap(), vec![true, false, true]);
        // Three highlighted frames: before 'x', before 'q', before enter
        assert_eq!(screen.matches("\x1b[7m").count(), 3);
    }

    #[test]
    fn end_of_input_confirms() {
        let (result, _) = multi(b"", &[false, true, false]);
        assert_eq!(result.unwrap(), vec![false, true, false]);
    }

    #[test]
    fn interrupt_restores_cursor_and_reports() {
        let (result, screen) = multi(b" \x03", &[]);
        assert!(matches!(result, Err(MenuError::Interrupted)));
        assert!(screen.ends_with("\x1b[10;1H\r\n\x1b[?25h"));
    }

    #[test]
    fn keys_typed_before_the_cursor_reply_are_kept() {
        let keys = ScriptedKeys::new(b" ").then(REPLY).then(b"\r");
        let mut out = Vec::new();
        let result = run_multiselect(console(keys, &mut out), &ABC, &[], &MenuConfig::default());
        assert_eq!(result.unwrap(), vec![true, false, false]);
    }

    #[test]
    fn typed_r_before_the_cursor_reply_is_not_an_error() {
        let keys = ScriptedKeys::new(b"R").then(REPLY).then(b"\r");
        let mut out = Vec::new();
        let result = run_multiselect(console(keys, &mut out), &ABC, &[true], &MenuConfig::default());
        assert_eq!(result.unwrap(), vec![true, false, false]);
    }

    #[test]
    fn ctrl_c_before_the_cursor_reply_interrupts() {
        let keys = ScriptedKeys::new(b"\x03").then(REPLY).then(b"\r");
        let mut out = Vec::new();
        let result = run_multiselect(console(keys, &mut out), &ABC, &[], &MenuConfig::default());
        assert!(matches!(result, Err(MenuError::Interrupted)));
        // Nothing was hidden yet, so nothing is shown
        assert!(!String::from_utf8(out).unwrap().contains("\x1b[?25"));
    }

    #[test]
    fn legend_prints_before_canvas() {
        let mut out = Vec::new();
        let config = MenuConfig {
            legend: true,
            ..MenuConfig::default()
        };
        run_multiselect(console(script(b"\r"), &mut out), &ABC, &[], &config).unwrap();
        let screen = String::from_utf8(out).unwrap();
        assert!(screen.starts_with(crate::tui::theme::LEGEND[0]));
        let canvas = screen.find("\x1b[6n").unwrap();
        // 4 legend lines + blank + 3 reserved rows
        assert_eq!(screen[..canvas].matches(NEWLINE).count(), 8);
    }

    // --- Single-select sessions ---

    #[test]
    fn single_enter_returns_default_label() {
        let (result, _) = single(script(b"\r"), 1);
        assert_eq!(result.unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn single_down_down_space_enter_picks_last() {
        let (result, _) = single(script(b"\x1b[B\x1b[B \r"), 0);
        assert_eq!(result.unwrap().as_deref(), Some("C"));
    }

    #[test]
    fn single_space_space_enter_reselects_first() {
        let (result, _) = single(script(b"  \r"), 0);
        assert_eq!(result.unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn single_deselect_returns_nothing() {
        let (result, _) = single(script(b" \r"), 0);
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn bare_escape_is_ignored() {
        let keys = script(b"\x1b").pause().then(b"\r");
        let (result, screen) = single(keys, 2);
        assert_eq!(result.unwrap().as_deref(), Some("C"));
        assert_eq!(screen.matches("\x1b[7m").count(), 2);
    }

    // --- Configuration errors ---

    #[test]
    fn empty_options_fail_before_touching_terminal() {
        let mut out = Vec::new();
        let options: [&str; 0] = [];
        let result = run_multiselect(
            console(ScriptedKeys::new(REPLY), &mut out),
            &options,
            &[],
            &MenuConfig::default(),
        );
        assert!(matches!(result, Err(MenuError::EmptyOptions)));
        assert!(out.is_empty());
    }

    #[test]
    fn out_of_range_default_fails_before_touching_terminal() {
        let mut out = Vec::new();
        let result = run_singleselect(
            console(ScriptedKeys::new(REPLY), &mut out),
            &ABC,
            3,
            &MenuConfig::default(),
        );
        assert!(matches!(
            result,
            Err(MenuError::DefaultOutOfRange { index: 3, len: 3 })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn missing_cursor_reply_is_an_error_and_cleans_up() {
        let mut out = Vec::new();
        let result = run_multiselect(
            console(ScriptedKeys::new(b""), &mut out),
            &ABC,
            &[],
            &MenuConfig::default(),
        );
        assert!(matches!(result, Err(MenuError::CursorReport(_))));
        // Cursor was never hidden, so nothing to show
        assert!(!String::from_utf8(out).unwrap().contains("\x1b[?25"));
    }

    // --- Signals ---

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn sigint_mid_session_restores_cursor_and_reports() {
        use crate::terminal::{StdinKeys, TestPipe};
        use std::time::Duration;

        let pipe = TestPipe::new();
        pipe.write(REPLY);
        let mut out = Vec::new();

        let result = std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(50));
                unsafe { libc::kill(libc::getpid(), libc::SIGINT) };
            });
            let console = Console {
                keys: StdinKeys::from_fd(pipe.reader()).with_interrupts().unwrap(),
                out: &mut out,
                raw_mode: false,
            };
            run_multiselect(console, &ABC, &[], &MenuConfig::default())
        });

        assert!(matches!(result, Err(MenuError::Interrupted)));
        let screen = String::from_utf8(out).unwrap();
        assert!(screen.ends_with("\x1b[10;1H\r\n\x1b[?25h"));
    }
}
