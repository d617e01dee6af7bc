//! Terminal control primitives and raw key input.
//!
//! Structure:
//! - Cursor commands: hide/show/move, written to any `Write`
//! - Position query: `ESC[6n` and its `ESC[row;colR` reply
//! - Key sources: where raw bytes come from (stdin, or a script in tests)
//! - Interrupt pipe: SIGINT/SIGTERM forwarded into the key stream
//! - TerminalGuard: raw mode + hidden cursor as a scoped resource

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::types::MenuError;

/// Device Status Report: ask the terminal where the cursor is.
pub const CURSOR_POSITION_REQUEST: &str = "\x1b[6n";

/// What raw mode turns Ctrl-C into. Caught signals are reported the same way.
pub const CTRL_C: u8 = 0x03;

/// Reply plus whatever was typed ahead of it; anything longer is garbage.
const MAX_REPORT_LEN: usize = 64;

// ============================================================================
// CURSOR COMMANDS
// ============================================================================

/// Emit `ESC[?25l`.
pub fn hide_cursor<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Hide)
}

/// Emit `ESC[?25h`.
pub fn show_cursor<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Show)
}

/// Position the write cursor at 1-based `(row, col)`: `ESC[{row};{col}H`.
pub fn move_cursor<W: Write>(out: &mut W, row: u16, col: u16) -> io::Result<()> {
    // crossterm's MoveTo is 0-based (column first)
    queue!(out, MoveTo(col.saturating_sub(1), row.saturating_sub(1)))
}

// ============================================================================
// POSITION QUERY
// ============================================================================

/// Ask the terminal for the cursor row and block until it answers.
///
/// Keys typed before the reply arrives are handed back to `keys` in order,
/// except Ctrl-C, which ends the query with [`MenuError::Interrupted`].
/// Only meaningful on an interactive terminal in raw mode: elsewhere
/// nobody answers.
pub fn query_cursor_row<W, K>(out: &mut W, keys: &mut K) -> Result<u16, MenuError>
where
    W: Write,
    K: KeySource,
{
    out.write_all(CURSOR_POSITION_REQUEST.as_bytes())?;
    out.flush()?;

    let mut buffer = Vec::new();
    loop {
        let byte = keys.read_byte()?.ok_or_else(|| {
            MenuError::CursorReport("input closed before the terminal replied".to_string())
        })?;
        if byte == CTRL_C {
            tracing::debug!("interrupted while waiting for the cursor position");
            return Err(MenuError::Interrupted);
        }
        buffer.push(byte);

        // A typed 'R' ends nothing on its own; only a complete reply does
        if byte == b'R' {
            if let Some((start, row, _col)) = split_cursor_report(&buffer) {
                keys.unread(&buffer[..start]);
                tracing::trace!(row, typed_ahead = start, "cursor position reported");
                return Ok(row);
            }
        }

        if buffer.len() > MAX_REPORT_LEN {
            return Err(MenuError::CursorReport(format!(
                "no reply in {:?}",
                String::from_utf8_lossy(&buffer)
            )));
        }
    }
}

/// Parse `ESC [ row ; col R` into `(row, col)`.
///
/// The reply must end the buffer; leading noise is tolerated.
pub fn parse_cursor_report(reply: &[u8]) -> Option<(u16, u16)> {
    split_cursor_report(reply).map(|(_, row, col)| (row, col))
}

/// Find a well-formed reply at the end of `buffer`.
///
/// Returns the offset where it starts, then `(row, col)`.
fn split_cursor_report(buffer: &[u8]) -> Option<(usize, u16, u16)> {
    let start = buffer.windows(2).rposition(|pair| pair == b"\x1b[")?;
    let body = buffer[start + 2..].strip_suffix(b"R")?;
    let body = std::str::from_utf8(body).ok()?;
    let (row, col) = body.split_once(';')?;
    Some((start, decimal(row)?, decimal(col)?))
}

/// Digits only: `parse` alone would also take a leading `+`.
fn decimal(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

// ============================================================================
// KEY SOURCES
// ============================================================================

/// A byte-at-a-time input stream with an optional bounded wait.
pub trait KeySource {
    /// Block until one byte arrives. `None` is an empty read (end of input).
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Wait at most `timeout` for one byte. `None` means nothing arrived.
    fn read_byte_timeout(&mut self, timeout: Duration) -> io::Result<Option<u8>>;

    /// Put `bytes` back at the front of the stream, to be read again in order.
    fn unread(&mut self, bytes: &[u8]);
}

/// Raw bytes straight from the stdin file descriptor.
///
/// Bypasses std's buffered `Stdin`: a poll on the descriptor must see
/// every byte that hasn't been consumed yet, so the only buffer is ours.
#[cfg(unix)]
pub struct StdinKeys {
    fd: libc::c_int,
    pending: VecDeque<u8>,
    interrupts: Option<InterruptPipe>,
}

/// What a poll woke up for.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Input,
    Interrupt,
    Timeout,
}

#[cfg(unix)]
impl StdinKeys {
    pub fn new() -> Self {
        Self::from_fd(libc::STDIN_FILENO)
    }

    /// Read from any descriptor. The caller keeps ownership of `fd`.
    pub(crate) fn from_fd(fd: libc::c_int) -> Self {
        StdinKeys {
            fd,
            pending: VecDeque::new(),
            interrupts: None,
        }
    }

    /// Catch SIGINT and SIGTERM for as long as this source lives.
    ///
    /// A caught signal reads as [`CTRL_C`], so the session unwinds through
    /// its guard exactly as it would for a typed Ctrl-C. The previous
    /// dispositions come back on drop.
    pub fn with_interrupts(mut self) -> io::Result<Self> {
        self.interrupts = Some(InterruptPipe::install()?);
        Ok(self)
    }

    /// Poll input and the interrupt pipe together. `None` waits forever.
    fn wait(&self, timeout: Option<Duration>) -> io::Result<Wake> {
        let interrupt_fd = self.interrupts.as_ref().map_or(-1, |pipe| pipe.read_fd);
        // poll(2) skips negative descriptors
        let mut fds = [
            libc::pollfd {
                fd: self.fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: interrupt_fd,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let millis = match timeout {
            Some(timeout) => libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX),
            None => -1,
        };
        loop {
            // SAFETY: `fds` is a valid, exclusively borrowed array of 2 pollfds.
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, millis) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                // The handler's byte is already in the pipe; the next poll sees it
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if rc == 0 {
                return Ok(Wake::Timeout);
            }
            if fds[1].revents & libc::POLLIN != 0 {
                if let Some(pipe) = &self.interrupts {
                    pipe.drain();
                }
                return Ok(Wake::Interrupt);
            }
            // POLLHUP and POLLERR included: the read reports them
            return Ok(Wake::Input);
        }
    }

    /// One `read(2)` into the pending buffer. Zero means end of input.
    fn read_chunk(&mut self) -> io::Result<usize> {
        let mut buf = [0u8; 64];
        loop {
            // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
            let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            let n = n as usize;
            self.pending.extend(&buf[..n]);
            return Ok(n);
        }
    }

    fn next_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }
        match self.wait(timeout)? {
            Wake::Interrupt => {
                tracing::debug!("termination signal caught");
                Ok(Some(CTRL_C))
            }
            Wake::Timeout => Ok(None),
            Wake::Input => {
                self.read_chunk()?;
                Ok(self.pending.pop_front())
            }
        }
    }
}

#[cfg(unix)]
impl Default for StdinKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl KeySource for StdinKeys {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.next_byte(None)
    }

    fn read_byte_timeout(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        self.next_byte(Some(timeout))
    }

    fn unread(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().rev() {
            self.pending.push_front(byte);
        }
    }
}

/// Replays a fixed byte script. A `None` entry is a pause: a timed
/// read sees it as a timeout, a blocking read skips over it.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedKeys {
    script: VecDeque<Option<u8>>,
}

#[cfg(test)]
impl ScriptedKeys {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        ScriptedKeys {
            script: bytes.iter().copied().map(Some).collect(),
        }
    }

    pub(crate) fn then(mut self, bytes: &[u8]) -> Self {
        self.script.extend(bytes.iter().copied().map(Some));
        self
    }

    pub(crate) fn pause(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    pub(crate) fn remaining(&self) -> usize {
        self.script.iter().flatten().count()
    }
}

#[cfg(test)]
impl KeySource for ScriptedKeys {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        while let Some(entry) = self.script.pop_front() {
            if entry.is_some() {
                return Ok(entry);
            }
        }
        Ok(None)
    }

    fn read_byte_timeout(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        Ok(self.script.pop_front().flatten())
    }

    fn unread(&mut self, bytes: &[u8]) {
        for &byte in bytes.iter().rev() {
            self.script.push_front(Some(byte));
        }
    }
}

// ============================================================================
// INTERRUPT PIPE
// ============================================================================

/// Write end of the live interrupt pipe, or -1.
#[cfg(unix)]
static INTERRUPT_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

#[cfg(unix)]
const CAUGHT_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

/// Signal handler: one byte into the pipe, nothing else.
#[cfg(unix)]
extern "C" fn forward_signal(_signal: libc::c_int) {
    let fd = INTERRUPT_WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = CTRL_C;
        // SAFETY: write(2) is async-signal-safe. The pipe is non-blocking,
        // so a full pipe drops the byte instead of hanging the handler.
        unsafe {
            libc::write(fd, (&byte as *const u8).cast(), 1);
        }
    }
}

/// Self-pipe for SIGINT/SIGTERM, installed for one session.
///
/// The handler only writes a byte; [`StdinKeys`] polls the read end next
/// to stdin. One pipe is live at a time.
#[cfg(unix)]
struct InterruptPipe {
    read_fd: libc::c_int,
    write_fd: libc::c_int,
    previous: Vec<(libc::c_int, libc::sigaction)>,
}

#[cfg(unix)]
impl InterruptPipe {
    fn install() -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut pipe = InterruptPipe {
            read_fd: fds[0],
            write_fd: fds[1],
            previous: Vec::new(),
        };
        for fd in fds {
            set_nonblocking_cloexec(fd)?;
        }
        INTERRUPT_WRITE_FD.store(pipe.write_fd, Ordering::SeqCst);

        for signal in CAUGHT_SIGNALS {
            // SAFETY: an all-zero sigaction is a valid value to fill in.
            let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
            action.sa_sigaction = forward_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            // SAFETY: `action.sa_mask` is a valid sigset_t to initialize.
            unsafe { libc::sigemptyset(&mut action.sa_mask) };

            // SAFETY: as above.
            let mut previous: libc::sigaction = unsafe { std::mem::zeroed() };
            // SAFETY: both pointers refer to live sigaction values.
            if unsafe { libc::sigaction(signal, &action, &mut previous) } != 0 {
                // Drop puts back what was already replaced
                return Err(io::Error::last_os_error());
            }
            pipe.previous.push((signal, previous));
        }
        tracing::trace!(read_fd = pipe.read_fd, "interrupt handlers installed");
        Ok(pipe)
    }

    /// Empty the pipe so one signal is reported once.
    fn drain(&self) {
        let mut buf = [0u8; 16];
        loop {
            // SAFETY: `buf` is valid for writes; the fd is non-blocking.
            let n = unsafe { libc::read(self.read_fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break;
            }
        }
    }
}

#[cfg(unix)]
impl Drop for InterruptPipe {
    fn drop(&mut self) {
        for (signal, previous) in self.previous.drain(..).rev() {
            // SAFETY: `previous` came from sigaction(2) for this signal.
            unsafe {
                libc::sigaction(signal, &previous, std::ptr::null_mut());
            }
        }
        let _ = INTERRUPT_WRITE_FD.compare_exchange(
            self.write_fd,
            -1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        // SAFETY: both descriptors are owned by this pipe and closed once.
        unsafe {
            libc::close(self.read_fd);
            libc::close(self.write_fd);
        }
    }
}

#[cfg(unix)]
fn set_nonblocking_cloexec(fd: libc::c_int) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor this process owns.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Both ends of an anonymous pipe, closed on drop.
#[cfg(all(test, unix))]
pub(crate) struct TestPipe {
    reader: libc::c_int,
    writer: Option<libc::c_int>,
}

#[cfg(all(test, unix))]
impl TestPipe {
    pub(crate) fn new() -> Self {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe(2) failed");
        TestPipe {
            reader: fds[0],
            writer: Some(fds[1]),
        }
    }

    pub(crate) fn reader(&self) -> libc::c_int {
        self.reader
    }

    pub(crate) fn write(&self, bytes: &[u8]) {
        let fd = self.writer.expect("write end already closed");
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        assert_eq!(n, bytes.len() as isize);
    }

    pub(crate) fn close_writer(&mut self) {
        if let Some(fd) = self.writer.take() {
            unsafe { libc::close(fd) };
        }
    }
}

#[cfg(all(test, unix))]
impl Drop for TestPipe {
    fn drop(&mut self) {
        self.close_writer();
        unsafe { libc::close(self.reader) };
    }
}

// ============================================================================
// TERMINAL GUARD
// ============================================================================

/// Scoped ownership of the terminal for one menu session.
///
/// Raw mode (echo off, unbuffered input) is entered on acquire if asked
/// for; the cursor is hidden through [`TerminalGuard::hide_cursor`].
/// Both are undone on drop, whichever way the session ends.
pub struct TerminalGuard<W: Write> {
    out: W,
    raw_mode: bool,
    cursor_hidden: bool,
}

impl<W: Write> TerminalGuard<W> {
    pub fn acquire(out: W, raw_mode: bool) -> io::Result<Self> {
        if raw_mode {
            enable_raw_mode()?;
        }
        Ok(TerminalGuard {
            out,
            raw_mode,
            cursor_hidden: false,
        })
    }

    pub fn hide_cursor(&mut self) -> io::Result<()> {
        hide_cursor(&mut self.out)?;
        self.cursor_hidden = true;
        Ok(())
    }

    /// Show the cursor and leave raw mode. Safe to call more than once.
    pub fn release(&mut self) -> io::Result<()> {
        if self.cursor_hidden {
            show_cursor(&mut self.out)?;
            self.cursor_hidden = false;
        }
        self.out.flush()?;
        if self.raw_mode {
            disable_raw_mode()?;
            self.raw_mode = false;
        }
        Ok(())
    }
}

impl<W: Write> Write for TerminalGuard<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        // Best-effort: nowhere left to report a failure
        let _ = self.release();
    }
}

/// Restore the controlling terminal without a guard at hand.
///
/// Used from the panic hook, where the session's writer is out of reach.
pub fn restore_terminal() -> io::Result<()> {
    let mut err = io::stderr();
    show_cursor(&mut err)?;
    err.flush()?;
    disable_raw_mode()
}

// ============================================================================
// TESTS
// ============================================================================
