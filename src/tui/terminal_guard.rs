//! Puts the terminal into pager mode and guarantees it comes back out.
//!
//! Raw mode, the alternate screen and a hidden cursor are set up by
//! [`TerminalGuard::new`] and undone on drop. A panic hook undoes them first
//! so the panic message lands on the normal screen.

use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};

/// Whether pager mode is currently entered. Shared with the panic hook, which
/// cannot borrow the guard.
static PAGER_MODE: AtomicBool = AtomicBool::new(false);

/// Holds the terminal in pager mode for its lifetime.
#[derive(Debug)]
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Enter pager mode. On failure whatever was already changed is undone
    /// before the error is returned.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        PAGER_MODE.store(true, Ordering::SeqCst);
        execute!(io::stdout(), EnterAlternateScreen, Hide).inspect_err(|_| leave_pager_mode())?;

        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            leave_pager_mode();
            previous(info);
        }));
        Ok(Self { _private: () })
    }

    /// Whether a guard currently holds the terminal.
    #[must_use]
    pub fn is_active() -> bool {
        PAGER_MODE.load(Ordering::SeqCst)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        leave_pager_mode();
        // Our hook owns the previous one; dropping ours restores the default.
        let _ = panic::take_hook();
    }
}

/// Undo pager mode once; later calls do nothing.
fn leave_pager_mode() {
    if !PAGER_MODE.swap(false, Ordering::SeqCst) {
        return;
    }
    let mut out = io::stdout();
    let _ = execute!(out, Show, LeaveAlternateScreen);
    let _ = out.flush();
    let _ = disable_raw_mode();
}
