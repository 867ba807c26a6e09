//! Restores the terminal when the card goes away, however that happens.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// RAII guard for raw mode and the alternate screen.
///
/// Cleanup runs on early returns via `?`, on normal scope exit, and from the
/// panic hook installed by [`install_panic_hook`].
pub struct TerminalGuard {
    active: AtomicBool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self {
            active: AtomicBool::new(true),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Best-effort restore; errors are ignored since this also runs mid-panic
    pub fn cleanup() {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        let _ = io::stdout().flush();
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            Self::cleanup();
        }
    }
}

/// Install panic hook that restores terminal before printing panic.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        TerminalGuard::cleanup();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_guard_skips_cleanup() {
        let guard = TerminalGuard {
            active: AtomicBool::new(false),
        };
        assert!(!guard.is_active());
        drop(guard);
    }

    #[test]
    fn test_drop_clears_active_flag_once() {
        let guard = TerminalGuard {
            active: AtomicBool::new(true),
        };
        assert!(guard.is_active());
        assert!(guard.active.swap(false, Ordering::SeqCst));
        // Drop now sees the flag already cleared.
        drop(guard);
    }
}
