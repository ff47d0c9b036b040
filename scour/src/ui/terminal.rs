use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

fn setup() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)
}

fn restore() -> io::Result<()> {
    // best effort: try every step even if one fails
    let raw = disable_raw_mode();
    let screen = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    raw.and(screen)
}

/// Idempotent handle that puts the terminal back; safe to invoke from the
/// signal-handler thread while the UI loop still runs.
#[derive(Clone)]
pub struct Restorer {
    restored: Arc<AtomicBool>,
}

impl Restorer {
    pub fn restore(&self) -> io::Result<()> {
        if self.restored.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        restore()
    }
}

/// Raw-mode + alternate-screen session, torn down on drop.
pub struct TerminalGuard {
    restorer: Restorer,
}

impl TerminalGuard {
    pub fn new() -> io::Result<Self> {
        setup()?;
        Ok(Self {
            restorer: Restorer {
                restored: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    pub fn restorer(&self) -> Restorer {
        self.restorer.clone()
    }

    /// Hand the terminal to an external program, run `f`, take it back.
    pub fn suspend<T>(&mut self, f: impl FnOnce() -> T) -> io::Result<T> {
        restore()?;
        let value = f();
        setup()?;
        // the session is live again; a later drop must restore it
        self.restorer.restored.store(false, Ordering::SeqCst);
        Ok(value)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restorer.restore();
    }
}

/// Watch for SIGINT/SIGTERM on a dedicated thread: flag shutdown so every
/// loop can wind down, then hard-exit with the terminal restored if the
/// process is still alive after a grace period.
#[cfg(unix)]
pub fn install_signal_handler(restorer: Restorer, shutdown: Arc<AtomicBool>) -> io::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::time::Duration;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("scour-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                shutdown.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_secs(2));
                let _ = restorer.restore();
                std::process::exit(if signal == SIGTERM { 143 } else { 130 });
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handler(_restorer: Restorer, _shutdown: Arc<AtomicBool>) -> io::Result<()> {
    Ok(())
}
