//! Terminal lifecycle for prwatch.
//!
//! prwatch does not take over the screen. It only switches the terminal to
//! raw mode so single keypresses (`r`, `q`, ...) arrive without Enter; the
//! report keeps scrolling in the normal buffer. Raw mode disables output
//! post-processing, so the reporter ends lines with `\r\n` while it is on.

use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;

/// Enables raw mode. Call [`restore_terminal`] at every exit path.
///
/// # Errors
///
/// Returns `Err` if the terminal refuses the mode change.
pub fn init_terminal() -> std::io::Result<()> {
    enable_raw_mode()
}

/// Restores cooked mode. Idempotent; a no-op when raw mode is off.
///
/// # Errors
///
/// Returns `Err` if `disable_raw_mode` fails. The panic hook ignores it.
pub fn restore_terminal() -> std::io::Result<()> {
    if is_raw_mode_enabled()? {
        disable_raw_mode()?;
    }
    Ok(())
}

/// Install a panic hook that restores the terminal before printing the panic message.
///
/// Must be called **before** [`init_terminal`]. Chains onto the previously
/// installed hook so the default printer still runs afterwards.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Register a SIGTERM handler that sets an `AtomicBool` flag.
///
/// The event loop polls the returned flag on its heartbeat.
///
/// # Panics
///
/// Panics if the OS refuses to register the signal handler; treated as a
/// fatal initialisation error.
pub fn register_sigterm() -> Arc<AtomicBool> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term)).expect("Failed to register SIGTERM handler");
    term
}
