//! Ctrl-C handling.
//!
//! The first SIGINT asks the running campaign to pause at the next row
//! boundary; the handler then restores the default disposition so a second
//! Ctrl-C terminates immediately.
use crate::pipeline::CancelToken;
use anyhow::Result;
use std::sync::OnceLock;

static PAUSE_TOKEN: OnceLock<CancelToken> = OnceLock::new();

#[cfg(unix)]
extern "C" fn on_interrupt(_signum: libc::c_int) {
    if let Some(token) = PAUSE_TOKEN.get() {
        token.cancel();
    }
    // SAFETY: `signal` is async-signal-safe and SIG_DFL is always valid.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

/// Route SIGINT to `token`. Only the first token installed per process is used.
#[cfg(unix)]
pub fn pause_on_interrupt(token: &CancelToken) -> Result<()> {
    if PAUSE_TOKEN.set(token.clone()).is_err() {
        tracing::debug!("interrupt handler already installed");
        return Ok(());
    }
    let handler = on_interrupt as extern "C" fn(libc::c_int);
    // SAFETY: the handler only touches an atomic flag and re-arms SIG_DFL.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        return Err(anyhow::anyhow!(
            "install SIGINT handler: {}",
            std::io::Error::last_os_error()
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn pause_on_interrupt(token: &CancelToken) -> Result<()> {
    let _ = PAUSE_TOKEN.set(token.clone());
    tracing::debug!("pause on interrupt is not supported on this platform");
    Ok(())
}
