//! Unix process and lock plumbing. There is no window manager to talk to here.

use anyhow::{Context, Result};
use single_instance::SingleInstance;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::core::{GuardError, InspectError, WindowHandle, WindowInfo};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Machine-wide named lock, released on drop
pub struct NamedMutex {
    _instance: SingleInstance,
}

impl std::fmt::Debug for NamedMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedMutex").finish_non_exhaustive()
    }
}

impl NamedMutex {
    /// Poll until the lock is free or `timeout` passes. The OS reclaims the
    /// lock of a dead holder, so abandonment never shows up here.
    pub fn acquire(name: &str, timeout: Duration) -> Result<Self, GuardError> {
        let deadline = Instant::now() + timeout;
        loop {
            let instance = SingleInstance::new(name).map_err(|e| GuardError::Os(e.to_string()))?;
            if instance.is_single() {
                return Ok(Self {
                    _instance: instance,
                });
            }
            drop(instance);

            let now = Instant::now();
            if now >= deadline {
                return Err(GuardError::Busy);
            }
            thread::sleep(LOCK_POLL_INTERVAL.min(deadline - now));
        }
    }
}

/// Force kill a process (SIGKILL)
pub fn kill_process(pid: u32) -> Result<()> {
    unsafe {
        let result = libc::kill(pid as i32, libc::SIGKILL);
        if result == 0 {
            Ok(())
        } else {
            anyhow::bail!(
                "Failed to kill process: {}",
                std::io::Error::last_os_error()
            )
        }
    }
}

/// Why a live-looking process yielded no command line
pub fn classify_unreadable(pid: u32) -> InspectError {
    // kill with signal 0 checks if process exists without sending a signal
    let result = unsafe { libc::kill(pid as i32, 0) };
    if result == 0 {
        return InspectError::AccessDenied(pid);
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::EPERM) => InspectError::AccessDenied(pid),
        _ => InspectError::Exited(pid),
    }
}

pub fn main_window(_pid: u32) -> Option<WindowInfo> {
    None
}

pub fn bring_to_front(window: WindowHandle) {
    debug!("No window manager binding, ignoring foreground request for {:?}", window);
}

pub fn minimize(window: WindowHandle) {
    debug!("No window manager binding, ignoring minimize request for {:?}", window);
}

/// Run a program and wait for it. No elevation prompt exists on this platform;
/// the program runs with our own privileges.
pub fn run_elevated_and_wait(path: &Path, args: &str) -> Result<Option<i32>> {
    info!("Running {:?} without elevation prompt", path);

    let mut cmd = Command::new(path);
    cmd.args(split_args(args)?);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        cmd.current_dir(parent);
    }

    let status = cmd
        .status()
        .with_context(|| format!("Failed to run {}", path.display()))?;
    Ok(status.code())
}

/// Split an argument string the way a POSIX shell would, quotes and escapes included
pub fn split_args(args: &str) -> Result<Vec<String>> {
    shell_words::split(args).with_context(|| format!("Failed to parse arguments {:?}", args))
}
