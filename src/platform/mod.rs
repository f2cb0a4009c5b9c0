//! Platform-specific implementations for Windows and Unix

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub use self::windows::NamedMutex;

#[cfg(unix)]
pub use self::unix::{split_args, NamedMutex};

use anyhow::Result;
use std::path::Path;

use crate::core::{InspectError, WindowHandle, WindowInfo};

/// Force kill a process
pub fn kill_process(pid: u32) -> Result<()> {
    #[cfg(windows)]
    {
        windows::kill_process(pid)
    }
    #[cfg(unix)]
    {
        unix::kill_process(pid)
    }
}

/// Decide whether an unreadable process is gone or just not ours to read
pub fn classify_unreadable(pid: u32) -> InspectError {
    #[cfg(windows)]
    {
        windows::classify_unreadable(pid)
    }
    #[cfg(unix)]
    {
        unix::classify_unreadable(pid)
    }
}

/// Main window of a process, if it has one
pub fn main_window(pid: u32) -> Option<WindowInfo> {
    #[cfg(windows)]
    {
        windows::main_window(pid)
    }
    #[cfg(unix)]
    {
        unix::main_window(pid)
    }
}

/// Restore and activate a window
pub fn bring_to_front(window: WindowHandle) {
    #[cfg(windows)]
    {
        windows::bring_to_front(window)
    }
    #[cfg(unix)]
    {
        unix::bring_to_front(window)
    }
}

/// Minimize a window
pub fn minimize(window: WindowHandle) {
    #[cfg(windows)]
    {
        windows::minimize(window)
    }
    #[cfg(unix)]
    {
        unix::minimize(window)
    }
}

/// Start a program with elevation and block until it exits
pub fn run_elevated_and_wait(path: &Path, args: &str) -> Result<Option<i32>> {
    #[cfg(windows)]
    {
        windows::run_elevated_and_wait(path, args)
    }
    #[cfg(unix)]
    {
        unix::run_elevated_and_wait(path, args)
    }
}
