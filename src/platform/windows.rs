//! Windows-specific process, window, and lock plumbing

use anyhow::{Context, Result};
use std::mem;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    CloseHandle, BOOL, FALSE, HANDLE, HWND, LPARAM, WAIT_ABANDONED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows::Win32::System::Threading::*;
use windows::Win32::UI::Shell::{ShellExecuteExW, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW};
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::core::{GuardError, InspectError, WindowHandle, WindowInfo};

/// STILL_ACTIVE exit code
const STILL_ACTIVE: u32 = 259;

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut std::ffi::c_void)
}

/// Machine-wide named mutex, released on drop
pub struct NamedMutex {
    handle: HANDLE,
}

impl std::fmt::Debug for NamedMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedMutex").finish_non_exhaustive()
    }
}

impl NamedMutex {
    pub fn acquire(name: &str, timeout: Duration) -> Result<Self, GuardError> {
        let name = wide(name);
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);

        unsafe {
            let handle = CreateMutexW(None, FALSE, PCWSTR::from_raw(name.as_ptr()))
                .map_err(|e| GuardError::Os(e.to_string()))?;

            let wait = WaitForSingleObject(handle, millis);
            if wait == WAIT_OBJECT_0 {
                Ok(Self { handle })
            } else if wait == WAIT_ABANDONED {
                // We own it now, but the previous state is unknown. Hand it back.
                let _ = ReleaseMutex(handle);
                let _ = CloseHandle(handle);
                Err(GuardError::Abandoned)
            } else if wait == WAIT_TIMEOUT {
                let _ = CloseHandle(handle);
                Err(GuardError::Busy)
            } else {
                let error = windows::core::Error::from_win32();
                let _ = CloseHandle(handle);
                Err(GuardError::Os(error.to_string()))
            }
        }
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseMutex(self.handle);
            let _ = CloseHandle(self.handle);
        }
    }
}

/// Force kill a process
pub fn kill_process(pid: u32) -> Result<()> {
    unsafe {
        let handle =
            OpenProcess(PROCESS_TERMINATE, FALSE, pid).context("Failed to open process")?;

        let result = TerminateProcess(handle, 1);
        CloseHandle(handle)?;

        if result.is_ok() {
            Ok(())
        } else {
            anyhow::bail!("Failed to kill process")
        }
    }
}

/// Check if a process is running
pub fn is_process_running(pid: u32) -> bool {
    unsafe {
        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid) {
            Ok(h) => h,
            Err(_) => return false,
        };

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle).ok();

        result.is_ok() && exit_code == STILL_ACTIVE
    }
}

/// Why a live-looking process yielded no command line
pub fn classify_unreadable(pid: u32) -> InspectError {
    if is_process_running(pid) {
        InspectError::AccessDenied(pid)
    } else {
        InspectError::Exited(pid)
    }
}

struct WindowSearch {
    pid: u32,
    found: Vec<HWND>,
}

unsafe extern "system" fn collect_windows(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut WindowSearch);

    let mut window_pid: u32 = 0;
    GetWindowThreadProcessId(hwnd, Some(&mut window_pid));

    if window_pid == search.pid && IsWindowVisible(hwnd).as_bool() {
        search.found.push(hwnd);
    }
    BOOL::from(true)
}

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
    }
}

/// The main window of a process: its first visible top-level window,
/// preferring one that already has a caption
pub fn main_window(pid: u32) -> Option<WindowInfo> {
    let mut search = WindowSearch {
        pid,
        found: Vec::new(),
    };

    unsafe {
        let _ = EnumWindows(
            Some(collect_windows),
            LPARAM(&mut search as *mut WindowSearch as isize),
        );
    }

    let windows: Vec<WindowInfo> = search
        .found
        .into_iter()
        .map(|hwnd| WindowInfo {
            handle: WindowHandle(hwnd.0 as isize),
            title: window_title(hwnd),
        })
        .collect();

    windows
        .iter()
        .find(|w| !w.title.is_empty())
        .or_else(|| windows.first())
        .cloned()
}

/// Restore and activate a window
pub fn bring_to_front(window: WindowHandle) {
    unsafe {
        let hwnd = hwnd(window);
        let _ = ShowWindowAsync(hwnd, SW_SHOWDEFAULT);
        let _ = ShowWindowAsync(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);
    }
    debug!("Requested foreground for window {:?}", window);
}

/// Minimize a window
pub fn minimize(window: WindowHandle) {
    unsafe {
        let _ = ShowWindowAsync(hwnd(window), SW_MINIMIZE);
    }
    debug!("Requested minimize for window {:?}", window);
}

/// Run a program through the shell with the `runas` verb and wait for it
pub fn run_elevated_and_wait(path: &Path, args: &str) -> Result<Option<i32>> {
    let verb = wide("runas");
    let file = wide(&path.to_string_lossy());
    let parameters = wide(args);
    let directory = wide(
        &path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
    );

    let mut info = SHELLEXECUTEINFOW {
        cbSize: mem::size_of::<SHELLEXECUTEINFOW>() as u32,
        fMask: SEE_MASK_NOCLOSEPROCESS,
        lpVerb: PCWSTR::from_raw(verb.as_ptr()),
        lpFile: PCWSTR::from_raw(file.as_ptr()),
        lpParameters: PCWSTR::from_raw(parameters.as_ptr()),
        lpDirectory: PCWSTR::from_raw(directory.as_ptr()),
        nShow: SW_SHOWNORMAL.0,
        ..Default::default()
    };

    unsafe {
        ShellExecuteExW(&mut info).context("ShellExecuteExW failed")?;

        if info.hProcess.is_invalid() {
            // Handed off to an already-running process, nothing to wait on
            return Ok(None);
        }

        WaitForSingleObject(info.hProcess, INFINITE);

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(info.hProcess, &mut exit_code);
        let _ = CloseHandle(info.hProcess);

        Ok(result.ok().map(|_| exit_code as i32))
    }
}
