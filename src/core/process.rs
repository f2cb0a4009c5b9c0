//! Process model - Volatile views of OS processes and the capabilities used to query them

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::error::InspectError;

/// Opaque OS window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// The main window of a process as last observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    /// Window caption, may be empty
    pub title: String,
}

/// Read-only access to OS process state.
///
/// Every call goes back to the OS; nothing is cached between calls.
pub trait ProcessInspector {
    /// Whether the process is currently alive
    fn is_alive(&self, pid: u32) -> bool;

    /// The main window of the process, if it has one yet
    fn main_window(&self, pid: u32) -> Option<WindowInfo>;

    /// Full command line of a live process
    fn command_line(&self, pid: u32) -> Result<String, InspectError>;

    /// Pids of processes whose executable matches `name`, in discovery order
    fn find_by_name(&self, name: &str) -> Vec<u32>;

    /// Forcefully terminate a process
    fn kill(&self, pid: u32) -> Result<()>;
}

/// Requests to the OS window manager. Fire-and-forget.
pub trait WindowManager {
    /// Restore (if minimized) and activate a window
    fn bring_to_front(&self, window: WindowHandle);

    /// Minimize a window
    fn minimize(&self, window: WindowHandle);
}

/// Starts new processes
pub trait ProcessSpawner {
    /// Start a process detached from this one and return its pid
    fn spawn(&self, path: &Path, args: &str) -> Result<u32>;

    /// Start a process with elevation and block until it exits.
    /// Returns the exit code when the OS reports one.
    fn run_elevated(&self, path: &Path, args: &str) -> Result<Option<i32>>;
}

/// A single OS process. Never owned; it may vanish between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: u32,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }

    /// Re-query liveness
    pub fn is_alive(&self, inspector: &dyn ProcessInspector) -> bool {
        self.pid > 0 && inspector.is_alive(self.pid)
    }

    pub fn main_window(&self, inspector: &dyn ProcessInspector) -> Option<WindowInfo> {
        inspector.main_window(self.pid)
    }
}

/// Snapshot of related processes in discovery order; the last member is the
/// most recently spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessTree {
    members: Vec<ProcessHandle>,
}

impl ProcessTree {
    pub fn new(members: Vec<ProcessHandle>) -> Self {
        Self { members }
    }

    /// Snapshot every process running under `name`
    pub fn by_name(inspector: &dyn ProcessInspector, name: &str) -> Self {
        Self::from_pids(inspector.find_by_name(name))
    }

    pub fn from_pids(pids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            members: pids.into_iter().map(ProcessHandle::new).collect(),
        }
    }

    pub fn members(&self) -> &[ProcessHandle] {
        &self.members
    }

    pub fn first(&self) -> Option<&ProcessHandle> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Whether any process named `name` is alive
pub fn is_running(inspector: &dyn ProcessInspector, name: &str) -> bool {
    inspector
        .find_by_name(name)
        .into_iter()
        .any(|pid| inspector.is_alive(pid))
}

/// Whether `pid` is alive
pub fn is_running_pid(inspector: &dyn ProcessInspector, pid: u32) -> bool {
    ProcessHandle::new(pid).is_alive(inspector)
}

/// Pid of the first process named `name`
pub fn running_pid_by_name(inspector: &dyn ProcessInspector, name: &str) -> Option<u32> {
    ProcessTree::by_name(inspector, name).first().map(|p| p.pid)
}

/// Kill every process named `name`. Per-process failures are logged and skipped.
pub fn kill_tree_by_name(inspector: &dyn ProcessInspector, name: &str) -> usize {
    let tree = ProcessTree::by_name(inspector, name);
    let mut killed = 0;
    for member in tree.members() {
        match inspector.kill(member.pid) {
            Ok(()) => killed += 1,
            Err(e) => debug!("Could not kill {} (PID {}): {}", name, member.pid, e),
        }
    }
    if killed > 0 {
        info!("Killed {} process(es) named {}", killed, name);
    }
    killed
}

/// Executable name used to look a program up in the process list
pub fn process_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Spawns real OS processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, path: &Path, args: &str) -> Result<u32> {
        info!("Spawning {:?} {}", path, args);

        if !path.exists() {
            anyhow::bail!("Executable not found: {}", path.display());
        }

        let mut cmd = Command::new(path);

        if let Some(parent) = path.parent() {
            cmd.current_dir(parent);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            // Hand the raw argument string through untouched
            if !args.is_empty() {
                cmd.raw_arg(args);
            }
            cmd.creation_flags(0x00000008); // DETACHED_PROCESS
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.args(crate::platform::split_args(args)?);
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn process")?;

        let pid = child.id();
        info!("Spawned process with PID {}", pid);
        Ok(pid)
    }

    fn run_elevated(&self, path: &Path, args: &str) -> Result<Option<i32>> {
        crate::platform::run_elevated_and_wait(path, args)
    }
}
