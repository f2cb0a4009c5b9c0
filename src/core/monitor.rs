//! Process monitoring - Live process queries backed by sysinfo

use std::sync::Mutex;

use anyhow::Result;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::trace;

use super::error::InspectError;
use super::process::{ProcessInspector, WindowInfo};
use crate::platform;

/// Queries the OS process table. Every call refreshes what it reads.
pub struct SystemInspector {
    system: Mutex<System>,
}

impl SystemInspector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn with_process<T>(
        &self,
        pid: u32,
        refresh: ProcessRefreshKind,
        f: impl FnOnce(&Process) -> T,
    ) -> Option<T> {
        let mut system = self.system.lock().ok()?;
        let pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);
        system.process(pid).map(f)
    }
}

impl Default for SystemInspector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_live(process: &Process) -> bool {
    !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Whether a process's executable name is `name`, with or without `.exe`
pub fn name_matches(process_name: &str, name: &str) -> bool {
    let trimmed = match process_name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("exe") => stem,
        _ => process_name,
    };
    trimmed.eq_ignore_ascii_case(name) || process_name.eq_ignore_ascii_case(name)
}

/// Rebuild a command line, quoting arguments that contain whitespace
pub fn join_command_line(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.chars().any(char::is_whitespace) && !arg.starts_with('"') {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl ProcessInspector for SystemInspector {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        self.with_process(pid, ProcessRefreshKind::new(), is_live)
            .unwrap_or(false)
    }

    fn main_window(&self, pid: u32) -> Option<WindowInfo> {
        platform::main_window(pid)
    }

    fn command_line(&self, pid: u32) -> Result<String, InspectError> {
        let args = self.with_process(
            pid,
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
            |p| {
                is_live(p).then(|| {
                    p.cmd()
                        .iter()
                        .map(|s| s.to_string_lossy().to_string())
                        .collect::<Vec<_>>()
                })
            },
        );

        match args {
            None | Some(None) => Err(InspectError::Exited(pid)),
            // The OS hides the command line of processes we may not read
            Some(Some(args)) if args.is_empty() => Err(platform::classify_unreadable(pid)),
            Some(Some(args)) => Ok(join_command_line(&args)),
        }
    }

    fn find_by_name(&self, name: &str) -> Vec<u32> {
        let Ok(mut system) = self.system.lock() else {
            return Vec::new();
        };
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let mut matches: Vec<(u64, u32)> = system
            .processes()
            .iter()
            .filter(|(_, p)| is_live(p))
            .filter(|(_, p)| {
                name_matches(&p.name().to_string_lossy(), name)
                    || p.exe()
                        .and_then(|e| e.file_stem())
                        .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(name))
                        .unwrap_or(false)
            })
            .map(|(pid, p)| (p.start_time(), pid.as_u32()))
            .collect();

        // Discovery order: oldest first
        matches.sort_unstable();
        trace!("Found {} process(es) named {}", matches.len(), name);
        matches.into_iter().map(|(_, pid)| pid).collect()
    }

    fn kill(&self, pid: u32) -> Result<()> {
        platform::kill_process(pid)
    }
}
