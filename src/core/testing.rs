//! In-memory fakes of the OS capabilities, for tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::error::InspectError;
use super::log::LogSink;
use super::process::{
    ProcessInspector, ProcessSpawner, WindowHandle, WindowInfo, WindowManager,
};
use crate::persistence::KeyValueStore;

#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: u32,
    pub name: String,
    pub alive: bool,
    pub window: Option<WindowInfo>,
    pub command_line: Result<String, InspectError>,
}

impl FakeProcess {
    pub fn live(pid: u32) -> Self {
        Self {
            pid,
            name: String::new(),
            alive: true,
            window: None,
            command_line: Ok(String::new()),
        }
    }

    pub fn dead(pid: u32) -> Self {
        Self {
            alive: false,
            command_line: Err(InspectError::Exited(pid)),
            ..Self::live(pid)
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_window(mut self, handle: isize, title: &str) -> Self {
        self.window = Some(WindowInfo {
            handle: WindowHandle(handle),
            title: title.to_string(),
        });
        self
    }

    pub fn with_command_line(mut self, command_line: &str) -> Self {
        self.command_line = Ok(command_line.to_string());
        self
    }

    pub fn denied(mut self) -> Self {
        self.command_line = Err(InspectError::AccessDenied(self.pid));
        self
    }
}

/// Process table held in memory, in discovery order
#[derive(Debug, Default)]
pub struct FakeInspector {
    processes: RefCell<Vec<FakeProcess>>,
    /// Liveness checks left before a pid is reported dead
    exit_after: RefCell<HashMap<u32, usize>>,
}

impl FakeInspector {
    pub fn new(processes: Vec<FakeProcess>) -> Self {
        Self {
            processes: RefCell::new(processes),
            exit_after: RefCell::new(HashMap::new()),
        }
    }

    pub fn add(&self, process: FakeProcess) {
        self.processes.borrow_mut().push(process);
    }

    /// Report `pid` dead once it has been polled `checks` times
    pub fn exit_after(&self, pid: u32, checks: usize) {
        self.exit_after.borrow_mut().insert(pid, checks);
    }

    pub fn set_alive(&self, pid: u32, alive: bool) {
        for p in self.processes.borrow_mut().iter_mut() {
            if p.pid == pid {
                p.alive = alive;
            }
        }
    }

    fn get(&self, pid: u32) -> Option<FakeProcess> {
        self.processes
            .borrow()
            .iter()
            .find(|p| p.pid == pid)
            .cloned()
    }
}

impl ProcessInspector for FakeInspector {
    fn is_alive(&self, pid: u32) -> bool {
        let countdown = self.exit_after.borrow().get(&pid).copied();
        match countdown {
            Some(0) => {
                self.set_alive(pid, false);
                self.exit_after.borrow_mut().remove(&pid);
            }
            Some(n) => {
                self.exit_after.borrow_mut().insert(pid, n - 1);
            }
            None => {}
        }
        self.get(pid).map(|p| p.alive).unwrap_or(false)
    }

    fn main_window(&self, pid: u32) -> Option<WindowInfo> {
        self.get(pid).filter(|p| p.alive).and_then(|p| p.window)
    }

    fn command_line(&self, pid: u32) -> Result<String, InspectError> {
        match self.get(pid) {
            Some(p) if p.alive => p.command_line,
            _ => Err(InspectError::Exited(pid)),
        }
    }

    fn find_by_name(&self, name: &str) -> Vec<u32> {
        self.processes
            .borrow()
            .iter()
            .filter(|p| p.alive && p.name.eq_ignore_ascii_case(name))
            .map(|p| p.pid)
            .collect()
    }

    fn kill(&self, pid: u32) -> Result<()> {
        if self.get(pid).map(|p| p.alive).unwrap_or(false) {
            self.set_alive(pid, false);
            Ok(())
        } else {
            anyhow::bail!("process {} is not running", pid)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Front(WindowHandle),
    Minimize(WindowHandle),
}

#[derive(Debug, Default)]
pub struct RecordingWindows {
    pub requests: RefCell<Vec<WindowRequest>>,
}

impl WindowManager for RecordingWindows {
    fn bring_to_front(&self, window: WindowHandle) {
        self.requests.borrow_mut().push(WindowRequest::Front(window));
    }

    fn minimize(&self, window: WindowHandle) {
        self.requests
            .borrow_mut()
            .push(WindowRequest::Minimize(window));
    }
}

/// Spawner that records requests and registers spawned pids with an inspector
pub struct RecordingSpawner<'a> {
    inspector: &'a FakeInspector,
    next_pid: RefCell<u32>,
    /// Extra processes that appear alongside each spawn, keyed by process name
    children: RefCell<HashMap<String, Vec<FakeProcess>>>,
    pub spawned: RefCell<Vec<(PathBuf, String)>>,
    pub elevated: RefCell<Vec<(PathBuf, String)>>,
    pub fail_elevated: bool,
}

impl<'a> RecordingSpawner<'a> {
    pub fn new(inspector: &'a FakeInspector) -> Self {
        Self {
            inspector,
            next_pid: RefCell::new(1000),
            children: RefCell::new(HashMap::new()),
            spawned: RefCell::new(Vec::new()),
            elevated: RefCell::new(Vec::new()),
            fail_elevated: false,
        }
    }

    /// Processes that show up when a program with this name is spawned
    pub fn on_spawn(&self, name: &str, processes: Vec<FakeProcess>) {
        self.children
            .borrow_mut()
            .insert(name.to_string(), processes);
    }
}

impl ProcessSpawner for RecordingSpawner<'_> {
    fn spawn(&self, path: &Path, args: &str) -> Result<u32> {
        self.spawned
            .borrow_mut()
            .push((path.to_path_buf(), args.to_string()));

        let name = super::process::process_name(path);
        let pid = {
            let mut next = self.next_pid.borrow_mut();
            *next += 1;
            *next
        };
        match self.children.borrow_mut().remove(&name) {
            Some(processes) => {
                for p in processes {
                    self.inspector.add(p);
                }
            }
            None => self.inspector.add(FakeProcess::live(pid).named(&name)),
        }
        Ok(pid)
    }

    fn run_elevated(&self, path: &Path, args: &str) -> Result<Option<i32>> {
        self.elevated
            .borrow_mut()
            .push((path.to_path_buf(), args.to_string()));
        if self.fail_elevated {
            anyhow::bail!("The operation was canceled by the user");
        }
        Ok(Some(0))
    }
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    pub entries: RefCell<Vec<(String, String)>>,
}

impl MemoryLog {
    pub fn causes(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn contains(&self, cause: &str, fragment: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(c, m)| c == cause && m.contains(fragment))
    }
}

impl LogSink for MemoryLog {
    fn log(&self, cause: &str, message: &str) {
        self.entries
            .borrow_mut()
            .push((cause.to_string(), message.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub values: RefCell<HashMap<(String, String), String>>,
    pub writes: RefCell<usize>,
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str, section: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .borrow()
            .get(&(section.to_string(), key.to_string()))
            .cloned())
    }

    fn write(&self, key: &str, value: &str, section: &str) -> Result<()> {
        *self.writes.borrow_mut() += 1;
        self.values
            .borrow_mut()
            .insert((section.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}
