//! Core module - Process tree resolution, fingerprints, guards, and the launch session

mod elevated;
mod error;
pub mod fingerprint;
mod focus;
mod guard;
mod launcher;
pub mod log;
mod monitor;
mod process;
mod resolver;
pub mod settings;

#[cfg(test)]
pub mod testing;

pub use elevated::ElevatedProcessDelegate;
pub use error::{GuardError, InspectError};
pub use focus::NativeWindowManager;
pub use guard::{lock_name, SingleInstanceGuard, ACQUIRE_TIMEOUT, APP_GUID};
pub use launcher::{LaunchSession, SessionReport};
pub use log::{FileLog, LogSink};
pub use monitor::SystemInspector;
pub use process::{
    ProcessHandle, ProcessInspector, ProcessSpawner, ProcessTree, SystemSpawner, WindowHandle,
    WindowInfo, WindowManager,
};
pub use resolver::ProcessTreeResolver;
pub use settings::{AppPaths, LaunchSettings};
