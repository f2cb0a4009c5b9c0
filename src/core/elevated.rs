//! Elevated pre/post steps run around the tracked process

use std::path::Path;

use tracing::{debug, error};

use super::log::LogSink;
use super::process::ProcessSpawner;
use super::settings::validate_path;

/// Runs an auxiliary program elevated and waits for it.
///
/// Best effort: nothing here ever fails the launch.
pub struct ElevatedProcessDelegate<'a> {
    spawner: &'a dyn ProcessSpawner,
    log: &'a dyn LogSink,
}

impl<'a> ElevatedProcessDelegate<'a> {
    pub fn new(spawner: &'a dyn ProcessSpawner, log: &'a dyn LogSink) -> Self {
        Self { spawner, log }
    }

    /// Run `path` with `args` and block until it exits.
    ///
    /// An empty path means no step is configured. An invalid path is logged
    /// and skipped.
    pub fn run(&self, path: &str, args: &str) {
        if path.is_empty() {
            debug!("No external process configured, skipping");
            return;
        }

        if !validate_path(path) {
            self.log.log(
                "WARNING",
                &format!("External process path is invalid: {} {}", path, args),
            );
            return;
        }

        self.log.log(
            "EXTERNAL",
            &format!("Attempting to run external process: {} {}", path, args),
        );

        match self.spawner.run_elevated(Path::new(path), args) {
            Ok(code) => {
                debug!("External process exited with {:?}", code);
                self.log
                    .log("EXTERNAL", "External process delegate returned, continuing...");
            }
            Err(e) => {
                error!("External process {} failed: {:?}", path, e);
                self.log.log(
                    "WARNING",
                    &format!(
                        "Process delegate failed on [{} {}], due to: {:#}",
                        path, args, e
                    ),
                );
            }
        }
    }
}
