//! Single-instance guard - One launcher per machine

use std::time::Duration;

use tracing::{info, warn};
use uuid::{uuid, Uuid};

use super::error::GuardError;
use super::log::LogSink;
use crate::platform::NamedMutex;

/// Build identity the machine-wide lock is named after
pub const APP_GUID: Uuid = uuid!("3c1a7f0e-5b8d-4e62-9a41-0d2f6c8b7e15");

/// How long to wait for a running instance to let go
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);

/// Machine-wide lock name for an application id
pub fn lock_name(app_id: &Uuid) -> String {
    #[cfg(windows)]
    {
        format!("Global\\{{{}}}", app_id)
    }
    #[cfg(not(windows))]
    {
        std::env::temp_dir()
            .join(format!("{{{}}}.lock", app_id))
            .to_string_lossy()
            .to_string()
    }
}

/// Held for the lifetime of the run; dropping it releases the lock.
#[derive(Debug)]
pub struct SingleInstanceGuard {
    name: String,
    _mutex: NamedMutex,
}

impl SingleInstanceGuard {
    /// Take the lock named `name`, waiting at most `timeout`.
    ///
    /// An abandoned lock is reported as [`GuardError::Abandoned`] and is not
    /// taken over.
    pub fn acquire(name: &str, timeout: Duration) -> Result<Self, GuardError> {
        let mutex = NamedMutex::acquire(name, timeout)?;
        info!("Acquired instance lock {}", name);
        Ok(Self {
            name: name.to_string(),
            _mutex: mutex,
        })
    }

    /// [`acquire`](Self::acquire), recording why the lock was refused
    pub fn acquire_logged(
        name: &str,
        timeout: Duration,
        log: &dyn LogSink,
    ) -> Result<Self, GuardError> {
        let result = Self::acquire(name, timeout);
        match &result {
            Ok(_) => {}
            Err(GuardError::Busy) => warn!("Another instance is already running"),
            Err(e @ GuardError::Abandoned) => log.log("MUTEX", &e.to_string()),
            Err(e @ GuardError::Os(_)) => log.log("MUTEX", &e.to_string()),
        }
        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SingleInstanceGuard {
    fn drop(&mut self) {
        info!("Releasing instance lock {}", self.name);
    }
}
