//! OverlayLauncher - Start a platform client, launch a game through it, and track the game
//!
//! Picks the real game process out of whatever tree the client spawns, avoids
//! restarting a client that is already running with the same arguments, and
//! runs optional elevated steps before and after the game.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![allow(dead_code)] // Some query helpers are only exercised by tests

mod core;
mod persistence;
mod platform;

use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::{
    lock_name, AppPaths, FileLog, GuardError, LaunchSession, LaunchSettings, LogSink,
    NativeWindowManager, SingleInstanceGuard, SystemInspector, SystemSpawner, ACQUIRE_TIMEOUT,
    APP_GUID,
};
use crate::persistence::Database;

/// Application name constant
pub const APP_NAME: &str = "OverlayLauncher";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    // Initialize logging
    init_logging();

    let paths = AppPaths::default_for(APP_NAME);
    let log = FileLog::new(&paths.log_file);

    // Nothing else may touch disk until we own the instance lock
    let _guard = match SingleInstanceGuard::acquire_logged(&lock_name(&APP_GUID), ACQUIRE_TIMEOUT, &log)
    {
        Ok(guard) => guard,
        Err(GuardError::Busy) | Err(GuardError::Abandoned) => return ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&paths, &log) {
        Ok(()) => {
            info!("{} shutting down", APP_NAME);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Launch failed: {:#}", e);
            log.log("ERROR", &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(paths: &AppPaths, log: &FileLog) -> Result<()> {
    // Overwrite the log from the previous run
    log.truncate()?;
    log.log("NOTE", &format!("{} v{} started", APP_NAME, APP_VERSION));

    let db = Database::open(&paths.database)?;
    db.initialize()?;

    let mut settings = LaunchSettings::load(&db)?;
    if settings.launcher_path.is_empty() && settings.game_path.is_empty() {
        // Leave a full set of keys behind for the user to fill in
        settings.save(&db)?;
        log.log(
            "WARNING",
            &format!(
                "Nothing to launch, set LauncherPath or GamePath in {}",
                paths.database.display()
            ),
        );
        return Ok(());
    }

    let inspector = SystemInspector::new();
    let windows = NativeWindowManager;
    let spawner = SystemSpawner;

    let report = LaunchSession::new(&mut settings, &db, &inspector, &windows, &spawner, log).run();
    info!(
        launcher = ?report.launcher_pid,
        game = ?report.game_pid,
        reused = report.launcher_reused,
        "Launch session finished"
    );
    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("overlay_launcher=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
