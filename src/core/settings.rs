//! Launch settings management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persistence::KeyValueStore;

/// Store section holding paths, arguments, and the detected command line
pub const PATHS_SECTION: &str = "Paths";
/// Store section holding timings and switches
pub const OPTIONS_SECTION: &str = "Options";

/// Key the detected command line is persisted under
pub const DETECTED_COMMANDLINE_KEY: &str = "DetectedCommandline";

/// Where the launcher keeps its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub database: PathBuf,
}

impl AppPaths {
    /// Paths under `data_dir`, with files named after the running program
    pub fn new(data_dir: PathBuf, app_name: &str) -> Self {
        Self {
            log_file: data_dir.join(format!("{}_Log.txt", app_name)),
            database: data_dir.join(format!("{}.db", app_name)),
            data_dir,
        }
    }

    /// The per-user data directory, falling back to the working directory
    pub fn default_for(app_name: &str) -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("OverlayLauncher");
        Self::new(data_dir, app_name)
    }
}

/// Launcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSettings {
    // Paths
    /// Platform client that injects the overlay
    pub launcher_path: String,
    pub launcher_args: String,
    /// Game started through the platform client
    pub game_path: String,
    pub game_args: String,
    /// Run elevated before anything else starts
    pub pre_launch_exec: String,
    pub pre_launch_exec_args: String,
    /// Run elevated after the game exits
    pub post_game_exec: String,
    pub post_game_exec_args: String,
    /// Arguments the platform client was last seen running with
    pub detected_commandline: String,

    // Options
    /// Stabilization delay before inspecting a process tree
    pub proxy_timeout_secs: u64,
    /// Wait after starting the platform client before launching the game
    pub pre_game_launcher_wait_secs: u64,
    /// Wait after the game exits before the post-game step
    pub post_game_wait_secs: u64,
    /// Minimize the platform client once it is found
    pub minimize_launcher: bool,
    /// Kill the platform client after the game exits
    pub close_launcher: bool,
    /// Restart an already-running client whose arguments changed
    pub relaunch_launcher: bool,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            launcher_path: String::new(),
            launcher_args: String::new(),
            game_path: String::new(),
            game_args: String::new(),
            pre_launch_exec: String::new(),
            pre_launch_exec_args: String::new(),
            post_game_exec: String::new(),
            post_game_exec_args: String::new(),
            detected_commandline: String::new(),

            proxy_timeout_secs: 3,
            pre_game_launcher_wait_secs: 12,
            post_game_wait_secs: 7,
            minimize_launcher: true,
            close_launcher: false,
            relaunch_launcher: false,
        }
    }
}

impl LaunchSettings {
    /// Load settings from a store. Missing keys keep their defaults.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let mut settings = Self::default();

        for (key, field) in settings.path_fields_mut() {
            if let Some(value) = store.read(key, PATHS_SECTION)? {
                *field = value;
            }
        }

        read_option(store, "ProxyTimeout", &mut settings.proxy_timeout_secs)?;
        read_option(
            store,
            "PreGameLauncherWaitTime",
            &mut settings.pre_game_launcher_wait_secs,
        )?;
        read_option(store, "PostGameWaitTime", &mut settings.post_game_wait_secs)?;
        read_option(store, "MinimizeLauncher", &mut settings.minimize_launcher)?;
        read_option(store, "CloseLauncher", &mut settings.close_launcher)?;
        read_option(store, "ReLaunch", &mut settings.relaunch_launcher)?;

        settings.validate();
        Ok(settings)
    }

    /// Write every setting to a store
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        for (key, field) in self.path_fields() {
            store.write(key, field, PATHS_SECTION)?;
        }

        write_option(store, "ProxyTimeout", &self.proxy_timeout_secs)?;
        write_option(
            store,
            "PreGameLauncherWaitTime",
            &self.pre_game_launcher_wait_secs,
        )?;
        write_option(store, "PostGameWaitTime", &self.post_game_wait_secs)?;
        write_option(store, "MinimizeLauncher", &self.minimize_launcher)?;
        write_option(store, "CloseLauncher", &self.close_launcher)?;
        write_option(store, "ReLaunch", &self.relaunch_launcher)?;
        Ok(())
    }

    fn path_fields(&self) -> [(&'static str, &str); 9] {
        [
            ("LauncherPath", self.launcher_path.as_str()),
            ("LauncherArgs", self.launcher_args.as_str()),
            ("GamePath", self.game_path.as_str()),
            ("GameArgs", self.game_args.as_str()),
            ("PreLaunchExec", self.pre_launch_exec.as_str()),
            ("PreLaunchExecArgs", self.pre_launch_exec_args.as_str()),
            ("PostGameExec", self.post_game_exec.as_str()),
            ("PostGameExecArgs", self.post_game_exec_args.as_str()),
            (DETECTED_COMMANDLINE_KEY, self.detected_commandline.as_str()),
        ]
    }

    fn path_fields_mut(&mut self) -> [(&'static str, &mut String); 9] {
        [
            ("LauncherPath", &mut self.launcher_path),
            ("LauncherArgs", &mut self.launcher_args),
            ("GamePath", &mut self.game_path),
            ("GameArgs", &mut self.game_args),
            ("PreLaunchExec", &mut self.pre_launch_exec),
            ("PreLaunchExecArgs", &mut self.pre_launch_exec_args),
            ("PostGameExec", &mut self.post_game_exec),
            ("PostGameExecArgs", &mut self.post_game_exec_args),
            (DETECTED_COMMANDLINE_KEY, &mut self.detected_commandline),
        ]
    }

    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        self.proxy_timeout_secs = self.proxy_timeout_secs.min(60);
        self.pre_game_launcher_wait_secs = self.pre_game_launcher_wait_secs.min(300);
        self.post_game_wait_secs = self.post_game_wait_secs.min(300);
    }
}

fn read_option<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
    field: &mut T,
) -> Result<()> {
    if let Some(raw) = store.read(key, OPTIONS_SECTION)? {
        match serde_json::from_str(&raw) {
            Ok(value) => *field = value,
            Err(e) => warn!("Ignoring invalid value {:?} for {}: {}", raw, key, e),
        }
    }
    Ok(())
}

fn write_option<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).context(format!("Failed to encode {}", key))?;
    store.write(key, &raw, OPTIONS_SECTION)
}

/// Whether `path` names an existing, launchable file
pub fn validate_path(path: &str) -> bool {
    !path.trim().is_empty() && Path::new(path).is_file()
}
