//! Launch session - Runs the pre step, platform client, game, and post step in order

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use super::elevated::ElevatedProcessDelegate;
use super::fingerprint;
use super::log::LogSink;
use super::process::{
    is_running, kill_tree_by_name, process_name, ProcessHandle, ProcessInspector, ProcessSpawner,
    ProcessTree, WindowManager,
};
use super::resolver::ProcessTreeResolver;
use super::settings::LaunchSettings;
use crate::persistence::KeyValueStore;

/// How often the tracked game is checked for exit
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a session ended up tracking
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub launcher_pid: Option<u32>,
    /// The platform client was already running and kept
    pub launcher_reused: bool,
    pub game_pid: Option<u32>,
}

/// One launch, from pre-launch step to post-game step
pub struct LaunchSession<'a> {
    settings: &'a mut LaunchSettings,
    store: &'a dyn KeyValueStore,
    inspector: &'a dyn ProcessInspector,
    windows: &'a dyn WindowManager,
    spawner: &'a dyn ProcessSpawner,
    log: &'a dyn LogSink,
    poll_interval: Duration,
}

impl<'a> LaunchSession<'a> {
    pub fn new(
        settings: &'a mut LaunchSettings,
        store: &'a dyn KeyValueStore,
        inspector: &'a dyn ProcessInspector,
        windows: &'a dyn WindowManager,
        spawner: &'a dyn ProcessSpawner,
        log: &'a dyn LogSink,
    ) -> Self {
        Self {
            settings,
            store,
            inspector,
            windows,
            spawner,
            log,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn run(&mut self) -> SessionReport {
        let delegate = ElevatedProcessDelegate::new(self.spawner, self.log);
        let mut report = SessionReport::default();

        delegate.run(
            &self.settings.pre_launch_exec,
            &self.settings.pre_launch_exec_args,
        );

        if !self.settings.launcher_path.is_empty() {
            self.launcher_phase(&mut report);
        }

        if !self.settings.game_path.is_empty() {
            self.game_phase(&mut report);
        }

        if self.settings.close_launcher && !self.settings.launcher_path.is_empty() {
            let name = process_name(Path::new(&self.settings.launcher_path));
            let killed = kill_tree_by_name(self.inspector, &name);
            self.log.log(
                "NOTE",
                &format!("Closed {} launcher process(es) named {}", killed, name),
            );
        }

        thread::sleep(secs(self.settings.post_game_wait_secs));
        delegate.run(
            &self.settings.post_game_exec,
            &self.settings.post_game_exec_args,
        );

        report
    }

    fn stabilization(&self) -> Duration {
        secs(self.settings.proxy_timeout_secs)
    }

    fn launcher_phase(&mut self, report: &mut SessionReport) {
        let path = self.settings.launcher_path.clone();
        let name = process_name(Path::new(&path));
        let resolver = ProcessTreeResolver::new(self.inspector, self.log);

        let pid = if is_running(self.inspector, &name) {
            let tree = ProcessTree::by_name(self.inspector, &name);
            let existing = resolver.resolve(&tree, self.stabilization());
            let current = existing
                .and_then(|pid| fingerprint::extract(self.inspector, pid, &path, self.log));
            let unchanged = current
                .as_deref()
                .map(|c| fingerprint::commandlines_match(&self.settings.detected_commandline, c))
                .unwrap_or(false);

            if self.settings.relaunch_launcher && !unchanged {
                self.log.log(
                    "NOTE",
                    "Launcher is running with different arguments, relaunching",
                );
                kill_tree_by_name(self.inspector, &name);
                self.start_and_resolve(&path, &name, &resolver)
            } else {
                if existing.is_some() {
                    self.log.log("NOTE", "Launcher is already running, reusing it");
                    report.launcher_reused = true;
                }
                existing
            }
        } else {
            self.start_and_resolve(&path, &name, &resolver)
        };

        let Some(pid) = pid else {
            return;
        };
        report.launcher_pid = Some(pid);

        if let Some(command_line) = fingerprint::extract(self.inspector, pid, &path, self.log) {
            if let Err(e) = fingerprint::store_commandline(self.settings, self.store, &command_line)
            {
                error!("Failed to persist detected command line: {:#}", e);
            }
        }

        if self.settings.minimize_launcher {
            if let Some(window) = ProcessHandle::new(pid).main_window(self.inspector) {
                self.windows.minimize(window.handle);
            }
        }
    }

    fn start_and_resolve(
        &self,
        path: &str,
        name: &str,
        resolver: &ProcessTreeResolver<'_>,
    ) -> Option<u32> {
        if let Err(e) = self
            .spawner
            .spawn(Path::new(path), &self.settings.launcher_args)
        {
            self.log
                .log("WARNING", &format!("Could not start launcher: {:#}", e));
            return None;
        }
        thread::sleep(secs(self.settings.pre_game_launcher_wait_secs));

        let tree = ProcessTree::by_name(self.inspector, name);
        resolver.resolve(&tree, self.stabilization())
    }

    fn game_phase(&mut self, report: &mut SessionReport) {
        let path = self.settings.game_path.clone();
        let name = process_name(Path::new(&path));

        if let Err(e) = self.spawner.spawn(Path::new(&path), &self.settings.game_args) {
            self.log
                .log("WARNING", &format!("Could not start game: {:#}", e));
            return;
        }

        let tree = ProcessTree::by_name(self.inspector, &name);
        let resolver = ProcessTreeResolver::new(self.inspector, self.log);
        let Some(pid) = resolver.resolve(&tree, self.stabilization()) else {
            self.log
                .log("WARNING", "Could not find the game process, nothing to track");
            return;
        };
        report.game_pid = Some(pid);

        let game = ProcessHandle::new(pid);
        if let Some(window) = game.main_window(self.inspector) {
            self.windows.bring_to_front(window.handle);
        }

        self.log.log("NOTE", &format!("Tracking game process {}", pid));
        while game.is_alive(self.inspector) {
            thread::sleep(self.poll_interval);
        }
        info!("Game process {} exited", pid);
        self.log.log("NOTE", "Game exited, cleaning up");
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}
