//! Process tree resolution - Picks the one process in a freshly spawned tree worth tracking

use std::thread;
use std::time::Duration;

use tracing::debug;

use super::log::LogSink;
use super::process::{ProcessInspector, ProcessTree};

/// Decides which member of a process tree is the real launcher or game.
///
/// A member with a titled main window is interactive and wins. In a tree of
/// three or more, a windowless member means a headless helper, and the
/// originally spawned first member is tracked instead.
pub struct ProcessTreeResolver<'a> {
    inspector: &'a dyn ProcessInspector,
    log: &'a dyn LogSink,
}

impl<'a> ProcessTreeResolver<'a> {
    pub fn new(inspector: &'a dyn ProcessInspector, log: &'a dyn LogSink) -> Self {
        Self { inspector, log }
    }

    /// Wait `stabilization` for children to settle, then pick a pid to track
    pub fn resolve(&self, tree: &ProcessTree, stabilization: Duration) -> Option<u32> {
        thread::sleep(stabilization);

        let resolved = self.pick(tree);
        match resolved {
            Some(pid) => debug!("Resolved {} process(es) to PID {}", tree.len(), pid),
            None => self.log.log(
                "WARNING",
                &format!(
                    "Could not find a trackable process among {} candidate(s)",
                    tree.len()
                ),
            ),
        }
        resolved
    }

    fn pick(&self, tree: &ProcessTree) -> Option<u32> {
        let members = tree.members();

        match members {
            [] => None,
            [only] => only.is_alive(self.inspector).then_some(only.pid),
            [root, .., _newest] => {
                // The newest member is never scanned
                for member in &members[..members.len() - 1] {
                    if !member.is_alive(self.inspector) {
                        continue;
                    }

                    let window = member.main_window(self.inspector);
                    if let Some(info) = &window {
                        if !info.title.is_empty() {
                            return Some(member.pid);
                        }
                    }

                    if members.len() > 2 && window.is_none() && root.is_alive(self.inspector) {
                        debug!("PID {} looks headless, tracking PID {}", member.pid, root.pid);
                        return Some(root.pid);
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{FakeInspector, FakeProcess, MemoryLog};
    use std::time::Instant;

    fn resolve(processes: Vec<FakeProcess>) -> Option<u32> {
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        let inspector = FakeInspector::new(processes);
        let log = MemoryLog::default();
        ProcessTreeResolver::new(&inspector, &log)
            .resolve(&ProcessTree::from_pids(pids), Duration::ZERO)
    }

    #[test]
    fn single_live_member_is_tracked() {
        assert_eq!(
            resolve(vec![FakeProcess::live(10).with_window(0x5, "Launcher")]),
            Some(10)
        );
        assert_eq!(resolve(vec![FakeProcess::live(11)]), Some(11));
    }

    #[test]
    fn single_dead_member_gives_none() {
        assert_eq!(resolve(vec![FakeProcess::dead(10)]), None);
    }

    #[test]
    fn empty_tree_gives_none_and_logs() {
        let inspector = FakeInspector::default();
        let log = MemoryLog::default();
        let resolver = ProcessTreeResolver::new(&inspector, &log);

        let started = Instant::now();
        let pid = resolver.resolve(&ProcessTree::default(), Duration::from_millis(50));

        assert_eq!(pid, None);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(log.causes(), vec!["WARNING"]);
    }

    #[test]
    fn first_titled_window_wins() {
        let pid = resolve(vec![
            FakeProcess::live(1).with_window(0x10, ""),
            FakeProcess::live(2).with_window(0x20, "Origin"),
            FakeProcess::live(3).with_window(0x30, "Battlefield"),
            FakeProcess::live(4),
        ]);
        assert_eq!(pid, Some(2));
    }

    #[test]
    fn headless_members_fall_back_to_root() {
        let pid = resolve(vec![
            FakeProcess::live(100),
            FakeProcess::live(200),
            FakeProcess::live(300),
        ]);
        assert_eq!(pid, Some(100));
    }

    #[test]
    fn dead_members_are_skipped() {
        let pid = resolve(vec![
            FakeProcess::dead(1).with_window(0x10, "Stale"),
            FakeProcess::live(2).with_window(0x20, "Game"),
            FakeProcess::live(3),
        ]);
        assert_eq!(pid, Some(2));
    }

    #[test]
    fn headless_fallback_needs_live_root() {
        let pid = resolve(vec![
            FakeProcess::dead(1),
            FakeProcess::live(2),
            FakeProcess::live(3),
        ]);
        assert_eq!(pid, None);
    }

    #[test]
    fn pair_without_window_gives_none() {
        // Two members: the headless fallback does not apply and the newest is not scanned
        let pid = resolve(vec![
            FakeProcess::live(1),
            FakeProcess::live(2).with_window(0x20, "Game"),
        ]);
        assert_eq!(pid, None);
    }

    #[test]
    fn pair_with_titled_parent_tracks_parent() {
        let pid = resolve(vec![
            FakeProcess::live(1).with_window(0x10, "Launcher"),
            FakeProcess::live(2),
        ]);
        assert_eq!(pid, Some(1));
    }

    #[test]
    fn untitled_window_is_neither_target_nor_headless() {
        let pid = resolve(vec![
            FakeProcess::live(1),
            FakeProcess::live(2).with_window(0x20, ""),
            FakeProcess::live(3),
        ]);
        // Member 0 is windowless, so the root fallback fires on the first scan
        assert_eq!(pid, Some(1));

        let pid = resolve(vec![
            FakeProcess::live(1).with_window(0x10, ""),
            FakeProcess::live(2).with_window(0x20, ""),
            FakeProcess::live(3).with_window(0x30, "Game"),
        ]);
        assert_eq!(pid, None);
    }

    #[test]
    fn members_that_exit_during_scan_are_skipped() {
        let inspector = FakeInspector::new(vec![
            FakeProcess::live(1).with_window(0x10, "Launcher"),
            FakeProcess::live(2).with_window(0x20, "Game"),
            FakeProcess::live(3),
        ]);
        inspector.set_alive(1, false);
        let log = MemoryLog::default();

        let pid = ProcessTreeResolver::new(&inspector, &log)
            .resolve(&ProcessTree::from_pids([1, 2, 3]), Duration::ZERO);
        assert_eq!(pid, Some(2));
        assert!(log.entries.borrow().is_empty());
    }
}
