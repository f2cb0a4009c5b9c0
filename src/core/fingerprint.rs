//! Command-line fingerprints - Normalized invocation arguments used to skip redundant relaunches

use anyhow::Result;
use tracing::debug;

use super::log::LogSink;
use super::process::ProcessInspector;
use super::settings::{LaunchSettings, DETECTED_COMMANDLINE_KEY, PATHS_SECTION};
use crate::persistence::KeyValueStore;

/// The text removed from a command line: the invocation path plus one space,
/// quoted when the path contains whitespace.
pub fn removal_token(invocation_path: &str) -> String {
    if invocation_path.chars().any(char::is_whitespace) {
        format!("\"{}\" ", invocation_path)
    } else {
        format!("{} ", invocation_path)
    }
}

/// Strip the invocation path from `command_line`.
///
/// Never hands back the raw command line: if the token is not present the
/// result is empty.
pub fn strip_invocation(command_line: &str, invocation_path: &str) -> String {
    let token = removal_token(invocation_path);
    if find_ignore_case(command_line, &token).is_none() {
        return String::new();
    }

    let mut result = String::with_capacity(command_line.len());
    let mut rest = command_line;
    while let Some((start, end)) = find_ignore_case(rest, &token) {
        result.push_str(&rest[..start]);
        rest = &rest[end..];
    }
    result.push_str(rest);
    result
}

/// Fingerprint the command line of a running process.
///
/// `None` when the command line could not be read (the process exited or we
/// lack permission); the launch carries on without one.
pub fn extract(
    inspector: &dyn ProcessInspector,
    pid: u32,
    invocation_path: &str,
    log: &dyn LogSink,
) -> Option<String> {
    match inspector.command_line(pid) {
        Ok(command_line) => Some(strip_invocation(&command_line, invocation_path)),
        Err(e) => {
            debug!("No command line for PID {}: {}", pid, e);
            log.log("NOTE", &format!("Could not read command line: {}", e));
            None
        }
    }
}

/// Whether a stored fingerprint matches the current one.
/// Both must be non-empty; casing is ignored.
pub fn commandlines_match(stored: &str, current: &str) -> bool {
    !stored.is_empty() && !current.is_empty() && equals_ignore_case(stored, current)
}

/// Remember a detected command line for the next run. Empty input is ignored.
pub fn store_commandline(
    settings: &mut LaunchSettings,
    store: &dyn KeyValueStore,
    command_line: &str,
) -> Result<()> {
    if command_line.is_empty() {
        return Ok(());
    }
    settings.detected_commandline = command_line.to_string();
    store.write(DETECTED_COMMANDLINE_KEY, command_line, PATHS_SECTION)
}

fn equals_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Byte range of the first case-insensitive occurrence of `needle`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    haystack.char_indices().find_map(|(start, _)| {
        let mut candidate = haystack[start..].char_indices();
        let mut wanted = needle.chars();
        loop {
            match wanted.next() {
                None => {
                    let end = candidate
                        .next()
                        .map(|(offset, _)| start + offset)
                        .unwrap_or(haystack.len());
                    return Some((start, end));
                }
                Some(w) => match candidate.next() {
                    Some((_, c)) if c.to_lowercase().eq(w.to_lowercase()) => {}
                    _ => return None,
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{FakeInspector, FakeProcess, MemoryLog, MemoryStore};

    const SPACED: &str = "C:\\Program Files (x86)\\Origin\\Origin.exe";

    #[test]
    fn token_is_quoted_only_with_whitespace() {
        assert_eq!(removal_token(SPACED), format!("\"{}\" ", SPACED));
        assert_eq!(removal_token("D:\\Origin\\Origin.exe"), "D:\\Origin\\Origin.exe ");
    }

    #[test]
    fn strips_quoted_path() {
        let cmd = format!("\"{}\" /StartClientMinimized", SPACED);
        assert_eq!(strip_invocation(&cmd, SPACED), "/StartClientMinimized");
    }

    #[test]
    fn strip_ignores_case() {
        let cmd = "d:\\ORIGIN\\origin.EXE -Origin_MultiplayerID 1";
        assert_eq!(
            strip_invocation(cmd, "D:\\Origin\\Origin.exe"),
            "-Origin_MultiplayerID 1"
        );
    }

    #[test]
    fn unmatched_path_degrades_to_empty() {
        let cmd = "E:\\Elsewhere\\Origin.exe -silent";
        assert_eq!(strip_invocation(cmd, "D:\\Origin\\Origin.exe"), "");
        // Path without the trailing argument separator does not match
        assert_eq!(
            strip_invocation("D:\\Origin\\Origin.exe", "D:\\Origin\\Origin.exe"),
            ""
        );
    }

    #[test]
    fn find_handles_multibyte_text() {
        assert_eq!(find_ignore_case("Ünïcode Ä b", "ä "), Some((10, 13)));
        assert_eq!(find_ignore_case("abc", ""), None);
        assert_eq!(find_ignore_case("ab", "abc"), None);
    }

    #[test]
    fn extract_is_idempotent() {
        let inspector = FakeInspector::new(vec![FakeProcess::live(42)
            .with_command_line(&format!("\"{}\" /noUpdate", SPACED))]);
        let log = MemoryLog::default();

        let first = extract(&inspector, 42, SPACED, &log);
        let second = extract(&inspector, 42, SPACED, &log);
        assert_eq!(first.as_deref(), Some("/noUpdate"));
        assert_eq!(first, second);
        assert!(log.entries.borrow().is_empty());
    }

    #[test]
    fn extract_failures_are_not_fatal() {
        let inspector = FakeInspector::new(vec![
            FakeProcess::live(1).denied(),
            FakeProcess::dead(2),
        ]);
        let log = MemoryLog::default();

        assert_eq!(extract(&inspector, 1, SPACED, &log), None);
        assert_eq!(extract(&inspector, 2, SPACED, &log), None);
        assert_eq!(extract(&inspector, 3, SPACED, &log), None);
        assert_eq!(log.causes(), vec!["NOTE", "NOTE", "NOTE"]);
        assert!(log.contains("NOTE", "access denied"));
    }

    #[test]
    fn match_requires_both_sides_and_ignores_case() {
        assert!(commandlines_match("Foo.exe -x", "Foo.exe -x"));
        assert!(commandlines_match("Foo.exe -x", "foo.EXE -X"));
        assert!(!commandlines_match("Foo.exe -x", "Foo.exe -y"));
        assert!(!commandlines_match("", ""));
        assert!(!commandlines_match("", "-x"));
        assert!(!commandlines_match("-x", ""));
    }

    #[test]
    fn store_writes_once_and_skips_empty() {
        let mut settings = LaunchSettings::default();
        let store = MemoryStore::default();

        store_commandline(&mut settings, &store, "").unwrap();
        assert_eq!(*store.writes.borrow(), 0);
        assert!(settings.detected_commandline.is_empty());

        store_commandline(&mut settings, &store, "/StartClientMinimized").unwrap();
        assert_eq!(*store.writes.borrow(), 1);
        assert_eq!(settings.detected_commandline, "/StartClientMinimized");
        assert_eq!(
            store
                .read(DETECTED_COMMANDLINE_KEY, PATHS_SECTION)
                .unwrap()
                .as_deref(),
            Some("/StartClientMinimized")
        );
    }
}
