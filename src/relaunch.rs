//! Relaunch of the installed copy
//!
//! Hands execution over to the relocated bundle. A detached shell helper
//! polls until the current process has exited, optionally strips the
//! quarantine attribute from the installed copy, and opens it. The parent
//! terminating is what releases the helper's polling loop.

use crate::relocate::RelocateError;
use crate::shell;
use std::path::Path;

/// Capability for spawning the detached relaunch helper.
pub trait Relauncher {
    /// Spawn the helper for `destination` and return without waiting.
    fn spawn(
        &self,
        destination: &Path,
        parent_pid: u32,
        clear_quarantine: bool,
    ) -> Result<(), RelocateError>;
}

/// Relaunch through a detached `/bin/sh` helper process.
pub struct ShellRelauncher;

impl Relauncher for ShellRelauncher {
    fn spawn(
        &self,
        destination: &Path,
        parent_pid: u32,
        clear_quarantine: bool,
    ) -> Result<(), RelocateError> {
        let script = relaunch_script(destination, parent_pid, clear_quarantine);
        shell::spawn_detached(&script).map_err(RelocateError::Launch)
    }
}

/// Build the shell script handing over to the installed copy.
///
/// The helper must not open the new instance while the old one still
/// holds its resources, so it waits for the parent pid to disappear
/// before doing anything else.
pub fn relaunch_script(destination: &Path, parent_pid: u32, clear_quarantine: bool) -> String {
    let quoted = shell::quote_path(destination);

    let mut steps = vec![format!(
        "while /bin/kill -0 {parent_pid} >/dev/null 2>&1; do /bin/sleep 0.1; done"
    )];
    if clear_quarantine {
        steps.push(format!(
            "/usr/bin/xattr -d -r com.apple.quarantine {quoted}"
        ));
    }
    steps.push(format!("/usr/bin/open {quoted}"));

    format!("({}) &", steps.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_waits_for_parent_then_opens() {
        let script = relaunch_script(Path::new("/Applications/MyApp.app"), 4242, false);

        assert!(script.starts_with('('));
        assert!(script.ends_with(") &"));
        assert!(script.contains("while /bin/kill -0 4242 >/dev/null 2>&1; do /bin/sleep 0.1; done"));
        assert!(script.contains("/usr/bin/open '/Applications/MyApp.app'"));
        assert!(!script.contains("xattr"));
    }

    #[test]
    fn test_script_clears_quarantine_before_open() {
        let script = relaunch_script(Path::new("/Applications/MyApp.app"), 1, true);

        let xattr = script
            .find("/usr/bin/xattr -d -r com.apple.quarantine '/Applications/MyApp.app'")
            .expect("quarantine step missing");
        let open = script.find("/usr/bin/open").expect("open step missing");
        assert!(xattr < open);
    }

    #[test]
    fn test_script_quotes_awkward_destination() {
        let script = relaunch_script(Path::new("/Applications/It's an App.app"), 1, true);
        assert!(script.contains("'/Applications/It'\\''s an App.app'"));
    }
}
