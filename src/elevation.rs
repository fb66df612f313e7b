//! Privilege elevation
//!
//! Copying into the Applications folder needs administrator rights when
//! the folder, or an existing copy inside it, is not writable by the
//! current user. The privileged copy runs through the interactive system
//! authorization prompt via `osascript`, which blocks until the user
//! answers.

use crate::relocate::RelocateError;
use crate::shell;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Capability for copying a bundle with elevated privileges.
///
/// The production implementation shows an interactive administrator
/// prompt; tests substitute a mock so no dialog appears.
pub trait ElevatedExecutor {
    /// Recursively copy `source` over `destination`, preserving
    /// permissions and overwriting in place.
    fn copy_bundle(&self, source: &Path, destination: &Path) -> Result<(), RelocateError>;
}

/// Elevated copy through AppleScript's
/// `do shell script ... with administrator privileges`.
pub struct OsaScript;

impl ElevatedExecutor for OsaScript {
    fn copy_bundle(&self, source: &Path, destination: &Path) -> Result<(), RelocateError> {
        let script = privileged_copy_script(source, destination);

        info!("requesting administrator privileges for the copy");
        let output = Command::new("/usr/bin/osascript")
            .arg("-e")
            .arg(&script)
            .output()
            .map_err(|err| RelocateError::Elevation {
                reason: format!("could not run osascript: {err}"),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("User canceled") {
            Err(RelocateError::Elevation {
                reason: "the administrator prompt was cancelled".to_string(),
            })
        } else {
            Err(RelocateError::Copy {
                reason: stderr.trim().to_string(),
            })
        }
    }
}

/// Build the AppleScript source for the privileged copy.
///
/// The shell command overwrites the destination in place (force flag),
/// so no separate delete step runs on this path.
fn privileged_copy_script(source: &Path, destination: &Path) -> String {
    let command = format!(
        "/bin/cp -pfR {} {}",
        shell::quote_path(source),
        shell::quote_path(destination)
    );

    format!(
        "do shell script \"{}\" with administrator privileges",
        escape_applescript(&command)
    )
}

/// Escape a string for an AppleScript double-quoted literal.
///
/// Shell quoting can introduce backslashes (`'\''`), which AppleScript
/// would otherwise interpret inside the literal.
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
