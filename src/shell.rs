//! Shell command helpers
//!
//! Builds and spawns `/bin/sh` command lines with safely quoted path
//! arguments. Both the privileged copy and the relaunch helper pass
//! user-controlled paths through a shell, so quoting is centralized here.

use std::path::Path;
use std::process::{Command, Stdio};

/// Quote a string for inclusion in a `/bin/sh` command line.
///
/// Wraps the value in single quotes and rewrites embedded single quotes
/// as `'\''` so paths containing spaces or quote characters survive word
/// splitting without being interpreted.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Quote a filesystem path for `/bin/sh`.
pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Spawn a detached `/bin/sh -c <script>` and do not wait for it.
///
/// Standard streams are closed so the helper cannot block on the parent's
/// terminal after the parent exits.
pub fn spawn_detached(script: &str) -> std::io::Result<()> {
    Command::new("/bin/sh")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_child| ())
}
