//! Bundle and Applications folder path logic
//!
//! Centralizes the path classification used by the relocation routine:
//! where Applications folders live, whether a bundle is already installed,
//! whether it is nested inside another bundle, and what the current user
//! can write to.

use std::path::{Path, PathBuf};

/// File extension marking an application bundle
pub const BUNDLE_EXTENSION: &str = "app";

/// System-wide (local domain) Applications folders
pub mod system {
    use std::path::PathBuf;

    /// The local-domain Applications directory
    pub const APPLICATIONS_DIR: &str = "/Applications";

    /// Local-domain search path; the first entry is the install target
    pub const SEARCH_PATH: &[&str] = &[APPLICATIONS_DIR];

    /// Get the Applications directory as PathBuf
    pub fn applications_dir() -> PathBuf {
        PathBuf::from(APPLICATIONS_DIR)
    }
}

/// Per-user Applications folder (no privileges required)
pub mod user {
    use std::path::PathBuf;

    /// Get the user's Applications directory (~/Applications)
    pub fn applications_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join("Applications"))
    }
}

/// The directory a relocated bundle is installed into.
pub fn install_location() -> PathBuf {
    system::applications_dir()
}

/// All Applications directories a bundle may already be installed in.
///
/// The local domain comes first; the per-user folder is appended when the
/// home directory resolves.
pub fn applications_search_path() -> Vec<PathBuf> {
    let mut dirs_list: Vec<PathBuf> = system::SEARCH_PATH.iter().map(PathBuf::from).collect();
    if let Some(user_dir) = user::applications_dir() {
        dirs_list.push(user_dir);
    }
    dirs_list
}

/// Check whether `path` already lives under one of the Applications
/// directories.
pub fn is_in_applications_folder(path: &Path) -> bool {
    applications_search_path()
        .iter()
        .any(|dir| path.starts_with(dir))
}

/// Check whether any path component above the bundle itself is another
/// bundle.
///
/// A bundle nested inside a parent bundle (for example inside a parent's
/// Resources directory) must not be promoted to a top-level install, even
/// when the parent lives under Applications.
pub fn is_nested_bundle(bundle: &Path) -> bool {
    let parent = match bundle.parent() {
        Some(parent) => parent,
        None => return false,
    };

    parent.components().any(|component| {
        Path::new(component.as_os_str())
            .extension()
            .map(|ext| ext == BUNDLE_EXTENSION)
            .unwrap_or(false)
    })
}

/// Walk up from the running executable to the enclosing bundle root.
///
/// Returns `None` when the executable does not live inside a `.app`
/// bundle (running unbundled, e.g. a debug build started from a
/// terminal).
pub fn bundle_root(exe_path: &Path) -> Option<PathBuf> {
    exe_path
        .ancestors()
        .find(|ancestor| {
            ancestor
                .extension()
                .map(|ext| ext == BUNDLE_EXTENSION)
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
}

/// Check whether the current user can write to `path`.
///
/// Directories are probed by creating and removing a uniquely named
/// entry, which reflects effective permissions including ACLs. Plain
/// files are opened with write intent. A missing path counts as not
/// writable.
pub fn is_writable(path: &Path) -> bool {
    if path.is_dir() {
        let probe = path.join(format!(".moveapp-probe-{}", std::process::id()));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
        {
            Ok(file) => {
                drop(file);
                let _ = std::fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    } else {
        std::fs::OpenOptions::new().write(true).open(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_location_is_local_domain() {
        assert_eq!(install_location(), PathBuf::from("/Applications"));
    }

    #[test]
    fn test_in_applications_folder() {
        assert!(is_in_applications_folder(Path::new(
            "/Applications/MyApp.app"
        )));
        assert!(is_in_applications_folder(Path::new(
            "/Applications/Utilities/MyApp.app"
        )));
        assert!(!is_in_applications_folder(Path::new(
            "/Users/alice/Downloads/MyApp.app"
        )));
        // Prefix match is per component, not per character
        assert!(!is_in_applications_folder(Path::new(
            "/ApplicationsBackup/MyApp.app"
        )));
    }

    #[test]
    fn test_nested_bundle() {
        assert!(is_nested_bundle(Path::new(
            "/Applications/Outer.app/Contents/Resources/Inner.app"
        )));
        assert!(!is_nested_bundle(Path::new("/Applications/MyApp.app")));
        assert!(!is_nested_bundle(Path::new(
            "/Volumes/Installer/MyApp.app"
        )));
    }

    #[test]
    fn test_bundle_root_from_executable_path() {
        let exe = Path::new("/Volumes/Installer/MyApp.app/Contents/MacOS/myapp");
        assert_eq!(
            bundle_root(exe),
            Some(PathBuf::from("/Volumes/Installer/MyApp.app"))
        );

        // Nearest enclosing bundle wins
        let nested = Path::new("/Applications/Outer.app/Contents/Resources/Inner.app/Contents/MacOS/inner");
        assert_eq!(
            bundle_root(nested),
            Some(PathBuf::from(
                "/Applications/Outer.app/Contents/Resources/Inner.app"
            ))
        );

        assert_eq!(bundle_root(Path::new("/usr/local/bin/myapp")), None);
    }

    #[test]
    fn test_is_writable() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(is_writable(tmp.path()));

        let file = tmp.path().join("entry.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(is_writable(&file));

        assert!(!is_writable(&tmp.path().join("missing")));
    }
}
