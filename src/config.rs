//! Relocation policy configuration
//!
//! Options controlling the relocation routine. Applications normally use
//! `RelocateConfig::default()`; the TOML forms exist for applications that
//! ship a relocation policy alongside their other bundled configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths;

/// Options for the relocation routine
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelocateConfig {
    /// Clear the quarantine attribute on the installed copy before the
    /// relaunch, so it does not re-trigger the downloaded-file prompt
    pub clear_quarantine: bool,

    /// Unmount the source volume when the bundle was started from a
    /// disk image
    pub unmount_source_image: bool,

    /// Move the original bundle to the trash after a successful copy
    pub trash_original: bool,

    /// Install into this directory instead of the local Applications
    /// folder. Must be absolute.
    pub install_dir: Option<PathBuf>,

    /// Relocate this bundle instead of the one containing the running
    /// executable. Mainly useful for tests.
    #[serde(skip)]
    pub bundle_path: Option<PathBuf>,
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            clear_quarantine: true,
            unmount_source_image: true,
            trash_original: true,
            install_dir: None,
            bundle_path: None,
        }
    }
}

/// Errors from parsing or validating a relocation policy
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse relocation policy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be an absolute path, got {value:?}")]
    RelativePath { field: &'static str, value: PathBuf },
}

impl RelocateConfig {
    /// Load a relocation policy from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_str(&contents)
    }

    /// Parse a relocation policy from a TOML string.
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.install_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field: "install_dir",
                    value: dir.clone(),
                });
            }
        }

        if let Some(bundle) = &self.bundle_path {
            if !bundle.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field: "bundle_path",
                    value: bundle.clone(),
                });
            }
        }

        Ok(())
    }

    /// The directory bundles are installed into.
    pub fn resolved_install_dir(&self) -> PathBuf {
        self.install_dir
            .clone()
            .unwrap_or_else(paths::install_location)
    }

    /// The bundle to relocate, detected from the running executable when
    /// no override is set.
    pub fn resolved_bundle(&self) -> Option<PathBuf> {
        if let Some(bundle) = &self.bundle_path {
            return Some(bundle.clone());
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| paths::bundle_root(&exe))
    }
}
