//! The relocation routine
//!
//! A straight-line decision sequence: classify where the bundle is
//! running from, pick a copy strategy, copy it into the Applications
//! folder, clean up the original, and hand over to the installed copy.
//! Runs synchronously apart from the detached trash thread and the
//! detached relaunch helper.

use crate::config::RelocateConfig;
use crate::elevation::{ElevatedExecutor, OsaScript};
use crate::paths;
use crate::relaunch::{Relauncher, ShellRelauncher};
use crate::volume::{self, DiskArbitration, VolumeInspector};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures on the critical path of the relocation routine.
///
/// None of these reach the embedding application; the entry points log
/// them and return, leaving the process running from its original
/// location.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The privileged or plain bundle copy did not complete
    #[error("bundle copy failed: {reason}")]
    Copy { reason: String },

    /// A pre-existing destination entry could not be moved to the trash
    #[error("could not move aside the existing destination: {reason}")]
    Delete { reason: String },

    /// The elevation mechanism could not run or was refused
    #[error("privileged execution failed: {reason}")]
    Elevation { reason: String },

    /// The detached relaunch helper could not be spawned
    #[error("could not spawn the relaunch helper: {0}")]
    Launch(#[source] std::io::Error),
}

/// Filesystem facts probed once before choosing a copy strategy
#[derive(Debug, Clone, Copy)]
pub struct LocationFacts {
    /// The bundle already lives under an Applications directory
    pub in_applications_folder: bool,

    /// The bundle is nested inside another bundle
    pub nested_bundle: bool,

    /// The install directory is writable by the current user
    pub install_dir_writable: bool,

    /// A same-named entry already exists at the destination
    pub destination_exists: bool,

    /// That existing entry is writable by the current user
    pub destination_writable: bool,
}

/// The copy strategy chosen for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationDecision {
    /// Properly installed already, nothing to do
    AlreadyInPlace,

    /// The copy must run through the administrator prompt
    NeedsAuthorizedCopy,

    /// A plain copy suffices; any existing destination entry is moved
    /// to the trash first
    NeedsPlainCopy { replace_existing: bool },
}

impl RelocationDecision {
    /// Pick the strategy from the probed facts.
    ///
    /// A nested bundle is never considered installed, even under an
    /// Applications directory.
    pub fn from_facts(facts: LocationFacts) -> Self {
        if facts.in_applications_folder && !facts.nested_bundle {
            return Self::AlreadyInPlace;
        }

        let needs_authorization = !facts.install_dir_writable
            || (facts.destination_exists && !facts.destination_writable);

        if needs_authorization {
            Self::NeedsAuthorizedCopy
        } else {
            Self::NeedsPlainCopy {
                replace_existing: facts.destination_exists,
            }
        }
    }
}

/// What one invocation of the routine did
#[derive(Debug)]
pub enum Outcome {
    /// The executable does not live inside a bundle, nothing to do
    Unbundled,

    /// The bundle already lives in an Applications folder
    AlreadyInstalled,

    /// The bundle was copied; the process should hand over and terminate
    Relocated(Handover),
}

/// Everything the handover step needs after a completed copy
#[derive(Debug)]
pub struct Handover {
    /// Where the bundle was running from
    pub source: PathBuf,

    /// The installed copy
    pub destination: PathBuf,

    /// The volume directory containing the source bundle
    pub volume: PathBuf,

    /// Whether that volume is a mounted disk image
    pub disk_image: bool,
}

/// Orchestrates one relocation attempt.
///
/// The seams (elevation, volume queries, relaunch) are injected so tests
/// can run the whole routine against temporary directories without
/// prompting for credentials or touching real volumes.
pub struct Relocator<'a> {
    config: &'a RelocateConfig,
    elevator: &'a dyn ElevatedExecutor,
    volumes: &'a dyn VolumeInspector,
    launcher: &'a dyn Relauncher,
}

impl<'a> Relocator<'a> {
    pub fn new(
        config: &'a RelocateConfig,
        elevator: &'a dyn ElevatedExecutor,
        volumes: &'a dyn VolumeInspector,
        launcher: &'a dyn Relauncher,
    ) -> Self {
        Self {
            config,
            elevator,
            volumes,
            launcher,
        }
    }

    /// Run the decision sequence and the copy, including trashing the
    /// original where appropriate. Returns without terminating; the
    /// public entry points act on the outcome.
    pub fn relocate(&self) -> Result<Outcome, RelocateError> {
        let bundle = match self.config.resolved_bundle() {
            Some(path) => path,
            None => {
                debug!("not running from an application bundle, nothing to do");
                return Ok(Outcome::Unbundled);
            }
        };

        let bundle_name = match bundle.file_name() {
            Some(name) => name.to_os_string(),
            None => return Ok(Outcome::Unbundled),
        };

        let install_dir = self.config.resolved_install_dir();
        let destination = install_dir.join(&bundle_name);
        let facts = self.probe(&bundle, &install_dir, &destination);

        match RelocationDecision::from_facts(facts) {
            RelocationDecision::AlreadyInPlace => {
                debug!("already installed at {:?}", bundle);
                return Ok(Outcome::AlreadyInstalled);
            }
            RelocationDecision::NeedsAuthorizedCopy => {
                info!(
                    "copying {:?} to {:?} with administrator privileges",
                    bundle, destination
                );
                self.elevator.copy_bundle(&bundle, &destination)?;
            }
            RelocationDecision::NeedsPlainCopy { replace_existing } => {
                if replace_existing {
                    info!("moving aside previous copy at {:?}", destination);
                    move_to_trash(&destination)?;
                }
                info!("copying {:?} to {:?}", bundle, destination);
                copy_bundle(&bundle, &destination)?;
            }
        }

        let origin = match bundle.parent() {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("/"),
        };
        let disk_image = volume::is_disk_image(self.volumes, &origin);

        // A bundle on a disk image disappears with the unmount; a nested
        // bundle belongs to its parent and must stay.
        if !disk_image && !facts.nested_bundle && self.config.trash_original {
            trash_in_background(bundle.clone());
        }

        Ok(Outcome::Relocated(Handover {
            source: bundle,
            destination,
            volume: origin,
            disk_image,
        }))
    }

    /// Spawn the relaunch helper and unmount the source disk image.
    ///
    /// The caller terminates the process afterwards; the helper waits
    /// for exactly that.
    pub fn hand_over(&self, handover: &Handover) -> Result<(), RelocateError> {
        self.launcher.spawn(
            &handover.destination,
            std::process::id(),
            self.config.clear_quarantine,
        )?;

        if handover.disk_image && self.config.unmount_source_image {
            self.volumes.unmount(&handover.volume);
        }

        Ok(())
    }

    fn probe(&self, bundle: &Path, install_dir: &Path, destination: &Path) -> LocationFacts {
        // With an install_dir override, that directory is the only
        // Applications folder this application recognizes.
        let in_applications_folder = if self.config.install_dir.is_some() {
            bundle.starts_with(install_dir)
        } else {
            paths::is_in_applications_folder(bundle)
        };

        LocationFacts {
            in_applications_folder,
            nested_bundle: paths::is_nested_bundle(bundle),
            install_dir_writable: paths::is_writable(install_dir),
            destination_exists: destination.exists(),
            destination_writable: paths::is_writable(destination),
        }
    }
}

/// Move the running application into the Applications folder if needed.
///
/// Call this as the first line of `main`, before any window is created.
/// When a relocation completes the process relaunches from the installed
/// copy and this function does not return. On the no-op path and on every
/// failure it returns normally and startup continues; failures are only
/// visible in the diagnostic log.
pub fn move_to_applications() {
    move_to_applications_with(RelocateConfig::default());
}

/// Same as [`move_to_applications`] with explicit options.
pub fn move_to_applications_with(config: RelocateConfig) {
    if cfg!(not(target_os = "macos")) {
        debug!("bundle relocation is only meaningful on macOS, skipping");
        return;
    }

    if let Err(err) = config.validate() {
        error!("invalid relocation options: {err}");
        return;
    }

    let relocator = Relocator::new(&config, &OsaScript, &DiskArbitration, &ShellRelauncher);

    match relocator.relocate() {
        Ok(Outcome::Relocated(handover)) => match relocator.hand_over(&handover) {
            Ok(()) => {
                info!("relaunching from {:?}", handover.destination);
                std::process::exit(0);
            }
            Err(err) => {
                error!("relocation completed but the handover failed: {err}");
            }
        },
        Ok(Outcome::Unbundled) | Ok(Outcome::AlreadyInstalled) => {}
        Err(err) => {
            error!("failed to move the application to the Applications folder: {err}");
        }
    }
}

/// Plain recursive copy preserving permissions, timestamps and resource
/// forks. The destination must not exist.
fn copy_bundle(source: &Path, destination: &Path) -> Result<(), RelocateError> {
    let output = Command::new("/bin/cp")
        .arg("-pR")
        .arg(source)
        .arg(destination)
        .output()
        .map_err(|err| RelocateError::Copy {
            reason: format!("could not run /bin/cp: {err}"),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(RelocateError::Copy {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Synchronously move an existing destination entry to the trash.
fn move_to_trash(path: &Path) -> Result<(), RelocateError> {
    trash::delete(path).map_err(|err| RelocateError::Delete {
        reason: err.to_string(),
    })
}

/// Move the original bundle to the trash without blocking the handover.
///
/// Completion or failure is only ever reported through the log.
fn trash_in_background(path: PathBuf) {
    std::thread::spawn(move || match trash::delete(&path) {
        Ok(()) => debug!("moved the original bundle to the trash: {:?}", path),
        Err(err) => warn!("failed to move the original bundle to the trash: {err}"),
    });
}
