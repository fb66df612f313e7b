//! moveapp - Move a running macOS application into the Applications folder
//!
//! This library provides:
//! - Bundle location classification (Applications folders, nested bundles)
//! - Plain and privilege-elevated bundle copies
//! - Disk image detection and unmount of the source volume
//! - Quarantine clearing and relaunch of the installed copy
//!
//! Call [`move_to_applications`] as the first line of `main`, before any
//! window is created. When the application is already installed the call is
//! a no-op; when a relocation completes the process relaunches from the
//! installed copy and the call does not return.

pub mod config;
pub mod elevation;
pub mod paths;
pub mod relaunch;
pub mod relocate;
pub mod shell;
pub mod volume;

pub use config::RelocateConfig;
pub use elevation::{ElevatedExecutor, OsaScript};
pub use relaunch::{Relauncher, ShellRelauncher};
pub use relocate::{
    move_to_applications, move_to_applications_with, Handover, Outcome, RelocateError, Relocator,
};
pub use volume::{DiskArbitration, VolumeInspector};
