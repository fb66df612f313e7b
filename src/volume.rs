//! Disk image detection and volume unmount
//!
//! Classifies the volume a bundle was started from by its device model.
//! A mounted disk image reports the literal model "Disk Image"; anything
//! else, including volumes that cannot be resolved at all, counts as an
//! ordinary location.

use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Device model reported for mounted disk images
pub const DISK_IMAGE_MODEL: &str = "Disk Image";

/// Capability for querying and unmounting volumes.
///
/// The production implementation talks to the disk management tools;
/// tests substitute a mock returning canned descriptions.
pub trait VolumeInspector {
    /// The device model string for the volume at `volume`, if it resolves.
    fn device_model(&self, volume: &Path) -> Option<String>;

    /// Force-unmount the volume. Best effort, failures stay silent.
    fn unmount(&self, volume: &Path);
}

/// Volume queries through the `diskutil` and `hdiutil` tools.
pub struct DiskArbitration;

impl VolumeInspector for DiskArbitration {
    fn device_model(&self, volume: &Path) -> Option<String> {
        let output = Command::new("/usr/sbin/diskutil")
            .arg("info")
            .arg(volume)
            .output()
            .ok()?;

        if !output.status.success() {
            debug!("diskutil info failed for {:?}", volume);
            return None;
        }

        parse_device_model(&String::from_utf8_lossy(&output.stdout))
    }

    fn unmount(&self, volume: &Path) {
        let result = Command::new("/usr/bin/hdiutil")
            .arg("detach")
            .arg("-force")
            .arg(volume)
            .output();

        match result {
            Ok(out) if out.status.success() => {
                debug!("unmounted source volume {:?}", volume);
            }
            Ok(out) => {
                debug!(
                    "hdiutil detach failed for {:?}: {}",
                    volume,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
            }
            Err(err) => {
                debug!("could not run hdiutil for {:?}: {}", volume, err);
            }
        }
    }
}

/// Extract the `Device / Media Name` field from `diskutil info` output.
fn parse_device_model(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(value) = line.trim().strip_prefix("Device / Media Name:") {
            return Some(value.trim().to_string());
        }
    }
    None
}

/// True iff the volume at `volume` is backed by a mounted disk image.
pub fn is_disk_image(inspector: &dyn VolumeInspector, volume: &Path) -> bool {
    inspector.device_model(volume).as_deref() == Some(DISK_IMAGE_MODEL)
}
