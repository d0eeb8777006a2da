use optical_core::{DiskId, DriveLetter, HostError};
use thiserror::Error;

/// Conditions that abort a get/test/set call.
///
/// Soft conditions (a drive that cannot be managed, a disk id with no device)
/// are never reported through this type; they surface as values instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("optical disk {disk_id} does not exist; drive letter {letter} cannot be ensured")]
    DiskNotFound { disk_id: DiskId, letter: DriveLetter },

    #[error("drive letter {letter} for optical disk {disk_id} is already assigned to volume {owner}")]
    LetterConflict {
        disk_id: DiskId,
        letter: DriveLetter,
        owner: String,
    },

    #[error("virtual disk probe failed for {device_path}: {source}")]
    Probe {
        device_path: String,
        #[source]
        source: HostError,
    },

    #[error("no volume found for optical disk {disk_id} ({key})")]
    VolumeNotLocated { disk_id: DiskId, key: String },

    #[error("optical disk {disk_id} is still not in the desired state after set")]
    NotConverged { disk_id: DiskId },

    #[error(transparent)]
    Host(#[from] HostError),
}
