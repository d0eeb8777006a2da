//! Contracts for the OS collaborators the reconciler is built on.
//!
//! Every call is a blocking query against live OS state; implementations must
//! not cache results between calls.

use crate::{DriveLetter, HostError, OpticalDriveRecord};
use std::fmt;

pub trait OpticalDriveSource {
    /// All optical drives in OS enumeration order. May be empty.
    fn list_optical_drives(&self) -> Result<Vec<OpticalDriveRecord>, HostError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeKey {
    Letter(DriveLetter),
    DeviceId(String),
}

impl fmt::Display for VolumeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeKey::Letter(letter) => write!(f, "drive letter {letter}"),
            VolumeKey::DeviceId(device_id) => write!(f, "device {device_id}"),
        }
    }
}

/// A mounted volume located through [`VolumeStore::find_volume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHandle {
    /// Volume GUID path, stable across drive-letter changes.
    pub device_id: String,
    pub drive_letter: Option<DriveLetter>,
}

pub trait VolumeStore {
    fn find_volume(&self, key: &VolumeKey) -> Result<Option<VolumeHandle>, HostError>;

    /// Assigns `letter` to the volume, or removes its letter when `None`.
    fn set_drive_letter(
        &self,
        volume: &VolumeHandle,
        letter: Option<DriveLetter>,
    ) -> Result<(), HostError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualDiskStatus {
    /// The device is backed by an attached disk image.
    Mounted { image_path: Option<String> },
    NotVirtual,
}

pub trait VirtualDiskProbe {
    /// `Err` is reserved for failures other than "not a virtual disk".
    fn probe_virtual_disk(&self, device_path: &str) -> Result<VirtualDiskStatus, HostError>;
}

/// Everything the engine needs from the operating system.
pub trait Host: OpticalDriveSource + VolumeStore + VirtualDiskProbe {}

impl<T> Host for T where T: OpticalDriveSource + VolumeStore + VirtualDiskProbe + ?Sized {}
