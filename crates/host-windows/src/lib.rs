//! OS collaborators for the optical drive-letter resource, backed by the
//! Win32 volume management and virtual disk APIs.

use optical_core::{
    DriveLetter, HostError, OpticalDriveRecord, OpticalDriveSource, VirtualDiskProbe,
    VirtualDiskStatus, VolumeHandle, VolumeKey, VolumeStore,
};

#[cfg(windows)]
mod vhd;
#[cfg(windows)]
mod volumes;

#[cfg(not(windows))]
#[path = "volumes_stub.rs"]
mod volumes;

#[cfg(not(windows))]
#[path = "vhd_stub.rs"]
mod vhd;

/// One mount point change issued while moving a volume's letter.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MountStep {
    Mount(DriveLetter),
    Unmount(DriveLetter),
}

/// Steps that take a volume from `current` to `wanted`.
///
/// The new letter is mounted before the old one is removed, so a rejected
/// mount leaves the volume reachable under its old letter.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn mount_plan(current: Option<DriveLetter>, wanted: Option<DriveLetter>) -> Vec<MountStep> {
    if current == wanted {
        return Vec::new();
    }
    wanted
        .map(MountStep::Mount)
        .into_iter()
        .chain(current.map(MountStep::Unmount))
        .collect()
}

// ERROR_NO_MORE_FILES, raw or wrapped in an HRESULT.
#[cfg_attr(not(windows), allow(dead_code))]
const ERROR_NO_MORE_FILES: u32 = 18;
#[cfg_attr(not(windows), allow(dead_code))]
const HRESULT_NO_MORE_FILES: u32 = 0x8007_0012;

/// Whether a `FindNextVolumeW` failure code just marks the end of the list.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn is_end_of_volume_walk(code: u32) -> bool {
    code == ERROR_NO_MORE_FILES || code == HRESULT_NO_MORE_FILES
}

/// Live view of the local machine. Holds no state; every call queries the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsHost;

impl WindowsHost {
    pub fn new() -> Self {
        WindowsHost
    }
}

impl OpticalDriveSource for WindowsHost {
    fn list_optical_drives(&self) -> Result<Vec<OpticalDriveRecord>, HostError> {
        volumes::list_optical_drives()
    }
}

impl VolumeStore for WindowsHost {
    fn find_volume(&self, key: &VolumeKey) -> Result<Option<VolumeHandle>, HostError> {
        match key {
            VolumeKey::Letter(letter) => volumes::volume_for_letter(*letter),
            VolumeKey::DeviceId(device_id) => match device_id.parse::<DriveLetter>() {
                Ok(letter) => volumes::volume_for_letter(letter),
                Err(_) => volumes::volume_for_device(device_id),
            },
        }
    }

    fn set_drive_letter(
        &self,
        volume: &VolumeHandle,
        letter: Option<DriveLetter>,
    ) -> Result<(), HostError> {
        volumes::set_drive_letter(volume, letter)
    }
}

impl VirtualDiskProbe for WindowsHost {
    fn probe_virtual_disk(&self, device_path: &str) -> Result<VirtualDiskStatus, HostError> {
        vhd::probe_virtual_disk(device_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(value: char) -> DriveLetter {
        DriveLetter::new(value).unwrap()
    }

    #[test]
    fn letter_change_mounts_before_unmounting() {
        assert_eq!(
            mount_plan(Some(letter('G')), Some(letter('H'))),
            vec![MountStep::Mount(letter('H')), MountStep::Unmount(letter('G'))]
        );
        assert_eq!(
            mount_plan(None, Some(letter('E'))),
            vec![MountStep::Mount(letter('E'))]
        );
        assert_eq!(
            mount_plan(Some(letter('E')), None),
            vec![MountStep::Unmount(letter('E'))]
        );
    }

    #[test]
    fn same_letter_needs_no_steps() {
        assert!(mount_plan(Some(letter('E')), Some(letter('E'))).is_empty());
        assert!(mount_plan(None, None).is_empty());
    }

    #[test]
    fn only_no_more_files_ends_the_volume_walk() {
        assert!(is_end_of_volume_walk(18));
        assert!(is_end_of_volume_walk(0x8007_0012));
        assert!(!is_end_of_volume_walk(5));
        assert!(!is_end_of_volume_walk(0x8007_0005));
        assert!(!is_end_of_volume_walk(0x8007_00EA));
    }

    #[cfg(not(windows))]
    #[test]
    fn reports_unsupported_off_windows() {
        let host = WindowsHost::new();
        assert!(matches!(
            host.list_optical_drives(),
            Err(HostError::Unsupported(_))
        ));
        assert!(matches!(
            host.probe_virtual_disk(r"\\?\Volume{00000001-0000-0000-0000-000000000000}\"),
            Err(HostError::Unsupported(_))
        ));
        let letter = DriveLetter::new('E').unwrap();
        assert!(matches!(
            host.find_volume(&VolumeKey::Letter(letter)),
            Err(HostError::Unsupported(_))
        ));
    }
}
