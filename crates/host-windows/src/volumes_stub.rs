use optical_core::{DriveLetter, HostError, OpticalDriveRecord, VolumeHandle};

pub fn list_optical_drives() -> Result<Vec<OpticalDriveRecord>, HostError> {
    Err(HostError::Unsupported("optical drive enumeration"))
}

pub fn volume_for_letter(_letter: DriveLetter) -> Result<Option<VolumeHandle>, HostError> {
    Err(HostError::Unsupported("volume lookup"))
}

pub fn volume_for_device(_device_id: &str) -> Result<Option<VolumeHandle>, HostError> {
    Err(HostError::Unsupported("volume lookup"))
}

pub fn set_drive_letter(
    _volume: &VolumeHandle,
    _letter: Option<DriveLetter>,
) -> Result<(), HostError> {
    Err(HostError::Unsupported("drive letter assignment"))
}
