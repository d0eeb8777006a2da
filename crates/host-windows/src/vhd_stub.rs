use optical_core::{HostError, VirtualDiskStatus};

pub fn probe_virtual_disk(_device_path: &str) -> Result<VirtualDiskStatus, HostError> {
    Err(HostError::Unsupported("virtual disk probe"))
}
