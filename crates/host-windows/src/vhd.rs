use optical_core::{HostError, VirtualDiskStatus};

use windows::Win32::Foundation::{CloseHandle, ERROR_INSUFFICIENT_BUFFER, HANDLE};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ACCESS_RIGHTS, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows::Win32::Storage::Vhd::{
    GetStorageDependencyInformation, GET_STORAGE_DEPENDENCY_FLAG_HOST_VOLUMES,
    STORAGE_DEPENDENCY_INFO, STORAGE_DEPENDENCY_INFO_VERSION_2,
};
use windows::core::PCWSTR;

use crate::volumes::wide;

// Returned for volumes that are not backed by a virtual disk.
const ERROR_VIRTDISK_NOT_VIRTUAL_DISK: u32 = 0xC03A_0015;
const DEPENDENCY_BUFFER_LEN: usize = 4096;

struct VolumeDevice(HANDLE);

impl Drop for VolumeDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn open_volume(device_path: &str) -> Result<VolumeDevice, HostError> {
    // The device itself, not its root directory.
    let path = device_path.trim_end_matches('\\');
    let w = wide(path);

    unsafe {
        CreateFileW(
            PCWSTR(w.as_ptr()),
            FILE_ACCESS_RIGHTS(0),
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            None,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            None,
        )
        .map(VolumeDevice)
        .map_err(|error| {
            HostError::os("CreateFileW", path, error.message()).with_code(error.code().0 as u32)
        })
    }
}

/// Asks the virtual disk service whether `device_path` is an attached image.
pub fn probe_virtual_disk(device_path: &str) -> Result<VirtualDiskStatus, HostError> {
    let device = open_volume(device_path)?;

    // u64 backing keeps the buffer aligned for STORAGE_DEPENDENCY_INFO.
    let mut buf = vec![0u64; DEPENDENCY_BUFFER_LEN / 8];
    let info = buf.as_mut_ptr() as *mut STORAGE_DEPENDENCY_INFO;
    let mut used = 0u32;

    let status = unsafe {
        (*info).Version = STORAGE_DEPENDENCY_INFO_VERSION_2;
        GetStorageDependencyInformation(
            device.0,
            GET_STORAGE_DEPENDENCY_FLAG_HOST_VOLUMES,
            DEPENDENCY_BUFFER_LEN as u32,
            info,
            Some(&mut used),
        )
    };

    match status.0 {
        0 => Ok(VirtualDiskStatus::Mounted {
            image_path: unsafe { image_path(info) },
        }),
        code if code == ERROR_INSUFFICIENT_BUFFER.0 => {
            Ok(VirtualDiskStatus::Mounted { image_path: None })
        }
        ERROR_VIRTDISK_NOT_VIRTUAL_DISK => Ok(VirtualDiskStatus::NotVirtual),
        code => Err(HostError::os(
            "GetStorageDependencyInformation",
            device_path,
            format!("error 0x{code:08X}"),
        )
        .with_code(code)),
    }
}

/// Backing file of the first dependency: host volume + path relative to it.
unsafe fn image_path(info: *const STORAGE_DEPENDENCY_INFO) -> Option<String> {
    if (*info).NumberEntries == 0 {
        return None;
    }
    let entry = &(*info).Anonymous.Version2Entries[0];
    let host = entry.HostVolumeName.to_string().ok()?;
    let relative = entry.DependentVolumeRelativePath.to_string().ok()?;
    Some(format!("{}{}", host, relative.trim_start_matches('\\')))
}
