use optical_core::{DriveLetter, HostError, OpticalDriveRecord, VolumeHandle};
use tracing::debug;

use crate::{is_end_of_volume_walk, mount_plan, MountStep};

use windows::core::PCWSTR;
use windows::Win32::Storage::FileSystem::{
    DeleteVolumeMountPointW, FindFirstVolumeW, FindNextVolumeW, FindVolumeClose, GetDriveTypeW,
    GetLogicalDrives, GetVolumeNameForVolumeMountPointW, GetVolumePathNamesForVolumeNameW,
    SetVolumeMountPointW,
};

const DRIVE_CDROM: u32 = 5;
const VOLUME_NAME_LEN: usize = 50;

pub(crate) fn wide(s: &str) -> Vec<u16> {
    use std::os::windows::prelude::*;
    std::ffi::OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

fn os_error(operation: &'static str, target: &str, error: windows::core::Error) -> HostError {
    HostError::os(operation, target, error.message()).with_code(error.code().0 as u32)
}

fn logical_drive_letters() -> Vec<char> {
    unsafe {
        let mask = GetLogicalDrives();
        let mut letters = Vec::new();
        for (idx, letter) in ('A'..='Z').enumerate() {
            if mask & (1u32 << idx) != 0 {
                letters.push(letter);
            }
        }
        letters
    }
}

fn is_cdrom(root: &str) -> bool {
    let w = wide(root);
    unsafe { GetDriveTypeW(PCWSTR(w.as_ptr())) == DRIVE_CDROM }
}

/// Volume GUID paths (`\\?\Volume{...}\`) in the order the volume manager reports them.
fn volume_names() -> Result<Vec<String>, HostError> {
    let mut names = Vec::new();
    let mut buf = [0u16; VOLUME_NAME_LEN];

    unsafe {
        let find = FindFirstVolumeW(&mut buf)
            .map_err(|error| os_error("FindFirstVolumeW", "volumes", error))?;
        names.push(from_wide(&buf));
        let walked = loop {
            buf = [0u16; VOLUME_NAME_LEN];
            match FindNextVolumeW(find, &mut buf) {
                Ok(()) => names.push(from_wide(&buf)),
                Err(error) if is_end_of_volume_walk(error.code().0 as u32) => break Ok(()),
                Err(error) => break Err(os_error("FindNextVolumeW", "volumes", error)),
            }
        };
        let _ = FindVolumeClose(find);
        walked?;
    }

    Ok(names)
}

/// Mount points of a volume, e.g. `E:\` or `C:\mnt\cd\`.
fn mount_points(volume_name: &str) -> Result<Vec<String>, HostError> {
    let w = wide(volume_name);
    let mut buf = vec![0u16; 1024];
    let mut needed = 0u32;

    unsafe {
        if GetVolumePathNamesForVolumeNameW(PCWSTR(w.as_ptr()), Some(&mut buf), &mut needed)
            .is_err()
        {
            buf = vec![0u16; needed as usize];
            GetVolumePathNamesForVolumeNameW(PCWSTR(w.as_ptr()), Some(&mut buf), &mut needed)
                .map_err(|error| os_error("GetVolumePathNamesForVolumeNameW", volume_name, error))?;
        }
    }

    // Multi-string: entries separated by NUL, terminated by an empty entry.
    Ok(buf
        .split(|&c| c == 0)
        .take_while(|entry| !entry.is_empty())
        .map(String::from_utf16_lossy)
        .collect())
}

fn is_mounted_at(volume_name: &str, letter: DriveLetter) -> Result<bool, HostError> {
    let root = letter.mount_point();
    Ok(mount_points(volume_name)?
        .iter()
        .any(|path| path.eq_ignore_ascii_case(&root)))
}

fn letter_of(volume_name: &str) -> Result<Option<DriveLetter>, HostError> {
    Ok(mount_points(volume_name)?
        .iter()
        .filter(|path| path.len() == 3 && path.ends_with(":\\"))
        .find_map(|path| path[..2].parse::<DriveLetter>().ok()))
}

/// One record per CD-ROM volume. Lettered volumes are reported by letter,
/// letterless ones by volume GUID path.
pub fn list_optical_drives() -> Result<Vec<OpticalDriveRecord>, HostError> {
    let mut records = Vec::new();
    for name in volume_names()? {
        if !is_cdrom(&name) {
            continue;
        }
        let record = match letter_of(&name)? {
            Some(letter) => OpticalDriveRecord::new(letter.to_string()),
            None => OpticalDriveRecord::new(name),
        };
        records.push(record);
    }
    debug!(count = records.len(), "enumerated optical drives");
    Ok(records)
}

pub fn volume_for_letter(letter: DriveLetter) -> Result<Option<VolumeHandle>, HostError> {
    if !logical_drive_letters().contains(&letter.as_char()) {
        return Ok(None);
    }

    let root = letter.mount_point();
    let w = wide(&root);
    let mut buf = [0u16; VOLUME_NAME_LEN];
    unsafe {
        GetVolumeNameForVolumeMountPointW(PCWSTR(w.as_ptr()), &mut buf)
            .map_err(|error| os_error("GetVolumeNameForVolumeMountPointW", &root, error))?;
    }

    Ok(Some(VolumeHandle {
        device_id: from_wide(&buf),
        drive_letter: Some(letter),
    }))
}

pub fn volume_for_device(device_id: &str) -> Result<Option<VolumeHandle>, HostError> {
    let Some(name) = volume_names()?
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(device_id))
    else {
        return Ok(None);
    };
    let drive_letter = letter_of(&name)?;
    Ok(Some(VolumeHandle {
        device_id: name,
        drive_letter,
    }))
}

/// Moves the volume to `letter`, or removes its letter when `None`.
pub fn set_drive_letter(volume: &VolumeHandle, letter: Option<DriveLetter>) -> Result<(), HostError> {
    for step in mount_plan(volume.drive_letter, letter) {
        match step {
            // A volume can already answer to the new letter as a second mount point.
            MountStep::Mount(new) if is_mounted_at(&volume.device_id, new)? => {}
            MountStep::Mount(new) => {
                let root = new.mount_point();
                let w_root = wide(&root);
                let w_volume = wide(&volume.device_id);
                unsafe {
                    SetVolumeMountPointW(PCWSTR(w_root.as_ptr()), PCWSTR(w_volume.as_ptr()))
                        .map_err(|error| os_error("SetVolumeMountPointW", &root, error))?;
                }
            }
            MountStep::Unmount(old) => {
                let root = old.mount_point();
                let w = wide(&root);
                unsafe {
                    DeleteVolumeMountPointW(PCWSTR(w.as_ptr()))
                        .map_err(|error| os_error("DeleteVolumeMountPointW", &root, error))?;
                }
            }
        }
        debug!(device = %volume.device_id, ?step, "mount point changed");
    }
    Ok(())
}
