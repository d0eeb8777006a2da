//! In-memory host used by the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use optical_core::{
    DriveLetter, HostError, OpticalDriveRecord, OpticalDriveSource, VirtualDiskProbe,
    VirtualDiskStatus, VolumeHandle, VolumeKey, VolumeStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Find(VolumeKey),
    Probe(String),
    SetLetter(String, Option<DriveLetter>),
}

#[derive(Debug, Clone)]
struct FakeVolume {
    device_id: String,
    // The first letter is the one enumeration reports.
    letters: Vec<DriveLetter>,
}

impl FakeVolume {
    fn letter(&self) -> Option<DriveLetter> {
        self.letters.first().copied()
    }
}

#[derive(Debug, Clone)]
enum DriveEntry {
    Volume(String),
    // A record whose letter has no backing volume.
    Ghost(String),
}

#[derive(Debug, Default)]
struct FakeState {
    volumes: Vec<FakeVolume>,
    drives: Vec<DriveEntry>,
    images: HashMap<String, String>,
    probe_failures: HashMap<String, HostError>,
    find_failure: Option<HostError>,
    set_failure: Option<HostError>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<Call>>,
}

pub(crate) fn volume_id(n: u32) -> String {
    format!(r"\\?\Volume{{{n:08x}-0000-0000-0000-000000000000}}\")
}

pub(crate) fn letter(value: char) -> DriveLetter {
    DriveLetter::new(value).unwrap()
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a physical optical drive.
    pub(crate) fn optical(self, device_id: &str, drive: Option<char>) -> Self {
        self.add_volume(device_id, drive);
        self.state
            .lock()
            .unwrap()
            .drives
            .push(DriveEntry::Volume(device_id.to_string()));
        self
    }

    /// Adds an optical drive backed by an attached disk image.
    pub(crate) fn mounted_image(self, device_id: &str, drive: Option<char>, image: &str) -> Self {
        let host = self.optical(device_id, drive);
        host.state
            .lock()
            .unwrap()
            .images
            .insert(device_id.to_string(), image.to_string());
        host
    }

    /// Adds a non-optical volume.
    pub(crate) fn volume(self, device_id: &str, drive: Option<char>) -> Self {
        self.add_volume(device_id, drive);
        self
    }

    pub(crate) fn ghost_drive(self, drive: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .drives
            .push(DriveEntry::Ghost(drive.to_string()));
        self
    }

    pub(crate) fn failing_probe(self, device_id: &str, error: HostError) -> Self {
        self.state
            .lock()
            .unwrap()
            .probe_failures
            .insert(device_id.to_string(), error);
        self
    }

    /// Gives an existing volume an additional mount letter.
    pub(crate) fn extra_letter(self, device_id: &str, drive: char) -> Self {
        if let Some(volume) = self
            .state
            .lock()
            .unwrap()
            .volumes
            .iter_mut()
            .find(|volume| volume.device_id == device_id)
        {
            volume.letters.push(letter(drive));
        }
        self
    }

    pub(crate) fn failing_find(self, error: HostError) -> Self {
        self.state.lock().unwrap().find_failure = Some(error);
        self
    }

    pub(crate) fn failing_set(self, error: HostError) -> Self {
        self.state.lock().unwrap().set_failure = Some(error);
        self
    }

    pub(crate) fn letter_of(&self, device_id: &str) -> Option<DriveLetter> {
        self.state
            .lock()
            .unwrap()
            .volumes
            .iter()
            .find(|volume| volume.device_id == device_id)
            .and_then(FakeVolume::letter)
    }

    /// Changes a letter behind the engine's back.
    pub(crate) fn set_letter_externally(&self, device_id: &str, drive: Option<char>) {
        let mut state = self.state.lock().unwrap();
        if let Some(volume) = state
            .volumes
            .iter_mut()
            .find(|volume| volume.device_id == device_id)
        {
            volume.letters = drive.map(letter).into_iter().collect();
        }
    }

    pub(crate) fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn add_volume(&self, device_id: &str, drive: Option<char>) {
        self.state.lock().unwrap().volumes.push(FakeVolume {
            device_id: device_id.to_string(),
            letters: drive.map(letter).into_iter().collect(),
        });
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl OpticalDriveSource for FakeHost {
    fn list_optical_drives(&self) -> Result<Vec<OpticalDriveRecord>, HostError> {
        self.record(Call::List);
        let state = self.state.lock().unwrap();
        let records = state
            .drives
            .iter()
            .map(|entry| match entry {
                DriveEntry::Ghost(drive) => OpticalDriveRecord::new(drive.clone()),
                DriveEntry::Volume(device_id) => {
                    let letter = state
                        .volumes
                        .iter()
                        .find(|volume| &volume.device_id == device_id)
                        .and_then(FakeVolume::letter);
                    match letter {
                        Some(letter) => OpticalDriveRecord::new(letter.to_string()),
                        None => OpticalDriveRecord::new(device_id.clone()),
                    }
                }
            })
            .collect();
        Ok(records)
    }
}

impl VolumeStore for FakeHost {
    fn find_volume(&self, key: &VolumeKey) -> Result<Option<VolumeHandle>, HostError> {
        self.record(Call::Find(key.clone()));
        let state = self.state.lock().unwrap();
        if let Some(error) = state.find_failure.clone() {
            return Err(error);
        }
        let found = state.volumes.iter().find_map(|volume| match key {
            VolumeKey::Letter(letter) => volume
                .letters
                .contains(letter)
                .then_some((volume, Some(*letter))),
            VolumeKey::DeviceId(device_id) => {
                (&volume.device_id == device_id).then(|| (volume, volume.letter()))
            }
        });
        Ok(found.map(|(volume, drive_letter)| VolumeHandle {
            device_id: volume.device_id.clone(),
            drive_letter,
        }))
    }

    // Same order as the Windows host: mount the new letter, then drop the old one.
    fn set_drive_letter(
        &self,
        volume: &VolumeHandle,
        letter: Option<DriveLetter>,
    ) -> Result<(), HostError> {
        self.record(Call::SetLetter(volume.device_id.clone(), letter));
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.set_failure.clone() {
            return Err(error);
        }
        if letter.is_some() && letter == volume.drive_letter {
            return Ok(());
        }
        if let Some(letter) = letter {
            let taken = state
                .volumes
                .iter()
                .any(|other| other.letters.contains(&letter) && other.device_id != volume.device_id);
            if taken {
                return Err(HostError::os(
                    "SetVolumeMountPoint",
                    letter.mount_point(),
                    "the drive letter is in use",
                ));
            }
        }
        let target = state
            .volumes
            .iter_mut()
            .find(|other| other.device_id == volume.device_id)
            .ok_or_else(|| HostError::os("SetVolumeMountPoint", &volume.device_id, "no such volume"))?;
        if let Some(letter) = letter {
            if !target.letters.contains(&letter) {
                target.letters.push(letter);
            }
        }
        if let Some(old) = volume.drive_letter {
            target.letters.retain(|existing| *existing != old);
        }
        Ok(())
    }
}

impl VirtualDiskProbe for FakeHost {
    fn probe_virtual_disk(&self, device_path: &str) -> Result<VirtualDiskStatus, HostError> {
        self.record(Call::Probe(device_path.to_string()));
        let state = self.state.lock().unwrap();
        if let Some(error) = state.probe_failures.get(device_path) {
            return Err(error.clone());
        }
        Ok(match state.images.get(device_path) {
            Some(image) => VirtualDiskStatus::Mounted {
                image_path: Some(image.clone()),
            },
            None => VirtualDiskStatus::NotVirtual,
        })
    }
}
