use optical_core::{
    DesiredState, DriveLetter, Ensure, Host, ManagedDiskInfo, Messages, VolumeHandle, VolumeKey,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::resolver::DriveResolver;
use crate::ReconcileError;

/// The single mutation issued by [`Reconciler::set`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SetOutcome {
    #[serde(rename_all = "camelCase")]
    Assigned {
        device_id: String,
        previous: Option<DriveLetter>,
        letter: DriveLetter,
    },
    #[serde(rename_all = "camelCase")]
    Removed {
        device_id: String,
        previous: Option<DriveLetter>,
    },
    /// Absent was requested for a disk that does not exist.
    NoDevice,
}

/// Compares and converges the drive letter of one optical disk.
///
/// `test` only reads. `set` issues exactly one mutation against the volume it
/// resolves and does not re-check the conditions `test` rejects, unless
/// revalidation is switched on. Neither call is atomic with respect to other
/// actors changing drive letters in between.
pub struct Reconciler<'a, H: ?Sized> {
    host: &'a H,
    resolver: DriveResolver<'a, H>,
    messages: &'a Messages,
    revalidate: bool,
}

impl<'a, H: Host + ?Sized> Reconciler<'a, H> {
    pub fn new(host: &'a H, messages: &'a Messages) -> Self {
        Self {
            host,
            resolver: DriveResolver::new(host, messages),
            messages,
            revalidate: false,
        }
    }

    /// Re-run the letter collision check inside `set` right before mutating.
    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn test(&self, desired: &DesiredState) -> Result<bool, ReconcileError> {
        let current = self.resolver.resolve(desired.disk_id)?;
        let disk_id = desired.disk_id;
        let wanted = desired.drive_letter;

        match desired.ensure {
            Ensure::Absent => match current.drive_letter() {
                None => {
                    debug!(
                        %disk_id,
                        "{}",
                        Messages::render(
                            &self.messages.letter_already_absent,
                            &[("disk_id", &disk_id)]
                        )
                    );
                    Ok(true)
                }
                Some(letter) => {
                    debug!(
                        %disk_id,
                        %letter,
                        "{}",
                        Messages::render(
                            &self.messages.letter_should_be_removed,
                            &[("disk_id", &disk_id), ("letter", &letter)],
                        )
                    );
                    Ok(false)
                }
            },
            Ensure::Present => {
                if !current.is_present() {
                    return Err(ReconcileError::DiskNotFound {
                        disk_id,
                        letter: wanted,
                    });
                }
                if current.drive_letter() == Some(wanted) {
                    debug!(
                        %disk_id,
                        letter = %wanted,
                        "{}",
                        Messages::render(
                            &self.messages.letter_matches,
                            &[("disk_id", &disk_id), ("letter", &wanted)],
                        )
                    );
                    return Ok(true);
                }

                self.ensure_letter_free(desired, &current)?;
                let shown = current
                    .drive_letter()
                    .map(|letter| letter.to_string())
                    .unwrap_or_default();
                debug!(
                    %disk_id,
                    letter = %wanted,
                    current = %shown,
                    "{}",
                    Messages::render(
                        &self.messages.letter_mismatch,
                        &[("disk_id", &disk_id), ("letter", &wanted), ("current", &shown)],
                    )
                );
                Ok(false)
            }
        }
    }

    pub fn set(&self, desired: &DesiredState) -> Result<SetOutcome, ReconcileError> {
        let current = self.resolver.resolve(desired.disk_id)?;
        let disk_id = desired.disk_id;

        let key = match (current.drive_letter(), current.device_id()) {
            (Some(letter), _) => VolumeKey::Letter(letter),
            (None, Some(device_id)) => VolumeKey::DeviceId(device_id.to_string()),
            (None, None) => {
                if desired.ensure == Ensure::Absent {
                    return Ok(SetOutcome::NoDevice);
                }
                return Err(ReconcileError::DiskNotFound {
                    disk_id,
                    letter: desired.drive_letter,
                });
            }
        };
        let volume = self
            .host
            .find_volume(&key)?
            .ok_or_else(|| ReconcileError::VolumeNotLocated {
                disk_id,
                key: key.to_string(),
            })?;
        let previous = current.drive_letter();

        match desired.ensure {
            Ensure::Absent => {
                let shown = previous.map(|letter| letter.to_string()).unwrap_or_default();
                info!(
                    %disk_id,
                    device = %volume.device_id,
                    "{}",
                    Messages::render(
                        &self.messages.removing_letter,
                        &[("disk_id", &disk_id), ("letter", &shown)],
                    )
                );
                self.host.set_drive_letter(&volume, None)?;
                Ok(SetOutcome::Removed {
                    device_id: volume.device_id,
                    previous,
                })
            }
            Ensure::Present => {
                let letter = desired.drive_letter;
                if self.revalidate && previous != Some(letter) {
                    self.ensure_letter_free(desired, &current)?;
                }
                info!(
                    %disk_id,
                    device = %volume.device_id,
                    "{}",
                    Messages::render(
                        &self.messages.assigning_letter,
                        &[("disk_id", &disk_id), ("letter", &letter)],
                    )
                );
                self.host.set_drive_letter(&volume, Some(letter))?;
                Ok(SetOutcome::Assigned {
                    device_id: volume.device_id,
                    previous,
                    letter,
                })
            }
        }
    }

    fn ensure_letter_free(
        &self,
        desired: &DesiredState,
        current: &ManagedDiskInfo,
    ) -> Result<(), ReconcileError> {
        let owner = self
            .host
            .find_volume(&VolumeKey::Letter(desired.drive_letter))?;
        match owner {
            Some(owner) if !is_same_volume(current, &owner) => {
                Err(ReconcileError::LetterConflict {
                    disk_id: desired.disk_id,
                    letter: desired.drive_letter,
                    owner: owner.device_id,
                })
            }
            _ => Ok(()),
        }
    }
}

// Lookups report volumes by GUID path; a volume may hold several letters.
fn is_same_volume(current: &ManagedDiskInfo, owner: &VolumeHandle) -> bool {
    current
        .volume_path()
        .is_some_and(|path| path.eq_ignore_ascii_case(&owner.device_id))
}
