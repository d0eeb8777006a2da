use optical_core::{
    DriveLetter, Messages, OpticalDriveRecord, VirtualDiskProbe, VirtualDiskStatus, VolumeKey,
    VolumeStore,
};
use tracing::{debug, warn};

use crate::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record's drive letter does not match any volume.
    UnresolvedVolume,
    /// The drive is an attached disk image owned by the image-mount resource.
    MountedImage { image_path: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageDecision {
    Manage { device_path: String },
    Skip(SkipReason),
}

impl ManageDecision {
    pub fn is_manageable(&self) -> bool {
        matches!(self, ManageDecision::Manage { .. })
    }
}

/// Decides which optical drive records this resource may touch.
///
/// Anything that cannot be positively identified as physical media is
/// skipped. Only an unexpected probe failure is an error.
pub struct ManagementFilter<'a, H: ?Sized> {
    host: &'a H,
    messages: &'a Messages,
}

impl<'a, H> ManagementFilter<'a, H>
where
    H: VolumeStore + VirtualDiskProbe + ?Sized,
{
    pub fn new(host: &'a H, messages: &'a Messages) -> Self {
        Self { host, messages }
    }

    pub fn can_manage(&self, record: &OpticalDriveRecord) -> Result<ManageDecision, ReconcileError> {
        let Some(device_path) = self.device_path(record) else {
            warn!(
                drive = %record.drive,
                "{}",
                Messages::render(&self.messages.volume_unresolved, &[("drive", &record.drive)])
            );
            return Ok(ManageDecision::Skip(SkipReason::UnresolvedVolume));
        };

        match self.host.probe_virtual_disk(&device_path) {
            Ok(VirtualDiskStatus::NotVirtual) => Ok(ManageDecision::Manage { device_path }),
            Ok(VirtualDiskStatus::Mounted { image_path }) => {
                warn!(
                    device = %device_path,
                    image = image_path.as_deref().unwrap_or(""),
                    "{}",
                    Messages::render(&self.messages.mounted_image, &[("device", &device_path)])
                );
                Ok(ManageDecision::Skip(SkipReason::MountedImage { image_path }))
            }
            Err(source) => Err(ReconcileError::Probe {
                device_path,
                source,
            }),
        }
    }

    fn device_path(&self, record: &OpticalDriveRecord) -> Option<String> {
        if record.has_volume_token() {
            return Some(record.drive.clone());
        }

        let letter = record.drive.parse::<DriveLetter>().ok()?;
        match self.host.find_volume(&VolumeKey::Letter(letter)) {
            Ok(volume) => volume.map(|volume| volume.device_id),
            Err(error) => {
                debug!(drive = %record.drive, %error, "volume lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{letter, volume_id, Call, FakeHost};
    use optical_core::HostError;

    #[test]
    fn manages_physical_drive_with_letter() {
        let host = FakeHost::new().optical(&volume_id(1), Some('E'));
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let decision = filter.can_manage(&OpticalDriveRecord::new("E:")).unwrap();
        assert_eq!(
            decision,
            ManageDecision::Manage {
                device_path: volume_id(1)
            }
        );
    }

    #[test]
    fn probes_volume_token_directly() {
        let host = FakeHost::new().optical(&volume_id(7), None);
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let decision = filter.can_manage(&OpticalDriveRecord::new(volume_id(7))).unwrap();
        assert!(decision.is_manageable());
        assert_eq!(host.take_calls(), vec![Call::Probe(volume_id(7))]);
    }

    #[test]
    fn skips_mounted_image() {
        let host = FakeHost::new()
            .mounted_image(&volume_id(2), Some('F'), r"C:\images\setup.iso")
            .mounted_image(&volume_id(3), None, r"C:\images\tools.iso");
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        for record in [OpticalDriveRecord::new("F:"), OpticalDriveRecord::new(volume_id(3))] {
            let decision = filter.can_manage(&record).unwrap();
            assert!(matches!(
                decision,
                ManageDecision::Skip(SkipReason::MountedImage { image_path: Some(_) })
            ));
        }
    }

    #[test]
    fn skips_unresolvable_letter_without_probing() {
        let host = FakeHost::new().ghost_drive("Q:");
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let decision = filter.can_manage(&OpticalDriveRecord::new("Q:")).unwrap();
        assert_eq!(decision, ManageDecision::Skip(SkipReason::UnresolvedVolume));
        assert!(!host
            .take_calls()
            .iter()
            .any(|call| matches!(call, Call::Probe(_))));
    }

    #[test]
    fn failed_volume_lookup_skips_without_probing() {
        let host = FakeHost::new()
            .optical(&volume_id(1), Some('E'))
            .failing_find(HostError::os("GetVolumeNameForVolumeMountPoint", "E:\\", "device not ready").with_code(21));
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let decision = filter.can_manage(&OpticalDriveRecord::new("E:")).unwrap();
        assert_eq!(decision, ManageDecision::Skip(SkipReason::UnresolvedVolume));
        assert_eq!(
            host.take_calls(),
            vec![Call::Find(VolumeKey::Letter(letter('E')))]
        );
    }

    #[test]
    fn skips_unparseable_drive_token() {
        let host = FakeHost::new();
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let decision = filter.can_manage(&OpticalDriveRecord::new("CdRom0")).unwrap();
        assert_eq!(decision, ManageDecision::Skip(SkipReason::UnresolvedVolume));
    }

    #[test]
    fn unexpected_probe_failure_propagates() {
        let failure = HostError::os("GetStorageDependencyInformation", volume_id(1), "access denied")
            .with_code(5);
        let host = FakeHost::new()
            .optical(&volume_id(1), Some('E'))
            .failing_probe(&volume_id(1), failure.clone());
        let messages = Messages::default();
        let filter = ManagementFilter::new(&host, &messages);

        let err = filter.can_manage(&OpticalDriveRecord::new("E:")).unwrap_err();
        match err {
            ReconcileError::Probe {
                device_path,
                source,
            } => {
                assert_eq!(device_path, volume_id(1));
                assert_eq!(source, failure);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
