use optical_core::{DiskId, DriveLetter, Host, ManagedDiskInfo, Messages, OpticalDriveRecord};
use tracing::debug;

use crate::filter::{ManageDecision, ManagementFilter};
use crate::ReconcileError;

/// A drive that passed the management filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManageableDrive {
    pub record: OpticalDriveRecord,
    /// Volume GUID path the filter probed.
    pub device_path: String,
}

/// Maps a 1-based disk id onto the host's manageable optical drives.
///
/// The mapping is positional over a freshly fetched, filtered enumeration.
/// Nothing is cached: drives can appear, vanish or change letters between
/// calls.
pub struct DriveResolver<'a, H: ?Sized> {
    host: &'a H,
    filter: ManagementFilter<'a, H>,
    messages: &'a Messages,
}

impl<'a, H: Host + ?Sized> DriveResolver<'a, H> {
    pub fn new(host: &'a H, messages: &'a Messages) -> Self {
        Self {
            host,
            filter: ManagementFilter::new(host, messages),
            messages,
        }
    }

    pub fn resolve(&self, disk_id: DiskId) -> Result<ManagedDiskInfo, ReconcileError> {
        let Some(ManageableDrive {
            record,
            device_path,
        }) = self
            .manageable_drives()?
            .into_iter()
            .nth(disk_id.position())
        else {
            debug!(
                %disk_id,
                "{}",
                Messages::render(&self.messages.disk_not_found, &[("disk_id", &disk_id)])
            );
            return Ok(ManagedDiskInfo::not_found(disk_id));
        };

        // Letterless drives are reported by volume GUID path, which is not a letter.
        let letter = record.drive.parse::<DriveLetter>().ok();
        let shown = letter.map(|letter| letter.to_string()).unwrap_or_default();
        debug!(
            %disk_id,
            device = %record.drive,
            "{}",
            Messages::render(
                &self.messages.disk_resolved,
                &[("disk_id", &disk_id), ("device", &record.drive), ("letter", &shown)],
            )
        );
        Ok(ManagedDiskInfo::found(disk_id, record.drive, device_path, letter))
    }

    /// Optical drives that pass the management filter, in enumeration order.
    pub fn manageable_drives(&self) -> Result<Vec<ManageableDrive>, ReconcileError> {
        let records = self.host.list_optical_drives()?;
        let mut manageable = Vec::with_capacity(records.len());
        for record in records {
            if let ManageDecision::Manage { device_path } = self.filter.can_manage(&record)? {
                manageable.push(ManageableDrive {
                    record,
                    device_path,
                });
            }
        }
        Ok(manageable)
    }
}
