use optical_core::{DiskId, DiskState, Ensure, Host, ManagedDiskInfo, Messages};

use crate::resolver::DriveResolver;
use crate::ReconcileError;

pub struct StateReader<'a, H: ?Sized> {
    resolver: DriveResolver<'a, H>,
}

impl<'a, H: Host + ?Sized> StateReader<'a, H> {
    pub fn new(host: &'a H, messages: &'a Messages) -> Self {
        Self {
            resolver: DriveResolver::new(host, messages),
        }
    }

    pub fn read(&self, disk_id: DiskId) -> Result<DiskState, ReconcileError> {
        let info = self.resolver.resolve(disk_id)?;
        Ok(project(&info))
    }
}

/// A disk only counts as `Present` when it exists and carries a letter.
pub fn project(info: &ManagedDiskInfo) -> DiskState {
    match info.drive_letter() {
        Some(letter) => DiskState {
            disk_id: info.disk_id,
            drive_letter: letter.to_string(),
            ensure: Ensure::Present,
        },
        None => DiskState {
            disk_id: info.disk_id,
            drive_letter: String::new(),
            ensure: Ensure::Absent,
        },
    }
}
