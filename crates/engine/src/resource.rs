use optical_core::{DesiredState, DiskId, DiskState, DriveLetter, Host, Messages};
use tracing::{debug, info};

use crate::reconciler::{Reconciler, SetOutcome};
use crate::state::StateReader;
use crate::ReconcileError;

/// Get/Test/Set entry points for one optical disk drive-letter resource.
///
/// Every call re-reads the host; the resource keeps no state of its own.
pub struct OpticalDiskDriveLetter<'a, H: ?Sized> {
    host: &'a H,
    messages: &'a Messages,
    revalidate: bool,
}

impl<'a, H: Host + ?Sized> OpticalDiskDriveLetter<'a, H> {
    pub fn new(host: &'a H, messages: &'a Messages) -> Self {
        Self {
            host,
            messages,
            revalidate: false,
        }
    }

    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    pub fn messages(&self) -> &'a Messages {
        self.messages
    }

    /// `drive_letter` is part of the resource key but does not affect the
    /// reported state.
    pub fn get_state(
        &self,
        disk_id: DiskId,
        drive_letter: DriveLetter,
    ) -> Result<DiskState, ReconcileError> {
        debug!(
            %disk_id,
            %drive_letter,
            "{}",
            Messages::render(&self.messages.getting_state, &[("disk_id", &disk_id)])
        );
        StateReader::new(self.host, self.messages).read(disk_id)
    }

    pub fn test_state(&self, desired: &DesiredState) -> Result<bool, ReconcileError> {
        debug!(
            disk_id = %desired.disk_id,
            "{}",
            Messages::render(&self.messages.testing_state, &[("disk_id", &desired.disk_id)])
        );
        self.reconciler().test(desired)
    }

    pub fn set_state(&self, desired: &DesiredState) -> Result<SetOutcome, ReconcileError> {
        info!(
            disk_id = %desired.disk_id,
            "{}",
            Messages::render(&self.messages.setting_state, &[("disk_id", &desired.disk_id)])
        );
        self.reconciler().set(desired)
    }

    fn reconciler(&self) -> Reconciler<'a, H> {
        Reconciler::new(self.host, self.messages).with_revalidation(self.revalidate)
    }
}
