//! Drive-letter reconciliation for optical disk drives.
//!
//! Disks are addressed by their 1-based position among the host's manageable
//! optical drives. Drives backed by mounted disk images are never counted.

pub mod apply;
mod error;
pub mod filter;
pub mod reconciler;
pub mod resolver;
pub mod resource;
pub mod state;

#[cfg(test)]
mod fake;

pub use apply::{apply_document, ApplyResult, EntryOutcome, EntryResult};
pub use error::ReconcileError;
pub use filter::{ManageDecision, ManagementFilter, SkipReason};
pub use reconciler::{Reconciler, SetOutcome};
pub use resolver::DriveResolver;
pub use resource::OpticalDiskDriveLetter;
pub use state::StateReader;
