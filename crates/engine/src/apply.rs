use optical_core::{ConfigDocument, DesiredState, Host};
use serde::Serialize;
use tracing::{info, warn};

use crate::reconciler::SetOutcome;
use crate::resource::OpticalDiskDriveLetter;
use crate::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EntryOutcome {
    InDesiredState,
    WouldChange,
    Converged { outcome: SetOutcome },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResult {
    pub resource: DesiredState,
    pub outcome: EntryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub dry_run: bool,
    pub entries: Vec<EntryResult>,
}

impl ApplyResult {
    pub fn succeeded(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|entry| matches!(entry.outcome, EntryOutcome::Failed { .. }))
    }
}

/// Brings every resource in `document` into its desired state, in order.
///
/// A failing entry is recorded and does not stop the entries after it.
pub fn apply_document<H: Host + ?Sized>(
    resource: &OpticalDiskDriveLetter<'_, H>,
    document: &ConfigDocument,
    dry_run: bool,
) -> ApplyResult {
    let entries = document
        .resources
        .iter()
        .map(|desired| {
            let outcome = match apply_entry(resource, desired, dry_run) {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(disk_id = %desired.disk_id, %error, "resource failed");
                    EntryOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            };
            EntryResult {
                resource: desired.clone(),
                outcome,
            }
        })
        .collect();

    ApplyResult { dry_run, entries }
}

fn apply_entry<H: Host + ?Sized>(
    resource: &OpticalDiskDriveLetter<'_, H>,
    desired: &DesiredState,
    dry_run: bool,
) -> Result<EntryOutcome, ReconcileError> {
    if resource.test_state(desired)? {
        return Ok(EntryOutcome::InDesiredState);
    }
    if dry_run {
        info!(disk_id = %desired.disk_id, "dry run: drive letter would change");
        return Ok(EntryOutcome::WouldChange);
    }

    let outcome = resource.set_state(desired)?;
    if !resource.test_state(desired)? {
        return Err(ReconcileError::NotConverged {
            disk_id: desired.disk_id,
        });
    }
    Ok(EntryOutcome::Converged { outcome })
}
