use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

/// Diagnostic message templates, handed to the engine at construction.
///
/// Templates name their arguments as `{disk_id}`, `{letter}`, `{current}`,
/// `{drive}` and `{device}`. Keys missing from an override file keep their
/// English default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Messages {
    pub getting_state: String,
    pub testing_state: String,
    pub setting_state: String,
    pub volume_unresolved: String,
    pub mounted_image: String,
    pub disk_resolved: String,
    pub disk_not_found: String,
    pub letter_matches: String,
    pub letter_mismatch: String,
    pub letter_should_be_removed: String,
    pub letter_already_absent: String,
    pub assigning_letter: String,
    pub removing_letter: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            getting_state: "Getting the drive letter of optical disk {disk_id}.".to_string(),
            testing_state: "Testing the drive letter of optical disk {disk_id}.".to_string(),
            setting_state: "Setting the drive letter of optical disk {disk_id}.".to_string(),
            volume_unresolved:
                "No volume matches optical drive {drive}; it will not be managed.".to_string(),
            mounted_image:
                "Optical drive {device} is a mounted disk image; it will not be managed."
                    .to_string(),
            disk_resolved:
                "Optical disk {disk_id} is device {device} with drive letter '{letter}'."
                    .to_string(),
            disk_not_found: "Optical disk {disk_id} was not found.".to_string(),
            letter_matches: "Optical disk {disk_id} already has drive letter {letter}.".to_string(),
            letter_mismatch:
                "Optical disk {disk_id} has drive letter '{current}' but should have {letter}."
                    .to_string(),
            letter_should_be_removed:
                "Optical disk {disk_id} has drive letter {letter} but should have none.".to_string(),
            letter_already_absent: "Optical disk {disk_id} has no drive letter.".to_string(),
            assigning_letter: "Assigning drive letter {letter} to optical disk {disk_id}."
                .to_string(),
            removing_letter: "Removing drive letter {letter} from optical disk {disk_id}."
                .to_string(),
        }
    }
}

impl Messages {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read message bundle {}", path.display()))?;
        let messages = serde_json::from_str(&data)
            .with_context(|| format!("parse message bundle {}", path.display()))?;
        Ok(messages)
    }

    /// Substitutes each `{name}` in `template` with its value.
    pub fn render(template: &str, args: &[(&str, &dyn Display)]) -> String {
        args.iter().fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), &value.to_string())
        })
    }
}
