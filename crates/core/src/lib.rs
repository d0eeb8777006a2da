use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;

pub mod document;
pub mod error;
pub mod host;
pub mod messages;

pub use document::{load_config_document, ConfigDocument, CONFIG_SCHEMA_VERSION};
pub use error::{CoreError, HostError};
pub use host::{
    Host, OpticalDriveSource, VirtualDiskProbe, VirtualDiskStatus, VolumeHandle, VolumeKey,
    VolumeStore,
};
pub use messages::Messages;

/// 1-based position of a manageable optical disk in the host's drive enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDiskId", into = "String")]
pub struct DiskId(NonZeroU32);

impl DiskId {
    pub fn new(value: u32) -> Result<Self, CoreError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidDiskId(value.to_string()))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Zero-based index into the filtered drive sequence.
    pub fn position(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl FromStr for DiskId {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<NonZeroU32>()
            .map(Self)
            .map_err(|_| CoreError::InvalidDiskId(value.to_string()))
    }
}

impl fmt::Display for DiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DiskId> for String {
    fn from(value: DiskId) -> Self {
        value.to_string()
    }
}

// Documents may carry the id as "1" or as 1.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDiskId {
    Text(String),
    Number(u64),
}

impl TryFrom<RawDiskId> for DiskId {
    type Error = CoreError;

    fn try_from(raw: RawDiskId) -> Result<Self, Self::Error> {
        match raw {
            RawDiskId::Text(text) => text.parse(),
            RawDiskId::Number(number) => u32::try_from(number)
                .map_err(|_| CoreError::InvalidDiskId(number.to_string()))
                .and_then(DiskId::new),
        }
    }
}

/// A single drive letter, stored uppercase and rendered with its colon (`E:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriveLetter(char);

impl DriveLetter {
    pub fn new(letter: char) -> Result<Self, CoreError> {
        if letter.is_ascii_alphabetic() {
            Ok(Self(letter.to_ascii_uppercase()))
        } else {
            Err(CoreError::InvalidDriveLetter(letter.to_string()))
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }

    /// Root mount point form used by the volume APIs, e.g. `E:\`.
    pub fn mount_point(self) -> String {
        format!("{}:\\", self.0)
    }
}

impl FromStr for DriveLetter {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.as_str()) {
            (Some(letter), "" | ":") if letter.is_ascii_alphabetic() => {
                Ok(Self(letter.to_ascii_uppercase()))
            }
            _ => Err(CoreError::InvalidDriveLetter(value.to_string())),
        }
    }
}

impl TryFrom<String> for DriveLetter {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DriveLetter> for String {
    fn from(value: DriveLetter) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ensure {
    #[default]
    #[serde(alias = "present")]
    Present,
    #[serde(alias = "absent")]
    Absent,
}

impl FromStr for Ensure {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Ensure::Present),
            "absent" => Ok(Ensure::Absent),
            _ => Err(CoreError::InvalidEnsure(value.to_string())),
        }
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => f.write_str("Present"),
            Ensure::Absent => f.write_str("Absent"),
        }
    }
}

/// One optical drive as reported by the OS device enumeration.
///
/// `drive` is either a drive-letter token (`E:`) or, when the drive has no
/// letter, the volume GUID path (`\\?\Volume{...}\`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpticalDriveRecord {
    pub drive: String,
}

impl OpticalDriveRecord {
    pub fn new(drive: impl Into<String>) -> Self {
        Self {
            drive: drive.into(),
        }
    }

    pub fn has_volume_token(&self) -> bool {
        is_volume_guid_path(&self.drive)
    }
}

pub fn is_volume_guid_path(token: &str) -> bool {
    token.len() > r"\\?\Volume{}\".len()
        && token.starts_with(r"\\?\Volume{")
        && token.ends_with("}\\")
}

/// Device backing a resolved disk id. A device always has an identity; the
/// letter is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDevice {
    /// Raw enumeration token: a letter (`E:`) or a volume GUID path.
    pub device_id: String,
    /// Volume GUID path, the identity volume lookups report.
    pub volume_path: String,
    pub drive_letter: Option<DriveLetter>,
}

/// Fresh view of one disk id. `device` is `None` when the id matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskInfo {
    pub disk_id: DiskId,
    pub device: Option<ResolvedDevice>,
}

impl ManagedDiskInfo {
    pub fn not_found(disk_id: DiskId) -> Self {
        Self {
            disk_id,
            device: None,
        }
    }

    pub fn found(
        disk_id: DiskId,
        device_id: impl Into<String>,
        volume_path: impl Into<String>,
        drive_letter: Option<DriveLetter>,
    ) -> Self {
        Self {
            disk_id,
            device: Some(ResolvedDevice {
                device_id: device_id.into(),
                volume_path: volume_path.into(),
                drive_letter,
            }),
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device.as_ref().map(|device| device.device_id.as_str())
    }

    pub fn volume_path(&self) -> Option<&str> {
        self.device.as_ref().map(|device| device.volume_path.as_str())
    }

    pub fn drive_letter(&self) -> Option<DriveLetter> {
        self.device.as_ref().and_then(|device| device.drive_letter)
    }

    pub fn is_present(&self) -> bool {
        self.device.is_some()
    }
}

/// Observable state reported by `GetState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskState {
    pub disk_id: DiskId,
    pub drive_letter: String,
    pub ensure: Ensure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    pub disk_id: DiskId,
    pub drive_letter: DriveLetter,
    #[serde(default)]
    pub ensure: Ensure,
}

impl DesiredState {
    pub fn new(disk_id: DiskId, drive_letter: DriveLetter, ensure: Ensure) -> Self {
        Self {
            disk_id,
            drive_letter,
            ensure,
        }
    }

    pub fn parse(disk_id: &str, drive_letter: &str, ensure: Ensure) -> Result<Self, CoreError> {
        Ok(Self::new(disk_id.parse()?, drive_letter.parse()?, ensure))
    }
}

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
