use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::DesiredState;

pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// A list of drive-letter resources to bring into their desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub resources: Vec<DesiredState>,
}

fn default_schema_version() -> String {
    CONFIG_SCHEMA_VERSION.to_string()
}

/// Loads a document from JSON, or from YAML when the extension is `.yaml`/`.yml`.
pub fn load_config_document(path: impl AsRef<Path>) -> Result<ConfigDocument> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read configuration {}", path.display()))?;
    let document: ConfigDocument = if is_yaml(path) {
        serde_yaml::from_str(&data)
            .with_context(|| format!("parse configuration {}", path.display()))?
    } else {
        serde_json::from_str(&data)
            .with_context(|| format!("parse configuration {}", path.display()))?
    };
    check_schema_version(&document.schema_version)?;
    Ok(document)
}

fn check_schema_version(version: &str) -> Result<()> {
    let major = |value: &str| value.split('.').next().map(str::to_string);
    if major(version) != major(CONFIG_SCHEMA_VERSION) {
        return Err(anyhow!(
            "unsupported configuration schema version {version} (expected {CONFIG_SCHEMA_VERSION})"
        ));
    }
    Ok(())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}
