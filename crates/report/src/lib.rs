use anyhow::{Context, Result};
use optical_core::{now_utc_rfc3339, CONFIG_SCHEMA_VERSION};
use optical_engine::ApplyResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ReportPaths {
    pub run_id: String,
    pub root: PathBuf,
    pub run_json: PathBuf,
    pub results_json: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunMetadata {
    run_id: String,
    created_at_utc: String,
    config_schema_version: String,
    source: Option<String>,
    dry_run: bool,
    succeeded: bool,
    entries: usize,
}

/// Writes `reports/<run-id>/run.json` and `results.json` under `base`.
pub fn create_apply_report(
    base: impl AsRef<Path>,
    source: Option<&Path>,
    result: &ApplyResult,
) -> Result<ReportPaths> {
    let run_id = Uuid::new_v4().to_string();
    let root = base.as_ref().join("reports").join(&run_id);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("create report directory {}", root.display()))?;

    let run_json = root.join("run.json");
    let results_json = root.join("results.json");

    let run_meta = RunMetadata {
        run_id: run_id.clone(),
        created_at_utc: now_utc_rfc3339(),
        config_schema_version: CONFIG_SCHEMA_VERSION.to_string(),
        source: source.map(|path| path.display().to_string()),
        dry_run: result.dry_run,
        succeeded: result.succeeded(),
        entries: result.entries.len(),
    };
    std::fs::write(&run_json, serde_json::to_string_pretty(&run_meta)?)?;
    std::fs::write(&results_json, serde_json::to_string_pretty(result)?)?;

    Ok(ReportPaths {
        run_id,
        root,
        run_json,
        results_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use optical_core::{DesiredState, Ensure};
    use optical_engine::{EntryOutcome, EntryResult};

    #[test]
    fn writes_run_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let result = ApplyResult {
            dry_run: true,
            entries: vec![EntryResult {
                resource: DesiredState::parse("1", "E", Ensure::Present).unwrap(),
                outcome: EntryOutcome::WouldChange,
            }],
        };

        let paths = create_apply_report(dir.path(), Some(Path::new("drives.json")), &result).unwrap();
        assert!(paths.root.starts_with(dir.path().join("reports")));

        let run: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.run_json).unwrap()).unwrap();
        assert_eq!(run["runId"], paths.run_id.as_str());
        assert_eq!(run["dryRun"], true);
        assert_eq!(run["succeeded"], true);
        assert_eq!(run["source"], "drives.json");

        let results: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.results_json).unwrap()).unwrap();
        assert_eq!(results["entries"][0]["outcome"]["status"], "wouldChange");
    }
}
