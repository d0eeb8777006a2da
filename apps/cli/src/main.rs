use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use optical_core::{load_config_document, DesiredState, DiskId, DriveLetter, Ensure, Messages};
use optical_engine::{apply_document, OpticalDiskDriveLetter};
use optical_host_windows::WindowsHost;
use optical_report::create_apply_report;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

mod logging;

/// Keeps the drive letter of optical (CD/DVD) drives in a declared state
#[derive(Parser)]
#[command(name = "optical-drive-letter", version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// JSON file overriding diagnostic message templates
    #[arg(long, global = true)]
    messages: Option<PathBuf>,

    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    /// 1-based position among the manageable optical drives
    #[arg(long)]
    disk_id: DiskId,

    /// Drive letter, with or without the trailing colon
    #[arg(long)]
    drive_letter: DriveLetter,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the current drive letter of an optical disk
    Get {
        #[command(flatten)]
        target: Target,
    },
    /// Check whether an optical disk is in the desired state
    Test {
        #[command(flatten)]
        target: Target,
        /// Present or Absent
        #[arg(long, default_value = "Present")]
        ensure: Ensure,
    },
    /// Assign or remove the drive letter of an optical disk
    Set {
        #[command(flatten)]
        target: Target,
        /// Present or Absent
        #[arg(long, default_value = "Present")]
        ensure: Ensure,
        /// Re-check for a conflicting volume right before changing the letter
        #[arg(long)]
        revalidate: bool,
    },
    /// Bring every resource in a JSON or YAML configuration document into its desired state
    Apply {
        /// Configuration document
        #[arg(long)]
        file: PathBuf,
        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
        /// Re-check for a conflicting volume right before changing a letter
        #[arg(long)]
        revalidate: bool,
        /// Write a report bundle under <dir>/reports/<run-id>
        #[arg(long)]
        report_base: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TestOutput {
    disk_id: DiskId,
    in_desired_state: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let messages = match &cli.messages {
        Some(path) => Messages::load(path)?,
        None => Messages::default(),
    };
    let host = WindowsHost::new();

    match cli.command {
        Commands::Get { target } => {
            let resource = OpticalDiskDriveLetter::new(&host, &messages);
            let state = resource.get_state(target.disk_id, target.drive_letter)?;
            print_json(&state, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Test { target, ensure } => {
            let resource = OpticalDiskDriveLetter::new(&host, &messages);
            let desired = DesiredState::new(target.disk_id, target.drive_letter, ensure);
            let in_desired_state = resource.test_state(&desired)?;
            print_json(
                &TestOutput {
                    disk_id: desired.disk_id,
                    in_desired_state,
                },
                cli.pretty,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Set {
            target,
            ensure,
            revalidate,
        } => {
            let resource =
                OpticalDiskDriveLetter::new(&host, &messages).with_revalidation(revalidate);
            let desired = DesiredState::new(target.disk_id, target.drive_letter, ensure);
            let outcome = resource.set_state(&desired)?;
            print_json(&outcome, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply {
            file,
            dry_run,
            revalidate,
            report_base,
        } => {
            let document = load_config_document(&file)?;
            let resource =
                OpticalDiskDriveLetter::new(&host, &messages).with_revalidation(revalidate);
            let result = apply_document(&resource, &document, dry_run);
            if let Some(base) = report_base {
                let report = create_apply_report(&base, Some(&file), &result)
                    .context("write apply report")?;
                tracing::info!(root = %report.root.display(), "report written");
            }
            print_json(&result, cli.pretty)?;
            Ok(if result.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}
