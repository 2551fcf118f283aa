use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::commands::clean::CleanOptions;
use crate::commands::clean_tape_info::TapeInfoMode;
use crate::commands::import_status::ImportStatusOptions;
use crate::commands::set_status::StatusRule;
use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(name = "labcat", version, about = "Batch cleanup for the digital lab catalog")]
pub struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct DryRun {
    /// Compute and report changes without writing the store.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full cleanup pipeline over the record store.
    Clean {
        #[command(flatten)]
        dry_run: DryRun,
        /// Restrict the run to these passes (repeatable).
        #[arg(long = "only", value_name = "PASS")]
        only: Vec<String>,
    },
    /// Split carrier text into tape id and vault location.
    #[command(group(ArgGroup::new("mode").required(true).args(["update_records", "report_problems"])))]
    CleanTapeInfo {
        #[arg(long)]
        update_records: bool,
        #[arg(long)]
        report_problems: bool,
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Fill blank or invalid inventory numbers from file paths.
    ExtractInventory {
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Append rows from a JSON export of the source sheet.
    ImportRows {
        #[arg(long)]
        input: PathBuf,
    },
    /// Apply inventory numbers and status info from a JSON export of the status sheet.
    #[command(group(ArgGroup::new("columns").required(true).multiple(true).args(["inventory_numbers", "status_info"])))]
    ImportStatus {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        inventory_numbers: bool,
        #[arg(long)]
        status_info: bool,
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Update records by id from a JSON file of rows.
    BatchUpdate {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Mark records with a blank inventory number as "Invalid inv no".
    SetEmptyInvNoStatus {
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Mark records with no location at all as "Invalid vault".
    SetEmptyLocationStatus {
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Give every record on a named hard drive the configured location.
    SetHardDriveLocation {
        #[command(flatten)]
        dry_run: DryRun,
    },
    /// Show resolved paths, config and store counts.
    Status,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Clean { .. } => "clean",
            Command::CleanTapeInfo { .. } => "clean-tape-info",
            Command::ExtractInventory { .. } => "extract-inventory",
            Command::ImportRows { .. } => "import-rows",
            Command::ImportStatus { .. } => "import-status",
            Command::BatchUpdate { .. } => "batch-update",
            Command::SetEmptyInvNoStatus { .. } => "set-empty-inv-no-status",
            Command::SetEmptyLocationStatus { .. } => "set-empty-location-status",
            Command::SetHardDriveLocation { .. } => "set-hard-drive-location",
            Command::Status => "status",
        }
    }
}

fn dispatch(command: &Command) -> Result<CommandReport> {
    match command {
        Command::Clean { dry_run, only } => commands::clean::run(&CleanOptions {
            dry_run: dry_run.dry_run,
            only: only.clone(),
        }),
        Command::CleanTapeInfo {
            update_records,
            dry_run,
            ..
        } => {
            let mode = if *update_records {
                TapeInfoMode::UpdateRecords
            } else {
                TapeInfoMode::ReportProblems
            };
            commands::clean_tape_info::run(mode, dry_run.dry_run)
        }
        Command::ExtractInventory { dry_run } => commands::extract_inventory::run(dry_run.dry_run),
        Command::ImportRows { input } => commands::import_rows::run(input),
        Command::ImportStatus {
            input,
            inventory_numbers,
            status_info,
            dry_run,
        } => commands::import_status::run(
            input,
            &ImportStatusOptions {
                inventory_numbers: *inventory_numbers,
                status_info: *status_info,
                dry_run: dry_run.dry_run,
            },
        ),
        Command::BatchUpdate { input, dry_run } => {
            commands::batch_update::run(input, dry_run.dry_run)
        }
        Command::SetEmptyInvNoStatus { dry_run } => {
            commands::set_status::run(StatusRule::EmptyInventoryNumber, dry_run.dry_run)
        }
        Command::SetEmptyLocationStatus { dry_run } => {
            commands::set_status::run(StatusRule::EmptyLocation, dry_run.dry_run)
        }
        Command::SetHardDriveLocation { dry_run } => {
            commands::set_hard_drive_location::run(dry_run.dry_run)
        }
        Command::Status => commands::status::run(),
    }
}

fn render_text(report: &CommandReport) -> String {
    let mut out = format!(
        "{}: {}\n",
        report.command,
        if report.ok { "ok" } else { "issues found" }
    );
    for detail in &report.details {
        out.push_str(&format!("  {detail}\n"));
    }
    for issue in &report.issues {
        out.push_str(&format!("  ! {issue}\n"));
    }
    out
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match dispatch(&cli.command) {
        Ok(report) => report,
        Err(err) => {
            commands::audit_failure(cli.command.name(), &err);
            return Err(err);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    if !report.ok {
        io::stdout().flush()?;
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tape_info_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["labcat", "clean-tape-info"]).is_err());
        assert!(
            Cli::try_parse_from([
                "labcat",
                "clean-tape-info",
                "--update-records",
                "--report-problems"
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["labcat", "clean-tape-info", "--report-problems"]).is_ok());
    }

    #[test]
    fn import_status_needs_a_column_flag() {
        assert!(Cli::try_parse_from(["labcat", "import-status", "--input", "x.json"]).is_err());
        let cli = Cli::try_parse_from([
            "labcat",
            "import-status",
            "--input",
            "x.json",
            "--inventory-numbers",
            "--status-info",
        ])
        .expect("both flags");
        assert_eq!(cli.command.name(), "import-status");
    }

    #[test]
    fn text_report_lists_issues_after_details() {
        let mut report = CommandReport::new("clean-tape-info");
        report.detail("carrier_a: 1 unsupported values");
        report.issue("Carrier A unsupported format: #4: Not on LTO AAB969");
        assert_eq!(
            render_text(&report),
            "clean-tape-info: issues found\n  carrier_a: 1 unsupported values\n  ! Carrier A unsupported format: #4: Not on LTO AAB969\n"
        );
    }
}
