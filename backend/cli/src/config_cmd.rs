//! `config show` and `config validate`.

use anyhow::{bail, Result};
use clap::Subcommand;

use dripforge_config::{redacted_config, validate, ValidationReport};

use crate::app::AppContext;
use crate::terminal_output::{note_error, note_success, note_warn};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config with secrets masked
    Show,
    /// Check the config and list every problem found
    Validate,
}

pub fn run(app: &AppContext, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            println!("# {}", app.config_path.display());
            println!("{}", serde_json::to_string_pretty(&redacted_config(&app.config)?)?);
            Ok(())
        }
        ConfigCommands::Validate => {
            let report = validate(&app.config);
            print_report(&report);
            if !report.is_valid() {
                bail!("{} config error(s) in {}", report.errors.len(), app.config_path.display());
            }
            Ok(())
        }
    }
}

fn print_report(report: &ValidationReport) {
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if report.is_valid() {
        note_success(&format!("Config is valid ({} warnings)", report.warnings.len()));
    }
}
