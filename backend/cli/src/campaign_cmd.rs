//! Campaign scheduling commands.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use dripforge_channels::SmtpGateway;
use dripforge_scheduler::PassReport;

use crate::app::AppContext;
use crate::terminal_output::{note_info, note_success, note_warn, render_table, Column};

pub async fn run_once(app: &AppContext) -> Result<()> {
    let scheduler = app.build_scheduler(app.open_store()?)?;
    let report = scheduler.run_pass().await?;
    print!("{}", render_report(&report));
    if report.changed_anything() {
        note_success("Campaign pass complete");
    } else {
        note_info("Nothing was due");
    }
    Ok(())
}

/// Periodic passes until Ctrl-C. The pass in flight finishes the lead it is
/// on before exiting.
pub async fn watch(app: &AppContext, interval_secs: u64) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = app
        .build_scheduler(app.open_store()?)?
        .with_shutdown(shutdown_rx.clone());

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping after the current lead"),
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    note_info(&format!("Watching campaign every {interval_secs}s; Ctrl-C to stop"));
    let passes = scheduler
        .run_periodic(Duration::from_secs(interval_secs.max(1)), shutdown_rx)
        .await;
    note_success(&format!("Stopped after {passes} passes"));
    Ok(())
}

/// Check SMTP settings and, outside test mode, log in to the server.
pub async fn test_smtp(app: &AppContext) -> Result<()> {
    let smtp = &app.config.smtp;
    if app.config.campaign.test_mode() {
        match app.smtp_settings() {
            Ok(settings) => note_info(&format!(
                "SMTP settings complete for {}:{}; test mode is on, so no connection was made",
                settings.host, settings.port
            )),
            Err(e) => note_warn(&format!("{e}; test mode is on, so nothing will be sent")),
        }
        return Ok(());
    }

    let gateway = SmtpGateway::new(app.smtp_settings()?)?;
    gateway.test_connection().await?;
    note_success(&format!("Logged in to {}:{}", smtp.host(), smtp.port()));
    Ok(())
}

/// Send one step to one lead without touching its campaign state.
pub async fn send_test(app: &AppContext, lead_id: &str, step: u32) -> Result<()> {
    let scheduler = app.build_scheduler(app.open_store()?)?;
    let message = scheduler.send_single(lead_id, step).await?;
    if app.config.campaign.test_mode() {
        note_info(&format!("Test mode: step {step} prepared, subject: {}", message.subject));
    } else {
        note_success(&format!("Step {step} sent, subject: {}", message.subject));
    }
    Ok(())
}

pub fn render_report(report: &PassReport) -> String {
    let rows = [
        ("evaluated", report.evaluated),
        ("advanced", report.advanced),
        ("completed", report.completed),
        ("failed", report.failed),
        ("not due", report.not_due),
        ("conflicts", report.conflicts),
        ("no email", report.skipped_no_contact),
        ("errors", report.errors),
        ("cancelled", report.cancelled),
    ]
    .into_iter()
    .map(|(label, n)| vec![label.to_string(), n.to_string()])
    .collect::<Vec<_>>();
    render_table(&[Column::left("Pass"), Column::right("Leads")], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_every_counter() {
        let report = PassReport {
            evaluated: 5,
            advanced: 3,
            failed: 1,
            ..Default::default()
        };
        let table = crate::terminal_output::strip_ansi(&render_report(&report));
        assert!(table.contains("evaluated"));
        assert!(table.contains("cancelled"));
        assert!(table.lines().any(|l| l.contains("advanced") && l.trim_end().ends_with('3')));
    }
}
