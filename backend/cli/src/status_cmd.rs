//! Lead counts per status.

use anyhow::Result;

use dripforge_core::LeadStatus;

use crate::app::AppContext;
use crate::terminal_output::{render_table, Column, BOLD, RESET};

pub async fn run(app: &AppContext) -> Result<()> {
    let store = app.open_store()?;
    let counts = store.status_counts().await?;
    let attempts = store.attempt_count().await?;
    println!("\n{BOLD}dripforge status{RESET}\n");
    print!("{}", render_counts(&counts));
    println!("\nDelivery attempts recorded: {attempts}\n");
    Ok(())
}

fn render_counts(counts: &[(LeadStatus, usize)]) -> String {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let mut rows: Vec<Vec<String>> = counts
        .iter()
        .map(|(status, n)| vec![status.as_str().to_string(), n.to_string()])
        .collect();
    rows.push(vec!["total".to_string(), total.to_string()]);
    render_table(&[Column::left("Status"), Column::right("Leads")], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_every_status() {
        let counts = vec![
            (LeadStatus::New, 4),
            (LeadStatus::InProgress, 2),
            (LeadStatus::Completed, 1),
        ];
        let table = crate::terminal_output::strip_ansi(&render_counts(&counts));
        assert!(table.contains("in_progress"));
        assert!(table.lines().any(|l| l.contains("total") && l.trim_end().ends_with('7')));
    }
}
