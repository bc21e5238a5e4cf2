mod app;
mod campaign_cmd;
mod config_cmd;
mod leads_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use app::AppContext;
use config_cmd::ConfigCommands;

#[derive(Parser)]
#[command(name = "dripforge")]
#[command(about = "dripforge: premium dental lead discovery and drip campaigns")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.dripforge/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb {
        /// Insert sample leads and blacklist entries
        #[arg(long)]
        seed: bool,
    },
    /// Search Google Places for premium practices and store them as leads
    Discover {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Find contact emails on lead websites
    Enrich {
        #[arg(short, long)]
        limit: Option<usize>,
        /// Report what would be stored without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one campaign scheduling pass
    RunCampaign,
    /// Run scheduling passes periodically until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
    /// Send one step to one lead without changing its campaign state
    SendTest {
        lead_id: String,
        #[arg(long, default_value_t = 0)]
        step: u32,
    },
    /// Check SMTP settings and log in to the server
    TestSmtp,
    /// Lead counts per status
    Status,
    /// Export all leads to CSV
    ExportCsv {
        #[arg(short, long, default_value = "data/leads_export.csv")]
        output: PathBuf,
    },
    /// Stop all further outreach to a lead
    OptOut { lead_id: String },
    /// Add a blacklist entry (domain, company_name, phone or email)
    Blacklist {
        kind: String,
        value: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// init-db, discover, enrich, run-campaign, export-csv and status in sequence
    Auto {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = AppContext::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Config { command } => config_cmd::run(&app, command),
        Commands::InitDb { seed } => leads_cmd::init_db(&app, seed).await,
        Commands::Discover { limit } => leads_cmd::discover(&app, limit).await,
        Commands::Enrich { limit, dry_run } => leads_cmd::enrich(&app, limit, dry_run).await,
        Commands::RunCampaign => campaign_cmd::run_once(&app).await,
        Commands::Watch { interval_secs } => campaign_cmd::watch(&app, interval_secs).await,
        Commands::SendTest { lead_id, step } => campaign_cmd::send_test(&app, &lead_id, step).await,
        Commands::TestSmtp => campaign_cmd::test_smtp(&app).await,
        Commands::Status => status_cmd::run(&app).await,
        Commands::ExportCsv { output } => leads_cmd::export(&app, &output).await,
        Commands::OptOut { lead_id } => leads_cmd::opt_out(&app, &lead_id).await,
        Commands::Blacklist {
            kind,
            value,
            reason,
        } => leads_cmd::blacklist(&app, &kind, &value, reason.as_deref()).await,
        Commands::Auto { limit } => run_auto(&app, limit).await,
    }
}

/// The whole pipeline in one go. Discovery and enrichment failures are
/// reported and the pipeline carries on with the leads already stored.
async fn run_auto(app: &AppContext, limit: Option<usize>) -> Result<()> {
    leads_cmd::init_db(app, false).await?;
    if let Err(e) = leads_cmd::discover(app, limit).await {
        terminal_output::note_warn(&format!("Discovery skipped: {e}"));
    }
    if let Err(e) = leads_cmd::enrich(app, limit, false).await {
        terminal_output::note_warn(&format!("Enrichment skipped: {e}"));
    }
    campaign_cmd::run_once(app).await?;
    leads_cmd::export(app, std::path::Path::new("data/leads_export.csv")).await?;
    status_cmd::run(app).await
}
