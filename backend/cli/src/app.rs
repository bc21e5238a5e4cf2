//! Wires config into the store, gateway and scheduler used by each command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use dripforge_channels::{DryRunGateway, SmtpGateway, SmtpSettings};
use dripforge_config::{config_dir, config_file_path, load_and_prepare, DripforgeConfig};
use dripforge_core::{DeliveryGateway, LeadStore};
use dripforge_scheduler::{
    CampaignScheduler, RetryPolicy, SenderProfile, StepCatalog, TemplateRenderer,
};
use dripforge_store::SqliteLeadStore;

pub struct AppContext {
    pub config: DripforgeConfig,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Load the config and install the logger it describes.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_file_path(&config_dir()),
        };
        let config = load_and_prepare(&config_path).await?;
        dripforge_logging::init_logger(
            config.logging.level(),
            config.logging.dir.as_deref().map(Path::new),
        );
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn open_store(&self) -> Result<SqliteLeadStore> {
        let path = self.config.database.path();
        SqliteLeadStore::open(path).with_context(|| format!("Failed to open database {path}"))
    }

    /// Dry-run in test mode, SMTP otherwise.
    pub fn build_gateway(&self) -> Result<Arc<dyn DeliveryGateway>> {
        if self.config.campaign.test_mode() {
            info!("Test mode: messages go to the dry-run gateway");
            return Ok(Arc::new(DryRunGateway::new(self.config.dry_run.delay())));
        }
        Ok(Arc::new(SmtpGateway::new(self.smtp_settings()?)?))
    }

    pub fn smtp_settings(&self) -> Result<SmtpSettings> {
        let smtp = &self.config.smtp;
        let (Some(username), Some(password), Some(from_email)) =
            (&smtp.username, &smtp.password, &smtp.from_email)
        else {
            bail!("smtp.username, smtp.password and smtp.from_email are required outside test mode");
        };
        Ok(SmtpSettings {
            host: smtp.host().to_string(),
            port: smtp.port(),
            username: username.clone(),
            password: password.clone(),
            from_email: from_email.clone(),
            from_name: self.config.sender.seller_name().to_string(),
            send_interval: smtp.send_interval(),
        })
    }

    pub fn build_scheduler(&self, store: SqliteLeadStore) -> Result<CampaignScheduler> {
        let campaign = &self.config.campaign;
        let sender = &self.config.sender;

        let catalog = StepCatalog::from_delays(&campaign.step_delays());
        let mut renderer = TemplateRenderer::new(SenderProfile {
            seller_name: sender.seller_name().to_string(),
            company_name: sender.company_name().to_string(),
            default_location: sender.default_location().to_string(),
        });
        if let Some(dir) = &campaign.template_dir {
            renderer = renderer.with_template_dir(dir);
        }

        let store: Arc<dyn LeadStore> = Arc::new(store);
        let scheduler = CampaignScheduler::new(store, self.build_gateway()?, catalog, renderer)
            .context("Campaign templates are not usable; check campaign.template_dir")?;
        Ok(scheduler
            .with_retry_policy(RetryPolicy::new(
                campaign.retry_count(),
                campaign.retry_backoff(),
            ))
            .with_concurrency(campaign.concurrency()))
    }
}
