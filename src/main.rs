use tower::Service;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mms_scraper::{ExportDate, ExportRequest, MmsError, MmsService, DEFAULT_EXPORT_DATE, PRODUCT_ACCOUNTS};

/// Exports every product account for the fixed target date. An account that
/// fails twice aborts the run, as there is no point hammering a broken
/// portal session across the remaining accounts.
#[tokio::main]
async fn main() -> Result<(), MmsError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let username = std::env::var("USER").unwrap_or_default();
    let password = std::env::var("PASSWORD").unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        warn!("USER/PASSWORD not set, signing in with empty credentials");
    }

    let date = ExportDate::parse(DEFAULT_EXPORT_DATE)?;
    let mut service = MmsService::new();

    for account in PRODUCT_ACCOUNTS {
        let request = ExportRequest::new(account, &username, &password).with_date(date.clone());
        let result = service.call(request).await?;
        info!(
            account = %result.account,
            groups = result.report.groups.len(),
            downloads = result.report.downloads.len(),
            "account done"
        );
    }

    info!("all accounts processed");
    Ok(())
}
