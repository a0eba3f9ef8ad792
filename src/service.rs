use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::sleep;
use tower::Service;
use tracing::{info, warn};

use crate::config::MmsConfig;
use crate::error::MmsError;
use crate::mms::scraper::MmsScraper;
use crate::mms::types::{default_export_date, ExportDate, ExportReport};
use crate::traits::BalancePortal;

/// Pause before the single per-account retry.
const RETRY_DELAY_SECS: u64 = 10;

/// One account's export request.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub account: String,
    pub username: String,
    pub password: String,
    pub date: ExportDate,
    pub download_root: PathBuf,
    pub headless: bool,
    pub debug: bool,
}

impl ExportRequest {
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
            date: default_export_date(),
            download_root: PathBuf::from("data"),
            headless: true,
            debug: false,
        }
    }

    pub fn with_date(mut self, date: ExportDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_download_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_root = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl From<ExportRequest> for MmsConfig {
    fn from(req: ExportRequest) -> Self {
        MmsConfig::new(req.account, req.username, req.password)
            .with_download_root(req.download_root)
            .with_headless(req.headless)
            .with_debug(req.debug)
    }
}

/// One account's export outcome.
#[derive(Debug)]
pub struct ExportResult {
    pub account: String,
    pub report: ExportReport,
}

/// Runs the full account procedure, and once more after a fixed pause if the
/// first pass failed with a retryable error. A fresh portal is built per
/// attempt since a failed pass closes its session. A second failure
/// propagates to the caller.
pub async fn export_with_retry<P, F>(
    mut make_portal: F,
    date: &ExportDate,
    retry_delay: Duration,
) -> Result<ExportReport, MmsError>
where
    P: BalancePortal,
    F: FnMut() -> P,
{
    let mut portal = make_portal();
    match portal.export(date).await {
        Ok(report) => Ok(report),
        Err(err) if err.is_retryable() => {
            warn!(
                account = portal.account(),
                error = %err,
                delay = ?retry_delay,
                "export failed, retrying once"
            );
            sleep(retry_delay).await;

            let mut portal = make_portal();
            portal.export(date).await
        }
        Err(err) => Err(err),
    }
}

/// tower::Service front over the scraper.
#[derive(Debug, Clone, Default)]
pub struct MmsService {
    // room for rate limiting / session reuse
}

impl MmsService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ExportRequest> for MmsService {
    type Response = ExportResult;
    type Error = MmsError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExportRequest) -> Self::Future {
        info!(account = %req.account, date = %req.date, "export request received");

        Box::pin(async move {
            let date = req.date.clone();
            let account = req.account.clone();
            let config: MmsConfig = req.into();

            let report = export_with_retry(
                || MmsScraper::new(config.clone()),
                &date,
                Duration::from_secs(RETRY_DELAY_SECS),
            )
            .await?;

            info!(
                account = %account,
                groups = report.groups.len(),
                downloads = report.downloads.len(),
                "export completed"
            );

            Ok(ExportResult { account, report })
        })
    }
}
