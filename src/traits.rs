use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::MmsError;
use crate::mms::types::{DateMatch, DownloadEvent, ExportDate, ExportReport};

/// One session against the balance-account portal, one method per semantic
/// action. Implementations own the browser handle; the provided [`export`]
/// method drives the full per-account sequence over these actions.
///
/// [`export`]: BalancePortal::export
#[async_trait]
pub trait BalancePortal: Send {
    /// Account this session belongs to; download paths and log lines use it.
    fn account(&self) -> &str;

    /// Launch the browser session.
    async fn initialize(&mut self) -> Result<(), MmsError>;

    /// Sign in and wait for the portal title.
    async fn login(&mut self) -> Result<(), MmsError>;

    /// Pick the account in the company-role overlay. `Ok(false)` when no
    /// option text matches exactly.
    async fn select_account(&mut self) -> Result<bool, MmsError>;

    /// Navigate to the balance-account overview and reach its embedded frame.
    async fn open_overview(&mut self) -> Result<(), MmsError>;

    /// Balance-group names currently offered, DOM order, wildcard excluded.
    async fn balance_groups(&mut self) -> Result<Vec<String>, MmsError>;

    /// Select a balance group by exact option text. `Ok(false)` on no match.
    async fn select_balance_group(&mut self, name: &str) -> Result<bool, MmsError>;

    /// Set the day/month/year selects; reports which fields matched.
    async fn set_date(&mut self, date: &ExportDate) -> Result<DateMatch, MmsError>;

    /// Apply the group/date filter.
    async fn apply_filter(&mut self) -> Result<(), MmsError>;

    /// Open the per-group "choices" view.
    async fn open_choices(&mut self) -> Result<(), MmsError>;

    /// Expand the group inside the choices view.
    async fn expand_group(&mut self) -> Result<(), MmsError>;

    /// Trigger the file download; `None` when no file appeared within the
    /// download wait window.
    async fn trigger_download(&mut self) -> Result<Option<PathBuf>, MmsError>;

    /// Navigate back to the overview listing.
    async fn go_back(&mut self) -> Result<(), MmsError>;

    /// Release the browser session.
    async fn close(&mut self) -> Result<(), MmsError>;

    /// Full per-account procedure: login, account selection, then the
    /// select/date/filter/choices/expand/download/back round for every
    /// discovered balance group. The session is closed on success and on
    /// failure; a step error propagates to the caller after the close.
    async fn export(&mut self, date: &ExportDate) -> Result<ExportReport, MmsError> {
        let outcome = export_sequence(self, date).await;
        match outcome {
            Ok(report) => {
                self.close().await?;
                Ok(report)
            }
            Err(err) => {
                if let Err(close_err) = self.close().await {
                    warn!(error = %close_err, "session close failed after step error");
                }
                Err(err)
            }
        }
    }
}

async fn export_sequence<P>(portal: &mut P, date: &ExportDate) -> Result<ExportReport, MmsError>
where
    P: BalancePortal + ?Sized,
{
    portal.initialize().await?;
    portal.login().await?;

    if !portal.select_account().await? {
        warn!(
            account = portal.account(),
            "no company-role option matched the account name"
        );
    }

    portal.open_overview().await?;
    let groups = portal.balance_groups().await?;
    info!(
        account = portal.account(),
        groups = groups.len(),
        "balance groups discovered"
    );

    let mut downloads = Vec::with_capacity(groups.len());
    for group in &groups {
        if !portal.select_balance_group(group).await? {
            warn!(%group, "balance group option no longer present, skipping");
            continue;
        }

        let matched = portal.set_date(date).await?;
        if !matched.complete() {
            warn!(%group, %date, ?matched, "date selects matched partially");
        }

        portal.apply_filter().await?;
        portal.open_choices().await?;
        portal.expand_group().await?;
        let file = portal.trigger_download().await?;
        info!(%group, file = ?file, "download triggered");
        downloads.push(DownloadEvent {
            group: group.clone(),
            file,
        });
        portal.go_back().await?;
    }

    Ok(ExportReport { groups, downloads })
}
