use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::MmsConfig;
use crate::error::MmsError;
use crate::mms::page::{
    self, exact_match_index, filter_group_names, ACCOUNT_SELECTOR, BACK_LINK_XPATH,
    CHOICES_LINK_XPATH, DAY_SELECT, DOWNLOAD_BUTTON_XPATH, EXPAND_GROUP_XPATH, FILTER_BUTTON_ID,
    GROUP_SELECT, LOGIN_PANEL_HEADER, LOGIN_SUBMIT, MONTH_SELECT, OVERVIEW_FRAME, OVERVIEW_PATH,
    PASSWORD_INPUT, SIGN_IN_PATH, TITLE_MARKER, USERNAME_INPUT, YEAR_SELECT,
};
use crate::mms::types::{DateMatch, ExportDate};
use crate::traits::BalancePortal;

/// Human-like pause between interactions, re-sampled at every wait point.
const STEP_DELAY_MIN_MS: u64 = 1600;
const STEP_DELAY_MAX_MS: u64 = 3800;

/// Extra settle time after the filter reloads the result table.
const FILTER_SETTLE_SECS: u64 = 2;

const DOWNLOAD_WAIT_SECS: u64 = 30;
const POLL_INTERVAL_MS: u64 = 500;

/// Browser session against the MMS portal for one business account.
pub struct MmsScraper {
    config: MmsConfig,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl MmsScraper {
    pub fn new(config: MmsConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
        }
    }

    fn get_page(&self) -> Result<&Arc<Page>, MmsError> {
        self.page
            .as_ref()
            .ok_or_else(|| MmsError::BrowserInit("browser is not initialized".into()))
    }

    async fn pause(&self) {
        let millis = rand::thread_rng().gen_range(STEP_DELAY_MIN_MS..=STEP_DELAY_MAX_MS);
        sleep(Duration::from_millis(millis)).await;
    }

    async fn eval_bool(&self, page: &Page, js: &str, step: &str) -> Result<bool, MmsError> {
        let result = page
            .evaluate(js)
            .await
            .map_err(|e| MmsError::JavaScript(format!("{}: {}", step, e)))?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    /// Runs a snippet that yields stringified option texts, `None` while the
    /// target element has not rendered.
    async fn eval_texts(
        &self,
        page: &Page,
        js: &str,
        step: &str,
    ) -> Result<Option<Vec<String>>, MmsError> {
        let result = page
            .evaluate(js)
            .await
            .map_err(|e| MmsError::JavaScript(format!("{}: {}", step, e)))?;

        match result.into_value::<Option<String>>().ok().flatten() {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| MmsError::JavaScript(format!("{}: bad option payload: {}", step, e))),
            None => Ok(None),
        }
    }

    /// Polls the page title until it carries the portal marker.
    async fn wait_for_title(&self, page: &Page) -> Result<(), MmsError> {
        let start = Instant::now();
        while start.elapsed() < self.config.timeout {
            let title = page
                .evaluate("document.title")
                .await
                .map_err(|e| MmsError::JavaScript(format!("page title: {}", e)))?
                .into_value::<String>()
                .unwrap_or_default();

            if title.contains(TITLE_MARKER) {
                debug!(%title, "portal title confirmed");
                return Ok(());
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }

        Err(MmsError::Timeout(format!(
            "page title did not contain '{}' within {:?}",
            TITLE_MARKER, self.config.timeout
        )))
    }

    /// Polls for an element on the main document.
    async fn wait_for_element(
        &self,
        page: &Page,
        selector: &str,
        what: &str,
    ) -> Result<Element, MmsError> {
        let start = Instant::now();
        loop {
            match page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) => {
                    if start.elapsed() >= self.config.timeout {
                        return Err(MmsError::ElementNotFound(format!("{}: {}", what, e)));
                    }
                }
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    /// Polls the account overlay until its options have rendered.
    async fn wait_for_overlay_options(&self, page: &Page) -> Result<Vec<String>, MmsError> {
        let js = page::overlay_option_texts_js();
        let start = Instant::now();
        while start.elapsed() < self.config.timeout {
            if let Some(texts) = self.eval_texts(page, &js, "account overlay").await? {
                if !texts.is_empty() {
                    return Ok(texts);
                }
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }

        Err(MmsError::Timeout(format!(
            "account overlay did not render within {:?}",
            self.config.timeout
        )))
    }

    /// Exact-text selection on an in-frame named select. The option texts
    /// are re-scraped on every call, so a reloaded frame never leaves a
    /// stale handle behind. `Ok(false)` when no option matches.
    async fn select_in_frame(
        &self,
        target: &str,
        select_name: &str,
        what: &str,
    ) -> Result<bool, MmsError> {
        let page = self.get_page()?.clone();
        debug!(%target, select = select_name, "selecting option");

        let texts_js = page::frame_option_texts_js(select_name);
        let start = Instant::now();
        let texts = loop {
            if let Some(texts) = self.eval_texts(&page, &texts_js, what).await? {
                break texts;
            }
            if start.elapsed() >= self.config.timeout {
                return Err(MmsError::ElementNotFound(what.to_string()));
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        };

        let Some(index) = exact_match_index(&texts, target) else {
            debug!(%target, options = ?texts, "no exact option match");
            return Ok(false);
        };

        let select_js = page::frame_select_index_js(select_name, index);
        if !self.eval_bool(&page, &select_js, what).await? {
            return Err(MmsError::ElementNotFound(what.to_string()));
        }

        self.pause().await;
        Ok(true)
    }

    /// Clicks an in-frame element located by absolute XPath.
    async fn click_in_frame_xpath(&self, xpath: &str, what: &str) -> Result<(), MmsError> {
        let page = self.get_page()?.clone();
        debug!(step = what, "clicking in-frame control");

        let js = page::frame_click_xpath_js(xpath);
        if !self.eval_bool(&page, &js, what).await? {
            return Err(MmsError::ElementNotFound(what.to_string()));
        }

        self.pause().await;
        Ok(())
    }

    fn list_download_dir(&self) -> Result<HashSet<PathBuf>, MmsError> {
        let dir = self.config.download_dir();
        let mut files = HashSet::new();
        for entry in std::fs::read_dir(&dir)? {
            files.insert(entry?.path());
        }
        Ok(files)
    }

    fn is_partial_download(path: &Path) -> bool {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        filename.ends_with(".crdownload") || filename.ends_with(".tmp")
    }

    /// Waits for a file that was not present before the download click.
    /// A download the portal never delivers is logged, not fatal.
    async fn wait_for_new_file(
        &self,
        before: &HashSet<PathBuf>,
    ) -> Result<Option<PathBuf>, MmsError> {
        let timeout = Duration::from_secs(DOWNLOAD_WAIT_SECS);
        let start = Instant::now();

        loop {
            let new_file = self
                .list_download_dir()?
                .into_iter()
                .find(|path| !before.contains(path) && !Self::is_partial_download(path));

            if let Some(path) = new_file {
                info!(file = ?path, "download completed");
                return Ok(Some(path));
            }

            if start.elapsed() > timeout {
                warn!(
                    "no download appeared within {}s, continuing",
                    DOWNLOAD_WAIT_SECS
                );
                return Ok(None);
            }

            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    async fn debug_screenshot(&self, page: &Page, tag: &str) {
        if !self.config.debug {
            return;
        }
        if let Ok(screenshot) = page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
            debug!("{} screenshot: data:image/png;base64,{}", tag, encoded);
        }
    }
}

#[async_trait]
impl BalancePortal for MmsScraper {
    fn account(&self) -> &str {
        &self.config.account
    }

    async fn initialize(&mut self) -> Result<(), MmsError> {
        info!(account = %self.config.account, "initializing browser...");

        let download_dir = self.config.download_dir();
        std::fs::create_dir_all(&download_dir)?;
        let download_dir = download_dir
            .canonicalize()
            .unwrap_or_else(|_| download_dir.clone());

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .request_timeout(Duration::from_secs(60));

        // Packaged environments ship their own Chromium
        if let Ok(chrome_path) =
            std::env::var("CHROME_PATH").or_else(|_| std::env::var("CHROMIUM_PATH"))
        {
            builder = builder.chrome_executable(chrome_path);
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| MmsError::BrowserInit(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| MmsError::BrowserInit(e.to_string()))?;

        // Drain browser events in the background
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| MmsError::BrowserInit(e.to_string()))?;

        let download_params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(download_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| MmsError::BrowserInit(format!("download behavior error: {}", e)))?;

        page.execute(download_params)
            .await
            .map_err(|e| MmsError::BrowserInit(format!("download behavior error: {}", e)))?;

        self.browser = Some(browser);
        self.page = Some(Arc::new(page));

        info!(dir = ?download_dir, "browser initialized");
        Ok(())
    }

    async fn login(&mut self) -> Result<(), MmsError> {
        let page = self.get_page()?.clone();
        let url = self.config.route(SIGN_IN_PATH);
        info!(%url, "signing in...");

        page.goto(url.as_str())
            .await
            .map_err(|e| MmsError::Navigation(e.to_string()))?;
        self.wait_for_title(&page).await?;
        self.pause().await;

        self.wait_for_element(&page, LOGIN_PANEL_HEADER, "login panel header")
            .await?
            .click()
            .await
            .map_err(|e| MmsError::Login(format!("login panel click: {}", e)))?;
        self.pause().await;

        self.wait_for_element(&page, USERNAME_INPUT, "username input")
            .await?
            .type_str(&self.config.username)
            .await
            .map_err(|e| MmsError::Login(format!("username entry: {}", e)))?;
        self.pause().await;

        self.wait_for_element(&page, PASSWORD_INPUT, "password input")
            .await?
            .type_str(&self.config.password)
            .await
            .map_err(|e| MmsError::Login(format!("password entry: {}", e)))?;
        self.pause().await;

        self.wait_for_element(&page, LOGIN_SUBMIT, "login submit button")
            .await?
            .click()
            .await
            .map_err(|e| MmsError::Login(format!("login submit click: {}", e)))?;
        self.pause().await;

        if let Err(err) = self.wait_for_title(&page).await {
            self.debug_screenshot(&page, "login").await;
            return Err(MmsError::Login(format!(
                "title verification after submit: {}",
                err
            )));
        }

        info!("login successful");
        Ok(())
    }

    async fn select_account(&mut self) -> Result<bool, MmsError> {
        let page = self.get_page()?.clone();
        debug!(account = %self.config.account, "selecting company role...");

        self.wait_for_element(&page, ACCOUNT_SELECTOR, "company-role selector")
            .await?
            .click()
            .await
            .map_err(|e| MmsError::Navigation(format!("company-role selector click: {}", e)))?;

        let texts = self.wait_for_overlay_options(&page).await?;
        self.pause().await;

        let Some(index) = exact_match_index(&texts, &self.config.account) else {
            debug!(options = ?texts, "account not present in overlay");
            return Ok(false);
        };

        let js = page::overlay_click_option_js(index);
        if !self.eval_bool(&page, &js, "account option").await? {
            return Err(MmsError::ElementNotFound("account option".into()));
        }

        self.pause().await;
        info!(account = %self.config.account, "company role selected");
        Ok(true)
    }

    async fn open_overview(&mut self) -> Result<(), MmsError> {
        let page = self.get_page()?.clone();
        let url = self.config.route(OVERVIEW_PATH);
        info!(%url, "opening balance-account overview...");

        page.goto(url.as_str())
            .await
            .map_err(|e| MmsError::Navigation(e.to_string()))?;
        self.pause().await;

        // The overview content is only reachable through this frame
        self.wait_for_element(&page, OVERVIEW_FRAME, "overview frame")
            .await?;

        Ok(())
    }

    async fn balance_groups(&mut self) -> Result<Vec<String>, MmsError> {
        let page = self.get_page()?.clone();
        self.pause().await;
        debug!("reading balance group options");

        let js = page::frame_option_texts_js(GROUP_SELECT);
        let start = Instant::now();
        loop {
            if let Some(texts) = self.eval_texts(&page, &js, "balance group select").await? {
                return Ok(filter_group_names(texts));
            }
            if start.elapsed() >= self.config.timeout {
                return Err(MmsError::ElementNotFound("balance group select".into()));
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    async fn select_balance_group(&mut self, name: &str) -> Result<bool, MmsError> {
        self.select_in_frame(name, GROUP_SELECT, "balance group select")
            .await
    }

    async fn set_date(&mut self, date: &ExportDate) -> Result<DateMatch, MmsError> {
        let day = self
            .select_in_frame(&date.day, DAY_SELECT, "day select")
            .await?;
        let month = self
            .select_in_frame(&date.month, MONTH_SELECT, "month select")
            .await?;
        let year = self
            .select_in_frame(&date.year, YEAR_SELECT, "year select")
            .await?;

        Ok(DateMatch { day, month, year })
    }

    async fn apply_filter(&mut self) -> Result<(), MmsError> {
        let page = self.get_page()?.clone();
        debug!("applying filter");

        let js = page::frame_click_id_js(FILTER_BUTTON_ID);
        if !self.eval_bool(&page, &js, "filter button").await? {
            return Err(MmsError::ElementNotFound("filter button".into()));
        }

        self.pause().await;
        // the filter reloads the result table in place
        sleep(Duration::from_secs(FILTER_SETTLE_SECS)).await;
        Ok(())
    }

    async fn open_choices(&mut self) -> Result<(), MmsError> {
        self.click_in_frame_xpath(CHOICES_LINK_XPATH, "choices link")
            .await
    }

    async fn expand_group(&mut self) -> Result<(), MmsError> {
        self.click_in_frame_xpath(EXPAND_GROUP_XPATH, "expand group control")
            .await
    }

    async fn trigger_download(&mut self) -> Result<Option<PathBuf>, MmsError> {
        let before = self.list_download_dir()?;
        self.click_in_frame_xpath(DOWNLOAD_BUTTON_XPATH, "download button")
            .await?;
        self.wait_for_new_file(&before).await
    }

    async fn go_back(&mut self) -> Result<(), MmsError> {
        self.click_in_frame_xpath(BACK_LINK_XPATH, "back link").await
    }

    async fn close(&mut self) -> Result<(), MmsError> {
        info!("closing browser...");

        self.page = None;
        self.browser = None;

        info!("browser closed");
        Ok(())
    }
}
