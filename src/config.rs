use std::path::PathBuf;
use std::time::Duration;

pub const MMS_BASE_URL: &str = "https://mms.ua.energy";

#[derive(Debug, Clone)]
pub struct MmsConfig {
    /// Business account name, e.g. "ENERGY_CENTRE - PROD". Matched against
    /// the company-role overlay and used as the download sub-directory.
    pub account: String,
    pub username: String,
    pub password: String,
    pub base_url: String,
    pub download_root: PathBuf,
    pub headless: bool,
    pub debug: bool,
    pub timeout: Duration,
}

impl Default for MmsConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            username: String::new(),
            password: String::new(),
            base_url: MMS_BASE_URL.to_string(),
            download_root: PathBuf::from("data"),
            headless: true,
            debug: false,
            timeout: Duration::from_secs(10),
        }
    }
}

impl MmsConfig {
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
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

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where this account's files land: `<download_root>/<account>`.
    pub fn download_dir(&self) -> PathBuf {
        self.download_root.join(&self.account)
    }

    /// Resolves a portal route against the configured base URL.
    pub fn route(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MmsConfig::new("ENERGY_CENTRE - PROD", "user", "pass")
            .with_headless(false)
            .with_download_root("/tmp/mms")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.account, "ENERGY_CENTRE - PROD");
        assert_eq!(config.username, "user");
        assert_eq!(config.password, "pass");
        assert!(!config.headless);
        assert_eq!(config.download_root, PathBuf::from("/tmp/mms"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.download_dir(),
            PathBuf::from("/tmp/mms/ENERGY_CENTRE - PROD")
        );
    }

    #[test]
    fn test_route_joins_base_url() {
        let config = MmsConfig::default();
        assert_eq!(config.route("/sign-in"), "https://mms.ua.energy/sign-in");

        let config = MmsConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(
            config.route("/emfamily/BalAccountOverview.do"),
            "http://localhost:8080/emfamily/BalAccountOverview.do"
        );
    }
}
