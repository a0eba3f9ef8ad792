use thiserror::Error;

#[derive(Error, Debug)]
pub enum MmsError {
    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("login error: {0}")]
    Login(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("javascript error: {0}")]
    JavaScript(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("invalid export date: {0}")]
    InvalidDate(String),

    #[error("file operation error: {0}")]
    FileIO(#[from] std::io::Error),
}

impl MmsError {
    /// Portal-side failures get one more full pass; a bad date or a local
    /// filesystem problem will not heal by relaunching the browser.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, MmsError::InvalidDate(_) | MmsError::FileIO(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(MmsError::ElementNotFound("filter button".into()).is_retryable());
        assert!(MmsError::Timeout("page title".into()).is_retryable());
        assert!(MmsError::Navigation("net::ERR_FAILED".into()).is_retryable());
        assert!(!MmsError::InvalidDate("31-13-2022".into()).is_retryable());
        assert!(!MmsError::FileIO(std::io::Error::new(std::io::ErrorKind::Other, "disk")).is_retryable());
    }
}
