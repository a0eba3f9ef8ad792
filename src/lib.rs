//! MMS balance-group export scraper.
//!
//! Logs into the MMS energy market portal, selects a business account,
//! enumerates its balance groups and downloads the per-group settlement
//! export for a fixed date, one group at a time.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mms_scraper::{ExportRequest, MmsService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = MmsService::new();
//!
//!     let request = ExportRequest::new("ENERGY_CENTRE - PROD", "user", "password")
//!         .with_download_root("./data")
//!         .with_headless(true);
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("downloads: {:?}", result.report.downloads);
//! }
//! ```
//!
//! # Direct scraper usage
//!
//! ```rust,ignore
//! use mms_scraper::{BalancePortal, MmsConfig, MmsScraper};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = MmsConfig::new("ENERGY_CENTRE - PROD", "user", "password");
//!     let mut scraper = MmsScraper::new(config);
//!     let date = mms_scraper::default_export_date();
//!     let report = scraper.export(&date).await.unwrap();
//!     println!("{} groups exported", report.downloads.len());
//! }
//! ```

pub mod config;
pub mod error;
pub mod mms;
pub mod service;
pub mod traits;

pub use config::{MmsConfig, MMS_BASE_URL};
pub use error::MmsError;
pub use mms::{
    default_export_date, DateMatch, DownloadEvent, ExportDate, ExportReport, MmsScraper,
    DEFAULT_EXPORT_DATE, PRODUCT_ACCOUNTS,
};
pub use service::{export_with_retry, ExportRequest, ExportResult, MmsService};
pub use traits::BalancePortal;
