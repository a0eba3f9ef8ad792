//! MMS portal integration.
//!
//! Drives the balance-account overview of the market management portal and
//! downloads the per-group settlement exports.

pub mod page;
pub mod scraper;
pub mod types;

pub use scraper::MmsScraper;
pub use types::{
    default_export_date, DateMatch, DownloadEvent, ExportDate, ExportReport,
    DEFAULT_EXPORT_DATE, PRODUCT_ACCOUNTS,
};
