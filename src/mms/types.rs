//! Types for the MMS balance-group export flow.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::MmsError;

/// The eleven business accounts to export, in processing order.
pub const PRODUCT_ACCOUNTS: [&str; 11] = [
    "ENERGY_CENTRE - PROD",
    "EKO_ENERGY_PRO - PROD",
    "POHREB_SOLAR_LLC - PROD",
    "CITY_SOLAR_LLC - PROD",
    "SUN_CITY_PLUS - PROD",
    "PRIME_SUN_LLC - PROD",
    "BILASHKY_ENERGY - PROD",
    "SUN_VOLT - PROD",
    "UKRSPECSTROYPLUS - PROD",
    "INHULETS_ENERGO2 - PROD",
    "RENGY_ZAPORIZHZH - PROD",
];

/// Fixed target date of the export run, `dd-mm-yyyy`.
pub const DEFAULT_EXPORT_DATE: &str = "20-03-2022";

/// [`DEFAULT_EXPORT_DATE`] in decomposed form.
pub fn default_export_date() -> ExportDate {
    ExportDate {
        day: "20".to_string(),
        month: "03".to_string(),
        year: "2022".to_string(),
    }
}

/// Target date decomposed into the zero-padded strings the portal's
/// day/month/year selects display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDate {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl ExportDate {
    /// Parses a `dd-mm-yyyy` date string.
    pub fn parse(input: &str) -> Result<Self, MmsError> {
        let date = NaiveDate::parse_from_str(input, "%d-%m-%Y")
            .map_err(|e| MmsError::InvalidDate(format!("{}: {}", input, e)))?;
        Ok(Self::from(date))
    }
}

impl From<NaiveDate> for ExportDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            day: date.format("%d").to_string(),
            month: date.format("%m").to_string(),
            year: date.format("%Y").to_string(),
        }
    }
}

impl std::fmt::Display for ExportDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.day, self.month, self.year)
    }
}

/// Which date selects found an exact option match. An unmatched field means
/// the portal kept its previous selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMatch {
    pub day: bool,
    pub month: bool,
    pub year: bool,
}

impl DateMatch {
    pub fn complete(&self) -> bool {
        self.day && self.month && self.year
    }
}

/// One triggered download. `file` is `None` when the portal did not produce
/// a file within the download wait window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub group: String,
    pub file: Option<PathBuf>,
}

/// Outcome of one account's export run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportReport {
    /// Balance groups discovered on the overview page, DOM order.
    pub groups: Vec<String>,
    /// Download triggers, one per processed group.
    pub downloads: Vec<DownloadEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decomposes_zero_padded() {
        let date = ExportDate::parse("20-03-2022").unwrap();
        assert_eq!(date.day, "20");
        assert_eq!(date.month, "03");
        assert_eq!(date.year, "2022");
    }

    #[test]
    fn test_parse_pads_single_digits() {
        let date = ExportDate::parse("5-6-2021").unwrap();
        assert_eq!(date.day, "05");
        assert_eq!(date.month, "06");
        assert_eq!(date.year, "2021");
    }

    #[test]
    fn test_default_export_date_matches_constant() {
        assert_eq!(
            ExportDate::parse(DEFAULT_EXPORT_DATE).unwrap(),
            default_export_date()
        );
    }

    #[test]
    fn test_parse_roundtrip_is_idempotent() {
        let date = ExportDate::parse(DEFAULT_EXPORT_DATE).unwrap();
        let again = ExportDate::parse(&date.to_string()).unwrap();
        assert_eq!(date, again);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ExportDate::parse("31-13-2022"),
            Err(MmsError::InvalidDate(_))
        ));
        assert!(matches!(
            ExportDate::parse("2022-03-20"),
            Err(MmsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_date_match_complete() {
        let all = DateMatch {
            day: true,
            month: true,
            year: true,
        };
        assert!(all.complete());
        assert!(!DateMatch { day: false, ..all }.complete());
    }
}
