// Runtime configuration read from the environment.
// Defaults match the file names the CDC team drops into the working directory.
use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_AVAILABILITY_FILE: &str = "data/CDC_Availability_2025_194.xlsx";
pub const DEFAULT_AVAILABILITY_SHEET: &str = "Ava CDC";
pub const DEFAULT_PO_FILE: &str = "data/ESTIMASIPO2025.xlsx";
pub const DEFAULT_DAPOT_FILE: &str = "data/Dapot_Alpro_CDC_2025.xlsx";
pub const DEFAULT_SITE_MASTER: &str = "all_site_master.csv";
pub const DEFAULT_FUEL_LOG: &str = "pengisian_bbm_streamlit.csv";
pub const DEFAULT_EXPORT_DIR: &str = "exports";
pub const DEFAULT_PHOTO_LINK_BASE: &str = "https://drive.google.com/uc?export=download&id=";

#[derive(Debug, Clone)]
pub struct Config {
    /// Wide availability workbook (one column per day).
    pub availability_file: PathBuf,
    pub availability_sheet: String,
    /// Monthly PO workbook, one sheet per month. The year is taken from the file name.
    pub po_file: PathBuf,
    pub dapot_file: PathBuf,
    pub site_master_file: PathBuf,
    /// Append-only refill log.
    pub fuel_log_file: PathBuf,
    pub export_dir: PathBuf,
    pub photo_link_base: String,
    /// Fixed "today" for fuel consumption estimates. Uses the local date when unset.
    pub today: Option<NaiveDate>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let path_or = |key: &str, default: &str| PathBuf::from(get(key).unwrap_or_else(|| default.to_string()));

        let today = match get("CDC_TODAY") {
            Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| DashboardError::Config {
                key: "CDC_TODAY".to_string(),
                message: format!("expected YYYY-MM-DD, got '{}'", s),
            })?),
            None => None,
        };

        let photo_link_base = get("CDC_PHOTO_LINK_BASE").unwrap_or_else(|| DEFAULT_PHOTO_LINK_BASE.to_string());
        if !photo_link_base.starts_with("http://") && !photo_link_base.starts_with("https://") {
            return Err(DashboardError::Config {
                key: "CDC_PHOTO_LINK_BASE".to_string(),
                message: "must be an http(s) URL prefix".to_string(),
            });
        }

        Ok(Config {
            availability_file: path_or("CDC_AVAILABILITY_FILE", DEFAULT_AVAILABILITY_FILE),
            availability_sheet: get("CDC_AVAILABILITY_SHEET").unwrap_or_else(|| DEFAULT_AVAILABILITY_SHEET.to_string()),
            po_file: path_or("CDC_PO_FILE", DEFAULT_PO_FILE),
            dapot_file: path_or("CDC_DAPOT_FILE", DEFAULT_DAPOT_FILE),
            site_master_file: path_or("CDC_SITE_MASTER", DEFAULT_SITE_MASTER),
            fuel_log_file: path_or("CDC_FUEL_LOG", DEFAULT_FUEL_LOG),
            export_dir: path_or("CDC_EXPORT_DIR", DEFAULT_EXPORT_DIR),
            photo_link_base,
            today,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn export_path(&self, file_name: &str) -> PathBuf {
        self.export_dir.join(file_name)
    }
}
