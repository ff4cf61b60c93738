use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    OnService,
    CutOff,
}

impl SiteStatus {
    /// Idle sites are billed as cut off.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "on service" => Some(SiteStatus::OnService),
            "cut off" | "idle" => Some(SiteStatus::CutOff),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::OnService => write!(f, "On Service"),
            SiteStatus::CutOff => write!(f, "Cut Off"),
        }
    }
}

/// One row of the wide availability sheet.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub area: String,
    pub regional: String,
    pub site_id: String,
    pub site_name: String,
    pub ns: String,
    pub cluster: String,
    pub site_class: String,
    pub status: Option<SiteStatus>,
    /// Percentage, 0-100.
    pub target: f64,
    /// Daily readings in column order. `None` marks a blank cell.
    pub readings: Vec<(NaiveDate, Option<f64>)>,
}

/// Availability of one site on one day, the unit of the long table.
#[derive(Debug, Clone, PartialEq)]
pub struct LongMeasurement {
    pub area: String,
    pub site_id: String,
    pub regional: String,
    pub site_name: String,
    pub ns: String,
    pub cluster: String,
    pub status: Option<SiteStatus>,
    pub site_class: String,
    pub target: f64,
    pub date: NaiveDate,
    pub availability: Option<f64>,
}

/// Monthly sheets of the PO workbook, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoMonth {
    Januari,
    Februari,
    Maret,
    April,
    Mei,
    Juni,
    Juli,
    Agustus,
    September,
    Oktober,
    November,
    Desember,
}

impl PoMonth {
    pub const ALL: [PoMonth; 12] = [
        PoMonth::Januari,
        PoMonth::Februari,
        PoMonth::Maret,
        PoMonth::April,
        PoMonth::Mei,
        PoMonth::Juni,
        PoMonth::Juli,
        PoMonth::Agustus,
        PoMonth::September,
        PoMonth::Oktober,
        PoMonth::November,
        PoMonth::Desember,
    ];

    pub fn sheet_name(self) -> &'static str {
        match self {
            PoMonth::Januari => "JANUARI",
            PoMonth::Februari => "FEBRUARI",
            PoMonth::Maret => "MARET",
            PoMonth::April => "APRIL",
            PoMonth::Mei => "MEI",
            PoMonth::Juni => "JUNI",
            PoMonth::Juli => "JULI",
            PoMonth::Agustus => "AGUSTUS",
            PoMonth::September => "SEPTEMBER",
            PoMonth::Oktober => "OKTOBER",
            PoMonth::November => "NOVEMBER",
            PoMonth::Desember => "DESEMBER",
        }
    }

    pub fn english(self) -> &'static str {
        match self {
            PoMonth::Januari => "January",
            PoMonth::Februari => "February",
            PoMonth::Maret => "March",
            PoMonth::April => "April",
            PoMonth::Mei => "May",
            PoMonth::Juni => "June",
            PoMonth::Juli => "July",
            PoMonth::Agustus => "August",
            PoMonth::September => "September",
            PoMonth::Oktober => "October",
            PoMonth::November => "November",
            PoMonth::Desember => "December",
        }
    }

    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_sheet_name(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        PoMonth::ALL.into_iter().find(|m| m.sheet_name() == upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Achievement {
    Achieved,
    NotAchieved,
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Achievement::Achieved => write!(f, "Achieved"),
            Achievement::NotAchieved => write!(f, "Not Achieved"),
        }
    }
}

/// One site-month row of the PO workbook. Percentages are 0-100.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoFact {
    pub row_no: Option<u32>,
    pub month: PoMonth,
    pub year: String,
    pub regional: String,
    pub site_id: String,
    pub site_name: String,
    pub power_po: String,
    pub billing_start: String,
    pub billing_end: String,
    pub billing_months: Option<f64>,
    pub nominal_po: Option<f64>,
    pub fuel_index: Option<f64>,
    pub site_class: String,
    pub target: Option<f64>,
    pub actual: Option<f64>,
    pub penalty_pct: Option<f64>,
    pub penalty_amount: Option<f64>,
    pub bast_amount: Option<f64>,
    pub bast_after_penalty: Option<f64>,
    pub achievement: Option<Achievement>,
}

impl MonthlyPoFact {
    /// `"April - 2025"`
    pub fn period_label(&self) -> String {
        format!("{} - {}", self.month.english(), self.year)
    }
}

/// Reference to a photo stored by the upload service. Never opened locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub file_id: String,
    pub link: String,
}

impl PhotoRef {
    pub fn from_id(file_id: &str, link_base: &str) -> Self {
        PhotoRef {
            file_id: file_id.to_string(),
            link: format!("{}{}", link_base, file_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuelRefillRecord {
    pub site_id: String,
    pub refill_date: NaiveDate,
    pub liters: f64,
    pub photo: Option<PhotoRef>,
}

/// Row of the refill log as stored on disk.
#[derive(Debug, Deserialize)]
pub struct RawRefillRow {
    pub site_id: Option<String>,
    pub tanggal_pengisian: Option<String>,
    pub jumlah_pengisian_liter: Option<String>,
    #[serde(default)]
    pub photo_id: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefillCsvRow<'a> {
    pub site_id: &'a str,
    pub tanggal_pengisian: String,
    pub jumlah_pengisian_liter: f64,
    pub photo_id: &'a str,
    pub photo_link: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RawSiteMasterRow {
    pub site_id: Option<String>,
    pub site_name: Option<String>,
    pub area: Option<String>,
    pub regional: Option<String>,
    pub liter_per_hari: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteMaster {
    pub site_id: String,
    pub site_name: String,
    pub area: String,
    pub regional: String,
    /// Daily fuel consumption in liters.
    pub liters_per_day: Option<f64>,
}

/// One row of the Dapot asset inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct DapotAsset {
    /// Name of the sheet the row came from.
    pub region: String,
    pub area: String,
    pub regional: String,
    pub site_id: String,
    pub site_name: String,
    pub site_class: String,
    pub status: String,
    pub capacity_kva: String,
    pub battery_bank: String,
    pub rectifier_modules: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Every column of the row, upper-cased header first.
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Tabled, Clone)]
pub struct PoSummaryRow {
    #[tabled(rename = "No")]
    pub no: String,
    #[tabled(rename = "Month_Year")]
    pub period: String,
    #[tabled(rename = "Regional TI")]
    pub regional: String,
    #[tabled(rename = "Site Id")]
    pub site_id: String,
    #[tabled(rename = "Site Name")]
    pub site_name: String,
    #[tabled(rename = "Nominal PO")]
    pub nominal_po: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Availability")]
    pub actual: String,
    #[tabled(rename = "Penalty")]
    pub penalty_amount: String,
    #[tabled(rename = "Achievement")]
    pub achievement: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CountRow {
    #[tabled(rename = "Value")]
    pub label: String,
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Tabled, Clone)]
pub struct FuelStatusRow {
    #[tabled(rename = "Area")]
    pub area: String,
    #[tabled(rename = "Regional")]
    pub regional: String,
    #[tabled(rename = "Site ID")]
    pub site_id: String,
    #[tabled(rename = "Site Name")]
    pub site_name: String,
    #[tabled(rename = "Refill Date")]
    pub refill_date: String,
    #[tabled(rename = "Liters")]
    pub liters: String,
    #[tabled(rename = "L/Day")]
    pub liters_per_day: String,
    #[tabled(rename = "Used (L)")]
    pub liters_consumed: String,
    #[tabled(rename = "Used %")]
    pub percent_consumed: String,
    #[tabled(rename = "Est. Empty")]
    pub empty_date: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct RefillHistoryRow {
    #[tabled(rename = "Area")]
    pub area: String,
    #[tabled(rename = "Regional")]
    pub regional: String,
    #[tabled(rename = "Site ID")]
    pub site_id: String,
    #[tabled(rename = "Site Name")]
    pub site_name: String,
    #[tabled(rename = "Refill Date")]
    pub refill_date: String,
    #[tabled(rename = "Liters")]
    pub liters: String,
    #[tabled(rename = "Photo")]
    pub photo_link: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct DapotRow {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Area")]
    pub area: String,
    #[tabled(rename = "Regional")]
    pub regional: String,
    #[tabled(rename = "Site ID")]
    pub site_id: String,
    #[tabled(rename = "Site Name")]
    pub site_name: String,
    #[tabled(rename = "Class")]
    pub site_class: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_sites: usize,
    pub total_months: usize,
    pub months: Vec<String>,
    pub cells_meeting_target: usize,
    pub cells_missing_target: usize,
    pub cells_without_data: usize,
}
