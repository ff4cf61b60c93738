// Wide-to-long reshaping of the availability sheet and concatenation of the
// per-month / per-region sheets into single tables.
//
// Everything here works on [`SheetTable`]s already read from disk, so the
// loader owns file access and this module stays pure.
use crate::dapot;
use crate::error::{DashboardError, Result};
use crate::threshold;
use crate::types::{LongMeasurement, MonthlyPoFact, PoMonth, SiteRecord, SiteStatus};
use crate::util::{parse_day_label, parse_f64_safe};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year pattern"));

/// Identifying columns of the availability sheet. Every other column is a day.
pub const ID_COLUMNS: [&str; 9] = [
    "Area",
    "Site ID",
    "Regional",
    "Site Name",
    "NS",
    "Cluster",
    "On Service / Cut OFF",
    "Site Class",
    "Target AVA",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            // Site ids like 1024 come through as numbers.
            Cell::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => parse_f64_safe(Some(s.as_str())),
            _ => None,
        }
    }

    /// Header cells are either text such as `01-Apr-25` or native dates.
    pub fn as_day(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_day_label(s),
            _ => None,
        }
    }
}

/// A worksheet after the header row has been located.
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Header text trimmed, matched case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.as_text().map(|t| t.eq_ignore_ascii_case(name)).unwrap_or(false))
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| DashboardError::MissingColumn {
            sheet: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn header_labels(&self) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| h.as_text().unwrap_or_else(|| format!("Column {}", i + 1)))
            .collect()
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

pub fn cell(row: &[Cell], idx: Option<usize>) -> &Cell {
    idx.and_then(|i| row.get(i)).unwrap_or(&EMPTY_CELL)
}

pub fn text(row: &[Cell], idx: Option<usize>) -> String {
    cell(row, idx).as_text().unwrap_or_default()
}

pub fn number(row: &[Cell], idx: Option<usize>) -> Option<f64> {
    cell(row, idx).as_number()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReshapeReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub day_columns: usize,
    /// Labels of non-identifying columns that did not parse as a day.
    pub dropped_columns: Vec<String>,
}

/// Parse the wide sheet into one [`SiteRecord`] per site row.
///
/// Rows without a site id or target are skipped and counted. Non-identifying
/// columns whose header is not a day are dropped and listed in the report.
pub fn parse_site_records(sheet: &SheetTable) -> Result<(Vec<SiteRecord>, ReshapeReport)> {
    let area = sheet.require("Area")?;
    let site_id = sheet.require("Site ID")?;
    let regional = sheet.require("Regional")?;
    let site_name = sheet.require("Site Name")?;
    let target = sheet.require("Target AVA")?;
    let ns = sheet.column("NS");
    let cluster = sheet.column("Cluster");
    let status = sheet.column("On Service / Cut OFF");
    let site_class = sheet.column("Site Class");

    let id_idx: HashSet<usize> = ID_COLUMNS.iter().filter_map(|c| sheet.column(c)).collect();
    let mut day_columns: Vec<(usize, NaiveDate)> = Vec::new();
    let mut dropped_columns = Vec::new();
    for (i, h) in sheet.headers.iter().enumerate() {
        if id_idx.contains(&i) {
            continue;
        }
        match h.as_day() {
            Some(d) => day_columns.push((i, d)),
            None => {
                if let Some(label) = h.as_text() {
                    dropped_columns.push(label);
                }
            }
        }
    }

    let mut report = ReshapeReport {
        total_rows: sheet.rows.len(),
        day_columns: day_columns.len(),
        dropped_columns,
        ..Default::default()
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        let id = text(row, Some(site_id));
        let Some(target_value) = number(row, Some(target)) else {
            report.skipped_rows += 1;
            continue;
        };
        if id.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!(site_id = %id, sheet = %sheet.name, "duplicate site id in availability sheet");
        }
        records.push(SiteRecord {
            area: text(row, Some(area)),
            regional: text(row, Some(regional)),
            site_id: id,
            site_name: text(row, Some(site_name)),
            ns: text(row, ns),
            cluster: text(row, cluster),
            site_class: text(row, site_class),
            status: SiteStatus::parse(&text(row, status)),
            target: target_value,
            readings: day_columns
                .iter()
                .map(|(i, d)| (*d, number(row, Some(*i))))
                .collect(),
        });
    }

    if !report.dropped_columns.is_empty() {
        warn!(
            sheet = %sheet.name,
            columns = ?report.dropped_columns,
            "columns without a dd-Mon-yy header were left out of the daily table"
        );
    }
    Ok((records, report))
}

/// One measurement per site per day column.
pub fn melt(records: &[SiteRecord]) -> Vec<LongMeasurement> {
    records
        .iter()
        .flat_map(|r| {
            r.readings.iter().map(move |(date, value)| LongMeasurement {
                area: r.area.clone(),
                site_id: r.site_id.clone(),
                regional: r.regional.clone(),
                site_name: r.site_name.clone(),
                ns: r.ns.clone(),
                cluster: r.cluster.clone(),
                status: r.status,
                site_class: r.site_class.clone(),
                target: r.target,
                date: *date,
                availability: *value,
            })
        })
        .collect()
}

/// First four-digit run in the file name, `"Unknown"` when there is none.
pub fn year_from_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    YEAR_PATTERN
        .find(&name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoTable {
    pub facts: Vec<MonthlyPoFact>,
    pub year: String,
    pub months_loaded: Vec<PoMonth>,
    /// False when the availability or target column was absent from a sheet.
    pub achievement_available: bool,
}

/// Stored as 0-1 in the PO workbook; kept as 0-100 here.
fn fraction_to_pct(v: Option<f64>) -> Option<f64> {
    v.map(|f| f * 100.0)
}

/// Concatenate the month sheets (already in calendar order) into one table.
pub fn concat_po_sheets(sheets: &[(PoMonth, SheetTable)], year: &str) -> PoTable {
    let mut facts = Vec::new();
    let mut achievement_available = !sheets.is_empty();
    for (month, sheet) in sheets {
        let col = |name: &str| sheet.column(name);
        let target_col = col("Target Availability (%)");
        let actual_col = col("Avaibility");
        if target_col.is_none() || actual_col.is_none() {
            warn!(sheet = %sheet.name, "'Avaibility' or 'Target Availability (%)' missing, achievement not derived");
            achievement_available = false;
        }
        let site_col = col("Site Id");
        let cols = [
            col("No"),
            col("Regional TI"),
            col("Site Name"),
            col("Daya PO"),
            col("Periode Tagihan (Awal)"),
            col("Periode Tagihan (Akhir)"),
            col("Jumlah Periode (Bulan)"),
            col("Nominal PO"),
            col("Index BBM"),
            col("Class Site"),
            col("Persentase Penalty"),
            col("Nilai Penalty"),
            col("Nilai BAST"),
            col("Nilai BAST dikurangi Penalty"),
        ];
        let [no, regional, site_name, power, start, end, months, nominal, fuel_index, class, penalty_pct, penalty, bast, bast_net] =
            cols;

        for row in &sheet.rows {
            let site_id = text(row, site_col);
            if site_id.is_empty() {
                // Totals and notes at the bottom of the sheet.
                continue;
            }
            let target = fraction_to_pct(number(row, target_col));
            let actual = fraction_to_pct(number(row, actual_col));
            let achievement = match (actual, target) {
                (Some(a), Some(t)) => Some(threshold::achievement(a, t)),
                _ => None,
            };
            facts.push(MonthlyPoFact {
                row_no: number(row, no).map(|n| n as u32),
                month: *month,
                year: year.to_string(),
                regional: text(row, regional),
                site_id,
                site_name: text(row, site_name),
                power_po: text(row, power),
                billing_start: text(row, start),
                billing_end: text(row, end),
                billing_months: number(row, months),
                nominal_po: number(row, nominal),
                fuel_index: number(row, fuel_index),
                site_class: text(row, class),
                target,
                actual,
                penalty_pct: fraction_to_pct(number(row, penalty_pct)),
                penalty_amount: number(row, penalty),
                bast_amount: number(row, bast),
                bast_after_penalty: number(row, bast_net),
                achievement,
            });
        }
    }
    if !achievement_available {
        for f in &mut facts {
            f.achievement = None;
        }
    }
    PoTable {
        facts,
        year: year.to_string(),
        months_loaded: sheets.iter().map(|(m, _)| *m).collect(),
        achievement_available,
    }
}

/// Concatenate the regional asset sheets, tagging each row with its sheet.
pub fn concat_dapot_sheets(sheets: &[(String, SheetTable)]) -> Vec<crate::types::DapotAsset> {
    let mut assets = Vec::new();
    for (region, sheet) in sheets {
        let headers: Vec<String> = sheet.header_labels().iter().map(|h| h.trim().to_uppercase()).collect();
        let mut skipped = 0usize;
        for row in &sheet.rows {
            let values: HashMap<&str, String> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.as_str(), text(row, Some(i))))
                .collect();
            match dapot::asset_from_row(region, &headers, &values) {
                Some(a) => assets.push(a),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(sheet = %region, skipped, "rows without SITE ID skipped");
        }
    }
    assets
}
