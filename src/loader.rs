use crate::error::{DashboardError, Result};
use crate::fuel::RefillLog;
use crate::reshape::{self, Cell, PoTable, ReshapeReport, SheetTable};
use crate::types::{
    DapotAsset, FuelRefillRecord, LongMeasurement, PhotoRef, PoMonth, RawRefillRow, RawSiteMasterRow, RefillCsvRow,
    SiteMaster,
};
use crate::util::{excel_serial_to_date, parse_date_safe, parse_f64_safe};
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Regional sheets of the Dapot workbook.
pub const DAPOT_SHEETS: [&str; 7] = [
    "Sumbagsel",
    "Sumbagteng",
    "Jawa Timur",
    "Bali Nusra",
    "Kalimantan",
    "Puma",
    "Sulawesi",
];

/// PO and Dapot sheets carry a title row above the header.
const TITLED_HEADER_ROW: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
}

/// Availability data after reshaping.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityData {
    pub long: Vec<LongMeasurement>,
    pub report: ReshapeReport,
}

fn to_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(t.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(Cell::Date).unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_date_safe(Some(s.as_str())).map(Cell::Date).unwrap_or_else(|| Cell::Text(s.clone())),
        _ => Cell::Empty,
    }
}

/// Open workbook plus its path, for error messages.
pub struct Workbook {
    path: PathBuf,
    inner: Xlsx<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DashboardError::Workbook {
                path: path.display().to_string(),
                message: "file not found".to_string(),
            });
        }
        let inner: Xlsx<_> = open_workbook(path).map_err(|e: calamine::XlsxError| DashboardError::Workbook {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Workbook {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|s| s == name)
    }

    /// Read a sheet whose header sits on absolute row `header_row` (0-based).
    /// Rows above the header are ignored, as are fully blank rows below it.
    pub fn read_sheet(&mut self, name: &str, header_row: u32) -> Result<SheetTable> {
        if !self.has_sheet(name) {
            return Err(DashboardError::MissingSheet {
                path: self.path.display().to_string(),
                sheet: name.to_string(),
            });
        }
        let range = self.inner.worksheet_range(name).map_err(|e| DashboardError::Workbook {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        // The range starts at the first used cell, not necessarily A1.
        let first_row = range.start().map(|(r, _)| r).unwrap_or(0);
        let skip = header_row.saturating_sub(first_row) as usize;

        let mut rows = range.rows().skip(skip);
        let headers: Vec<Cell> = rows.next().map(|r| r.iter().map(to_cell).collect()).unwrap_or_default();
        let rows: Vec<Vec<Cell>> = rows
            .map(|r| r.iter().map(to_cell).collect::<Vec<Cell>>())
            .filter(|r| r.iter().any(|c| *c != Cell::Empty))
            .collect();
        Ok(SheetTable {
            name: name.to_string(),
            headers,
            rows,
        })
    }
}

pub fn load_availability(path: &Path, sheet: &str) -> Result<AvailabilityData> {
    let mut wb = Workbook::open(path)?;
    let table = wb.read_sheet(sheet, 0)?;
    let (sites, report) = reshape::parse_site_records(&table)?;
    let long = reshape::melt(&sites);
    info!(
        sites = sites.len(),
        days = report.day_columns,
        measurements = long.len(),
        skipped_rows = report.skipped_rows,
        "availability loaded"
    );
    Ok(AvailabilityData { long, report })
}

pub fn load_po(path: &Path) -> Result<PoTable> {
    let mut wb = Workbook::open(path)?;
    let year = reshape::year_from_file_name(path);
    let mut sheets = Vec::new();
    for month in PoMonth::ALL {
        if wb.has_sheet(month.sheet_name()) {
            sheets.push((month, wb.read_sheet(month.sheet_name(), TITLED_HEADER_ROW)?));
        }
    }
    if sheets.is_empty() {
        warn!(path = %path.display(), "no month sheets found in PO workbook");
    }
    let table = reshape::concat_po_sheets(&sheets, &year);
    info!(rows = table.facts.len(), months = table.months_loaded.len(), year = %table.year, "PO data loaded");
    Ok(table)
}

pub fn load_dapot(path: &Path) -> Result<Vec<DapotAsset>> {
    let mut wb = Workbook::open(path)?;
    let mut sheets = Vec::new();
    for name in DAPOT_SHEETS {
        if wb.has_sheet(name) {
            sheets.push((name.to_string(), wb.read_sheet(name, TITLED_HEADER_ROW)?));
        }
    }
    let assets = reshape::concat_dapot_sheets(&sheets);
    info!(assets = assets.len(), sheets = sheets.len(), "Dapot data loaded");
    Ok(assets)
}

pub fn load_site_master(path: &Path) -> Result<(Vec<SiteMaster>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut report = LoadReport::default();
    let mut sites = Vec::new();
    for result in rdr.deserialize::<RawSiteMasterRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.skipped_rows += 1;
                continue;
            }
        };
        let site_id = row.site_id.unwrap_or_default().trim().to_string();
        if site_id.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        sites.push(SiteMaster {
            site_id,
            site_name: row.site_name.unwrap_or_default().trim().to_string(),
            area: row.area.unwrap_or_default().trim().to_string(),
            regional: row.regional.unwrap_or_default().trim().to_string(),
            liters_per_day: parse_f64_safe(row.liter_per_hari.as_deref()),
        });
    }
    report.loaded_rows = sites.len();
    Ok((sites, report))
}

/// Older logs carry only the three original columns in their header while
/// rows appended since then also hold the photo columns, so such a log is
/// read by position.
fn positional_row(rec: &StringRecord) -> RawRefillRow {
    let field = |i: usize| rec.get(i).map(str::to_string);
    RawRefillRow {
        site_id: field(0),
        tanggal_pengisian: field(1),
        jumlah_pengisian_liter: field(2),
        photo_id: field(3),
        photo_link: field(4),
    }
}

/// Refill log kept as a CSV file next to the site master.
pub struct CsvRefillLog {
    path: PathBuf,
    photo_link_base: String,
}

impl CsvRefillLog {
    pub fn new(path: &Path, photo_link_base: &str) -> Self {
        CsvRefillLog {
            path: path.to_path_buf(),
            photo_link_base: photo_link_base.to_string(),
        }
    }

    fn parse_row(&self, row: RawRefillRow) -> Option<FuelRefillRecord> {
        let site_id = row.site_id?.trim().to_string();
        if site_id.is_empty() {
            return None;
        }
        let refill_date = parse_date_safe(row.tanggal_pengisian.as_deref())?;
        let liters = parse_f64_safe(row.jumlah_pengisian_liter.as_deref())?;
        let photo = row
            .photo_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(|id| match row.photo_link.filter(|l| !l.trim().is_empty()) {
                Some(link) => PhotoRef { file_id: id, link },
                None => PhotoRef::from_id(&id, &self.photo_link_base),
            });
        Some(FuelRefillRecord {
            site_id,
            refill_date,
            liters,
            photo,
        })
    }
}

impl RefillLog for CsvRefillLog {
    /// A missing log file is an empty log.
    fn read_all(&self) -> Result<Vec<FuelRefillRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = ReaderBuilder::new().flexible(true).from_path(&self.path)?;
        let headers = rdr.headers()?.clone();
        let positional = !headers.iter().any(|h| h.trim() == "photo_id");
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            let row = result.ok().and_then(|rec| {
                if positional {
                    Some(positional_row(&rec))
                } else {
                    rec.deserialize::<RawRefillRow>(Some(&headers)).ok()
                }
            });
            match row.and_then(|row| self.parse_row(row)) {
                Some(r) => records.push(r),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "unreadable refill log rows skipped");
        }
        Ok(records)
    }

    fn append(&mut self, record: &FuelRefillRecord) -> Result<()> {
        let is_new = !self.path.exists() || std::fs::metadata(&self.path)?.len() == 0;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut wtr = WriterBuilder::new().has_headers(is_new).from_writer(file);
        let (photo_id, photo_link) = record
            .photo
            .as_ref()
            .map(|p| (p.file_id.as_str(), p.link.as_str()))
            .unwrap_or(("", ""));
        wtr.serialize(RefillCsvRow {
            site_id: &record.site_id,
            tanggal_pengisian: record.refill_date.format("%Y-%m-%d").to_string(),
            jumlah_pengisian_liter: record.liters,
            photo_id,
            photo_link,
        })?;
        wtr.flush()?;
        info!(site_id = %record.site_id, liters = record.liters, "refill appended");
        Ok(())
    }
}
