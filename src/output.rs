use crate::error::Result;
use crate::threshold::CellColors;
use crate::util::{format_currency, format_int, format_number};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::info;

/// Display and spreadsheet format of a numeric export cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumFmt {
    TwoDecimals,
    /// Value already on the 0-100 scale.
    Percent,
    Currency,
    Integer,
    /// Latitude or longitude in decimal degrees.
    Coordinate,
}

impl NumFmt {
    fn excel(self) -> &'static str {
        match self {
            NumFmt::TwoDecimals => "0.00",
            NumFmt::Percent => "0.00\"%\"",
            NumFmt::Currency => "\"Rp \"#,##0",
            NumFmt::Integer => "0",
            NumFmt::Coordinate => "0.000000",
        }
    }

    pub fn text(self, v: f64) -> String {
        match self {
            NumFmt::TwoDecimals => format_number(v, 2),
            NumFmt::Percent => format!("{}%", format_number(v, 2)),
            NumFmt::Currency => format_currency(v),
            NumFmt::Integer => format_int(v.round() as i64),
            NumFmt::Coordinate => format!("{:.6}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Empty,
    Text(String),
    Number(f64, NumFmt),
    /// Number drawn with the threshold colours.
    Classified(f64, NumFmt, CellColors),
}

impl ExportValue {
    pub fn text(s: impl Into<String>) -> Self {
        ExportValue::Text(s.into())
    }

    pub fn number(v: Option<f64>, fmt: NumFmt) -> Self {
        match v {
            Some(v) if v.is_finite() => ExportValue::Number(v, fmt),
            _ => ExportValue::Empty,
        }
    }

    pub fn display(&self) -> String {
        match self {
            ExportValue::Empty => String::new(),
            ExportValue::Text(s) => s.clone(),
            ExportValue::Number(v, fmt) | ExportValue::Classified(v, fmt, _) => fmt.text(*v),
        }
    }

    /// Plain value for CSV: numbers keep two decimals without separators,
    /// coordinates keep every digit.
    fn csv_field(&self) -> String {
        match self {
            ExportValue::Empty => String::new(),
            ExportValue::Text(s) => s.clone(),
            ExportValue::Number(v, NumFmt::Integer) | ExportValue::Classified(v, NumFmt::Integer, _) => {
                format!("{}", v.round() as i64)
            }
            ExportValue::Number(v, NumFmt::Coordinate) | ExportValue::Classified(v, NumFmt::Coordinate, _) => {
                v.to_string()
            }
            ExportValue::Number(v, _) | ExportValue::Classified(v, _, _) => format!("{:.2}", v),
        }
    }
}

/// A rendered table ready for console preview, CSV or XLSX.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<ExportValue>>,
}

impl ExportTable {
    pub fn new(sheet: &str, headers: Vec<String>) -> Self {
        ExportTable {
            sheet: sheet.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.csv_field()))?;
        }
        wtr.flush()?;
        wtr.into_inner().map_err(|e| e.into_error().into())
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet)?;

        let header = Format::new().set_bold();
        for (col, h) in self.headers.iter().enumerate() {
            sheet.write_with_format(0, col as u16, h.as_str(), &header)?;
            sheet.set_column_width(col as u16, (h.len().max(10) + 2) as f64).ok();
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                let c = col as u16;
                match value {
                    ExportValue::Empty => {}
                    ExportValue::Text(s) => {
                        sheet.write(r, c, s.as_str())?;
                    }
                    ExportValue::Number(v, fmt) => {
                        let f = Format::new().set_num_format(fmt.excel());
                        sheet.write_with_format(r, c, *v, &f)?;
                    }
                    ExportValue::Classified(v, fmt, colors) => {
                        let f = Format::new()
                            .set_num_format(fmt.excel())
                            .set_background_color(colors.background)
                            .set_font_color(colors.font);
                        sheet.write_with_format(r, c, *v, &f)?;
                    }
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    /// Markdown table of the first `max_rows` rows.
    pub fn preview(&self, max_rows: usize) {
        if self.rows.is_empty() {
            println!("(no rows)\n");
            return;
        }
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        for row in self.rows.iter().take(max_rows) {
            builder.push_record(row.iter().map(|v| v.display()));
        }
        let table_str = builder.build().with(Style::markdown()).to_string();
        println!("{}", table_str);
        if self.rows.len() > max_rows {
            println!("({} more rows)", format_int(self.rows.len() - max_rows));
        }
        println!();
    }
}

/// Write an export into `dir`, creating it when needed.
pub fn write_bytes(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(path)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    info!(path = %path.display(), "summary written");
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::MEETS_COLORS;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn table() -> ExportTable {
        let mut t = ExportTable::new("Summary", vec!["Site ID".to_string(), "Apr-25".to_string(), "PO".to_string()]);
        t.rows.push(vec![
            ExportValue::text("S1"),
            ExportValue::Classified(95.0, NumFmt::TwoDecimals, MEETS_COLORS),
            ExportValue::number(Some(12_500_000.0), NumFmt::Currency),
        ]);
        t.rows.push(vec![
            ExportValue::text("S2"),
            ExportValue::number(None, NumFmt::TwoDecimals),
            ExportValue::number(Some(f64::NAN), NumFmt::Currency),
        ]);
        t
    }

    #[test]
    fn csv_uses_two_decimals_and_blank_for_missing() {
        let text = String::from_utf8(table().to_csv().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Site ID,Apr-25,PO");
        assert_eq!(lines[1], "S1,95.00,12500000.00");
        assert_eq!(lines[2], "S2,,");
    }

    #[test]
    fn display_formats() {
        assert_eq!(NumFmt::Currency.text(12_500_000.0), "Rp 12,500,000");
        assert_eq!(NumFmt::Percent.text(95.0), "95.00%");
        assert_eq!(ExportValue::number(Some(94.456), NumFmt::TwoDecimals).display(), "94.46");
        assert_eq!(NumFmt::Coordinate.text(-2.976123), "-2.976123");
    }

    #[test]
    fn coordinates_keep_full_precision() {
        let mut t = ExportTable::new("Assets", vec!["Latitude".to_string(), "Longitude".to_string()]);
        t.rows.push(vec![
            ExportValue::number(Some(-2.976123), NumFmt::Coordinate),
            ExportValue::number(Some(104.775412), NumFmt::Coordinate),
        ]);
        let text = String::from_utf8(t.to_csv().unwrap()).unwrap();
        assert_eq!(text.lines().nth(1), Some("-2.976123,104.775412"));

        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(t.to_xlsx().unwrap())).unwrap();
        let range = wb.worksheet_range("Assets").unwrap();
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(-2.976123)));
    }

    #[test]
    fn xlsx_reads_back_with_calamine() {
        let bytes = table().to_xlsx().unwrap();
        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = wb.worksheet_range("Summary").unwrap();
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("Apr-25".to_string())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(95.0)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Float(12_500_000.0)));
    }

    #[test]
    fn write_bytes_creates_the_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let path = write_bytes(&target, "a.csv", b"x\n").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"x\n");
    }
}
