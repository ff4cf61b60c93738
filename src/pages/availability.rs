// CDC Availability page: monthly PO summary, daily tracker, and the
// site x month summary with threshold colouring.
use super::{edit_search, edit_selection, offer_export, NO_DATA, PREVIEW_ROWS};
use crate::cache::DataCache;
use crate::config::Config;
use crate::error::Result;
use crate::filter::{DateRange, Dimension, Filtered};
use crate::output::{self, preview_table_rows, ExportTable, ExportValue, NumFmt};
use crate::pivot::{monthly_pivot, PivotedSummary};
use crate::prompt::{self, read_choice, Prompt};
use crate::session::SessionContext;
use crate::threshold::{self, classify_summary};
use crate::types::{Achievement, CountRow, LongMeasurement, MonthlyPoFact, PoSummaryRow, SummaryStats};
use crate::util::{average, format_currency, format_int, format_opt, format_percent};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tabled::Tabled;
use tracing::info;

/// Sorted by year, then calendar month, then workbook row.
pub fn sort_po_rows(rows: &mut [&MonthlyPoFact]) {
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.month.number().cmp(&b.month.number()))
            .then_with(|| a.row_no.cmp(&b.row_no))
            .then_with(|| a.site_id.cmp(&b.site_id))
    });
}

pub fn po_summary_rows(rows: &[&MonthlyPoFact]) -> Vec<PoSummaryRow> {
    rows.iter()
        .map(|f| PoSummaryRow {
            no: f.row_no.map(|n| n.to_string()).unwrap_or_default(),
            period: f.period_label(),
            regional: f.regional.clone(),
            site_id: f.site_id.clone(),
            site_name: f.site_name.clone(),
            nominal_po: f.nominal_po.map(format_currency).unwrap_or_else(|| "-".to_string()),
            target: f.target.map(format_percent).unwrap_or_else(|| "-".to_string()),
            actual: f.actual.map(format_percent).unwrap_or_else(|| "-".to_string()),
            penalty_amount: f.penalty_amount.map(format_currency).unwrap_or_else(|| "-".to_string()),
            achievement: f.achievement.map(|a| a.to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Rows per achievement value. `None` when achievement could not be derived.
pub fn achievement_counts(rows: &[&MonthlyPoFact], available: bool) -> Option<Vec<CountRow>> {
    if !available {
        return None;
    }
    let mut counts: BTreeMap<Achievement, usize> = BTreeMap::new();
    for a in rows.iter().filter_map(|f| f.achievement) {
        *counts.entry(a).or_insert(0) += 1;
    }
    Some(
        counts
            .into_iter()
            .map(|(a, count)| CountRow {
                label: a.to_string(),
                count,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct PoTrendRow {
    #[tabled(rename = "Period")]
    pub period: String,
    #[tabled(rename = "Availability")]
    pub actual: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Nominal PO")]
    pub nominal_po: String,
    #[tabled(rename = "Penalty")]
    pub penalty: String,
}

/// Month-by-month availability vs target and PO vs penalty for one site.
pub fn po_trend(rows: &[&MonthlyPoFact], site_id: &str) -> Vec<PoTrendRow> {
    rows.iter()
        .filter(|f| f.site_id == site_id)
        .map(|f| PoTrendRow {
            period: f.period_label(),
            actual: format_opt(f.actual, 2),
            target: format_opt(f.target, 2),
            nominal_po: f.nominal_po.map(format_currency).unwrap_or_else(|| "-".to_string()),
            penalty: f.penalty_amount.map(format_currency).unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn po_export_table(rows: &[&MonthlyPoFact]) -> ExportTable {
    let headers = [
        "No",
        "Month_Year",
        "Regional TI",
        "Site Id",
        "Site Name",
        "Daya PO",
        "Periode Tagihan (Awal)",
        "Periode Tagihan (Akhir)",
        "Jumlah Periode (Bulan)",
        "Nominal PO",
        "Index BBM",
        "Class Site",
        "Target Availability (%)",
        "Avaibility",
        "Persentase Penalty",
        "Nilai Penalty",
        "Nilai BAST",
        "Nilai BAST dikurangi Penalty",
        "Ava Achievement",
    ];
    let mut table = ExportTable::new("PO Summary", headers.iter().map(|h| h.to_string()).collect());
    for f in rows {
        table.rows.push(vec![
            ExportValue::number(f.row_no.map(f64::from), NumFmt::Integer),
            ExportValue::text(f.period_label()),
            ExportValue::text(f.regional.as_str()),
            ExportValue::text(f.site_id.as_str()),
            ExportValue::text(f.site_name.as_str()),
            ExportValue::text(f.power_po.as_str()),
            ExportValue::text(f.billing_start.as_str()),
            ExportValue::text(f.billing_end.as_str()),
            ExportValue::number(f.billing_months, NumFmt::Integer),
            ExportValue::number(f.nominal_po, NumFmt::Currency),
            ExportValue::number(f.fuel_index, NumFmt::TwoDecimals),
            ExportValue::text(f.site_class.as_str()),
            ExportValue::number(f.target, NumFmt::Percent),
            ExportValue::number(f.actual, NumFmt::Percent),
            ExportValue::number(f.penalty_pct, NumFmt::Percent),
            ExportValue::number(f.penalty_amount, NumFmt::Currency),
            ExportValue::number(f.bast_amount, NumFmt::Currency),
            ExportValue::number(f.bast_after_penalty, NumFmt::Currency),
            ExportValue::text(f.achievement.map(|a| a.to_string()).unwrap_or_default()),
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub site_id: String,
    pub date: NaiveDate,
    pub availability: Option<f64>,
}

/// Data behind the daily availability chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub title: String,
    /// `"Target"` for a single site, `"Avg Target"` otherwise.
    pub target_label: &'static str,
    pub target: Option<f64>,
    pub points: Vec<SeriesPoint>,
}

pub fn daily_series(rows: &[&LongMeasurement]) -> DailySeries {
    let mut sites: Vec<(&str, &str)> = rows.iter().map(|m| (m.site_id.as_str(), m.site_name.as_str())).collect();
    sites.sort();
    sites.dedup_by(|a, b| a.0 == b.0);

    let (title, target_label, target) = match sites.as_slice() {
        [(id, name)] => (
            format!("Availability for Site ID: {} - {}", id, name),
            "Target",
            rows.first().map(|m| m.target),
        ),
        _ => {
            let targets: Vec<f64> = rows.iter().map(|m| m.target).collect();
            let target = if targets.is_empty() { None } else { Some(average(&targets)) };
            ("Availability Overview".to_string(), "Avg Target", target)
        }
    };

    let mut points: Vec<SeriesPoint> = rows
        .iter()
        .map(|m| SeriesPoint {
            site_id: m.site_id.clone(),
            date: m.date,
            availability: m.availability,
        })
        .collect();
    points.sort_by(|a, b| a.site_id.cmp(&b.site_id).then_with(|| a.date.cmp(&b.date)));

    DailySeries {
        title,
        target_label,
        target,
        points,
    }
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct SeriesOverviewRow {
    #[tabled(rename = "Site ID")]
    pub site_id: String,
    #[tabled(rename = "Days")]
    pub days: usize,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Avg")]
    pub avg: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "Below Target")]
    pub below_target: usize,
}

/// One line per plotted site. Blank days count toward `days` only.
pub fn series_overview(series: &DailySeries) -> Vec<SeriesOverviewRow> {
    let mut per_site: BTreeMap<&str, (usize, Vec<f64>)> = BTreeMap::new();
    for pt in &series.points {
        let entry = per_site.entry(pt.site_id.as_str()).or_default();
        entry.0 += 1;
        if let Some(v) = pt.availability.filter(|v| v.is_finite()) {
            entry.1.push(v);
        }
    }
    per_site
        .into_iter()
        .map(|(site_id, (days, values))| {
            let (min, max) = values
                .iter()
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
                    None => Some((*v, *v)),
                })
                .unzip();
            let avg = if values.is_empty() { None } else { Some(average(&values)) };
            SeriesOverviewRow {
                site_id: site_id.to_string(),
                days,
                min: format_opt(min, 2),
                avg: format_opt(avg, 2),
                max: format_opt(max, 2),
                below_target: series
                    .target
                    .map(|t| values.iter().filter(|v| **v < t).count())
                    .unwrap_or(0),
            }
        })
        .collect()
}

pub fn daily_export_table(rows: &[&LongMeasurement]) -> ExportTable {
    let headers = ["Area", "Site ID", "Regional", "Site Name", "Site Class", "Target AVA", "Date", "Availability"];
    let mut table = ExportTable::new("Daily Availability", headers.iter().map(|h| h.to_string()).collect());
    for m in rows {
        table.rows.push(vec![
            ExportValue::text(m.area.as_str()),
            ExportValue::text(m.site_id.as_str()),
            ExportValue::text(m.regional.as_str()),
            ExportValue::text(m.site_name.as_str()),
            ExportValue::text(m.site_class.as_str()),
            ExportValue::number(Some(m.target), NumFmt::TwoDecimals),
            ExportValue::text(m.date.format("%Y-%m-%d").to_string()),
            ExportValue::number(m.availability, NumFmt::TwoDecimals),
        ]);
    }
    table
}

/// Pivot rendered with a running "No" column and threshold-coloured month cells.
pub fn summary_table(summary: &PivotedSummary) -> ExportTable {
    let mut headers: Vec<String> = ["No", "Area", "Regional", "Site ID", "Site Name", "Target AVA"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(summary.column_labels());

    let grid = classify_summary(summary);
    let mut table = ExportTable::new("Availability Summary", headers);
    for (i, (row, classes)) in summary.rows.iter().zip(&grid).enumerate() {
        let mut values = vec![
            ExportValue::Number((i + 1) as f64, NumFmt::Integer),
            ExportValue::text(row.key.area.as_str()),
            ExportValue::text(row.key.regional.as_str()),
            ExportValue::text(row.key.site_id.as_str()),
            ExportValue::text(row.key.site_name.as_str()),
            ExportValue::Number(row.key.target, NumFmt::TwoDecimals),
        ];
        for (cell, class) in row.cells.iter().zip(classes) {
            values.push(match (cell, class.colors()) {
                (Some(c), Some(colors)) => ExportValue::Classified(c.mean, NumFmt::TwoDecimals, colors),
                (Some(c), None) => ExportValue::number(Some(c.mean), NumFmt::TwoDecimals),
                (None, _) => ExportValue::Empty,
            });
        }
        table.rows.push(values);
    }
    table
}

pub fn summary_stats(summary: &PivotedSummary) -> SummaryStats {
    let t = threshold::tally(&classify_summary(summary));
    SummaryStats {
        total_sites: summary.rows.len(),
        total_months: summary.months.len(),
        months: summary.column_labels(),
        cells_meeting_target: t.meets,
        cells_missing_target: t.misses,
        cells_without_data: t.unclassified,
    }
}

fn show_po(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let table = cache.po(cfg)?;
    println!("\nMonthly PO Summary ({} months loaded)\n", table.months_loaded.len());
    edit_selection(p, &mut session.po, &table.facts);

    let Filtered::Rows(mut rows) = session.po.apply(&table.facts) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    sort_po_rows(&mut rows);

    preview_table_rows(&po_summary_rows(&rows), PREVIEW_ROWS);
    match achievement_counts(&rows, table.achievement_available) {
        Some(counts) => {
            println!("Achievement Summary:");
            preview_table_rows(&counts, counts.len());
        }
        None => println!("Achievement not available: 'Avaibility' or 'Target Availability (%)' column missing.\n"),
    }
    if let Some(site) = session.po.selected(Dimension::Site) {
        println!("Trend for {}:", site);
        let trend = po_trend(&rows, site);
        preview_table_rows(&trend, trend.len());
    }
    offer_export(p, cfg, &po_export_table(&rows), "po_summary", true)
}

fn show_daily(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let data = cache.availability(cfg)?;
    let Some(full) = DateRange::spanning(&data.long) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    println!("\nDaily Availability Tracker\n");
    edit_search(p, &mut session.daily);
    edit_selection(p, &mut session.daily, &data.long);
    let current = session.daily.date_range.unwrap_or(full);
    let start = prompt::read_date(p, "Start date", current.start);
    let end = prompt::read_date(p, "End date", current.end);
    session.daily.date_range = Some(DateRange::new(start, end));

    let Filtered::Rows(rows) = session.daily.apply(&data.long) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    let series = daily_series(&rows);
    println!("{}", series.title);
    println!("{}: {}\n", series.target_label, format_opt(series.target, 2));
    let overview = series_overview(&series);
    preview_table_rows(&overview, PREVIEW_ROWS);

    let table = daily_export_table(&rows);
    table.preview(PREVIEW_ROWS);
    offer_export(p, cfg, &table, "daily_availability", false)
}

fn show_summary(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let data = cache.availability(cfg)?;
    println!("\nMonthly Availability Summary\n");
    if !data.report.dropped_columns.is_empty() {
        println!("Columns without a date header left out: {}\n", data.report.dropped_columns.join(", "));
    }
    edit_search(p, &mut session.summary);
    edit_selection(p, &mut session.summary, &data.long);

    let Filtered::Rows(rows) = session.summary.apply(&data.long) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    let summary = monthly_pivot(&rows);
    let table = summary_table(&summary);
    table.preview(PREVIEW_ROWS);

    let stats = summary_stats(&summary);
    println!(
        "Sites: {}  Months: {}  Meets target: {}  Below target: {}\n",
        format_int(stats.total_sites),
        format_int(stats.total_months),
        format_int(stats.cells_meeting_target),
        format_int(stats.cells_missing_target)
    );
    let path = cfg.export_path("summary.json");
    output::write_json(&path, &stats)?;
    info!(sites = stats.total_sites, months = stats.total_months, "availability summary built");
    offer_export(p, cfg, &table, "availability_summary", true)
}

pub fn show(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    loop {
        println!("CDC Availability:");
        println!("[1] Monthly PO Summary");
        println!("[2] Daily Availability Tracker");
        println!("[3] Monthly Availability Summary");
        println!("[0] Back\n");
        match read_choice(p).as_str() {
            "1" => show_po(p, cfg, cache, session)?,
            "2" => show_daily(p, cfg, cache, session)?,
            "3" => show_summary(p, cfg, cache, session)?,
            "0" | "" => return Ok(()),
            _ => println!("Invalid choice. Please enter 0-3.\n"),
        }
    }
}
