// Tracker Pengisian BBM: refill form, per-site status, refill history.
use super::{edit_search, edit_selection, offer_export, NO_DATA, PREVIEW_ROWS};
use crate::cache::DataCache;
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::filter::Filtered;
use crate::fuel::{self, FuelEntry, FuelStatus, RefillForm, RefillLog};
use crate::loader::CsvRefillLog;
use crate::output::{preview_table_rows, ExportTable, ExportValue, NumFmt};
use crate::prompt::{self, read_choice, Prompt};
use crate::session::SessionContext;
use crate::types::{CountRow, FuelStatusRow, RefillHistoryRow};
use crate::util::{format_number, format_opt};
use chrono::NaiveDate;

pub fn status_rows(entries: &[&FuelEntry], today: NaiveDate) -> Vec<FuelStatusRow> {
    fuel::latest_per_site(entries)
        .into_iter()
        .map(|e| {
            let s = fuel::snapshot(e, today);
            FuelStatusRow {
                area: e.area().to_string(),
                regional: e.regional().to_string(),
                site_id: e.record.site_id.clone(),
                site_name: e.site_name().to_string(),
                refill_date: e.record.refill_date.format("%Y-%m-%d").to_string(),
                liters: format_number(e.record.liters, 2),
                liters_per_day: format_opt(e.site.as_ref().and_then(|m| m.liters_per_day), 2),
                liters_consumed: format_opt(s.liters_consumed, 2),
                percent_consumed: s
                    .fraction_consumed
                    .map(|f| format!("{}%", format_number(f * 100.0, 2)))
                    .unwrap_or_else(|| "-".to_string()),
                empty_date: s
                    .empty_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                status: s.status.to_string(),
            }
        })
        .collect()
}

/// Latest refill per site with its consumption, as exported from the status view.
pub fn status_export_table(entries: &[&FuelEntry], today: NaiveDate) -> ExportTable {
    let headers = [
        "Area",
        "Regional",
        "Site ID",
        "Site Name",
        "Tanggal Pengisian",
        "Jumlah (Liter)",
        "Liter per Hari",
        "Liter Terpakai",
        "Persentase Terpakai",
        "Tanggal Habis",
        "Status BBM",
    ];
    let mut table = ExportTable::new("BBM Data", headers.iter().map(|h| h.to_string()).collect());
    for e in fuel::latest_per_site(entries) {
        let s = fuel::snapshot(e, today);
        table.rows.push(vec![
            ExportValue::text(e.area()),
            ExportValue::text(e.regional()),
            ExportValue::text(e.record.site_id.as_str()),
            ExportValue::text(e.site_name()),
            ExportValue::text(e.record.refill_date.format("%Y-%m-%d").to_string()),
            ExportValue::number(Some(e.record.liters), NumFmt::TwoDecimals),
            ExportValue::number(e.site.as_ref().and_then(|m| m.liters_per_day), NumFmt::TwoDecimals),
            ExportValue::number(s.liters_consumed, NumFmt::TwoDecimals),
            ExportValue::number(s.fraction_consumed.map(|f| f * 100.0), NumFmt::Percent),
            ExportValue::text(s.empty_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()),
            ExportValue::text(s.status.to_string()),
        ]);
    }
    table
}

/// Sites per status, most urgent first; statuses with no site are left out.
pub fn status_counts(entries: &[&FuelEntry], today: NaiveDate) -> Vec<CountRow> {
    let latest = fuel::latest_per_site(entries);
    [FuelStatus::Critical, FuelStatus::Warning, FuelStatus::Normal]
        .into_iter()
        .map(|status| CountRow {
            label: status.to_string(),
            count: latest.iter().filter(|e| fuel::snapshot(e, today).status == status).count(),
        })
        .filter(|c| c.count > 0)
        .collect()
}

pub fn history_rows(entries: &[&FuelEntry]) -> Vec<RefillHistoryRow> {
    fuel::history(entries)
        .into_iter()
        .map(|e| RefillHistoryRow {
            area: e.area().to_string(),
            regional: e.regional().to_string(),
            site_id: e.record.site_id.clone(),
            site_name: e.site_name().to_string(),
            refill_date: e.record.refill_date.format("%Y-%m-%d").to_string(),
            liters: format_number(e.record.liters, 2),
            photo_link: e.record.photo.as_ref().map(|p| p.link.clone()).unwrap_or_default(),
        })
        .collect()
}

pub fn history_export_table(entries: &[&FuelEntry]) -> ExportTable {
    let headers = ["Area", "Regional", "Site ID", "Site Name", "Tanggal Pengisian", "Jumlah (Liter)", "Photo ID", "Photo Link"];
    let mut table = ExportTable::new("Riwayat Pengisian", headers.iter().map(|h| h.to_string()).collect());
    for e in fuel::history(entries) {
        let (id, link) = e
            .record
            .photo
            .as_ref()
            .map(|p| (p.file_id.clone(), p.link.clone()))
            .unwrap_or_default();
        table.rows.push(vec![
            ExportValue::text(e.area()),
            ExportValue::text(e.regional()),
            ExportValue::text(e.record.site_id.as_str()),
            ExportValue::text(e.site_name()),
            ExportValue::text(e.record.refill_date.format("%Y-%m-%d").to_string()),
            ExportValue::number(Some(e.record.liters), NumFmt::TwoDecimals),
            ExportValue::text(id),
            ExportValue::text(link),
        ]);
    }
    table
}

/// Validate and append one refill. Nothing is written when validation fails.
pub fn submit_refill(cfg: &Config, cache: &mut DataCache, log: &mut dyn RefillLog, form: &RefillForm) -> Result<()> {
    let record = {
        let data = cache.fuel(cfg)?;
        form.validate(&data.sites, &cfg.photo_link_base)?
    };
    log.append(&record)?;
    cache.invalidate_fuel();
    Ok(())
}

fn show_form(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache) -> Result<()> {
    println!("\nInput Pengisian BBM\n");
    let site_id = p.line("Site ID: ");
    let refill_date = Some(prompt::read_date(p, "Tanggal pengisian", cfg.today()));
    let liters = prompt::read_number(p, "Jumlah pengisian (liter): ").unwrap_or(0.0);
    let photo = p.line("Photo ID (optional): ");
    let form = RefillForm {
        site_id,
        refill_date,
        liters,
        photo_id: Some(photo).filter(|s| !s.is_empty()),
    };

    let mut log = CsvRefillLog::new(&cfg.fuel_log_file, &cfg.photo_link_base);
    match submit_refill(cfg, cache, &mut log, &form) {
        Ok(()) => println!("Data pengisian BBM tersimpan.\n"),
        Err(DashboardError::Validation(msg)) => println!("{}\n", msg),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn show_status(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let data = cache.fuel(cfg)?;
    println!("\nStatus BBM per Site (as of {})\n", cfg.today().format("%Y-%m-%d"));
    edit_search(p, &mut session.fuel_status);
    edit_selection(p, &mut session.fuel_status, &data.entries);
    let Filtered::Rows(rows) = session.fuel_status.apply(&data.entries) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    let counts = status_counts(&rows, cfg.today());
    preview_table_rows(&counts, counts.len());
    preview_table_rows(&status_rows(&rows, cfg.today()), PREVIEW_ROWS);
    offer_export(p, cfg, &status_export_table(&rows, cfg.today()), "bbm_status", true)
}

fn show_history(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let data = cache.fuel(cfg)?;
    println!("\nRiwayat Pengisian BBM\n");
    edit_search(p, &mut session.fuel_history);
    edit_selection(p, &mut session.fuel_history, &data.entries);
    let Filtered::Rows(rows) = session.fuel_history.apply(&data.entries) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    preview_table_rows(&history_rows(&rows), PREVIEW_ROWS);
    offer_export(p, cfg, &history_export_table(&rows), "riwayat_pengisian_bbm", false)
}

pub fn show(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    loop {
        println!("Tracker Pengisian BBM:");
        println!("[1] Input Pengisian");
        println!("[2] Status BBM");
        println!("[3] Riwayat Pengisian");
        println!("[0] Back\n");
        match read_choice(p).as_str() {
            "1" => show_form(p, cfg, cache)?,
            "2" => show_status(p, cfg, cache, session)?,
            "3" => show_history(p, cfg, cache, session)?,
            "0" | "" => return Ok(()),
            _ => println!("Invalid choice. Please enter 0-3.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FuelRefillRecord, PhotoRef, SiteMaster};
    use chrono::Days;

    const LINK: &str = "https://drive.google.com/uc?export=download&id=";

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().checked_add_days(Days::new(n)).unwrap()
    }

    fn entries() -> Vec<FuelEntry> {
        let master = [
            SiteMaster {
                site_id: "S1".to_string(),
                site_name: "Site One".to_string(),
                area: "AREA 1".to_string(),
                regional: "SUMBAGSEL".to_string(),
                liters_per_day: Some(100.0),
            },
            SiteMaster {
                site_id: "S2".to_string(),
                site_name: "Site Two".to_string(),
                area: "AREA 1".to_string(),
                regional: "SUMBAGSEL".to_string(),
                liters_per_day: Some(10.0),
            },
        ];
        let records = vec![
            FuelRefillRecord {
                site_id: "S1".to_string(),
                refill_date: day(0),
                liters: 1000.0,
                photo: Some(PhotoRef::from_id("p1", LINK)),
            },
            FuelRefillRecord {
                site_id: "S2".to_string(),
                refill_date: day(0),
                liters: 1000.0,
                photo: None,
            },
        ];
        fuel::join_site_master(records, &master)
    }

    #[test]
    fn status_rows_show_consumption() {
        let e = entries();
        let refs: Vec<&FuelEntry> = e.iter().collect();
        let rows = status_rows(&refs, day(9));
        assert_eq!(rows[0].site_id, "S1");
        assert_eq!(rows[0].percent_consumed, "90.00%");
        assert_eq!(rows[0].status, "Segera Isi BBM (90%+)");
        assert_eq!(rows[1].status, "Aman");

        let counts = status_counts(&refs, day(9));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].label, "Aman");
    }

    #[test]
    fn status_export_has_one_row_per_site() {
        let mut e = entries();
        let master = e[0].site.clone().unwrap();
        let refill = FuelRefillRecord {
            site_id: "S1".to_string(),
            refill_date: day(5),
            liters: 2000.0,
            photo: None,
        };
        e.extend(fuel::join_site_master(vec![refill], &[master]));
        let refs: Vec<&FuelEntry> = e.iter().collect();
        let table = status_export_table(&refs, day(9));
        assert_eq!(table.headers.len(), 11);
        assert_eq!(table.rows.len(), 2);

        let s1 = &table.rows[0];
        assert_eq!(s1[2], ExportValue::text("S1"));
        assert_eq!(s1[4], ExportValue::text("2025-04-06"));
        assert_eq!(s1[6], ExportValue::Number(100.0, NumFmt::TwoDecimals));
        assert_eq!(s1[7], ExportValue::Number(400.0, NumFmt::TwoDecimals));
        assert_eq!(s1[8], ExportValue::Number(20.0, NumFmt::Percent));
        assert_eq!(s1[10], ExportValue::text("Aman"));
        assert!(table.to_xlsx().is_ok());
    }

    #[test]
    fn history_carries_photo_link() {
        let e = entries();
        let refs: Vec<&FuelEntry> = e.iter().collect();
        let rows = history_rows(&refs);
        assert_eq!(rows[0].photo_link, format!("{}p1", LINK));
        let table = history_export_table(&refs);
        assert_eq!(table.rows[0][6], ExportValue::text("p1"));
        assert_eq!(table.rows[1][7], ExportValue::text(""));
    }

    #[test]
    fn submit_appends_valid_and_rejects_invalid() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("master.csv"),
            "site_id,site_name,area,regional,liter_per_hari\nS1,Site One,AREA 1,SUMBAGSEL,100\n",
        )
        .unwrap();
        let cfg = Config {
            fuel_log_file: dir.path().join("log.csv"),
            site_master_file: dir.path().join("master.csv"),
            ..Config::from_lookup(|_| None).unwrap()
        };
        let mut cache = DataCache::default();
        let mut log = CsvRefillLog::new(&cfg.fuel_log_file, &cfg.photo_link_base);

        let mut form = RefillForm {
            site_id: "S1".to_string(),
            refill_date: Some(day(0)),
            liters: 500.0,
            photo_id: None,
        };
        submit_refill(&cfg, &mut cache, &mut log, &form).unwrap();
        assert_eq!(cache.fuel(&cfg).unwrap().entries.len(), 1);

        form.site_id = "UNKNOWN".to_string();
        let err = submit_refill(&cfg, &mut cache, &mut log, &form).unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
