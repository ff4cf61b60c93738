// Dapot Asset CDC: site detail viewer and the filtered asset table.
use super::{edit_selection, offer_export, NO_DATA, PREVIEW_ROWS};
use crate::cache::DataCache;
use crate::config::Config;
use crate::dapot::{self, detail_metrics, distribution, site_detail};
use crate::error::Result;
use crate::filter::Filtered;
use crate::output::{preview_table_rows, ExportTable, ExportValue, NumFmt};
use crate::prompt::{read_choice, Prompt};
use crate::session::SessionContext;
use crate::types::{CountRow, DapotAsset, DapotRow};

/// Site ids containing `needle`, case-insensitive, without duplicates.
pub fn find_sites<'a>(assets: &'a [DapotAsset], needle: &str) -> Vec<&'a str> {
    let needle = needle.trim().to_lowercase();
    let mut ids: Vec<&str> = assets
        .iter()
        .map(|a| a.site_id.as_str())
        .filter(|id| id.to_lowercase().contains(&needle))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

pub fn count_rows(counts: Vec<(String, usize)>) -> Vec<CountRow> {
    counts.into_iter().map(|(label, count)| CountRow { label, count }).collect()
}

pub fn asset_export_table(rows: &[&DapotAsset]) -> ExportTable {
    let headers = [
        "Region",
        "Area",
        "Regional",
        "Site ID",
        "Site Name",
        "Site Class",
        "Status",
        "Kapasitas (KVA)",
        "Kapasitas Batere (Bank)",
        "Jumlah Modul Rectifier",
        "Latitude",
        "Longitude",
    ];
    let mut table = ExportTable::new("Dapot", headers.iter().map(|h| h.to_string()).collect());
    for a in rows {
        table.rows.push(vec![
            ExportValue::text(a.region.as_str()),
            ExportValue::text(a.area.as_str()),
            ExportValue::text(a.regional.as_str()),
            ExportValue::text(a.site_id.as_str()),
            ExportValue::text(a.site_name.as_str()),
            ExportValue::text(a.site_class.as_str()),
            ExportValue::text(a.status.as_str()),
            ExportValue::text(a.capacity_kva.as_str()),
            ExportValue::text(a.battery_bank.as_str()),
            ExportValue::text(a.rectifier_modules.as_str()),
            ExportValue::number(a.latitude, NumFmt::Coordinate),
            ExportValue::number(a.longitude, NumFmt::Coordinate),
        ]);
    }
    table
}

fn print_detail(a: &DapotAsset) {
    println!("\n{} - {}", a.site_id, a.site_name);
    for (label, value) in detail_metrics(a) {
        println!("  {:<24} {}", label, value);
    }
    println!("\nFull record:");
    for (key, value) in &a.fields {
        println!("  {:<32} {}", key, value);
    }
    println!();
}

fn show_detail(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let assets = cache.dapot(cfg)?;
    let current = session.dapot_site.clone().unwrap_or_default();
    let raw = p.line(&format!("Site ID [{}]: ", current));
    let needle = if raw.is_empty() { current } else { raw };
    if needle.is_empty() {
        return Ok(());
    }

    let matches = find_sites(assets, &needle);
    let exact = matches.iter().find(|id| id.eq_ignore_ascii_case(&needle)).copied();
    let chosen = match (exact, matches.as_slice()) {
        (Some(id), _) => id,
        (None, [id]) => *id,
        (None, []) => {
            println!("Site {} not found.\n", needle);
            return Ok(());
        }
        (None, many) => {
            println!("{} sites match '{}':", many.len(), needle);
            for id in many.iter().take(PREVIEW_ROWS) {
                println!("  {}", id);
            }
            println!();
            return Ok(());
        }
    };
    session.dapot_site = Some(chosen.to_string());
    if let Some(a) = site_detail(assets, chosen) {
        print_detail(a);
    }
    Ok(())
}

fn show_table(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    let assets = cache.dapot(cfg)?;
    println!("\nDapot Asset Table ({} assets)\n", assets.len());
    edit_selection(p, &mut session.dapot, assets);
    let Filtered::Rows(rows) = session.dapot.apply(assets) else {
        println!("{}\n", NO_DATA);
        return Ok(());
    };
    let table: Vec<DapotRow> = rows.iter().map(|a| dapot::to_row(a)).collect();
    preview_table_rows(&table, PREVIEW_ROWS);

    println!("Status distribution:");
    let status = count_rows(distribution(&rows, |a| a.status.as_str()));
    preview_table_rows(&status, status.len());
    println!("Site class distribution:");
    let class = count_rows(distribution(&rows, |a| a.site_class.as_str()));
    preview_table_rows(&class, class.len());

    offer_export(p, cfg, &asset_export_table(&rows), "dapot_assets", false)
}

pub fn show(p: &mut dyn Prompt, cfg: &Config, cache: &mut DataCache, session: &mut SessionContext) -> Result<()> {
    loop {
        println!("Dapot Asset CDC:");
        println!("[1] Site Detail");
        println!("[2] Asset Table");
        println!("[0] Back\n");
        match read_choice(p).as_str() {
            "1" => show_detail(p, cfg, cache, session)?,
            "2" => show_table(p, cfg, cache, session)?,
            "0" | "" => return Ok(()),
            _ => println!("Invalid choice. Please enter 0-2.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, class: &str, status: &str) -> DapotAsset {
        DapotAsset {
            region: "Puma".to_string(),
            area: "AREA 4".to_string(),
            regional: "PUMA".to_string(),
            site_id: id.to_string(),
            site_name: format!("{} name", id),
            site_class: class.to_string(),
            status: status.to_string(),
            capacity_kva: "150".to_string(),
            battery_bank: String::new(),
            rectifier_modules: String::new(),
            latitude: Some(-2.5337),
            longitude: Some(140.7181),
            fields: Vec::new(),
        }
    }

    #[test]
    fn site_search_is_case_insensitive_and_unique() {
        let assets = vec![asset("JAY001", "Gold", "On Service"), asset("jay002", "Silver", "Cut Off"), asset("JAY001", "Gold", "On Service")];
        assert_eq!(find_sites(&assets, "jay"), vec!["JAY001", "jay002"]);
        assert_eq!(find_sites(&assets, "002"), vec!["jay002"]);
        assert!(find_sites(&assets, "PLG").is_empty());
    }

    #[test]
    fn class_distribution_and_export() {
        let assets = vec![asset("A", "Gold", "On Service"), asset("B", "Silver", "On Service"), asset("C", "Gold", "Cut Off")];
        let rows: Vec<&DapotAsset> = assets.iter().collect();
        let class = count_rows(distribution(&rows, |a| a.site_class.as_str()));
        assert_eq!(class[0].label, "Gold");
        assert_eq!(class[0].count, 2);

        let table = asset_export_table(&rows);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][10], ExportValue::Number(-2.5337, NumFmt::Coordinate));
    }

    #[test]
    fn exported_coordinates_are_not_rounded() {
        let mut a = asset("PLG001", "Gold", "On Service");
        a.latitude = Some(-2.976123);
        a.longitude = Some(104.775412);
        let table = asset_export_table(&[&a]);
        let text = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",-2.976123,104.775412"));
        assert_eq!(table.rows[0][11].display(), "104.775412");
    }
}
