// Interactive pages. Each page pulls its data through the cache, lets the
// operator adjust the session filters, and prints tables. The table builders
// are plain functions so they can be tested without a console.
pub mod availability;
pub mod dapot;
pub mod fuel;

use crate::config::Config;
use crate::error::Result;
use crate::filter::{Dimension, Filterable, Selection};
use crate::output::{self, ExportTable};
use crate::prompt::{self, Prompt};
use crate::types::PoMonth;

pub const NO_DATA: &str = "No data available for selected filters.";
pub const PREVIEW_ROWS: usize = 15;

/// Walk the cascade top-down, offering only the options left by the levels
/// above, then clear any choice the new upstream picks made stale.
pub fn edit_selection<T: Filterable>(p: &mut dyn Prompt, sel: &mut Selection, rows: &[T]) {
    for dim in sel.dimensions() {
        let mut options = sel.options(rows, dim);
        if dim == Dimension::Month {
            options.sort_by_key(|o| PoMonth::from_sheet_name(o).map(|m| m.number()));
        }
        let choice = prompt::choose(p, dim, &options, sel.choice(dim));
        sel.set(dim, choice);
        sel.normalize(rows);
    }
}

/// Typed at the search prompt to drop the current search.
pub const CLEAR_SEARCH: &str = "-";

/// Ask for an optional site id search string. Blank keeps the current one,
/// `CLEAR_SEARCH` removes it.
pub fn edit_search(p: &mut dyn Prompt, sel: &mut Selection) {
    let current = sel.search.clone().unwrap_or_default();
    let raw = p.line(&format!("Search Site ID [{}] ('{}' clears): ", current, CLEAR_SEARCH));
    match raw.as_str() {
        "" => {}
        CLEAR_SEARCH => sel.set_search(""),
        _ => sel.set_search(&raw),
    }
}

/// Offer CSV (and XLSX when `xlsx` is set) downloads of `table`.
pub fn offer_export(p: &mut dyn Prompt, cfg: &Config, table: &ExportTable, stem: &str, xlsx: bool) -> Result<()> {
    if table.is_empty() || !prompt::confirm(p, "Export table") {
        return Ok(());
    }
    let path = output::write_bytes(&cfg.export_dir, &format!("{}.csv", stem), &table.to_csv()?)?;
    println!("(Full table exported to {})", path.display());
    if xlsx {
        let path = output::write_bytes(&cfg.export_dir, &format!("{}.xlsx", stem), &table.to_xlsx()?)?;
        println!("(Formatted workbook exported to {})", path.display());
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Choice, Filtered};
    use crate::prompt::ScriptedPrompt;
    use crate::types::DapotAsset;

    fn asset(area: &str, regional: &str, id: &str) -> DapotAsset {
        DapotAsset {
            region: "Sumbagsel".to_string(),
            area: area.to_string(),
            regional: regional.to_string(),
            site_id: id.to_string(),
            site_name: String::new(),
            site_class: String::new(),
            status: String::new(),
            capacity_kva: String::new(),
            battery_bank: String::new(),
            rectifier_modules: String::new(),
            latitude: None,
            longitude: None,
            fields: Vec::new(),
        }
    }

    #[test]
    fn cascade_drops_stale_downstream_choice() {
        let rows = vec![
            asset("AREA 1", "SUMBAGSEL", "A"),
            asset("AREA 1", "SUMBAGTENG", "B"),
            asset("AREA 3", "JATIM", "C"),
        ];
        let mut sel = Selection::new(&[Dimension::Area, Dimension::Regional]);
        sel.set(Dimension::Regional, Choice::Only("JATIM".to_string()));

        // Area 1 picked, then the regional prompt is left blank.
        let mut p = ScriptedPrompt::new(&["1", ""]);
        edit_selection(&mut p, &mut sel, &rows);
        assert_eq!(sel.choice(Dimension::Area), &Choice::Only("AREA 1".to_string()));
        assert_eq!(sel.choice(Dimension::Regional), &Choice::ShowAll);
        assert!(matches!(sel.apply(&rows), Filtered::Rows(r) if r.len() == 2));
    }

    #[test]
    fn blank_keeps_search_and_dash_clears_it() {
        let mut sel = Selection::new(&[Dimension::Site]);
        let mut p = ScriptedPrompt::new(&["PlG", "", "-"]);
        edit_search(&mut p, &mut sel);
        assert_eq!(sel.search.as_deref(), Some("plg"));
        edit_search(&mut p, &mut sel);
        assert_eq!(sel.search.as_deref(), Some("plg"));
        edit_search(&mut p, &mut sel);
        assert_eq!(sel.search, None);
    }
}
