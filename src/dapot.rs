// Dapot (asset inventory) normalization and lookups.
use crate::types::{DapotAsset, DapotRow};
use crate::util::{parse_f64_safe, title_case};
use std::collections::{BTreeMap, HashMap};

/// `"on service"` / `"cut off"` / `"idle"` collapse to two labels. Anything
/// else stays lower-cased so typos remain visible in the distribution.
pub fn normalize_status(raw: &str) -> String {
    let s = raw.trim().to_lowercase();
    match s.as_str() {
        "on service" => "On Service".to_string(),
        "cut off" | "idle" => "Cut Off".to_string(),
        _ => s,
    }
}

/// Build an asset from one sheet row keyed by upper-cased header.
/// Returns `None` for rows without a site id.
pub fn asset_from_row(region: &str, headers: &[String], values: &HashMap<&str, String>) -> Option<DapotAsset> {
    let get = |key: &str| values.get(key).cloned().unwrap_or_default();
    let site_id = get("SITE ID");
    if site_id.is_empty() {
        return None;
    }
    let coord = |key: &str| parse_f64_safe(values.get(key).map(|s| s.as_str()));
    let fields = headers
        .iter()
        .filter(|h| !h.is_empty())
        .map(|h| {
            let v = values.get(h.as_str()).cloned().unwrap_or_default();
            match h.as_str() {
                "ON SERVICE / CUT OFF" => ("STATUS".to_string(), normalize_status(&v)),
                "SITE CLASS" => (h.clone(), title_case(&v)),
                _ => (h.clone(), v),
            }
        })
        .collect();
    Some(DapotAsset {
        region: region.to_string(),
        area: get("AREA"),
        regional: get("REGIONAL"),
        site_id,
        site_name: get("SITE NAME"),
        site_class: title_case(&get("SITE CLASS")),
        status: normalize_status(&get("ON SERVICE / CUT OFF")),
        capacity_kva: get("KAPASITAS (KVA)"),
        battery_bank: get("KAPASITAS BATERE (BANK)"),
        rectifier_modules: get("JUMLAH MODUL RECTIFIER"),
        latitude: coord("LATTITUDE").or_else(|| coord("LATITUDE")),
        longitude: coord("LONGITUDE"),
        fields,
    })
}

/// First record for the site, as shown in the detail viewer.
pub fn site_detail<'a>(assets: &'a [DapotAsset], site_id: &str) -> Option<&'a DapotAsset> {
    assets.iter().find(|a| a.site_id == site_id)
}

/// Count per label, most frequent first. Blank labels are left out.
pub fn distribution<'a, F>(rows: &[&'a DapotAsset], label: F) -> Vec<(String, usize)>
where
    F: Fn(&'a DapotAsset) -> &'a str,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        let l = label(*r);
        if !l.is_empty() {
            *counts.entry(l).or_insert(0) += 1;
        }
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

pub fn to_row(a: &DapotAsset) -> DapotRow {
    DapotRow {
        region: a.region.clone(),
        area: a.area.clone(),
        regional: a.regional.clone(),
        site_id: a.site_id.clone(),
        site_name: a.site_name.clone(),
        site_class: a.site_class.clone(),
        status: a.status.clone(),
    }
}

fn or_na(s: &str) -> String {
    if s.is_empty() {
        "N/A".to_string()
    } else {
        s.to_string()
    }
}

/// Headline metrics of the detail viewer, in display order.
pub fn detail_metrics(a: &DapotAsset) -> Vec<(&'static str, String)> {
    vec![
        ("Area", or_na(&a.area)),
        ("Regional", or_na(&a.regional)),
        ("Status", or_na(&a.status)),
        ("Kapasitas (KVA)", or_na(&a.capacity_kva)),
        ("Kapasitas Batere (Bank)", or_na(&a.battery_bank)),
        ("Jumlah Modul Rectifier", or_na(&a.rectifier_modules)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(pairs: &[(&str, &str)]) -> Option<DapotAsset> {
        let headers: Vec<String> = pairs.iter().map(|(h, _)| h.to_string()).collect();
        let values: HashMap<&str, String> = pairs.iter().map(|(h, v)| (*h, v.to_string())).collect();
        asset_from_row("Sumbagsel", &headers, &values)
    }

    #[test]
    fn status_is_standardized() {
        assert_eq!(normalize_status(" ON SERVICE "), "On Service");
        assert_eq!(normalize_status("Idle"), "Cut Off");
        assert_eq!(normalize_status("cut off"), "Cut Off");
        assert_eq!(normalize_status("Dismantle "), "dismantle");
    }

    #[test]
    fn row_is_normalized_and_keeps_full_record() {
        let a = asset(&[
            ("SITE ID", "PLG001"),
            ("SITE NAME", "Palembang CDC"),
            ("AREA", "AREA 1"),
            ("REGIONAL", "SUMBAGSEL"),
            ("SITE CLASS", "GOLD"),
            ("ON SERVICE / CUT OFF", "idle"),
            ("LATTITUDE", "'-2.9761"),
            ("LONGITUDE", "104.7754'"),
            ("KAPASITAS (KVA)", "200"),
        ])
        .unwrap();
        assert_eq!(a.region, "Sumbagsel");
        assert_eq!(a.site_class, "Gold");
        assert_eq!(a.status, "Cut Off");
        assert_eq!(a.latitude, Some(-2.9761));
        assert_eq!(a.longitude, Some(104.7754));
        assert!(a.fields.iter().any(|(k, v)| k == "STATUS" && v == "Cut Off"));
        assert!(a.fields.iter().any(|(k, v)| k == "SITE CLASS" && v == "Gold"));
        let metrics = detail_metrics(&a);
        assert_eq!(metrics[3], ("Kapasitas (KVA)", "200".to_string()));
        assert_eq!(metrics[4].1, "N/A");
    }

    #[test]
    fn rows_without_site_id_are_rejected() {
        assert!(asset(&[("SITE ID", ""), ("AREA", "AREA 1")]).is_none());
    }

    #[test]
    fn distribution_sorted_by_count() {
        let a = asset(&[("SITE ID", "A"), ("ON SERVICE / CUT OFF", "on service")]).unwrap();
        let b = asset(&[("SITE ID", "B"), ("ON SERVICE / CUT OFF", "cut off")]).unwrap();
        let c = asset(&[("SITE ID", "C"), ("ON SERVICE / CUT OFF", "ON SERVICE")]).unwrap();
        let rows = vec![&a, &b, &c];
        let d = distribution(&rows, |x| x.status.as_str());
        assert_eq!(d, vec![("On Service".to_string(), 2), ("Cut Off".to_string(), 1)]);
        assert_eq!(site_detail(&[a.clone(), b.clone()], "B").map(|x| x.site_id.as_str()), Some("B"));
    }
}
