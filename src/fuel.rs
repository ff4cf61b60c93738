// Fuel (BBM) refill tracking.
//
// Status is never stored: every load takes the latest refill per site and
// recomputes consumption from the elapsed days and the site's daily rate.
use crate::error::{DashboardError, Result};
use crate::filter::{Dimension, Filterable};
use crate::types::{FuelRefillRecord, PhotoRef, SiteMaster};
use crate::util::days_diff;
use chrono::{Days, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

pub const WARNING_FRACTION: f64 = 0.8;
pub const CRITICAL_FRACTION: f64 = 0.9;

/// Append-only store of refill entries.
pub trait RefillLog {
    fn read_all(&self) -> Result<Vec<FuelRefillRecord>>;
    fn append(&mut self, record: &FuelRefillRecord) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelStatus {
    Normal,
    Warning,
    Critical,
}

impl FuelStatus {
    /// Unknown consumption (no daily rate for the site) is reported as normal.
    pub fn from_fraction(fraction: Option<f64>) -> Self {
        match fraction {
            Some(f) if f >= CRITICAL_FRACTION => FuelStatus::Critical,
            Some(f) if f >= WARNING_FRACTION => FuelStatus::Warning,
            _ => FuelStatus::Normal,
        }
    }
}

impl fmt::Display for FuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelStatus::Critical => write!(f, "Segera Isi BBM (90%+)"),
            FuelStatus::Warning => write!(f, "Peringatan BBM Low (80%+)"),
            FuelStatus::Normal => write!(f, "Aman"),
        }
    }
}

/// A refill joined with its site master row.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelEntry {
    pub record: FuelRefillRecord,
    pub site: Option<SiteMaster>,
}

impl FuelEntry {
    pub fn area(&self) -> &str {
        self.site.as_ref().map(|s| s.area.as_str()).unwrap_or("")
    }

    pub fn regional(&self) -> &str {
        self.site.as_ref().map(|s| s.regional.as_str()).unwrap_or("")
    }

    pub fn site_name(&self) -> &str {
        self.site.as_ref().map(|s| s.site_name.as_str()).unwrap_or("")
    }
}

impl Filterable for FuelEntry {
    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Area => self.site.as_ref().map(|s| s.area.as_str()),
            Dimension::Regional => self.site.as_ref().map(|s| s.regional.as_str()),
            Dimension::Site => Some(&self.record.site_id),
            Dimension::Month | Dimension::Year => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.record.refill_date)
    }
}

/// Left join of the refill log onto the site master.
pub fn join_site_master(records: Vec<FuelRefillRecord>, master: &[SiteMaster]) -> Vec<FuelEntry> {
    let by_id: HashMap<&str, &SiteMaster> = master.iter().map(|s| (s.site_id.as_str(), s)).collect();
    records
        .into_iter()
        .map(|record| {
            let site = by_id.get(record.site_id.as_str()).map(|s| (*s).clone());
            FuelEntry { record, site }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuelSnapshot<'a> {
    pub entry: &'a FuelEntry,
    pub days_elapsed: i64,
    pub liters_consumed: Option<f64>,
    pub fraction_consumed: Option<f64>,
    pub empty_date: Option<NaiveDate>,
    pub status: FuelStatus,
}

pub fn snapshot(entry: &FuelEntry, today: NaiveDate) -> FuelSnapshot<'_> {
    let days_elapsed = days_diff(entry.record.refill_date, today);
    let rate = entry
        .site
        .as_ref()
        .and_then(|s| s.liters_per_day)
        .filter(|r| *r > 0.0);
    let liters_consumed = rate.map(|r| days_elapsed as f64 * r);
    let fraction_consumed = liters_consumed
        .filter(|_| entry.record.liters > 0.0)
        .map(|used| used / entry.record.liters);
    let empty_date = rate.and_then(|r| {
        let days = (entry.record.liters / r).floor();
        entry.record.refill_date.checked_add_days(Days::new(days as u64))
    });
    FuelSnapshot {
        entry,
        days_elapsed,
        liters_consumed,
        fraction_consumed,
        empty_date,
        status: FuelStatus::from_fraction(fraction_consumed),
    }
}

/// Most recent refill per site, ordered by site id. On a date tie the entry
/// appended last wins.
pub fn latest_per_site<'a>(entries: &[&'a FuelEntry]) -> Vec<&'a FuelEntry> {
    let mut latest: HashMap<&str, &'a FuelEntry> = HashMap::new();
    for &e in entries {
        let slot = latest.entry(e.record.site_id.as_str()).or_insert(e);
        if e.record.refill_date >= slot.record.refill_date {
            *slot = e;
        }
    }
    let mut out: Vec<&FuelEntry> = latest.into_values().collect();
    out.sort_by(|a, b| a.record.site_id.cmp(&b.record.site_id));
    out
}

/// Newest first, then by site id.
pub fn history<'a>(entries: &[&'a FuelEntry]) -> Vec<&'a FuelEntry> {
    let mut out = entries.to_vec();
    out.sort_by(|a, b| match b.record.refill_date.cmp(&a.record.refill_date) {
        Ordering::Equal => a.record.site_id.cmp(&b.record.site_id),
        other => other,
    });
    out
}

/// Raw values typed into the refill form.
#[derive(Debug, Clone, Default)]
pub struct RefillForm {
    pub site_id: String,
    pub refill_date: Option<NaiveDate>,
    pub liters: f64,
    pub photo_id: Option<String>,
}

impl RefillForm {
    /// Check the form against the known sites (when a site master is loaded)
    /// and turn it into a log record.
    pub fn validate(&self, known_sites: &[SiteMaster], photo_link_base: &str) -> Result<FuelRefillRecord> {
        let site_id = self.site_id.trim();
        if site_id.is_empty() {
            return Err(DashboardError::Validation("Site ID tidak boleh kosong.".to_string()));
        }
        if !known_sites.is_empty() && !known_sites.iter().any(|s| s.site_id == site_id) {
            return Err(DashboardError::Validation(format!("Site ID {} tidak terdaftar.", site_id)));
        }
        if !(self.liters > 0.0) || !self.liters.is_finite() {
            return Err(DashboardError::Validation(
                "Jumlah pengisian harus lebih dari 0 liter.".to_string(),
            ));
        }
        let refill_date = self
            .refill_date
            .ok_or_else(|| DashboardError::Validation("Tanggal pengisian wajib diisi.".to_string()))?;
        let photo = self
            .photo_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| PhotoRef::from_id(id, photo_link_base));
        Ok(FuelRefillRecord {
            site_id: site_id.to_string(),
            refill_date,
            liters: self.liters,
            photo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://drive.google.com/uc?export=download&id=";

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().checked_add_days(Days::new(n)).unwrap()
    }

    fn site(id: &str, area: &str, rate: Option<f64>) -> SiteMaster {
        SiteMaster {
            site_id: id.to_string(),
            site_name: format!("{} name", id),
            area: area.to_string(),
            regional: "SUMBAGSEL".to_string(),
            liters_per_day: rate,
        }
    }

    fn refill(id: &str, d: NaiveDate, liters: f64) -> FuelRefillRecord {
        FuelRefillRecord {
            site_id: id.to_string(),
            refill_date: d,
            liters,
            photo: None,
        }
    }

    #[test]
    fn day_nine_of_a_thousand_liters_is_critical() {
        let entries = join_site_master(vec![refill("S1", day(0), 1000.0)], &[site("S1", "AREA 1", Some(100.0))]);
        let s = snapshot(&entries[0], day(9));
        assert_eq!(s.days_elapsed, 9);
        assert_eq!(s.liters_consumed, Some(900.0));
        assert_eq!(s.fraction_consumed, Some(0.9));
        assert_eq!(s.status, FuelStatus::Critical);
        assert_eq!(s.empty_date, Some(day(10)));
    }

    #[test]
    fn thresholds() {
        assert_eq!(FuelStatus::from_fraction(Some(0.79)), FuelStatus::Normal);
        assert_eq!(FuelStatus::from_fraction(Some(0.8)), FuelStatus::Warning);
        assert_eq!(FuelStatus::from_fraction(Some(0.899)), FuelStatus::Warning);
        assert_eq!(FuelStatus::from_fraction(Some(1.4)), FuelStatus::Critical);
        assert_eq!(FuelStatus::from_fraction(None), FuelStatus::Normal);
    }

    #[test]
    fn unknown_site_has_no_percentage() {
        let entries = join_site_master(vec![refill("X9", day(0), 500.0)], &[site("S1", "AREA 1", Some(100.0))]);
        let s = snapshot(&entries[0], day(30));
        assert_eq!(s.fraction_consumed, None);
        assert_eq!(s.status, FuelStatus::Normal);
        assert_eq!(entries[0].area(), "");
    }

    #[test]
    fn only_the_latest_refill_counts() {
        let master = [site("S1", "AREA 1", Some(100.0)), site("S2", "AREA 1", Some(50.0))];
        let entries = join_site_master(
            vec![
                refill("S1", day(0), 1000.0),
                refill("S2", day(2), 1000.0),
                refill("S1", day(8), 1000.0),
            ],
            &master,
        );
        let refs: Vec<&FuelEntry> = entries.iter().collect();
        let latest = latest_per_site(&refs);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].record.refill_date, day(8));
        // Recomputed, not stored: the same refill ages into a worse status.
        assert_eq!(snapshot(latest[0], day(9)).status, FuelStatus::Normal);
        assert_eq!(snapshot(latest[0], day(16)).status, FuelStatus::Warning);
        assert_eq!(snapshot(latest[0], day(17)).status, FuelStatus::Critical);
    }

    #[test]
    fn history_is_newest_first_then_site() {
        let entries = join_site_master(
            vec![
                refill("S2", day(1), 10.0),
                refill("S1", day(1), 10.0),
                refill("S3", day(5), 10.0),
            ],
            &[],
        );
        let refs: Vec<&FuelEntry> = entries.iter().collect();
        let ids: Vec<&str> = history(&refs).iter().map(|e| e.record.site_id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S1", "S2"]);
    }

    #[test]
    fn form_validation() {
        let master = [site("S1", "AREA 1", Some(100.0))];
        let mut form = RefillForm {
            site_id: " S1 ".to_string(),
            refill_date: Some(day(0)),
            liters: 250.0,
            photo_id: Some("abc123".to_string()),
        };
        let rec = form.validate(&master, LINK).unwrap();
        assert_eq!(rec.site_id, "S1");
        assert_eq!(rec.photo.unwrap().link, format!("{}abc123", LINK));

        form.liters = 0.0;
        assert!(matches!(form.validate(&master, LINK), Err(DashboardError::Validation(_))));
        form.liters = 10.0;
        form.site_id = "ZZ".to_string();
        assert!(form.validate(&master, LINK).is_err());
        assert!(form.validate(&[], LINK).is_ok());
        form.site_id = "  ".to_string();
        assert!(form.validate(&[], LINK).is_err());
    }
}
