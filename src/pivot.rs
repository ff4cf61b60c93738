// Site x month pivot of the daily availability table.
//
// Measurements are grouped by the site identity (area, regional, site id,
// site name, target) and calendar month; each group becomes the mean of its
// non-blank readings. Months with at least one reading are columns in
// ascending order, and a site with no reading in a month gets an empty cell
// rather than zero. Values keep full precision here.
use crate::types::LongMeasurement;
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// `"Apr-25"`
    pub fn label(self) -> String {
        self.first_day()
            .map(|d| d.format("%b-%y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

/// Row index of the pivot.
#[derive(Debug, Clone)]
pub struct RowKey {
    pub area: String,
    pub regional: String,
    pub site_id: String,
    pub site_name: String,
    pub target: f64,
}

impl RowKey {
    fn of(m: &LongMeasurement) -> Self {
        RowKey {
            area: m.area.clone(),
            regional: m.regional.clone(),
            site_id: m.site_id.clone(),
            site_name: m.site_name.clone(),
            target: m.target,
        }
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.area
            .cmp(&other.area)
            .then_with(|| self.regional.cmp(&other.regional))
            .then_with(|| self.site_id.cmp(&other.site_id))
            .then_with(|| self.site_name.cmp(&other.site_name))
            .then_with(|| self.target.total_cmp(&other.target))
    }
}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotCell {
    pub mean: f64,
    /// Number of readings averaged into `mean`.
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct PivotRow {
    pub key: RowKey,
    /// One entry per `PivotedSummary::months`.
    pub cells: Vec<Option<PivotCell>>,
}

#[derive(Debug, Clone, Default)]
pub struct PivotedSummary {
    pub months: Vec<MonthKey>,
    pub rows: Vec<PivotRow>,
}

impl PivotedSummary {
    pub fn column_labels(&self) -> Vec<String> {
        self.months.iter().map(|m| m.label()).collect()
    }
}

#[derive(Default)]
struct Acc {
    sum: f64,
    count: usize,
}

/// Blank readings are skipped entirely, so a month or site without a single
/// reading in `rows` gets no column or row.
pub fn monthly_pivot(rows: &[&LongMeasurement]) -> PivotedSummary {
    let mut months: BTreeSet<MonthKey> = BTreeSet::new();
    let mut groups: BTreeMap<RowKey, BTreeMap<MonthKey, Acc>> = BTreeMap::new();
    for m in rows {
        let Some(v) = m.availability.filter(|v| v.is_finite()) else {
            continue;
        };
        let month = MonthKey::of(m.date);
        months.insert(month);
        let acc = groups.entry(RowKey::of(m)).or_default().entry(month).or_default();
        acc.sum += v;
        acc.count += 1;
    }
    let months: Vec<MonthKey> = months.into_iter().collect();

    let rows = groups
        .into_iter()
        .map(|(key, per_month)| {
            let cells = months
                .iter()
                .map(|mk| {
                    per_month.get(mk).map(|a| PivotCell {
                        mean: a.sum / a.count as f64,
                        count: a.count,
                    })
                })
                .collect();
            PivotRow { key, cells }
        })
        .collect();

    PivotedSummary { months, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::{classify, CellClass};

    fn m(site: &str, target: f64, y: i32, mo: u32, d: u32, v: Option<f64>) -> LongMeasurement {
        LongMeasurement {
            area: "AREA 1".to_string(),
            site_id: site.to_string(),
            regional: "SUMBAGSEL".to_string(),
            site_name: format!("{} name", site),
            ns: String::new(),
            cluster: String::new(),
            status: None,
            site_class: String::new(),
            target,
            date: NaiveDate::from_ymd_opt(y, mo, d).unwrap(),
            availability: v,
        }
    }

    #[test]
    fn april_boundary_scenario() {
        let long = vec![
            m("S1", 95.0, 2025, 4, 1, Some(96.0)),
            m("S1", 95.0, 2025, 4, 2, Some(94.0)),
        ];
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        let p = monthly_pivot(&refs);
        assert_eq!(p.column_labels(), vec!["Apr-25"]);
        let cell = p.rows[0].cells[0].unwrap();
        assert_eq!(cell.mean, 95.0);
        assert_eq!(cell.count, 2);
        assert_eq!(classify(Some(cell.mean), p.rows[0].key.target), CellClass::Meets);
    }

    #[test]
    fn missing_site_month_is_null_not_zero() {
        let long = vec![
            m("S1", 95.0, 2025, 3, 31, Some(99.0)),
            m("S1", 95.0, 2025, 4, 1, Some(97.0)),
            m("S2", 99.0, 2025, 4, 1, Some(100.0)),
        ];
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        let p = monthly_pivot(&refs);
        assert_eq!(p.column_labels(), vec!["Mar-25", "Apr-25"]);
        assert_eq!(p.rows.len(), 2);
        let s2 = p.rows.iter().find(|r| r.key.site_id == "S2").unwrap();
        assert_eq!(s2.cells[0], None);
        assert_eq!(s2.cells[1].map(|c| c.mean), Some(100.0));
    }

    #[test]
    fn months_sort_across_years() {
        let long = vec![
            m("S1", 95.0, 2025, 1, 5, Some(90.0)),
            m("S1", 95.0, 2024, 12, 5, Some(91.0)),
        ];
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        assert_eq!(monthly_pivot(&refs).column_labels(), vec!["Dec-24", "Jan-25"]);
    }

    #[test]
    fn blank_readings_are_ignored_in_the_mean() {
        let long = vec![
            m("S1", 95.0, 2025, 4, 1, Some(90.0)),
            m("S1", 95.0, 2025, 4, 2, None),
            m("S1", 95.0, 2025, 5, 1, None),
        ];
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        let p = monthly_pivot(&refs);
        assert_eq!(p.column_labels(), vec!["Apr-25"]);
        assert_eq!(p.rows[0].cells, vec![Some(PivotCell { mean: 90.0, count: 1 })]);
    }

    #[test]
    fn site_with_only_blank_readings_is_left_out() {
        let long = vec![
            m("S1", 95.0, 2025, 4, 1, Some(97.0)),
            m("S2", 95.0, 2025, 4, 1, None),
            m("S2", 95.0, 2025, 5, 1, None),
        ];
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        let p = monthly_pivot(&refs);
        assert_eq!(p.months, vec![MonthKey { year: 2025, month: 4 }]);
        assert_eq!(p.rows.len(), 1);
        assert_eq!(p.rows[0].key.site_id, "S1");
    }

    #[test]
    fn mean_times_count_recovers_group_sums() {
        let mut long = Vec::new();
        for (i, site) in ["S1", "S2", "S3"].iter().enumerate() {
            for day in 1..=20u32 {
                let month = if day % 3 == 0 { 5 } else { 4 };
                let v = 90.0 + ((day as f64 * 1.7 + i as f64 * 3.1) % 10.0);
                long.push(m(site, 95.0, 2025, month, day, Some(v)));
            }
        }
        let refs: Vec<&LongMeasurement> = long.iter().collect();
        let p = monthly_pivot(&refs);
        for row in &p.rows {
            for (col, mk) in p.months.iter().enumerate() {
                let expected: f64 = long
                    .iter()
                    .filter(|x| x.site_id == row.key.site_id && MonthKey::of(x.date) == *mk)
                    .filter_map(|x| x.availability)
                    .sum();
                let cell = row.cells[col].unwrap();
                assert!((cell.mean * cell.count as f64 - expected).abs() < 1e-9);
            }
        }
    }
}
