// Target comparison for pivot cells and PO rows.
//
// The target is one value per site row, broadcast across every month column.
use crate::pivot::PivotedSummary;
use crate::types::Achievement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Meets,
    Misses,
    Unclassified,
}

/// Background and font colour of a classified cell, as 0xRRGGBB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellColors {
    pub background: u32,
    pub font: u32,
}

pub const MEETS_COLORS: CellColors = CellColors {
    background: 0xC4D79B,
    font: 0x000000,
};

pub const MISSES_COLORS: CellColors = CellColors {
    background: 0xFFB7B7,
    font: 0x000000,
};

impl CellClass {
    pub fn colors(self) -> Option<CellColors> {
        match self {
            CellClass::Meets => Some(MEETS_COLORS),
            CellClass::Misses => Some(MISSES_COLORS),
            CellClass::Unclassified => None,
        }
    }
}

/// `>=` on purpose: a cell exactly on target meets it.
pub fn classify(cell: Option<f64>, target: f64) -> CellClass {
    match cell {
        Some(v) if v.is_nan() || target.is_nan() => CellClass::Unclassified,
        Some(v) if v >= target => CellClass::Meets,
        Some(_) => CellClass::Misses,
        None => CellClass::Unclassified,
    }
}

pub fn achievement(actual: f64, target: f64) -> Achievement {
    match classify(Some(actual), target) {
        CellClass::Meets => Achievement::Achieved,
        _ => Achievement::NotAchieved,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub meets: usize,
    pub misses: usize,
    pub unclassified: usize,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Classification grid with the same shape as `summary.rows` x `summary.months`.
/// Mean and target are compared at the two decimals the table shows.
pub fn classify_summary(summary: &PivotedSummary) -> Vec<Vec<CellClass>> {
    summary
        .rows
        .iter()
        .map(|row| {
            let target = round2(row.key.target);
            row.cells
                .iter()
                .map(|c| classify(c.map(|c| round2(c.mean)), target))
                .collect()
        })
        .collect()
}

pub fn tally(grid: &[Vec<CellClass>]) -> Tally {
    grid.iter().flatten().fold(Tally::default(), |mut t, c| {
        match c {
            CellClass::Meets => t.meets += 1,
            CellClass::Misses => t.misses += 1,
            CellClass::Unclassified => t.unclassified += 1,
        }
        t
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_meets_target() {
        assert_eq!(classify(Some(95.0), 95.0), CellClass::Meets);
        assert_eq!(classify(Some(94.99), 95.0), CellClass::Misses);
        assert_eq!(classify(None, 95.0), CellClass::Unclassified);
        assert_eq!(classify(Some(f64::NAN), 95.0), CellClass::Unclassified);
    }

    #[test]
    fn classification_depends_only_on_value_and_target() {
        let values = [90.0, 95.0, 99.9, 100.0];
        let targets = [90.0, 95.0, 99.5];
        for v in values {
            for t in targets {
                assert_eq!(classify(Some(v), t), classify(Some(v), t));
                assert_eq!(classify(Some(v), t) == CellClass::Meets, v >= t);
            }
        }
    }

    #[test]
    fn colors_only_for_classified_cells() {
        assert_eq!(CellClass::Meets.colors(), Some(MEETS_COLORS));
        assert_eq!(CellClass::Misses.colors().map(|c| c.background), Some(0xFFB7B7));
        assert_eq!(CellClass::Unclassified.colors(), None);
    }

    #[test]
    fn summary_compares_at_displayed_precision() {
        use crate::pivot::{PivotCell, PivotRow, RowKey};
        let mean = (94.99 + 95.0 + 95.0) / 3.0;
        let summary = PivotedSummary {
            months: vec![crate::pivot::MonthKey { year: 2025, month: 4 }],
            rows: vec![PivotRow {
                key: RowKey {
                    area: "AREA 1".to_string(),
                    regional: "SUMBAGSEL".to_string(),
                    site_id: "S1".to_string(),
                    site_name: "S1 name".to_string(),
                    target: 95.0,
                },
                cells: vec![Some(PivotCell { mean, count: 3 })],
            }],
        };
        assert_eq!(format!("{:.2}", mean), "95.00");
        assert_eq!(classify_summary(&summary), vec![vec![CellClass::Meets]]);
        assert_eq!(summary.rows[0].cells[0].map(|c| c.mean), Some(mean));
    }

    #[test]
    fn achievement_follows_the_same_rule() {
        assert_eq!(achievement(95.0, 95.0), Achievement::Achieved);
        assert_eq!(achievement(94.0, 95.0), Achievement::NotAchieved);
    }
}
