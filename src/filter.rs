// Cascading equality filters shared by every page.
//
// A `Selection` holds one `Choice` per `Dimension` in cascade order. The
// candidate options of a level are computed from the rows that match every
// level above it, so picking an area narrows the regional list and picking a
// regional narrows the site list.
use crate::types::{DapotAsset, LongMeasurement, MonthlyPoFact};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Area,
    Regional,
    Site,
    Month,
    Year,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Area => "Area",
            Dimension::Regional => "Regional",
            Dimension::Site => "Site ID",
            Dimension::Month => "Month",
            Dimension::Year => "Year",
        }
    }
}

/// Record that can be narrowed by a [`Selection`].
pub trait Filterable {
    /// Value of the record for `dim`, `None` when the record has no such field
    /// or the cell was blank.
    fn dimension(&self, dim: Dimension) -> Option<&str>;

    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

static SHOW_ALL: Choice = Choice::ShowAll;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Choice {
    #[default]
    ShowAll,
    Only(String),
}

impl Choice {
    pub fn accepts(&self, value: Option<&str>) -> bool {
        match self {
            Choice::ShowAll => true,
            Choice::Only(v) => value == Some(v.as_str()),
        }
    }
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            DateRange { start: a, end: b }
        } else {
            DateRange { start: b, end: a }
        }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }

    /// Smallest range covering every dated row, `None` when no row has a date.
    pub fn spanning<T: Filterable>(rows: &[T]) -> Option<Self> {
        let mut dates = rows.iter().filter_map(|r| r.date());
        let first = dates.next()?;
        let (lo, hi) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange { start: lo, end: hi })
    }
}

/// Result of applying a selection. An empty match is a normal outcome.
#[derive(Debug)]
pub enum Filtered<'a, T> {
    Rows(Vec<&'a T>),
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    levels: Vec<(Dimension, Choice)>,
    pub date_range: Option<DateRange>,
    /// Case-insensitive substring on the site id.
    pub search: Option<String>,
}

impl Selection {
    pub fn new(dims: &[Dimension]) -> Self {
        Selection {
            levels: dims.iter().map(|d| (*d, Choice::ShowAll)).collect(),
            date_range: None,
            search: None,
        }
    }

    pub fn dimensions(&self) -> Vec<Dimension> {
        self.levels.iter().map(|(d, _)| *d).collect()
    }

    pub fn choice(&self, dim: Dimension) -> &Choice {
        self.levels
            .iter()
            .find(|(d, _)| *d == dim)
            .map(|(_, c)| c)
            .unwrap_or(&SHOW_ALL)
    }

    pub fn set(&mut self, dim: Dimension, choice: Choice) {
        if let Some(level) = self.levels.iter_mut().find(|(d, _)| *d == dim) {
            level.1 = choice;
        }
    }

    pub fn set_search(&mut self, search: &str) {
        let s = search.trim();
        self.search = if s.is_empty() { None } else { Some(s.to_lowercase()) };
    }

    pub fn selected(&self, dim: Dimension) -> Option<&str> {
        match self.choice(dim) {
            Choice::Only(v) => Some(v.as_str()),
            Choice::ShowAll => None,
        }
    }

    fn level_index(&self, dim: Dimension) -> Option<usize> {
        self.levels.iter().position(|(d, _)| *d == dim)
    }

    fn matches_levels<T: Filterable>(&self, row: &T, upto: usize) -> bool {
        self.levels[..upto]
            .iter()
            .all(|(dim, choice)| choice.accepts(row.dimension(*dim)))
    }

    fn matches_search<T: Filterable>(&self, row: &T) -> bool {
        match &self.search {
            None => true,
            Some(needle) => row
                .dimension(Dimension::Site)
                .map(|s| s.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false),
        }
    }

    /// Distinct sorted candidates for `dim`, taken from the rows that pass every
    /// level above it. The search string narrows the site list.
    pub fn options<T: Filterable>(&self, rows: &[T], dim: Dimension) -> Vec<String> {
        let upto = self.level_index(dim).unwrap_or(0);
        let set: BTreeSet<&str> = rows
            .iter()
            .filter(|r| self.matches_levels(*r, upto))
            .filter(|r| dim != Dimension::Site || self.matches_search(*r))
            .filter_map(|r| r.dimension(dim))
            .filter(|v| !v.is_empty())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Drop choices that are no longer offered after an upstream level changed.
    pub fn normalize<T: Filterable>(&mut self, rows: &[T]) {
        for i in 0..self.levels.len() {
            let dim = self.levels[i].0;
            if let Choice::Only(v) = &self.levels[i].1 {
                if !self.options(rows, dim).iter().any(|o| o == v) {
                    debug!(dimension = dim.label(), value = %v, "selection no longer available, showing all");
                    self.levels[i].1 = Choice::ShowAll;
                }
            }
        }
    }

    pub fn matches<T: Filterable>(&self, row: &T) -> bool {
        if !self.matches_levels(row, self.levels.len()) {
            return false;
        }
        if let Some(range) = &self.date_range {
            match row.date() {
                Some(d) if range.contains(d) => {}
                _ => return false,
            }
        }
        self.matches_search(row)
    }

    pub fn apply<'a, T: Filterable>(&self, rows: &'a [T]) -> Filtered<'a, T> {
        let kept: Vec<&T> = rows.iter().filter(|r| self.matches(*r)).collect();
        debug!(total = rows.len(), kept = kept.len(), "filter applied");
        if kept.is_empty() {
            Filtered::NoData
        } else {
            Filtered::Rows(kept)
        }
    }
}

impl Filterable for LongMeasurement {
    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Area => Some(&self.area),
            Dimension::Regional => Some(&self.regional),
            Dimension::Site => Some(&self.site_id),
            Dimension::Month | Dimension::Year => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Filterable for MonthlyPoFact {
    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Month => Some(self.month.sheet_name()),
            Dimension::Year => Some(&self.year),
            Dimension::Regional => Some(&self.regional),
            Dimension::Site => Some(&self.site_id),
            Dimension::Area => None,
        }
    }
}

impl Filterable for DapotAsset {
    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Area => Some(&self.area),
            Dimension::Regional => Some(&self.regional),
            Dimension::Site => Some(&self.site_id),
            Dimension::Month | Dimension::Year => None,
        }
    }
}

impl<T: Filterable> Filterable for &T {
    fn dimension(&self, dim: Dimension) -> Option<&str> {
        (**self).dimension(dim)
    }

    fn date(&self) -> Option<NaiveDate> {
        (**self).date()
    }
}
