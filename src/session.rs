// Per-run interaction state, passed explicitly to every page.
use crate::filter::{Dimension, Selection};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    FuelTracker,
    Availability,
    Dapot,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::FuelTracker, Page::Availability, Page::Dapot];

    pub fn label(self) -> &'static str {
        match self {
            Page::FuelTracker => "Tracker Pengisian BBM",
            Page::Availability => "CDC Availability",
            Page::Dapot => "Dapot Asset CDC",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

const SITE_CASCADE: [Dimension; 3] = [Dimension::Area, Dimension::Regional, Dimension::Site];
const PO_CASCADE: [Dimension; 4] = [Dimension::Month, Dimension::Year, Dimension::Regional, Dimension::Site];

/// Filter selections survive page switches for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub page: Page,
    pub daily: Selection,
    pub summary: Selection,
    pub po: Selection,
    pub fuel_status: Selection,
    pub fuel_history: Selection,
    pub dapot: Selection,
    /// Site shown in the Dapot detail viewer.
    pub dapot_site: Option<String>,
}

impl Default for SessionContext {
    fn default() -> Self {
        SessionContext {
            page: Page::default(),
            daily: Selection::new(&SITE_CASCADE),
            summary: Selection::new(&SITE_CASCADE),
            po: Selection::new(&PO_CASCADE),
            fuel_status: Selection::new(&SITE_CASCADE),
            fuel_history: Selection::new(&SITE_CASCADE),
            dapot: Selection::new(&[Dimension::Area, Dimension::Regional]),
            dapot_site: None,
        }
    }
}
