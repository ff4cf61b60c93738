// Memoized loaders. An entry is reused while every source file keeps the
// same path and modification time.
use crate::config::Config;
use crate::error::Result;
use crate::fuel::{self, FuelEntry, RefillLog};
use crate::loader::{self, AvailabilityData, CsvRefillLog};
use crate::reshape::PoTable;
use crate::types::{DapotAsset, SiteMaster};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub path: PathBuf,
    /// `None` when the file does not exist (yet).
    pub modified: Option<SystemTime>,
}

impl SourceKey {
    pub fn of(path: &Path) -> Self {
        SourceKey {
            path: path.to_path_buf(),
            modified: std::fs::metadata(path).and_then(|m| m.modified()).ok(),
        }
    }
}

#[derive(Debug)]
pub struct Memo<T> {
    entry: Option<(Vec<SourceKey>, T)>,
    /// How many times the loader actually ran.
    loads: usize,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Memo { entry: None, loads: 0 }
    }
}

impl<T> Memo<T> {
    /// Return the cached value, running `load` first when nothing is cached
    /// or any of `sources` changed since the last load. A failed load leaves
    /// the memo empty.
    pub fn get_or_try_load<F>(&mut self, sources: &[&Path], load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        let keys: Vec<SourceKey> = sources.iter().map(|p| SourceKey::of(p)).collect();
        let entry = match self.entry.take() {
            Some((cached, value)) if cached == keys => {
                debug!(sources = keys.len(), "cache hit");
                (cached, value)
            }
            _ => {
                let value = load()?;
                self.loads += 1;
                debug!(loads = self.loads, "cache miss, loaded");
                (keys, value)
            }
        };
        Ok(&self.entry.insert(entry).1)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Refill log joined with the site master.
#[derive(Debug, Clone, Default)]
pub struct FuelData {
    pub sites: Vec<SiteMaster>,
    pub entries: Vec<FuelEntry>,
}

#[derive(Debug, Default)]
pub struct DataCache {
    availability: Memo<AvailabilityData>,
    po: Memo<PoTable>,
    dapot: Memo<Vec<DapotAsset>>,
    fuel: Memo<FuelData>,
}

impl DataCache {
    pub fn availability(&mut self, cfg: &Config) -> Result<&AvailabilityData> {
        let path = cfg.availability_file.as_path();
        self.availability
            .get_or_try_load(&[path], || loader::load_availability(path, &cfg.availability_sheet))
    }

    pub fn po(&mut self, cfg: &Config) -> Result<&PoTable> {
        let path = cfg.po_file.as_path();
        self.po.get_or_try_load(&[path], || loader::load_po(path))
    }

    pub fn dapot(&mut self, cfg: &Config) -> Result<&Vec<DapotAsset>> {
        let path = cfg.dapot_file.as_path();
        self.dapot.get_or_try_load(&[path], || loader::load_dapot(path))
    }

    pub fn fuel(&mut self, cfg: &Config) -> Result<&FuelData> {
        let log_path = cfg.fuel_log_file.as_path();
        let master_path = cfg.site_master_file.as_path();
        self.fuel.get_or_try_load(&[log_path, master_path], || {
            let sites = if master_path.exists() {
                let (sites, report) = loader::load_site_master(master_path)?;
                info!(rows = report.total_rows, sites = report.loaded_rows, "site master loaded");
                if report.skipped_rows > 0 {
                    warn!(skipped = report.skipped_rows, "site master rows without site id skipped");
                }
                sites
            } else {
                warn!(path = %master_path.display(), "site master not found, sites are not validated");
                Vec::new()
            };
            let records = CsvRefillLog::new(log_path, &cfg.photo_link_base).read_all()?;
            let entries = fuel::join_site_master(records, &sites);
            Ok(FuelData { sites, entries })
        })
    }

    /// Drop the fuel entry so the next read sees a fresh append.
    pub fn invalidate_fuel(&mut self) {
        self.fuel.invalidate();
    }
}
