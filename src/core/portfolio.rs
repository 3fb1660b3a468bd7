//! Portfolio — the root of a fashion-enhanced project.
//!
//! Grounded on `original_source/fashion/portfolio.py` and
//! `fashionPortfolio.py`. A portfolio is just a `fashion/` directory dropped
//! into a project by `fashion init`; everything under it (warehouse,
//! mirror, database, portfolio.json) is plain files a user can inspect or
//! hand-edit.

use crate::core::assets::bundled_warehouse_dir;
use crate::core::error::FashionError;
use crate::core::log::BuildLog;
use crate::core::mirror::Mirror;
use crate::core::segment::Segment;
use crate::core::store::ModelStore;
use crate::core::warehouse::Warehouse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioProperties {
    pub name: String,
    #[serde(rename = "defaultSegment")]
    pub default_segment: String,
    pub warehouses: Vec<String>,
}

impl Default for PortfolioProperties {
    fn default() -> Self {
        Self { name: "fashion".to_string(), default_segment: "local".to_string(), warehouses: vec![] }
    }
}

pub struct Portfolio {
    pub project_path: PathBuf,
    pub fashion_path: PathBuf,
    pub mirror_path: PathBuf,
    pub portfolio_path: PathBuf,
    pub fashion_db_path: PathBuf,
    pub properties: PortfolioProperties,
}

impl Portfolio {
    pub fn new(proj_dir: impl Into<PathBuf>) -> Self {
        let project_path = proj_dir.into();
        let project_path = project_path.canonicalize().unwrap_or(project_path);
        let fashion_path = project_path.join("fashion");
        Self {
            mirror_path: fashion_path.join("mirror"),
            portfolio_path: fashion_path.join("portfolio.json"),
            fashion_db_path: fashion_path.join("database.json"),
            fashion_path,
            project_path,
            properties: PortfolioProperties::default(),
        }
    }

    pub fn exists(&self) -> bool {
        self.fashion_path.exists()
    }

    fn set_default_properties(&mut self) {
        self.properties = PortfolioProperties {
            name: "fashion".to_string(),
            default_segment: "local".to_string(),
            warehouses: vec![self.fashion_path.join("warehouse").to_string_lossy().to_string()],
        };
    }

    /// Create a brand-new project: default properties, a local warehouse
    /// with a `local` segment, and a saved `portfolio.json`.
    pub fn create(&mut self, log: &BuildLog) -> Result<(), FashionError> {
        if self.exists() {
            return Ok(());
        }
        self.set_default_properties();
        std::fs::create_dir_all(&self.fashion_path)?;
        std::fs::create_dir_all(self.fashion_path.join("warehouse"))?;
        let warehouse = Warehouse::new(self.fashion_path.join("warehouse"), None);
        warehouse.new_segment("local", log);
        self.save()?;
        Ok(())
    }

    pub fn delete(&self) -> Result<(), FashionError> {
        if self.exists() {
            std::fs::remove_dir_all(&self.fashion_path)?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), FashionError> {
        let text = serde_json::to_string_pretty(&self.properties)?;
        std::fs::write(&self.portfolio_path, text)?;
        Ok(())
    }

    pub fn load(&mut self) -> Result<(), FashionError> {
        let text = std::fs::read_to_string(&self.portfolio_path)?;
        self.properties = serde_json::from_str(&text)?;
        Ok(())
    }

    /// Build the warehouse chain: each project-declared warehouse (most
    /// recently listed checked first), ending in the bundled fallback
    /// warehouse so every project can always resolve `fashion.core.*`.
    pub fn load_warehouses(&self) -> Warehouse {
        let mut chain: Vec<PathBuf> = self.properties.warehouses.iter().map(PathBuf::from).collect();
        chain.push(bundled_warehouse_dir());
        chain.reverse();
        let mut warehouse: Option<Warehouse> = None;
        for dir in chain {
            warehouse = Some(Warehouse::new(dir, warehouse));
        }
        warehouse.unwrap_or_else(|| Warehouse::new(bundled_warehouse_dir(), None))
    }

    pub fn open_mirror(&self, force: bool) -> Mirror {
        Mirror::new(self.project_path.clone(), self.mirror_path.clone(), force)
    }

    pub fn open_store(&self) -> Result<ModelStore, FashionError> {
        ModelStore::open(&self.fashion_db_path)
    }

    pub fn open_log(&self, verbose: bool) -> BuildLog {
        BuildLog::new(&self.fashion_path, verbose)
    }

    pub fn default_segment_name(&self) -> &str {
        &self.properties.default_segment
    }

    pub fn set_default_segment(&mut self, name: &str) {
        self.properties.default_segment = name.to_string();
    }

    pub fn default_segment(&self, log: &BuildLog) -> Option<Segment> {
        self.load_warehouses().load_segment(self.default_segment_name(), log)
    }

    /// Convert `filename` to a path relative to the project root.
    pub fn normalize_filename(&self, filename: &Path) -> Result<PathBuf, FashionError> {
        let abs = if filename.is_absolute() { filename.to_path_buf() } else { self.project_path.join(filename) };
        abs.strip_prefix(&self.project_path)
            .map(|p| p.to_path_buf())
            .map_err(|_| FashionError::PathError(format!("{} is outside project root", filename.display())))
    }
}

/// Search upward from `start_dir` for a directory containing a `fashion/`
/// project. Returns `None` once the filesystem root is reached.
pub fn find_portfolio(start_dir: &Path) -> Option<Portfolio> {
    let mut dir = start_dir.canonicalize().unwrap_or_else(|_| start_dir.to_path_buf());
    loop {
        let candidate = Portfolio::new(&dir);
        if candidate.exists() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(parent) if parent != dir => dir = parent.to_path_buf(),
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_load_round_trips_properties() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let mut p = Portfolio::new(dir.path());
        p.create(&log).unwrap();
        let mut p2 = Portfolio::new(dir.path());
        p2.load().unwrap();
        assert_eq!(p2.properties.name, "fashion");
        assert_eq!(p2.default_segment_name(), "local");
        assert_eq!(p.properties.warehouses, p2.properties.warehouses);
    }

    #[test]
    fn find_portfolio_searches_upward() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let mut p = Portfolio::new(dir.path());
        p.create(&log).unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_portfolio(&nested).expect("should find portfolio above nested dir");
        assert_eq!(found.project_path, p.project_path);
    }

    #[test]
    fn find_portfolio_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_portfolio(dir.path()).is_none());
    }

    #[test]
    fn normalize_filename_rejects_outside_project() {
        let dir = tempfile::tempdir().unwrap();
        let p = Portfolio::new(dir.path());
        assert!(p.normalize_filename(Path::new("/etc/passwd")).is_err());
    }
}
