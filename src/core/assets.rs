//! Bundled fallback warehouse, embedded into the binary.
//!
//! `assets/fashion.core/warehouse` — the `fashion.core` segment backing the
//! built-in load/generate modules — is embedded so the engine keeps working
//! after the binary is installed somewhere the source tree no longer
//! exists, extracting itself once into the system temp directory on first
//! use.

use rust_embed::RustEmbed;
use std::path::PathBuf;

#[derive(RustEmbed)]
#[folder = "assets/fashion.core/warehouse"]
struct BundledWarehouseAssets;

const MARKER_FILE: &str = ".extracted";

/// Path to the extracted bundled warehouse directory, extracting it first
/// if this is the first call in this environment.
pub fn bundled_warehouse_dir() -> PathBuf {
    let dest = std::env::temp_dir().join("fashion-bundled-warehouse");
    if !dest.join(MARKER_FILE).exists() {
        extract_all(&dest);
    }
    dest
}

fn extract_all(dest: &std::path::Path) {
    for file in BundledWarehouseAssets::iter() {
        let Some(data) = BundledWarehouseAssets::get(&file) else { continue };
        let target = dest.join(file.as_ref());
        if let Some(parent) = target.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&target, data.data);
    }
    let _ = std::fs::write(dest.join(MARKER_FILE), "");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_segment_descriptor_is_embedded() {
        let file = BundledWarehouseAssets::get("fashion.core/segment.json");
        assert!(file.is_some());
    }

    #[test]
    fn extraction_produces_a_loadable_segment() {
        let dest = bundled_warehouse_dir();
        assert!(dest.join("fashion.core").join("segment.json").exists());
    }
}
