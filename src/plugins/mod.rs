//! Bundled transform modules shipped with the engine itself, registered
//! under `fashion.core.*` module names.

pub mod generate;
pub mod load_json;
pub mod load_xml;

use crate::core::module::ModuleRegistration;

/// The static factory table standing in for dynamic module loading (see
/// `core::module`). Every built-in module name a bundled segment's
/// `xformModules` can reference must appear here.
pub const BUILTIN_MODULES: &[ModuleRegistration] = &[
    ModuleRegistration { module_name: "fashion.core.load.json", factory: load_json::new },
    ModuleRegistration { module_name: "fashion.core.load.xml", factory: load_xml::new },
    ModuleRegistration { module_name: "fashion.core.generate.jinja2", factory: generate::new },
];

/// Resolve a `filename` parameter that may be a single literal path or a
/// shell-style wildcard pattern (`*`/`?`) against the filesystem, rooted at
/// `base_dir`. There is no crate for this in the dependency stack, so it's
/// a small hand-rolled matcher limited to a single path segment -
/// sufficient for the flat `*.json`/`*.xml` patterns segment configs use.
pub fn resolve_filenames(base_dir: &std::path::Path, pattern: &str) -> Vec<std::path::PathBuf> {
    let path = base_dir.join(pattern);
    if !pattern.contains('*') && !pattern.contains('?') {
        return if path.exists() { vec![path] } else { vec![] };
    }
    let parent = path.parent().unwrap_or(base_dir).to_path_buf();
    let file_pattern = path.file_name().and_then(|f| f.to_str()).unwrap_or("").to_string();
    let Ok(entries) = std::fs::read_dir(&parent) else {
        return vec![];
    };
    let mut matches: Vec<std::path::PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name().and_then(|f| f.to_str()).map(|name| glob_match(&file_pattern, name)).unwrap_or(false)
        })
        .collect();
    matches.sort();
    matches
}

fn glob_match(pattern: &str, name: &str) -> bool {
    fn rec(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => rec(&p[1..], n) || (!n.is_empty() && rec(p, &n[1..])),
            (Some(b'?'), Some(_)) => rec(&p[1..], &n[1..]),
            (Some(pc), Some(nc)) if pc == nc => rec(&p[1..], &n[1..]),
            _ => false,
        }
    }
    rec(pattern.as_bytes(), name.as_bytes())
}
