//! Warehouse — a library of segments.
//!
//! Grounded on `original_source/fashion/warehouse.py`. A warehouse is just a
//! directory of segment subdirectories; it stores nothing about the
//! segments itself, so a segment directory can be copied or deleted freely
//! without going through this API. Every project gets its own local
//! warehouse plus a shared bundled one as fallback.

use crate::core::log::BuildLog;
use crate::core::module;
use crate::core::segment::{ModuleConfig, ModuleDefinition, Segment};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A module definition as resolved against the warehouse it came from.
#[derive(Debug, Clone)]
pub struct ResolvedModuleDefinition {
    pub module_name: String,
    pub filename: String,
    pub tags: Vec<String>,
    pub template_path: Vec<String>,
    pub abs_dirname: PathBuf,
    pub segment_name: String,
}

/// A module config as resolved against the warehouse it came from.
#[derive(Debug, Clone)]
pub struct ResolvedModuleConfig {
    pub module_name: String,
    pub tags: Vec<String>,
    pub input_kinds: Vec<String>,
    pub output_kinds: Vec<String>,
    pub template_path: Vec<String>,
    pub parameters: serde_json::Value,
    pub segment_name: String,
    pub abs_dirname: PathBuf,
}

/// A schema binding as resolved against the segment that declared it.
#[derive(Debug, Clone)]
pub struct ResolvedSchemaBinding {
    pub kind: String,
    pub filename: String,
    pub abs_dirname: PathBuf,
}

pub struct Warehouse {
    pub dir: PathBuf,
    pub fallback: Option<Box<Warehouse>>,
    segments: Vec<Segment>,
}

impl Warehouse {
    pub fn new(dir: impl Into<PathBuf>, fallback: Option<Warehouse>) -> Self {
        let dir = dir.into();
        let dir = dir.canonicalize().unwrap_or(dir);
        Self { dir, fallback: fallback.map(Box::new), segments: Vec::new() }
    }

    /// Names of the segment subdirectories directly inside this warehouse
    /// (not including fallback warehouses).
    pub fn list_segment_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return vec![];
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// Load one segment by name, checking this warehouse then any
    /// fallback. Returns `None` if not found anywhere in the chain.
    pub fn load_segment(&self, name: &str, log: &BuildLog) -> Option<Segment> {
        let path = self.dir.join(name);
        if Segment::descriptor_path(&path).exists() {
            log.debug("LoadSegment", format!("loading segment {}", name));
            match Segment::load(&path) {
                Ok(seg) => Some(seg),
                Err(e) => {
                    log.error("SegmentLoadFailed", format!("{}: {}", name, e));
                    None
                }
            }
        } else {
            self.fallback.as_ref().and_then(|fb| fb.load_segment(name, log))
        }
    }

    /// Load every segment in this warehouse and its fallback chain.
    pub fn load_segments(&mut self, log: &BuildLog) {
        let names = self.list_segment_names();
        self.segments = names.iter().filter_map(|n| self.load_segment(n, log)).collect();
        if let Some(fb) = &mut self.fallback {
            fb.load_segments(log);
        }
    }

    /// All segments loaded so far in this warehouse, followed by the
    /// fallback chain's.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out: Vec<&Segment> = self.segments.iter().collect();
        if let Some(fb) = &self.fallback {
            out.extend(fb.segments());
        }
        out
    }

    pub fn new_segment(&self, name: &str, log: &BuildLog) -> Option<Segment> {
        if self.list_segment_names().iter().any(|n| n == name) {
            log.error("SegmentExists", format!("segment {} already exists", name));
            return None;
        }
        match Segment::create(&self.dir.join(name), name) {
            Ok(seg) => Some(seg),
            Err(e) => {
                log.error("SegmentCreateFailed", format!("{}: {}", name, e));
                None
            }
        }
    }

    pub fn delete_segment(&self, segment: &Segment) -> std::io::Result<()> {
        std::fs::remove_dir_all(&segment.abs_dirname)
    }

    fn resolve_template_path(seg: &Segment, explicit: &Option<Vec<String>>) -> Vec<String> {
        match explicit {
            Some(p) if !p.is_empty() => p.iter().map(|s| seg.resolve(s).to_string_lossy().to_string()).collect(),
            _ => seg.resolved_template_path(),
        }
    }

    /// All `xformModules` definitions across every segment in the chain,
    /// keyed by module name, restricted to those whose own `tags` satisfy
    /// `tags`. A name collision among the surviving definitions is logged
    /// and the first definition wins.
    pub fn module_definitions(
        &self,
        tags: Option<&[String]>,
        log: &BuildLog,
    ) -> HashMap<String, ResolvedModuleDefinition> {
        let mut out: HashMap<String, ResolvedModuleDefinition> = HashMap::new();
        for seg in self.segments() {
            for m in &seg.descriptor.xform_modules {
                if !module::match_tags(tags, &m.tags) {
                    continue;
                }
                if out.contains_key(&m.module_name) {
                    log.error("ModuleNameCollision", format!("xform module name collision: {}", m.module_name));
                    continue;
                }
                out.insert(m.module_name.clone(), Self::resolve_one_definition(seg, m));
            }
        }
        out
    }

    fn resolve_one_definition(seg: &Segment, m: &ModuleDefinition) -> ResolvedModuleDefinition {
        ResolvedModuleDefinition {
            module_name: m.module_name.clone(),
            filename: m.filename.clone(),
            tags: m.tags.clone(),
            template_path: Self::resolve_template_path(seg, &m.template_path),
            abs_dirname: seg.abs_dirname.clone(),
            segment_name: seg.descriptor.name.clone(),
        }
    }

    /// All `xformConfig` entries across every segment in the chain, for
    /// modules present in `known`. Configs for unknown modules are logged
    /// and dropped.
    pub fn module_configs(
        &self,
        known: &HashMap<String, ResolvedModuleDefinition>,
        log: &BuildLog,
    ) -> Vec<ResolvedModuleConfig> {
        let mut out = Vec::new();
        for seg in self.segments() {
            for c in &seg.descriptor.xform_config {
                if !known.contains_key(&c.module_name) {
                    log.error("NoModuleForConfig", format!("no module for config: {}", c.module_name));
                    continue;
                }
                out.push(Self::resolve_one_config(seg, c));
            }
        }
        out
    }

    fn resolve_one_config(seg: &Segment, c: &ModuleConfig) -> ResolvedModuleConfig {
        ResolvedModuleConfig {
            module_name: c.module_name.clone(),
            tags: c.tags.clone(),
            input_kinds: c.input_kinds.clone(),
            output_kinds: c.output_kinds.clone(),
            template_path: Self::resolve_template_path(seg, &c.template_path),
            parameters: c.parameters.clone(),
            segment_name: seg.descriptor.name.clone(),
            abs_dirname: seg.abs_dirname.clone(),
        }
    }

    /// All schema bindings across every segment in the chain, keyed by
    /// kind. A duplicate kind is logged and the first binding wins.
    pub fn schema_definitions(&self, log: &BuildLog) -> HashMap<String, ResolvedSchemaBinding> {
        let mut out = HashMap::new();
        for seg in self.segments() {
            for sch in &seg.descriptor.schema {
                if out.contains_key(&sch.kind) {
                    log.error("DuplicateSchema", format!("duplicate schema definition: {}", sch.kind));
                    continue;
                }
                out.insert(
                    sch.kind.clone(),
                    ResolvedSchemaBinding {
                        kind: sch.kind.clone(),
                        filename: sch.filename.clone(),
                        abs_dirname: seg.abs_dirname.clone(),
                    },
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(dir: &Path) -> BuildLog {
        BuildLog::new(dir, false)
    }

    #[test]
    fn new_segment_then_list_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path(), None);
        let l = log(dir.path());
        wh.new_segment("local", &l).unwrap();
        assert_eq!(wh.list_segment_names(), vec!["local".to_string()]);
        assert!(wh.load_segment("local", &l).is_some());
        assert!(wh.load_segment("nope", &l).is_none());
    }

    #[test]
    fn fallback_chain_is_consulted_when_local_misses() {
        let base = tempfile::tempdir().unwrap();
        let local_dir = base.path().join("local-wh");
        let fallback_dir = base.path().join("fallback-wh");
        std::fs::create_dir_all(&local_dir).unwrap();
        std::fs::create_dir_all(&fallback_dir).unwrap();
        let l = log(base.path());
        let fallback_wh = Warehouse::new(&fallback_dir, None);
        fallback_wh.new_segment("shared", &l).unwrap();
        let local_wh = Warehouse::new(&local_dir, Some(fallback_wh));
        assert!(local_wh.load_segment("shared", &l).is_some());
    }

    #[test]
    fn module_name_collision_is_logged_and_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let l = log(dir.path());
        let mut wh = Warehouse::new(dir.path(), None);
        let seg_a = wh.new_segment("a", &l).unwrap();
        let mut seg_a = seg_a;
        seg_a.descriptor.xform_modules.push(ModuleDefinition {
            module_name: "dup".to_string(),
            filename: "a.rs".to_string(),
            tags: vec![],
            template_path: None,
        });
        seg_a.save().unwrap();
        let seg_b = wh.new_segment("b", &l).unwrap();
        let mut seg_b = seg_b;
        seg_b.descriptor.xform_modules.push(ModuleDefinition {
            module_name: "dup".to_string(),
            filename: "b.rs".to_string(),
            tags: vec![],
            template_path: None,
        });
        seg_b.save().unwrap();
        wh.load_segments(&l);
        let defs = wh.module_definitions(None, &l);
        assert_eq!(defs.get("dup").unwrap().filename, "a.rs");
    }
}
