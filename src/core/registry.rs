//! Code registry — the running set of services and transform objects.
//!
//! Grounded on `original_source/fashion/codeRegistry.py`'s `CodeRegistry`.
//! Version ranking and matching use the `semver` crate instead of
//! `packaging.version`/`SpecifierSet`; every module that registers
//! something is expected to use strict semantic versions.

use crate::core::log::BuildLog;
use crate::core::module::XformObject;
use crate::core::warehouse::ResolvedModuleConfig;
use semver::{Version, VersionReq};
use std::collections::HashMap;

/// A named, versioned long-lived collaborator a transform module can
/// publish for other modules to look up (e.g. a shared HTTP client, a
/// database connection).
pub trait Service: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn shutdown(&self) {}
}

fn parse_version(raw: &str, log: &BuildLog, context: &str) -> Option<Version> {
    match Version::parse(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log.error("InvalidVersion", format!("{}: {} is not a valid semantic version ({})", context, raw, e));
            None
        }
    }
}

pub struct CodeRegistry<'a> {
    log: &'a BuildLog,
    services_by_name: HashMap<String, Vec<Box<dyn Service>>>,
    xform_objects_by_name: HashMap<String, Box<dyn XformObject>>,
    cfg_by_name: HashMap<String, ResolvedModuleConfig>,
    current_segment_config: Option<ResolvedModuleConfig>,
}

impl<'a> CodeRegistry<'a> {
    pub fn new(log: &'a BuildLog) -> Self {
        Self {
            log,
            services_by_name: HashMap::new(),
            xform_objects_by_name: HashMap::new(),
            cfg_by_name: HashMap::new(),
            current_segment_config: None,
        }
    }

    /// Modules being initialized set this before producing their objects,
    /// so each `addXformObject` can be attributed to the config that
    /// created it.
    pub fn set_object_config(&mut self, cfg: ResolvedModuleConfig) {
        self.current_segment_config = Some(cfg);
    }

    pub fn get_object_config(&self, object_name: &str) -> Option<&ResolvedModuleConfig> {
        self.cfg_by_name.get(object_name)
    }

    /// Attribute `object_name` to whichever config `set_object_config` last
    /// recorded, so `get_object_config` can find it again once the object
    /// is running under its own `ModelAccess` context.
    pub fn capture_object_config(&mut self, object_name: &str) {
        if let Some(cfg) = self.current_segment_config.clone() {
            self.cfg_by_name.insert(object_name.to_string(), cfg);
        }
    }

    /// Find a registered service by name, optionally constrained to a
    /// semver requirement. With no requirement, the newest registered
    /// version wins.
    pub fn get_service(&self, service_name: &str, version_req: Option<&VersionReq>) -> Option<&dyn Service> {
        let services = self.services_by_name.get(service_name)?;
        let mut ranked: Vec<(Version, &dyn Service)> = services
            .iter()
            .filter_map(|s| parse_version(s.version(), self.log, service_name).map(|v| (v, s.as_ref())))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        match version_req {
            None => ranked.first().map(|(_, s)| *s),
            Some(req) => ranked.into_iter().find(|(v, _)| req.matches(v)).map(|(_, s)| s),
        }
    }

    /// Register a service under a unique version. A duplicate exact
    /// version is rejected.
    pub fn add_service(&mut self, service: Box<dyn Service>) -> bool {
        let name = service.name().to_string();
        let Some(new_version) = parse_version(service.version(), self.log, &name) else {
            return false;
        };
        let _ = &new_version;
        let entry = self.services_by_name.entry(name.clone()).or_default();
        let dup = entry.iter().any(|s| s.version() == service.version());
        if dup {
            self.log.error("DuplicateService", format!("duplicate service registration: {} v{}", name, service.version()));
            return false;
        }
        entry.push(service);
        true
    }

    /// Remove every registered version of `service_name` except
    /// `keep_version`, calling `shutdown` on each one removed. Returns
    /// true if anything was removed.
    pub fn remove_service(&mut self, service_name: &str, keep_version: &str) -> bool {
        let Some(services) = self.services_by_name.get_mut(service_name) else {
            return false;
        };
        let before = services.len();
        let mut kept = Vec::new();
        for s in services.drain(..) {
            if s.version() == keep_version {
                kept.push(s);
            } else {
                s.shutdown();
            }
        }
        *services = kept;
        services.len() < before
    }

    pub fn shutdown_all_services(&mut self) {
        for (_, services) in self.services_by_name.iter() {
            for s in services {
                s.shutdown();
            }
        }
        self.services_by_name.clear();
    }

    pub fn get_xform_object(&self, object_name: &str) -> Option<&dyn XformObject> {
        self.xform_objects_by_name.get(object_name).map(|b| b.as_ref())
    }

    /// Register a transform object. A newer version overwrites a strictly
    /// older one; an equal or older version is rejected.
    pub fn add_xform_object(&mut self, new_obj: Box<dyn XformObject>) -> bool {
        let name = new_obj.name().to_string();
        match self.xform_objects_by_name.get(&name) {
            None => {
                self.insert_object(name, new_obj);
                true
            }
            Some(existing) => {
                let (Some(existing_v), Some(new_v)) = (
                    parse_version(existing.version(), self.log, &name),
                    parse_version(new_obj.version(), self.log, &name),
                ) else {
                    return false;
                };
                if existing_v >= new_v {
                    self.log.error(
                        "DuplicateXformObject",
                        format!("duplicate xform object registration: {} v{}", name, new_obj.version()),
                    );
                    return false;
                }
                self.insert_object(name, new_obj);
                true
            }
        }
    }

    fn insert_object(&mut self, name: String, obj: Box<dyn XformObject>) {
        if let Some(cfg) = self.current_segment_config.clone() {
            self.cfg_by_name.insert(name.clone(), cfg);
        }
        self.xform_objects_by_name.insert(name, obj);
    }

    pub fn remove_xform_object(&mut self, object_name: &str) -> bool {
        self.xform_objects_by_name.remove(object_name).is_some()
    }

    pub fn objects(&self) -> impl Iterator<Item = &dyn XformObject> {
        self.xform_objects_by_name.values().map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model_access::ModelAccess;

    struct Noop;
    impl XformObject for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn input_kinds(&self) -> &[String] {
            &[]
        }
        fn output_kinds(&self) -> &[String] {
            &[]
        }
        fn template_path(&self) -> &[String] {
            &[]
        }
        fn execute(&self, _access: &mut ModelAccess, _tags: Option<&[String]>) {}
    }

    struct NoopV2;
    impl XformObject for NoopV2 {
        fn name(&self) -> &str {
            "noop"
        }
        fn version(&self) -> &str {
            "2.0.0"
        }
        fn input_kinds(&self) -> &[String] {
            &[]
        }
        fn output_kinds(&self) -> &[String] {
            &[]
        }
        fn template_path(&self) -> &[String] {
            &[]
        }
        fn execute(&self, _access: &mut ModelAccess, _tags: Option<&[String]>) {}
    }

    #[test]
    fn newer_xform_object_overwrites_older() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let mut reg = CodeRegistry::new(&log);
        assert!(reg.add_xform_object(Box::new(Noop)));
        assert!(reg.add_xform_object(Box::new(NoopV2)));
        assert_eq!(reg.get_xform_object("noop").unwrap().version(), "2.0.0");
    }

    #[test]
    fn older_xform_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let mut reg = CodeRegistry::new(&log);
        assert!(reg.add_xform_object(Box::new(NoopV2)));
        assert!(!reg.add_xform_object(Box::new(Noop)));
        assert_eq!(reg.get_xform_object("noop").unwrap().version(), "2.0.0");
    }

    fn test_cfg(module_name: &str, template_path: &[&str]) -> ResolvedModuleConfig {
        ResolvedModuleConfig {
            module_name: module_name.to_string(),
            tags: vec![],
            input_kinds: vec![],
            output_kinds: vec![],
            template_path: template_path.iter().map(|s| s.to_string()).collect(),
            parameters: serde_json::json!({}),
            segment_name: "local".to_string(),
            abs_dirname: std::path::PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn capture_object_config_attributes_to_last_set_config() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let mut reg = CodeRegistry::new(&log);
        assert!(reg.get_object_config("obj").is_none());

        reg.set_object_config(test_cfg("mod.a", &["tpl/a"]));
        reg.capture_object_config("obj");
        assert_eq!(reg.get_object_config("obj").unwrap().module_name, "mod.a");

        reg.set_object_config(test_cfg("mod.b", &["tpl/b"]));
        reg.capture_object_config("other");
        assert_eq!(reg.get_object_config("obj").unwrap().module_name, "mod.a");
        assert_eq!(reg.get_object_config("other").unwrap().module_name, "mod.b");
    }
}
