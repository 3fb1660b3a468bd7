//! Runway — loads modules and schemas from a warehouse, initializes
//! transform objects from their configs, plans, and executes them.
//!
//! Grounded on `original_source/fashion/runway.py`'s `Runway`. Dynamic
//! module loading becomes a static factory lookup (see `core::module`);
//! everything else — load modules, load schemas, init modules from
//! configs, plan, execute — mirrors the original phase order.

use crate::core::log::BuildLog;
use crate::core::model_access::{AccessDeclaration, ModelAccess, MIRROR_SINGLETON_KIND};
use crate::core::module::{match_tags, TransformModule, XformObject};
use crate::core::planner::{self, ExecutionPlan, PlanInput};
use crate::core::registry::CodeRegistry;
use crate::core::schema::SchemaValidator;
use crate::core::store::ModelStore;
use crate::core::warehouse::{ResolvedModuleDefinition, Warehouse};
use crate::plugins::BUILTIN_MODULES;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

pub struct Runway<'a> {
    store: &'a mut ModelStore,
    log: &'a BuildLog,
    warehouse: Warehouse,
    schema: SchemaValidator,
    registry: CodeRegistry<'a>,
    modules: HashMap<String, Box<dyn TransformModule>>,
    module_defs: HashMap<String, ResolvedModuleDefinition>,
    objects: HashMap<String, Box<dyn XformObject>>,
    plan: Option<ExecutionPlan>,
}

impl<'a> Runway<'a> {
    pub fn new(store: &'a mut ModelStore, log: &'a BuildLog, warehouse: Warehouse) -> Self {
        Self {
            store,
            log,
            warehouse,
            schema: SchemaValidator::new(),
            registry: CodeRegistry::new(log),
            modules: HashMap::new(),
            module_defs: HashMap::new(),
            objects: HashMap::new(),
            plan: None,
        }
    }

    /// Resolve every segment's `xformModules` entry against the static
    /// built-in factory table. A definition naming a module the table
    /// doesn't carry is logged and otherwise ignored, the same as Python's
    /// `FileNotFoundError` branch when a module file can't be imported.
    pub fn load_modules(&mut self, tags: Option<&[String]>) {
        self.module_defs = self.warehouse.module_definitions(tags, self.log);
        for (name, _def) in &self.module_defs {
            match BUILTIN_MODULES.iter().find(|m| m.module_name == name) {
                Some(reg) => {
                    self.modules.insert(name.clone(), (reg.factory)());
                }
                None => {
                    self.log.error("ModuleNotFound", format!("no built-in module registered for {}", name));
                }
            }
        }
    }

    pub fn load_schemas(&mut self) {
        let defs = self.warehouse.schema_definitions(self.log);
        for (kind, binding) in defs {
            let path = binding.abs_dirname.join(&binding.filename);
            match std::fs::read_to_string(&path) {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(doc) => self.schema.add_from_description(&kind, &doc, true, self.log),
                    Err(e) => {
                        self.log.error("SegmentDescriptorInvalid", format!("{}: {}", path.display(), e))
                    }
                },
                Err(e) => self.log.error("SchemaFileNotFound", format!("{}: {}", path.display(), e)),
            }
        }
    }

    /// Initialize every segment's `xformConfig` entry whose module loaded
    /// and whose tags match, collecting the `XformObject`s it produces.
    pub fn init_modules(&mut self, tags: Option<&[String]>) {
        let cfgs = self.warehouse.module_configs(&self.module_defs, self.log);
        for cfg in cfgs {
            if !match_tags(tags, &cfg.tags) {
                continue;
            }
            let Some(module) = self.modules.get(&cfg.module_name) else {
                continue;
            };
            self.registry.set_object_config(cfg.clone());
            for obj in module.init(&cfg, &mut self.registry, tags) {
                if self.objects.contains_key(obj.name()) {
                    self.log.error("DuplicateObjectName", format!("Duplicate object name: {}", obj.name()));
                } else {
                    self.registry.capture_object_config(obj.name());
                    self.objects.insert(obj.name().to_string(), obj);
                }
            }
        }
    }

    /// Publish the `fashion.core.mirror` singleton every generator reads to
    /// find the project root, mirror directory, and force flag.
    pub fn init_mirror(&mut self, proj_dir: &Path, mirror_dir: &Path, force: bool) {
        let decl = AccessDeclaration {
            name: "fashion.core.runway".to_string(),
            input_kinds: vec![],
            output_kinds: vec![MIRROR_SINGLETON_KIND.to_string()],
            template_path: vec![],
        };
        let mut access = ModelAccess::enter(self.store, &self.schema, self.log, decl);
        access.set_singleton(
            MIRROR_SINGLETON_KIND,
            json!({
                "projectPath": proj_dir.to_string_lossy(),
                "mirrorPath": mirror_dir.to_string_lossy(),
                "force": force,
            }),
        );
    }

    pub fn plan(&mut self) {
        let inputs: Vec<PlanInput> = self
            .objects
            .values()
            .map(|o| PlanInput {
                name: o.name().to_string(),
                input_kinds: o.input_kinds().to_vec(),
                output_kinds: o.output_kinds().to_vec(),
            })
            .collect();
        let result = planner::plan(&inputs);
        if !result.valid {
            self.log.warn("CycleDetected", format!("xform dependency cycle detected: {:?}", result.unscheduled));
        }
        self.plan = Some(result);
    }

    pub fn execution_plan(&self) -> Option<&ExecutionPlan> {
        self.plan.as_ref()
    }

    /// Run every planned transform object, each under its own supervised
    /// `ModelAccess` context. One object's panic-free internal error never
    /// stops the rest: failures are routed through the build log, not
    /// propagated, matching Python's per-object `try/except` in `execute`.
    pub fn execute(&mut self, tags: Option<&[String]>) {
        let Some(plan) = self.plan.clone() else {
            self.log.error("NoPlan", "execute called before plan");
            return;
        };
        for name in &plan.exec_list {
            let Some(obj) = self.objects.get(name) else { continue };
            let decl = AccessDeclaration {
                name: obj.name().to_string(),
                input_kinds: obj.input_kinds().to_vec(),
                output_kinds: obj.output_kinds().to_vec(),
                template_path: self.composite_template_path(name, obj.as_ref()),
            };
            let mut access = ModelAccess::enter(self.store, &self.schema, self.log, decl);
            obj.execute(&mut access, tags);
        }
    }

    /// The configuration-path-then-definition-path search list for `name`:
    /// the object's own (configuration) template path first, followed by
    /// the template path of the module definition that produced it.
    fn composite_template_path(&self, name: &str, obj: &dyn XformObject) -> Vec<String> {
        let mut path = obj.template_path().to_vec();
        if let Some(def) = self
            .registry
            .get_object_config(name)
            .and_then(|cfg| self.module_defs.get(&cfg.module_name))
        {
            path.extend(def.template_path.iter().cloned());
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::{ModuleConfig, ModuleDefinition, SchemaBinding};
    use crate::core::warehouse::Warehouse;
    use serde_json::json;

    #[test]
    fn load_modules_logs_unknown_module_name() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let warehouse = Warehouse::new(dir.path().join("wh"), None);
        let seg = warehouse.new_segment("local", &log).unwrap();
        let mut seg = seg;
        seg.descriptor.xform_modules.push(ModuleDefinition {
            module_name: "nonexistent.module".to_string(),
            filename: "x.rs".to_string(),
            tags: vec![],
            template_path: None,
        });
        seg.save().unwrap();
        let mut warehouse = warehouse;
        warehouse.load_segments(&log);

        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let mut runway = Runway::new(&mut store, &log, warehouse);
        runway.load_modules(None);
        assert!(!runway.modules.contains_key("nonexistent.module"));
    }

    #[test]
    fn end_to_end_json_load_produces_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let log = BuildLog::new(dir.path(), false);
        let warehouse = Warehouse::new(dir.path().join("wh"), None);
        let seg = warehouse.new_segment("local", &log).unwrap();
        let mut seg = seg;

        let datafile = dir.path().join("greeting.json");
        std::fs::write(&datafile, r#"{"text": "hi"}"#).unwrap();

        seg.descriptor.xform_modules.push(ModuleDefinition {
            module_name: "fashion.core.load.json".to_string(),
            filename: "builtin".to_string(),
            tags: vec![],
            template_path: None,
        });
        seg.descriptor.xform_config.push(ModuleConfig {
            module_name: "fashion.core.load.json".to_string(),
            tags: vec![],
            input_kinds: vec![],
            output_kinds: vec!["greeting".to_string()],
            template_path: None,
            parameters: json!({"kind": "greeting", "filename": datafile.to_string_lossy()}),
        });
        seg.descriptor.schema.push(SchemaBinding { kind: "greeting".to_string(), filename: "noexist.json".to_string() });
        seg.save().unwrap();

        let mut warehouse = warehouse;
        warehouse.load_segments(&log);

        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        {
            let mut runway = Runway::new(&mut store, &log, warehouse);
            runway.load_modules(None);
            runway.init_modules(None);
            runway.plan();
            runway.execute(None);
        }
        assert_eq!(store.select_all("greeting").len(), 1);
    }
}
