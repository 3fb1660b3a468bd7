//! `fashion.core.load.json` — load models from JSON files.
//!
//! Grounded on `original_source/fashion/warehouse/fashion.core/xform/loadJSON.py`.
//! One `LoadJson` object per matched file; `init` resolves the glob once,
//! `execute` does the actual read-and-insert so the plan only schedules
//! work that's declared.

use crate::core::model_access::ModelAccess;
use crate::core::module::{TransformModule, XformObject};
use crate::core::registry::CodeRegistry;
use crate::core::warehouse::ResolvedModuleConfig;
use crate::plugins::resolve_filenames;
use std::path::PathBuf;

pub fn new() -> Box<dyn TransformModule> {
    Box::new(LoadJsonModule)
}

pub struct LoadJsonModule;

impl TransformModule for LoadJsonModule {
    fn init(
        &self,
        cfg: &ResolvedModuleConfig,
        _registry: &mut CodeRegistry,
        _tags: Option<&[String]>,
    ) -> Vec<Box<dyn XformObject>> {
        let Some(kind) = cfg.parameters.get("kind").and_then(|v| v.as_str()) else {
            return vec![];
        };
        let Some(pattern) = cfg.parameters.get("filename").and_then(|v| v.as_str()) else {
            return vec![];
        };
        let is_list = cfg.parameters.get("isList").and_then(|v| v.as_bool()).unwrap_or(false);
        resolve_filenames(&cfg.abs_dirname, pattern)
            .into_iter()
            .map(|filename| -> Box<dyn XformObject> {
                Box::new(LoadJson {
                    name: format!("{}::{}", cfg.module_name, filename.display()),
                    kind: kind.to_string(),
                    filename,
                    is_list,
                    output_kinds: vec![kind.to_string()],
                    template_path: cfg.template_path.clone(),
                })
            })
            .collect()
    }
}

struct LoadJson {
    name: String,
    kind: String,
    filename: PathBuf,
    is_list: bool,
    output_kinds: Vec<String>,
    template_path: Vec<String>,
}

impl XformObject for LoadJson {
    fn name(&self) -> &str {
        &self.name
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn input_kinds(&self) -> &[String] {
        &[]
    }
    fn output_kinds(&self) -> &[String] {
        &self.output_kinds
    }
    fn template_path(&self) -> &[String] {
        &self.template_path
    }

    fn execute(&self, access: &mut ModelAccess, _tags: Option<&[String]>) {
        let text = match std::fs::read_to_string(&self.filename) {
            Ok(t) => t,
            Err(e) => {
                access.log().error("FileNotFound", format!("{}: {}", self.filename.display(), e));
                return;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                access.log().error("InvalidJson", format!("{}: {}", self.filename.display(), e));
                return;
            }
        };
        if self.is_list {
            match value.as_array() {
                Some(items) => {
                    for item in items {
                        access.insert(&self.kind, item.clone());
                    }
                }
                None => access.log().error("InvalidJson", format!("{}: expected a list", self.filename.display())),
            }
        } else {
            access.insert(&self.kind, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::BuildLog;
    use crate::core::model_access::AccessDeclaration;
    use crate::core::schema::SchemaValidator;
    use crate::core::store::ModelStore;
    use serde_json::json;

    #[test]
    fn loads_single_object() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("greeting.json");
        std::fs::write(&file, r#"{"text": "hi"}"#).unwrap();

        let obj = LoadJson {
            name: "t".to_string(),
            kind: "greeting".to_string(),
            filename: file,
            is_list: false,
            output_kinds: vec!["greeting".to_string()],
            template_path: vec![],
        };

        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        let decl = AccessDeclaration {
            name: "t".to_string(),
            input_kinds: vec![],
            output_kinds: vec!["greeting".to_string()],
            template_path: vec![],
        };
        {
            let mut access = ModelAccess::enter(&mut store, &schema, &log, decl);
            obj.execute(&mut access, None);
        }
        let rows = store.select_all("greeting");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, json!({"text": "hi"}));
    }

    #[test]
    fn loads_each_item_of_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("greetings.json");
        std::fs::write(&file, r#"[{"text": "hi"}, {"text": "bye"}]"#).unwrap();

        let obj = LoadJson {
            name: "t".to_string(),
            kind: "greeting".to_string(),
            filename: file,
            is_list: true,
            output_kinds: vec!["greeting".to_string()],
            template_path: vec![],
        };

        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        let decl = AccessDeclaration {
            name: "t".to_string(),
            input_kinds: vec![],
            output_kinds: vec!["greeting".to_string()],
            template_path: vec![],
        };
        {
            let mut access = ModelAccess::enter(&mut store, &schema, &log, decl);
            obj.execute(&mut access, None);
        }
        assert_eq!(store.select_all("greeting").len(), 2);
    }
}
