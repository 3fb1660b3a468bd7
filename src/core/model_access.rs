//! Supervised model access — the only way transform code touches the model
//! store.
//!
//! Grounded line-for-line on `original_source/fashion/modelAccess.py`
//! (`ModelAccessContext`, `ModelAccess`). Reads are restricted to declared
//! `inputKinds`, writes to declared `outputKinds`; every id touched is
//! recorded so the context can be idempotently reset on the next run.
//! Undeclared access is logged and skipped — it must never raise, because
//! the planner's ordering guarantees depend on declarations being truthful,
//! not on the process crashing when they're violated.

use crate::core::kind;
use crate::core::log::BuildLog;
use crate::core::schema::SchemaValidator;
use crate::core::store::{ModelId, ModelStore};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

pub const CONTEXT_TABLE: &str = "fashion.core.context";
pub const TRACE_KIND: &str = "fashion.core.trace";
pub const INPUT_FILE_KIND: &str = "fashion.core.input.file";
pub const OUTPUT_FILE_KIND: &str = "fashion.core.output.file";
pub const GENERATE_SPEC_KIND: &str = "fashion.core.generate.jinja2.spec";
pub const MIRROR_SINGLETON_KIND: &str = "fashion.core.mirror";

/// Declares the contract a transform (or builtin service) runs under.
#[derive(Debug, Clone)]
pub struct AccessDeclaration {
    pub name: String,
    pub input_kinds: Vec<String>,
    pub output_kinds: Vec<String>,
    pub template_path: Vec<String>,
}

/// Supervised access to the model store for a single transform's run.
/// Created on entry to `execute`, finalized on exit (success or failure).
pub struct ModelAccess<'a> {
    store: &'a mut ModelStore,
    schema: &'a SchemaValidator,
    log: &'a BuildLog,
    decl: AccessDeclaration,
    inserted: HashMap<String, HashSet<ModelId>>,
    searched: HashMap<String, HashSet<ModelId>>,
    finalized: bool,
}

impl<'a> ModelAccess<'a> {
    /// Enter a context named `decl.name`: delete everything the previous
    /// run under that name inserted, then start tracking fresh activity.
    pub fn enter(
        store: &'a mut ModelStore,
        schema: &'a SchemaValidator,
        log: &'a BuildLog,
        decl: AccessDeclaration,
    ) -> Self {
        reset_context(store, &decl.name);
        Self {
            store,
            schema,
            log,
            decl,
            inserted: HashMap::new(),
            searched: HashMap::new(),
            finalized: false,
        }
    }

    pub fn declaration(&self) -> &AccessDeclaration {
        &self.decl
    }

    pub fn log(&self) -> &BuildLog {
        self.log
    }

    fn record(map: &mut HashMap<String, HashSet<ModelId>>, kind: &str, id: ModelId) {
        map.entry(kind.to_string()).or_default().insert(id);
    }

    pub fn insert(&mut self, kind: &str, model: Value) -> Option<ModelId> {
        if !self.check_kind(kind) {
            return None;
        }
        if !self.decl.output_kinds.iter().any(|k| k == kind) {
            self.log.error(
                "UndeclaredAccess",
                format!("{}: attempt to write unlisted outputKind {}", self.decl.name, kind),
            );
            return None;
        }
        if let Err(e) = self.schema.validate(kind, &model) {
            self.log.error("SchemaValidation", format!("kind={}: {}", kind, e));
            return None;
        }
        let id = self.store.insert(kind, model);
        Self::record(&mut self.inserted, kind, id);
        Some(id)
    }

    fn check_kind(&self, kind: &str) -> bool {
        if kind::is_valid(kind) {
            true
        } else {
            self.log.error("InvalidKind", format!("{}: malformed model kind {:?}", self.decl.name, kind));
            false
        }
    }

    pub fn set_singleton(&mut self, kind: &str, model: Value) -> Option<ModelId> {
        if !self.check_kind(kind) {
            return None;
        }
        if !self.decl.output_kinds.iter().any(|k| k == kind) {
            self.log.error(
                "UndeclaredAccess",
                format!("{}: attempt to write unlisted outputKind {}", self.decl.name, kind),
            );
            return None;
        }
        if let Err(e) = self.schema.validate(kind, &model) {
            self.log.error("SchemaValidation", format!("kind={}: {}", kind, e));
            return None;
        }
        self.store.purge_table(kind);
        let id = self.store.insert(kind, model);
        Self::record(&mut self.inserted, kind, id);
        Some(id)
    }

    fn check_input(&self, op: &str, kind: &str) -> bool {
        if !self.check_kind(kind) {
            return false;
        }
        if self.decl.input_kinds.iter().any(|k| k == kind) {
            true
        } else {
            self.log.error(
                "UndeclaredAccess",
                format!("{}: attempt to {} unlisted inputKind {}", self.decl.name, op, kind),
            );
            false
        }
    }

    pub fn get_by_id(&mut self, kind: &str, id: ModelId) -> Option<Value> {
        if !self.check_input("getById", kind) {
            return None;
        }
        let row = self.store.get_by_id(kind, id);
        if row.is_some() {
            Self::record(&mut self.searched, kind, id);
        }
        row
    }

    pub fn get_by_kind(&mut self, kind: &str) -> Vec<Value> {
        if !self.check_input("getByKind", kind) {
            return vec![];
        }
        let rows = self.store.select_all(kind);
        for (id, _) in &rows {
            Self::record(&mut self.searched, kind, *id);
        }
        rows.into_iter().map(|(_, v)| v).collect()
    }

    pub fn get_singleton(&mut self, kind: &str) -> Option<Value> {
        if !self.check_input("getSingleton", kind) {
            return None;
        }
        let rows = self.store.select_all(kind);
        let (id, v) = rows.into_iter().next()?;
        Self::record(&mut self.searched, kind, id);
        Some(v)
    }

    pub fn search<F>(&mut self, kind: &str, predicate: F) -> Vec<Value>
    where
        F: Fn(&Value) -> bool,
    {
        if !self.check_input("search", kind) {
            return vec![];
        }
        let rows = self.store.search(kind, predicate);
        for (id, _) in &rows {
            Self::record(&mut self.searched, kind, *id);
        }
        rows.into_iter().map(|(_, v)| v).collect()
    }

    /// Record an input-file side effect fact.
    pub fn input_file(&mut self, filename: &str) -> Option<ModelId> {
        let model = json!({"contextName": self.decl.name, "filename": filename});
        self.insert(INPUT_FILE_KIND, model)
    }

    /// Record an output-file side effect fact.
    pub fn output_file(&mut self, filename: &str) -> Option<ModelId> {
        let model = json!({"contextName": self.decl.name, "filename": filename});
        self.insert(OUTPUT_FILE_KIND, model)
    }

    /// Insert a trace record linking `(kind, id)` to the inputs that
    /// produced it.
    pub fn trace(&mut self, kind: &str, id: ModelId, inputs: &[(String, ModelId)]) -> Option<ModelId> {
        if !self.decl.output_kinds.iter().any(|k| k == TRACE_KIND) {
            self.log.error(
                "UndeclaredAccess",
                format!("{} not in outputKinds of {}, no trace recorded", TRACE_KIND, self.decl.name),
            );
            return None;
        }
        let inputs: Vec<Value> = inputs.iter().map(|(k, i)| json!({"kind": k, "id": i})).collect();
        let model = json!({"kind": kind, "id": id, "name": self.decl.name, "inputs": inputs});
        self.insert(TRACE_KIND, model)
    }

    /// Compose and insert a generation request for one file.
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        &mut self,
        model: Value,
        template: &str,
        target_file: &str,
        template_dict: Value,
        proj_root: Option<&str>,
    ) -> Option<ModelId> {
        let mut gen_model = json!({
            "model": model,
            "template": template,
            "targetFile": target_file,
            "templatePath": self.decl.template_path,
            "templateDict": template_dict,
            "producer": self.decl.name,
        });
        if let Some(root) = proj_root {
            gen_model["projRoot"] = json!(root);
        }
        self.insert(GENERATE_SPEC_KIND, gen_model)
    }

    /// Persist the activity collected in this context to the reserved
    /// context table. Called automatically on drop if not called already.
    pub fn finalize(mut self) {
        self.do_finalize();
    }

    fn do_finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        let to_list = |m: &HashMap<String, HashSet<ModelId>>| -> Value {
            let map: serde_json::Map<String, Value> = m
                .iter()
                .map(|(k, ids)| {
                    let mut v: Vec<ModelId> = ids.iter().copied().collect();
                    v.sort_unstable();
                    (k.clone(), json!(v))
                })
                .collect();
            Value::Object(map)
        };
        let record = json!({
            "name": self.decl.name,
            "inputKinds": self.decl.input_kinds,
            "outputKinds": self.decl.output_kinds,
            "templatePath": self.decl.template_path,
            "insert": to_list(&self.inserted),
            "search": to_list(&self.searched),
            "update": {},
            "remove": {},
        });
        self.store.insert(CONTEXT_TABLE, record);
    }
}

impl Drop for ModelAccess<'_> {
    fn drop(&mut self) {
        self.do_finalize();
    }
}

/// Delete every model a prior context of this name inserted, and the
/// context record itself, giving at-most-once-effect-per-run semantics.
fn reset_context(store: &mut ModelStore, name: &str) {
    let rows = store.select_all(CONTEXT_TABLE);
    let mut matched_ids = Vec::new();
    for (ctx_id, ctx) in rows {
        if ctx.get("name").and_then(|v| v.as_str()) != Some(name) {
            continue;
        }
        matched_ids.push(ctx_id);
        if let Some(insert_map) = ctx.get("insert").and_then(|v| v.as_object()) {
            for (kind, ids) in insert_map {
                let ids: Vec<ModelId> = ids
                    .as_array()
                    .map(|a| a.iter().filter_map(|x| x.as_u64()).collect())
                    .unwrap_or_default();
                store.remove_by_ids(kind, &ids);
            }
        }
    }
    store.remove_by_ids(CONTEXT_TABLE, &matched_ids);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::SchemaValidator;

    fn decl(name: &str, inputs: &[&str], outputs: &[&str]) -> AccessDeclaration {
        AccessDeclaration {
            name: name.to_string(),
            input_kinds: inputs.iter().map(|s| s.to_string()).collect(),
            output_kinds: outputs.iter().map(|s| s.to_string()).collect(),
            template_path: vec![],
        }
    }

    #[test]
    fn insert_requires_declared_output_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        let mut ma = ModelAccess::enter(&mut store, &schema, &log, decl("t", &[], &[]));
        let id = ma.insert("foo", json!({"a": 1}));
        assert!(id.is_none());
        drop(ma);
        assert!(store.select_all("foo").is_empty());
    }

    #[test]
    fn get_by_kind_requires_declared_input_and_records_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        store.insert("greeting", json!({"text": "hi"}));
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        let mut ma = ModelAccess::enter(&mut store, &schema, &log, decl("t", &["greeting"], &[]));
        let rows = ma.get_by_kind("greeting");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn reentry_deletes_prior_inserts_before_new_insert() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);

        {
            let mut ma = ModelAccess::enter(&mut store, &schema, &log, decl("T", &[], &["K"]));
            ma.insert("K", json!(1));
            ma.insert("K", json!(2));
        }
        assert_eq!(store.select_all("K").len(), 2);

        {
            let mut ma = ModelAccess::enter(&mut store, &schema, &log, decl("T", &[], &["K"]));
            ma.insert("K", json!(3));
        }
        let rows = store.select_all("K");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, json!(3));
    }

    #[test]
    fn finalize_records_inserted_ids_in_context_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        {
            let mut ma = ModelAccess::enter(&mut store, &schema, &log, decl("T", &[], &["K"]));
            ma.insert("K", json!(1));
        }
        let ctxs = store.select_all(CONTEXT_TABLE);
        assert_eq!(ctxs.len(), 1);
        assert_eq!(ctxs[0].1["insert"]["K"], json!([0]));
    }

    #[test]
    fn generate_embeds_the_context_template_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::open(dir.path().join("db.json")).unwrap();
        let schema = SchemaValidator::new();
        let log = BuildLog::new(dir.path(), false);
        let mut d = decl("T", &[], &[GENERATE_SPEC_KIND]);
        d.template_path = vec!["cfg/templates".to_string(), "def/templates".to_string()];
        let mut ma = ModelAccess::enter(&mut store, &schema, &log, d);
        ma.generate(json!({"a": 1}), "t.tera", "out/t.txt", json!({}), None);
        drop(ma);
        let specs = store.select_all(GENERATE_SPEC_KIND);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].1["templatePath"], json!(["cfg/templates", "def/templates"]));
    }
}
