//! Model store — an opaque document database with named tables.
//!
//! One table per kind. Insertion is append-only and returns a monotonically
//! increasing id local to that kind; insertion never mutates an existing
//! id, and a model is visible for reads only after its insert call returns
//! — trivially true here since there is no async boundary between "insert
//! returns" and "visible to the next read".
//!
//! The persistence *format* is intentionally private to this module,
//! treated as an opaque collaborator by everything above it: it is pretty
//! JSON written to `<project>/fashion/database.json`, atomically via a
//! temp-file rename, so a crash mid-write never corrupts the previous good
//! copy.

use crate::core::error::FashionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type ModelId = u64;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Table {
    next_id: ModelId,
    rows: BTreeMap<ModelId, Value>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    tables: BTreeMap<String, Table>,
}

/// The model store. Owns all models; transforms only ever hold ids and
/// borrowed references via `ModelAccess`.
pub struct ModelStore {
    path: PathBuf,
    doc: Document,
    dirty: bool,
}

impl ModelStore {
    /// Open (or create) the store at `path`. Existing content is loaded
    /// eagerly; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FashionError> {
        let path = path.into();
        let doc = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Document::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Document::default()
        };
        Ok(Self { path, doc, dirty: false })
    }

    fn table(&self, kind: &str) -> Option<&Table> {
        self.doc.tables.get(kind)
    }

    fn table_mut(&mut self, kind: &str) -> &mut Table {
        self.doc.tables.entry(kind.to_string()).or_default()
    }

    /// Append `model` to `kind`'s table, returning its new id.
    pub fn insert(&mut self, kind: &str, model: Value) -> ModelId {
        let table = self.table_mut(kind);
        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(id, model);
        self.dirty = true;
        id
    }

    pub fn get_by_id(&self, kind: &str, id: ModelId) -> Option<Value> {
        self.table(kind).and_then(|t| t.rows.get(&id)).cloned()
    }

    /// All rows of `kind`, in ascending-id (insertion) order, as `(id, model)`.
    pub fn select_all(&self, kind: &str) -> Vec<(ModelId, Value)> {
        self.table(kind).map(|t| t.rows.iter().map(|(id, v)| (*id, v.clone())).collect()).unwrap_or_default()
    }

    pub fn search<F>(&self, kind: &str, predicate: F) -> Vec<(ModelId, Value)>
    where
        F: Fn(&Value) -> bool,
    {
        self.select_all(kind).into_iter().filter(|(_, v)| predicate(v)).collect()
    }

    /// Delete every row of `kind`.
    pub fn purge_table(&mut self, kind: &str) {
        if let Some(t) = self.doc.tables.get_mut(kind) {
            t.rows.clear();
            self.dirty = true;
        }
    }

    /// Remove specific ids from `kind`'s table. Missing ids are ignored.
    pub fn remove_by_ids(&mut self, kind: &str, ids: &[ModelId]) {
        if let Some(t) = self.doc.tables.get_mut(kind) {
            for id in ids {
                t.rows.remove(id);
            }
            self.dirty = true;
        }
    }

    /// Persist the store atomically if anything changed since open/close.
    pub fn close(&mut self) -> Result<(), FashionError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &self.path)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for ModelStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
