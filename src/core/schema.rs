//! Schema Validator — maps a model kind to a bound JSON Schema document and
//! validates writes against it.
//!
//! Grounded on `original_source/fashion/schema.py`'s `SchemaRepository`;
//! uses the `jsonschema` crate for draft support instead of hand-rolling a
//! validator.

use crate::core::log::BuildLog;
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;

pub struct SchemaValidator {
    by_kind: HashMap<String, Validator>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self { by_kind: HashMap::new() }
    }

    pub fn exists(&self, kind: &str) -> bool {
        self.by_kind.contains_key(kind)
    }

    pub fn remove(&mut self, kind: &str) {
        self.by_kind.remove(kind);
    }

    /// Bind `schema_doc` to `kind`. If `overwrite` is false and a schema is
    /// already bound, the call is a no-op. A structurally invalid schema
    /// document removes any existing binding and logs, rather than
    /// panicking — the schema itself, not a model, is what's malformed.
    pub fn add_from_description(
        &mut self,
        kind: &str,
        schema_doc: &Value,
        overwrite: bool,
        log: &BuildLog,
    ) {
        if self.by_kind.contains_key(kind) && !overwrite {
            return;
        }
        match jsonschema::validator_for(schema_doc) {
            Ok(compiled) => {
                self.by_kind.insert(kind.to_string(), compiled);
            }
            Err(e) => {
                self.by_kind.remove(kind);
                log.error("SegmentDescriptorInvalid", format!("malformed schema for kind {}: {}", kind, e));
            }
        }
    }

    /// Validate `model` against `kind`'s schema, if one is bound. No schema
    /// bound means anything validates.
    pub fn validate(&self, kind: &str, model: &Value) -> Result<(), String> {
        match self.by_kind.get(kind) {
            None => Ok(()),
            Some(v) => {
                let errors: Vec<String> = v.iter_errors(model).map(|e| e.to_string()).collect();
                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(errors.join("; "))
                }
            }
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
