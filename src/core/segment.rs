//! Segment — a named, versioned package of templates, schemas, transform
//! definitions and configurations, loaded from a single JSON descriptor.
//!
//! Grounded on `original_source/fashion/segment.py`: the descriptor's
//! meta-schema (`name`/`version` required, both non-empty strings) is
//! applied through the same `jsonschema`-backed validator the engine uses
//! for user model kinds, matching "a segment descriptor is... self
//! validating against a fixed meta-schema" before its contents are trusted.

use crate::core::error::FashionError;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaBinding {
    pub kind: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleDefinition {
    #[serde(rename = "moduleName")]
    pub module_name: String,
    pub filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "templatePath", default)]
    pub template_path: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleConfig {
    #[serde(rename = "moduleName")]
    pub module_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "inputKinds", default)]
    pub input_kinds: Vec<String>,
    #[serde(rename = "outputKinds", default)]
    pub output_kinds: Vec<String>,
    #[serde(rename = "templatePath", default)]
    pub template_path: Option<Vec<String>>,
    #[serde(default = "default_parameters")]
    pub parameters: Value,
}

fn default_parameters() -> Value {
    json!({})
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "templatePath", default = "default_template_path")]
    pub template_path: Vec<String>,
    #[serde(default)]
    pub schema: Vec<SchemaBinding>,
    #[serde(rename = "xformModules", default)]
    pub xform_modules: Vec<ModuleDefinition>,
    #[serde(rename = "xformConfig", default)]
    pub xform_config: Vec<ModuleConfig>,
    #[serde(rename = "segmentRefs", default)]
    pub segment_refs: Vec<String>,
    #[serde(rename = "extraFiles", default)]
    pub extra_files: Vec<String>,
}

fn default_template_path() -> Vec<String> {
    vec!["./template".to_string()]
}

impl Default for SegmentDescriptor {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            version: "1.0.0".to_string(),
            description: "fashion segment".to_string(),
            template_path: default_template_path(),
            schema: vec![],
            xform_modules: vec![],
            xform_config: vec![],
            segment_refs: vec![],
            extra_files: vec![],
        }
    }
}

fn meta_schema() -> &'static Validator {
    static SCHEMA: OnceLock<Validator> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let doc = json!({
            "type": "object",
            "required": ["name", "version"],
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "version": {"type": "string", "minLength": 1},
            }
        });
        jsonschema::validator_for(&doc).expect("segment meta-schema is valid")
    })
}

/// A loaded segment: its descriptor plus the absolute directory it was
/// loaded from (every relative path in the descriptor resolves against it).
#[derive(Debug, Clone)]
pub struct Segment {
    pub descriptor: SegmentDescriptor,
    pub abs_dirname: PathBuf,
}

impl Segment {
    pub fn descriptor_path(dir: &Path) -> PathBuf {
        dir.join("segment.json")
    }

    /// Load a segment from `dir/segment.json`, validating against the
    /// fixed meta-schema.
    pub fn load(dir: &Path) -> Result<Self, FashionError> {
        let path = Self::descriptor_path(dir);
        let text = std::fs::read_to_string(&path)?;
        let raw: Value = serde_json::from_str(&text)?;
        if !meta_schema().is_valid(&raw) {
            return Err(FashionError::StoreError(format!(
                "segment descriptor at {} failed meta-schema validation",
                path.display()
            )));
        }
        let descriptor: SegmentDescriptor = serde_json::from_value(raw)?;
        Ok(Self { descriptor, abs_dirname: dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()) })
    }

    /// Create a new segment directory with default sub-directories and a
    /// default descriptor, then save it.
    pub fn create(dir: &Path, name: &str) -> Result<Self, FashionError> {
        if !crate::core::kind::is_valid(name) {
            return Err(FashionError::InvalidName(name.to_string()));
        }
        std::fs::create_dir_all(dir)?;
        for sub in ["model", "schema", "template", "xform"] {
            std::fs::create_dir_all(dir.join(sub))?;
        }
        let mut descriptor = SegmentDescriptor::default();
        descriptor.name = name.to_string();
        let seg = Self { descriptor, abs_dirname: dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()) };
        seg.save()?;
        Ok(seg)
    }

    pub fn save(&self) -> Result<(), FashionError> {
        let text = serde_json::to_string_pretty(&self.descriptor)?;
        std::fs::write(Self::descriptor_path(&self.abs_dirname), text)?;
        Ok(())
    }

    /// Resolve a path written in the descriptor relative to this segment's
    /// directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.abs_dirname.join(relative)
    }

    pub fn resolved_template_path(&self) -> Vec<String> {
        self.descriptor
            .template_path
            .iter()
            .map(|p| self.resolve(p).to_string_lossy().to_string())
            .collect()
    }
}
