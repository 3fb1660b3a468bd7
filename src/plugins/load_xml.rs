//! `fashion.core.load.xml` — load models from XML files.
//!
//! Grounded on `original_source/fashion/warehouse/fashion.core/xform/loadXML.py`,
//! which parsed with `xmltodict`. There's no equivalent crate in the
//! dependency stack, so `xml_to_json` walks `quick-xml`'s event stream and
//! builds the same shape by hand: attributes under `@name` keys, text
//! under `#text`, repeated child tags collapsed into arrays.

use crate::core::model_access::ModelAccess;
use crate::core::module::{TransformModule, XformObject};
use crate::core::registry::CodeRegistry;
use crate::core::warehouse::ResolvedModuleConfig;
use crate::plugins::resolve_filenames;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};
use std::path::PathBuf;

pub fn new() -> Box<dyn TransformModule> {
    Box::new(LoadXmlModule)
}

pub struct LoadXmlModule;

impl TransformModule for LoadXmlModule {
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
        resolve_filenames(&cfg.abs_dirname, pattern)
            .into_iter()
            .map(|filename| -> Box<dyn XformObject> {
                Box::new(LoadXml {
                    name: format!("{}::{}", cfg.module_name, filename.display()),
                    kind: kind.to_string(),
                    filename,
                    output_kinds: vec![kind.to_string()],
                    template_path: cfg.template_path.clone(),
                })
            })
            .collect()
    }
}

struct LoadXml {
    name: String,
    kind: String,
    filename: PathBuf,
    output_kinds: Vec<String>,
    template_path: Vec<String>,
}

impl XformObject for LoadXml {
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
        match xml_to_json(&text) {
            Ok(value) => {
                access.insert(&self.kind, value);
            }
            Err(e) => {
                access.log().error("InvalidXml", format!("{}: {}", self.filename.display(), e));
            }
        }
    }
}

struct Frame {
    tag: String,
    attrs: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Frame {
    fn new(tag: String) -> Self {
        Self { tag, attrs: Map::new(), children: Vec::new(), text: String::new() }
    }

    fn into_value(self) -> Value {
        let trimmed = self.text.trim();
        if self.children.is_empty() && self.attrs.is_empty() {
            return Value::String(trimmed.to_string());
        }
        let mut obj = self.attrs;
        if !trimmed.is_empty() {
            obj.insert("#text".to_string(), Value::String(trimmed.to_string()));
        }
        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        for (tag, value) in self.children {
            if let Some(entry) = grouped.iter_mut().find(|(t, _)| *t == tag) {
                entry.1.push(value);
            } else {
                grouped.push((tag, vec![value]));
            }
        }
        for (tag, mut values) in grouped {
            let v = if values.len() == 1 { values.pop().unwrap() } else { Value::Array(values) };
            obj.insert(tag, v);
        }
        Value::Object(obj)
    }
}

/// Parse an XML document into the `xmltodict`-shaped JSON value: a single
/// top-level key for the document's root tag.
pub fn xml_to_json(text: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mut frame = Frame::new(tag);
                for attr in e.attributes().flatten() {
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let val = attr.unescape_value().unwrap_or_default().to_string();
                    frame.attrs.insert(key, Value::String(val));
                }
                stack.push(frame);
            }
            Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let mut frame = Frame::new(tag.clone());
                for attr in e.attributes().flatten() {
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let val = attr.unescape_value().unwrap_or_default().to_string();
                    frame.attrs.insert(key, Value::String(val));
                }
                let value = frame.into_value();
                close_tag(&mut stack, &mut root, tag, value);
            }
            Event::Text(t) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let frame = stack.pop().ok_or_else(|| format!("unmatched closing tag {}", tag))?;
                let value = frame.into_value();
                close_tag(&mut stack, &mut root, tag, value);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let (tag, value) = root.ok_or("no root element found")?;
    let mut obj = Map::new();
    obj.insert(tag, value);
    Ok(Value::Object(obj))
}

fn close_tag(stack: &mut Vec<Frame>, root: &mut Option<(String, Value)>, tag: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => parent.children.push((tag, value)),
        None => *root = Some((tag, value)),
    }
}
