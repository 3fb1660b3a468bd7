//! `fashion.core.generate.jinja2` — render a model into a template to
//! produce a file.
//!
//! Grounded on `original_source/fashion/warehouse/fashion.core/xform/generateJinja2.py`
//! and `.../xform/services.py`'s `GenerateService`. Templates render with
//! `tera::Tera::one_off` instead of a persistent Jinja2 `Environment`: each
//! generate spec already carries its own `templatePath` search list, so
//! there's nothing worth caching across specs the way a shared environment
//! would.

use crate::core::mirror::Mirror;
use crate::core::model_access::{ModelAccess, GENERATE_SPEC_KIND, MIRROR_SINGLETON_KIND};
use crate::core::module::{TransformModule, XformObject};
use crate::core::registry::CodeRegistry;
use crate::core::warehouse::ResolvedModuleConfig;
use std::path::{Path, PathBuf};

pub fn new() -> Box<dyn TransformModule> {
    Box::new(GenerateModule)
}

pub struct GenerateModule;

impl TransformModule for GenerateModule {
    fn init(
        &self,
        cfg: &ResolvedModuleConfig,
        _registry: &mut CodeRegistry,
        _tags: Option<&[String]>,
    ) -> Vec<Box<dyn XformObject>> {
        vec![Box::new(GenerateXform {
            name: cfg.module_name.clone(),
            input_kinds: vec![GENERATE_SPEC_KIND.to_string(), MIRROR_SINGLETON_KIND.to_string()],
            output_kinds: vec![crate::core::model_access::OUTPUT_FILE_KIND.to_string()],
            template_path: cfg.template_path.clone(),
        })]
    }
}

struct GenerateXform {
    name: String,
    input_kinds: Vec<String>,
    output_kinds: Vec<String>,
    template_path: Vec<String>,
}

impl XformObject for GenerateXform {
    fn name(&self) -> &str {
        &self.name
    }
    fn version(&self) -> &str {
        "1.0.0"
    }
    fn input_kinds(&self) -> &[String] {
        &self.input_kinds
    }
    fn output_kinds(&self) -> &[String] {
        &self.output_kinds
    }
    fn template_path(&self) -> &[String] {
        &self.template_path
    }

    fn execute(&self, access: &mut ModelAccess, _tags: Option<&[String]>) {
        let Some(mirror_cfg) = access.get_singleton(MIRROR_SINGLETON_KIND) else {
            access.log().error("MissingMirrorSingleton", "no fashion.core.mirror singleton set for this run");
            return;
        };
        let (Some(proj), Some(mir)) =
            (mirror_cfg.get("projectPath").and_then(|v| v.as_str()), mirror_cfg.get("mirrorPath").and_then(|v| v.as_str()))
        else {
            access.log().error("MissingMirrorSingleton", "fashion.core.mirror singleton missing projectPath/mirrorPath");
            return;
        };
        let force = mirror_cfg.get("force").and_then(|v| v.as_bool()).unwrap_or(false);
        let mirror = Mirror::new(PathBuf::from(proj), PathBuf::from(mir), force);

        let specs = access.get_by_kind(GENERATE_SPEC_KIND);
        for spec in specs {
            generate_one(access, &mirror, &spec);
        }
    }
}

fn generate_one(access: &mut ModelAccess, mirror: &Mirror, spec: &serde_json::Value) {
    let (Some(template_name), Some(target_file)) =
        (spec.get("template").and_then(|v| v.as_str()), spec.get("targetFile").and_then(|v| v.as_str()))
    else {
        access.log().error("InvalidGenerateSpec", "generate spec missing template or targetFile");
        return;
    };
    let target_path = Path::new(target_file);
    match mirror.is_changed(target_path) {
        Ok(true) => {
            access.log().warn("TargetModified", format!("Skipping {}, file has changed.", target_file));
            return;
        }
        Err(e) => {
            access.log().error("MirrorError", format!("{}: {}", target_file, e));
            return;
        }
        Ok(false) => {}
    }

    let search_dirs: Vec<String> = spec
        .get("templatePath")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let Some(template_text) = find_template(&search_dirs, template_name) else {
        access.log().error("TemplateNotFound", template_name);
        return;
    };

    let model_value = spec.get("model").cloned().unwrap_or(serde_json::json!({}));
    let context = match tera::Context::from_value(model_value) {
        Ok(c) => c,
        Err(e) => {
            access.log().error("TemplateContextError", format!("{}: {}", target_file, e));
            return;
        }
    };

    let rendered = match tera::Tera::one_off(&template_text, &context, true) {
        Ok(r) => r,
        Err(e) => {
            access.log().error("TemplateRenderError", format!("{}: {}", template_name, e));
            return;
        }
    };

    if let Some(parent) = target_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            access.log().error("TargetWriteError", format!("{}: {}", target_file, e));
            return;
        }
    }
    if let Err(e) = std::fs::write(target_path, rendered) {
        access.log().error("TargetWriteError", format!("{}: {}", target_file, e));
        return;
    }
    if let Err(e) = mirror.copy_to_mirror(target_path) {
        access.log().error("MirrorError", format!("{}: {}", target_file, e));
    }
    access.output_file(target_file);
}

fn find_template(search_dirs: &[String], template_name: &str) -> Option<String> {
    search_dirs.iter().map(|d| Path::new(d).join(template_name)).find_map(|p| std::fs::read_to_string(p).ok())
}
