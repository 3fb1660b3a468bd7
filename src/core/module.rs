//! Transform modules and transform objects.
//!
//! Python loads a transform module by `importlib` at runtime; a statically
//! compiled target can't do that, so a transform module here is a Rust type
//! registered in a static factory table instead of a file path pulled in
//! dynamically.

use crate::core::model_access::ModelAccess;
use crate::core::registry::CodeRegistry;
use crate::core::warehouse::ResolvedModuleConfig;
use std::collections::HashSet;

/// True if `module_tags` satisfies `requested`: every requested tag must be
/// present in `module_tags` (R⊆C). `None` means no filter at all. An empty
/// request is the empty set, which is a subset of anything, so it matches
/// everything — tagged modules included.
pub fn match_tags(requested: Option<&[String]>, module_tags: &[String]) -> bool {
    match requested {
        None => true,
        Some(req) => {
            let req: HashSet<&String> = req.iter().collect();
            if req.is_empty() && module_tags.is_empty() {
                return true;
            }
            let has: HashSet<&String> = module_tags.iter().collect();
            req.intersection(&has).count() == req.len()
        }
    }
}

/// One transform: reads its declared `inputKinds`, writes its declared
/// `outputKinds`, through the `ModelAccess` it's handed for the duration of
/// one run.
pub trait XformObject {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn input_kinds(&self) -> &[String];
    fn output_kinds(&self) -> &[String];
    fn template_path(&self) -> &[String];
    fn execute(&self, access: &mut ModelAccess, tags: Option<&[String]>);
}

/// A compiled unit that, given a config from a segment's `xformConfig`,
/// produces the `XformObject`s it's configured for, registering any
/// services it exposes along the way.
pub trait TransformModule: Send + Sync {
    fn init(
        &self,
        cfg: &ResolvedModuleConfig,
        registry: &mut CodeRegistry,
        tags: Option<&[String]>,
    ) -> Vec<Box<dyn XformObject>>;
}

pub type ModuleFactory = fn() -> Box<dyn TransformModule>;

/// A single entry in the static module table, standing in for the
/// `moduleName` -> source file mapping a segment's `xformModules` would
/// otherwise resolve dynamically.
pub struct ModuleRegistration {
    pub module_name: &'static str,
    pub factory: ModuleFactory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_request_always_matches() {
        assert!(match_tags(None, &["a".to_string()]));
        assert!(match_tags(None, &[]));
    }

    #[test]
    fn empty_request_matches_everything() {
        assert!(match_tags(Some(&[]), &[]));
        assert!(match_tags(Some(&[]), &["a".to_string()]));
    }

    #[test]
    fn request_matches_only_when_all_requested_tags_present() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert!(match_tags(Some(&["a".to_string()]), &tags));
        assert!(!match_tags(Some(&["c".to_string()]), &tags));
    }
}
