//! Model kind validation.
//!
//! A model kind is a dotted identifier (`fashion.core.trace`,
//! `myapp.widget`). Unlike most of this module's plain-`&str` API,
//! validation happens once at the boundary — the model store and schema
//! validator trust a kind that reached them through `ModelAccess`, which
//! checks every kind before touching the store.

use regex::Regex;
use std::sync::OnceLock;

fn kind_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").unwrap())
}

/// True iff `kind` is a well-formed dotted identifier.
pub fn is_valid(kind: &str) -> bool {
    kind_pattern().is_match(kind)
}
