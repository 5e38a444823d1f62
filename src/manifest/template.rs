//! `{{ name }}` template substitution for manifest files.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::ManifestError;

pub type TemplateVars = HashMap<String, String>;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}").expect("static regex"))
}

/// Replace every `{{ name }}` in `content` with its value from `vars`.
///
/// Values are inserted verbatim and not scanned again.  Fails on the first
/// placeholder whose variable is not set.
pub fn render(vars: &TemplateVars, content: &str) -> Result<String, ManifestError> {
    if let Some(missing) = placeholder()
        .captures_iter(content)
        .map(|c| c[1].to_owned())
        .find(|name| !vars.contains_key(name))
    {
        return Err(ManifestError::UnsetVariable(missing));
    }
    Ok(placeholder()
        .replace_all(content, |c: &Captures| vars[&c[1]].clone())
        .into_owned())
}
