//! `%(key)s` parameter expansion for script templates.

use regex::{Captures, Regex};
use std::collections::HashMap;

/// Replace every `%(key)s` placeholder in `template` with the matching
/// value. Unknown keys are left verbatim, so a template's own `${...}`
/// (NSIS) syntax is never disturbed.
pub fn replace_params(template: &str, params: &HashMap<&str, String>) -> String {
    let placeholder =
        Regex::new(r"%\(([A-Za-z_][A-Za-z0-9_]*)\)s").expect("placeholder pattern is valid");
    placeholder
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
