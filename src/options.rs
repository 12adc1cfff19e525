//! Compile options.
//!
//! Options arrive as partial JSON objects (from the Node binding or a build
//! tool) and are deep-merged onto the documented defaults: nested objects merge
//! key by key, scalars override, and `null` leaves the default in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CompilerError;
use crate::scope::ScopePolicy;

/// Options handed verbatim to the minifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinifyOptions {
    pub remove_comments: bool,
    #[serde(rename = "removeCommentsFromCDATA")]
    pub remove_comments_from_cdata: bool,
    pub collapse_whitespace: bool,
    pub collapse_boolean_attributes: bool,
    pub remove_attribute_quotes: bool,
    pub remove_redundant_attributes: bool,
    pub use_short_doctype: bool,
    pub remove_empty_attributes: bool,
    pub remove_optional_tags: bool,
    /// Keys this crate does not interpret, kept for custom minifiers.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            remove_comments: true,
            remove_comments_from_cdata: true,
            collapse_whitespace: true,
            collapse_boolean_attributes: true,
            remove_attribute_quotes: false,
            remove_redundant_attributes: false,
            use_short_doctype: true,
            remove_empty_attributes: false,
            remove_optional_tags: false,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Always minify before compiling.
    pub htmlmin_enable: bool,
    /// Minify only sources spanning more than one line.
    pub htmlmin_multi_lines: bool,
    pub htmlmin: MinifyOptions,
    /// Reject unbalanced `#each`/`#hide` blocks instead of clamping.
    pub strict_scopes: bool,
    /// Parse the generated function and check its free identifiers.
    pub verify_output: bool,
}

impl CompileOptions {
    /// Deep-merges `overrides` onto the defaults.
    pub fn from_json(overrides: &Value) -> Result<Self, CompilerError> {
        let mut merged = serde_json::to_value(Self::default())?;
        deep_merge(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    pub fn from_json_str(overrides: &str) -> Result<Self, CompilerError> {
        let value: Value = serde_json::from_str(overrides)?;
        Self::from_json(&value)
    }

    pub(crate) fn scope_policy(&self) -> ScopePolicy {
        if self.strict_scopes {
            ScopePolicy::Strict
        } else {
            ScopePolicy::Clamp
        }
    }

    pub fn should_minify(&self, source: &str) -> bool {
        self.htmlmin_enable || (self.htmlmin_multi_lines && source.contains(['\n', '\r']))
    }
}

fn deep_merge(target: &mut Value, source: &Value) {
    let Value::Object(source_map) = source else {
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, value) in source_map {
        match value {
            Value::Null => {}
            Value::Object(_) => match target_map.get_mut(key) {
                Some(existing) if existing.is_object() => deep_merge(existing, value),
                _ => {
                    let mut fresh = Value::Object(Map::new());
                    deep_merge(&mut fresh, value);
                    target_map.insert(key.clone(), fresh);
                }
            },
            _ => {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert!(!options.htmlmin_enable);
        assert!(!options.htmlmin_multi_lines);
        assert!(options.htmlmin.remove_comments);
        assert!(options.htmlmin.collapse_whitespace);
        assert!(!options.htmlmin.remove_attribute_quotes);
        assert!(!options.htmlmin.remove_optional_tags);
        assert_eq!(options.scope_policy(), ScopePolicy::Clamp);
    }

    #[test]
    fn test_nested_keys_fall_back_to_defaults() {
        let options = CompileOptions::from_json(&json!({
            "htmlminEnable": true,
            "htmlmin": { "removeAttributeQuotes": true }
        }))
        .unwrap();

        assert!(options.htmlmin_enable);
        assert!(options.htmlmin.remove_attribute_quotes);
        assert!(options.htmlmin.remove_comments);
        assert!(options.htmlmin.use_short_doctype);
    }

    #[test]
    fn test_explicit_keys_override_defaults() {
        let options = CompileOptions::from_json_str(
            r#"{"htmlmin": {"removeComments": false, "removeCommentsFromCDATA": false}}"#,
        )
        .unwrap();
        assert!(!options.htmlmin.remove_comments);
        assert!(!options.htmlmin.remove_comments_from_cdata);
    }

    #[test]
    fn test_unknown_minifier_keys_pass_through() {
        let options = CompileOptions::from_json(&json!({
            "htmlmin": { "keepClosingSlash": true }
        }))
        .unwrap();
        assert_eq!(
            options.htmlmin.extra.get("keepClosingSlash"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_null_keeps_default() {
        let options = CompileOptions::from_json(&json!({ "htmlmin": null })).unwrap();
        assert_eq!(options.htmlmin, MinifyOptions::default());
    }

    #[test]
    fn test_invalid_options_are_reported() {
        let err = CompileOptions::from_json(&json!({ "htmlminEnable": "yes" })).unwrap_err();
        assert_eq!(err.code, crate::error::ERR_OPTIONS);
    }

    #[test]
    fn test_should_minify() {
        let mut options = CompileOptions::default();
        assert!(!options.should_minify("a\nb"));

        options.htmlmin_multi_lines = true;
        assert!(options.should_minify("a\nb"));
        assert!(options.should_minify("a\rb"));
        assert!(!options.should_minify("ab"));

        options.htmlmin_enable = true;
        assert!(options.should_minify("ab"));
    }
}
