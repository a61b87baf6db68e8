//! Endpoint templating
//!
//! Endpoints may contain `{name}` or `{name:transform}` placeholders. Names are
//! either positional (`{0}`, `{1}`, ... filled from an ordered id list) or
//! named (`{endpoint}`). Unknown placeholders resolve to an empty string.

use std::collections::BTreeMap;

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Values available to a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams {
    values: BTreeMap<String, String>,
}

impl TemplateParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional parameters `{0}`, `{1}`, ... from an ordered id list
    pub fn from_values(values: &[Value]) -> Self {
        let mut params = Self::new();
        for (index, value) in values.iter().enumerate() {
            if let Some(text) = value_to_path(value) {
                params.values.insert(index.to_string(), text);
            }
        }
        params
    }

    /// Add a named parameter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Substitute every placeholder in `template`
pub fn replace_template(template: &str, params: &TemplateParams) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let inner = &caps[1];
            let (name, transform) = match inner.split_once(':') {
                Some((name, transform)) => (name, Some(transform)),
                None => (inner, None),
            };

            match params.get(name) {
                Some(value) => match transform {
                    Some(transform) => apply_transform(transform, value),
                    None => value.to_string(),
                },
                None => String::new(),
            }
        })
        .into_owned()
}

/// Apply a named string-case transform. Unknown transforms return the value unchanged.
pub fn apply_transform(transform: &str, value: &str) -> String {
    match transform {
        "snake" => value.to_case(Case::Snake),
        "camel" => value.to_case(Case::Camel),
        "studly" | "pascal" => value.to_case(Case::Pascal),
        "kebab" | "slug" => value.to_case(Case::Kebab),
        "title" => value.to_case(Case::Title),
        "lower" => value.to_lowercase(),
        "upper" => value.to_uppercase(),
        "plural" => pluralize(value),
        "singular" => singularize(value),
        _ => value.to_string(),
    }
}

/// Render a JSON scalar as a path segment
pub fn value_to_path(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Naive English pluralization, good enough for resource names
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();

    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return format!("{}ies", &word[..word.len() - 1]);
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

/// Inverse of [`pluralize`]
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }

    if ["ses", "xes", "zes", "ches", "shes"].iter().any(|suffix| lower.ends_with(suffix)) {
        return word[..word.len() - 2].to_string();
    }

    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

/// Default endpoint for an entity name.
///
/// The name is pluralized, then every capitalised word boundary becomes a
/// nested path segment with a positional placeholder, so `UserPost` maps to
/// `user/{0}/posts`.
pub fn default_endpoint(entity_name: &str) -> String {
    let plural = pluralize(entity_name);
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in plural.chars().filter(|c| !c.is_whitespace()) {
        if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut endpoint = String::new();
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            endpoint.push_str(&format!("/{{{}}}/", index - 1));
        }
        endpoint.push_str(word);
    }
    endpoint
}
