//! Translation of router path templates into OpenAPI path templates.
//!
//! Router paths introduce a parameter with `:name`, optionally followed by a constraint pattern
//! in parentheses (`:id([0-9]+)`); a literal `)` inside the pattern is written `\)`. OpenAPI paths
//! use `{name}` and carry the constraint in the parameter schema instead.

use crate::openapi_builder::Parameter;
use crate::schema::Schema;
use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `:name` with an optional `(pattern)`; the pattern ends at the first unescaped `)`
static PARAMETER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":([A-Za-z0-9_]+)(?:\(((?:\\\)|[^)])*)\))?").expect("parameter regex is valid")
});

/// Patterns made only of identifier characters and `|` are enumerations
static ENUMERATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_|]+$").expect("enumeration regex is valid"));

/// A translated path together with the parameters found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedPath {
    /// Path in `{name}` syntax
    pub path: String,
    /// One descriptor per occurrence, in path order
    pub parameters: Vec<Parameter>,
}

/// Translates `:name(pattern)` parameters into `{name}` and derives their schemas.
///
/// ```
/// use controller_openapi::path_template::translate;
///
/// let translated = translate("/users/:id([0-9]+)/posts/:kind(draft|live)");
/// assert_eq!(translated.path, "/users/{id}/posts/{kind}");
/// assert_eq!(translated.parameters.len(), 2);
/// ```
pub fn translate(path: &str) -> TranslatedPath {
    let mut parameters = Vec::new();

    let translated = PARAMETER.replace_all(path, |caps: &regex::Captures| {
        let name = &caps[1];
        let pattern = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|pattern| !pattern.is_empty());
        parameters.push(path_parameter(name, pattern));
        format!("{{{}}}", name)
    });

    if !parameters.is_empty() {
        debug!("Translated {} -> {}", path, translated);
    }

    TranslatedPath {
        path: translated.into_owned(),
        parameters,
    }
}

/// Compiles a router path into an anchored regex matching concrete request paths.
///
/// `:name` matches one non-empty segment and `:name(pattern)` matches `pattern`, which may span
/// segments. The first occurrence of each name is captured under that name.
///
/// ```
/// use controller_openapi::path_template::template_regex;
///
/// let matcher = template_regex("/files/:id([0-9]+)/:rest(.*)").unwrap();
/// let caps = matcher.captures("/files/42/a/b.txt").unwrap();
/// assert_eq!(&caps["id"], "42");
/// assert_eq!(&caps["rest"], "a/b.txt");
/// assert!(!matcher.is_match("/files/x/a"));
/// ```
pub fn template_regex(path: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(path.len() + 2);
    let mut captured: Vec<&str> = Vec::new();
    let mut literal_start = 0;

    pattern.push('^');
    for caps in PARAMETER.captures_iter(path) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        pattern.push_str(&regex::escape(&path[literal_start..whole.start()]));

        let constraint = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|constraint| !constraint.is_empty())
            .unwrap_or("[^/]+");
        if captured.contains(&name.as_str()) {
            pattern.push_str(&format!("(?:{})", constraint));
        } else {
            captured.push(name.as_str());
            pattern.push_str(&format!("(?P<{}>{})", name.as_str(), constraint));
        }
        literal_start = whole.end();
    }
    pattern.push_str(&regex::escape(&path[literal_start..]));
    pattern.push('$');

    debug!("Route matcher for {}: {}", path, pattern);
    Regex::new(&pattern)
}

/// Builds the descriptor of one path parameter
fn path_parameter(name: &str, pattern: Option<&str>) -> Parameter {
    let mut schema = Schema::string();
    match pattern {
        Some(pattern) if ENUMERATION.is_match(pattern) => {
            schema.enum_values = Some(
                pattern
                    .split('|')
                    .map(|value| Value::String(value.to_string()))
                    .collect(),
            );
        }
        Some(pattern) => schema.pattern = Some(pattern.to_string()),
        None => {}
    }

    Parameter {
        name: name.to_string(),
        location: "path".to_string(),
        required: true,
        schema: Some(schema),
        description: None,
        extra: IndexMap::new(),
    }
}
