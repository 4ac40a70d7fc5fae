//! Path template compilation.
//!
//! A template such as `/user/:id` is turned into an anchored regex with one named capture per
//! `:name` placeholder. The fragment used for a placeholder comes from the [`Patterns`] registry
//! (defaulting to [`DEFAULT_FRAGMENT`]), and the accepted `.ext` suffixes come from [`Formats`].
//!
//! Two modes exist:
//! - [`MatchMode::Full`]: end-anchored, used by leaf routes.
//! - [`MatchMode::Prefix`]: not end-anchored, used by router mounts so a whole subtree can be
//!   rejected with a single test.

use crate::error::BuildError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write;

/// Fragment used for placeholders without a registered pattern.
pub const DEFAULT_FRAGMENT: &str = "[A-Za-z0-9_-]+";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex must compile"));

/// A single path parameter, its placeholder text and the value captured for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    key: String,
    placeholder: String,
    value: Option<String>,
}

impl Param {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let placeholder = format!(":{key}");
        Self { key, placeholder, value: None }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// The captured value, `None` until a match filled it in
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }
}

/// Ordered list of [`Param`]s, unique by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a param unless one with the same key already exists
    pub fn add(&mut self, param: Param) {
        if !self.has(param.key()) {
            self.inner.push(param);
        }
    }

    pub fn find(&self, key: &str) -> Option<&Param> {
        self.inner.iter().find(|param| param.key == key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Value of the param, `None` when absent or not captured yet
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(Param::value)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if let Some(param) = self.inner.iter_mut().find(|param| param.key == key) {
            param.set(value);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.inner.iter()
    }

    /// Key/value map of the captured params
    pub fn to_map(&self) -> HashMap<String, String> {
        self.inner
            .iter()
            .filter_map(|param| param.value().map(|value| (param.key.clone(), value.to_string())))
            .collect()
    }
}

/// Collects every `:name` placeholder of `template`, in order of first appearance.
pub fn parse_params(template: &str) -> Params {
    let mut params = Params::new();
    for captures in PLACEHOLDER.captures_iter(template) {
        params.add(Param::new(&captures[1]));
    }
    params
}

/// Registry mapping a param name to the regex fragment it must match.
#[derive(Debug, Clone, Default)]
pub struct Patterns {
    inner: HashMap<String, String>,
}

impl Patterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fragment, rejecting it right away if it is not a valid regex
    pub fn set(&mut self, name: impl Into<String>, fragment: impl Into<String>) -> Result<(), BuildError> {
        let name = name.into();
        let fragment = fragment.into();
        if let Err(e) = Regex::new(&format!("^(?:{fragment})$")) {
            return Err(BuildError::invalid_fragment(name, fragment, e));
        }
        self.inner.insert(name, fragment);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Copies every entry of `other` over this registry
    pub fn extend(&mut self, other: &Patterns) {
        for (name, fragment) in &other.inner {
            self.inner.insert(name.clone(), fragment.clone());
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Ordered list of acceptable format suffixes, e.g. `json`, `xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formats {
    inner: Vec<String>,
}

impl Formats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, format: impl Into<String>) {
        let format = format.into();
        if !self.inner.contains(&format) {
            self.inner.push(format);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Formats {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut formats = Formats::new();
        for format in iter {
            formats.add(format);
        }
        formats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// anchored at both ends
    Full,
    /// anchored at the start only, ends on a segment boundary
    Prefix,
}

/// A template compiled into a matching regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    params: Params,
    mode: MatchMode,
}

impl CompiledPattern {
    pub fn compile(
        template: &str,
        patterns: &Patterns,
        formats: &Formats,
        mode: MatchMode,
    ) -> Result<Self, BuildError> {
        let params = parse_params(template);
        let source = build_source(template, patterns, formats, mode);
        let regex = Regex::new(&source).map_err(|e| BuildError::invalid_pattern(template, e))?;
        Ok(Self { template: template.to_string(), regex, params, mode })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// The declared params, values unset
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Tests `path` and, on success, returns every declared param with its captured value.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        let mut params = self.params.clone();
        for param in &mut params.inner {
            let value = captures.name(&param.key).map_or("", |m| m.as_str());
            param.set(value);
        }
        Some(params)
    }
}

fn normalize(template: &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    let trimmed = template.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") }
}

fn build_source(template: &str, patterns: &Patterns, formats: &Formats, mode: MatchMode) -> String {
    let template = normalize(template);
    if template.is_empty() {
        return "^.*".to_string();
    }

    let placeholders: Vec<_> = PLACEHOLDER.captures_iter(&template).collect();
    // the nearest scope wins: only the last occurrence of a name captures
    let mut last_index = HashMap::new();
    for (index, captures) in placeholders.iter().enumerate() {
        last_index.insert(captures[1].to_string(), index);
    }

    let mut source = String::from("^");
    let mut cursor = 0;
    for (index, captures) in placeholders.iter().enumerate() {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        source.push_str(&regex::escape(&template[cursor..whole.start()]));
        let name = name.as_str();
        let fragment = patterns.get(name).unwrap_or(DEFAULT_FRAGMENT);
        if last_index.get(name) == Some(&index) {
            let _ = write!(source, "(?P<{name}>{fragment})");
        } else {
            let _ = write!(source, "(?:{fragment})");
        }
        cursor = whole.end();
    }
    source.push_str(&regex::escape(&template[cursor..]));

    let is_root = template == "/";
    match mode {
        MatchMode::Full => {
            if !is_root {
                if formats.is_empty() {
                    source.push_str("(?:/)?");
                } else {
                    let alternatives = formats.iter().map(regex::escape).collect::<Vec<_>>().join("|");
                    let _ = write!(source, r"(?:\.(?:{alternatives}))?");
                }
            }
            source.push('$');
        }
        MatchMode::Prefix => {
            if !is_root {
                source.push_str("(?:[/.]|$)");
            }
        }
    }
    source
}

/// Replaces every `:name` placeholder of `template` with the value `value_of` yields for it.
///
/// Returns the name of the first placeholder without a value as the error.
pub(crate) fn fill_template<F>(template: &str, mut value_of: F) -> Result<String, String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut filled = String::with_capacity(template.len());
    let mut cursor = 0;
    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        filled.push_str(&template[cursor..whole.start()]);
        let value = value_of(name.as_str()).ok_or_else(|| name.as_str().to_string())?;
        filled.push_str(&value);
        cursor = whole.end();
    }
    filled.push_str(&template[cursor..]);
    Ok(filled)
}

/// Joins a mount prefix and a child segment with exactly one `/` between them.
pub(crate) fn join_paths(prefix: &str, segment: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let segment = segment.trim_matches('/');
    match (prefix.is_empty(), segment.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("/{segment}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{segment}"),
    }
}
