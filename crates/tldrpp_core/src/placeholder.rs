use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    File,
    Directory,
    Port,
    Number,
    Url,
    Ip,
    Username,
    Password,
    Email,
    Text,
}

impl PlaceholderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Port => "port",
            Self::Number => "number",
            Self::Url => "url",
            Self::Ip => "ip",
            Self::Username => "username",
            Self::Password => "password",
            Self::Email => "email",
            Self::Text => "text",
        }
    }
}

/// Name fragments checked in order against a lowercased placeholder name.
/// The first rule with a matching fragment decides the kind.
pub const KIND_RULES: &[(&[&str], PlaceholderKind)] = &[
    (&["file", "path"], PlaceholderKind::File),
    (&["dir", "directory"], PlaceholderKind::Directory),
    (&["port"], PlaceholderKind::Port),
    (&["num", "number", "count"], PlaceholderKind::Number),
    (&["url", "link"], PlaceholderKind::Url),
    (&["ip", "address"], PlaceholderKind::Ip),
    (&["user", "username"], PlaceholderKind::Username),
    (&["pass", "password"], PlaceholderKind::Password),
    (&["email"], PlaceholderKind::Email),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub kind: PlaceholderKind,
    pub description: String,
    pub default: String,
}

impl Placeholder {
    /// Placeholder with its kind inferred from `name` and no description or default.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: infer_type(&name),
            name,
            description: String::new(),
            default: String::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The literal `{{name}}` token this placeholder stands for.
    pub fn token(&self) -> String {
        format!("{OPEN}{}{CLOSE}", self.name)
    }
}

/// A `{{name}}` occurrence inside a template, as byte offsets into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub start: usize,
    pub end: usize,
    pub name: &'a str,
}

/// Every non-empty `{{...}}` token in `template`, left to right.
///
/// Tokens do not nest: the name runs verbatim up to the first `}}` after the
/// opening `{{`. An opening delimiter with no closing one ends the scan.
pub(crate) fn scan_tokens(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;
    while let Some(offset) = template[cursor..].find(OPEN) {
        let start = cursor + offset;
        let name_start = start + OPEN.len();
        let Some(close) = template[name_start..].find(CLOSE) else {
            break;
        };
        let name_end = name_start + close;
        let end = name_end + CLOSE.len();
        let name = &template[name_start..name_end];
        if !name.is_empty() {
            tokens.push(Token { start, end, name });
        }
        cursor = end;
    }
    tokens
}

/// Placeholders of `template` in first-occurrence order, one per distinct name.
pub fn extract(template: &str) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    scan_tokens(template)
        .into_iter()
        .filter(|token| seen.insert(token.name))
        .map(|token| Placeholder::new(token.name))
        .collect()
}

pub fn infer_type(name: &str) -> PlaceholderKind {
    let lowered = name.to_lowercase();
    KIND_RULES
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|fragment| lowered.contains(fragment)))
        .map(|(_, kind)| *kind)
        .unwrap_or(PlaceholderKind::Text)
}
