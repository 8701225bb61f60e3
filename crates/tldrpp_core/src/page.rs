//! Page model and the line parser that builds it from a cached document.
//!
//! A document is read line by line through a two-state automaton. Each
//! trimmed line is classified into a [`LineKind`], and [`transition`] maps the
//! current [`ParserState`] plus that kind to the next state and one
//! [`ParseAction`] applied to the page being built. Unknown lines are
//! ignored, so parsing never fails.

use serde::{Deserialize, Serialize};

use crate::placeholder::{self, Placeholder};

const TITLE_MARKER: &str = "# ";
const QUOTE_MARKER: &str = "> ";
const LIST_MARKER: &str = "- ";
const COMMAND_FENCE: char = '`';

/// One row of the catalog: a page identity without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub description: String,
    pub platform: String,
}

impl IndexEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            platform: platform.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Example {
    pub description: String,
    pub command_template: String,
    pub placeholders: Vec<Placeholder>,
}

impl Example {
    /// Example whose placeholders are extracted from `command_template`.
    pub fn new(description: impl Into<String>, command_template: impl Into<String>) -> Self {
        let command_template = command_template.into();
        Self {
            description: description.into(),
            placeholders: placeholder::extract(&command_template),
            command_template,
        }
    }

    /// Example with an explicit placeholder list, e.g. one carrying defaults.
    /// The caller keeps the list consistent with the template.
    pub fn with_placeholders(
        description: impl Into<String>,
        command_template: impl Into<String>,
        placeholders: Vec<Placeholder>,
    ) -> Self {
        Self {
            description: description.into(),
            command_template: command_template.into(),
            placeholders,
        }
    }

    fn pending(description: &str) -> Self {
        Self {
            description: description.to_string(),
            command_template: String::new(),
            placeholders: Vec::new(),
        }
    }

    fn set_command(&mut self, command_template: &str) {
        self.command_template = command_template.to_string();
        self.placeholders = placeholder::extract(command_template);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub name: String,
    pub description: String,
    pub platform: String,
    pub examples: Vec<Example>,
    pub raw_text: String,
}

impl Page {
    pub fn new(entry: &IndexEntry, examples: Vec<Example>) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.description.clone(),
            platform: entry.platform.clone(),
            examples,
            raw_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Outside,
    InExample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Title,
    Quote(&'a str),
    ListItem(&'a str),
    Command(&'a str),
    Blank,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAction<'a> {
    Ignore,
    SetDescription(&'a str),
    StartExample(&'a str),
    SetCommand(&'a str),
}

pub fn classify(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with(TITLE_MARKER) {
        return LineKind::Title;
    }
    if let Some(rest) = line.strip_prefix(QUOTE_MARKER) {
        return LineKind::Quote(rest);
    }
    if let Some(rest) = line.strip_prefix(LIST_MARKER) {
        return LineKind::ListItem(rest);
    }
    if line.len() >= 2
        && let Some(inner) = line
            .strip_prefix(COMMAND_FENCE)
            .and_then(|rest| rest.strip_suffix(COMMAND_FENCE))
    {
        return LineKind::Command(inner);
    }
    LineKind::Other
}

pub fn transition<'a>(state: ParserState, line: LineKind<'a>) -> (ParserState, ParseAction<'a>) {
    match (state, line) {
        (state, LineKind::Title) => (state, ParseAction::Ignore),
        (state, LineKind::Quote(text)) => (state, ParseAction::SetDescription(text)),
        (_, LineKind::ListItem(text)) => (ParserState::InExample, ParseAction::StartExample(text)),
        (ParserState::InExample, LineKind::Command(command)) => {
            (ParserState::InExample, ParseAction::SetCommand(command))
        }
        (ParserState::Outside, LineKind::Command(_)) => (ParserState::Outside, ParseAction::Ignore),
        (_, LineKind::Blank) => (ParserState::Outside, ParseAction::Ignore),
        (state, LineKind::Other) => (state, ParseAction::Ignore),
    }
}

/// Build a page from a cached document and its index entry. Never fails.
pub fn parse(raw_text: &str, entry: &IndexEntry) -> Page {
    let mut page = Page::new(entry, Vec::new());
    page.raw_text = raw_text.to_string();

    let mut state = ParserState::Outside;
    let mut pending: Option<Example> = None;

    for line in raw_text.lines() {
        let (next, action) = transition(state, classify(line));
        state = next;
        match action {
            ParseAction::Ignore => {}
            ParseAction::SetDescription(text) => page.description = text.to_string(),
            ParseAction::StartExample(text) => {
                if let Some(example) = pending.replace(Example::pending(text)) {
                    page.examples.push(example);
                }
            }
            ParseAction::SetCommand(command) => {
                if let Some(example) = pending.as_mut() {
                    example.set_command(command);
                }
            }
        }
    }

    if let Some(example) = pending {
        page.examples.push(example);
    }
    page
}
