//! Macro scopes
//!
//! A [`MacroScope`] maps case-insensitive macro names to lazily finalized
//! values, plus the set of nodes whose `Define` children already went into
//! this scope. Nested levels of the document get their own scope by cloning
//! the enclosing one; the clone owns independent copies of both tables, so a
//! child never leaks definitions or finalized values back into its parent.
//!
//! # Placeholders
//!
//! | Syntax   | Meaning |
//! |----------|---------|
//! | `{name}` | required, undefined is an error |
//! | `[name]` | optional, undefined expands to nothing |
//!
//! `name` is one or more word characters. Matching is left to right, not
//! nested and not overlapping.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::document::{Attr, Document, NodeId, Tag};
use crate::error::{MacroError, ResolveError};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(?P<required>\w+)\}|\[(?P<optional>\w+)\]")
            .expect("placeholder pattern is valid")
    })
}

/// The state of one macro
///
/// A value starts `Unresolved` with its raw text and moves to `Resolved`
/// exactly once, either when expansion first needs it or when it is
/// assigned directly. A resolved value can never change again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroValue {
    Unresolved(String),
    Resolved(String),
}

impl MacroValue {
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Raw text for unresolved values, final text otherwise
    pub fn text(&self) -> &str {
        match self {
            Self::Unresolved(text) | Self::Resolved(text) => text,
        }
    }
}

/// Branchable macro table
#[derive(Debug, Clone, Default)]
pub struct MacroScope {
    macros: HashMap<String, MacroValue>,
    contributed: HashSet<NodeId>,
}

impl MacroScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a child scope from the current state of this one
    pub fn branch(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MacroValue> {
        self.macros.get(&key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(&key(name))
    }

    /// Whether `node` already contributed its Defines to this scope
    pub fn has_contribution(&self, node: NodeId) -> bool {
        self.contributed.contains(&node)
    }

    /// Define (or redefine) a macro from raw text; last write wins
    pub fn define(&mut self, name: &str, raw: impl Into<String>) {
        self.macros
            .insert(key(name), MacroValue::Unresolved(raw.into()));
    }

    /// Set a macro's final value directly
    ///
    /// Fails with [`MacroError::Frozen`] if the value was already finalized,
    /// whether by an earlier assignment or by expansion.
    pub fn assign(&mut self, name: &str, value: impl Into<String>) -> Result<(), MacroError> {
        let value = value.into();
        match self.macros.get_mut(&key(name)) {
            Some(MacroValue::Resolved(_)) => Err(MacroError::Frozen(name.to_string())),
            Some(slot) => {
                *slot = MacroValue::Resolved(value);
                Ok(())
            }
            None => {
                self.macros.insert(key(name), MacroValue::Resolved(value));
                Ok(())
            }
        }
    }

    /// Add the direct `Define` children of `node`
    ///
    /// Each Define needs a non-empty `name` and a `value` attribute. A node
    /// may contribute to a given scope only once.
    pub fn add_defines(&mut self, doc: &Document, node: NodeId) -> Result<(), ResolveError> {
        if !self.contributed.insert(node) {
            return Err(ResolveError::DuplicateScopeContribution { node });
        }

        for define in doc.children_tagged(node, Tag::Define) {
            let name = match doc.attribute(define, Attr::Name) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    return Err(ResolveError::structural(
                        define,
                        "Define nodes must have a name",
                    ));
                }
            };
            let Some(value) = doc.attribute(define, Attr::Value) else {
                return Err(ResolveError::structural(
                    define,
                    "Define nodes must have a value",
                ));
            };
            self.define(name, value);
        }

        tracing::trace!(
            "Added macros of {} ({} defined)",
            doc.debug_name(node),
            self.macros.len()
        );
        Ok(())
    }

    /// Expand every placeholder in `text`
    ///
    /// Referenced macros that are still unresolved are expanded first and
    /// cached in this scope, so each one is computed at most once.
    pub fn expand(&mut self, text: &str) -> Result<String, MacroError> {
        let mut in_progress = Vec::new();
        self.expand_guarded(text, &mut in_progress)
    }

    /// `expand` for values that may be absent; `None` passes through
    pub fn expand_opt(&mut self, text: Option<&str>) -> Result<Option<String>, MacroError> {
        text.map(|text| self.expand(text)).transpose()
    }

    fn expand_guarded(
        &mut self,
        text: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<String, MacroError> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in placeholder_pattern().captures_iter(text) {
            let (name, required) = match (caps.name("required"), caps.name("optional")) {
                (Some(name), _) => (name.as_str(), true),
                (None, Some(name)) => (name.as_str(), false),
                (None, None) => continue,
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.lookup(name, required, in_progress)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);

        Ok(out)
    }

    fn lookup(
        &mut self,
        name: &str,
        required: bool,
        in_progress: &mut Vec<String>,
    ) -> Result<String, MacroError> {
        let key = key(name);
        let raw = match self.macros.get(&key) {
            Some(MacroValue::Resolved(value)) => return Ok(value.clone()),
            Some(MacroValue::Unresolved(raw)) => raw.clone(),
            None if required => return Err(MacroError::Undefined(name.to_string())),
            None => return Ok(String::new()),
        };

        if in_progress.contains(&key) {
            return Err(MacroError::Cycle(name.to_string()));
        }

        in_progress.push(key.clone());
        let value = self.expand_guarded(&raw, in_progress)?;
        in_progress.pop();

        self.macros.insert(key, MacroValue::Resolved(value.clone()));
        Ok(value)
    }
}

/// Macro names compare case-insensitively
fn key(name: &str) -> String {
    name.to_lowercase()
}
