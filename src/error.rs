//! Error handling module for hotcuts
//!
//! Two layers, both built with thiserror:
//! - [`ResolveError`] / [`MacroError`] are raised by the resolution engine and
//!   carry the [`NodeId`] of the offending element.
//! - [`HotcutsError`] is what callers see. Document errors are surfaced with
//!   the dotted node path (`Shortcuts.Dev.Editor`) so every failure can be
//!   traced back to a location in the shortcuts file.
//!
//! "Profile not found" and "shortcut not found" are not errors; lookups return
//! `Ok(None)` for those.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::{Document, NodeId, ParseError};

/// Failures while expanding `{macro}` / `[macro]` placeholders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    /// A required `{name}` reference with no definition in scope
    #[error("Macro \"{0}\" is undefined")]
    Undefined(String),

    /// Direct assignment to a macro whose value is already final
    #[error("Cannot change macro \"{0}\" after it has been finalized")]
    Frozen(String),

    /// A macro whose value refers back to itself
    #[error("Macro \"{0}\" references itself")]
    Cycle(String),
}

/// Failures raised while walking the document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Document shape is wrong (Define without name/value, Shortcut without Path)
    #[error("{message}")]
    Structural { node: NodeId, message: String },

    /// Macro expansion failed for an attribute or property of `node`
    #[error("Could not expand macro value for {what}")]
    Macro {
        node: NodeId,
        what: String,
        #[source]
        source: MacroError,
    },

    /// `inherits` names a node that exists nowhere up the ancestor spine
    #[error("Could not find template \"{template}\"")]
    TemplateNotFound { node: NodeId, template: String },

    /// The same node contributed its Defines twice to one scope
    #[error("Attempted to add a node's macros twice")]
    DuplicateScopeContribution { node: NodeId },

    /// A template chain loops back onto a node it already visited
    #[error("Template \"{template}\" is inherited in a cycle")]
    TemplateCycle { node: NodeId, template: String },
}

impl ResolveError {
    pub fn structural(node: NodeId, message: impl Into<String>) -> Self {
        Self::Structural {
            node,
            message: message.into(),
        }
    }

    pub fn macro_expansion(node: NodeId, what: impl Into<String>, source: MacroError) -> Self {
        Self::Macro {
            node,
            what: what.into(),
            source,
        }
    }

    /// The element this error points at
    pub fn node(&self) -> NodeId {
        match self {
            Self::Structural { node, .. }
            | Self::Macro { node, .. }
            | Self::TemplateNotFound { node, .. }
            | Self::DuplicateScopeContribution { node }
            | Self::TemplateCycle { node, .. } => *node,
        }
    }

    /// Name of the undefined macro, if this is an undefined-macro failure
    pub fn undefined_macro(&self) -> Option<&str> {
        match self {
            Self::Macro {
                source: MacroError::Undefined(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

/// Main error type for hotcuts
#[derive(Error, Debug)]
pub enum HotcutsError {
    /// A resolution error, located by its dotted node path
    #[error("Error parsing XML node \"{path}\"")]
    Document {
        path: String,
        #[source]
        source: ResolveError,
    },

    /// The shortcuts file could not be read or is not well-formed XML
    #[error("Could not load shortcuts file {file:?}")]
    Load {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The process launcher failed to start the resolved program
    #[error("Could not start process \"{executable}\"")]
    Launch {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The profile selector program failed
    #[error("Could not execute profile selector {selector:?}: {message}")]
    ProfileSelector { selector: PathBuf, message: String },
}

/// Result type alias for hotcuts operations
pub type Result<T> = std::result::Result<T, HotcutsError>;

impl HotcutsError {
    /// Attach the dotted node path of the failing element
    pub fn document(doc: &Document, source: ResolveError) -> Self {
        Self::Document {
            path: doc.node_path(source.node()),
            source,
        }
    }

    pub fn load(file: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Load {
            file: file.into(),
            source,
        }
    }

    pub fn launch(executable: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            executable: executable.into(),
            source,
        }
    }

    pub fn profile_selector(selector: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProfileSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// The engine error underneath, if any
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Document { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Dotted path of the failing node, for document errors
    pub fn node_path(&self) -> Option<&str> {
        match self {
            Self::Document { path, .. } => Some(path),
            _ => None,
        }
    }
}
