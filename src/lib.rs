//! Hotcuts Library
//!
//! Resolves named program shortcuts from a hierarchical, template-based XML
//! shortcuts file: profiles, lists and shortcuts that inherit from each other
//! and share layered `{macro}` definitions.

pub mod cli;
pub mod document;
pub mod error;
pub mod executor;
pub mod launch;
pub mod macros;
pub mod resolver;
pub mod settings;
pub mod template;

// Re-export main types for convenience
pub use document::{Attr, Document, NodeId, ParseError, Tag};
pub use error::{HotcutsError, MacroError, ResolveError, Result};
pub use executor::{
    complete, enumerate_names, execute_file_system, execute_shortcut, resolve, run_input,
    select_profile, ShortcutParams,
};
pub use launch::{LaunchRequest, LaunchSpecification, ProcessLauncher, SystemLauncher};
pub use macros::{MacroScope, MacroValue};
pub use resolver::{LoadError, ShortcutFile, VirtualShortcut, VirtualShortcuts};
pub use settings::AppSettings;
pub use template::{add_chain_macros, resolve_template, template_chain, TemplateChain};
