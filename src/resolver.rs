//! Shortcut resolution
//!
//! Walks `Profile` -> `List` -> `Shortcut` and builds the macro scope of each
//! level on the way down:
//!
//! 1. Global scope: Defines of the document root
//! 2. Profile scope: branch of the global scope profile names were matched
//!    through + the profile's template chain macros
//! 3. List scope: branch of the profile scope, taken after the direct
//!    shortcuts were built, + the list's chain macros
//! 4. Shortcut scope: branch of the enclosing scope + the shortcut's chain macros
//!
//! Shortcuts defined directly in the profile (or anything it inherits) come
//! before shortcuts of its lists; each group keeps document order. Only the
//! first matching profile is ever visited.
//!
//! Nothing here mutates the document, and no state survives between calls
//! beyond the global scope built when the file is opened.

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, info};

use crate::document::{Attr, Document, NodeId, ParseError, Tag};
use crate::error::ResolveError;
use crate::launch::LaunchSpecification;
use crate::macros::MacroScope;
use crate::template::{
    add_chain_macros, attribute_value, chain_children, eq_ignore_case, property_value,
};

/// A shortcut candidate that has not been turned into a launch spec yet
#[derive(Debug, Clone)]
pub struct VirtualShortcut {
    /// Macro-expanded display name
    pub name: String,
    /// Profile or List where enumeration found the shortcut
    pub context: NodeId,
    /// The `Shortcut` element itself
    pub shortcut: NodeId,
    /// Scope valid inside the shortcut
    pub macros: MacroScope,
}

/// A loaded shortcuts document plus its global macro scope
#[derive(Debug, Clone)]
pub struct ShortcutFile {
    doc: Document,
    global: MacroScope,
}

impl ShortcutFile {
    /// Wrap an already parsed document
    pub fn new(doc: Document) -> Result<Self, LoadError> {
        let mut global = MacroScope::new();
        if let Err(source) = global.add_defines(&doc, doc.root()) {
            return Err(LoadError::Resolve {
                path: doc.node_path(source.node()),
                source,
            });
        }
        Ok(Self { doc, global })
    }

    /// Read and parse a shortcuts file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        info!("Loading shortcuts from {:?}", path.as_ref());
        Self::new(Document::load(path)?)
    }

    /// Parse shortcuts XML held in memory
    pub fn parse(xml: &str) -> Result<Self, LoadError> {
        Self::new(xml.parse()?)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn global_macros(&self) -> &MacroScope {
        &self.global
    }

    /// Lazily enumerate every virtual shortcut of the selected profile
    ///
    /// An empty `profile` selects the first profile in the document.
    pub fn virtual_shortcuts<'a>(&'a self, profile: &'a str) -> VirtualShortcuts<'a> {
        VirtualShortcuts {
            file: self,
            profile,
            started: false,
            profile_scope: None,
            lists: VecDeque::new(),
            batch: None,
            finished: false,
        }
    }

    /// Names of all shortcuts of a profile, for auto-complete
    pub fn shortcut_names<'a>(
        &'a self,
        profile: &'a str,
    ) -> impl Iterator<Item = Result<String, ResolveError>> + 'a {
        self.virtual_shortcuts(profile).map(|v| v.map(|v| v.name))
    }

    /// Names starting with `prefix`, ignoring case, in enumeration order
    pub fn complete(&self, profile: &str, prefix: &str) -> Result<Vec<String>, ResolveError> {
        let prefix = prefix.to_lowercase();
        let mut matches = Vec::new();
        for name in self.shortcut_names(profile) {
            let name = name?;
            if name.to_lowercase().starts_with(&prefix) {
                matches.push(name);
            }
        }
        Ok(matches)
    }

    /// Find one shortcut by name (case-insensitive) and materialize it
    ///
    /// `Ok(None)` means the profile or the shortcut does not exist.
    pub fn get_shortcut(
        &self,
        profile: &str,
        name: &str,
    ) -> Result<Option<LaunchSpecification>, ResolveError> {
        for candidate in self.virtual_shortcuts(profile) {
            let mut candidate = candidate?;
            if eq_ignore_case(&candidate.name, name) {
                return self.materialize(&mut candidate).map(Some);
            }
        }
        Ok(None)
    }

    /// Materialize every shortcut of a profile, in enumeration order
    pub fn shortcuts(
        &self,
        profile: &str,
    ) -> Result<Vec<(String, LaunchSpecification)>, ResolveError> {
        let mut out = Vec::new();
        for candidate in self.virtual_shortcuts(profile) {
            let mut candidate = candidate?;
            let spec = self.materialize(&mut candidate)?;
            out.push((candidate.name, spec));
        }
        Ok(out)
    }

    /// Turn a virtual shortcut into an executable path and argument string
    ///
    /// `Path` and `Params` are inherited properties: the first node of the
    /// shortcut's template chain that defines one supplies it.
    pub fn materialize(
        &self,
        shortcut: &mut VirtualShortcut,
    ) -> Result<LaunchSpecification, ResolveError> {
        let node = shortcut.shortcut;
        let executable =
            property_value(&self.doc, node, &mut shortcut.macros, Tag::Path)?.unwrap_or_default();
        let params =
            property_value(&self.doc, node, &mut shortcut.macros, Tag::Params)?.unwrap_or_default();

        if executable.is_empty() {
            return Err(ResolveError::structural(
                node,
                format!(
                    "No executable path was specified for shortcut \"{}\" in \"{}\"",
                    shortcut.name,
                    self.doc.debug_name(shortcut.context)
                ),
            ));
        }

        debug!("Materialized {} -> {}", shortcut.name, executable);
        Ok(LaunchSpecification::new(executable, params))
    }

    /// First `Profile` under the root matching `filter` (empty matches any)
    ///
    /// Names are expanded through `scope`, a per-enumeration copy of the
    /// global scope, so values finalized here carry into the profile scope.
    fn select_profile(
        &self,
        filter: &str,
        scope: &mut MacroScope,
    ) -> Result<Option<NodeId>, ResolveError> {
        for profile in self.doc.children_tagged(self.doc.root(), Tag::Profile) {
            if filter.is_empty() {
                return Ok(Some(profile));
            }
            let name = attribute_value(&self.doc, profile, scope, Attr::Name)?;
            if name.is_some_and(|name| eq_ignore_case(&name, filter)) {
                return Ok(Some(profile));
            }
        }
        Ok(None)
    }

    /// Build the virtual shortcut for one `Shortcut` element
    ///
    /// Nameless shortcuts (or names that expand to nothing) are skipped.
    fn virtual_shortcut(
        &self,
        context: NodeId,
        node: NodeId,
        outer: &mut MacroScope,
    ) -> Result<Option<VirtualShortcut>, ResolveError> {
        match self.doc.attribute(node, Attr::Name) {
            Some(raw) if !raw.is_empty() => {}
            _ => return Ok(None),
        }
        let name = attribute_value(&self.doc, node, outer, Attr::Name)?.unwrap_or_default();
        if name.is_empty() {
            return Ok(None);
        }

        let mut macros = outer.branch();
        add_chain_macros(&self.doc, node, &mut macros)?;

        Ok(Some(VirtualShortcut {
            name,
            context,
            shortcut: node,
            macros,
        }))
    }
}

/// Errors from [`ShortcutFile::load`] and [`ShortcutFile::parse`]
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A root-level Define is malformed; `path` locates it
    #[error("Error parsing XML node \"{path}\"")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },
}

/// Shortcut elements still to visit under one Profile or List
///
/// The scope is the enclosing scope itself, so names finalized while
/// building this batch stay cached for whatever branches from it later.
struct Batch {
    context: NodeId,
    scope: MacroScope,
    pending: VecDeque<NodeId>,
}

/// Lazy iterator returned by [`ShortcutFile::virtual_shortcuts`]
///
/// Work happens one step at a time as items are pulled: the profile is
/// selected on the first call, and each List's scope is built only when the
/// iterator reaches it. After an error the iterator is exhausted.
pub struct VirtualShortcuts<'a> {
    file: &'a ShortcutFile,
    profile: &'a str,
    started: bool,
    profile_scope: Option<MacroScope>,
    lists: VecDeque<NodeId>,
    batch: Option<Batch>,
    finished: bool,
}

impl VirtualShortcuts<'_> {
    /// Load the next batch; `Ok(false)` when there is nothing left
    fn advance(&mut self) -> Result<bool, ResolveError> {
        let doc = &self.file.doc;

        if !self.started {
            self.started = true;
            let mut global = self.file.global.branch();
            let Some(profile) = self.file.select_profile(self.profile, &mut global)? else {
                debug!("No profile matches {:?}", self.profile);
                return Ok(false);
            };
            debug!("Selected profile {}", doc.node_path(profile));

            let mut scope = global.branch();
            add_chain_macros(doc, profile, &mut scope)?;
            let shortcuts = chain_children(doc, profile, &mut scope, Tag::Shortcut)?;
            self.lists = chain_children(doc, profile, &mut scope, Tag::List)?.into();

            self.batch = Some(Batch {
                context: profile,
                scope,
                pending: shortcuts.into(),
            });
            return Ok(true);
        }

        let (Some(list), Some(profile_scope)) = (self.lists.pop_front(), &self.profile_scope)
        else {
            return Ok(false);
        };

        let mut scope = profile_scope.branch();
        add_chain_macros(doc, list, &mut scope)?;
        let shortcuts = chain_children(doc, list, &mut scope, Tag::Shortcut)?;
        self.batch = Some(Batch {
            context: list,
            scope,
            pending: shortcuts.into(),
        });
        Ok(true)
    }
}

impl Iterator for VirtualShortcuts<'_> {
    type Item = Result<VirtualShortcut, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(batch) = self.batch.as_mut() {
                while let Some(node) = batch.pending.pop_front() {
                    match self.file.virtual_shortcut(batch.context, node, &mut batch.scope) {
                        Ok(Some(shortcut)) => return Some(Ok(shortcut)),
                        Ok(None) => continue,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    }
                }
                // The profile batch is drained first; its scope becomes the
                // profile scope every List branches from
                if let Some(batch) = self.batch.take() {
                    if self.profile_scope.is_none() {
                        self.profile_scope = Some(batch.scope);
                    }
                }
            }

            match self.advance() {
                Ok(true) => continue,
                Ok(false) => self.finished = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
