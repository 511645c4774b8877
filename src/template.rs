//! Template resolution
//!
//! Any Profile, List or Shortcut may name another node in its `inherits`
//! attribute. The template is looked up by its `name` attribute among the
//! requesting node's siblings first, then among the siblings of each ancestor
//! in turn, up to the document root. Following `inherits` repeatedly gives
//! the node's template chain: the node itself, its template, that template's
//! template, and so on.
//!
//! Attribute values read here (`inherits`, and the `name` of every candidate)
//! go through macro expansion in the caller's scope.

use std::collections::HashSet;

use tracing::debug;

use crate::document::{Attr, Document, NodeId, Tag};
use crate::error::ResolveError;
use crate::macros::MacroScope;

/// Macro-expanded attribute value; `None` when the attribute is absent
pub fn attribute_value(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
    attr: Attr,
) -> Result<Option<String>, ResolveError> {
    scope
        .expand_opt(doc.attribute(node, attr))
        .map_err(|e| ResolveError::macro_expansion(node, format!("attribute \"{attr}\""), e))
}

/// Whether the expanded attribute equals `expected`, ignoring case
pub fn attribute_matches(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
    attr: Attr,
    expected: &str,
) -> Result<bool, ResolveError> {
    Ok(attribute_value(doc, node, scope, attr)?
        .is_some_and(|value| eq_ignore_case(&value, expected)))
}

/// Case-insensitive comparison used for profile, shortcut and template names
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Find the node `node` inherits from
///
/// Returns `Ok(None)` when `node` has no `inherits` attribute.
pub fn resolve_template(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
) -> Result<Option<NodeId>, ResolveError> {
    let Some(template) = attribute_value(doc, node, scope, Attr::Inherits)? else {
        return Ok(None);
    };

    if !template.is_empty() {
        if let Some(start) = doc.parent(node) {
            if let Some(found) = find_template(doc, start, scope, &template)? {
                debug!(
                    "{} inherits {}",
                    doc.debug_name(node),
                    doc.node_path(found)
                );
                return Ok(Some(found));
            }
        }
    }

    Err(ResolveError::TemplateNotFound { node, template })
}

/// Scan the children of `start`, then of each ancestor, for a matching name
fn find_template(
    doc: &Document,
    start: NodeId,
    scope: &mut MacroScope,
    template: &str,
) -> Result<Option<NodeId>, ResolveError> {
    let mut level = Some(start);
    while let Some(current) = level {
        for candidate in doc.children(current) {
            if attribute_matches(doc, candidate, scope, Attr::Name, template)? {
                return Ok(Some(candidate));
            }
        }
        level = doc.parent(current);
    }
    Ok(None)
}

/// Lazy walk over a node's template chain
///
/// Yields the starting node first. Each further element is resolved only
/// when requested, so callers can stop at the first node that has what they
/// need. Revisiting a node ends the walk with [`ResolveError::TemplateCycle`].
pub struct TemplateChain<'a> {
    doc: &'a Document,
    scope: &'a mut MacroScope,
    start: Option<NodeId>,
    last: Option<NodeId>,
    visited: HashSet<NodeId>,
}

impl Iterator for TemplateChain<'_> {
    type Item = Result<NodeId, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.start.take() {
            self.visited.insert(start);
            self.last = Some(start);
            return Some(Ok(start));
        }

        let current = self.last.take()?;
        match resolve_template(self.doc, current, self.scope) {
            Ok(None) => None,
            Ok(Some(template)) if !self.visited.insert(template) => {
                Some(Err(ResolveError::TemplateCycle {
                    node: current,
                    template: self.doc.debug_name(template).to_string(),
                }))
            }
            Ok(Some(template)) => {
                self.last = Some(template);
                Some(Ok(template))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Template chain starting at `node`
pub fn template_chain<'a>(
    doc: &'a Document,
    node: NodeId,
    scope: &'a mut MacroScope,
) -> TemplateChain<'a> {
    TemplateChain {
        doc,
        scope,
        start: Some(node),
        last: None,
        visited: HashSet::new(),
    }
}

/// Add the macros of `node`'s whole template chain to `scope`
///
/// The deepest template goes in first and `node` itself last, so a node's
/// own Defines always shadow anything it inherits.
pub fn add_chain_macros(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
) -> Result<(), ResolveError> {
    let chain = template_chain(doc, node, scope).collect::<Result<Vec<_>, _>>()?;
    for &link in chain.iter().rev() {
        scope.add_defines(doc, link)?;
    }
    Ok(())
}

/// Direct children tagged `tag` of every node in the template chain
pub fn chain_children(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
    tag: Tag,
) -> Result<Vec<NodeId>, ResolveError> {
    let mut found = Vec::new();
    for link in template_chain(doc, node, scope) {
        found.extend(doc.children_tagged(link?, tag));
    }
    Ok(found)
}

/// Expanded text of an inheritable property element (`Path`, `Params`)
///
/// The first node in the chain that has a direct `tag` child supplies the
/// raw text; later templates are never consulted.
pub fn property_value(
    doc: &Document,
    node: NodeId,
    scope: &mut MacroScope,
    tag: Tag,
) -> Result<Option<String>, ResolveError> {
    let mut raw = None;
    for link in template_chain(doc, node, scope) {
        if let Some(child) = doc.first_child_tagged(link?, tag) {
            raw = Some(doc.inner_text(child));
            break;
        }
    }

    scope
        .expand_opt(raw.as_deref())
        .map_err(|e| ResolveError::macro_expansion(node, format!("property \"{tag}\""), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        xml.parse().unwrap()
    }

    fn find(doc: &Document, path: &str) -> NodeId {
        let mut stack = vec![doc.root()];
        while let Some(id) = stack.pop() {
            if doc.node_path(id) == path {
                return id;
            }
            stack.extend(doc.children(id));
        }
        panic!("no node at {path}");
    }

    const DOC: &str = r#"<Shortcuts>
        <Shortcut name="Root"><Define name="m" value="root"/><Path>root.exe</Path></Shortcut>
        <Profile name="P">
            <Shortcut name="Mid" inherits="root"><Define name="m" value="mid"/></Shortcut>
            <List name="L">
                <Shortcut name="Leaf" inherits="MID"><Define name="own" value="leaf"/></Shortcut>
            </List>
        </Profile>
    </Shortcuts>"#;

    #[test]
    fn test_resolve_template_walks_up_ancestors() {
        let doc = parse(DOC);
        let leaf = find(&doc, "Shortcuts.P.L.Leaf");
        let mut scope = MacroScope::new();

        let mid = resolve_template(&doc, leaf, &mut scope).unwrap().unwrap();
        assert_eq!(doc.node_path(mid), "Shortcuts.P.Mid");
        let root = resolve_template(&doc, mid, &mut scope).unwrap().unwrap();
        assert_eq!(doc.node_path(root), "Shortcuts.Root");
        assert_eq!(resolve_template(&doc, root, &mut scope).unwrap(), None);
    }

    #[test]
    fn test_template_chain_order() {
        let doc = parse(DOC);
        let leaf = find(&doc, "Shortcuts.P.L.Leaf");
        let mut scope = MacroScope::new();
        let names: Vec<String> = template_chain(&doc, leaf, &mut scope)
            .map(|id| doc.debug_name(id.unwrap()).to_string())
            .collect();
        assert_eq!(names, vec!["Leaf", "Mid", "Root"]);
    }

    #[test]
    fn test_own_macros_take_precedence() {
        let doc = parse(DOC);
        let leaf = find(&doc, "Shortcuts.P.L.Leaf");
        let mut scope = MacroScope::new();
        add_chain_macros(&doc, leaf, &mut scope).unwrap();
        assert_eq!(scope.expand("{m}-{own}").unwrap(), "mid-leaf");
    }

    #[test]
    fn test_property_inherited_from_template() {
        let doc = parse(DOC);
        let leaf = find(&doc, "Shortcuts.P.L.Leaf");
        let mut scope = MacroScope::new();
        assert_eq!(
            property_value(&doc, leaf, &mut scope, Tag::Path).unwrap(),
            Some("root.exe".to_string())
        );
        assert_eq!(property_value(&doc, leaf, &mut scope, Tag::Params).unwrap(), None);
    }

    #[test]
    fn test_missing_and_empty_template() {
        let doc = parse(r#"<R><Shortcut name="a" inherits="Base"/><Shortcut name="b" inherits=""/></R>"#);
        let a = find(&doc, "R.a");
        let err = resolve_template(&doc, a, &mut MacroScope::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::TemplateNotFound {
                node: a,
                template: "Base".to_string()
            }
        );

        let b = find(&doc, "R.b");
        assert!(matches!(
            resolve_template(&doc, b, &mut MacroScope::new()),
            Err(ResolveError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_inherits_is_macro_expanded() {
        let doc = parse(r#"<R><Shortcut name="Base"/><Shortcut name="a" inherits="{which}"/></R>"#);
        let a = find(&doc, "R.a");
        let mut scope = MacroScope::new();
        scope.define("which", "base");
        let found = resolve_template(&doc, a, &mut scope).unwrap();
        assert_eq!(found, Some(find(&doc, "R.Base")));

        let err = resolve_template(&doc, a, &mut MacroScope::new()).unwrap_err();
        assert_eq!(err.undefined_macro(), Some("which"));
    }

    #[test]
    fn test_cycles_fail_fast() {
        let doc = parse(r#"<R><Shortcut name="a" inherits="b"/><Shortcut name="b" inherits="a"/></R>"#);
        let a = find(&doc, "R.a");
        let mut scope = MacroScope::new();
        let result: Result<Vec<_>, _> = template_chain(&doc, a, &mut scope).collect();
        assert!(matches!(result, Err(ResolveError::TemplateCycle { .. })));
        assert!(matches!(
            add_chain_macros(&doc, a, &mut MacroScope::new()),
            Err(ResolveError::TemplateCycle { .. })
        ));

        let doc = parse(r#"<R><Shortcut name="self" inherits="self"/></R>"#);
        let s = find(&doc, "R.self");
        assert!(add_chain_macros(&doc, s, &mut MacroScope::new()).is_err());
    }

    #[test]
    fn test_chain_is_lazy() {
        let doc = parse(r#"<R><Shortcut name="a" inherits="nowhere"><Path>a.exe</Path></Shortcut></R>"#);
        let a = find(&doc, "R.a");
        let mut scope = MacroScope::new();

        let mut chain = template_chain(&doc, a, &mut scope);
        assert_eq!(chain.next(), Some(Ok(a)));
        assert!(matches!(
            chain.next(),
            Some(Err(ResolveError::TemplateNotFound { .. }))
        ));
        assert_eq!(chain.next(), None);

        // The broken template is never resolved when the node has the property itself
        assert_eq!(
            property_value(&doc, a, &mut scope, Tag::Path).unwrap(),
            Some("a.exe".to_string())
        );
    }

    #[test]
    fn test_chain_children_collects_from_templates() {
        let doc = parse(r#"<R>
            <Profile name="Base"><Shortcut name="x"/><List name="l1"/></Profile>
            <Profile name="Dev" inherits="Base"><Shortcut name="y"/><List name="l2"/></Profile>
        </R>"#);
        let dev = find(&doc, "R.Dev");
        let mut scope = MacroScope::new();
        let names: Vec<&str> = chain_children(&doc, dev, &mut scope, Tag::Shortcut)
            .unwrap()
            .into_iter()
            .map(|id| doc.debug_name(id))
            .collect();
        assert_eq!(names, vec!["y", "x"]);
    }
}
