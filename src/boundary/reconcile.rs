//! Reconciler - Grow, shrink and reorder tree nodes to match new definitions.
//!
//! For one parent node, the previous children are matched against the new
//! child definitions:
//!
//! 1. Keyed definitions match the unused old child with the same key and a
//!    compatible definition. Unkeyed ones match the first unused compatible
//!    unkeyed child (or only the one at the same position when
//!    `reuse_sibling_tags` is off).
//! 2. Unmatched old children are removed: their surface roots get `remove`
//!    infos, their boundaries are destroyed and nested hosts detached.
//! 3. New children are walked in order. Fresh nodes get `create` infos (parent
//!    before children); matched nodes get `move` when they went before an
//!    already placed sibling, and `refresh` when their content changed.
//!
//! Infos are collected in tree order. The apply layer relies on that order to
//! place each surface node after its previous sibling.

use tracing::debug;

use crate::equality::{is_changed, CompareMode, Value};
use crate::host::{Host, HostSettings, WeakHost};
use crate::surface::{Refresh, RenderInfo};
use crate::tree::{enumerate_dom_roots, find_nodes, NodeKind, TreeNode};
use crate::types::NodeTypes;

use super::def::{Def, DefKind};
use super::source::Boundary;

/// Output of one update pass.
pub(crate) struct RenderPass<'a> {
    /// Boundaries rendered in this pass remember its id.
    pub(crate) id: u64,
    pub(crate) host: WeakHost,
    pub(crate) settings: &'a HostSettings,
    pub(crate) infos: Vec<RenderInfo>,
    /// Nested hosts attached or detached during the pass.
    pub(crate) hosts: Vec<Host>,
}

impl<'a> RenderPass<'a> {
    pub(crate) fn new(id: u64, host: WeakHost, settings: &'a HostSettings) -> Self {
        Self {
            id,
            host,
            settings,
            infos: Vec::new(),
            hosts: Vec::new(),
        }
    }
}

enum Step {
    Create(Def),
    Update { def: Def, moved: bool },
}

/// Reconcile `parent`'s children against `defs`.
pub(crate) fn reconcile_children(
    parent: &TreeNode,
    defs: Vec<Def>,
    source: Option<&Boundary>,
    pass: &mut RenderPass<'_>,
) {
    let old = parent.children();
    let old_defs: Vec<Option<Def>> = old.iter().map(TreeNode::def).collect();
    let mut used = vec![false; old.len()];

    let matches: Vec<Option<usize>> = defs
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let found = find_match(def, index, &old_defs, &used, pass.settings.reuse_sibling_tags);
            if let Some(i) = found {
                used[i] = true;
            }
            found
        })
        .collect();

    for (node, _) in old.iter().zip(&used).filter(|(_, used)| !**used) {
        remove_subtree(node, pass);
    }

    let mut nodes = Vec::with_capacity(defs.len());
    let mut steps = Vec::with_capacity(defs.len());
    let mut max_old: Option<usize> = None;
    for (def, found) in defs.into_iter().zip(matches) {
        match found {
            Some(i) => {
                let moved = max_old.is_some_and(|max| i < max);
                max_old = max_old.max(Some(i));
                nodes.push(old[i].clone());
                steps.push(Step::Update { def, moved });
            }
            None => {
                nodes.push(TreeNode::new(initial_kind(&def), source));
                steps.push(Step::Create(def));
            }
        }
    }
    parent.set_children(nodes.clone());

    for (node, step) in nodes.iter().zip(steps) {
        match step {
            Step::Create(def) => create_node(node, def, source, pass),
            Step::Update { def, moved } => update_node(node, def, moved, source, pass),
        }
    }
}

fn find_match(
    def: &Def,
    index: usize,
    old_defs: &[Option<Def>],
    used: &[bool],
    reuse_sibling_tags: bool,
) -> Option<usize> {
    let candidate = |i: usize| !used[i] && old_defs[i].as_ref().is_some_and(|old| old.is_compatible(def));
    if def.key.is_some() || reuse_sibling_tags {
        (0..old_defs.len()).find(|&i| candidate(i))
    } else {
        (index < old_defs.len() && candidate(index)).then_some(index)
    }
}

fn initial_kind(def: &Def) -> NodeKind {
    match &def.kind {
        DefKind::Element { .. } => NodeKind::DomElement,
        DefKind::Content(_) => NodeKind::DomContent,
        // Boundaries need their anchor first; the kind is swapped right after.
        DefKind::Fragment | DefKind::Boundary { .. } => NodeKind::Pass,
        DefKind::Host(host) => NodeKind::Host(host.clone()),
    }
}

/// The definition kept on the node: children live in the tree itself.
fn shallow(def: &Def) -> Def {
    Def {
        kind: def.kind.clone(),
        key: def.key.clone(),
        children: Vec::new(),
    }
}

fn create_node(node: &TreeNode, def: Def, source: Option<&Boundary>, pass: &mut RenderPass<'_>) {
    node.set_def(Some(shallow(&def)));
    match def.kind {
        DefKind::Element { .. } => {
            pass.infos.push(RenderInfo::create(node.clone()));
            reconcile_children(node, def.children, source, pass);
        }
        DefKind::Content(_) => pass.infos.push(RenderInfo::create(node.clone())),
        DefKind::Fragment => reconcile_children(node, def.children, source, pass),
        DefKind::Boundary { component, props } => {
            let boundary = Boundary::new(pass.host.clone(), component, props, def.children);
            boundary.set_anchor(node);
            boundary.set_contexts(source.map_or_else(Value::empty_mapping, Boundary::contexts));
            node.set_kind(NodeKind::Boundary(boundary.clone()));
            boundary.render(pass);
        }
        DefKind::Host(host) => {
            host.grounded_tree().set_parent(Some(node));
            pass.hosts.push(host);
        }
    }
}

fn update_node(
    node: &TreeNode,
    def: Def,
    moved: bool,
    source: Option<&Boundary>,
    pass: &mut RenderPass<'_>,
) {
    let old = node.def();
    node.set_def(Some(shallow(&def)));
    match def.kind {
        DefKind::Element { props, .. } => {
            let refresh = !pass.settings.pre_equal_check_dom_props
                || old
                    .as_ref()
                    .is_none_or(|old| is_changed(&old.props(), &props, CompareMode::Shallow.depth()));
            push_info(node, moved, refresh, pass);
            reconcile_children(node, def.children, source, pass);
        }
        DefKind::Content(text) => {
            let refresh = old.as_ref().and_then(Def::text_content) != Some(&*text);
            push_info(node, moved, refresh, pass);
        }
        DefKind::Fragment => {
            if moved {
                push_moves(node, pass);
            }
            reconcile_children(node, def.children, source, pass);
        }
        DefKind::Boundary { props, .. } => {
            if moved {
                push_moves(node, pass);
            }
            if let Some(boundary) = node.boundary() {
                let contexts = source.map_or_else(Value::empty_mapping, Boundary::contexts);
                if boundary.receive(props, def.children, contexts, pass.settings) {
                    boundary.render(pass);
                }
            }
        }
        DefKind::Host(_) => {
            if moved {
                push_moves(node, pass);
            }
        }
    }
}

fn push_info(node: &TreeNode, moved: bool, refresh: bool, pass: &mut RenderPass<'_>) {
    if !moved && !refresh {
        return;
    }
    pass.infos.push(RenderInfo {
        tree_node: node.clone(),
        create: false,
        remove: false,
        move_node: moved,
        refresh: refresh.then_some(Refresh::Changed),
    });
}

fn push_moves(node: &TreeNode, pass: &mut RenderPass<'_>) {
    pass.infos.extend(
        enumerate_dom_roots(node, true)
            .into_iter()
            .map(RenderInfo::moved),
    );
}

/// Remove `node` and everything below it.
fn remove_subtree(node: &TreeNode, pass: &mut RenderPass<'_>) {
    pass.infos.extend(
        enumerate_dom_roots(node, false)
            .into_iter()
            .map(RenderInfo::remove),
    );

    let mut doomed = vec![node.clone()];
    doomed.extend(find_nodes(node, NodeTypes::BOUNDARY | NodeTypes::HOST, 0, false, None));
    for tree_node in &doomed {
        if let Some(boundary) = tree_node.boundary() {
            boundary.destroy();
        }
        if let Some(host) = tree_node.host() {
            host.grounded_tree().set_parent(None);
            pass.hosts.push(host);
        }
    }
    node.set_parent(None);

    if pass.settings.dev_log_clean_up {
        debug!(node = node.id(), torn_down = doomed.len(), "removed subtree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DomNode;

    fn setup() -> (TreeNode, HostSettings) {
        let root = TreeNode::new_root(Some(DomNode::element("body")));
        (root, HostSettings::default())
    }

    fn run(root: &TreeNode, defs: Vec<Def>, settings: &HostSettings) -> Vec<RenderInfo> {
        let mut pass = RenderPass::new(1, WeakHost::default(), settings);
        reconcile_children(root, defs, None, &mut pass);
        pass.infos
    }

    fn keyed(key: &str) -> Def {
        Def::element("li", Value::Null).with_key(key)
    }

    #[test]
    fn test_creates_parent_first() {
        let (root, settings) = setup();
        let infos = run(
            &root,
            vec![Def::element("div", Value::Null).with_child(Def::text("hi"))],
            &settings,
        );
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|i| i.create));
        assert_eq!(infos[0].tree_node.node_type(), crate::types::NodeType::DomElement);
        assert_eq!(infos[1].tree_node.node_type(), crate::types::NodeType::DomContent);
    }

    #[test]
    fn test_unchanged_rerender_emits_nothing() {
        let (root, settings) = setup();
        let props = Value::mapping([("class", Value::from("a"))]);
        run(&root, vec![Def::element("div", props.clone()).with_child(Def::text("x"))], &settings);
        let infos = run(
            &root,
            vec![Def::element("div", Value::mapping([("class", Value::from("a"))])).with_child(Def::text("x"))],
            &settings,
        );
        assert!(infos.is_empty());
    }

    #[test]
    fn test_text_change_refreshes() {
        let (root, settings) = setup();
        run(&root, vec![Def::text("a")], &settings);
        let first = root.children()[0].clone();
        let infos = run(&root, vec![Def::text("b")], &settings);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].refresh, Some(Refresh::Changed));
        assert!(infos[0].tree_node.ptr_eq(&first));
    }

    #[test]
    fn test_keyed_reorder_moves() {
        let (root, settings) = setup();
        run(&root, vec![keyed("a"), keyed("b"), keyed("c")], &settings);
        let before = root.children();

        let infos = run(&root, vec![keyed("c"), keyed("a"), keyed("b")], &settings);
        let after = root.children();
        assert!(after[0].ptr_eq(&before[2]));
        assert!(after[1].ptr_eq(&before[0]));

        // "c" stays, "a" and "b" move after it.
        let moved: Vec<_> = infos.iter().filter(|i| i.move_node).map(|i| i.tree_node.clone()).collect();
        assert_eq!(moved, vec![before[0].clone(), before[1].clone()]);
        assert!(infos.iter().all(|i| !i.create && !i.remove));
    }

    #[test]
    fn test_incompatible_replaces() {
        let (root, settings) = setup();
        run(&root, vec![Def::element("div", Value::Null)], &settings);
        let old = root.children()[0].clone();

        let infos = run(&root, vec![Def::element("span", Value::Null)], &settings);
        assert_eq!(infos.len(), 2);
        assert!(infos[0].remove && infos[0].tree_node.ptr_eq(&old));
        assert!(infos[1].create);
        assert!(old.parent().is_none());
    }
}
