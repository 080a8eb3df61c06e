//! Tree walk shared by comparison, merge and sync.
//!
//! Produces one [`DiffPoint`] per path where the two sides disagree: a leaf
//! with different values, a leaf on one side only, or a structural mismatch
//! (container on one side, leaf on the other). Matching containers are
//! descended into; nothing is reported for paths that agree.

use crate::error::MergeError;
use crate::tree::ComponentTree;
use contextsync_container::{ComponentRef, ContextContainer, ContextItem, Node};
use contextsync_types::{ComponentKey, DotPath, Timestamps};
use serde_json::Value;

/// A `component.path` restriction parsed from `single_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scope {
    pub component: ComponentKey,
    pub path: Option<DotPath>,
}

pub(crate) fn parse_scope(single_item: Option<&str>) -> Result<Option<Scope>, MergeError> {
    let Some(raw) = single_item else {
        return Ok(None);
    };
    let invalid = || MergeError::InvalidPath(raw.to_string());
    let path = DotPath::parse(raw).map_err(|_| invalid())?;
    let component = path.first().parse::<ComponentKey>().map_err(|_| invalid())?;
    Ok(Some(Scope {
        component,
        path: path.rest(),
    }))
}

/// One disagreeing path.
#[derive(Debug, Clone)]
pub(crate) struct DiffPoint {
    /// `None` only for standalone container comparisons.
    pub component: Option<ComponentKey>,
    /// Path inside the component; `None` addresses the component root.
    pub path: Option<DotPath>,
    pub source: Option<Node>,
    pub target: Option<Node>,
    /// At least one side was found inside a leaf's JSON payload, so writes
    /// must go through `set_item` rather than `set_node`.
    pub within_leaf: bool,
}

impl DiffPoint {
    pub fn full_path(&self) -> String {
        match (&self.component, &self.path) {
            (Some(c), Some(p)) => format!("{c}.{p}"),
            (Some(c), None) => c.to_string(),
            (None, Some(p)) => p.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }
}

/// Walks the selected components of both trees.
pub(crate) fn diff_trees<S, T>(
    source: &S,
    target: &T,
    components: &[ComponentKey],
    scope: Option<&Scope>,
) -> Vec<DiffPoint>
where
    S: ComponentTree + ?Sized,
    T: ComponentTree + ?Sized,
{
    let mut out = Vec::new();
    for &key in components {
        if scope.is_some_and(|s| s.component != key) {
            continue;
        }
        let s = source.component(key);
        let t = target.component(key);
        match scope.and_then(|s| s.path.as_ref()) {
            None => diff_whole(key, s, t, &mut out),
            Some(path) => diff_scoped(key, s, t, path, &mut out),
        }
    }
    out
}

/// Walks two standalone containers; points carry no component.
pub(crate) fn diff_container_pair(
    source: &ContextContainer,
    target: &ContextContainer,
) -> Vec<DiffPoint> {
    let mut out = Vec::new();
    diff_containers(None, source, target, &mut Vec::new(), &mut out);
    out
}

fn diff_whole(
    key: ComponentKey,
    s: ComponentRef<'_>,
    t: ComponentRef<'_>,
    out: &mut Vec<DiffPoint>,
) {
    if let (ComponentRef::Container(a), ComponentRef::Container(b)) = (s, t) {
        diff_containers(Some(key), a, b, &mut Vec::new(), out);
        return;
    }
    let sn = root_node(s);
    let tn = root_node(t);
    if !sn.same_content(&tn) {
        out.push(DiffPoint {
            component: Some(key),
            path: None,
            source: Some(sn),
            target: Some(tn),
            within_leaf: false,
        });
    }
}

fn root_node(component: ComponentRef<'_>) -> Node {
    match component {
        ComponentRef::Item(item) => Node::Leaf(item.clone()),
        ComponentRef::Container(c) => Node::Container(c.clone()),
    }
}

fn diff_containers(
    component: Option<ComponentKey>,
    a: &ContextContainer,
    b: &ContextContainer,
    prefix: &mut Vec<String>,
    out: &mut Vec<DiffPoint>,
) {
    for (key, an) in a.iter() {
        prefix.push(key.clone());
        match b.get(key) {
            Some(bn) => match (an, bn) {
                (Node::Container(ac), Node::Container(bc)) => {
                    diff_containers(component, ac, bc, prefix, out);
                }
                _ if an.same_content(bn) => {}
                _ => out.push(point(component, prefix, Some(an.clone()), Some(bn.clone()))),
            },
            None => out.push(point(component, prefix, Some(an.clone()), None)),
        }
        prefix.pop();
    }
    for (key, bn) in b.iter() {
        if !a.contains_key(key) {
            prefix.push(key.clone());
            out.push(point(component, prefix, None, Some(bn.clone())));
            prefix.pop();
        }
    }
}

fn point(
    component: Option<ComponentKey>,
    prefix: &[String],
    source: Option<Node>,
    target: Option<Node>,
) -> DiffPoint {
    DiffPoint {
        component,
        path: DotPath::from_segments(prefix.iter().cloned()).ok(),
        source,
        target,
        within_leaf: false,
    }
}

enum Scoped<'a> {
    Node(&'a Node),
    Value(Value, Timestamps),
    Absent,
}

impl Scoped<'_> {
    fn into_node(self) -> Option<Node> {
        match self {
            Scoped::Node(node) => Some(node.clone()),
            Scoped::Value(value, ts) => {
                Some(Node::Leaf(ContextItem::new(value).with_timestamps(ts)))
            }
            Scoped::Absent => None,
        }
    }

    fn is_value(&self) -> bool {
        matches!(self, Scoped::Value(..))
    }
}

fn resolve_scoped<'a>(component: ComponentRef<'a>, path: &DotPath) -> Scoped<'a> {
    match component {
        ComponentRef::Container(c) => match c.get_node(path) {
            Some(node) => Scoped::Node(node),
            None => value_inside_leaf(c, path.segments())
                .map_or(Scoped::Absent, |(v, ts)| Scoped::Value(v, ts)),
        },
        ComponentRef::Item(item) => item
            .value_at(path.segments())
            .map_or(Scoped::Absent, |v| Scoped::Value(v.clone(), *item.timestamps())),
    }
}

fn value_inside_leaf(
    container: &ContextContainer,
    segments: &[String],
) -> Option<(Value, Timestamps)> {
    let (first, rest) = segments.split_first()?;
    match container.get(first)? {
        Node::Container(child) => value_inside_leaf(child, rest),
        Node::Leaf(item) if !rest.is_empty() => {
            item.value_at(rest).map(|v| (v.clone(), *item.timestamps()))
        }
        Node::Leaf(_) => None,
    }
}

fn diff_scoped(
    key: ComponentKey,
    s: ComponentRef<'_>,
    t: ComponentRef<'_>,
    path: &DotPath,
    out: &mut Vec<DiffPoint>,
) {
    let sr = resolve_scoped(s, path);
    let tr = resolve_scoped(t, path);

    if let (Scoped::Node(Node::Container(a)), Scoped::Node(Node::Container(b))) = (&sr, &tr) {
        let mut prefix = path.segments().to_vec();
        diff_containers(Some(key), a, b, &mut prefix, out);
        return;
    }

    let within_leaf = sr.is_value() || tr.is_value();
    let sn = sr.into_node();
    let tn = tr.into_node();
    let differs = match (&sn, &tn) {
        (None, None) => false,
        (Some(a), Some(b)) => !a.same_content(b),
        _ => true,
    };
    if differs {
        out.push(DiffPoint {
            component: Some(key),
            path: Some(path.clone()),
            source: sn,
            target: tn,
            within_leaf,
        });
    }
}
