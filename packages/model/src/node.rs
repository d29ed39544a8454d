//! # Document Nodes
//!
//! Nodes are immutable values shared through `Rc`. Cloning a [`Node`] clones
//! the handle, not the tree, so two handles can point at the *same* node.
//! Structural equality (`==`) and identity ([`Node::same_identity`]) are
//! separate questions: identity implies equality, never the reverse.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Fragment, ModelError, ModelResult, ResolvedPos, Slice};

/// Closed set of node kinds understood by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Text,
    Table,
    Row,
    Cell,
    HeaderCell,
}

/// Role a node plays inside a table structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Table,
    Row,
    Cell,
    HeaderCell,
}

impl TableRole {
    /// Cell or header cell
    pub fn is_cell(self) -> bool {
        matches!(self, TableRole::Cell | TableRole::HeaderCell)
    }

    /// Node kind that carries this role
    pub fn kind(self) -> NodeKind {
        match self {
            TableRole::Table => NodeKind::Table,
            TableRole::Row => NodeKind::Row,
            TableRole::Cell => NodeKind::Cell,
            TableRole::HeaderCell => NodeKind::HeaderCell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentExpr {
    Blocks,
    Inline,
    Rows,
    Cells,
    Leaf,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::Table => "table",
            NodeKind::Row => "row",
            NodeKind::Cell => "cell",
            NodeKind::HeaderCell => "header_cell",
        }
    }

    pub fn table_role(self) -> Option<TableRole> {
        match self {
            NodeKind::Table => Some(TableRole::Table),
            NodeKind::Row => Some(TableRole::Row),
            NodeKind::Cell => Some(TableRole::Cell),
            NodeKind::HeaderCell => Some(TableRole::HeaderCell),
            NodeKind::Doc | NodeKind::Paragraph | NodeKind::Text => None,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Table)
    }

    pub fn is_textblock(self) -> bool {
        self == NodeKind::Paragraph
    }

    fn content_expr(self) -> ContentExpr {
        match self {
            NodeKind::Doc | NodeKind::Cell | NodeKind::HeaderCell => ContentExpr::Blocks,
            NodeKind::Paragraph => ContentExpr::Inline,
            NodeKind::Table => ContentExpr::Rows,
            NodeKind::Row => ContentExpr::Cells,
            NodeKind::Text => ContentExpr::Leaf,
        }
    }

    /// Whether a node of `child` kind may appear directly inside this kind
    pub fn allows_child(self, child: NodeKind) -> bool {
        match self.content_expr() {
            ContentExpr::Blocks => child.is_block(),
            ContentExpr::Inline => child == NodeKind::Text,
            ContentExpr::Rows => child == NodeKind::Row,
            ContentExpr::Cells => matches!(child, NodeKind::Cell | NodeKind::HeaderCell),
            ContentExpr::Leaf => false,
        }
    }

    /// Whether content of `other` can be joined into a node of this kind
    pub fn compatible_content(self, other: NodeKind) -> bool {
        self == other || self.content_expr() == other.content_expr()
    }

    pub fn check_content(self, content: &Fragment) -> ModelResult<()> {
        for child in content.iter() {
            if !self.allows_child(child.kind()) {
                return Err(ModelError::InvalidContent {
                    kind: self,
                    child: child.kind(),
                });
            }
        }
        Ok(())
    }

    pub fn default_attrs(self) -> Attrs {
        match self {
            NodeKind::Cell | NodeKind::HeaderCell => {
                Attrs::new().with("colspan", 1).with("rowspan", 1)
            }
            _ => Attrs::new(),
        }
    }

    /// Minimal valid content for a fresh node, if one exists
    fn fill(self) -> Option<Fragment> {
        match self {
            NodeKind::Doc | NodeKind::Cell | NodeKind::HeaderCell => Some(Fragment::from_node(
                Node::new(NodeKind::Paragraph, Attrs::new(), Fragment::empty()),
            )),
            NodeKind::Paragraph | NodeKind::Row => Some(Fragment::empty()),
            NodeKind::Table => Some(Fragment::from_node(Node::new(
                NodeKind::Row,
                Attrs::new(),
                Fragment::empty(),
            ))),
            NodeKind::Text => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Node attributes (ordered name → JSON value map)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(BTreeMap<String, Value>);

impl Attrs {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn usize_or(&self, name: &str, default: usize) -> usize {
        self.0
            .get(name)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    /// Number of columns a cell covers (at least 1)
    pub fn colspan(&self) -> usize {
        self.usize_or("colspan", 1).max(1)
    }

    /// Number of rows a cell covers (at least 1)
    pub fn rowspan(&self) -> usize {
        self.usize_or("rowspan", 1).max(1)
    }

    /// Fill in keys missing from `self` using `defaults`
    fn with_defaults(mut self, defaults: Attrs) -> Self {
        for (name, value) in defaults.0 {
            self.0.entry(name).or_insert(value);
        }
        self
    }
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    attrs: Attrs,
    content: Fragment,
    text: Option<String>,
}

/// Immutable, shared document node
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

/// Non-owning handle to a node, used for identity-keyed caches
#[derive(Debug, Clone)]
pub struct WeakNode(Weak<NodeData>);

/// Identity token of a node allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity(usize);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    /// Whether the node is still alive
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this handle refers to `node`
    pub fn refers_to(&self, node: &Node) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&node.0))
    }
}

impl Node {
    /// Create a node without validating its content. Missing attributes are
    /// filled from the kind's defaults.
    pub fn new(kind: NodeKind, attrs: Attrs, content: Fragment) -> Node {
        Node(Rc::new(NodeData {
            kind,
            attrs: attrs.with_defaults(kind.default_attrs()),
            content,
            text: None,
        }))
    }

    /// Create a node, rejecting children its kind does not allow
    pub fn create_checked(kind: NodeKind, attrs: Attrs, content: Fragment) -> ModelResult<Node> {
        if kind == NodeKind::Text {
            return Err(ModelError::MissingText);
        }
        kind.check_content(&content)?;
        Ok(Node::new(kind, attrs, content))
    }

    /// Create a node with the smallest valid content for its kind
    pub fn create_and_fill(kind: NodeKind, attrs: Attrs) -> Option<Node> {
        kind.fill().map(|content| Node::new(kind, attrs, content))
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node(Rc::new(NodeData {
            kind: NodeKind::Text,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            text: Some(text.into()),
        }))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn table_role(&self) -> Option<TableRole> {
        self.0.kind.table_role()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    /// Text of a text node
    pub fn text_str(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    pub fn is_textblock(&self) -> bool {
        self.0.kind.is_textblock()
    }

    pub fn is_block(&self) -> bool {
        self.0.kind.is_block()
    }

    /// Size of the node in the position space
    pub fn node_size(&self) -> usize {
        match &self.0.text {
            Some(text) => text.chars().count(),
            None => self.0.content.size() + 2,
        }
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    /// Child at `index`. Panics when out of bounds, like slice indexing.
    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        match &self.0.text {
            Some(text) => text.clone(),
            None => self.0.content.iter().map(Node::text_content).collect(),
        }
    }

    /// Same kind and attributes
    pub fn same_markup(&self, other: &Node) -> bool {
        self.0.kind == other.0.kind && self.0.attrs == other.0.attrs
    }

    /// Same allocation
    pub fn same_identity(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity(Rc::as_ptr(&self.0) as usize)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// Same markup, new content
    pub fn copy(&self, content: Fragment) -> Node {
        if self.0.content.ptr_eq(&content) {
            return self.clone();
        }
        Node(Rc::new(NodeData {
            kind: self.0.kind,
            attrs: self.0.attrs.clone(),
            content,
            text: self.0.text.clone(),
        }))
    }

    /// Same content, new kind and attributes
    pub fn with_markup(&self, kind: NodeKind, attrs: Attrs) -> Node {
        Node::new(kind, attrs, self.0.content.clone())
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        self.with_markup(self.0.kind, attrs)
    }

    /// Part of the node between two offsets into its content
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = &self.0.text {
            if from == 0 && to >= text.chars().count() {
                return self.clone();
            }
            return Node::text(text.chars().skip(from).take(to.saturating_sub(from)).collect::<String>());
        }
        if from == 0 && to == self.0.content.size() {
            return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
    }

    /// Node starting at `pos` (relative to this node's content)
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos).ok()?;
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// Replace the range `from..to` of this node's content with a slice
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> ModelResult<Node> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        crate::replace::replace(&from, &to, slice)
    }

    /// Content between two positions, open as deep as the positions are
    /// below their shared ancestor
    pub fn slice(&self, from: usize, to: usize) -> ModelResult<Slice> {
        if from >= to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let content = rfrom.node(depth).content().cut(from - start, to - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Call `f` for every descendant overlapping `from..to`, with its
    /// position. Returning `false` skips the node's children.
    pub fn nodes_between(&self, from: usize, to: usize, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.0.content.nodes_between(from, to, f, 0);
    }

    /// Call `f` for every descendant
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.nodes_between(0, self.0.content.size(), f);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
            || (self.0.kind == other.0.kind
                && self.0.text == other.0.text
                && self.0.attrs == other.0.attrs
                && self.0.content == other.0.content)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.0.text {
            return write!(f, "{:?}", text);
        }
        write!(f, "{}", self.0.kind.name())?;
        if self.0.content.child_count() > 0 {
            write!(f, "(")?;
            for (i, child) in self.0.content.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::*;

    #[test]
    fn test_node_sizes() {
        let cell = td("ab");
        // cell > paragraph > "ab"
        assert_eq!(cell.node_size(), 6);
        assert_eq!(Node::text("héllo").node_size(), 5);
    }

    #[test]
    fn test_identity_vs_equality() {
        let a = td("x");
        let b = td("x");
        assert_eq!(a, b);
        assert!(!a.same_identity(&b));
        assert!(a.same_identity(&a.clone()));
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_default_cell_attrs() {
        let cell = Node::create_and_fill(NodeKind::HeaderCell, Attrs::new()).unwrap();
        assert_eq!(cell.attrs().colspan(), 1);
        assert_eq!(cell.attrs().rowspan(), 1);
        assert_eq!(cell.child_count(), 1);
        assert!(Node::create_and_fill(NodeKind::Text, Attrs::new()).is_none());
    }

    #[test]
    fn test_node_at() {
        let d = doc([table([tr([td("a"), td("b")])])]);
        assert_eq!(d.node_at(0).unwrap().kind(), NodeKind::Table);
        assert_eq!(d.node_at(1).unwrap().kind(), NodeKind::Row);
        assert_eq!(d.node_at(2).unwrap().kind(), NodeKind::Cell);
        assert_eq!(d.node_at(7).unwrap().text_content(), "b");
    }

    #[test]
    fn test_create_checked_rejects_bad_children() {
        let result = Node::create_checked(NodeKind::Row, Attrs::new(), Fragment::from_node(p("x")));
        assert!(matches!(result, Err(ModelError::InvalidContent { .. })));
    }

    #[test]
    fn test_weak_node() {
        let cell = td("x");
        let weak = cell.downgrade();
        assert!(weak.refers_to(&cell));
        assert!(weak.upgrade().unwrap().same_identity(&cell));
        drop(cell);
        assert!(!weak.is_alive());
    }
}
