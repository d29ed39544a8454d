//! Shorthand constructors for documents, used heavily in tests.
//!
//! ```
//! use tabula_model::builders::*;
//!
//! let d = doc([table([tr([th("name"), td("value")])])]);
//! assert_eq!(d.content().size(), 21);
//! ```

use crate::{Attrs, Fragment, Node, NodeKind};

pub fn doc(children: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Doc, Attrs::new(), collect(children))
}

/// Paragraph holding plain text
pub fn p(text: &str) -> Node {
    Node::new(
        NodeKind::Paragraph,
        Attrs::new(),
        Fragment::from_node(Node::text(text)),
    )
}

pub fn table(rows: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Table, Attrs::new(), collect(rows))
}

pub fn tr(cells: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Row, Attrs::new(), collect(cells))
}

/// Cell with a single paragraph of text
pub fn td(text: &str) -> Node {
    td_with(1, 1, text)
}

/// Header cell with a single paragraph of text
pub fn th(text: &str) -> Node {
    th_with(1, 1, text)
}

pub fn td_with(colspan: usize, rowspan: usize, text: &str) -> Node {
    cell(NodeKind::Cell, span(colspan, rowspan), [p(text)])
}

pub fn th_with(colspan: usize, rowspan: usize, text: &str) -> Node {
    cell(NodeKind::HeaderCell, span(colspan, rowspan), [p(text)])
}

/// Cell of the given kind with arbitrary block content
pub fn cell(kind: NodeKind, attrs: Attrs, blocks: impl IntoIterator<Item = Node>) -> Node {
    Node::new(kind, attrs, collect(blocks))
}

pub fn span(colspan: usize, rowspan: usize) -> Attrs {
    Attrs::new()
        .with("colspan", colspan)
        .with("rowspan", rowspan)
}

fn collect(nodes: impl IntoIterator<Item = Node>) -> Fragment {
    Fragment::from_vec(nodes.into_iter().collect())
}
