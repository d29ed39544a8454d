//! Positions resolved against a document into an ancestor path.

use std::fmt;

use crate::{ModelError, ModelResult, Node};

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position of the start of the child at `index`
    offset: usize,
}

/// A document position together with the chain of nodes it sits inside.
/// Depth 0 is the document itself.
#[derive(Clone)]
pub struct ResolvedPos {
    pub pos: usize,
    path: Vec<PathEntry>,
    pub parent_offset: usize,
}

impl ResolvedPos {
    pub fn resolve(doc: &Node, pos: usize) -> ModelResult<ResolvedPos> {
        if pos > doc.content().size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content().size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// Index into the ancestor at `depth`
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Index pointing after this position into the ancestor at `depth`
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Start position of the content of the ancestor at `depth`
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    /// End position of the content of the ancestor at `depth`
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the ancestor at `depth`. The document has no
    /// such position; depth 0 yields 0.
    pub fn before(&self, depth: usize) -> usize {
        if depth == 0 {
            return 0;
        }
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset
        }
    }

    /// Position directly after the ancestor at `depth`
    pub fn after(&self, depth: usize) -> usize {
        if depth == 0 {
            return self.doc().content().size();
        }
        if depth == self.depth() + 1 {
            self.pos + self.node(depth).node_size()
        } else {
            self.path[depth - 1].offset + self.node(depth).node_size()
        }
    }

    /// Offset into the text node the position points into, or 0
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let d_off = self.text_offset();
        if d_off > 0 {
            Some(child.cut(d_off, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return Some(parent.child(index).cut(0, d_off));
        }
        if index == 0 {
            None
        } else {
            Some(parent.child(index - 1).clone())
        }
    }

    /// Position of the child at `index` in the ancestor at `depth`
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for child in node.content().iter().take(index) {
            pos += child.node_size();
        }
        pos
    }

    /// Deepest depth whose node contains both this position and `pos`
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for depth in 1..=self.depth() {
            parts.push(format!("{}_{}", self.node(depth).kind(), self.index(depth - 1)));
        }
        write!(f, "{}:{}", parts.join("/"), self.parent_offset)
    }
}

#[cfg(test)]
mod tests {
    use crate::builders::*;
    use crate::NodeKind;

    #[test]
    fn test_resolve_inside_cell_text() {
        let d = doc([table([tr([td("hi")])])]);
        let pos = d.resolve(5).unwrap();
        assert_eq!(pos.depth(), 4);
        assert_eq!(pos.parent().kind(), NodeKind::Paragraph);
        assert_eq!(pos.node(3).kind(), NodeKind::Cell);
        assert_eq!(pos.before(3), 2);
        assert_eq!(pos.after(3), 8);
        assert_eq!(pos.start(4), 4);
        assert_eq!(pos.text_offset(), 1);
        assert_eq!(pos.node_before().unwrap().text_str(), Some("h"));
        assert_eq!(pos.node_after().unwrap().text_str(), Some("i"));
    }

    #[test]
    fn test_resolve_between_cells() {
        let d = doc([table([tr([td("a"), td("b")])])]);
        let pos = d.resolve(7).unwrap();
        assert_eq!(pos.parent().kind(), NodeKind::Row);
        assert_eq!(pos.index(2), 1);
        assert_eq!(pos.node_after().unwrap().text_content(), "b");
        assert_eq!(pos.node_before().unwrap().text_content(), "a");
        assert_eq!(pos.pos_at_index(1, 2), 7);
    }

    #[test]
    fn test_shared_depth() {
        let d = doc([table([tr([td("a"), td("b")])])]);
        let pos = d.resolve(4).unwrap();
        assert_eq!(pos.shared_depth(9), 2);
        assert_eq!(pos.shared_depth(4), 4);
    }

    #[test]
    fn test_out_of_range() {
        let d = doc([p("a")]);
        assert!(d.resolve(4).is_err());
    }
}
