//! Ordered, immutable sequence of sibling nodes.

use std::fmt;
use std::rc::Rc;

use crate::{ModelError, ModelResult, Node};

#[derive(Clone)]
pub struct Fragment {
    nodes: Rc<Vec<Node>>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Fragment {
        Fragment {
            nodes: Rc::new(Vec::new()),
            size: 0,
        }
    }

    /// Build a fragment, joining adjacent text nodes and dropping empty ones
    pub fn from_vec(nodes: Vec<Node>) -> Fragment {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(text) = node.text_str() {
                if text.is_empty() {
                    continue;
                }
                if let Some(prev) = joined.last_mut() {
                    if let Some(prev_text) = prev.text_str() {
                        *prev = Node::text(format!("{}{}", prev_text, text));
                        continue;
                    }
                }
            }
            joined.push(node);
        }
        let size = joined.iter().map(Node::node_size).sum();
        Fragment {
            nodes: Rc::new(joined),
            size,
        }
    }

    pub fn from_node(node: Node) -> Fragment {
        Fragment::from_vec(vec![node])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.as_ref().clone()
    }

    pub(crate) fn ptr_eq(&self, other: &Fragment) -> bool {
        Rc::ptr_eq(&self.nodes, &other.nodes)
    }

    /// Concatenate two fragments
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut nodes = self.to_vec();
        nodes.extend(other.iter().cloned());
        Fragment::from_vec(nodes)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.push(node);
        nodes.extend(self.iter().cloned());
        Fragment::from_vec(nodes)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut nodes = self.to_vec();
        nodes.push(node);
        Fragment::from_vec(nodes)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        if self.nodes[index].same_identity(&node) {
            return self.clone();
        }
        let mut nodes = self.to_vec();
        nodes[index] = node;
        Fragment::from_vec(nodes)
    }

    /// Part of the fragment between two offsets
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in self.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_vec(result)
    }

    /// Index of the child at `pos` and that child's start offset. A position
    /// on a boundary resolves to the child after it.
    pub fn find_index(&self, pos: usize) -> ModelResult<(usize, usize)> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (i, child) in self.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    pub(crate) fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize) -> bool,
        node_start: usize,
    ) {
        let mut pos = 0;
        for child in self.iter() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                );
            }
            pos = end;
        }
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::empty()
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_node(node)
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_vec(nodes)
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.size == other.size && self.nodes == other.nodes)
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}
