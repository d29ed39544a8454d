use crate::{Attrs, Fragment, Mapping, ModelResult, Node, NodeKind, Slice, Step};

/// Accumulates steps against a document, tracking every intermediate
/// version and the combined position mapping
#[derive(Debug, Clone)]
pub struct Transform {
    doc: Node,
    docs: Vec<Node>,
    steps: Vec<Step>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Transform {
        Transform {
            doc,
            docs: Vec::new(),
            steps: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// Current document
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Document before any step was applied
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step. A failing step leaves the transform untouched.
    pub fn step(&mut self, step: Step) -> ModelResult<&mut Self> {
        let doc = step.apply(&self.doc)?;
        self.mapping.append_map(step.get_map());
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> ModelResult<&mut Self> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(Step::Replace { from, to, slice })
    }

    /// Replace a range with closed content
    pub fn replace_with(&mut self, from: usize, to: usize, content: impl Into<Fragment>) -> ModelResult<&mut Self> {
        self.replace(from, to, Slice::closed(content.into()))
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> ModelResult<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> ModelResult<&mut Self> {
        self.replace(from, to, Slice::empty())
    }

    /// Change the markup of the node at `pos`. `None` keeps its kind.
    pub fn set_node_markup(&mut self, pos: usize, kind: Option<NodeKind>, attrs: Attrs) -> ModelResult<&mut Self> {
        let current = self
            .doc
            .node_at(pos)
            .ok_or(crate::ModelError::NoNodeAt(pos))?;
        let kind = kind.unwrap_or_else(|| current.kind());
        self.step(Step::SetNodeMarkup { pos, kind, attrs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::*;

    #[test]
    fn test_steps_accumulate_mapping() {
        let mut tr = Transform::new(doc([p("ab")]));
        tr.insert(1, Node::text("xy")).unwrap();
        tr.delete(3, 4).unwrap();
        assert_eq!(tr.doc(), &doc([p("xyb")]));
        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.mapping().map(3), 4);
        assert_eq!(tr.before(), &doc([p("ab")]));
    }

    #[test]
    fn test_failed_step_leaves_transform_untouched() {
        let mut tr = Transform::new(doc([p("ab")]));
        assert!(tr.delete(2, 10).is_err());
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_set_node_markup_turns_cell_into_header() {
        let mut transform = Transform::new(doc([table([tr([td("a")])])]));
        let attrs = Attrs::new().with("colspan", 1).with("rowspan", 1);
        transform.set_node_markup(2, Some(NodeKind::HeaderCell), attrs).unwrap();
        assert_eq!(transform.doc(), &doc([table([tr([th("a")])])]));
        assert_eq!(transform.mapping().map(4), 4);
    }

    #[test]
    fn test_empty_replace_is_skipped() {
        let mut tr = Transform::new(doc([p("ab")]));
        tr.replace(1, 1, Slice::empty()).unwrap();
        assert!(!tr.doc_changed());
    }
}
