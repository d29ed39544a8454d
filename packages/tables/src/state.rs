//! # Editor State
//!
//! An [`EditorState`] pairs a document with a selection. Edits are collected
//! in a [`Transaction`] and applied with [`EditorState::apply`], which then
//! runs the post-edit cycle:
//!
//! 1. Structural repair of every table touched by the edit
//! 2. Selection normalization (a text range spanning two cells of one table
//!    becomes a cell selection)

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tabula_model::{Node, Transform};
use tracing::debug;

use crate::cell_selection::CellSelection;
use crate::errors::TableResult;
use crate::fix_tables::fix_tables;
use crate::selection::Selection;
use crate::util::{cell_around, in_same_table};

/// Meta key set on transactions produced by structural repair
pub const FIX_TABLES_META: &str = "fix_tables";

/// Receiver for the transaction a command builds. Commands called without
/// one only report whether they apply.
pub type Dispatch<'a> = Option<&'a mut dyn FnMut(Transaction)>;

#[derive(Debug, Clone)]
pub struct EditorState {
    doc: Node,
    selection: Selection,
}

impl EditorState {
    pub fn new(doc: Node, selection: Selection) -> EditorState {
        EditorState { doc, selection }
    }

    /// State with a cursor at the first textblock of `doc`
    pub fn create(doc: Node) -> TableResult<EditorState> {
        let selection = Selection::at_start(&doc)?;
        Ok(EditorState { doc, selection })
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Start a transaction against this state
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection.clone())
    }

    /// Apply `tr` and run the post-edit cycle
    pub fn apply(&self, tr: Transaction) -> TableResult<EditorState> {
        let next = self.apply_inner(&tr)?;
        let next = match fix_tables(&next, Some(&self.doc))? {
            Some(fix) => next.apply_inner(&fix)?,
            None => next,
        };
        next.normalize_selection()
    }

    fn apply_inner(&self, tr: &Transaction) -> TableResult<EditorState> {
        Ok(EditorState {
            doc: tr.doc().clone(),
            selection: tr.selection()?,
        })
    }

    fn normalize_selection(self) -> TableResult<EditorState> {
        let Selection::Text(sel) = &self.selection else {
            return Ok(self);
        };
        if sel.is_empty() {
            return Ok(self);
        }
        let (Some(anchor), Some(head)) = (cell_around(&sel.anchor)?, cell_around(&sel.head)?) else {
            return Ok(self);
        };
        if anchor.pos == head.pos || !in_same_table(&anchor, &head) {
            return Ok(self);
        }
        debug!(anchor = anchor.pos, head = head.pos, "text selection across cells became a cell selection");
        let selection = CellSelection::new(anchor, head)?.into();
        Ok(EditorState {
            doc: self.doc,
            selection,
        })
    }
}

/// A batch of steps plus selection and metadata updates.
///
/// Dereferences to the underlying [`Transform`] for building steps.
#[derive(Debug, Clone)]
pub struct Transaction {
    transform: Transform,
    selection: Selection,
    /// Number of steps that existed when `selection` was set
    selection_for: usize,
    selection_set: bool,
    meta: HashMap<String, Value>,
}

impl Transaction {
    pub fn new(doc: Node, selection: Selection) -> Transaction {
        Transaction {
            transform: Transform::new(doc),
            selection,
            selection_for: 0,
            selection_set: false,
            meta: HashMap::new(),
        }
    }

    /// Current selection, mapped through the steps added since it was set
    pub fn selection(&self) -> TableResult<Selection> {
        if self.transform.steps().len() == self.selection_for {
            return Ok(self.selection.clone());
        }
        let mapping = self.transform.mapping().slice(self.selection_for);
        self.selection.map(self.transform.doc(), &mapping)
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_for = self.transform.steps().len();
        self.selection_set = true;
        self
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::TextSelection;
    use crate::table_map::TableMap;
    use tabula_model::builders::*;

    #[test]
    fn test_selection_is_mapped_lazily() {
        let state = EditorState::create(doc([p("abc")])).unwrap();
        assert_eq!(state.selection().head(), 1);
        let mut tr = state.tr();
        tr.insert(1, tabula_model::Node::text("xy")).unwrap();
        assert_eq!(tr.selection().unwrap().head(), 3);
        let next = state.apply(tr).unwrap();
        assert_eq!(next.doc(), &doc([p("xyabc")]));
    }

    #[test]
    fn test_apply_repairs_tables() {
        let d = doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])]);
        let state = EditorState::create(d).unwrap();
        let mut tr = state.tr();
        // drop cell "d"
        tr.delete(19, 24).unwrap();
        let next = state.apply(tr).unwrap();
        let table = next.doc().child(0);
        let map = TableMap::get(table).unwrap();
        assert!(map.problems.is_empty());
        assert_eq!(table.child(1).child_count(), 2);
    }

    #[test]
    fn test_text_range_across_cells_becomes_cell_selection() {
        let d = doc([table([tr([td("a"), td("b")])])]);
        let state = EditorState::create(d.clone()).unwrap();
        let mut tr = state.tr();
        tr.set_selection(TextSelection::create(&d, 4, 9).unwrap().into());
        let next = state.apply(tr).unwrap();
        let sel = next.selection().as_cell().unwrap();
        assert_eq!((sel.anchor_cell().pos, sel.head_cell().pos), (2, 7));
    }

    #[test]
    fn test_meta() {
        let state = EditorState::create(doc([p("")])).unwrap();
        let mut tr = state.tr();
        tr.set_meta(FIX_TABLES_META, true);
        assert_eq!(tr.get_meta(FIX_TABLES_META), Some(&Value::Bool(true)));
        assert!(!tr.selection_set());
    }
}
