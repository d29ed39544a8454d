//! Helpers for locating cells around resolved positions.
//!
//! A *cell position* is a resolved position directly before a cell, so its
//! parent is a row, `node(depth - 1)` is the table and `start(depth - 1)` is
//! the start of the table's content.

use serde_json::Value;
use tabula_model::{Attrs, Node, NodeKind, ResolvedPos, TableRole};

use crate::errors::{TableError, TableResult};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::table_map::{Axis, Direction, Rect, TableMap};

/// Position before the cell containing `pos`
pub fn cell_around(pos: &ResolvedPos) -> TableResult<Option<ResolvedPos>> {
    for d in (1..pos.depth()).rev() {
        if pos.node(d).table_role() == Some(TableRole::Row) {
            return Ok(Some(pos.doc().resolve(pos.before(d + 1))?));
        }
    }
    Ok(None)
}

/// Nearest cell reached by descending into the nodes directly after or
/// before `pos`
pub fn cell_near(pos: &ResolvedPos) -> TableResult<Option<ResolvedPos>> {
    let mut after = pos.node_after();
    let mut at = pos.pos;
    while let Some(node) = after {
        if node.table_role().is_some_and(TableRole::is_cell) {
            return Ok(Some(pos.doc().resolve(at)?));
        }
        after = node.first_child().cloned();
        at += 1;
    }
    let mut before = pos.node_before();
    let mut at = pos.pos;
    while let Some(node) = before {
        if node.table_role().is_some_and(TableRole::is_cell) {
            return Ok(Some(pos.doc().resolve(at - node.node_size())?));
        }
        before = node.last_child().cloned();
        at = at.saturating_sub(1);
    }
    Ok(None)
}

pub fn is_in_table(state: &EditorState) -> bool {
    let head = state.selection().head_pos();
    (1..=head.depth())
        .rev()
        .any(|d| head.node(d).table_role() == Some(TableRole::Row))
}

/// Cell position the current selection is anchored in. For a cell selection
/// this is whichever of anchor and head comes later in the document.
pub fn selection_cell(state: &EditorState) -> TableResult<ResolvedPos> {
    match state.selection() {
        Selection::Cell(sel) => {
            if sel.anchor_cell().pos > sel.head_cell().pos {
                Ok(sel.anchor_cell().clone())
            } else {
                Ok(sel.head_cell().clone())
            }
        }
        Selection::Text(_) => {
            let head = state.selection().head_pos();
            if let Some(cell) = cell_around(&head)? {
                return Ok(cell);
            }
            cell_near(&head)?.ok_or(TableError::NoCellAround(head.pos))
        }
    }
}

/// Whether `pos` sits directly before a cell
pub fn points_at_cell(pos: &ResolvedPos) -> bool {
    pos.parent().table_role() == Some(TableRole::Row) && pos.node_after().is_some()
}

/// Cell position after the cell `pos` points at
pub fn move_cell_forward(pos: &ResolvedPos) -> TableResult<ResolvedPos> {
    let size = pos
        .node_after()
        .map(|node| node.node_size())
        .ok_or(TableError::NotACell(pos.pos))?;
    Ok(pos.doc().resolve(pos.pos + size)?)
}

pub fn in_same_table(a: &ResolvedPos, b: &ResolvedPos) -> bool {
    let Some(table_depth) = b.depth().checked_sub(1) else {
        return false;
    };
    a.depth() == b.depth() && a.pos >= b.start(table_depth) && a.pos <= b.end(table_depth)
}

/// Table node and content start for a cell position
pub fn table_of(cell: &ResolvedPos) -> TableResult<(Node, usize)> {
    let table_depth = cell
        .depth()
        .checked_sub(1)
        .ok_or(TableError::NotACell(cell.pos))?;
    let table = cell.node(table_depth);
    if table.table_role() != Some(TableRole::Table) {
        return Err(TableError::NotACell(cell.pos));
    }
    Ok((table.clone(), cell.start(table_depth)))
}

pub fn find_cell(cell: &ResolvedPos) -> TableResult<Rect> {
    let (table, start) = table_of(cell)?;
    TableMap::get(&table)?.find_cell(cell.pos - start)
}

pub fn col_count(cell: &ResolvedPos) -> TableResult<usize> {
    let (table, start) = table_of(cell)?;
    TableMap::get(&table)?.col_count(cell.pos - start)
}

pub fn next_cell(cell: &ResolvedPos, axis: Axis, dir: Direction) -> TableResult<Option<ResolvedPos>> {
    let (table, start) = table_of(cell)?;
    let map = TableMap::get(&table)?;
    match map.next_cell(cell.pos - start, axis, dir)? {
        Some(moved) => Ok(Some(cell.doc().resolve(start + moved)?)),
        None => Ok(None),
    }
}

/// Attributes with the colspan reduced by `n`
pub fn remove_col_span(attrs: &Attrs, n: usize) -> Attrs {
    let colspan = attrs.colspan().saturating_sub(n).max(1);
    attrs.clone().with("colspan", colspan)
}

/// Attributes with the colspan increased by `n`
pub fn add_col_span(attrs: &Attrs, n: usize) -> Attrs {
    attrs.clone().with("colspan", attrs.colspan() + n)
}

/// Whether every slot of column `col` is covered by a header cell
pub fn column_is_header(map: &TableMap, table: &Node, col: usize) -> bool {
    (0..map.height).all(|row| {
        table
            .node_at(map.slots[col + row * map.width])
            .is_some_and(|cell| cell.kind() == NodeKind::HeaderCell)
    })
}

/// Whether every slot of row `row` is covered by a header cell
pub fn row_is_header(map: &TableMap, table: &Node, row: usize) -> bool {
    (0..map.width).all(|col| {
        table
            .node_at(map.slots[col + row * map.width])
            .is_some_and(|cell| cell.kind() == NodeKind::HeaderCell)
    })
}

/// Read an attribute, treating absence as JSON null
pub(crate) fn attr_value(attrs: &Attrs, name: &str) -> Value {
    attrs.get(name).cloned().unwrap_or(Value::Null)
}
