//! # Table Commands
//!
//! Row, column and cell editing commands. Every command takes the current
//! [`EditorState`] and an optional dispatch callback:
//!
//! - It returns `Ok(false)` without touching anything when it does not apply.
//! - Without a dispatch callback it only reports whether it would apply.
//! - With one, it builds exactly one [`Transaction`] and hands it over.
//!
//! The `add_*`/`remove_*` builders work on a caller-owned transaction and a
//! [`TableRect`], so they can be combined into larger edits.
//!
//! Cells created by these commands take their role from a neighbour. A new
//! column copies the column to its left (or column 0 when inserted at the
//! start). A new row copies the row above, unless that row is a header row,
//! in which case it copies the row below; at the top or bottom edge it then
//! gets plain cells.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_model::{Attrs, Fragment, Node, NodeKind, ResolvedPos, Slice, TableRole};
use tracing::debug;

use crate::cell_selection::CellSelection;
use crate::copypaste::empty_cell;
use crate::errors::{TableError, TableResult};
use crate::selection::TextSelection;
use crate::state::{Dispatch, EditorState, Transaction};
use crate::table_map::{Direction, Rect, TableMap};
use crate::util::{
    add_col_span, attr_value, is_in_table, move_cell_forward, remove_col_span, selection_cell, table_of,
};

pub use crate::util::{column_is_header, row_is_header};

/// Which cells a header toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    Row,
    Column,
    Cell,
}

/// How header toggling decides what to change.
///
/// `Legacy` turns every header cell in the targeted row, column or selection
/// into a plain cell, or, if there were none, turns them all into headers.
///
/// `Current` toggles rows and columns on the first row or column only. When
/// the other axis already has a header line, the shared corner cell is left
/// alone, so toggling a header column does not undo a header row. For cells,
/// an all-header selection becomes plain and anything else becomes header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    #[default]
    Current,
    Legacy,
}

/// Selected rectangle together with the table it lives in
#[derive(Debug, Clone)]
pub struct TableRect {
    pub rect: Rect,
    pub map: Rc<TableMap>,
    pub table: Node,
    /// Start of the table's content
    pub table_start: usize,
}

impl TableRect {
    /// Re-read the table from `tr` after it changed shape
    fn reload(&mut self, tr: &Transaction) -> TableResult<()> {
        let table = self
            .table_start
            .checked_sub(1)
            .and_then(|pos| tr.doc().node_at(pos))
            .ok_or(TableError::CellNotFound(self.table_start))?;
        self.map = TableMap::get(&table)?;
        self.table = table;
        Ok(())
    }

    fn cell(&self, pos: usize) -> TableResult<Node> {
        self.table.node_at(pos).ok_or(TableError::CellNotFound(pos))
    }

    /// Role of the cell covering slot `index`, plain for empty slots
    fn kind_at(&self, index: usize) -> NodeKind {
        match self.map.slots.get(index) {
            Some(&pos) if pos != 0 => self
                .table
                .node_at(pos)
                .filter(|cell| cell.table_role().is_some_and(TableRole::is_cell))
                .map_or(NodeKind::Cell, |cell| cell.kind()),
            _ => NodeKind::Cell,
        }
    }

    /// Table-relative start of row `row`
    fn row_pos(&self, row: usize) -> usize {
        self.table.content().iter().take(row).map(Node::node_size).sum()
    }
}

/// Rectangle covered by the selection: the cell selection's bounding box,
/// or the cell holding the cursor
pub fn selected_rect(state: &EditorState) -> TableResult<TableRect> {
    let cell = selection_cell(state)?;
    let (table, table_start) = table_of(&cell)?;
    let map = TableMap::get(&table)?;
    let rect = match state.selection().as_cell() {
        Some(sel) => map.rect_between(sel.anchor_cell().pos - table_start, sel.head_cell().pos - table_start)?,
        None => map.find_cell(cell.pos - table_start)?,
    };
    Ok(TableRect {
        rect,
        map,
        table,
        table_start,
    })
}

fn finish(command: &str, tr: Transaction, dispatch: &mut dyn FnMut(Transaction)) {
    debug!(command, steps = tr.steps().len(), "dispatching table command");
    dispatch(tr);
}

/// Insert a column at grid column `col`. Cells spanning across `col` are
/// widened instead.
pub fn add_column(tr: &mut Transaction, rect: &TableRect, col: usize) -> TableResult<()> {
    let map = &rect.map;
    let map_from = tr.steps().len();
    let ref_col = col.saturating_sub(1);
    let mut row = 0;
    while row < map.height {
        let index = row * map.width + col;
        let pos = map.slots.get(index).copied().unwrap_or(0);
        if col > 0 && col < map.width && pos != 0 && map.slots[index - 1] == pos {
            let cell = rect.cell(pos)?;
            let at = tr.mapping().slice(map_from).map(rect.table_start + pos);
            tr.set_node_markup(at, None, add_col_span(cell.attrs(), 1))?;
            row += cell.attrs().rowspan();
        } else {
            let kind = rect.kind_at(row * map.width + ref_col);
            let pos = map.position_at(row, col, &rect.table);
            let at = tr.mapping().slice(map_from).map(rect.table_start + pos);
            tr.insert(at, empty_cell(kind)?)?;
            row += 1;
        }
    }
    Ok(())
}

pub fn add_column_before(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let rect = selected_rect(state)?;
        let mut tr = state.tr();
        add_column(&mut tr, &rect, rect.rect.left)?;
        finish("add_column_before", tr, dispatch);
    }
    Ok(true)
}

pub fn add_column_after(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let rect = selected_rect(state)?;
        let mut tr = state.tr();
        add_column(&mut tr, &rect, rect.rect.right)?;
        finish("add_column_after", tr, dispatch);
    }
    Ok(true)
}

/// Remove grid column `col`. Cells spanning across it are narrowed.
pub fn remove_column(tr: &mut Transaction, rect: &TableRect, col: usize) -> TableResult<()> {
    let map = &rect.map;
    let map_from = tr.steps().len();
    let mut row = 0;
    while row < map.height {
        let index = row * map.width + col;
        let pos = map.slots[index];
        if pos == 0 {
            row += 1;
            continue;
        }
        let cell = rect.cell(pos)?;
        let at = tr.mapping().slice(map_from).map(rect.table_start + pos);
        let spans_left = col > 0 && map.slots[index - 1] == pos;
        let spans_right = col + 1 < map.width && map.slots[index + 1] == pos;
        if spans_left || spans_right {
            tr.set_node_markup(at, None, remove_col_span(cell.attrs(), 1))?;
        } else {
            tr.delete(at, at + cell.node_size())?;
        }
        row += cell.attrs().rowspan();
    }
    Ok(())
}

/// Remove the selected columns. Refuses to remove every column.
pub fn delete_column(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    let mut rect = selected_rect(state)?;
    let Rect { left, right, .. } = rect.rect;
    if left == 0 && right == rect.map.width {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let mut tr = state.tr();
        for col in (left..right).rev() {
            remove_column(&mut tr, &rect, col)?;
            if col > left {
                rect.reload(&tr)?;
            }
        }
        finish("delete_column", tr, dispatch);
    }
    Ok(true)
}

/// Insert a row at grid row `row`. Cells spanning across it grow taller.
pub fn add_row(tr: &mut Transaction, rect: &TableRect, row: usize) -> TableResult<()> {
    let map = &rect.map;
    let map_from = tr.steps().len();
    let mut reference = Some(row.saturating_sub(1));
    if row_is_header(map, &rect.table, row.saturating_sub(1)) {
        reference = if row == 0 || row == map.height { None } else { Some(row) };
    }

    let mut cells = Vec::with_capacity(map.width);
    let mut col = 0;
    while col < map.width {
        let index = row * map.width + col;
        let pos = map.slots.get(index).copied().unwrap_or(0);
        if row > 0 && row < map.height && pos != 0 && map.slots[index - map.width] == pos {
            let attrs = rect.cell(pos)?.attrs().clone();
            let at = tr.mapping().slice(map_from).map(rect.table_start + pos);
            let rowspan = attrs.rowspan() + 1;
            tr.set_node_markup(at, None, attrs.clone().with("rowspan", rowspan))?;
            col += attrs.colspan();
        } else {
            let kind = reference.map_or(NodeKind::Cell, |r| rect.kind_at(r * map.width + col));
            cells.push(empty_cell(kind)?);
            col += 1;
        }
    }
    let row_node = Node::new(NodeKind::Row, Attrs::new(), Fragment::from_vec(cells));
    let at = tr.mapping().slice(map_from).map(rect.table_start + rect.row_pos(row));
    tr.insert(at, row_node)?;
    Ok(())
}

pub fn add_row_before(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let rect = selected_rect(state)?;
        let mut tr = state.tr();
        add_row(&mut tr, &rect, rect.rect.top)?;
        finish("add_row_before", tr, dispatch);
    }
    Ok(true)
}

pub fn add_row_after(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let rect = selected_rect(state)?;
        let mut tr = state.tr();
        add_row(&mut tr, &rect, rect.rect.bottom)?;
        finish("add_row_after", tr, dispatch);
    }
    Ok(true)
}

/// Remove grid row `row`. Cells reaching into it from above get shorter;
/// cells starting in it that reach further down move to the next row.
pub fn remove_row(tr: &mut Transaction, rect: &TableRect, row: usize) -> TableResult<()> {
    let map = &rect.map;
    let row_pos = rect.row_pos(row);
    let next_row = row_pos + rect.table.child(row).node_size();
    let map_from = tr.steps().len();
    tr.delete(rect.table_start + row_pos, rect.table_start + next_row)?;

    let mut seen = Vec::new();
    let mut col = 0;
    while col < map.width {
        let index = row * map.width + col;
        let pos = map.slots[index];
        if pos == 0 || seen.contains(&pos) {
            col += 1;
            continue;
        }
        seen.push(pos);
        if row > 0 && map.slots[index - map.width] == pos {
            let attrs = rect.cell(pos)?.attrs().clone();
            let at = tr.mapping().slice(map_from).map(rect.table_start + pos);
            let rowspan = attrs.rowspan() - 1;
            tr.set_node_markup(at, None, attrs.clone().with("rowspan", rowspan))?;
            col += attrs.colspan();
        } else if map.slots.get(index + map.width) == Some(&pos) {
            let cell = rect.cell(pos)?;
            let attrs = cell.attrs().clone();
            let moved = cell.with_attrs(attrs.clone().with("rowspan", attrs.rowspan() - 1));
            let new_pos = map.position_at(row + 1, col, &rect.table);
            let at = tr.mapping().slice(map_from).map(rect.table_start + new_pos);
            tr.insert(at, moved)?;
            col += attrs.colspan();
        } else {
            col += 1;
        }
    }
    Ok(())
}

/// Remove the selected rows. Refuses to remove every row.
pub fn delete_row(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    let mut rect = selected_rect(state)?;
    let Rect { top, bottom, .. } = rect.rect;
    if top == 0 && bottom == rect.map.height {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let mut tr = state.tr();
        for row in (top..bottom).rev() {
            remove_row(&mut tr, &rect, row)?;
            if row > top {
                rect.reload(&tr)?;
            }
        }
        finish("delete_row", tr, dispatch);
    }
    Ok(true)
}

fn is_empty_cell(cell: &Node) -> bool {
    let content = cell.content();
    content.child_count() == 1 && content.child(0).is_textblock() && content.child(0).child_count() == 0
}

/// Whether a cell crosses the edge of `rect`
fn cells_overlap_rectangle(map: &TableMap, rect: &Rect) -> bool {
    let width = map.width;
    let slots = &map.slots;
    for row in rect.top..rect.bottom {
        let left = row * width + rect.left;
        let right = row * width + rect.right - 1;
        if (rect.left > 0 && slots[left] == slots[left - 1])
            || (rect.right < width && slots[right] == slots[right + 1])
        {
            return true;
        }
    }
    for col in rect.left..rect.right {
        let top = rect.top * width + col;
        let bottom = (rect.bottom - 1) * width + col;
        if (rect.top > 0 && slots[top] == slots[top - width])
            || (rect.bottom < map.height && slots[bottom] == slots[bottom + width])
        {
            return true;
        }
    }
    false
}

/// Merge the selected cells into the top-left one, which then spans the
/// whole rectangle. Content of the other cells is appended unless empty.
/// Refused when a cell sticks out of the selection.
pub fn merge_cells(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    let Some(sel) = state.selection().as_cell() else {
        return Ok(false);
    };
    if sel.anchor_cell().pos == sel.head_cell().pos {
        return Ok(false);
    }
    let rect = selected_rect(state)?;
    if cells_overlap_rectangle(&rect.map, &rect.rect) {
        return Ok(false);
    }
    let Some(dispatch) = dispatch else {
        return Ok(true);
    };

    let map = &rect.map;
    let mut tr = state.tr();
    let mut seen = Vec::new();
    let mut content = Fragment::empty();
    let mut merged: Option<(usize, Node)> = None;
    for row in rect.rect.top..rect.rect.bottom {
        for col in rect.rect.left..rect.rect.right {
            let pos = map.slots[row * map.width + col];
            if pos == 0 || seen.contains(&pos) {
                continue;
            }
            seen.push(pos);
            let cell = rect.cell(pos)?;
            if merged.is_none() {
                merged = Some((pos, cell));
                continue;
            }
            if !is_empty_cell(&cell) {
                content = content.append(cell.content());
            }
            let at = tr.mapping().map(rect.table_start + pos);
            tr.delete(at, at + cell.node_size())?;
        }
    }
    let Some((merged_pos, merged_cell)) = merged else {
        return Ok(true);
    };

    let attrs = merged_cell
        .attrs()
        .clone()
        .with("colspan", rect.rect.width())
        .with("rowspan", rect.rect.height());
    tr.set_node_markup(rect.table_start + merged_pos, None, attrs)?;
    if content.size() > 0 {
        let end = merged_pos + 1 + merged_cell.content().size();
        let start = if is_empty_cell(&merged_cell) {
            merged_pos + 1
        } else {
            end
        };
        tr.replace_with(rect.table_start + start, rect.table_start + end, content)?;
    }
    let at = rect.table_start + merged_pos;
    let selection = CellSelection::create(tr.doc(), at, at)?;
    tr.set_selection(selection.into());
    finish("merge_cells", tr, dispatch);
    Ok(true)
}

/// Set attribute `name` on the selected cells. Does not apply when the
/// cell at the selection already has that value.
pub fn set_cell_attr(state: &EditorState, dispatch: Dispatch, name: &str, value: Value) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    let cell = selection_cell(state)?;
    let node = cell.node_after().ok_or(TableError::NotACell(cell.pos))?;
    if attr_value(node.attrs(), name) == value {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let mut tr = state.tr();
        if let Some(sel) = state.selection().as_cell() {
            let mut updates = Vec::new();
            sel.for_each_cell(&mut |cell, pos| {
                if attr_value(cell.attrs(), name) != value {
                    updates.push((pos, cell.attrs().clone().with(name, value.clone())));
                }
            })?;
            for (pos, attrs) in updates {
                tr.set_node_markup(pos, None, attrs)?;
            }
        } else {
            tr.set_node_markup(cell.pos, None, node.attrs().clone().with(name, value))?;
        }
        finish("set_cell_attr", tr, dispatch);
    }
    Ok(true)
}

/// Whether the first row (`HeaderKind::Row`) or first column is all headers
fn header_enabled(kind: HeaderKind, rect: &TableRect) -> TableResult<bool> {
    let map = &rect.map;
    let right = if kind == HeaderKind::Row { map.width } else { 1 };
    let bottom = if kind == HeaderKind::Column { map.height } else { 1 };
    for pos in map.cells_in_rect(Rect::new(0, 0, right, bottom)) {
        if rect.cell(pos)?.kind() != NodeKind::HeaderCell {
            return Ok(false);
        }
    }
    Ok(true)
}

fn toggle_header_legacy(tr: &mut Transaction, rect: &TableRect, kind: HeaderKind) -> TableResult<()> {
    let map = &rect.map;
    let area = match kind {
        HeaderKind::Column => Rect::new(rect.rect.left, 0, rect.rect.right, map.height),
        HeaderKind::Row => Rect::new(0, rect.rect.top, map.width, rect.rect.bottom),
        HeaderKind::Cell => rect.rect,
    };
    let cells = map
        .cells_in_rect(area)
        .into_iter()
        .map(|pos| Ok((pos, rect.cell(pos)?)))
        .collect::<TableResult<Vec<_>>>()?;
    for (pos, cell) in &cells {
        if cell.kind() == NodeKind::HeaderCell {
            tr.set_node_markup(rect.table_start + pos, Some(NodeKind::Cell), cell.attrs().clone())?;
        }
    }
    if tr.steps().is_empty() {
        for (pos, cell) in &cells {
            tr.set_node_markup(rect.table_start + pos, Some(NodeKind::HeaderCell), cell.attrs().clone())?;
        }
    }
    Ok(())
}

fn toggle_header_current(tr: &mut Transaction, rect: &TableRect, kind: HeaderKind) -> TableResult<()> {
    let map = &rect.map;
    let row_enabled = header_enabled(HeaderKind::Row, rect)?;
    let column_enabled = header_enabled(HeaderKind::Column, rect)?;
    let (area, new_kind) = match kind {
        HeaderKind::Column => {
            let top = usize::from(row_enabled);
            let kind = if column_enabled { NodeKind::Cell } else { NodeKind::HeaderCell };
            (Rect::new(0, top, 1, map.height), kind)
        }
        HeaderKind::Row => {
            let left = usize::from(column_enabled);
            let kind = if row_enabled { NodeKind::Cell } else { NodeKind::HeaderCell };
            (Rect::new(left, 0, map.width, 1), kind)
        }
        HeaderKind::Cell => {
            let cells = map.cells_in_rect(rect.rect);
            let mut all_headers = true;
            for &pos in &cells {
                all_headers &= rect.cell(pos)?.kind() == NodeKind::HeaderCell;
            }
            let kind = if all_headers { NodeKind::Cell } else { NodeKind::HeaderCell };
            (rect.rect, kind)
        }
    };
    for pos in map.cells_in_rect(area) {
        let at = rect.table_start + pos;
        if let Some(cell) = tr.doc().node_at(at) {
            tr.set_node_markup(at, Some(new_kind), cell.attrs().clone())?;
        }
    }
    Ok(())
}

/// Toggle header role for the selected rows, columns or cells
pub fn toggle_header(
    state: &EditorState,
    dispatch: Dispatch,
    kind: HeaderKind,
    strategy: HeaderStrategy,
) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    if let Some(dispatch) = dispatch {
        let rect = selected_rect(state)?;
        let mut tr = state.tr();
        match strategy {
            HeaderStrategy::Legacy => toggle_header_legacy(&mut tr, &rect, kind)?,
            HeaderStrategy::Current => toggle_header_current(&mut tr, &rect, kind)?,
        }
        debug!(?kind, ?strategy, "toggled header");
        finish("toggle_header", tr, dispatch);
    }
    Ok(true)
}

pub fn toggle_header_row(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    toggle_header(state, dispatch, HeaderKind::Row, HeaderStrategy::Legacy)
}

pub fn toggle_header_column(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    toggle_header(state, dispatch, HeaderKind::Column, HeaderStrategy::Legacy)
}

pub fn toggle_header_cell(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    toggle_header(state, dispatch, HeaderKind::Cell, HeaderStrategy::Legacy)
}

/// Position of the cell before or after `cell` in reading order, crossing
/// row boundaries and skipping empty rows
fn find_next_cell(cell: &ResolvedPos, dir: Direction) -> Option<usize> {
    let depth = cell.depth();
    let table = cell.node(depth.checked_sub(1)?);
    match dir {
        Direction::Backward => {
            if let Some(before) = cell.node_before() {
                return Some(cell.pos - before.node_size());
            }
            let mut row_end = cell.before(depth);
            for row in (0..cell.index(depth - 1)).rev() {
                let row_node = table.child(row);
                if let Some(last) = row_node.last_child() {
                    return Some(row_end - 1 - last.node_size());
                }
                row_end -= row_node.node_size();
            }
        }
        Direction::Forward => {
            if cell.index(depth) + 1 < cell.parent().child_count() {
                return cell.node_after().map(|node| cell.pos + node.node_size());
            }
            let mut row_start = cell.after(depth);
            for row in cell.index(depth - 1) + 1..table.child_count() {
                let row_node = table.child(row);
                if row_node.child_count() > 0 {
                    return Some(row_start + 1);
                }
                row_start += row_node.node_size();
            }
        }
    }
    None
}

/// Select the content of the next or previous cell
pub fn go_to_next_cell(state: &EditorState, dispatch: Dispatch, dir: Direction) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    let Some(next) = find_next_cell(&selection_cell(state)?, dir) else {
        return Ok(false);
    };
    if let Some(dispatch) = dispatch {
        let next = state.doc().resolve(next)?;
        let selection = TextSelection::between(&next, &move_cell_forward(&next)?, None)?;
        let mut tr = state.tr();
        tr.set_selection(selection.into());
        finish("go_to_next_cell", tr, dispatch);
    }
    Ok(true)
}

/// Delete the table around the selection anchor. A table that is the only
/// child of its parent is replaced by an empty paragraph.
pub fn delete_table(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    let anchor = state.doc().resolve(state.selection().anchor())?;
    for depth in (1..=anchor.depth()).rev() {
        if anchor.node(depth).table_role() != Some(TableRole::Table) {
            continue;
        }
        if let Some(dispatch) = dispatch {
            let mut tr = state.tr();
            let (from, to) = (anchor.before(depth), anchor.after(depth));
            if anchor.node(depth - 1).child_count() == 1 {
                let paragraph = Node::new(NodeKind::Paragraph, Attrs::new(), Fragment::empty());
                tr.replace_with(from, to, paragraph)?;
            } else {
                tr.delete(from, to)?;
            }
            finish("delete_table", tr, dispatch);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Clear the content of every selected cell
pub fn delete_cell_selection(state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
    let Some(sel) = state.selection().as_cell() else {
        return Ok(false);
    };
    if let Some(dispatch) = dispatch {
        let base = empty_cell(NodeKind::Cell)?.content().clone();
        let mut cells = Vec::new();
        sel.for_each_cell(&mut |cell, pos| {
            if cell.content() != &base {
                cells.push((pos, cell.node_size()));
            }
        })?;
        let mut tr = state.tr();
        for (pos, size) in cells {
            let from = tr.mapping().map(pos + 1);
            let to = tr.mapping().map(pos + size - 1);
            tr.replace(from, to, Slice::closed(base.clone()))?;
        }
        if tr.doc_changed() {
            finish("delete_cell_selection", tr, dispatch);
        }
    }
    Ok(true)
}

/// A table command in serializable form, tagged by `command`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TableCommand {
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    MergeCells,
    SetCellAttr {
        name: String,
        value: Value,
    },
    ToggleHeader {
        kind: HeaderKind,
        #[serde(default)]
        strategy: HeaderStrategy,
    },
    ToggleHeaderRow,
    ToggleHeaderColumn,
    ToggleHeaderCell,
    GoToNextCell {
        direction: Direction,
    },
    DeleteTable,
    DeleteCellSelection,
}

impl TableCommand {
    pub fn run(&self, state: &EditorState, dispatch: Dispatch) -> TableResult<bool> {
        match self {
            TableCommand::AddColumnBefore => add_column_before(state, dispatch),
            TableCommand::AddColumnAfter => add_column_after(state, dispatch),
            TableCommand::DeleteColumn => delete_column(state, dispatch),
            TableCommand::AddRowBefore => add_row_before(state, dispatch),
            TableCommand::AddRowAfter => add_row_after(state, dispatch),
            TableCommand::DeleteRow => delete_row(state, dispatch),
            TableCommand::MergeCells => merge_cells(state, dispatch),
            TableCommand::SetCellAttr { name, value } => set_cell_attr(state, dispatch, name, value.clone()),
            TableCommand::ToggleHeader { kind, strategy } => toggle_header(state, dispatch, *kind, *strategy),
            TableCommand::ToggleHeaderRow => toggle_header_row(state, dispatch),
            TableCommand::ToggleHeaderColumn => toggle_header_column(state, dispatch),
            TableCommand::ToggleHeaderCell => toggle_header_cell(state, dispatch),
            TableCommand::GoToNextCell { direction } => go_to_next_cell(state, dispatch, *direction),
            TableCommand::DeleteTable => delete_table(state, dispatch),
            TableCommand::DeleteCellSelection => delete_cell_selection(state, dispatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use tabula_model::builders::*;

    fn cursor(d: Node, pos: usize) -> EditorState {
        let selection = TextSelection::create(&d, pos, pos).unwrap();
        EditorState::new(d, selection.into())
    }

    fn cells(d: Node, anchor: usize, head: usize) -> EditorState {
        let selection = CellSelection::create(&d, anchor, head).unwrap();
        EditorState::new(d, selection.into())
    }

    fn run(state: &EditorState, command: TableCommand) -> EditorState {
        let mut dispatched = None;
        let applied = command
            .run(state, Some(&mut |tr: Transaction| dispatched = Some(tr)))
            .unwrap();
        assert!(applied, "{command:?} did not apply");
        state.apply(dispatched.expect("no transaction")).unwrap()
    }

    // cells at 2 and 7 in row 0, 14 and 19 in row 1; text one past + 2
    fn doc_2x2() -> Node {
        doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])])
    }

    #[test]
    fn test_add_column_after_copies_left_column() {
        let next = run(&cursor(doc_2x2(), 4), TableCommand::AddColumnAfter);
        assert_eq!(
            next.doc(),
            &doc([table([tr([td("a"), td(""), td("b")]), tr([td("c"), td(""), td("d")])])])
        );
    }

    #[test]
    fn test_add_column_at_header_column() {
        let d = doc([table([tr([th("a"), td("b")]), tr([th("c"), td("d")])])]);
        let next = run(&cursor(d.clone(), 4), TableCommand::AddColumnBefore);
        assert_eq!(
            next.doc(),
            &doc([table([tr([th(""), th("a"), td("b")]), tr([th(""), th("c"), td("d")])])])
        );
        let next = run(&cursor(d, 4), TableCommand::AddColumnAfter);
        assert_eq!(
            next.doc(),
            &doc([table([tr([th("a"), th(""), td("b")]), tr([th("c"), th(""), td("d")])])])
        );
    }

    #[test]
    fn test_add_column_widens_spanning_cell() {
        let d = doc([table([tr([td_with(2, 1, "a")]), tr([td("b"), td("c")])])]);
        // row 0 is 7 wide, so "b" sits at 9 with its text at 11
        let next = run(&cursor(d, 11), TableCommand::AddColumnAfter);
        assert_eq!(
            next.doc(),
            &doc([table([tr([td_with(3, 1, "a")]), tr([td("b"), td(""), td("c")])])])
        );
    }

    #[test]
    fn test_delete_column() {
        let next = run(&cursor(doc_2x2(), 9), TableCommand::DeleteColumn);
        assert_eq!(next.doc(), &doc([table([tr([td("a")]), tr([td("c")])])]));
    }

    #[test]
    fn test_delete_last_column_is_refused() {
        let state = cursor(doc([table([tr([td("a")]), tr([td("b")])])]), 4);
        assert!(!delete_column(&state, None).unwrap());
        let mut called = false;
        let applied = delete_column(&state, Some(&mut |_: Transaction| called = true)).unwrap();
        assert!(!applied);
        assert!(!called);
    }

    #[test]
    fn test_add_row_after_header_row_uses_row_below() {
        let d = doc([table([tr([th("a"), th("b")]), tr([td("c"), td("d")])])]);
        let next = run(&cursor(d.clone(), 4), TableCommand::AddRowAfter);
        assert_eq!(
            next.doc(),
            &doc([table([tr([th("a"), th("b")]), tr([td(""), td("")]), tr([td("c"), td("d")])])])
        );
        let next = run(&cursor(d, 4), TableCommand::AddRowBefore);
        assert_eq!(next.doc().child(0).child(0), &tr([td(""), td("")]));
    }

    #[test]
    fn test_add_row_grows_rowspan() {
        let d = doc([table([tr([td_with(1, 2, "a"), td("b")]), tr([td("c")]), tr([td("d"), td("e")])])]);
        let next = run(&cursor(d, 9), TableCommand::AddRowAfter);
        assert_eq!(
            next.doc(),
            &doc([table([
                tr([td_with(1, 3, "a"), td("b")]),
                tr([td("")]),
                tr([td("c")]),
                tr([td("d"), td("e")]),
            ])])
        );
    }

    #[test]
    fn test_delete_row_moves_spanning_cell_down() {
        let d = doc([table([tr([td_with(1, 2, "a"), td("b")]), tr([td("c")])])]);
        let next = run(&cursor(d, 9), TableCommand::DeleteRow);
        assert_eq!(next.doc(), &doc([table([tr([td("a"), td("c")])])]));
    }

    #[test]
    fn test_delete_row() {
        let next = run(&cursor(doc_2x2(), 16), TableCommand::DeleteRow);
        assert_eq!(next.doc(), &doc([table([tr([td("a"), td("b")])])]));
        let whole = cells(doc_2x2(), 2, 19);
        assert!(!delete_row(&whole, None).unwrap());
    }

    #[test]
    fn test_merge_cells() {
        let next = run(&cells(doc_2x2(), 2, 19), TableCommand::MergeCells);
        let merged = cell(NodeKind::Cell, span(2, 2), [p("a"), p("b"), p("c"), p("d")]);
        assert_eq!(next.doc(), &doc([table([tr([merged]), tr([])])]));
        let sel = next.selection().as_cell().unwrap();
        assert_eq!(sel.anchor_cell().pos, 2);
    }

    #[test]
    fn test_merge_skips_empty_cells() {
        let d = doc([table([tr([td(""), td("b")])])]);
        let next = run(&cells(d, 2, 6), TableCommand::MergeCells);
        assert_eq!(next.doc(), &doc([table([tr([td_with(2, 1, "b")])])]));
    }

    #[test]
    fn test_merge_refused() {
        assert!(!merge_cells(&cursor(doc_2x2(), 4), None).unwrap());
        assert!(!merge_cells(&cells(doc_2x2(), 2, 2), None).unwrap());
        // "b" spans past the right edge of the a..d rectangle
        let d = doc([table([tr([td("a"), td_with(2, 1, "b")]), tr([td("c"), td("d"), td("e")])])]);
        assert!(!merge_cells(&cells(d, 2, 19), None).unwrap());
    }

    #[test]
    fn test_set_cell_attr() {
        let state = cursor(doc_2x2(), 4);
        let command = TableCommand::SetCellAttr {
            name: "background".into(),
            value: Value::from("red"),
        };
        let next = run(&state, command.clone());
        let cell = next.doc().node_at(2).unwrap();
        assert_eq!(cell.attrs().get("background"), Some(&Value::from("red")));
        assert!(!command.run(&next, None).unwrap());
    }

    #[test]
    fn test_set_cell_attr_on_selection() {
        let state = cells(doc_2x2(), 2, 7);
        let next = run(
            &state,
            TableCommand::SetCellAttr {
                name: "align".into(),
                value: Value::from("center"),
            },
        );
        for pos in [2, 7] {
            let cell = next.doc().node_at(pos).unwrap();
            assert_eq!(cell.attrs().get("align"), Some(&Value::from("center")));
        }
        assert!(next.doc().node_at(14).unwrap().attrs().get("align").is_none());
    }

    #[test]
    fn test_toggle_header_row_legacy() {
        let state = cursor(doc_2x2(), 4);
        let next = run(&state, TableCommand::ToggleHeaderRow);
        assert_eq!(next.doc().child(0).child(0), &tr([th("a"), th("b")]));
        let back = run(&next, TableCommand::ToggleHeaderRow);
        assert_eq!(back.doc(), &doc_2x2());
    }

    #[test]
    fn test_toggle_header_column_strategies_differ() {
        let d = doc([table([tr([th("a"), th("b")]), tr([td("c"), td("d")])])]);
        let current = run(
            &cursor(d.clone(), 4),
            TableCommand::ToggleHeader {
                kind: HeaderKind::Column,
                strategy: HeaderStrategy::Current,
            },
        );
        assert_eq!(
            current.doc(),
            &doc([table([tr([th("a"), th("b")]), tr([th("c"), td("d")])])])
        );
        let legacy = run(
            &cursor(d, 4),
            TableCommand::ToggleHeader {
                kind: HeaderKind::Column,
                strategy: HeaderStrategy::Legacy,
            },
        );
        assert_eq!(
            legacy.doc(),
            &doc([table([tr([td("a"), th("b")]), tr([td("c"), td("d")])])])
        );
    }

    #[test]
    fn test_toggle_header_cell_current() {
        let state = cells(doc_2x2(), 2, 7);
        let command = TableCommand::ToggleHeader {
            kind: HeaderKind::Cell,
            strategy: HeaderStrategy::Current,
        };
        let next = run(&state, command.clone());
        assert_eq!(next.doc().child(0).child(0), &tr([th("a"), th("b")]));
        let back = run(&next, command);
        assert_eq!(back.doc(), &doc_2x2());
    }

    #[test]
    fn test_go_to_next_cell() {
        let state = cursor(doc_2x2(), 4);
        let next = run(
            &state,
            TableCommand::GoToNextCell {
                direction: Direction::Forward,
            },
        );
        assert_eq!(next.selection(), &Selection::Text(TextSelection::create(next.doc(), 9, 10).unwrap()));
        let wrapped = run(
            &cursor(doc_2x2(), 9),
            TableCommand::GoToNextCell {
                direction: Direction::Forward,
            },
        );
        assert_eq!((wrapped.selection().from(), wrapped.selection().to()), (16, 17));
        let back = run(
            &cursor(doc_2x2(), 16),
            TableCommand::GoToNextCell {
                direction: Direction::Backward,
            },
        );
        assert_eq!((back.selection().from(), back.selection().to()), (9, 10));
        assert!(!go_to_next_cell(&state, None, Direction::Backward).unwrap());
        assert!(!go_to_next_cell(&cursor(doc_2x2(), 21), None, Direction::Forward).unwrap());
    }

    #[test]
    fn test_delete_table() {
        let d = doc([table([tr([td("a")])]), p("x")]);
        let next = run(&cursor(d, 4), TableCommand::DeleteTable);
        assert_eq!(next.doc(), &doc([p("x")]));
        let next = run(&cursor(doc_2x2(), 4), TableCommand::DeleteTable);
        assert_eq!(next.doc(), &doc([p("")]));
        assert!(!delete_table(&cursor(doc([p("x")]), 1), None).unwrap());
    }

    #[test]
    fn test_delete_cell_selection() {
        let next = run(&cells(doc_2x2(), 2, 7), TableCommand::DeleteCellSelection);
        assert_eq!(
            next.doc(),
            &doc([table([tr([td(""), td("")]), tr([td("c"), td("d")])])])
        );
        assert!(!delete_cell_selection(&cursor(doc_2x2(), 4), None).unwrap());
    }

    #[test]
    fn test_commands_outside_tables_do_not_apply() {
        let state = cursor(doc([p("x")]), 1);
        for command in [
            TableCommand::AddColumnAfter,
            TableCommand::DeleteRow,
            TableCommand::ToggleHeaderRow,
            TableCommand::MergeCells,
        ] {
            assert!(!command.run(&state, None).unwrap());
        }
    }

    #[test]
    fn test_command_json() {
        let command: TableCommand = serde_json::from_str(r#"{"command":"toggle_header","kind":"column"}"#).unwrap();
        assert_eq!(
            command,
            TableCommand::ToggleHeader {
                kind: HeaderKind::Column,
                strategy: HeaderStrategy::Current,
            }
        );
        let json = serde_json::to_value(TableCommand::GoToNextCell {
            direction: Direction::Backward,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"command": "go_to_next_cell", "direction": "backward"}));
    }
}
