//! # Clipboard Area Engine
//!
//! Pasting into tables works on [`Area`]s: detached rectangular blocks of
//! cells. [`paste_cells`] turns a clipboard slice into an area,
//! [`clip_cells`] stretches or cuts it to the size of the target rectangle
//! and [`insert_cells`] writes it into a table, growing the table and
//! splitting spanning cells that cross the target's edges first.
//!
//! When an area is clipped to a larger rectangle, rows repeat from the top
//! (so a small block can be tiled down a selection) while each row is
//! stretched sideways by cloning its last cell.

use std::rc::Rc;

use tabula_model::{Attrs, Fragment, Node, NodeKind, Slice, TableRole};
use tracing::debug;

use crate::cell_selection::CellSelection;
use crate::errors::{TableError, TableResult};
use crate::state::{Dispatch, EditorState, Transaction};
use crate::table_map::{Rect, TableMap};
use crate::util::{is_in_table, remove_col_span, selection_cell, table_of};

/// Rectangular block of cells. `rows[i]` holds the cells starting in row
/// `i`; cells carried down by a rowspan are not repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<Fragment>,
}

/// Turn pasted content into an area, or `None` when it does not consist of
/// rows or cells
pub fn paste_cells(slice: &Slice) -> TableResult<Option<Area>> {
    if slice.size() == 0 {
        return Ok(None);
    }
    let mut content = slice.content.clone();
    let mut open_start = slice.open_start;
    let mut open_end = slice.open_end;
    while content.child_count() == 1
        && ((open_start > 0 && open_end > 0)
            || content.child(0).table_role() == Some(TableRole::Table))
    {
        open_start = open_start.saturating_sub(1);
        open_end = open_end.saturating_sub(1);
        content = content.child(0).content().clone();
    }
    let Some(first) = content.first_child() else {
        return Ok(None);
    };
    let rows = match first.table_role() {
        Some(TableRole::Row) => content
            .iter()
            .map(|row| close_cells(row.content()))
            .collect::<TableResult<Vec<_>>>()?,
        Some(role) if role.is_cell() => vec![close_cells(&content)?],
        _ => return Ok(None),
    };
    ensure_rectangular(rows).map(Some)
}

/// Keep the cells of a fragment, giving cut-open cells without content an
/// empty paragraph
fn close_cells(content: &Fragment) -> TableResult<Fragment> {
    let mut cells = Vec::with_capacity(content.child_count());
    for cell in content.iter() {
        if !cell.table_role().is_some_and(TableRole::is_cell) {
            continue;
        }
        if cell.child_count() == 0 {
            cells.push(cell.copy(Fragment::from_node(empty_paragraph())));
        } else {
            cells.push(cell.clone());
        }
    }
    Ok(Fragment::from_vec(cells))
}

/// Pad rows with empty cells until every row covers the same width
fn ensure_rectangular(mut rows: Vec<Fragment>) -> TableResult<Area> {
    let mut widths: Vec<usize> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        for cell in row.iter() {
            let rowspan = cell.attrs().rowspan();
            if widths.len() < i + rowspan {
                widths.resize(i + rowspan, 0);
            }
            for width in &mut widths[i..i + rowspan] {
                *width += cell.attrs().colspan();
            }
        }
    }
    let width = widths.iter().copied().max().unwrap_or(0);
    for r in 0..rows.len().max(widths.len()) {
        let row_width = widths.get(r).copied().unwrap_or(0);
        if r >= rows.len() {
            rows.push(Fragment::empty());
        }
        if row_width < width {
            let mut padding = Vec::with_capacity(width - row_width);
            for _ in row_width..width {
                padding.push(empty_cell(NodeKind::Cell)?);
            }
            rows[r] = rows[r].append(&Fragment::from_vec(padding));
        }
    }
    Ok(Area {
        width,
        height: rows.len(),
        rows,
    })
}

/// Resize an area to `new_width × new_height`. Extra rows repeat the area
/// from the top; extra columns clone the last cell of each row. Cells that
/// stick out of the new bounds are cropped.
pub fn clip_cells(area: &Area, new_width: usize, new_height: usize) -> TableResult<Area> {
    let mut rows = area.rows.clone();
    let mut width = area.width;
    let mut height = area.height;
    if rows.is_empty() {
        rows.push(Fragment::empty());
        height = 1;
        width = 0;
    }

    if width != new_width {
        let mut added: Vec<usize> = vec![0; rows.len()];
        let mut new_rows = Vec::with_capacity(rows.len());
        for (row, frag) in rows.iter().enumerate() {
            let mut cells = Vec::new();
            let mut col = added.get(row).copied().unwrap_or(0);
            let mut i = 0;
            while col < new_width {
                let mut cell = match frag.maybe_child(i).or(frag.last_child()) {
                    Some(cell) => cell.clone(),
                    None => empty_cell(NodeKind::Cell)?,
                };
                let colspan = cell.attrs().colspan();
                if col + colspan > new_width {
                    cell = cell.with_attrs(remove_col_span(cell.attrs(), col + colspan - new_width));
                }
                let colspan = cell.attrs().colspan();
                for j in 1..cell.attrs().rowspan() {
                    if added.len() <= row + j {
                        added.resize(row + j + 1, 0);
                    }
                    added[row + j] += colspan;
                }
                col += colspan;
                cells.push(cell);
                i += 1;
            }
            new_rows.push(Fragment::from_vec(cells));
        }
        rows = new_rows;
        width = new_width;
    }

    if height != new_height {
        let mut new_rows = Vec::with_capacity(new_height);
        for row in 0..new_height {
            let source = &rows[row % height];
            let cells = source
                .iter()
                .map(|cell| {
                    let rowspan = cell.attrs().rowspan();
                    if row + rowspan > new_height {
                        let clamped = (new_height - row).max(1);
                        cell.with_attrs(cell.attrs().clone().with("rowspan", clamped))
                    } else {
                        cell.clone()
                    }
                })
                .collect();
            new_rows.push(Fragment::from_vec(cells));
        }
        rows = new_rows;
        height = new_height;
    }

    Ok(Area {
        width,
        height,
        rows,
    })
}

/// Grow the table so it is at least `width × height`. New columns copy the
/// role of each row's last cell; new rows copy the roles of the current
/// bottom row. Returns whether anything was added.
fn grow_table(
    tr: &mut Transaction,
    map: &TableMap,
    table: &Node,
    start: usize,
    width: usize,
    height: usize,
    map_from: usize,
) -> TableResult<bool> {
    let mut grew = false;
    if width > map.width {
        let mut row_end = 0;
        for row_node in table.content().iter() {
            row_end += row_node.node_size();
            let kind = match row_node.last_child() {
                Some(last) if last.kind() == NodeKind::HeaderCell => NodeKind::HeaderCell,
                _ => NodeKind::Cell,
            };
            let mut cells = Vec::with_capacity(width - map.width);
            for _ in map.width..width {
                cells.push(empty_cell(kind)?);
            }
            let at = tr.mapping().slice(map_from).map(row_end - 1 + start);
            tr.insert(at, Fragment::from_vec(cells))?;
        }
        grew = true;
    }
    if height > map.height {
        let bottom = (map.height - 1) * map.width;
        let mut cells = Vec::with_capacity(map.width.max(width));
        for i in 0..map.width.max(width) {
            let header = i < map.width
                && table
                    .node_at(map.slots[bottom + i])
                    .is_some_and(|cell| cell.kind() == NodeKind::HeaderCell);
            cells.push(empty_cell(if header {
                NodeKind::HeaderCell
            } else {
                NodeKind::Cell
            })?);
        }
        let row = Node::new(NodeKind::Row, Attrs::new(), Fragment::from_vec(cells));
        let rows = vec![row; height - map.height];
        let at = tr.mapping().slice(map_from).map(start + table.node_size() - 2);
        tr.insert(at, Fragment::from_vec(rows))?;
        grew = true;
    }
    Ok(grew)
}

/// Split cells that span across the horizontal line above row `top`
fn isolate_horizontal(
    tr: &mut Transaction,
    map: &TableMap,
    table: &Node,
    start: usize,
    left: usize,
    right: usize,
    top: usize,
    map_from: usize,
) -> TableResult<bool> {
    if top == 0 || top == map.height {
        return Ok(false);
    }
    let mut found = false;
    let mut col = left;
    while col < right {
        let index = top * map.width + col;
        let pos = map.slots[index];
        if pos != 0 && map.slots[index - map.width] == pos {
            found = true;
            let cell = table.node_at(pos).ok_or(TableError::CellNotFound(pos))?;
            let cell_rect = map.find_cell(pos)?;
            let attrs = cell.attrs().clone();
            let at = tr.mapping().slice(map_from).map(pos + start);
            tr.set_node_markup(at, None, attrs.clone().with("rowspan", top - cell_rect.top))?;
            let lower = Node::create_and_fill(
                cell.kind(),
                attrs
                    .clone()
                    .with("rowspan", cell_rect.top + attrs.rowspan() - top),
            )
            .ok_or(TableError::Construction(cell.kind()))?;
            let at = tr
                .mapping()
                .slice(map_from)
                .map(map.position_at(top, cell_rect.left, table) + start);
            tr.insert(at, lower)?;
            col += attrs.colspan() - 1;
        }
        col += 1;
    }
    Ok(found)
}

/// Split cells that span across the vertical line left of column `left`
fn isolate_vertical(
    tr: &mut Transaction,
    map: &TableMap,
    table: &Node,
    start: usize,
    top: usize,
    bottom: usize,
    left: usize,
    map_from: usize,
) -> TableResult<bool> {
    if left == 0 || left == map.width {
        return Ok(false);
    }
    let mut found = false;
    let mut row = top;
    while row < bottom {
        let index = row * map.width + left;
        let pos = map.slots[index];
        if pos != 0 && map.slots[index - 1] == pos {
            found = true;
            let cell = table.node_at(pos).ok_or(TableError::CellNotFound(pos))?;
            let cell_left = map.col_count(pos)?;
            let attrs = cell.attrs().clone();
            let keep = left - cell_left;
            let at = tr.mapping().slice(map_from).map(pos + start);
            tr.set_node_markup(at, None, remove_col_span(&attrs, attrs.colspan() - keep))?;
            let right_part = Node::create_and_fill(cell.kind(), remove_col_span(&attrs, keep))
                .ok_or(TableError::Construction(cell.kind()))?;
            tr.insert(at + cell.node_size(), right_part)?;
            row += attrs.rowspan() - 1;
        }
        row += 1;
    }
    Ok(found)
}

struct InsertTarget {
    table: Node,
    map: Rc<TableMap>,
    map_from: usize,
}

impl InsertTarget {
    fn load(tr: &Transaction, table_start: usize) -> TableResult<InsertTarget> {
        let table = table_start
            .checked_sub(1)
            .and_then(|pos| tr.doc().node_at(pos))
            .ok_or(TableError::CellNotFound(table_start))?;
        let map = TableMap::get(&table)?;
        Ok(InsertTarget {
            table,
            map,
            map_from: tr.mapping().len(),
        })
    }
}

/// Write `cells` into the table whose content starts at `table_start`, with
/// the top-left corner at `rect`'s top-left, then select the written cells
pub fn insert_cells(
    state: &EditorState,
    dispatch: &mut dyn FnMut(Transaction),
    table_start: usize,
    rect: Rect,
    cells: &Area,
) -> TableResult<()> {
    let mut tr = state.tr();
    let mut target = InsertTarget::load(&tr, table_start)?;
    let (top, left) = (rect.top, rect.left);
    let right = left + cells.width;
    let bottom = top + cells.height;

    if grow_table(&mut tr, &target.map, &target.table, table_start, right, bottom, target.map_from)? {
        target = InsertTarget::load(&tr, table_start)?;
    }
    for edge in [top, bottom] {
        if isolate_horizontal(&mut tr, &target.map, &target.table, table_start, left, right, edge, target.map_from)? {
            target = InsertTarget::load(&tr, table_start)?;
        }
    }
    for edge in [left, right] {
        if isolate_vertical(&mut tr, &target.map, &target.table, table_start, top, bottom, edge, target.map_from)? {
            target = InsertTarget::load(&tr, table_start)?;
        }
    }

    for row in top..bottom {
        let from = target.map.position_at(row, left, &target.table);
        let to = target.map.position_at(row, right, &target.table);
        let mapping = tr.mapping().slice(target.map_from);
        let (from, to) = (mapping.map(from + table_start), mapping.map(to + table_start));
        tr.replace(from, to, Slice::closed(cells.rows[row - top].clone()))?;
    }

    let target = InsertTarget::load(&tr, table_start)?;
    let anchor = table_start + target.map.position_at(top, left, &target.table);
    let head = table_start + target.map.position_at(bottom - 1, right - 1, &target.table);
    let selection = CellSelection::create(tr.doc(), anchor, head)?;
    tr.set_selection(selection.into());
    debug!(width = cells.width, height = cells.height, top, left, "inserted cells");
    dispatch(tr);
    Ok(())
}

/// Paste handler. Inside a cell selection any content is clipped to the
/// selected rectangle (non-cell content becomes a single cell first). With a
/// cursor in a cell, pasted cells are written starting at that cell.
pub fn handle_paste(state: &EditorState, slice: &Slice, dispatch: Dispatch) -> TableResult<bool> {
    if !is_in_table(state) {
        return Ok(false);
    }
    let cells = paste_cells(slice)?;
    if let Some(sel) = state.selection().as_cell() {
        let cells = match cells {
            Some(cells) => cells,
            None => {
                let cell = Node::new(NodeKind::Cell, Attrs::new(), fit_blocks(slice));
                Area {
                    width: 1,
                    height: 1,
                    rows: vec![Fragment::from_node(cell)],
                }
            }
        };
        let (table, start) = table_of(sel.anchor_cell())?;
        let rect = TableMap::get(&table)?.rect_between(sel.anchor_cell().pos - start, sel.head_cell().pos - start)?;
        let cells = clip_cells(&cells, rect.width(), rect.height())?;
        if let Some(dispatch) = dispatch {
            insert_cells(state, dispatch, start, rect, &cells)?;
        }
        return Ok(true);
    }
    let Some(cells) = cells else {
        return Ok(false);
    };
    let cell = selection_cell(state)?;
    let (table, start) = table_of(&cell)?;
    let rect = TableMap::get(&table)?.find_cell(cell.pos - start)?;
    if let Some(dispatch) = dispatch {
        insert_cells(state, dispatch, start, rect, &cells)?;
    }
    Ok(true)
}

/// Block content fit for a cell: inline runs are wrapped in paragraphs and
/// table structure is flattened to the blocks inside its cells. Never empty.
pub fn fit_blocks(slice: &Slice) -> Fragment {
    let mut blocks = Vec::new();
    let mut inline = Vec::new();
    collect_blocks(&slice.content, &mut blocks, &mut inline);
    flush_inline(&mut blocks, &mut inline);
    if blocks.is_empty() {
        blocks.push(empty_paragraph());
    }
    Fragment::from_vec(blocks)
}

fn collect_blocks(content: &Fragment, blocks: &mut Vec<Node>, inline: &mut Vec<Node>) {
    for node in content.iter() {
        match node.kind() {
            NodeKind::Text => inline.push(node.clone()),
            NodeKind::Paragraph | NodeKind::Table => {
                flush_inline(blocks, inline);
                blocks.push(node.clone());
            }
            NodeKind::Doc | NodeKind::Row | NodeKind::Cell | NodeKind::HeaderCell => {
                flush_inline(blocks, inline);
                collect_blocks(node.content(), blocks, inline);
            }
        }
    }
}

fn flush_inline(blocks: &mut Vec<Node>, inline: &mut Vec<Node>) {
    if !inline.is_empty() {
        let content = Fragment::from_vec(std::mem::take(inline));
        blocks.push(Node::new(NodeKind::Paragraph, Attrs::new(), content));
    }
}

fn empty_paragraph() -> Node {
    Node::new(NodeKind::Paragraph, Attrs::new(), Fragment::empty())
}

pub(crate) fn empty_cell(kind: NodeKind) -> TableResult<Node> {
    Node::create_and_fill(kind, Attrs::new()).ok_or(TableError::Construction(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_model::builders::*;

    fn area(rows: Vec<Node>) -> Area {
        let slice = Slice::new(Fragment::from_vec(rows), 1, 1);
        paste_cells(&slice).unwrap().unwrap()
    }

    #[test]
    fn test_paste_cells_from_rows() {
        let a = area(vec![tr([td("a"), td("b")]), tr([td("c")])]);
        assert_eq!((a.width, a.height), (2, 2));
        assert_eq!(a.rows[1], Fragment::from_vec(vec![td("c"), td("")]));
    }

    #[test]
    fn test_trailing_empty_row_is_padded() {
        let a = area(vec![tr([td("a"), td("b")]), tr(Vec::<Node>::new())]);
        assert_eq!((a.width, a.height), (2, 2));
        assert_eq!(a.rows[1], Fragment::from_vec(vec![td(""), td("")]));
        let clipped = clip_cells(&a, 2, 2).unwrap();
        assert!(clipped.rows.iter().all(|row| row.child_count() == 2));
    }

    #[test]
    fn test_paste_cells_unwraps_table() {
        let slice = Slice::closed(Fragment::from_node(table([tr([td("a")])])));
        let a = paste_cells(&slice).unwrap().unwrap();
        assert_eq!((a.width, a.height), (1, 1));
    }

    #[test]
    fn test_paste_cells_single_cell() {
        let slice = Slice::new(Fragment::from_vec(vec![td("x")]), 0, 0);
        let a = paste_cells(&slice).unwrap().unwrap();
        assert_eq!(a.rows, vec![Fragment::from_node(td("x"))]);
    }

    #[test]
    fn test_paste_cells_rejects_text() {
        let slice = Slice::new(Fragment::from_node(p("x")), 1, 1);
        assert!(paste_cells(&slice).unwrap().is_none());
        assert!(paste_cells(&Slice::empty()).unwrap().is_none());
    }

    #[test]
    fn test_clip_repeats_rows_and_clones_last_column() {
        let a = area(vec![tr([td("a"), td("b")]), tr([td("c"), td("d")])]);
        let clipped = clip_cells(&a, 3, 3).unwrap();
        assert_eq!(clipped.rows[0], Fragment::from_vec(vec![td("a"), td("b"), td("b")]));
        assert_eq!(clipped.rows[1], Fragment::from_vec(vec![td("c"), td("d"), td("d")]));
        assert_eq!(clipped.rows[2], Fragment::from_vec(vec![td("a"), td("b"), td("b")]));
    }

    #[test]
    fn test_clip_crops_spans() {
        let a = area(vec![tr([td_with(2, 2, "a")])]);
        let clipped = clip_cells(&a, 1, 1).unwrap();
        assert_eq!(clipped.rows, vec![Fragment::from_node(td_with(1, 1, "a"))]);
    }

    #[test]
    fn test_fit_blocks() {
        let slice = Slice::new(Fragment::from_vec(vec![Node::text("hi")]), 0, 0);
        assert_eq!(fit_blocks(&slice), Fragment::from_node(p("hi")));
        assert_eq!(fit_blocks(&Slice::empty()), Fragment::from_node(p("")));
        let slice = Slice::new(Fragment::from_vec(vec![tr([td("a"), td("b")])]), 1, 1);
        assert_eq!(fit_blocks(&slice), Fragment::from_vec(vec![p("a"), p("b")]));
    }
}
