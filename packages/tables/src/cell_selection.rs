//! # Cell Selection
//!
//! A rectangular selection of table cells, defined by an anchor cell and a
//! head cell. Both are resolved positions pointing directly before a cell of
//! the same table; the selected rectangle is the bounding box of the two
//! cells, which may pull in more cells when spans are involved.
//!
//! Each selected cell contributes one range (its content). The head cell's
//! range always comes first, so replacing with content puts that content into
//! the cell the user is looking at.

use std::fmt;
use std::rc::Rc;

use tabula_model::{Attrs, Fragment, Mapping, Node, ResolvedPos, Slice};

use crate::copypaste::fit_blocks;
use crate::errors::{TableError, TableResult};
use crate::selection::{find_text_pos, Selection, TextSelection};
use crate::state::Transaction;
use crate::table_map::{Direction, Rect, TableMap};
use crate::util::{in_same_table, points_at_cell, remove_col_span, table_of};

/// Content range of one selected cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub from: usize,
    pub to: usize,
}

#[derive(Clone)]
pub struct CellSelection {
    anchor_cell: ResolvedPos,
    head_cell: ResolvedPos,
    ranges: Vec<CellRange>,
}

impl CellSelection {
    /// Selection spanning from `anchor_cell` to `head_cell`. Both must point
    /// at cells in the same table.
    pub fn new(anchor_cell: ResolvedPos, head_cell: ResolvedPos) -> TableResult<CellSelection> {
        if !points_at_cell(&anchor_cell) {
            return Err(TableError::NotACell(anchor_cell.pos));
        }
        if !points_at_cell(&head_cell) {
            return Err(TableError::NotACell(head_cell.pos));
        }
        if !in_same_table(&anchor_cell, &head_cell) {
            return Err(TableError::CellsInDifferentTables);
        }
        let (table, table_start) = table_of(&anchor_cell)?;
        let map = TableMap::get(&table)?;
        let head = head_cell.pos - table_start;
        let rect = map.rect_between(anchor_cell.pos - table_start, head)?;

        let mut cells = vec![head];
        cells.extend(map.cells_in_rect(rect).into_iter().filter(|&pos| pos != head));
        let mut ranges = Vec::with_capacity(cells.len());
        for pos in cells {
            let cell = table.node_at(pos).ok_or(TableError::CellNotFound(pos))?;
            let from = table_start + pos + 1;
            ranges.push(CellRange {
                from,
                to: from + cell.content().size(),
            });
        }
        Ok(CellSelection {
            anchor_cell,
            head_cell,
            ranges,
        })
    }

    /// Selection from absolute cell positions in `doc`
    pub fn create(doc: &Node, anchor_cell: usize, head_cell: usize) -> TableResult<CellSelection> {
        CellSelection::new(doc.resolve(anchor_cell)?, doc.resolve(head_cell)?)
    }

    pub fn anchor_cell(&self) -> &ResolvedPos {
        &self.anchor_cell
    }

    pub fn head_cell(&self) -> &ResolvedPos {
        &self.head_cell
    }

    /// Content ranges of the selected cells, head cell first
    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    pub fn from(&self) -> usize {
        self.ranges.iter().map(|r| r.from).min().unwrap_or(self.head_cell.pos)
    }

    pub fn to(&self) -> usize {
        self.ranges.iter().map(|r| r.to).max().unwrap_or(self.head_cell.pos)
    }

    fn table(&self) -> TableResult<(Node, usize, Rc<TableMap>)> {
        table_and_map(&self.anchor_cell)
    }

    /// Selected rectangle in grid coordinates
    pub fn rect(&self) -> TableResult<Rect> {
        let (_, start, map) = self.table()?;
        map.rect_between(self.anchor_cell.pos - start, self.head_cell.pos - start)
    }

    /// Whether the selection runs from the top to the bottom of the table
    pub fn is_col_selection(&self) -> TableResult<bool> {
        let (table, _, _) = self.table()?;
        let row_depth = self.anchor_cell.depth() - 1;
        let anchor_top = self.anchor_cell.index(row_depth);
        let head_top = self.head_cell.index(row_depth);
        if anchor_top.min(head_top) > 0 {
            return Ok(false);
        }
        let anchor_bottom = anchor_top + cell_attrs(&self.anchor_cell)?.rowspan();
        let head_bottom = head_top + cell_attrs(&self.head_cell)?.rowspan();
        Ok(anchor_bottom.max(head_bottom) == table.child_count())
    }

    /// Whether the selection runs from the left to the right edge of the table
    pub fn is_row_selection(&self) -> TableResult<bool> {
        let (_, start, map) = self.table()?;
        let anchor_left = map.col_count(self.anchor_cell.pos - start)?;
        let head_left = map.col_count(self.head_cell.pos - start)?;
        if anchor_left.min(head_left) > 0 {
            return Ok(false);
        }
        let anchor_right = anchor_left + cell_attrs(&self.anchor_cell)?.colspan();
        let head_right = head_left + cell_attrs(&self.head_cell)?.colspan();
        Ok(anchor_right.max(head_right) == map.width)
    }

    /// Smallest selection covering whole columns and containing both cells
    pub fn col_selection(anchor_cell: ResolvedPos, head_cell: ResolvedPos) -> TableResult<CellSelection> {
        let (_, start, map) = table_and_map(&anchor_cell)?;
        let doc = anchor_cell.doc().clone();
        let anchor_rect = map.find_cell(anchor_cell.pos - start)?;
        let head_rect = map.find_cell(head_cell.pos - start)?;
        let last_row = map.width * (map.height - 1);
        let (mut anchor_cell, mut head_cell) = (anchor_cell, head_cell);
        if anchor_rect.top <= head_rect.top {
            if anchor_rect.top > 0 {
                anchor_cell = doc.resolve(start + map.slots[anchor_rect.left])?;
            }
            if head_rect.bottom < map.height {
                head_cell = doc.resolve(start + map.slots[last_row + head_rect.right - 1])?;
            }
        } else {
            if head_rect.top > 0 {
                head_cell = doc.resolve(start + map.slots[head_rect.left])?;
            }
            if anchor_rect.bottom < map.height {
                anchor_cell = doc.resolve(start + map.slots[last_row + anchor_rect.right - 1])?;
            }
        }
        CellSelection::new(anchor_cell, head_cell)
    }

    /// Smallest selection covering whole rows and containing both cells
    pub fn row_selection(anchor_cell: ResolvedPos, head_cell: ResolvedPos) -> TableResult<CellSelection> {
        let (_, start, map) = table_and_map(&anchor_cell)?;
        let doc = anchor_cell.doc().clone();
        let anchor_rect = map.find_cell(anchor_cell.pos - start)?;
        let head_rect = map.find_cell(head_cell.pos - start)?;
        let (mut anchor_cell, mut head_cell) = (anchor_cell, head_cell);
        if anchor_rect.left <= head_rect.left {
            if anchor_rect.left > 0 {
                anchor_cell = doc.resolve(start + map.slots[anchor_rect.top * map.width])?;
            }
            if head_rect.right < map.width {
                head_cell = doc.resolve(start + map.slots[map.width * (head_rect.top + 1) - 1])?;
            }
        } else {
            if head_rect.left > 0 {
                head_cell = doc.resolve(start + map.slots[head_rect.top * map.width])?;
            }
            if anchor_rect.right < map.width {
                anchor_cell = doc.resolve(start + map.slots[map.width * (anchor_rect.top + 1) - 1])?;
            }
        }
        CellSelection::new(anchor_cell, head_cell)
    }

    /// Visit every selected cell with its absolute position
    pub fn for_each_cell(&self, f: &mut dyn FnMut(&Node, usize)) -> TableResult<()> {
        let (table, start, map) = self.table()?;
        let rect = map.rect_between(self.anchor_cell.pos - start, self.head_cell.pos - start)?;
        for pos in map.cells_in_rect(rect) {
            let cell = table.node_at(pos).ok_or(TableError::CellNotFound(pos))?;
            f(&cell, start + pos);
        }
        Ok(())
    }

    /// Selected cells as rows of a table slice. Cells sticking out of the
    /// rectangle are cropped: a cell that starts outside it is replaced by an
    /// empty cell of the cropped size. Selecting a whole table yields the
    /// table itself.
    pub fn content(&self) -> TableResult<Slice> {
        let (table, start, map) = self.table()?;
        let rect = map.rect_between(self.anchor_cell.pos - start, self.head_cell.pos - start)?;
        let mut seen = Vec::new();
        let mut rows = Vec::with_capacity(rect.height());
        for row in rect.top..rect.bottom {
            let mut row_content = Vec::new();
            for col in rect.left..rect.right {
                let pos = map.slots[row * map.width + col];
                if pos == 0 || seen.contains(&pos) {
                    continue;
                }
                seen.push(pos);
                let cell_rect = map.find_cell(pos)?;
                let mut cell = table.node_at(pos).ok_or(TableError::CellNotFound(pos))?;
                let extra_left = rect.left.saturating_sub(cell_rect.left);
                let extra_right = cell_rect.right.saturating_sub(rect.right);
                if extra_left > 0 || extra_right > 0 {
                    let attrs = remove_col_span(cell.attrs(), extra_left + extra_right);
                    cell = if cell_rect.left < rect.left {
                        fresh_cell(&cell, attrs)?
                    } else {
                        cell.with_attrs(attrs)
                    };
                }
                if cell_rect.top < rect.top || cell_rect.bottom > rect.bottom {
                    let rowspan = cell_rect.bottom.min(rect.bottom) - cell_rect.top.max(rect.top);
                    let attrs = cell.attrs().clone().with("rowspan", rowspan);
                    cell = if cell_rect.top < rect.top {
                        fresh_cell(&cell, attrs)?
                    } else {
                        cell.with_attrs(attrs)
                    };
                }
                row_content.push(cell);
            }
            rows.push(table.child(row).copy(Fragment::from_vec(row_content)));
        }
        let fragment = if self.is_col_selection()? && self.is_row_selection()? {
            Fragment::from_node(table)
        } else {
            Fragment::from_vec(rows)
        };
        Ok(Slice::new(fragment, 1, 1))
    }

    /// Put `content` into the head cell and clear every other selected cell,
    /// then place a cursor at the end of the former selection
    pub fn replace(&self, tr: &mut Transaction, content: Slice) -> TableResult<()> {
        let map_from = tr.steps().len();
        for (i, range) in self.ranges.iter().enumerate() {
            let mapping = tr.mapping().slice(map_from);
            let from = mapping.map(range.from);
            let to = mapping.map(range.to);
            let blocks = if i == 0 {
                fit_blocks(&content)
            } else {
                fit_blocks(&Slice::empty())
            };
            tr.replace_with(from, to, blocks)?;
        }
        let end = tr.mapping().slice(map_from).map(self.to());
        let end = tr.doc().resolve(end)?;
        if let Some(found) = find_text_pos(&end, Direction::Backward)? {
            tr.set_selection(TextSelection::cursor(found).into());
        }
        Ok(())
    }

    /// Translate through `mapping` into `doc`. The result stays a cell
    /// selection while both ends still point at cells of one table; a
    /// selection covering whole rows or columns keeps doing so when the table
    /// changed shape.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> TableResult<Selection> {
        let anchor_cell = doc.resolve(mapping.map(self.anchor_cell.pos))?;
        let head_cell = doc.resolve(mapping.map(self.head_cell.pos))?;
        if points_at_cell(&anchor_cell) && points_at_cell(&head_cell) && in_same_table(&anchor_cell, &head_cell) {
            let (old_table, _) = table_of(&self.anchor_cell)?;
            let (new_table, _) = table_of(&anchor_cell)?;
            let table_changed = !old_table.same_identity(&new_table);
            if table_changed && self.is_row_selection()? {
                return Ok(CellSelection::row_selection(anchor_cell, head_cell)?.into());
            }
            if table_changed && self.is_col_selection()? {
                return Ok(CellSelection::col_selection(anchor_cell, head_cell)?.into());
            }
            return Ok(CellSelection::new(anchor_cell, head_cell)?.into());
        }
        Ok(TextSelection::between(&anchor_cell, &head_cell, None)?.into())
    }
}

/// Equal when anchor and head positions are equal, even if a swapped pair
/// would cover the same rectangle
impl PartialEq for CellSelection {
    fn eq(&self, other: &Self) -> bool {
        self.anchor_cell.pos == other.anchor_cell.pos && self.head_cell.pos == other.head_cell.pos
    }
}

impl fmt::Debug for CellSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellSelection({}, {})", self.anchor_cell.pos, self.head_cell.pos)
    }
}

fn table_and_map(cell: &ResolvedPos) -> TableResult<(Node, usize, Rc<TableMap>)> {
    let (table, start) = table_of(cell)?;
    let map = TableMap::get(&table)?;
    Ok((table, start, map))
}

fn cell_attrs(cell: &ResolvedPos) -> TableResult<Attrs> {
    cell.node_after()
        .map(|node| node.attrs().clone())
        .ok_or(TableError::NotACell(cell.pos))
}

fn fresh_cell(like: &Node, attrs: Attrs) -> TableResult<Node> {
    Node::create_and_fill(like.kind(), attrs).ok_or(TableError::Construction(like.kind()))
}
