//! # Grid Mapper
//!
//! A [`TableMap`] overlays a `width × height` grid on a table node. Each slot
//! holds the table-relative position of the cell covering it, so grid
//! questions (which cell is at row 2, column 3? which cells does a rectangle
//! cover?) become array lookups instead of tree walks.
//!
//! ```text
//!   <table>                                slots (width 3, height 2)
//!     <row> <cell 1> <cell 7 colspan=2>    [ 1,  7,  7 ]
//!     <row> <cell 22> <cell 28> <cell 34>  [22, 28, 34 ]
//! ```
//!
//! Positions are offsets from the start of the table's content, so the first
//! cell of the first row is always at 1. A slot value of 0 means no cell
//! covers it. Malformed tables still produce a map; the defects are recorded
//! in [`TableMap::problems`] for repair to pick up.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tabula_model::{Node, TableRole};
use tracing::debug;

use crate::errors::{TableError, TableResult};
use crate::map_cache;

/// Half-open grid rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl Rect {
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Rect {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }
}

/// Structural defect found while building a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Problem {
    /// The cell at `pos` tried to occupy `n` slots already taken
    Collision { row: usize, pos: usize, n: usize },
    /// Row `row` leaves `n` slots uncovered
    Missing { row: usize, n: usize },
    /// The cell at `pos` spans `n` rows past the bottom of the table
    OverlongRowspan { pos: usize, n: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horiz,
    Vert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Backward,
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    /// Row-major slots, `width * height` long
    pub slots: Vec<usize>,
    /// Defects, empty for a well-formed table
    pub problems: Vec<Problem>,
}

impl TableMap {
    /// Map for `table`, memoized on the node's identity
    pub fn get(table: &Node) -> TableResult<Rc<TableMap>> {
        map_cache::get_or_compute(table, TableMap::compute)
    }

    /// Build the map for `table` without consulting the cache
    pub fn compute(table: &Node) -> TableResult<TableMap> {
        if table.table_role() != Some(TableRole::Table) {
            return Err(TableError::NotATable(table.kind()));
        }
        let width = find_width(table);
        let height = table.child_count();
        let mut slots = vec![0; width * height];
        let mut problems = Vec::new();
        let mut map_pos = 0;
        let mut pos = 0;

        for (row, row_node) in table.content().iter().enumerate() {
            pos += 1;
            let mut cells = row_node.content().iter();
            loop {
                while map_pos < slots.len() && slots[map_pos] != 0 {
                    map_pos += 1;
                }
                let Some(cell) = cells.next() else { break };
                let colspan = cell.attrs().colspan();
                let rowspan = cell.attrs().rowspan();
                for h in 0..rowspan {
                    if h + row >= height {
                        problems.push(Problem::OverlongRowspan {
                            pos,
                            n: rowspan - h,
                        });
                        break;
                    }
                    let start = map_pos + h * width;
                    for w in 0..colspan {
                        match slots.get_mut(start + w) {
                            Some(slot) if *slot == 0 => *slot = pos,
                            _ => problems.push(Problem::Collision {
                                row,
                                pos,
                                n: colspan - w,
                            }),
                        }
                    }
                }
                map_pos += colspan;
                pos += cell.node_size();
            }
            let expected = (row + 1) * width;
            let mut missing = 0;
            while map_pos < expected {
                if slots[map_pos] == 0 {
                    missing += 1;
                }
                map_pos += 1;
            }
            if missing > 0 {
                problems.push(Problem::Missing { row, n: missing });
            }
            pos += 1;
        }

        debug!(width, height, problems = problems.len(), "computed table map");
        Ok(TableMap {
            width,
            height,
            slots,
            problems,
        })
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Rectangle covered by the cell at table-relative `pos`
    pub fn find_cell(&self, pos: usize) -> TableResult<Rect> {
        let index = self.index_of(pos)?;
        let left = index % self.width;
        let top = index / self.width;
        let mut right = left + 1;
        let mut bottom = top + 1;
        while right < self.width && self.slots[top * self.width + right] == pos {
            right += 1;
        }
        while bottom < self.height && self.slots[bottom * self.width + left] == pos {
            bottom += 1;
        }
        Ok(Rect {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Leftmost column of the cell at `pos`
    pub fn col_count(&self, pos: usize) -> TableResult<usize> {
        Ok(self.index_of(pos)? % self.width)
    }

    /// Cell one grid step away from `pos`, `None` at the table edge
    pub fn next_cell(&self, pos: usize, axis: Axis, dir: Direction) -> TableResult<Option<usize>> {
        let rect = self.find_cell(pos)?;
        let index = match (axis, dir) {
            (Axis::Horiz, Direction::Backward) if rect.left == 0 => return Ok(None),
            (Axis::Horiz, Direction::Forward) if rect.right == self.width => return Ok(None),
            (Axis::Vert, Direction::Backward) if rect.top == 0 => return Ok(None),
            (Axis::Vert, Direction::Forward) if rect.bottom == self.height => return Ok(None),
            (Axis::Horiz, Direction::Backward) => rect.top * self.width + rect.left - 1,
            (Axis::Horiz, Direction::Forward) => rect.top * self.width + rect.right,
            (Axis::Vert, Direction::Backward) => (rect.top - 1) * self.width + rect.left,
            (Axis::Vert, Direction::Forward) => rect.bottom * self.width + rect.left,
        };
        Ok(Some(self.slots[index]).filter(|&pos| pos != 0))
    }

    /// Bounding rectangle of the cells at `a` and `b`
    pub fn rect_between(&self, a: usize, b: usize) -> TableResult<Rect> {
        Ok(self.find_cell(a)?.union(&self.find_cell(b)?))
    }

    /// Positions of the cells whose top-left corner lies inside `rect`, in
    /// row-major order
    pub fn cells_in_rect(&self, rect: Rect) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        for row in rect.top..rect.bottom {
            for col in rect.left..rect.right {
                let index = row * self.width + col;
                let pos = self.slots[index];
                if pos == 0 || result.contains(&pos) {
                    continue;
                }
                let continues_left = col == rect.left && col > 0 && self.slots[index - 1] == pos;
                let continues_above =
                    row == rect.top && row > 0 && self.slots[index - self.width] == pos;
                if continues_left || continues_above {
                    continue;
                }
                result.push(pos);
            }
        }
        result
    }

    /// Table-relative position at which a cell starting at (`row`, `col`)
    /// would be inserted. Slots carried down from earlier rows are skipped;
    /// past the last cell this is the end of the row's content.
    pub fn position_at(&self, row: usize, col: usize, table: &Node) -> usize {
        let mut row_start = 0;
        for (i, row_node) in table.content().iter().enumerate() {
            let row_end = row_start + row_node.node_size();
            if i == row {
                let mut index = col + row * self.width;
                let row_end_index = (row + 1) * self.width;
                while index < row_end_index && self.slots[index] < row_start {
                    index += 1;
                }
                return if index == row_end_index {
                    row_end - 1
                } else {
                    self.slots[index]
                };
            }
            row_start = row_end;
        }
        row_start
    }

    fn index_of(&self, pos: usize) -> TableResult<usize> {
        if pos == 0 {
            return Err(TableError::CellNotFound(pos));
        }
        self.slots
            .iter()
            .position(|&slot| slot == pos)
            .ok_or(TableError::CellNotFound(pos))
    }
}

/// Widest row, counting slots carried down by rowspans from rows above
fn find_width(table: &Node) -> usize {
    let mut width = 0;
    let mut has_rowspan = false;
    for (row, row_node) in table.content().iter().enumerate() {
        let mut row_width = 0;
        if has_rowspan {
            for (j, prev) in table.content().iter().take(row).enumerate() {
                for cell in prev.content().iter() {
                    if j + cell.attrs().rowspan() > row {
                        row_width += cell.attrs().colspan();
                    }
                }
            }
        }
        for cell in row_node.content().iter() {
            row_width += cell.attrs().colspan();
            if cell.attrs().rowspan() > 1 {
                has_rowspan = true;
            }
        }
        width = width.max(row_width);
    }
    width
}
