//! # Tabula Tables
//!
//! Table editing on top of the tree document model: a grid view over table
//! nodes, rectangular cell selections, structural repair, clipboard
//! handling and row/column commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: Node tree, positions, transforms     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ table_map: table node → slot grid           │
//! │  - Cached per node identity (map_cache)     │
//! │  - Records defects instead of failing       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ selection / cell_selection / state          │
//! │  - Rectangles of cells, mapped across edits │
//! │  - Post-edit cycle: fix_tables, normalize   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ commands, copypaste                         │
//! │  - Add/remove rows and columns, merge       │
//! │  - Paste cell areas into tables             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Documents are immutable**: every edit yields a new tree, and grids
//!    are keyed on node identity so unchanged tables keep their map
//! 2. **Defects are data**: a malformed table can still be queried and
//!    edited; repair is best effort after each edit
//! 3. **Commands are checks first**: calling without a dispatch callback
//!    answers whether the command applies
//!
//! ## Usage
//!
//! ```rust
//! use tabula_model::builders::*;
//! use tabula_tables::{add_row_after, CellSelection, EditorState, Transaction};
//!
//! let d = doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])]);
//! let state = EditorState::new(d.clone(), CellSelection::create(&d, 2, 7).unwrap().into());
//!
//! let mut dispatched = None;
//! add_row_after(&state, Some(&mut |tr: Transaction| dispatched = Some(tr))).unwrap();
//! let next = state.apply(dispatched.unwrap()).unwrap();
//! assert_eq!(next.doc().child(0).child_count(), 3);
//! ```

mod cell_selection;
mod commands;
mod copypaste;
mod errors;
mod fix_tables;
pub mod map_cache;
mod selection;
mod state;
mod table_map;
mod util;

pub use cell_selection::{CellRange, CellSelection};
pub use commands::{
    add_column, add_column_after, add_column_before, add_row, add_row_after, add_row_before,
    column_is_header, delete_cell_selection, delete_column, delete_row, delete_table,
    go_to_next_cell, merge_cells, remove_column, remove_row, row_is_header, selected_rect,
    set_cell_attr, toggle_header, toggle_header_cell, toggle_header_column, toggle_header_row,
    HeaderKind, HeaderStrategy, TableCommand, TableRect,
};
pub use copypaste::{clip_cells, fit_blocks, handle_paste, insert_cells, paste_cells, Area};
pub use errors::{TableError, TableResult};
pub use fix_tables::fix_tables;
pub use map_cache::CacheStrategy;
pub use selection::{Selection, SelectionJson, TextSelection};
pub use state::{Dispatch, EditorState, Transaction, FIX_TABLES_META};
pub use table_map::{Axis, Direction, Problem, Rect, TableMap};
pub use util::{
    add_col_span, cell_around, cell_near, col_count, find_cell, in_same_table,
    is_in_table, move_cell_forward, next_cell, points_at_cell, remove_col_span, selection_cell,
    table_of,
};
