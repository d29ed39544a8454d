//! Error types for the table engine

use tabula_model::{ModelError, NodeKind};
use thiserror::Error;

pub type TableResult<T> = Result<T, TableError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// A table-relative position matched no slot of the grid. Positions must
    /// be re-derived after every edit.
    #[error("No cell with offset {0} found")]
    CellNotFound(usize),

    #[error("Could not create a default {0} node")]
    Construction(NodeKind),

    #[error("Expected a table node, found {0}")]
    NotATable(NodeKind),

    #[error("Expected a cell at position {0}")]
    NotACell(usize),

    #[error("No cell around position {0}")]
    NoCellAround(usize),

    #[error("Cells are not in the same table")]
    CellsInDifferentTables,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
