//! Error types for the document model

use crate::NodeKind;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Position {pos} out of range (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("No node at position {0}")]
    NoNodeAt(usize),

    #[error("Inserted content deeper than insertion position")]
    ReplaceTooDeep,

    #[error("Inconsistent open depths")]
    InconsistentOpenDepths,

    #[error("Cannot join {sub:?} onto {main:?}")]
    CannotJoin { main: NodeKind, sub: NodeKind },

    #[error("Invalid content for {kind:?} node: {child:?} is not allowed")]
    InvalidContent { kind: NodeKind, child: NodeKind },

    #[error("Text nodes must carry text")]
    MissingText,

    #[error("Invalid node JSON: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::InvalidJson(e.to_string())
    }
}
