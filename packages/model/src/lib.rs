//! # Tabula Model
//!
//! Immutable tree document model used by the table engine.
//!
//! ## Addressing
//!
//! ```text
//!  table  row  cell  p   "hi"  /p  /cell  /row  /table
//! 0      1    2     3   4    6    7      8     9      10
//! ```
//!
//! Every position is an integer offset into the document content. Entering or
//! leaving a non-text node costs one token; text costs one per character.
//! A [`ResolvedPos`] turns an offset back into a path of ancestors.
//!
//! ## Editing
//!
//! Documents never change in place. A [`Transform`] applies [`Step`]s,
//! producing new documents and a [`Mapping`] that translates positions
//! from the old document into the new one. Unchanged subtrees are shared
//! between versions, so node identity ([`Node::same_identity`]) implies
//! equal content.

pub mod builders;
mod error;
mod fragment;
mod json;
mod node;
mod replace;
mod resolved_pos;
mod slice;
mod step;
mod transform;

pub use error::{ModelError, ModelResult};
pub use fragment::Fragment;
pub use node::{Attrs, Node, NodeIdentity, NodeKind, TableRole, WeakNode};
pub use resolved_pos::ResolvedPos;
pub use slice::Slice;
pub use step::{Assoc, MapResult, Mapping, Step, StepMap};
pub use transform::Transform;
