//! Atomic document edits and the position maps they produce.

use serde::{Deserialize, Serialize};

use crate::{Attrs, ModelError, ModelResult, Node, NodeKind, Slice};

/// Which side a position sticks to when content is inserted exactly at it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assoc {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The content on the associated side of the position was deleted
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MapRange {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// Position map for a single step: a sorted list of replaced ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<MapRange>,
}

impl StepMap {
    pub fn identity() -> StepMap {
        StepMap::default()
    }

    /// Map for replacing `old_size` tokens at `start` with `new_size` tokens
    pub fn replaced(start: usize, old_size: usize, new_size: usize) -> StepMap {
        if old_size == 0 && new_size == 0 {
            return StepMap::identity();
        }
        StepMap {
            ranges: vec![MapRange {
                start,
                old_size,
                new_size,
            }],
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let start = range.start;
            if start > pos {
                break;
            }
            let end = start + range.old_size;
            if pos <= end {
                let before = if range.old_size == 0 {
                    assoc == Assoc::Before
                } else if pos == start {
                    true
                } else if pos == end {
                    false
                } else {
                    assoc == Assoc::Before
                };
                let local = if before { 0 } else { range.new_size };
                let mapped = (start as isize + diff) as usize + local;
                let deleted = match assoc {
                    Assoc::Before => pos != start,
                    Assoc::After => pos != end,
                };
                return MapResult {
                    pos: mapped,
                    deleted,
                };
            }
            diff += range.new_size as isize - range.old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }
}

/// A sequence of step maps, applied in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append_mapping(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// Mapping made of the maps from index `from` onwards
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps.get(from..).map(<[StepMap]>::to_vec).unwrap_or_default(),
        }
    }

    /// Map a position, sticking to the content after it
    pub fn map(&self, pos: usize) -> usize {
        self.map_with(pos, Assoc::After)
    }

    pub fn map_with(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }
}

/// A single document edit
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with a slice
    Replace { from: usize, to: usize, slice: Slice },
    /// Change the kind and attributes of the node at `pos`, keeping content
    SetNodeMarkup {
        pos: usize,
        kind: NodeKind,
        attrs: Attrs,
    },
}

impl Step {
    pub fn apply(&self, doc: &Node) -> ModelResult<Node> {
        match self {
            Step::Replace { from, to, slice } => doc.replace(*from, *to, slice),
            Step::SetNodeMarkup { pos, kind, attrs } => {
                let node = doc.node_at(*pos).ok_or(ModelError::NoNodeAt(*pos))?;
                if node.is_text() {
                    return Err(ModelError::NoNodeAt(*pos));
                }
                kind.check_content(node.content())?;
                let updated = node.with_markup(*kind, attrs.clone());
                doc.replace(
                    *pos,
                    *pos + node.node_size(),
                    &Slice::closed(updated.into()),
                )
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice } => StepMap::replaced(*from, to - from, slice.size()),
            Step::SetNodeMarkup { .. } => StepMap::identity(),
        }
    }
}
