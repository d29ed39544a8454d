//! Identity-keyed memo of table maps.
//!
//! Nodes are immutable, so a map computed for one node allocation stays valid
//! for as long as that allocation lives. Nothing is ever invalidated
//! explicitly: a replaced table is a new allocation and simply misses.
//!
//! Two strategies are available:
//!
//! - [`CacheStrategy::Weak`] keys entries on the node's identity and keeps a
//!   weak handle next to the map. The weak handle pins the allocation's
//!   address, so a key can never be reused by a different node while its
//!   entry exists. Dead entries are swept as the cache grows.
//! - [`CacheStrategy::Ring`] keeps the last `capacity` tables (strongly) in a
//!   ring and overwrites the oldest entry on a miss.
//!
//! The cache is per thread; the document model is single-threaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tabula_model::{Node, NodeIdentity, WeakNode};
use tracing::trace;

use crate::errors::TableResult;
use crate::table_map::TableMap;

const DEFAULT_RING_CAPACITY: usize = 10;
const MIN_SWEEP_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CacheStrategy {
    Weak,
    Ring {
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Weak
    }
}

fn default_capacity() -> usize {
    DEFAULT_RING_CAPACITY
}

enum MapCache {
    Weak {
        entries: HashMap<NodeIdentity, (WeakNode, Rc<TableMap>)>,
        sweep_at: usize,
    },
    Ring {
        entries: Vec<(Node, Rc<TableMap>)>,
        capacity: usize,
        next: usize,
    },
}

impl MapCache {
    fn new(strategy: CacheStrategy) -> MapCache {
        match strategy {
            CacheStrategy::Weak => MapCache::Weak {
                entries: HashMap::new(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            },
            CacheStrategy::Ring { capacity } => MapCache::Ring {
                entries: Vec::new(),
                capacity: capacity.max(1),
                next: 0,
            },
        }
    }

    fn lookup(&self, table: &Node) -> Option<Rc<TableMap>> {
        match self {
            MapCache::Weak { entries, .. } => entries
                .get(&table.identity())
                .filter(|(weak, _)| weak.refers_to(table))
                .map(|(_, map)| map.clone()),
            MapCache::Ring { entries, .. } => entries
                .iter()
                .find(|(node, _)| node.same_identity(table))
                .map(|(_, map)| map.clone()),
        }
    }

    fn insert(&mut self, table: &Node, map: Rc<TableMap>) {
        match self {
            MapCache::Weak { entries, sweep_at } => {
                if entries.len() >= *sweep_at {
                    entries.retain(|_, (weak, _)| weak.is_alive());
                    *sweep_at = (entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
                    trace!(live = entries.len(), "swept table map cache");
                }
                entries.insert(table.identity(), (table.downgrade(), map));
            }
            MapCache::Ring {
                entries,
                capacity,
                next,
            } => {
                if entries.len() < *capacity {
                    entries.push((table.clone(), map));
                } else {
                    entries[*next] = (table.clone(), map);
                }
                *next = (*next + 1) % *capacity;
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            MapCache::Weak { entries, .. } => entries.len(),
            MapCache::Ring { entries, .. } => entries.len(),
        }
    }
}

thread_local! {
    static CACHE: RefCell<(CacheStrategy, MapCache)> =
        RefCell::new((CacheStrategy::Weak, MapCache::new(CacheStrategy::Weak)));
}

/// Switch strategy for the current thread. Existing entries are dropped.
pub fn configure(strategy: CacheStrategy) {
    CACHE.with(|cache| *cache.borrow_mut() = (strategy, MapCache::new(strategy)));
}

pub fn strategy() -> CacheStrategy {
    CACHE.with(|cache| cache.borrow().0)
}

pub fn clear() {
    configure(strategy());
}

/// Number of entries currently held, live or not
pub fn len() -> usize {
    CACHE.with(|cache| cache.borrow().1.len())
}

pub(crate) fn get_or_compute(
    table: &Node,
    compute: impl FnOnce(&Node) -> TableResult<TableMap>,
) -> TableResult<Rc<TableMap>> {
    if let Some(map) = CACHE.with(|cache| cache.borrow().1.lookup(table)) {
        trace!(identity = ?table.identity(), "table map cache hit");
        return Ok(map);
    }
    trace!(identity = ?table.identity(), "table map cache miss");
    let map = Rc::new(compute(table)?);
    CACHE.with(|cache| cache.borrow_mut().1.insert(table, map.clone()));
    Ok(map)
}
