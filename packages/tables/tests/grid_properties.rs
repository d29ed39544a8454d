//! Properties of the grid mapper, rectangle queries and selections
//!
//! This tests:
//! - Slot coverage for tables with and without spans
//! - Rectangle lookups agreeing with each other
//! - Defect reporting on malformed tables
//! - Selection serialization

use tabula_model::builders::*;
use tabula_model::Node;
use tabula_tables::{map_cache, CacheStrategy, CellSelection, Problem, Rect, Selection, TableMap};

fn plain_3x3() -> Node {
    table([
        tr([td("a"), td("b"), td("c")]),
        tr([td("d"), td("e"), td("f")]),
        tr([td("g"), td("h"), td("i")]),
    ])
}

fn spanning() -> Node {
    table([
        tr([td_with(2, 1, "a"), td_with(1, 3, "b")]),
        tr([td_with(1, 2, "c"), td("d")]),
        tr([td("e")]),
        tr([td("f"), td("g"), td("h")]),
    ])
}

#[test]
fn test_row_rects_cover_every_slot_once() {
    for table in [plain_3x3(), spanning()] {
        let map = TableMap::get(&table).unwrap();
        assert!(map.problems.is_empty(), "{:?}", map.problems);

        let mut covered = vec![0usize; map.width * map.height];
        let mut seen = Vec::new();
        for row in 0..map.height {
            for pos in map.cells_in_rect(Rect::new(0, row, map.width, row + 1)) {
                assert!(!seen.contains(&pos), "cell {pos} listed twice");
                seen.push(pos);
                let rect = map.find_cell(pos).unwrap();
                for r in rect.top..rect.bottom {
                    for c in rect.left..rect.right {
                        covered[r * map.width + c] += 1;
                    }
                }
            }
        }
        assert!(covered.iter().all(|&n| n == 1), "{covered:?}");
    }
}

#[test]
fn test_find_cell_round_trips_through_cells_in_rect() {
    let table = plain_3x3();
    let map = TableMap::get(&table).unwrap();
    for &pos in &map.slots {
        let rect = map.find_cell(pos).unwrap();
        assert_eq!(map.cells_in_rect(rect), vec![pos]);
        assert_eq!(map.rect_between(pos, pos).unwrap(), rect);
    }
}

#[test]
fn test_spanning_rects() {
    let table = spanning();
    let map = TableMap::get(&table).unwrap();
    assert_eq!((map.width, map.height), (3, 4));
    let b = map.slots[2];
    assert_eq!(map.find_cell(b).unwrap(), Rect::new(2, 0, 3, 3));
    let c = map.slots[3];
    let d = map.slots[4];
    assert_eq!(map.rect_between(c, d).unwrap(), Rect::new(0, 1, 2, 3));
}

#[test]
fn test_missing_cell_scenario() {
    let table = table([tr([td("a"), td("b")]), tr([td("c")])]);
    let map = TableMap::compute(&table).unwrap();
    assert_eq!((map.width, map.height), (2, 2));
    assert_eq!(map.problems, vec![Problem::Missing { row: 1, n: 1 }]);
    // Unfilled slots stay queryable
    assert_eq!(map.slots[3], 0);
    assert!(map.find_cell(map.slots[2]).is_ok());
}

#[test]
fn test_problems_serialize_tagged() {
    let json = serde_json::to_value(Problem::Collision { row: 1, pos: 13, n: 1 }).unwrap();
    assert_eq!(json, serde_json::json!({"type": "collision", "row": 1, "pos": 13, "n": 1}));
}

#[test]
fn test_selection_of_two_cells_in_3x3() {
    let d = doc([plain_3x3()]);
    // (0,0) is at 2 and (1,1) at 24
    let sel = CellSelection::create(&d, 2, 24).unwrap();
    assert_eq!(sel.rect().unwrap(), Rect::new(0, 0, 2, 2));
    assert!(!sel.is_col_selection().unwrap());
    assert!(!sel.is_row_selection().unwrap());
}

#[test]
fn test_selection_json_preserves_rect() {
    let d = doc([spanning()]);
    let map = TableMap::get(d.child(0)).unwrap();
    let anchor = map.slots[3] + 1;
    let head = map.slots[11] + 1;
    let sel: Selection = CellSelection::create(&d, anchor, head).unwrap().into();

    let json = serde_json::to_string(&sel.to_json()).unwrap();
    let restored = Selection::from_json(&d, &serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(restored, sel);
    assert_eq!(
        restored.as_cell().unwrap().rect().unwrap(),
        sel.as_cell().unwrap().rect().unwrap()
    );
}

#[test]
fn test_cache_strategies_return_equal_maps() {
    let tables: Vec<Node> = (0..5).map(|_| plain_3x3()).collect();

    map_cache::configure(CacheStrategy::Ring { capacity: 2 });
    for table in &tables {
        TableMap::get(table).unwrap();
    }
    assert_eq!(map_cache::len(), 2);
    let ring = TableMap::get(&tables[0]).unwrap();

    map_cache::configure(CacheStrategy::Weak);
    let weak = TableMap::get(&tables[0]).unwrap();
    assert_eq!(ring, weak);
    assert_eq!(*weak, TableMap::compute(&tables[0]).unwrap());
}
