//! Tests for sequences of edits and the repair that runs after each of them
//!
//! This tests:
//! - Repair of rows that lost cells
//! - Shortening rowspans after rows disappear
//! - Command chains keeping tables well formed
//! - Selections surviving structural edits

use tabula_model::builders::*;
use tabula_model::Node;
use tabula_tables::{
    fix_tables, CellSelection, EditorState, Problem, Rect, Selection, TableCommand, TableMap, TextSelection,
    Transaction, FIX_TABLES_META,
};

fn run(state: &EditorState, command: TableCommand) -> EditorState {
    let mut dispatched = None;
    assert!(command
        .run(state, Some(&mut |tr: Transaction| dispatched = Some(tr)))
        .unwrap());
    state.apply(dispatched.unwrap()).unwrap()
}

fn assert_well_formed(doc: &Node) {
    let map = TableMap::get(doc.child(0)).unwrap();
    assert!(map.problems.is_empty(), "{:?}", map.problems);
}

#[test]
fn test_missing_cells_are_added_to_the_short_row() {
    let d = doc([table([
        tr([td("a"), td("b"), td("c"), td("d")]),
        tr([td("e")]),
    ])]);
    let state = EditorState::create(d).unwrap();
    let map = TableMap::get(state.doc().child(0)).unwrap();
    assert_eq!(map.problems, vec![Problem::Missing { row: 1, n: 3 }]);

    let fix = fix_tables(&state, None).unwrap().unwrap();
    assert_eq!(fix.get_meta(FIX_TABLES_META), Some(&serde_json::Value::Bool(true)));
    let table = fix.doc().child(0);
    assert_eq!(table.child(0).child_count(), 4);
    assert_eq!(table.child(1), &tr_cells(&["e", "", "", ""]));
    assert!(TableMap::get(table).unwrap().problems.is_empty());
}

fn tr_cells(texts: &[&str]) -> Node {
    tr(texts.iter().map(|text| td(text)))
}

#[test]
fn test_deleting_a_row_shortens_rowspans() {
    let d = doc([table([tr([td_with(1, 2, "a"), td("b")]), tr([td("c")])])]);
    let state = EditorState::create(d).unwrap();
    let mut edit = state.tr();
    // second row spans 13..20
    edit.delete(13, 20).unwrap();
    let next = state.apply(edit).unwrap();
    assert_eq!(next.doc(), &doc([table([tr([td("a"), td("b")])])]));
}

#[test]
fn test_deleting_a_cell_is_repaired_in_the_same_cycle() {
    let d = doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])]);
    let state = EditorState::create(d).unwrap();
    let mut edit = state.tr();
    edit.delete(14, 19).unwrap();
    let next = state.apply(edit).unwrap();
    assert_eq!(
        next.doc(),
        &doc([table([tr([td("a"), td("b")]), tr([td("d"), td("")])])])
    );
}

#[test]
fn test_unrelated_edits_skip_broken_tables() {
    let broken = table([tr([td("a"), td("b")]), tr([td("c")])]);
    let d = doc([broken, p("text")]);
    let state = EditorState::create(d.clone()).unwrap();
    let mut edit = state.tr();
    // edit inside the trailing paragraph only
    let end = d.content().size() - 1;
    edit.insert(end, Node::text("!")).unwrap();
    let next = state.apply(edit).unwrap();
    let map = TableMap::get(next.doc().child(0)).unwrap();
    assert_eq!(map.problems, vec![Problem::Missing { row: 1, n: 1 }]);
}

#[test]
fn test_command_chain_keeps_table_well_formed() {
    let d = doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])]);
    let mut state = EditorState::new(d.clone(), TextSelection::create(&d, 4, 4).unwrap().into());
    for command in [
        TableCommand::AddColumnAfter,
        TableCommand::AddRowAfter,
        TableCommand::ToggleHeaderRow,
        TableCommand::DeleteColumn,
        TableCommand::AddRowBefore,
    ] {
        state = run(&state, command);
        assert_well_formed(state.doc());
    }
    let map = TableMap::get(state.doc().child(0)).unwrap();
    assert_eq!((map.width, map.height), (2, 4));
}

#[test]
fn test_merge_then_add_column_through_span() {
    let d = doc([table([
        tr([td("a"), td("b"), td("c")]),
        tr([td("d"), td("e"), td("f")]),
    ])]);
    // select a..e
    let state = EditorState::new(d.clone(), CellSelection::create(&d, 2, 24).unwrap().into());
    let merged = run(&state, TableCommand::MergeCells);
    assert_well_formed(merged.doc());
    let map = TableMap::get(merged.doc().child(0)).unwrap();
    assert_eq!(map.find_cell(map.slots[0]).unwrap(), Rect::new(0, 0, 2, 2));

    let widened = run(&merged, TableCommand::AddColumnAfter);
    assert_well_formed(widened.doc());
    let map = TableMap::get(widened.doc().child(0)).unwrap();
    assert_eq!(map.width, 4);
    assert_eq!(map.find_cell(map.slots[0]).unwrap(), Rect::new(0, 0, 2, 2));
}

#[test]
fn test_row_selection_stays_a_row_selection_after_insert() {
    let d = doc([table([tr([td("a"), td("b")]), tr([td("c"), td("d")])])]);
    let state = EditorState::new(d.clone(), CellSelection::create(&d, 14, 19).unwrap().into());
    let next = run(&state, TableCommand::AddColumnAfter);
    let sel = next.selection().as_cell().unwrap();
    assert!(sel.is_row_selection().unwrap());
    assert_eq!(sel.rect().unwrap(), Rect::new(0, 1, 3, 2));
}

#[test]
fn test_cell_selection_falls_back_to_text_when_table_is_removed() {
    let d = doc([p("x"), table([tr([td("a"), td("b")])])]);
    let state = EditorState::new(d.clone(), CellSelection::create(&d, 5, 10).unwrap().into());
    let mut transaction = state.tr();
    transaction.delete(3, d.content().size()).unwrap();
    let mapped = transaction.selection().unwrap();
    assert!(matches!(mapped, Selection::Text(_)), "{:?}", mapped);
    assert!(mapped.from() <= 3 && mapped.from() == mapped.to());

    let next = state.apply(transaction).unwrap();
    assert_eq!(next.doc(), &doc([p("x")]));
    assert!(!next.selection().is_cell());
}
