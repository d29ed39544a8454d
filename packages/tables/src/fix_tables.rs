//! # Structural Repair
//!
//! Tables can end up malformed after arbitrary edits: a row may lose cells,
//! or a rowspan may run past the last row. [`fix_tables`] scans the tables of
//! a document (only the parts that changed, when the previous document is
//! known) and builds one transaction that repairs them.
//!
//! - Missing cells are added, either at the start of the row (when the gap
//!   looks like a bite out of the left side of a block of rows) or at the end.
//!   New cells copy the role of the row's first cell.
//! - Overlong rowspans are shortened to end at the last row.
//! - Collisions are reported but left in place.

use tabula_model::{Attrs, Fragment, Node, NodeKind, TableRole};
use tracing::{debug, warn};

use crate::errors::{TableError, TableResult};
use crate::state::{EditorState, Transaction, FIX_TABLES_META};
use crate::table_map::{Problem, TableMap};

/// Repair transaction for the tables of `state`, or `None` when every
/// table is well formed. With `old_doc`, only subtrees that are not shared
/// with it are inspected.
pub fn fix_tables(state: &EditorState, old_doc: Option<&Node>) -> TableResult<Option<Transaction>> {
    let mut tables = Vec::new();
    let mut check = |node: &Node, pos: usize| {
        if node.table_role() == Some(TableRole::Table) {
            tables.push((node.clone(), pos));
        }
        true
    };
    match old_doc {
        None => state.doc().descendants(&mut check),
        Some(old) if old.same_identity(state.doc()) => {}
        Some(old) => changed_descendants(old, state.doc(), 0, &mut check),
    }

    let mut tr: Option<Transaction> = None;
    for (table, pos) in tables {
        let map = TableMap::get(&table)?;
        if !map.has_problems() {
            continue;
        }
        let tr = tr.get_or_insert_with(|| state.tr());
        fix_table(tr, &table, pos, &map)?;
    }
    if let Some(tr) = tr.as_mut() {
        tr.set_meta(FIX_TABLES_META, true);
        debug!(steps = tr.steps().len(), "repaired tables");
    }
    Ok(tr)
}

/// Call `f` for every node in `cur` that is not shared with `old`. Children
/// are matched by identity within a small look-ahead window; unmatched
/// children with the same markup as their counterpart are compared
/// recursively.
fn changed_descendants(old: &Node, cur: &Node, offset: usize, f: &mut dyn FnMut(&Node, usize) -> bool) {
    let old_size = old.child_count();
    let mut offset = offset;
    let mut j = 0;
    'outer: for (i, child) in cur.content().iter().enumerate() {
        for scan in j..old_size.min(i + 3) {
            if old.child(scan).same_identity(child) {
                j = scan + 1;
                offset += child.node_size();
                continue 'outer;
            }
        }
        f(child, offset);
        match old.maybe_child(j) {
            Some(old_child) if old_child.same_markup(child) => {
                changed_descendants(old_child, child, offset + 1, f);
            }
            _ => child.nodes_between(0, child.content().size(), &mut |node, pos| f(node, pos + offset + 1)),
        }
        offset += child.node_size();
    }
}

fn fix_table(tr: &mut Transaction, table: &Node, table_pos: usize, map: &TableMap) -> TableResult<()> {
    let mut must_add = vec![0usize; map.height];
    for problem in &map.problems {
        match *problem {
            Problem::Missing { row, n } => must_add[row] += n,
            Problem::OverlongRowspan { pos, n } => {
                let Some(cell) = table.node_at(pos) else { continue };
                let rowspan = cell.attrs().rowspan().saturating_sub(n).max(1);
                let attrs = cell.attrs().clone().with("rowspan", rowspan);
                let at = tr.mapping().map(table_pos + 1 + pos);
                tr.set_node_markup(at, None, attrs)?;
            }
            Problem::Collision { row, pos, n } => {
                warn!(row, pos, n, "cell collision left in place");
            }
        }
    }

    let first = must_add.iter().position(|&n| n > 0);
    let last = must_add.iter().rposition(|&n| n > 0);
    let mut pos = table_pos + 1;
    for (i, row) in table.content().iter().enumerate() {
        let end = pos + row.node_size();
        let add = must_add[i];
        if add > 0 {
            let kind = row.first_child().map_or(NodeKind::Cell, Node::kind);
            let mut nodes = Vec::with_capacity(add);
            for _ in 0..add {
                nodes.push(Node::create_and_fill(kind, Attrs::new()).ok_or(TableError::Construction(kind))?);
            }
            let starts_block = i == 0 || first == Some(i - 1);
            let side = if starts_block && last == Some(i) {
                pos + 1
            } else {
                end - 1
            };
            debug!(row = i, cells = add, "adding missing cells");
            let at = tr.mapping().map(side);
            tr.insert(at, Fragment::from_vec(nodes))?;
        }
        pos = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_model::builders::*;

    fn state_for(d: Node) -> EditorState {
        EditorState::create(d).unwrap()
    }

    #[test]
    fn test_well_formed_document_needs_no_fix() {
        let state = state_for(doc([table([tr([td("a"), td("b")])])]));
        assert!(fix_tables(&state, None).unwrap().is_none());
    }

    #[test]
    fn test_short_row_gets_cells_at_end() {
        let state = state_for(doc([table([
            tr([td("a"), td("b")]),
            tr([td("c")]),
        ])]));
        let fix = fix_tables(&state, None).unwrap().unwrap();
        assert_eq!(
            fix.doc(),
            &doc([table([tr([td("a"), td("b")]), tr([td("c"), td("")])])])
        );
        assert_eq!(fix.get_meta(FIX_TABLES_META), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_short_first_row_gets_header_cells_at_start() {
        let state = state_for(doc([table([
            tr([th("a")]),
            tr([td("b"), td("c")]),
        ])]));
        let fix = fix_tables(&state, None).unwrap().unwrap();
        assert_eq!(
            fix.doc(),
            &doc([table([tr([th(""), th("a")]), tr([td("b"), td("c")])])])
        );
    }

    #[test]
    fn test_bite_out_of_a_row_is_filled_at_start() {
        let state = state_for(doc([table([tr([td("a")]), tr([td("b"), td("c")])])]));
        let fix = fix_tables(&state, None).unwrap().unwrap();
        assert_eq!(
            fix.doc(),
            &doc([table([tr([td(""), td("a")]), tr([td("b"), td("c")])])])
        );
    }

    #[test]
    fn test_overlong_rowspan_is_shortened() {
        let state = state_for(doc([table([tr([td_with(1, 3, "a"), td("b")]), tr([td("c")])])]));
        let fix = fix_tables(&state, None).unwrap().unwrap();
        assert_eq!(
            fix.doc(),
            &doc([table([tr([td_with(1, 2, "a"), td("b")]), tr([td("c")])])])
        );
    }

    #[test]
    fn test_collision_is_left_in_place() {
        let d = doc([table([tr([td("a"), td_with(1, 2, "b")]), tr([td_with(2, 1, "c")])])]);
        let state = state_for(d.clone());
        let map = TableMap::get(d.child(0)).unwrap();
        assert!(map.problems.iter().any(|p| matches!(p, Problem::Collision { .. })));
        let fix = fix_tables(&state, None).unwrap().unwrap();
        // Both rows are one cell short of width 3; each gets one filler
        assert_eq!(fix.steps().len(), 2);
        let fixed = TableMap::compute(fix.doc().child(0)).unwrap();
        assert!(fixed.problems.iter().all(|p| matches!(p, Problem::Collision { .. })));
    }

    #[test]
    fn test_only_changed_tables_are_scanned() {
        let broken = table([tr([td("a"), td("b")]), tr([td("c")])]);
        let old = doc([broken.clone(), p("x")]);
        let new = doc([broken, p("y")]);
        let state = state_for(new);
        assert!(fix_tables(&state, Some(&old)).unwrap().is_none());
        assert!(fix_tables(&state, None).unwrap().is_some());
    }
}
