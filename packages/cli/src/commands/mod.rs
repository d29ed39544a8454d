pub mod fix;
pub mod inspect;
pub mod run;

pub use fix::{fix, FixArgs};
pub use inspect::{inspect, InspectArgs};
pub use run::{run, RunArgs};

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tabula_model::{Node, NodeKind};

/// Read a JSON document from disk
pub(crate) fn load_document(path: &Path) -> Result<Node> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let doc = Node::from_json(&source).with_context(|| format!("Invalid document in {}", path.display()))?;
    Ok(doc)
}

/// Write a document as JSON, to `out` or stdout
pub(crate) fn write_document(doc: &Node, out: Option<&Path>) -> Result<()> {
    let json = doc.to_json()?;
    match out {
        Some(path) => fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Tables of a document in document order, with the position before each
/// one. Tables nested in cells follow the table that contains them.
pub(crate) fn find_tables(doc: &Node) -> Vec<(usize, Node)> {
    let mut tables = Vec::new();
    doc.descendants(&mut |node, pos| {
        if node.kind() == NodeKind::Table {
            tables.push((pos, node.clone()));
        }
        !node.is_textblock()
    });
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_model::builders::*;

    #[test]
    fn test_find_tables() {
        let d = doc([
            p("intro"),
            table([tr([td("a")])]),
            table([tr([td("b"), td("c")])]),
        ]);
        let tables = find_tables(&d);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].0, 7);
        assert_eq!(tables[1].1.child(0).child_count(), 2);
    }
}
