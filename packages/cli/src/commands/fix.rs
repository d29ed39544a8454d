use super::{load_document, write_document};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tabula_model::Node;
use tabula_tables::{fix_tables, EditorState};
use tracing::info;

#[derive(Args, Debug)]
pub struct FixArgs {
    /// Input document (JSON)
    pub input: PathBuf,

    /// Write the repaired document here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn fix(args: FixArgs) -> Result<()> {
    let doc = load_document(&args.input)?;
    let (fixed, steps) = repair(doc)?;

    // Status goes to stderr so stdout stays valid JSON
    if steps == 0 {
        eprintln!("{} No repairs needed", "✓".green());
    } else {
        eprintln!("{} Repaired tables in {} step(s)", "✓".green(), steps);
    }

    write_document(&fixed, args.out.as_deref())
}

/// Run structural repair over every table, returning the new document and
/// the number of steps it took
pub fn repair(doc: Node) -> Result<(Node, usize)> {
    let state = EditorState::create(doc)?;
    match fix_tables(&state, None)? {
        Some(tr) => {
            info!(steps = tr.steps().len(), "repaired document");
            Ok((tr.doc().clone(), tr.steps().len()))
        }
        None => Ok((state.doc().clone(), 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_tables::TableMap;
    use tabula_model::builders::*;

    #[test]
    fn test_repair_fills_missing_cells() {
        let d = doc([table([tr([td("a"), td("b")]), tr([td("c")])])]);
        let (fixed, steps) = repair(d).unwrap();
        assert!(steps > 0);
        assert!(TableMap::get(fixed.child(0)).unwrap().problems.is_empty());
    }

    #[test]
    fn test_well_formed_document_is_untouched() {
        let d = doc([table([tr([td("a"), td("b")])])]);
        let (fixed, steps) = repair(d.clone()).unwrap();
        assert_eq!(steps, 0);
        assert_eq!(fixed, d);
    }
}
