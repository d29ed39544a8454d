use super::{find_tables, load_document, write_document};
use crate::config::Config;
use anyhow::{anyhow, bail, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tabula_model::Node;
use tabula_tables::{CellSelection, EditorState, HeaderStrategy, TableCommand, TableMap, Transaction};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input document (JSON)
    pub input: PathBuf,

    /// Command name (e.g. add_row_after) or a JSON command object
    pub command: String,

    /// Index of the table to edit, in document order
    #[arg(short, long, default_value_t = 0)]
    pub table: usize,

    /// Anchor cell as row,col
    #[arg(short, long, value_parser = parse_cell)]
    pub anchor: (usize, usize),

    /// Head cell as row,col (defaults to the anchor)
    #[arg(long, value_parser = parse_cell)]
    pub head: Option<(usize, usize)>,

    /// Write the resulting document here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: RunArgs, config: &Config) -> Result<()> {
    let doc = load_document(&args.input)?;
    let command = parse_command(&args.command, config.header_strategy)?;
    let head = args.head.unwrap_or(args.anchor);

    let next = execute(&doc, &command, args.table, args.anchor, head)?;
    eprintln!("{} Applied {}", "✓".green(), args.command.bold());

    write_document(&next, args.out.as_deref())
}

/// Select `anchor`..`head` in table `table` and run `command` on it
pub fn execute(
    doc: &Node,
    command: &TableCommand,
    table: usize,
    anchor: (usize, usize),
    head: (usize, usize),
) -> Result<Node> {
    let (pos, table_node) = find_tables(doc)
        .into_iter()
        .nth(table)
        .ok_or_else(|| anyhow!("Document has no table {}", table))?;
    let table_start = pos + 1;

    let anchor = cell_pos(&table_node, table_start, anchor)?;
    let head = cell_pos(&table_node, table_start, head)?;
    let selection = CellSelection::create(doc, anchor, head)?;
    let state = EditorState::new(doc.clone(), selection.into());

    let mut dispatched = None;
    let applied = command.run(&state, Some(&mut |tr: Transaction| dispatched = Some(tr)))?;
    match dispatched {
        Some(tr) if applied => Ok(state.apply(tr)?.doc().clone()),
        _ => bail!("Command does not apply to the selected cells"),
    }
}

/// Parse a command given either as a bare name or as a JSON object.
/// `toggle_header` commands without a strategy get `default_strategy`.
pub fn parse_command(text: &str, default_strategy: HeaderStrategy) -> Result<TableCommand> {
    let mut value: Value = if text.trim_start().starts_with('{') {
        serde_json::from_str(text)?
    } else {
        json!({ "command": text.trim().replace('-', "_") })
    };

    if value["command"] == "toggle_header" {
        if let Some(object) = value.as_object_mut() {
            object
                .entry("strategy")
                .or_insert(serde_json::to_value(default_strategy)?);
        }
    }

    serde_json::from_value(value).map_err(|err| anyhow!("Unknown command {}: {}", text, err))
}

fn cell_pos(table: &Node, table_start: usize, (row, col): (usize, usize)) -> Result<usize> {
    let map = TableMap::get(table)?;
    if row >= map.height || col >= map.width {
        bail!("Cell {},{} is outside the {}×{} table", row, col, map.width, map.height);
    }
    match map.slots[row * map.width + col] {
        0 => bail!("No cell at {},{} (run `tabula fix` first)", row, col),
        slot => Ok(table_start + slot),
    }
}

fn parse_cell(text: &str) -> Result<(usize, usize), String> {
    let (row, col) = text
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got {:?}", text))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|err| format!("{:?}: {}", part, err))
    };
    Ok((parse(row)?, parse(col)?))
}
