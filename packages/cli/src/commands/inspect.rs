use super::{find_tables, load_document};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tabula_model::Node;
use tabula_tables::{Problem, TableMap};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input document (JSON)
    pub input: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Grid summary of one table
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub index: usize,
    /// Position before the table node
    pub pos: usize,
    pub width: usize,
    pub height: usize,
    /// Table-relative cell offsets, one row per entry; 0 marks an unfilled slot
    pub slots: Vec<Vec<usize>>,
    pub problems: Vec<Problem>,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let doc = load_document(&args.input)?;
    let reports = reports(&doc)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("🔍 {} {}", "Inspecting".green().bold(), args.input.display());
    println!();

    if reports.is_empty() {
        println!("{}", "⚠️  No tables found".yellow());
        return Ok(());
    }

    for report in &reports {
        print_report(report);
    }

    let defective = reports.iter().filter(|r| !r.problems.is_empty()).count();
    println!("   Tables: {}", reports.len());
    if defective > 0 {
        println!("   {} {} (run `tabula fix` to repair)", "Defective:".yellow(), defective);
    } else {
        println!("   {} No problems found!", "✓".green());
    }

    Ok(())
}

pub fn reports(doc: &Node) -> Result<Vec<TableReport>> {
    let mut reports = Vec::new();
    for (index, (pos, table)) in find_tables(doc).into_iter().enumerate() {
        let map = TableMap::get(&table)?;
        let slots = if map.width == 0 {
            vec![Vec::new(); map.height]
        } else {
            map.slots.chunks(map.width).map(<[usize]>::to_vec).collect()
        };
        reports.push(TableReport {
            index,
            pos,
            width: map.width,
            height: map.height,
            slots,
            problems: map.problems.clone(),
        });
    }
    Ok(reports)
}

fn print_report(report: &TableReport) {
    println!(
        "{} {} at {}: {} × {}",
        "Table".bold(),
        report.index,
        report.pos,
        report.width,
        report.height
    );

    let cell_width = report
        .slots
        .iter()
        .flatten()
        .map(|slot| slot.to_string().len())
        .max()
        .unwrap_or(1);
    for row in &report.slots {
        let cells: Vec<String> = row
            .iter()
            .map(|&slot| {
                if slot == 0 {
                    format!("{:>cell_width$}", "·").dimmed().to_string()
                } else {
                    format!("{:>cell_width$}", slot)
                }
            })
            .collect();
        println!("    {}", cells.join(" "));
    }

    for problem in &report.problems {
        println!("  {} {}", "problem".yellow().bold(), describe(problem));
    }
    println!();
}

fn describe(problem: &Problem) -> String {
    match problem {
        Problem::Collision { row, pos, n } => {
            format!("cell at {} overlaps {} slot(s) in row {}", pos, n, row)
        }
        Problem::Missing { row, n } => format!("row {} is missing {} cell(s)", row, n),
        Problem::OverlongRowspan { pos, n } => {
            format!("cell at {} spans {} row(s) past the end of the table", pos, n)
        }
    }
}
