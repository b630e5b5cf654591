/// WindowTable CLI
///
/// Reads a JSON lines file through a window cache, runs the configured
/// pipeline and prints a range of the resulting rows as JSON lines.
///
/// ```bash
/// windowtable-cli rows.jsonl --schema schema.json --config pipeline.json --from 100 --limit 20
/// ```
///
/// Set `RUST_LOG=debug` to see each pipeline stage.

use clap::Parser;
use serde_json::json;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;
use windowtable::{
    JsonLinesSource, PipelineConfig, ProgressEvent, ProgressMonitor, RandomAccessTable, Result,
    Schema,
};

#[derive(Parser, Debug)]
#[command(name = "windowtable-cli", about = "Page through a transformed JSON lines table")]
struct Args {
    /// Input rows, one `{"key": ..., "cells": [...]}` object per line
    input: PathBuf,

    /// Column list as JSON: `[{"name": "id", "column_type": "int64"}, ...]`
    #[arg(long)]
    schema: PathBuf,

    /// Pipeline configuration (cache sizes, columns, sort, filter)
    #[arg(long)]
    config: Option<PathBuf>,

    /// First output row to print
    #[arg(long, default_value_t = 0)]
    from: usize,

    /// Maximum number of rows to print
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let schema: Schema = serde_json::from_str(&std::fs::read_to_string(&args.schema)?)?;
    let config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    let source = Rc::new(JsonLinesSource::new(&args.input, schema));
    let cache = Rc::new(config.open_cache(source)?);
    let executor = config.to_builder()?.build();

    let mut monitor = ProgressMonitor::new();
    monitor.add_listener(|event: &ProgressEvent| {
        if let Some(message) = &event.message {
            log::trace!("{} {:.0}%", message, event.progress * 100.0);
        }
    });

    let table = executor.transform(cache, &monitor)?;
    log::info!(
        "{} columns, {} rows",
        table.column_count(),
        table
            .row_count()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for index in args.from..args.from.saturating_add(args.limit) {
        let row = match table.get_row(index) {
            Ok(row) => row,
            Err(e) if e.is_out_of_range() => break,
            Err(e) => return Err(e),
        };
        let cells: Vec<_> = row.cells().iter().map(|c| c.to_json()).collect();
        writeln!(out, "{}", json!({ "key": row.key(), "cells": cells }))?;
    }
    out.flush()?;
    Ok(())
}
