//! Implementation of the `parse` sub command.

use std::io::{BufRead, Write};

use serde::Serialize;
use thousands::Separable;

use crate::{
    common::{
        self,
        io::{open_read_maybe_gz, open_write_maybe_gz},
    },
    query::{parse_query, Query},
};

/// Command line arguments for `parse` sub command.
#[derive(clap::Parser, Debug)]
#[command(about = "Parse mutation queries into JSON", long_about = None)]
pub struct Args {
    /// Path to the input file with one query per line.
    #[arg(long)]
    pub path_input: String,
    /// Path to the JSON lines output file.
    #[arg(long)]
    pub path_output: String,
}

/// Output line for one query.
#[derive(Serialize, Debug)]
#[serde(untagged)]
enum Parsed {
    Query(Query),
    Failure { input: String, error: String },
}

/// Parse one query line into its output representation.
fn parse_line(line: &str) -> Parsed {
    match parse_query(line) {
        Ok(query) => Parsed::Query(query),
        Err(err) => {
            tracing::warn!("could not parse query {:?}: {}", line, err);
            Parsed::Failure {
                input: line.to_owned(),
                error: err.to_string(),
            }
        }
    }
}

/// Main entry point for `parse` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let reader = open_read_maybe_gz(&args.path_input)
        .map_err(|e| anyhow::anyhow!("could not open input file: {}", e))?;
    let mut writer = open_write_maybe_gz(&args.path_output)
        .map_err(|e| anyhow::anyhow!("could not open output file: {}", e))?;

    let (mut total, mut failed) = (0usize, 0usize);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = parse_line(line);
        if matches!(parsed, Parsed::Failure { .. }) {
            failed += 1;
        }
        serde_json::to_writer(&mut writer, &parsed)?;
        writeln!(writer)?;
        total += 1;
    }
    writer.flush()?;

    tracing::info!(
        "parsed {} queries, {} failed",
        total.separate_with_commas(),
        failed.separate_with_commas()
    );
    Ok(())
}
