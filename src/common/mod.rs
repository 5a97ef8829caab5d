//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use thousands::Separable;

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

impl Args {
    /// Whether log output above the info level was requested.
    pub fn is_chatty(&self) -> bool {
        matches!(
            self.verbose.log_level(),
            Some(log::Level::Debug) | Some(log::Level::Trace)
        )
    }
}

/// Options controlling how records are written out.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Append the CHROM/POS/REF/ALT columns with genomic sequence.
    #[arg(long)]
    pub gseq: bool,
    /// Write all records of one query on a single line.
    #[arg(long)]
    pub oneline: bool,
    /// Expect a custom match, prefix other results with `*`.
    #[arg(long)]
    pub custom: bool,
    /// Re-raise errors after they were turned into error records.
    #[arg(long)]
    pub suspend: bool,
    /// Log wrapped errors as warnings.
    #[arg(skip)]
    pub verbose: bool,
}

/// Placeholder written for sequences that were omitted for their length.
pub const LONG_SEQUENCE: &str = "[LONG SEQUENCE, see --seqmax]";

/// Format an integer with comma-grouped thousands.
pub fn format_group(value: i64) -> String {
    value.separate_with_commas()
}

/// Join `token` to the `;`-separated list in `info`.
pub fn append_inf(info: &str, token: &str) -> String {
    if info.is_empty() {
        token.to_owned()
    } else {
        format!("{};{}", info, token)
    }
}
