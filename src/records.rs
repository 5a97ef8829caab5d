//! Formatting of all records of one query and wrapping of resolution errors.

use std::io::Write;

use crate::{common::FormatOptions, err::AnnoError, record::Record};

/// Separator between records in one-line mode.
pub const ONELINE_SEPARATOR: &str = "\t|||\t";

/// Turn a resolution error into a record carrying `Error=<message>`.
///
/// With `opts.suspend` the error is handed back to the caller instead.
pub fn wrap_error(err: AnnoError, opts: &FormatOptions) -> Result<Record, AnnoError> {
    let mut record = Record::default();
    record.append_info(&format!("Error={}", err));
    if opts.verbose {
        tracing::warn!("{}", err);
    }
    if opts.suspend {
        return Err(err);
    }
    Ok(record)
}

/// Write the records of the query `qop`.
///
/// Without matching records a single `no_valid_transcript_found` record is
/// written.
pub fn format_records<W: Write>(
    out: &mut W,
    records: &[Record],
    qop: &str,
    opts: &FormatOptions,
    custom_match: bool,
) -> Result<(), anyhow::Error> {
    let label = if opts.custom && !custom_match {
        format!("*{}", qop)
    } else {
        qop.to_owned()
    };
    let prefix = if label.is_empty() {
        String::new()
    } else {
        format!("{}\t", label)
    };

    if records.is_empty() {
        let mut record = Record::default();
        record.append_info("no_valid_transcript_found");
        writeln!(out, "{}{}", prefix, record.formats(opts))?;
    } else if opts.oneline {
        let line = records.iter().map(|r| r.formats(opts)).collect::<Vec<_>>();
        writeln!(out, "{}{}", prefix, line.join(ONELINE_SEPARATOR))?;
    } else {
        for record in records {
            writeln!(out, "{}{}", prefix, record.formats(opts))?;
        }
    }
    Ok(())
}

/// The records produced for one query, in transcript order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub qop: String,
    pub records: Vec<Record>,
    /// Whether the records come from a custom transcript match.
    pub custom_match: bool,
}

impl RecordSet {
    pub fn new(qop: &str) -> Self {
        Self {
            qop: qop.to_owned(),
            ..Default::default()
        }
    }

    /// Add the outcome of resolving the query against one transcript.
    pub fn push_result(
        &mut self,
        result: Result<Record, AnnoError>,
        opts: &FormatOptions,
    ) -> Result<(), AnnoError> {
        let record = match result {
            Ok(record) => record,
            Err(err) => wrap_error(err, opts)?,
        };
        self.records.push(record);
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut W, opts: &FormatOptions) -> Result<(), anyhow::Error> {
        format_records(out, &self.records, &self.qop, opts, self.custom_match)
    }
}
