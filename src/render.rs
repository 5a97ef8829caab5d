//! Implementation of the `render` sub command.
//!
//! Reads queries that were resolved against the transcript model as JSON
//! lines, assembles one record per transcript and writes the tab-separated
//! output.

use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::{
    common::{
        self,
        io::{open_read_maybe_gz, open_write_maybe_gz},
        FormatOptions,
    },
    err::AnnoError,
    pos::Pos,
    query::{parse_query, Level, QueryKind},
    record::{header, Record},
    records::RecordSet,
    reg::{
        PromoterOverlap, RegAnno, RegCdsAnno, RegIntergenicAnno, RegSpanAnno, Region, SiteKind,
        SpliceJunction, Utr,
    },
    splice::{self, SpliceSite},
    transcript::{RefLens, Transcript, TranscriptDb, TranscriptModel},
};

/// Command line arguments for `render` sub command.
#[derive(clap::Parser, Debug)]
#[command(about = "Render resolved annotations as records", long_about = None)]
pub struct Args {
    /// Path to the JSON transcript table.
    #[arg(long)]
    pub path_transcripts: String,
    /// Path to the FASTA index used for clamping region queries.
    #[arg(long)]
    pub path_fai: Option<String>,
    /// Path to the JSON lines file with resolved queries.
    #[arg(long)]
    pub path_input: String,
    /// Path to the output file, compressed if ending in `.gz`.
    #[arg(long)]
    pub path_output: String,
    /// Write the header line first.
    #[arg(long)]
    pub print_header: bool,
    #[command(flatten)]
    pub format: FormatOptions,
}

/// One coordinate axis, either pre-formatted or in parts.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Coords<P> {
    pub range: String,
    pub pos: Option<P>,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub alt: String,
}

/// A single site as resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SiteFacts {
    /// Transcript if it differs from the one of the result.
    pub transcript: Option<String>,
    pub exon: Option<usize>,
    pub cds: bool,
    pub intron: Option<(usize, usize)>,
    pub intergenic: Option<RegIntergenicAnno>,
    pub utr: Option<Utr>,
    pub cds_beg: Option<i64>,
    pub cds_end: Option<i64>,
    pub tss: Option<i64>,
    pub tes: Option<i64>,
    /// Transcripts whose promoter contains the site.
    pub promoter: Vec<String>,
    pub splice: Option<SpliceSite>,
    /// Genomic position to check against the transcript's splice sites.
    pub splice_at: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PromoterFacts {
    pub transcript: String,
    pub overlap: i64,
    pub frac: f64,
}

/// A span as resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SpanFacts {
    pub b1: SiteFacts,
    pub b2: SiteFacts,
    pub spanning: Vec<String>,
    pub splice_donors: Vec<SpliceJunction>,
    pub splice_acceptors: Vec<SpliceJunction>,
    pub splice_both: Vec<usize>,
    pub cross_start: bool,
    pub cross_end: bool,
    pub intergenic: Option<RegIntergenicAnno>,
    pub promoter: Vec<PromoterFacts>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionFacts {
    Site(SiteFacts),
    Span(SpanFacts),
    Intergenic(RegIntergenicAnno),
    Codon { taa_beg: i64, taa_end: i64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SpliceStep {
    pub action: String,
    pub csqn_action: String,
}

/// Classification steps to run on the record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Steps {
    pub promoter: bool,
    pub splice: Option<SpliceStep>,
    /// Suffix for the consequence derived from the region.
    pub csqn_byreg: Option<String>,
    /// Tags added only if no splice site or CDS boundary was hit.
    pub csqn_unless_splice: Vec<String>,
}

/// The resolution of a query against one transcript.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ResultFacts {
    pub transcript: Option<String>,
    /// Chromosome for results without a transcript.
    pub chrm: Option<String>,
    pub is_var: bool,
    pub gnuc: Coords<i64>,
    pub tnuc: Coords<Pos>,
    pub taa: Coords<i64>,
    pub vcf: Coords<i64>,
    pub region: Option<RegionFacts>,
    pub csqn: Vec<String>,
    pub info: Vec<String>,
    pub steps: Steps,
    /// Failure reported by the resolver.
    pub error: Option<String>,
}

/// One input line.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct QueryFacts {
    /// Output label, defaults to the query.
    pub qop: Option<String>,
    pub query: Option<String>,
    pub custom_match: bool,
    pub results: Vec<ResultFacts>,
}

fn lookup(db: &TranscriptDb, name: &str) -> Result<Arc<dyn TranscriptModel>, AnnoError> {
    let tx: Arc<dyn TranscriptModel> = db.get(name)?;
    Ok(tx)
}

fn build_site(
    db: &TranscriptDb,
    tx: Option<&Arc<Transcript>>,
    facts: &SiteFacts,
) -> Result<RegAnno, AnnoError> {
    let tx = match &facts.transcript {
        Some(name) => Some(db.get(name)?),
        None => tx.cloned(),
    };
    let kind = if let Some(anno) = &facts.intergenic {
        SiteKind::Intergenic(anno.clone())
    } else if let Some((exon5, exon3)) = facts.intron {
        SiteKind::Intronic { exon5, exon3 }
    } else if let Some(exon) = facts.exon {
        SiteKind::Exonic {
            exon,
            cds: facts.cds,
        }
    } else {
        return Err(AnnoError::Resolution(String::from("unresolved_site")));
    };

    let mut anno = RegAnno::new(kind);
    anno.utr = facts.utr;
    anno.cds_beg = facts.cds_beg;
    anno.cds_end = facts.cds_end;
    anno.tss = facts.tss;
    anno.tes = facts.tes;
    anno.promoter = facts
        .promoter
        .iter()
        .map(|name| lookup(db, name))
        .collect::<Result<Vec<_>, _>>()?;
    anno.splice = match (&facts.splice, facts.splice_at, &tx) {
        (Some(site), _, _) => Some(site.clone()),
        (None, Some(pos), Some(tx)) => splice::locate(tx, pos),
        _ => None,
    };
    if let Some(tx) = tx {
        anno = anno.with_transcript(tx);
    }
    Ok(anno)
}

fn build_region(
    db: &TranscriptDb,
    tx: Option<&Arc<Transcript>>,
    facts: &RegionFacts,
) -> Result<Region, AnnoError> {
    Ok(match facts {
        RegionFacts::Site(site) => Region::Site(build_site(db, tx, site)?),
        RegionFacts::Span(span) => {
            let mut anno = RegSpanAnno::new(
                build_site(db, tx, &span.b1)?,
                build_site(db, tx, &span.b2)?,
            );
            if let Some(tx) = tx {
                anno = anno.with_transcript(tx.clone());
            }
            anno.spanning = span.spanning.iter().cloned().collect();
            anno.splice_donors = span.splice_donors.clone();
            anno.splice_acceptors = span.splice_acceptors.clone();
            anno.splice_both = span.splice_both.clone();
            anno.cross_start = span.cross_start;
            anno.cross_end = span.cross_end;
            anno.intergenic = span.intergenic.clone();
            anno.promoter = span
                .promoter
                .iter()
                .map(|p| -> Result<PromoterOverlap, AnnoError> {
                    Ok(PromoterOverlap {
                        transcript: lookup(db, &p.transcript)?,
                        overlap: p.overlap,
                        frac: p.frac,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Region::Span(anno)
        }
        RegionFacts::Intergenic(anno) => Region::Intergenic(anno.clone()),
        RegionFacts::Codon { taa_beg, taa_end } => {
            let tx = tx
                .ok_or_else(|| AnnoError::Resolution(String::from("codon_without_transcript")))?;
            Region::Codon(RegCdsAnno::from_taa_range(tx.clone(), *taa_beg, *taa_end)?)
        }
    })
}

/// Assemble the record for one resolved transcript.
///
/// `gnuc_range` is used for results that carry no genomic coordinates.
pub fn build_record(
    db: &TranscriptDb,
    facts: &ResultFacts,
    gnuc_range: Option<&str>,
) -> Result<Record, AnnoError> {
    if let Some(msg) = &facts.error {
        return Err(AnnoError::Resolution(msg.clone()));
    }
    let tx = facts
        .transcript
        .as_deref()
        .map(|name| db.get(name))
        .transpose()?;

    let mut record = Record::new(facts.is_var);
    if let Some(tx) = &tx {
        record.tname = tx.name.clone();
        record.gene = tx.gene_name.clone();
        record.strand = tx.strand.to_string();
        record.chrm = tx.chrm.clone();
    }
    if let Some(chrm) = &facts.chrm {
        record.chrm = chrm.clone();
    }

    record.gnuc_range = match (facts.gnuc.range.is_empty(), gnuc_range) {
        (true, Some(range)) if facts.gnuc.pos.is_none() => range.to_owned(),
        _ => facts.gnuc.range.clone(),
    };
    record.gnuc_pos = facts.gnuc.pos;
    record.gnuc_ref = facts.gnuc.ref_.clone();
    record.gnuc_alt = facts.gnuc.alt.clone();
    record.tnuc_range = facts.tnuc.range.clone();
    record.tnuc_pos = facts.tnuc.pos;
    record.tnuc_ref = facts.tnuc.ref_.clone();
    record.tnuc_alt = facts.tnuc.alt.clone();
    record.taa_range = facts.taa.range.clone();
    record.taa_pos = facts.taa.pos;
    record.taa_ref = facts.taa.ref_.clone();
    record.taa_alt = facts.taa.alt.clone();
    record.vcf_pos = facts.vcf.pos;
    record.vcf_ref = facts.vcf.ref_.clone();
    record.vcf_alt = facts.vcf.alt.clone();

    record.reg = facts
        .region
        .as_ref()
        .map(|region| build_region(db, tx.as_ref(), region))
        .transpose()?;
    for token in &facts.info {
        record.append_info(token);
    }
    record.csqn.extend(facts.csqn.iter().cloned());

    let steps = &facts.steps;
    if steps.promoter {
        record.set_promoter();
    }
    let expt = match &steps.splice {
        Some(step) => record.set_splice(&step.action, &step.csqn_action)?,
        None => false,
    };
    if let Some(action) = &steps.csqn_byreg {
        record.set_csqn_byreg(action);
    }
    if !expt {
        record.csqn.extend(steps.csqn_unless_splice.iter().cloned());
    }
    Ok(record)
}

/// Build the records of one input line.
pub fn process_query(
    db: &TranscriptDb,
    reflens: Option<&RefLens>,
    facts: &QueryFacts,
    opts: &FormatOptions,
) -> Result<RecordSet, AnnoError> {
    let label = facts
        .qop
        .as_deref()
        .or(facts.query.as_deref())
        .unwrap_or_default();
    let mut set = RecordSet::new(label);
    set.custom_match = facts.custom_match;

    let mut gnuc_range = None;
    if let Some(query) = &facts.query {
        let parsed = parse_query(query).and_then(|mut query| {
            if let Some(reflens) = reflens {
                query.normalize_reg(reflens)?;
            }
            Ok(query)
        });
        match parsed {
            Ok(query) => {
                if let (Level::Genomic, QueryKind::Region { beg, end, .. }) =
                    (query.level, &query.kind)
                {
                    gnuc_range = Some(format!("{}_{}", beg, end));
                }
            }
            Err(err) => {
                set.push_result(Err(err), opts)?;
                return Ok(set);
            }
        }
    }

    for result in &facts.results {
        set.push_result(build_record(db, result, gnuc_range.as_deref()), opts)?;
    }
    Ok(set)
}

/// Main entry point for `render` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("loading transcripts...");
    let db = TranscriptDb::from_path(&args.path_transcripts)?;
    tracing::info!(
        "... loaded {} transcripts",
        db.transcripts.len().separate_with_commas()
    );
    let reflens = args
        .path_fai
        .as_ref()
        .map(RefLens::from_fai)
        .transpose()
        .map_err(|e| anyhow::anyhow!("could not load FASTA index: {}", e))?;

    let mut opts = args.format.clone();
    opts.verbose = args_common.is_chatty();

    let reader = open_read_maybe_gz(&args.path_input)
        .map_err(|e| anyhow::anyhow!("could not open input file: {}", e))?;
    let mut writer = open_write_maybe_gz(&args.path_output)
        .map_err(|e| anyhow::anyhow!("could not open output file: {}", e))?;
    if args.print_header {
        writeln!(writer, "{}", header(&opts))?;
    }

    let mut count = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let facts: QueryFacts = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("failed to parse line {}: {}", lineno + 1, e))?;
        let set = process_query(&db, reflens.as_ref(), &facts, &opts)?;
        set.write(&mut writer, &opts)?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!(
        "rendered {} queries in {:?}",
        count.separate_with_commas(),
        before_anything.elapsed()
    );
    Ok(())
}
