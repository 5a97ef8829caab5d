//! Interfaces to the transcript/gene model and reference lengths.
//!
//! The region classification code only reads from these; the concrete
//! implementations here back the command line tools and the tests.

use std::{path::Path, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{common::io::open_read_maybe_gz, err::AnnoError};

/// Strand of a transcript or gene.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
)]
pub enum Strand {
    #[default]
    #[serde(rename = "+")]
    #[strum(serialize = "+")]
    Plus,
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Minus,
}

/// Read-only view on a transcript as needed for classification and output.
pub trait TranscriptModel: std::fmt::Debug + Send + Sync {
    /// Transcript identifier, e.g., `NM_000546.5`.
    fn name(&self) -> &str;
    fn gene_name(&self) -> &str;
    fn gene_dbxref(&self) -> Option<&str>;
    fn aliases(&self) -> &[String];
    fn source(&self) -> Option<&str>;
    fn strand(&self) -> Strand;
    fn chrm(&self) -> &str;
    /// Genomic start of the coding sequence.
    fn cds_beg(&self) -> i64;
    /// Genomic end of the coding sequence.
    fn cds_end(&self) -> i64;
    /// 1-based indices of the exons touched by the coding nucleotide range `beg..=end`.
    fn tnuc_range_to_exon_inds(&self, beg: i64, end: i64) -> Result<Vec<usize>, AnnoError>;
}

/// Length lookup for reference sequences.
pub trait RefLenProvider {
    fn reflen(&self, token: &str) -> Result<i64, AnnoError>;
}

/// Genomic bounds of one exon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExonBounds {
    /// 1-based exon number in transcript order.
    pub number: usize,
    pub beg: i64,
    pub end: i64,
    pub first: bool,
    pub last: bool,
}

/// A transcript as loaded from the JSON transcript table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    pub name: String,
    pub gene_name: String,
    #[serde(default)]
    pub gene_dbxref: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub strand: Strand,
    pub chrm: String,
    /// Exons as 1-based, closed genomic intervals in ascending order.
    pub exons: Vec<(i64, i64)>,
    pub cds_beg: i64,
    pub cds_end: i64,
}

impl Transcript {
    /// Exon boundaries in transcript order.
    pub fn exon_bounds(&self) -> Vec<ExonBounds> {
        let n = self.exons.len();
        let mut result: Vec<ExonBounds> = self
            .exons
            .iter()
            .enumerate()
            .map(|(i, (beg, end))| {
                let number = match self.strand {
                    Strand::Plus => i + 1,
                    Strand::Minus => n - i,
                };
                ExonBounds {
                    number,
                    beg: *beg,
                    end: *end,
                    first: number == 1,
                    last: number == n,
                }
            })
            .collect();
        result.sort_by_key(|exon| exon.number);
        result
    }

    /// Coding bases contributed by each exon, in transcript order, with the
    /// transcript-order exon number.
    fn coding_lengths(&self) -> Vec<(usize, i64)> {
        let n = self.exons.len();
        let mut result: Vec<(usize, i64)> = self
            .exons
            .iter()
            .enumerate()
            .map(|(i, (beg, end))| {
                let ovl_beg = std::cmp::max(*beg, self.cds_beg);
                let ovl_end = std::cmp::min(*end, self.cds_end);
                let number = match self.strand {
                    Strand::Plus => i + 1,
                    Strand::Minus => n - i,
                };
                (number, std::cmp::max(0, ovl_end - ovl_beg + 1))
            })
            .collect();
        if self.strand == Strand::Minus {
            result.reverse();
        }
        result
    }
}

impl TranscriptModel for Transcript {
    fn name(&self) -> &str {
        &self.name
    }

    fn gene_name(&self) -> &str {
        &self.gene_name
    }

    fn gene_dbxref(&self) -> Option<&str> {
        self.gene_dbxref.as_deref()
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn strand(&self) -> Strand {
        self.strand
    }

    fn chrm(&self) -> &str {
        &self.chrm
    }

    fn cds_beg(&self) -> i64 {
        self.cds_beg
    }

    fn cds_end(&self) -> i64 {
        self.cds_end
    }

    fn tnuc_range_to_exon_inds(&self, beg: i64, end: i64) -> Result<Vec<usize>, AnnoError> {
        let lengths = self.coding_lengths();
        let total: i64 = lengths.iter().map(|(_, len)| len).sum();
        if beg < 1 || end < beg || end > total {
            return Err(AnnoError::Resolution(format!(
                "tnuc_range_{}_{}_outside_cds_of_{}",
                beg, end, self.name
            )));
        }

        let mut result = Vec::new();
        let mut offset = 0;
        for (number, len) in lengths {
            if len > 0 && offset < end && beg <= offset + len {
                result.push(number);
            }
            offset += len;
        }
        Ok(result)
    }
}

/// Transcripts indexed by their identifier.
#[derive(Debug, Default)]
pub struct TranscriptDb {
    pub transcripts: IndexMap<String, Arc<Transcript>>,
}

impl TranscriptDb {
    pub fn new(transcripts: Vec<Transcript>) -> Self {
        Self {
            transcripts: transcripts
                .into_iter()
                .map(|tx| (tx.name.clone(), Arc::new(tx)))
                .collect(),
        }
    }

    /// Load the table from a JSON array of transcripts.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        tracing::debug!("loading transcripts from {:?}...", path.as_ref());
        let reader = open_read_maybe_gz(path.as_ref())?;
        let transcripts: Vec<Transcript> = serde_json::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("error decoding {:?}: {}", path.as_ref(), e))?;
        tracing::debug!("... done loading {} transcripts", transcripts.len());
        Ok(Self::new(transcripts))
    }

    /// Look up a transcript, falling back to the identifier without version.
    pub fn get(&self, name: &str) -> Result<Arc<Transcript>, AnnoError> {
        let found = self.transcripts.get(name).or_else(|| {
            let unversioned = name.split('.').next().unwrap_or(name);
            self.transcripts
                .iter()
                .find(|(key, _)| key.split('.').next() == Some(unversioned))
                .map(|(_, tx)| tx)
        });
        match found {
            Some(tx) => Ok(tx.clone()),
            None => Err(AnnoError::Resolution(format!(
                "unknown_transcript_{}",
                name
            ))),
        }
    }
}

/// Reference sequence lengths, e.g., from a FASTA index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefLens {
    pub lengths: IndexMap<String, i64>,
}

impl RefLens {
    /// Load lengths from the first two columns of a `.fai` file.
    pub fn from_fai<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(open_read_maybe_gz(path.as_ref())?);
        let mut lengths = IndexMap::new();
        for record in reader.records() {
            let record = record?;
            let name = record
                .get(0)
                .ok_or_else(|| anyhow::anyhow!("missing name column in {:?}", path.as_ref()))?;
            let length = record
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("missing length column in {:?}", path.as_ref()))?
                .parse::<i64>()?;
            lengths.insert(name.to_owned(), length);
        }
        Ok(Self { lengths })
    }
}

impl RefLenProvider for RefLens {
    fn reflen(&self, token: &str) -> Result<i64, AnnoError> {
        let alternative = match token.strip_prefix("chr") {
            Some(stripped) => stripped.to_owned(),
            None => format!("chr{}", token),
        };
        self.lengths
            .get(token)
            .or_else(|| self.lengths.get(&alternative))
            .copied()
            .ok_or_else(|| AnnoError::Resolution(format!("unknown_chromosome_{}", token)))
    }
}

#[cfg(test)]
pub mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Plus-strand transcript with three exons, CDS of 30 bases: 10 + 12 + 8.
    pub fn plus_tx() -> Transcript {
        Transcript {
            name: String::from("NM_000001.1"),
            gene_name: String::from("GENE1"),
            gene_dbxref: Some(String::from("HGNC:1")),
            aliases: vec![String::from("G1"), String::from("GN1")],
            source: Some(String::from("RefSeq")),
            strand: Strand::Plus,
            chrm: String::from("chr1"),
            exons: vec![(1001, 1100), (2001, 2012), (3001, 3100)],
            cds_beg: 1091,
            cds_end: 3008,
        }
    }

    /// Minus-strand transcript mirroring `plus_tx`.
    pub fn minus_tx() -> Transcript {
        Transcript {
            name: String::from("NM_000002.1"),
            gene_name: String::from("GENE2"),
            strand: Strand::Minus,
            chrm: String::from("chr2"),
            exons: vec![(1001, 1100), (2001, 2012), (3001, 3100)],
            cds_beg: 1093,
            cds_end: 3010,
            ..Default::default()
        }
    }

    #[test]
    fn strand_display_and_parse() -> Result<(), anyhow::Error> {
        assert_eq!(Strand::Plus.to_string(), "+");
        assert_eq!(Strand::Minus.to_string(), "-");
        assert_eq!("-".parse::<Strand>()?, Strand::Minus);
        Ok(())
    }

    #[rstest::rstest]
    #[case(1, 3, vec![1])]
    #[case(9, 12, vec![1, 2])]
    #[case(11, 22, vec![2])]
    #[case(1, 30, vec![1, 2, 3])]
    #[case(23, 30, vec![3])]
    fn tnuc_range_plus(
        #[case] beg: i64,
        #[case] end: i64,
        #[case] expected: Vec<usize>,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(plus_tx().tnuc_range_to_exon_inds(beg, end)?, expected);
        Ok(())
    }

    #[test]
    fn tnuc_range_minus() -> Result<(), anyhow::Error> {
        // coding order runs from the highest exon down: 10 (exon 1), 12 (exon 2), 8 (exon 3)
        let tx = minus_tx();
        assert_eq!(tx.tnuc_range_to_exon_inds(1, 3)?, vec![1]);
        assert_eq!(tx.tnuc_range_to_exon_inds(10, 11)?, vec![1, 2]);
        assert_eq!(tx.tnuc_range_to_exon_inds(30, 30)?, vec![3]);
        Ok(())
    }

    #[test]
    fn exon_bounds_minus() {
        let bounds = minus_tx().exon_bounds();
        assert_eq!(bounds[0].number, 1);
        assert_eq!((bounds[0].beg, bounds[0].end), (3001, 3100));
        assert!(bounds[0].first);
        assert!(bounds[2].last);
        assert_eq!((bounds[2].beg, bounds[2].end), (1001, 1100));
    }

    #[test]
    fn tnuc_range_outside() {
        assert_eq!(
            plus_tx().tnuc_range_to_exon_inds(25, 31),
            Err(AnnoError::Resolution(String::from(
                "tnuc_range_25_31_outside_cds_of_NM_000001.1"
            )))
        );
    }

    #[test]
    fn transcript_db_lookup() -> Result<(), anyhow::Error> {
        let db = TranscriptDb::new(vec![plus_tx(), minus_tx()]);
        assert_eq!(db.get("NM_000001.1")?.gene_name(), "GENE1");
        assert_eq!(db.get("NM_000002")?.gene_name(), "GENE2");
        assert_eq!(db.get("NM_000002.7")?.gene_name(), "GENE2");
        assert_eq!(
            db.get("NM_999").unwrap_err(),
            AnnoError::Resolution(String::from("unknown_transcript_NM_999"))
        );
        Ok(())
    }

    #[test]
    fn ref_lens_from_fai() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("ref.fa.fai");
        {
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "chr1\t248956422\t112\t70\t71")?;
            writeln!(f, "chrM\t16569\t252513167\t70\t71")?;
        }

        let lens = RefLens::from_fai(&path)?;
        assert_eq!(lens.reflen("chr1")?, 248956422);
        assert_eq!(lens.reflen("M")?, 16569);
        assert_eq!(
            lens.reflen("chr7"),
            Err(AnnoError::Resolution(String::from("unknown_chromosome_chr7")))
        );
        Ok(())
    }
}
