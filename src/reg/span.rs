//! Annotation of a span between two sites.

use std::sync::Arc;

use indexmap::IndexSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    reg::{
        same_region, same_transcript, RegAnno, RegIntergenicAnno, RegionCsqn,
        MAX_SPANNING_NAMES,
    },
    transcript::TranscriptModel,
};

/// A splice site crossed by a span.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpliceJunction {
    /// Number of the exon the site belongs to.
    pub exon: usize,
    pub chrm: String,
    pub pos: i64,
}

/// Overlap of a span with the promoter of a transcript.
#[derive(Debug, Clone)]
pub struct PromoterOverlap {
    pub transcript: Arc<dyn TranscriptModel>,
    /// Overlap in base pairs.
    pub overlap: i64,
    /// Overlap in percent of the promoter.
    pub frac: f64,
}

/// Annotation of a range, bounded by two single site annotations.
#[derive(Debug, Clone)]
pub struct RegSpanAnno {
    pub b1: RegAnno,
    pub b2: RegAnno,
    pub transcript: Option<Arc<dyn TranscriptModel>>,
    /// Names of the genes spanned, in discovery order.
    pub spanning: IndexSet<String>,
    pub splice_donors: Vec<SpliceJunction>,
    pub splice_acceptors: Vec<SpliceJunction>,
    /// Exons covered as a whole.
    pub splice_both: Vec<usize>,
    /// Whether the span crosses the CDS start in genomic orientation.
    pub cross_start: bool,
    /// Whether the span crosses the CDS end in genomic orientation.
    pub cross_end: bool,
    pub intergenic: Option<RegIntergenicAnno>,
    pub promoter: Vec<PromoterOverlap>,
}

impl RegSpanAnno {
    pub fn new(b1: RegAnno, b2: RegAnno) -> Self {
        Self {
            b1,
            b2,
            transcript: None,
            spanning: IndexSet::new(),
            splice_donors: Vec::new(),
            splice_acceptors: Vec::new(),
            splice_both: Vec::new(),
            cross_start: false,
            cross_end: false,
            intergenic: None,
            promoter: Vec::new(),
        }
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptModel>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn in_utr(&self) -> bool {
        matches!((self.b1.utr, self.b2.utr), (Some(u1), Some(u2)) if u1 == u2)
    }

    pub fn in_exon(&self) -> bool {
        self.b1.is_exonic() && self.b2.is_exonic() && self.b1.exon() == self.b2.exon()
    }

    pub fn entirely_in_cds(&self) -> bool {
        self.b1.cds() && self.b2.cds() && self.b1.exon() == self.b2.exon()
    }

    pub fn in_intron(&self) -> bool {
        self.b1.is_intronic()
            && self.b2.is_intronic()
            && self.b1.intron_exons() == self.b2.intron_exons()
    }

    pub fn csqn(&self) -> RegionCsqn {
        if self
            .intergenic
            .as_ref()
            .map_or(false, |anno| anno.spanning.is_empty())
        {
            RegionCsqn::Intergenic
        } else if !self.splice_donors.is_empty() {
            RegionCsqn::SpliceDonor
        } else if !self.splice_acceptors.is_empty() {
            RegionCsqn::SpliceAcceptor
        } else if self.in_intron() {
            RegionCsqn::Intronic
        } else if let (true, Some(utr)) = (self.in_utr(), self.b1.utr) {
            utr.into()
        } else {
            RegionCsqn::Unclassified
        }
    }

    pub fn format(&self) -> String {
        if let Some(intergenic) = &self.intergenic {
            return intergenic.format();
        }

        if same_region(&self.b1, &self.b2) {
            return format!("inside_[{}]", self.b1.format0(false));
        }

        let with_name = !matches!(
            (&self.b1.transcript, &self.b2.transcript),
            (Some(t1), Some(t2)) if same_transcript(t1, t2)
        );
        let mut s = format!(
            "from_[{}]_to_[{}]",
            self.b1.format0(with_name),
            self.b2.format0(with_name)
        );
        if !self.spanning.is_empty() {
            if self.spanning.len() <= MAX_SPANNING_NAMES {
                s.push_str(&format!("_spanning_[{}]", self.spanning.iter().join(",")));
            } else {
                s.push_str(&format!("_spanning_[{}_genes]", self.spanning.len()));
            }
        }
        s
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        reg::Utr,
        transcript::{
            test::{minus_tx, plus_tx},
            Strand,
        },
    };

    fn junction(exon: usize) -> SpliceJunction {
        SpliceJunction {
            exon,
            chrm: String::from("chr1"),
            pos: 1101,
        }
    }

    #[rstest]
    #[case(2, 2, true)]
    #[case(2, 3, false)]
    #[case(3, 2, false)]
    fn in_exon(#[case] exon1: usize, #[case] exon2: usize, #[case] expected: bool) {
        let span = RegSpanAnno::new(RegAnno::exonic(exon1, true), RegAnno::exonic(exon2, true));
        assert_eq!(span.in_exon(), expected);
        assert_eq!(span.entirely_in_cds(), expected);
    }

    #[test]
    fn in_exon_requires_both_exonic() {
        let span = RegSpanAnno::new(RegAnno::exonic(2, true), RegAnno::intronic(2, 3));
        assert!(!span.in_exon());
        let noncoding = RegSpanAnno::new(RegAnno::exonic(2, false), RegAnno::exonic(2, true));
        assert!(noncoding.in_exon());
        assert!(!noncoding.entirely_in_cds());
    }

    #[test]
    fn in_intron_and_utr() {
        let span = RegSpanAnno::new(RegAnno::intronic(2, 3), RegAnno::intronic(2, 3));
        assert!(span.in_intron());
        let span = RegSpanAnno::new(RegAnno::intronic(2, 3), RegAnno::intronic(3, 4));
        assert!(!span.in_intron());

        let span = RegSpanAnno::new(
            RegAnno::exonic(1, false).with_utr(Utr::Five),
            RegAnno::intronic(1, 2).with_utr(Utr::Five),
        );
        assert!(span.in_utr());
        let span = RegSpanAnno::new(
            RegAnno::exonic(1, false).with_utr(Utr::Five),
            RegAnno::exonic(5, false).with_utr(Utr::Three),
        );
        assert!(!span.in_utr());
    }

    #[test]
    fn csqn_precedence() {
        let mut span = RegSpanAnno::new(RegAnno::intronic(1, 2), RegAnno::intronic(1, 2));
        assert_eq!(span.csqn(), RegionCsqn::Intronic);

        span.splice_acceptors.push(junction(2));
        assert_eq!(span.csqn(), RegionCsqn::SpliceAcceptor);

        span.splice_donors.push(junction(1));
        assert_eq!(span.csqn(), RegionCsqn::SpliceDonor);

        span.intergenic = Some(RegIntergenicAnno {
            spanning: vec![String::from("GENE1")],
            ..Default::default()
        });
        assert_eq!(span.csqn(), RegionCsqn::SpliceDonor);

        span.intergenic = Some(RegIntergenicAnno::default());
        assert_eq!(span.csqn(), RegionCsqn::Intergenic);
    }

    #[test]
    fn csqn_utr_and_fallback() {
        let span = RegSpanAnno::new(
            RegAnno::exonic(3, false).with_utr(Utr::Three),
            RegAnno::exonic(3, false).with_utr(Utr::Three),
        );
        assert_eq!(span.csqn(), RegionCsqn::Utr3);
        let span = RegSpanAnno::new(RegAnno::exonic(1, true), RegAnno::exonic(2, true));
        assert_eq!(span.csqn(), RegionCsqn::Unclassified);
    }

    #[test]
    fn format_inside_same_region() {
        let t: Arc<dyn TranscriptModel> = Arc::new(plus_tx());
        let span = RegSpanAnno::new(
            RegAnno::exonic(2, true).with_transcript(t.clone()),
            RegAnno::exonic(2, true).with_transcript(t),
        );
        assert_eq!(span.format(), "inside_[cds_in_exon_2]");
    }

    #[test]
    fn format_same_transcript() {
        let t: Arc<dyn TranscriptModel> = Arc::new(plus_tx());
        let span = RegSpanAnno::new(
            RegAnno::exonic(1, true).with_transcript(t.clone()),
            RegAnno::intronic(2, 3).with_transcript(t),
        );
        assert_eq!(
            span.format(),
            "from_[cds_in_exon_1]_to_[intron_between_exon_2_and_3]"
        );
    }

    #[test]
    fn format_across_transcripts_names_genes() {
        let span = RegSpanAnno::new(
            RegAnno::exonic(1, true).with_transcript(Arc::new(plus_tx())),
            RegAnno::exonic(3, true).with_transcript(Arc::new(minus_tx())),
        );
        assert_eq!(
            span.format(),
            "from_[cds_in_exon_1;GENE1]_to_[cds_in_exon_3;GENE2]"
        );
    }

    #[rstest]
    #[case(5, "from_[cds_in_exon_1]_to_[cds_in_exon_3]_spanning_[G1,G2,G3,G4,G5]")]
    #[case(6, "from_[cds_in_exon_1]_to_[cds_in_exon_3]_spanning_[6_genes]")]
    fn format_spanning(#[case] count: usize, #[case] expected: &str) {
        let mut span = RegSpanAnno::new(RegAnno::exonic(1, true), RegAnno::exonic(3, true));
        span.spanning = (1..=count).map(|i| format!("G{}", i)).collect();
        assert_eq!(span.format(), expected);
    }

    #[test]
    fn format_intergenic_takes_precedence() {
        let mut span = RegSpanAnno::new(RegAnno::exonic(1, true), RegAnno::exonic(3, true));
        span.intergenic = Some(RegIntergenicAnno {
            e5_name: String::from("A"),
            e5_dist: 1500,
            e5_strand: Some(Strand::Plus),
            e3_name: String::from("B"),
            e3_dist: 20,
            e3_strand: Some(Strand::Minus),
            spanning: Vec::new(),
        });
        assert_eq!(
            span.format(),
            "inside_[intergenic_between_A(1,500_bp_downstream)_and_B(20_bp_downstream)]"
        );
    }
}
