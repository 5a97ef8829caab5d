//! Splice site proximity.

use serde::{Deserialize, Serialize};

use crate::transcript::{ExonBounds, Strand, Transcript};

/// Number of intronic bases forming the canonical splice dinucleotide.
const SITE_LEN: i64 = 2;
/// Number of exonic bases considered next to a splice site.
const NEXT_TO_LEN: i64 = 3;

/// Donor (exon 3' end) or acceptor (exon 5' end).
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display,
)]
pub enum SpliceType {
    #[default]
    Donor,
    Acceptor,
}

/// A splice site hit by a single position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpliceSite {
    pub chrm: String,
    pub pos: i64,
    /// Number of the exon the splice site belongs to.
    pub exonno: usize,
    pub stype: SpliceType,
    /// Only next to the splice site from the exon side.
    #[serde(default)]
    pub nextto: bool,
}

impl SpliceSite {
    /// Whether the position is on the splice site itself.
    pub fn is_on_site(&self) -> bool {
        !self.nextto
    }

    pub fn format(&self) -> String {
        format!(
            "{}Splice{}OfExon{}_At_{}:{}",
            if self.nextto { "NextTo" } else { "" },
            self.stype,
            self.exonno,
            self.chrm,
            self.pos
        )
    }
}

/// Classify a genomic position against the splice sites of one exon.
pub fn classify_splice(
    chrm: &str,
    pos: i64,
    exon: &ExonBounds,
    strand: Strand,
) -> Option<SpliceSite> {
    // genomic bounds of the exon's 5' and 3' ends
    let (five, three, dir) = match strand {
        Strand::Plus => (exon.beg, exon.end, 1),
        Strand::Minus => (exon.end, exon.beg, -1),
    };
    // distance in transcript orientation, positive is downstream
    let from_three = (pos - three) * dir;
    let from_five = (pos - five) * dir;

    let site = |stype, nextto| SpliceSite {
        chrm: chrm.to_owned(),
        pos,
        exonno: exon.number,
        stype,
        nextto,
    };

    if !exon.last && (1..=SITE_LEN).contains(&from_three) {
        Some(site(SpliceType::Donor, false))
    } else if !exon.first && (-SITE_LEN..=-1).contains(&from_five) {
        Some(site(SpliceType::Acceptor, false))
    } else if !exon.last && (-(NEXT_TO_LEN - 1)..=0).contains(&from_three) {
        Some(site(SpliceType::Donor, true))
    } else if !exon.first && (0..NEXT_TO_LEN).contains(&from_five) {
        Some(site(SpliceType::Acceptor, true))
    } else {
        None
    }
}

/// Find the splice site of `tx` hit by genomic position `pos`, if any.
pub fn locate(tx: &Transcript, pos: i64) -> Option<SpliceSite> {
    tx.exon_bounds()
        .iter()
        .find_map(|exon| classify_splice(&tx.chrm, pos, exon, tx.strand))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::transcript::test::{minus_tx, plus_tx};

    #[test]
    fn format() {
        let mut site = SpliceSite {
            chrm: String::from("chr17"),
            pos: 7579312,
            exonno: 4,
            stype: SpliceType::Donor,
            nextto: false,
        };
        assert_eq!(site.format(), "SpliceDonorOfExon4_At_chr17:7579312");
        site.nextto = true;
        site.stype = SpliceType::Acceptor;
        assert_eq!(site.format(), "NextToSpliceAcceptorOfExon4_At_chr17:7579312");
    }

    #[rstest]
    #[case(1101, Some((SpliceType::Donor, 1, false)))]
    #[case(1102, Some((SpliceType::Donor, 1, false)))]
    #[case(1103, None)]
    #[case(1100, Some((SpliceType::Donor, 1, true)))]
    #[case(1098, Some((SpliceType::Donor, 1, true)))]
    #[case(1097, None)]
    #[case(1999, Some((SpliceType::Acceptor, 2, false)))]
    #[case(2001, Some((SpliceType::Acceptor, 2, true)))]
    #[case(1001, None)]
    #[case(999, None)]
    #[case(3101, None)]
    fn locate_plus(#[case] pos: i64, #[case] expected: Option<(SpliceType, usize, bool)>) {
        let found = locate(&plus_tx(), pos).map(|s| (s.stype, s.exonno, s.nextto));
        assert_eq!(found, expected);
    }

    #[rstest]
    #[case(3000, Some((SpliceType::Donor, 1, false)))]
    #[case(3001, Some((SpliceType::Donor, 1, true)))]
    #[case(2013, Some((SpliceType::Acceptor, 2, false)))]
    #[case(2010, Some((SpliceType::Acceptor, 2, true)))]
    #[case(1100, Some((SpliceType::Acceptor, 3, true)))]
    #[case(1000, None)]
    fn locate_minus(#[case] pos: i64, #[case] expected: Option<(SpliceType, usize, bool)>) {
        let found = locate(&minus_tx(), pos).map(|s| (s.stype, s.exonno, s.nextto));
        assert_eq!(found, expected);
    }

    #[test]
    fn site_position_and_chromosome() {
        let site = locate(&plus_tx(), 1101);
        assert_eq!(
            site,
            Some(SpliceSite {
                chrm: String::from("chr1"),
                pos: 1101,
                exonno: 1,
                stype: SpliceType::Donor,
                nextto: false,
            })
        );
        assert!(site.map(|s| s.is_on_site()).unwrap_or(false));
    }
}
