//! Region annotations: classification of a resolved location against
//! transcript structure and its rendering.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::transcript::TranscriptModel;

pub mod cds;
pub mod intergenic;
pub mod site;
pub mod span;

pub use cds::RegCdsAnno;
pub use intergenic::RegIntergenicAnno;
pub use site::{RegAnno, SiteKind};
pub use span::{PromoterOverlap, RegSpanAnno, SpliceJunction};

/// Maximal number of spanned genes to list by name.
pub const MAX_SPANNING_NAMES: usize = 5;

/// Side of an untranslated region.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Utr {
    #[serde(rename = "5")]
    #[strum(serialize = "5")]
    Five,
    #[serde(rename = "3")]
    #[strum(serialize = "3")]
    Three,
}

/// Consequence derived from the region alone, used when there is no
/// amino acid level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum RegionCsqn {
    Intronic,
    #[strum(serialize = "5-UTR")]
    Utr5,
    #[strum(serialize = "3-UTR")]
    Utr3,
    Intergenic,
    SpliceDonor,
    SpliceAcceptor,
    Unclassified,
}

impl From<Utr> for RegionCsqn {
    fn from(utr: Utr) -> Self {
        match utr {
            Utr::Five => RegionCsqn::Utr5,
            Utr::Three => RegionCsqn::Utr3,
        }
    }
}

/// The region annotation attached to a record.
#[derive(Debug, Clone)]
pub enum Region {
    /// A single site.
    Site(RegAnno),
    /// A range between two sites.
    Span(RegSpanAnno),
    /// A single site between genes.
    Intergenic(RegIntergenicAnno),
    /// A codon or range of codons.
    Codon(RegCdsAnno),
}

impl Region {
    pub fn format(&self) -> String {
        match self {
            Region::Site(anno) => anno.format(false),
            Region::Span(anno) => anno.format(),
            Region::Intergenic(anno) => anno.format(),
            Region::Codon(anno) => anno.format(),
        }
    }

    pub fn csqn(&self) -> RegionCsqn {
        match self {
            Region::Site(anno) => anno.csqn(),
            Region::Span(anno) => anno.csqn(),
            Region::Intergenic(_) => RegionCsqn::Intergenic,
            Region::Codon(_) => RegionCsqn::Unclassified,
        }
    }

    /// The transcript the annotation refers to, if any.
    pub fn transcript(&self) -> Option<&Arc<dyn TranscriptModel>> {
        match self {
            Region::Site(anno) => anno.transcript.as_ref(),
            Region::Span(anno) => anno.transcript.as_ref(),
            Region::Intergenic(_) => None,
            Region::Codon(anno) => Some(&anno.transcript),
        }
    }
}

/// Whether two transcript references point to the same transcript.
pub(crate) fn same_transcript(
    t1: &Arc<dyn TranscriptModel>,
    t2: &Arc<dyn TranscriptModel>,
) -> bool {
    t1.name() == t2.name()
}

/// Whether two single sites describe the same region.
pub fn same_region(r1: &RegAnno, r2: &RegAnno) -> bool {
    r1.format(false) == r2.format(false)
        && match (&r1.transcript, &r2.transcript) {
            (Some(t1), Some(t2)) => same_transcript(t1, t2),
            _ => true,
        }
}
