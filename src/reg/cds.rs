//! Codon level annotation, used for protein regions, sites and changes.

use std::sync::Arc;

use itertools::Itertools;

use crate::{err::AnnoError, transcript::TranscriptModel};

/// Exons touched by a codon or a range of codons.
#[derive(Debug, Clone)]
pub struct RegCdsAnno {
    pub transcript: Arc<dyn TranscriptModel>,
    pub exons: Vec<usize>,
}

impl RegCdsAnno {
    /// Annotate the residues `taa_beg..=taa_end`.
    pub fn from_taa_range(
        transcript: Arc<dyn TranscriptModel>,
        taa_beg: i64,
        taa_end: i64,
    ) -> Result<Self, AnnoError> {
        let tnuc_beg = taa_beg.checked_mul(3).and_then(|v| v.checked_sub(2));
        let tnuc_end = taa_end.checked_mul(3);
        let (tnuc_beg, tnuc_end) = tnuc_beg.zip(tnuc_end).ok_or_else(|| {
            AnnoError::Resolution(format!("codon_range_{}_{}_overflows", taa_beg, taa_end))
        })?;
        let exons = transcript.tnuc_range_to_exon_inds(tnuc_beg, tnuc_end)?;
        Ok(Self { transcript, exons })
    }

    /// Annotate the single codon with 1-based index `cindex`.
    pub fn from_cindex(transcript: Arc<dyn TranscriptModel>, cindex: i64) -> Result<Self, AnnoError> {
        Self::from_taa_range(transcript, cindex, cindex)
    }

    pub fn format0(&self) -> String {
        match self.exons.as_slice() {
            [exon] => format!("cds_in_exon_{}", exon),
            exons => format!("cds_in_exons_[{}]", exons.iter().join(",")),
        }
    }

    pub fn format(&self) -> String {
        format!("inside_[{}]", self.format0())
    }
}
