//! Annotation of a single site.

use std::sync::Arc;

use crate::{
    common::append_inf,
    reg::{RegIntergenicAnno, RegionCsqn, Utr},
    splice::SpliceSite,
    transcript::TranscriptModel,
};

/// Where a resolved site lies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteKind {
    /// On an exon, `cds` tells whether the base is coding.
    Exonic { exon: usize, cds: bool },
    /// In the intron between two exons.
    Intronic { exon5: usize, exon3: usize },
    /// Outside of any gene.
    Intergenic(RegIntergenicAnno),
}

/// Annotation of a single site against one transcript.
#[derive(Debug, Clone)]
pub struct RegAnno {
    pub kind: SiteKind,
    pub utr: Option<Utr>,
    pub transcript: Option<Arc<dyn TranscriptModel>>,
    /// Set if the site hits the CDS start.
    pub cds_beg: Option<i64>,
    /// Set if the site hits the CDS end.
    pub cds_end: Option<i64>,
    /// Transcripts whose promoter contains the site.
    pub promoter: Vec<Arc<dyn TranscriptModel>>,
    pub splice: Option<SpliceSite>,
    /// Set if the site hits the transcription start.
    pub tss: Option<i64>,
    /// Set if the site hits the transcription end.
    pub tes: Option<i64>,
}

impl RegAnno {
    pub fn new(kind: SiteKind) -> Self {
        Self {
            kind,
            utr: None,
            transcript: None,
            cds_beg: None,
            cds_end: None,
            promoter: Vec::new(),
            splice: None,
            tss: None,
            tes: None,
        }
    }

    pub fn exonic(exon: usize, cds: bool) -> Self {
        Self::new(SiteKind::Exonic { exon, cds })
    }

    pub fn intronic(exon5: usize, exon3: usize) -> Self {
        Self::new(SiteKind::Intronic { exon5, exon3 })
    }

    pub fn intergenic(anno: RegIntergenicAnno) -> Self {
        Self::new(SiteKind::Intergenic(anno))
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptModel>) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn with_utr(mut self, utr: Utr) -> Self {
        self.utr = Some(utr);
        self
    }

    pub fn is_exonic(&self) -> bool {
        matches!(self.kind, SiteKind::Exonic { .. })
    }

    pub fn is_intronic(&self) -> bool {
        matches!(self.kind, SiteKind::Intronic { .. })
    }

    /// Exon number for exonic sites.
    pub fn exon(&self) -> Option<usize> {
        match self.kind {
            SiteKind::Exonic { exon, .. } => Some(exon),
            _ => None,
        }
    }

    /// Exon pair flanking the intron for intronic sites.
    pub fn intron_exons(&self) -> Option<(usize, usize)> {
        match self.kind {
            SiteKind::Intronic { exon5, exon3 } => Some((exon5, exon3)),
            _ => None,
        }
    }

    pub fn cds(&self) -> bool {
        matches!(self.kind, SiteKind::Exonic { cds: true, .. })
    }

    pub fn intergenic_anno(&self) -> Option<&RegIntergenicAnno> {
        match &self.kind {
            SiteKind::Intergenic(anno) => Some(anno),
            _ => None,
        }
    }

    pub fn genic(&self) -> bool {
        self.intergenic_anno().is_none()
    }

    pub fn entirely_in_cds(&self) -> bool {
        self.cds()
    }

    pub fn csqn(&self) -> RegionCsqn {
        if self.is_intronic() {
            RegionCsqn::Intronic
        } else if let Some(utr) = self.utr {
            utr.into()
        } else if !self.genic() {
            RegionCsqn::Intergenic
        } else {
            RegionCsqn::Unclassified
        }
    }

    /// Description without the `inside_[..]` wrapper.
    pub fn format0(&self, with_name: bool) -> String {
        let mut f = String::new();
        if let Some(utr) = self.utr {
            f = append_inf(&f, &format!("{}-UTR", utr));
        }
        match &self.kind {
            SiteKind::Intergenic(anno) => return anno.format0(),
            SiteKind::Intronic { exon5, exon3 } => {
                f = append_inf(&f, &format!("intron_between_exon_{}_and_{}", exon5, exon3));
            }
            SiteKind::Exonic { exon, cds: true } => {
                f = append_inf(&f, &format!("cds_in_exon_{}", exon));
            }
            SiteKind::Exonic { exon, cds: false } => {
                f = append_inf(&f, &format!("noncoding_exon_{}", exon));
            }
        }
        if with_name {
            if let Some(t) = &self.transcript {
                f = append_inf(&f, t.gene_name());
            }
        }
        f
    }

    pub fn format(&self, with_name: bool) -> String {
        format!("inside_[{}]", self.format0(with_name))
    }
}
