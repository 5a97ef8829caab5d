//! One annotated output row and the classification steps that fill it.

use indexmap::IndexSet;
use itertools::Itertools;

use crate::{
    common::{FormatOptions, LONG_SEQUENCE},
    err::AnnoError,
    pos::Pos,
    reg::Region,
    splice::SpliceType,
    transcript::Strand,
};

/// Consequence suffix that does not make a boundary hit consequential.
const SYNONYMOUS: &str = "Synonymous";

/// Column header without the leading input column.
pub fn header_s() -> &'static str {
    "transcript\tgene\tstrand\tcoordinates(gDNA/cDNA/protein)\tregion\tinfo"
}

/// Full header line for the given output options.
pub fn header(opts: &FormatOptions) -> String {
    let mut s = format!("input\t{}", header_s());
    if opts.gseq {
        s.push_str("\tCHROM\tPOS\tREF\tALT");
    }
    s
}

/// An annotation of one query against one transcript.
///
/// String fields use `.` for "unset", coordinate parts use empty strings and
/// `None`.
#[derive(Debug, Clone)]
pub struct Record {
    pub tname: String,
    pub chrm: String,
    pub gene: String,
    pub strand: String,
    pub reg: Option<Region>,
    /// `;`-separated info tokens.
    pub info: String,
    /// Whether the record describes a variant rather than a region.
    pub is_var: bool,
    /// Consequence tags in the order they were found.
    pub csqn: Vec<String>,

    pub gnuc_range: String,
    pub gnuc_pos: Option<i64>,
    pub gnuc_ref: String,
    pub gnuc_alt: String,

    pub tnuc_range: String,
    pub tnuc_pos: Option<Pos>,
    pub tnuc_ref: String,
    pub tnuc_alt: String,

    pub taa_range: String,
    pub taa_pos: Option<i64>,
    pub taa_ref: String,
    pub taa_alt: String,

    pub vcf_pos: Option<i64>,
    pub vcf_ref: String,
    pub vcf_alt: String,
}

impl Default for Record {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Record {
    pub fn new(is_var: bool) -> Self {
        Self {
            tname: String::from("."),
            chrm: String::from("."),
            gene: String::from("."),
            strand: String::from("."),
            reg: None,
            info: String::from("."),
            is_var,
            csqn: Vec::new(),
            gnuc_range: String::new(),
            gnuc_pos: None,
            gnuc_ref: String::new(),
            gnuc_alt: String::new(),
            tnuc_range: String::new(),
            tnuc_pos: None,
            tnuc_ref: String::new(),
            tnuc_alt: String::new(),
            taa_range: String::new(),
            taa_pos: None,
            taa_ref: String::new(),
            taa_alt: String::new(),
            vcf_pos: None,
            vcf_ref: String::new(),
            vcf_alt: String::new(),
        }
    }

    /// Genomic coordinates, e.g., `chr3:g.178936091G>A`.
    pub fn gnuc(&self) -> String {
        let mut s = format!("{}:g.", self.chrm);
        if !self.gnuc_range.is_empty() {
            s.push_str(&self.gnuc_range);
        } else {
            if let Some(pos) = self.gnuc_pos {
                s.push_str(&pos.to_string());
            }
            s.push_str(&self.gnuc_ref);
            s.push('>');
            s.push_str(&self.gnuc_alt);
        }
        if s == ".:g.>" {
            String::from(".")
        } else {
            s
        }
    }

    /// Coding coordinates, e.g., `c.1633G>A`.
    pub fn tnuc(&self) -> String {
        if !self.tnuc_range.is_empty() {
            return format!("c.{}", self.tnuc_range);
        }
        let mut s = String::from("c.");
        if let Some(pos) = &self.tnuc_pos {
            s.push_str(&pos.to_string());
        }
        s.push_str(&self.tnuc_ref);
        s.push('>');
        s.push_str(&self.tnuc_alt);
        if s == "c.>" {
            String::from(".")
        } else {
            s
        }
    }

    /// Protein coordinates, e.g., `p.E545K`.
    pub fn taa(&self) -> String {
        let mut s = String::from("p.");
        if !self.taa_range.is_empty() {
            s.push_str(&self.taa_range);
        } else {
            s.push_str(&self.taa_ref);
            if let Some(pos) = self.taa_pos {
                s.push_str(&pos.to_string());
            }
            s.push_str(&self.taa_alt);
        }
        if s == "p." {
            String::from(".")
        } else {
            s
        }
    }

    pub fn format_id(&self) -> String {
        format!("{}/{}/{}", self.gnuc(), self.tnuc(), self.taa())
    }

    pub fn prepend_info(&mut self, token: &str) {
        self.info = prepend_info_col(&self.info, token);
    }

    pub fn append_info(&mut self, token: &str) {
        self.info = append_info_col(&self.info, token);
    }

    /// Note the promoters the region falls into.
    pub fn set_promoter(&mut self) {
        let tokens: Vec<String> = match &self.reg {
            Some(Region::Site(anno)) => anno
                .promoter
                .iter()
                .map(|t| format!("promoter_region_of_[{}]", t.gene_name()))
                .collect(),
            Some(Region::Span(anno)) => anno
                .promoter
                .iter()
                .map(|p| {
                    format!(
                        "promoter_region_of_[{}]_overlaping_{}_bp({:.2}%)",
                        p.transcript.gene_name(),
                        p.overlap,
                        p.frac
                    )
                })
                .collect(),
            _ => Vec::new(),
        };
        for token in tokens {
            self.append_info(&token);
        }
    }

    /// Record splice site and CDS boundary hits of the region.
    ///
    /// `action` suffixes the info tokens as `_<action>`, `csqn_action`
    /// suffixes the consequence tags.  Returns whether a hit was found that
    /// overrides the consequence derived from the region alone.  A span
    /// crossing a CDS boundary must carry its transcript.
    pub fn set_splice(&mut self, action: &str, csqn_action: &str) -> Result<bool, AnnoError> {
        let action = if action.is_empty() {
            String::new()
        } else {
            format!("_{}", action)
        };
        let (csqn, info, expt) = match &self.reg {
            Some(Region::Span(span)) => {
                let mut csqn = Vec::new();
                let mut info = Vec::new();
                let mut expt = false;
                if !span.splice_donors.is_empty() {
                    csqn.push(format!("SpliceDonor{}", csqn_action));
                }
                for j in &span.splice_donors {
                    expt = true;
                    info.push(format!(
                        "C2=donor_splice_site_on_exon_{}_at_{}:{}{}",
                        j.exon, j.chrm, j.pos, action
                    ));
                }
                if !span.splice_acceptors.is_empty() {
                    csqn.push(format!("SpliceAcceptor{}", csqn_action));
                }
                for j in &span.splice_acceptors {
                    expt = true;
                    info.push(format!(
                        "C2=acceptor_splice_site_on_exon_{}_at_{}:{}{}",
                        j.exon, j.chrm, j.pos, action
                    ));
                }
                if !span.splice_both.is_empty() {
                    expt = true;
                    info.push(format!(
                        "whole_exon_[{}]{}",
                        span.splice_both.iter().join(","),
                        action
                    ));
                }
                if span.cross_start || span.cross_end {
                    let t = span.transcript.as_ref().ok_or_else(|| {
                        AnnoError::Resolution(String::from("cds_boundary_without_transcript"))
                    })?;
                    // start and stop swap on the reverse strand
                    if span.cross_start {
                        expt = true;
                        let (tag, label) = match t.strand() {
                            Strand::Plus => ("CdsStart", "cds_start"),
                            Strand::Minus => ("CdsStop", "cds_stop"),
                        };
                        csqn.push(format!("{}{}", tag, csqn_action));
                        info.push(format!("{}_at_{}:{}{}", label, t.chrm(), t.cds_beg(), action));
                    }
                    if span.cross_end {
                        expt = true;
                        let (tag, label) = match t.strand() {
                            Strand::Plus => ("CdsStop", "cds_end"),
                            Strand::Minus => ("CdsStart", "cds_start"),
                        };
                        csqn.push(format!("{}{}", tag, csqn_action));
                        info.push(format!("{}_at_{}:{}{}", label, t.chrm(), t.cds_end(), action));
                    }
                }
                (csqn, info, expt)
            }
            Some(Region::Site(site)) => {
                let mut csqn = Vec::new();
                let mut info = Vec::new();
                let mut expt = false;
                let consequential = csqn_action != SYNONYMOUS;
                let chrm = site
                    .transcript
                    .as_ref()
                    .map(|t| t.chrm().to_owned())
                    .unwrap_or_else(|| self.chrm.clone());
                if let Some(splice) = &site.splice {
                    if splice.is_on_site() && consequential {
                        expt = true;
                        let tag = match splice.stype {
                            SpliceType::Donor => "SpliceDonor",
                            SpliceType::Acceptor => "SpliceAcceptor",
                        };
                        csqn.push(format!("{}{}", tag, csqn_action));
                    }
                    info.push(format!("C2={}", splice.format()));
                }
                if let Some(cds_beg) = site.cds_beg {
                    expt |= consequential;
                    csqn.push(format!("CdsStart{}", csqn_action));
                    info.push(format!("C2=cds_start_at_{}:{}", chrm, cds_beg));
                }
                if let Some(cds_end) = site.cds_end {
                    expt |= consequential;
                    csqn.push(format!("CdsStop{}", csqn_action));
                    info.push(format!("C2=cds_end_at_{}:{}", chrm, cds_end));
                }
                if let Some(tss) = site.tss {
                    expt |= consequential;
                    info.push(format!("transcription_start_at_{}:{}", chrm, tss));
                }
                if let Some(tes) = site.tes {
                    expt |= consequential;
                    info.push(format!("transcription_end_at_{}:{}", chrm, tes));
                }
                (csqn, info, expt)
            }
            _ => (Vec::new(), Vec::new(), false),
        };
        self.csqn.extend(csqn);
        for token in info {
            self.append_info(&token);
        }
        Ok(expt)
    }

    /// Add the consequence derived from the region, with `action` appended.
    pub fn set_csqn_byreg(&mut self, action: &str) {
        if let Some(reg) = &self.reg {
            self.csqn.push(format!("{}{}", reg.csqn(), action));
        }
    }

    /// The consequence token written in front of the info of variants.
    pub fn csqn_token(&self) -> String {
        let distinct: IndexSet<&str> = self.csqn.iter().map(String::as_str).collect();
        match distinct.len() {
            0 => String::from("CSQN=Unclassified"),
            1 => format!("CSQN={}", self.csqn[0]),
            _ => format!("CSQN=Multi:{}", self.csqn.join(",")),
        }
    }

    /// The info column as rendered, with consequence and transcript
    /// metadata added.
    pub fn finalized_info(&self) -> String {
        let mut info = self.info.clone();
        if self.is_var {
            info = prepend_info_col(&info, &self.csqn_token());
        }
        if let Some(t) = self.reg.as_ref().and_then(Region::transcript) {
            if let Some(dbxref) = t.gene_dbxref().filter(|s| !s.is_empty()) {
                info = append_info_col(&info, &format!("dbxref={}", dbxref));
            }
            if !t.aliases().is_empty() {
                info = append_info_col(&info, &format!("aliases={}", t.aliases().join(",")));
            }
            if let Some(source) = t.source().filter(|s| !s.is_empty()) {
                info = append_info_col(&info, &format!("source={}", source));
            }
        }
        info
    }

    /// Render the record as one tab-separated line without the input column.
    pub fn formats(&self, opts: &FormatOptions) -> String {
        let reg = self
            .reg
            .as_ref()
            .map(Region::format)
            .unwrap_or_else(|| String::from("."));
        let mut s = format!(
            "{}\t{}\t{}\t{}/{}/{}\t{}\t{}",
            self.tname,
            self.gene,
            self.strand,
            self.gnuc(),
            self.tnuc(),
            self.taa(),
            reg,
            self.finalized_info()
        );
        if opts.gseq {
            let seq = |seq: &str| {
                if seq.is_empty() {
                    LONG_SEQUENCE.to_owned()
                } else {
                    seq.to_owned()
                }
            };
            s.push_str(&format!(
                "\t{}\t{}\t{}\t{}",
                self.chrm,
                self.vcf_pos
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| String::from(".")),
                seq(&self.vcf_ref),
                seq(&self.vcf_alt)
            ));
        }
        s
    }
}

/// Append to an info column where `.` means empty.
fn append_info_col(info: &str, token: &str) -> String {
    if info.is_empty() || info == "." {
        token.to_owned()
    } else {
        format!("{};{}", info, token)
    }
}

/// Prepend to an info column where `.` means empty.
fn prepend_info_col(info: &str, token: &str) -> String {
    if info.is_empty() || info == "." {
        token.to_owned()
    } else {
        format!("{};{}", token, info)
    }
}
