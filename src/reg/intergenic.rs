//! Annotation of intergenic sites.

use serde::{Deserialize, Serialize};

use crate::{common::format_group, transcript::Strand};

/// A site between the nearest genes on either side.
///
/// The flank strands are absent when the flank is a chromosome end rather
/// than a gene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RegIntergenicAnno {
    pub e5_name: String,
    pub e5_dist: i64,
    #[serde(default)]
    pub e5_strand: Option<Strand>,
    pub e3_name: String,
    pub e3_dist: i64,
    #[serde(default)]
    pub e3_strand: Option<Strand>,
    /// Genes spanned when annotating a range.
    #[serde(default)]
    pub spanning: Vec<String>,
}

impl RegIntergenicAnno {
    /// Direction of the site seen from the 5' flanking gene.
    pub fn e5_stream(&self) -> Option<&'static str> {
        self.e5_strand.map(|strand| match strand {
            Strand::Plus => "downstream",
            Strand::Minus => "upstream",
        })
    }

    /// Direction of the site seen from the 3' flanking gene.
    pub fn e3_stream(&self) -> Option<&'static str> {
        self.e3_strand.map(|strand| match strand {
            Strand::Minus => "downstream",
            Strand::Plus => "upstream",
        })
    }

    pub fn format0(&self) -> String {
        let flank = |dist: i64, stream: Option<&str>| match stream {
            Some(stream) => format!("{}_bp_{}", format_group(dist), stream),
            None => format!("{}_bp", format_group(dist)),
        };
        format!(
            "intergenic_between_{}({})_and_{}({})",
            self.e5_name,
            flank(self.e5_dist, self.e5_stream()),
            self.e3_name,
            flank(self.e3_dist, self.e3_stream()),
        )
    }

    pub fn format(&self) -> String {
        format!("inside_[{}]", self.format0())
    }
}
