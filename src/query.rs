//! Mutation queries and their grammar.
//!
//! A query has the shape `[<token>:][<level>.]<body>` where the token is a
//! transcript, gene or chromosome name; a bare name is a gene query.

use serde::{Deserialize, Serialize};

use crate::{
    err::AnnoError,
    pos::{parse_pos, Pos},
    transcript::RefLenProvider,
};

/// Pattern for one residue, three-letter codes first.
const AA: &str = r"(?:[A-Z][a-z]{2}|[A-Z*])";
/// Pattern for one position token.
const POS: &str = r"[*+-]?\d+(?:[+-]+\d+)*";

lazy_static::lazy_static! {
    static ref RE_TRANSCRIPT: regex::Regex =
        regex::Regex::new(r"^((?:[NX][MR]_|ENST)\d+)(?:\.(\d+))?$")
            .expect("invalid regex in source code");
    static ref RE_NAME: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("invalid regex in source code");
    static ref RE_NUC_BODY: regex::Regex = regex::Regex::new(&format!(
        r"^(?P<beg>{POS})(?:_(?P<end>{POS}))?(?P<edit>.*)$"
    ))
    .expect("invalid regex in source code");
    static ref RE_NUC_SUBST: regex::Regex =
        regex::Regex::new(r"^([ACGTNacgtn]*)>([ACGTNacgtn]+)$").expect("invalid regex in source code");
    static ref RE_NUC_DEL: regex::Regex =
        regex::Regex::new(r"^del([ACGTNacgtn]*)$").expect("invalid regex in source code");
    static ref RE_NUC_DELINS: regex::Regex =
        regex::Regex::new(r"^del([ACGTNacgtn]*)ins([ACGTNacgtn]+)$")
            .expect("invalid regex in source code");
    static ref RE_NUC_INS: regex::Regex =
        regex::Regex::new(r"^ins([ACGTNacgtn]+)$").expect("invalid regex in source code");
    static ref RE_NUC_DUP: regex::Regex =
        regex::Regex::new(r"^dup([ACGTNacgtn]*)$").expect("invalid regex in source code");
    static ref RE_AA_BODY: regex::Regex = regex::Regex::new(&format!(
        r"^(?P<ref1>{AA})(?P<p1>\d+)(?:_(?P<ref2>{AA})(?P<p2>\d+))?(?P<edit>.*)$"
    ))
    .expect("invalid regex in source code");
    static ref RE_AA_SUBST: regex::Regex =
        regex::Regex::new(&format!(r"^({AA}|=)$")).expect("invalid regex in source code");
    static ref RE_AA_INS: regex::Regex =
        regex::Regex::new(&format!(r"^ins((?:{AA})+)$")).expect("invalid regex in source code");
    static ref RE_AA_DELINS: regex::Regex =
        regex::Regex::new(&format!(r"^delins((?:{AA})+)$")).expect("invalid regex in source code");
    static ref RE_AA_FS: regex::Regex =
        regex::Regex::new(&format!(r"^({AA})?fs(?:(?:\*|X|Ter)(\d+))?$"))
            .expect("invalid regex in source code");
}

/// Coordinate system a query is expressed in.
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
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    #[strum(serialize = "g")]
    Genomic,
    #[strum(serialize = "c")]
    Coding,
    #[strum(serialize = "n")]
    Noncoding,
    #[strum(serialize = "p")]
    Protein,
}

/// The kind of a query with the fields relevant to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryKind {
    Gene {
        gene: String,
    },
    Region {
        beg: Pos,
        end: Pos,
        refseq: String,
    },
    Snv {
        pos: Pos,
        #[serde(rename = "ref")]
        ref_: String,
        alt: String,
    },
    Deletion {
        beg: Pos,
        end: Pos,
        delseq: String,
        beg_aa: String,
        end_aa: String,
    },
    Insertion {
        beg: Pos,
        end: Pos,
        insseq: String,
        beg_aa: String,
        end_aa: String,
    },
    Mnv {
        beg: Pos,
        end: Pos,
        refseq: String,
        altseq: String,
        beg_aa: String,
        end_aa: String,
    },
    Duplication {
        beg: Pos,
        end: Pos,
        dupseq: String,
        beg_aa: String,
        end_aa: String,
    },
    FrameShift {
        pos: Pos,
        #[serde(rename = "ref")]
        ref_: String,
        alt: String,
        stop_index: Option<u32>,
    },
}

/// A parsed and validated query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The query as given, used as the output label.
    pub op: String,
    /// Transcript, gene or chromosome token before the colon.
    pub tok: Option<String>,
    /// Transcript identifier without version.
    pub tpt: Option<String>,
    pub tpt_version: Option<String>,
    pub level: Level,
    #[serde(flatten)]
    pub kind: QueryKind,
}

impl Query {
    /// Whether positions count codons rather than nucleotides.
    pub fn is_codon(&self) -> bool {
        self.level == Level::Protein
    }

    /// Clamp a region query into the bounds of its reference.
    ///
    /// Returns the number of clamped endpoints, other query kinds are left
    /// untouched.
    pub fn normalize_reg(&mut self, reflens: &dyn RefLenProvider) -> Result<usize, AnnoError> {
        if let QueryKind::Region { beg, end, .. } = &mut self.kind {
            let tok = self
                .tok
                .as_deref()
                .ok_or_else(|| AnnoError::invalid("region_without_reference", &self.op))?;
            let reflen = reflens.reflen(tok)?;
            Ok(normalize_reg(&mut beg.base, &mut end.base, reflen))
        } else {
            Ok(0)
        }
    }
}

impl std::str::FromStr for Query {
    type Err = AnnoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_query(s)
    }
}

/// Clamp `beg`/`end` into `[0, reflen]`, warning for each clamped endpoint.
pub fn normalize_reg(beg: &mut i64, end: &mut i64, reflen: i64) -> usize {
    let mut clamped = 0;
    for (label, value) in [("beg", beg), ("end", end)] {
        if *value < 0 {
            tracing::warn!("region {} {} negative, truncated to 0.", label, value);
            *value = 0;
            clamped += 1;
        }
        if *value > reflen {
            tracing::warn!(
                "region {} {} greater than chromosome length {}, truncated.",
                label,
                value,
                reflen
            );
            *value = reflen;
            clamped += 1;
        }
    }
    clamped
}

/// Validate a positive integer position.
pub fn validate_pos(token: &str) -> Result<i64, AnnoError> {
    match token.parse::<i64>() {
        Ok(value) if value > 0 && token.bytes().all(|b| b.is_ascii_digit()) => Ok(value),
        _ => {
            tracing::warn!("abnormal position {}. skip.", token);
            Err(AnnoError::invalid("position", token))
        }
    }
}

/// Parse a query string such as `NM_000546.5:c.215C>G` or `PIK3CA:p.E545K`.
pub fn parse_query(input: &str) -> Result<Query, AnnoError> {
    let op = input.trim();
    let (tok, rest) = match op.split_once(':') {
        Some((tok, rest)) => (Some(tok), rest),
        None => (None, op),
    };

    let (level, body) = match rest.split_once('.') {
        Some((prefix, body)) if prefix.len() == 1 => match prefix.parse::<Level>() {
            Ok(level) => (Some(level), body),
            Err(_) => return Err(AnnoError::invalid("level", prefix)),
        },
        _ => (None, rest),
    };

    let mut query = Query {
        op: op.to_owned(),
        tok: tok.map(str::to_owned),
        tpt: None,
        tpt_version: None,
        level: level.unwrap_or_default(),
        kind: QueryKind::Gene {
            gene: String::new(),
        },
    };

    if tok.is_none() && level.is_none() {
        if !RE_NAME.is_match(op) {
            return Err(AnnoError::invalid("gene", op));
        }
        query.kind = QueryKind::Gene {
            gene: op.to_owned(),
        };
        return Ok(query);
    }

    if let Some(cap) = tok.and_then(|tok| RE_TRANSCRIPT.captures(tok)) {
        query.tpt = Some(cap[1].to_owned());
        query.tpt_version = cap.get(2).map(|m| m.as_str().to_owned());
    }

    query.kind = match query.level {
        Level::Protein => parse_aa_body(body)?,
        level => parse_nuc_body(body, level == Level::Genomic)?,
    };
    Ok(query)
}

fn parse_nuc_pos(token: &str, genomic: bool) -> Result<Pos, AnnoError> {
    if genomic {
        Ok(Pos::new(validate_pos(token)?, 0))
    } else {
        parse_pos(token)
    }
}

fn upper(m: Option<regex::Match<'_>>) -> String {
    m.map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default()
}

fn parse_nuc_body(body: &str, genomic: bool) -> Result<QueryKind, AnnoError> {
    let cap = RE_NUC_BODY
        .captures(body)
        .ok_or_else(|| AnnoError::invalid("variant", body))?;
    let beg = parse_nuc_pos(&cap["beg"], genomic)?;
    let end = cap
        .name("end")
        .map(|m| parse_nuc_pos(m.as_str(), genomic))
        .transpose()?;
    let edit = &cap["edit"];

    if edit.is_empty() {
        return Ok(match end {
            Some(end) => QueryKind::Region {
                beg,
                end,
                refseq: String::new(),
            },
            None => QueryKind::Snv {
                pos: beg,
                ref_: String::new(),
                alt: String::new(),
            },
        });
    }
    if let Some(c) = RE_NUC_SUBST.captures(edit) {
        let (refseq, altseq) = (upper(c.get(1)), upper(c.get(2)));
        return Ok(if end.is_none() && refseq.len() <= 1 && altseq.len() == 1 {
            QueryKind::Snv {
                pos: beg,
                ref_: refseq,
                alt: altseq,
            }
        } else {
            QueryKind::Mnv {
                beg,
                end: end.unwrap_or(beg),
                refseq,
                altseq,
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        });
    }
    if let Some(c) = RE_NUC_DELINS.captures(edit) {
        return Ok(QueryKind::Mnv {
            beg,
            end: end.unwrap_or(beg),
            refseq: upper(c.get(1)),
            altseq: upper(c.get(2)),
            beg_aa: String::new(),
            end_aa: String::new(),
        });
    }
    if let Some(c) = RE_NUC_DEL.captures(edit) {
        return Ok(QueryKind::Deletion {
            beg,
            end: end.unwrap_or(beg),
            delseq: upper(c.get(1)),
            beg_aa: String::new(),
            end_aa: String::new(),
        });
    }
    if let Some(c) = RE_NUC_INS.captures(edit) {
        let end = end.ok_or_else(|| AnnoError::invalid("insertion", body))?;
        return Ok(QueryKind::Insertion {
            beg,
            end,
            insseq: upper(c.get(1)),
            beg_aa: String::new(),
            end_aa: String::new(),
        });
    }
    if let Some(c) = RE_NUC_DUP.captures(edit) {
        return Ok(QueryKind::Duplication {
            beg,
            end: end.unwrap_or(beg),
            dupseq: upper(c.get(1)),
            beg_aa: String::new(),
            end_aa: String::new(),
        });
    }
    Err(AnnoError::invalid("variant", body))
}

fn parse_aa_body(body: &str) -> Result<QueryKind, AnnoError> {
    let cap = RE_AA_BODY
        .captures(body)
        .ok_or_else(|| AnnoError::invalid("variant", body))?;
    let beg_aa = cap["ref1"].to_owned();
    let beg = Pos::new(validate_pos(&cap["p1"])?, 0);
    let end = cap
        .name("p2")
        .map(|m| validate_pos(m.as_str()))
        .transpose()?
        .map(|p| Pos::new(p, 0));
    let end_aa = cap
        .name("ref2")
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| beg_aa.clone());
    let edit = &cap["edit"];

    if edit.is_empty() {
        return Ok(match end {
            Some(end) => QueryKind::Region {
                beg,
                end,
                refseq: String::new(),
            },
            None => QueryKind::Snv {
                pos: beg,
                ref_: beg_aa,
                alt: String::new(),
            },
        });
    }
    if end.is_none() {
        if let Some(c) = RE_AA_SUBST.captures(edit) {
            let alt = match &c[1] {
                "=" => beg_aa.clone(),
                alt => alt.to_owned(),
            };
            return Ok(QueryKind::Snv {
                pos: beg,
                ref_: beg_aa,
                alt,
            });
        }
        if let Some(c) = RE_AA_FS.captures(edit) {
            let stop_index = c
                .get(2)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map_err(|_| AnnoError::invalid("stop_index", edit))?;
            return Ok(QueryKind::FrameShift {
                pos: beg,
                ref_: beg_aa,
                alt: c.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default(),
                stop_index,
            });
        }
    }
    let end_pos = end.unwrap_or(beg);
    if edit == "del" {
        return Ok(QueryKind::Deletion {
            beg,
            end: end_pos,
            delseq: String::new(),
            beg_aa,
            end_aa,
        });
    }
    if edit == "dup" {
        return Ok(QueryKind::Duplication {
            beg,
            end: end_pos,
            dupseq: String::new(),
            beg_aa,
            end_aa,
        });
    }
    if let Some(c) = RE_AA_DELINS.captures(edit) {
        return Ok(QueryKind::Mnv {
            beg,
            end: end_pos,
            refseq: String::new(),
            altseq: c[1].to_owned(),
            beg_aa,
            end_aa,
        });
    }
    if let (Some(c), Some(end)) = (RE_AA_INS.captures(edit), end) {
        return Ok(QueryKind::Insertion {
            beg,
            end,
            insseq: c[1].to_owned(),
            beg_aa,
            end_aa,
        });
    }
    Err(AnnoError::invalid("variant", body))
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tracing_test::traced_test;

    use super::*;
    use crate::transcript::RefLens;

    fn kind(input: &str) -> QueryKind {
        parse_query(input)
            .unwrap_or_else(|e| panic!("could not parse {}: {}", input, e))
            .kind
    }

    #[test]
    fn gene_query() -> Result<(), anyhow::Error> {
        let query = parse_query("TP53")?;
        assert_eq!(
            query.kind,
            QueryKind::Gene {
                gene: String::from("TP53")
            }
        );
        assert_eq!(query.tok, None);
        Ok(())
    }

    #[test]
    fn transcript_token() -> Result<(), anyhow::Error> {
        let query = parse_query("NM_000546.5:c.215C>G")?;
        assert_eq!(query.tok.as_deref(), Some("NM_000546.5"));
        assert_eq!(query.tpt.as_deref(), Some("NM_000546"));
        assert_eq!(query.tpt_version.as_deref(), Some("5"));
        assert_eq!(query.level, Level::Coding);
        assert!(!query.is_codon());
        assert_eq!(
            query.kind,
            QueryKind::Snv {
                pos: Pos::new(215, 0),
                ref_: String::from("C"),
                alt: String::from("G"),
            }
        );

        let query = parse_query("ENST00000269305:c.215C>G")?;
        assert_eq!(query.tpt.as_deref(), Some("ENST00000269305"));
        assert_eq!(query.tpt_version, None);

        let query = parse_query("PIK3CA:c.1633G>A")?;
        assert_eq!(query.tpt, None);
        Ok(())
    }

    #[test]
    fn nucleotide_kinds() {
        assert_eq!(
            kind("chr3:g.178936091_178936192"),
            QueryKind::Region {
                beg: Pos::new(178936091, 0),
                end: Pos::new(178936192, 0),
                refseq: String::new(),
            }
        );
        assert_eq!(
            kind("chr1:1000_2000"),
            QueryKind::Region {
                beg: Pos::new(1000, 0),
                end: Pos::new(2000, 0),
                refseq: String::new(),
            }
        );
        assert_eq!(
            kind("A1CF:c.1460+2T>C"),
            QueryKind::Snv {
                pos: Pos::new(1460, 2),
                ref_: String::from("T"),
                alt: String::from("C"),
            }
        );
        assert_eq!(
            kind("MET:c.3028+1_3028+4delGTAT"),
            QueryKind::Deletion {
                beg: Pos::new(3028, 1),
                end: Pos::new(3028, 4),
                delseq: String::from("GTAT"),
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        );
        assert_eq!(
            kind("ADAM33:c.991_992insTTCCTCCGC"),
            QueryKind::Insertion {
                beg: Pos::new(991, 0),
                end: Pos::new(992, 0),
                insseq: String::from("TTCCTCCGC"),
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        );
        assert_eq!(
            kind("A1CF:c.508_509CC>TT"),
            QueryKind::Mnv {
                beg: Pos::new(508, 0),
                end: Pos::new(509, 0),
                refseq: String::from("CC"),
                altseq: String::from("TT"),
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        );
        assert_eq!(
            kind("CHD7:c.1_2delinsAT"),
            QueryKind::Mnv {
                beg: Pos::new(1, 0),
                end: Pos::new(2, 0),
                refseq: String::new(),
                altseq: String::from("AT"),
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        );
        assert_eq!(
            kind("CHD7:c.*12dupA"),
            QueryKind::Duplication {
                beg: Pos::new(-1, 12),
                end: Pos::new(-1, 12),
                dupseq: String::from("A"),
                beg_aa: String::new(),
                end_aa: String::new(),
            }
        );
        assert_eq!(
            kind("chr7:g.140453136"),
            QueryKind::Snv {
                pos: Pos::new(140453136, 0),
                ref_: String::new(),
                alt: String::new(),
            }
        );
    }

    #[test]
    fn protein_kinds() {
        assert_eq!(
            kind("PIK3CA:p.E545K"),
            QueryKind::Snv {
                pos: Pos::new(545, 0),
                ref_: String::from("E"),
                alt: String::from("K"),
            }
        );
        assert_eq!(
            kind("PIK3CA:p.Glu545Lys"),
            QueryKind::Snv {
                pos: Pos::new(545, 0),
                ref_: String::from("Glu"),
                alt: String::from("Lys"),
            }
        );
        assert_eq!(
            kind("CDKN2A:p.R58*"),
            QueryKind::Snv {
                pos: Pos::new(58, 0),
                ref_: String::from("R"),
                alt: String::from("*"),
            }
        );
        assert_eq!(
            kind("PIK3CA:p.E545_E547"),
            QueryKind::Region {
                beg: Pos::new(545, 0),
                end: Pos::new(547, 0),
                refseq: String::new(),
            }
        );
        assert_eq!(
            kind("TP53:p.K132_R134del"),
            QueryKind::Deletion {
                beg: Pos::new(132, 0),
                end: Pos::new(134, 0),
                delseq: String::new(),
                beg_aa: String::from("K"),
                end_aa: String::from("R"),
            }
        );
        assert_eq!(
            kind("TP53:p.C135_S136insDA"),
            QueryKind::Insertion {
                beg: Pos::new(135, 0),
                end: Pos::new(136, 0),
                insseq: String::from("DA"),
                beg_aa: String::from("C"),
                end_aa: String::from("S"),
            }
        );
        assert_eq!(
            kind("TP53:p.L344_L348delinsQ"),
            QueryKind::Mnv {
                beg: Pos::new(344, 0),
                end: Pos::new(348, 0),
                refseq: String::new(),
                altseq: String::from("Q"),
                beg_aa: String::from("L"),
                end_aa: String::from("L"),
            }
        );
        assert_eq!(
            kind("TP53:p.E343dup"),
            QueryKind::Duplication {
                beg: Pos::new(343, 0),
                end: Pos::new(343, 0),
                dupseq: String::new(),
                beg_aa: String::from("E"),
                end_aa: String::from("E"),
            }
        );
        assert_eq!(
            kind("ABCB11:p.E1198Kfs*12"),
            QueryKind::FrameShift {
                pos: Pos::new(1198, 0),
                ref_: String::from("E"),
                alt: String::from("K"),
                stop_index: Some(12),
            }
        );
        assert_eq!(
            kind("ABCB11:p.E1198fs"),
            QueryKind::FrameShift {
                pos: Pos::new(1198, 0),
                ref_: String::from("E"),
                alt: String::new(),
                stop_index: None,
            }
        );
    }

    #[test]
    fn protein_query_is_codon() -> Result<(), anyhow::Error> {
        assert!(parse_query("PIK3CA:p.E545K")?.is_codon());
        Ok(())
    }

    #[rstest]
    #[case("chr1:g.0_100", AnnoError::invalid("position", "0"))]
    #[case("chr1:g.12a", AnnoError::invalid("variant", "12a"))]
    #[case("PIK3CA:p.E0K", AnnoError::invalid("position", "0"))]
    #[case("PIK3CA:c.abc", AnnoError::invalid("variant", "abc"))]
    #[case("PIK3CA:x.12A>T", AnnoError::invalid("level", "x"))]
    #[case("BRAF:c.100insA", AnnoError::invalid("insertion", "100insA"))]
    #[case("BR AF", AnnoError::invalid("gene", "BR AF"))]
    fn invalid_queries(#[case] input: &str, #[case] expected: AnnoError) {
        assert_eq!(parse_query(input), Err(expected));
    }

    #[traced_test]
    #[test]
    fn validate_pos_warns() {
        assert_eq!(validate_pos("12"), Ok(12));
        assert!(validate_pos("-3").is_err());
        assert!(validate_pos("x").is_err());
        assert!(logs_contain("abnormal position -3. skip."));
    }

    #[traced_test]
    #[test]
    fn normalize_reg_clamps_both_ends() {
        let (mut beg, mut end) = (-10, 1050);
        assert_eq!(normalize_reg(&mut beg, &mut end, 1000), 2);
        assert_eq!((beg, end), (0, 1000));
        assert!(logs_contain("region beg -10 negative, truncated to 0."));
        assert!(logs_contain(
            "region end 1050 greater than chromosome length 1000, truncated."
        ));
    }

    #[test]
    fn normalize_reg_inside_is_untouched() {
        let (mut beg, mut end) = (10, 500);
        assert_eq!(normalize_reg(&mut beg, &mut end, 1000), 0);
        assert_eq!((beg, end), (10, 500));
    }

    #[test]
    fn normalize_query_region() -> Result<(), anyhow::Error> {
        let reflens = RefLens {
            lengths: IndexMap::from([(String::from("chr1"), 1000)]),
        };
        let mut query = parse_query("chr1:g.900_2000")?;
        assert_eq!(query.normalize_reg(&reflens)?, 1);
        assert_eq!(
            query.kind,
            QueryKind::Region {
                beg: Pos::new(900, 0),
                end: Pos::new(1000, 0),
                refseq: String::new(),
            }
        );

        let mut snv = parse_query("chr1:g.5000A>T")?;
        assert_eq!(snv.normalize_reg(&reflens)?, 0);
        Ok(())
    }

    #[test]
    fn serialize_json() -> Result<(), anyhow::Error> {
        let query = parse_query("PIK3CA:p.E545K")?;
        insta::assert_snapshot!(
            serde_json::to_string(&query)?,
            @r#"{"op":"PIK3CA:p.E545K","tok":"PIK3CA","tpt":null,"tpt_version":null,"level":"protein","kind":"snv","pos":{"base":545,"offset":0},"ref":"E","alt":"K"}"#
        );
        Ok(())
    }
}
