//! Dual-coordinate positions with intron/UTR relative offsets.

use serde::{Deserialize, Serialize};

use crate::err::AnnoError;

lazy_static::lazy_static! {
    static ref RE_OFFSET: regex::Regex =
        regex::Regex::new(r"^(\d+)((?:[+-]+\d+)+)$").expect("invalid regex in source code");
    static ref RE_RELATIVE: regex::Regex =
        regex::Regex::new(r"^([*+-])(\d+)$").expect("invalid regex in source code");
    static ref RE_TERM: regex::Regex =
        regex::Regex::new(r"([+-]+)(\d+)").expect("invalid regex in source code");
}

/// A position along the genomic, transcript or protein axis.
///
/// `base` is the absolute coordinate; a negative `base` means the position is
/// measured from the transcript end.  `offset` is non-zero only for positions
/// inside an intron or beyond the UTR and gives the distance to the nearest
/// exon boundary (positive for 3' side, negative for 5' side).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    pub base: i64,
    pub offset: i64,
}

impl Pos {
    pub fn new(base: i64, offset: i64) -> Self {
        Self { base, offset }
    }

    /// Whether the position lies exactly on an exonic base.
    pub fn is_exonic(&self) -> bool {
        self.offset == 0
    }

    /// Move the active coordinate downstream; does not check boundaries.
    pub fn add(&mut self, inc: i64) {
        if self.offset == 0 {
            self.base += inc;
        } else {
            self.offset += inc;
        }
    }

    /// Move the active coordinate upstream; does not check boundaries.
    pub fn subtract(&mut self, inc: i64) {
        if self.offset == 0 {
            self.base -= inc;
        } else {
            self.offset -= inc;
        }
    }

    pub fn included_plus(&self) -> i64 {
        if self.offset > 0 {
            self.base + 1
        } else {
            self.base
        }
    }

    pub fn included_minus(&self) -> i64 {
        if self.offset < 0 {
            self.base - 1
        } else {
            self.base
        }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.offset {
            0 => write!(f, "{}", self.base),
            o if o < 0 => write!(f, "{}{}", self.base, o),
            o if self.base < 0 => write!(f, "*{}", o),
            o => write!(f, "{}+{}", self.base, o),
        }
    }
}

impl std::str::FromStr for Pos {
    type Err = AnnoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_pos(s)
    }
}

/// Whether two positions are anchored to the same intron.
pub fn same_intron(p1: &Pos, p2: &Pos) -> bool {
    p1.included_minus() == p2.included_minus() && p1.offset != 0 && p2.offset != 0
}

/// Sum the signed integer terms of an offset expression such as `+45`, `-7` or `+-3`.
fn eval_offset(expr: &str, token: &str) -> Result<i64, AnnoError> {
    let mut total = 0i64;
    for cap in RE_TERM.captures_iter(expr) {
        let negative = cap[1].chars().filter(|c| *c == '-').count() % 2 == 1;
        let value: i64 = cap[2]
            .parse()
            .map_err(|_| AnnoError::invalid("position_string", token))?;
        let term = if negative { value.checked_neg() } else { Some(value) };
        total = term
            .and_then(|term| total.checked_add(term))
            .ok_or_else(|| AnnoError::invalid("position_string", token))?;
    }
    Ok(total)
}

/// Parse a position token, e.g., `123`, `123+45`, `123-7`, `*12` or `-5`.
pub fn parse_pos(token: &str) -> Result<Pos, AnnoError> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        let base = token
            .parse()
            .map_err(|_| AnnoError::invalid("position_string", token))?;
        return Ok(Pos::new(base, 0));
    }

    if let Some(cap) = RE_OFFSET.captures(token) {
        let base = cap[1]
            .parse()
            .map_err(|_| AnnoError::invalid("position_string", token))?;
        return Ok(Pos::new(base, eval_offset(&cap[2], token)?));
    }

    if let Some(cap) = RE_RELATIVE.captures(token) {
        let value: i64 = cap[2]
            .parse()
            .map_err(|_| AnnoError::invalid("position_string", token))?;
        // `+`/`*` are relative to the transcript end, `*` is not a sign
        return Ok(match &cap[1] {
            "-" => Pos::new(1, -value),
            _ => Pos::new(-1, value),
        });
    }

    Err(AnnoError::invalid("position_string", token))
}
