//! DEF remap file parsing.
//!
//! DEF files are line-oriented text: whitespace/tab-delimited fields,
//! comments introduced by `#`, `;` or `//`, and optional brace groups
//! listing alternative ids:
//!
//! ```text
//! # index  alternatives   extra
//! 1209     {1206 1207}    0
//! 1210     1211           0
//! ```
//!
//! Each overlay pass reads `<index> <alt1 alt2 ...> [extra]` and copies the
//! first alternative whose backing entry exists.

use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::util::{Error, Result};

/// One parsed field: a bare number or a brace group of numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefPart {
    Int(i64),
    Group(SmallVec<[i64; 4]>),
}

/// One non-comment line of a DEF file.
#[derive(Debug, Clone)]
pub struct DefLine {
    parts: SmallVec<[DefPart; 8]>,
}

impl DefLine {
    /// Number of parsed fields on the line.
    #[inline]
    pub fn parts_count(&self) -> usize {
        self.parts.len()
    }

    /// Field `i` as a single integer (the first element for groups).
    pub fn int(&self, i: usize) -> Option<i64> {
        match self.parts.get(i)? {
            DefPart::Int(v) => Some(*v),
            DefPart::Group(g) => g.first().copied(),
        }
    }

    /// Field `i` as a list of alternatives (singleton for a bare number).
    pub fn group(&self, i: usize) -> Option<&[i64]> {
        match self.parts.get(i)? {
            DefPart::Int(v) => Some(std::slice::from_ref(v)),
            DefPart::Group(g) => Some(g.as_slice()),
        }
    }
}

/// Parsed DEF file, iterated line by line.
pub struct DefReader {
    lines: std::vec::IntoIter<DefLine>,
}

impl DefReader {
    /// Open and parse a DEF file.
    ///
    /// Lines with fewer than `min_parts` fields are dropped, matching how
    /// each overlay states its expected column count up front.
    pub fn open(path: impl AsRef<Path>, min_parts: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self::parse(&text, min_parts))
    }

    /// Parse DEF text.
    pub fn parse(text: &str, min_parts: usize) -> Self {
        let lines: Vec<DefLine> = text
            .lines()
            .filter_map(|line| parse_line(line, min_parts))
            .collect();
        Self {
            lines: lines.into_iter(),
        }
    }
}

impl Iterator for DefReader {
    type Item = DefLine;

    fn next(&mut self) -> Option<DefLine> {
        self.lines.next()
    }
}

fn parse_line(line: &str, min_parts: usize) -> Option<DefLine> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return None;
    }

    let mut parts: SmallVec<[DefPart; 8]> = SmallVec::new();
    let mut tokens = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .peekable();

    while let Some(token) = tokens.next() {
        if let Some(rest) = token.strip_prefix('{') {
            let mut group: SmallVec<[i64; 4]> = SmallVec::new();
            let mut push = |t: &str| {
                let t = t.trim_end_matches('}');
                if let Some(v) = parse_int(t) {
                    group.push(v);
                }
            };

            let closed = rest.contains('}');
            push(rest);
            if !closed {
                for t in tokens.by_ref() {
                    let done = t.contains('}');
                    push(t);
                    if done {
                        break;
                    }
                }
            }

            if !group.is_empty() {
                parts.push(DefPart::Group(group));
            }
        } else if let Some(v) = parse_int(token) {
            parts.push(DefPart::Int(v));
        }
        // Unparseable words are skipped; real files carry stray labels.
    }

    if parts.len() < min_parts {
        return None;
    }

    Some(DefLine { parts })
}

fn strip_comment(line: &str) -> &str {
    let end = line.len();
    let hash = line.find('#').unwrap_or(end);
    let semi = line.find(';').unwrap_or(end);
    let slashes = line.find("//").unwrap_or(end);
    &line[..hash.min(semi).min(slashes)]
}

fn parse_int(token: &str) -> Option<i64> {
    let token = token.trim();
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}
