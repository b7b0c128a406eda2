//! # Record Paths
//!
//! Dotted/bracketed path strings, tokenized once into key segments.
//!
//! ```text
//! inventory.weapons          -> ["inventory", "weapons"]
//! a.b['c.d']                 -> ["a", "b", "c.d"]
//! ["odd key"].count          -> ["odd key", "count"]
//! ```

use super::errors::RecordError;
use std::fmt;
use std::str::FromStr;

/// A tokenized record path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Tokenize a path string.
    pub fn parse(input: &str) -> Result<Self, RecordError> {
        // Single plain segment: no tokenizing.
        if !input.contains('.') && !input.contains('[') {
            if input.is_empty() {
                return Err(invalid(input, "empty path"));
            }
            return Ok(Self {
                segments: vec![input.to_string()],
            });
        }

        let bytes = input.as_bytes();
        let mut segments = Vec::new();
        let mut pos = 0;
        let mut expect_segment = true;

        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    if expect_segment && !segments.is_empty() {
                        return Err(invalid(input, "bracket segment after a separator"));
                    }
                    let quote = match bytes.get(pos + 1) {
                        Some(q @ (b'\'' | b'"')) => *q as char,
                        _ => return Err(invalid(input, "bracket segment must be quoted")),
                    };
                    let body_start = pos + 2;
                    let closing = format!("{quote}]");
                    let body_len = input[body_start..]
                        .find(&closing)
                        .ok_or_else(|| invalid(input, "unterminated bracket"))?;
                    segments.push(input[body_start..body_start + body_len].to_string());
                    pos = body_start + body_len + 2;
                    expect_segment = false;
                }
                b'.' => {
                    if expect_segment {
                        return Err(invalid(input, "empty segment"));
                    }
                    pos += 1;
                    expect_segment = true;
                    if pos == bytes.len() {
                        return Err(invalid(input, "trailing separator"));
                    }
                }
                _ => {
                    if !expect_segment {
                        return Err(invalid(input, "missing separator after bracket"));
                    }
                    let end = input[pos..]
                        .find(['.', '['])
                        .map_or(input.len(), |offset| pos + offset);
                    segments.push(input[pos..end].to_string());
                    pos = end;
                    expect_segment = false;
                }
            }
        }

        if segments.is_empty() {
            return Err(invalid(input, "empty path"));
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Key segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the empty path (the record itself).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment (the root field).
    pub fn root(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// Path made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> Path {
        Path::from_segments(self.segments[..len.min(self.segments.len())].iter().cloned())
    }

    /// Path made of the segments after the first `len`.
    pub fn suffix(&self, len: usize) -> Path {
        Path::from_segments(self.segments[len.min(self.segments.len())..].iter().cloned())
    }

    /// All non-empty prefixes, root to leaf (the last one is `self`).
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (1..=self.segments.len()).map(move |len| self.prefix(len))
    }

    /// Does `self` equal `other` or lie above it?
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

/// Canonical form: dotted where possible, bracketed otherwise.
///
/// A segment containing both `']` and `"]` has no bracketed form and does
/// not parse back.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if needs_brackets(segment) {
                let quote = if segment.contains('\'') && !segment.contains("\"]") {
                    '"'
                } else {
                    '\''
                };
                write!(f, "[{quote}{segment}{quote}]")?;
            } else {
                if i > 0 {
                    f.write_str(".")?;
                }
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

fn needs_brackets(segment: &str) -> bool {
    segment.is_empty() || segment.contains(['.', '[', ']', '\'', '"'])
}

fn invalid(path: &str, reason: &str) -> RecordError {
    RecordError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
