use serde::{Deserialize, Serialize};

use crate::snippet::Line;

/// A scan position into the (filtered) source lines. Each match step takes a
/// cursor and returns the next one; it only ever moves forward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(pub usize);

/// How snippet lines must be laid out in the source file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// In order, with any number of source lines in between.
    #[default]
    Subsequence,
    /// In order, with no source lines in between.
    Contiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matched {
    /// Position just past the last matched source line.
    pub end: Cursor,
    /// Source line numbers of the first and last matched lines.
    pub span: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Index of the unmatched line in the snippet lines.
    pub index: usize,
    /// Where the search for that line began.
    pub cursor: Cursor,
}

impl Cursor {
    /// Finds `needle` at or after `self`, returning the position just past it.
    pub fn advance(self, haystack: &[Line<'_>], needle: &str) -> Option<Cursor> {
        haystack.get(self.0..)?
            .iter()
            .position(|line| line.text == needle)
            .map(|i| Cursor(self.0 + i + 1))
    }

    /// The source line number preceding `self`, `0` at the start of the file.
    pub fn after_line(self, haystack: &[Line<'_>]) -> usize {
        self.0.checked_sub(1)
            .and_then(|i| haystack.get(i))
            .map_or(0, |line| line.number)
    }
}

impl MatchPolicy {
    pub fn run(self, needles: &[Line<'_>], haystack: &[Line<'_>]) -> Result<Matched, Mismatch> {
        match self {
            MatchPolicy::Subsequence => subsequence(needles, haystack),
            MatchPolicy::Contiguous => contiguous(needles, haystack),
        }
    }
}

pub fn subsequence(needles: &[Line<'_>], haystack: &[Line<'_>]) -> Result<Matched, Mismatch> {
    let mut cursor = Cursor::default();
    let mut first = None;
    for (index, needle) in needles.iter().enumerate() {
        cursor = cursor.advance(haystack, needle.text).ok_or(Mismatch { index, cursor })?;
        first.get_or_insert(cursor);
    }

    let span = first.map(|start| (start.after_line(haystack), cursor.after_line(haystack)));
    Ok(Matched { end: cursor, span })
}

pub fn contiguous(needles: &[Line<'_>], haystack: &[Line<'_>]) -> Result<Matched, Mismatch> {
    if needles.is_empty() {
        return Ok(Matched { end: Cursor::default(), span: None });
    }

    // (matched prefix length, window start) of the longest partial match
    let mut best = (0, 0);
    for start in 0..haystack.len() {
        let len = needles.iter()
            .zip(&haystack[start..])
            .take_while(|(needle, line)| needle.text == line.text)
            .count();

        if len == needles.len() {
            let end = Cursor(start + len);
            let span = (haystack[start].number, end.after_line(haystack));
            return Ok(Matched { end, span: Some(span) });
        }

        if len > best.0 {
            best = (len, start);
        }
    }

    let (len, start) = best;
    Err(Mismatch { index: len, cursor: Cursor(start + len) })
}
