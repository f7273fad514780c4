use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

use crate::snippet::Line;
use crate::util::line_of;

/// The body of a `snippet` tag.
///
/// If the body contains fenced code blocks, only their contents are compared
/// against the source file: fences and any prose around them are display-only.
/// A body without fences is compared line by line in its entirety.
#[derive(Debug, Clone)]
pub struct SnippetBlock<'a> {
    text: &'a str,
    lines: Vec<Line<'a>>,
    fenced: bool,
}

impl<'a> SnippetBlock<'a> {
    /// Returns `None` if `raw` is empty after trimming.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        let fenced_lines = fenced_lines(text);
        let fenced = fenced_lines.is_some();
        let lines = fenced_lines.unwrap_or_else(|| Line::split(text));
        Some(SnippetBlock { text, lines, fenced })
    }

    /// The trimmed block, verbatim.
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn is_fenced(&self) -> bool {
        self.fenced
    }

    /// Every line that takes part in matching, trimmed, before filtering.
    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    /// The display form: the block surrounded by blank lines, wrapped in a
    /// fence first if it has none of its own and `fence_bare` is set.
    pub fn render(&self, fence_bare: bool) -> String {
        if fence_bare && !self.fenced {
            let fence = fence_for(self.text);
            format!("\n{fence}\n{}\n{fence}\n\n", self.text)
        } else {
            format!("\n{}\n\n", self.text)
        }
    }
}

/// Collects the lines of every fenced code block in `text`, in order, without
/// the fences themselves. Returns `None` if `text` has no fenced code block.
fn fenced_lines(text: &str) -> Option<Vec<Line<'_>>> {
    let mut lines = vec![];
    let mut found = false;

    for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
        let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) = event else {
            continue;
        };

        let first = line_of(text, range.start);
        let mut raw_lines = text[range].split_inclusive('\n');
        let opener = raw_lines.next().and_then(|line| fence(line.trim()));
        let mut body: Vec<Line<'_>> = raw_lines
            .enumerate()
            .map(|(i, line)| Line { number: first + i + 1, text: line.trim() })
            .collect();

        while body.last().map_or(false, |l| l.text.is_empty()) {
            body.pop();
        }

        if body.last().map_or(false, |l| closes(opener, l.text)) {
            body.pop();
        }

        lines.extend(body);
        found = true;
    }

    found.then_some(lines)
}

/// The fence character and run length opening `line`, if it is a fence.
fn fence(line: &str) -> Option<(char, usize)> {
    let c = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|x| *x == c).count();
    (len >= 3).then_some((c, len))
}

/// Whether `line` closes a block opened by `opener`: the same character, at
/// least as many of it, and nothing else.
fn closes(opener: Option<(char, usize)>, line: &str) -> bool {
    match (opener, fence(line)) {
        (Some((c, open)), Some((d, len))) => {
            c == d && len >= open && line.trim_start_matches(c).is_empty()
        }
        _ => false,
    }
}

/// A backtick fence longer than any backtick run in `text`.
fn fence_for(text: &str) -> String {
    let longest = text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}
