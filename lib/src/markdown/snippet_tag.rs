use std::borrow::Cow;
use std::cell::Cell;
use std::path::Path;

use crate::error::{Chainable, Result};
use crate::markdown::Plugin;
use crate::snippet::{SnippetArgs, Verifier};
use crate::util::line_of;

/// Expands Liquid-style `{% snippet path %} ... {% endsnippet %}` blocks.
///
/// Without a template engine each block is verified and replaced with its
/// display form. With one, blocks are instead lowered to
/// `{% filter snippet("path") %} ... {% endfilter %}` so the engine renders
/// the body once and verifies the rendered text. Other tags are left as-is
/// and the contents of `{% raw %}` blocks are never inspected. Whitespace
/// control dashes on snippet tags strip the surrounding whitespace.
pub struct SnippetTags<'v> {
    verifier: Option<&'v Verifier>,
    document: &'v Path,
    expanded: Cell<usize>,
}

/// A `{% name markup %}` tag spanning `input[start..end]`.
#[derive(Debug, Clone, Copy)]
struct TagSpan<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    markup: &'a str,
    /// `{%-`: strip whitespace before the tag.
    trim_before: bool,
    /// `-%}`: strip whitespace after the tag.
    trim_after: bool,
}

impl<'v> SnippetTags<'v> {
    pub fn new(verifier: &'v Verifier, document: &'v Path) -> Self {
        SnippetTags { verifier: Some(verifier), document, expanded: Cell::new(0) }
    }

    /// Lowers snippet tags to `snippet` filter blocks for a template engine.
    pub fn deferred(document: &'v Path) -> Self {
        SnippetTags { verifier: None, document, expanded: Cell::new(0) }
    }

    /// Number of snippet tags expanded so far.
    pub fn expanded(&self) -> usize {
        self.expanded.get()
    }

    /// Finds the tag named `name` closing the block opened by `open`.
    fn closing<'a>(&self, input: &'a str, open: TagSpan<'_>, name: &str) -> Result<TagSpan<'a>> {
        let mut cursor = open.end;
        while let Some(tag) = next_tag(input, cursor) {
            if tag.name == name {
                return Ok(tag);
            }

            if tag.name == open.name && open.name != "raw" {
                return err! {
                    format!("`{}` tags cannot be nested", open.name),
                    "document" => self.document.display(),
                    "outer tag line" => line_of(input, open.start),
                    "inner tag line" => line_of(input, tag.start),
                };
            }

            cursor = tag.end;
        }

        err! {
            format!("unterminated `{}` tag", open.name),
            "document" => self.document.display(),
            "line" => line_of(input, open.start),
            "expected" => format!("{{% {name} %}}"),
        }
    }
}

impl Plugin for SnippetTags<'_> {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        let mut output = Cow::Borrowed(input);
        let mut copied = 0;
        let mut cursor = 0;

        while let Some(tag) = next_tag(input, cursor) {
            match tag.name {
                "raw" => {
                    cursor = self.closing(input, tag, "endraw")?.end;
                    continue;
                }
                "snippet" => {}
                "endsnippet" => return err! {
                    "`endsnippet` without an opening `snippet` tag",
                    "document" => self.document.display(),
                    "line" => line_of(input, tag.start),
                },
                _ => {
                    cursor = tag.end;
                    continue;
                }
            }

            let line = line_of(input, tag.start);
            let context = |msg: &str| error! {
                msg,
                "document" => self.document.display(),
                "line" => line,
            };

            let args = SnippetArgs::parse(tag.markup)
                .chain_with(|| context("invalid snippet tag"))?;

            let close = self.closing(input, tag, "endsnippet")?;
            let body = &input[tag.end..close.start];
            let replacement = match self.verifier {
                Some(verifier) => verifier.verify_and_render(body, &args.file_ref, self.document)
                    .chain_with(|| context("snippet verification failed"))?,
                None => format!(
                    "{{% filter snippet({}) %}}{body}{{% endfilter %}}",
                    string_literal(&args.file_ref)
                ),
            };

            let prefix = &input[copied..tag.start];
            let prefix = if tag.trim_before { prefix.trim_end() } else { prefix };
            if matches!(output, Cow::Borrowed(_)) {
                output = Cow::Owned(String::with_capacity(input.len()));
            }

            let buf = output.to_mut();
            buf.push_str(prefix);
            buf.push_str(&replacement);

            copied = match close.trim_after {
                true => input.len() - input[close.end..].trim_start().len(),
                false => close.end,
            };

            cursor = copied;
            self.expanded.set(self.expanded.get() + 1);
        }

        if let Cow::Owned(buf) = &mut output {
            buf.push_str(&input[copied..]);
        }

        Ok(output)
    }
}

/// Finds the next complete `{% name ... %}` tag at or after `from`. A `{%`
/// that is followed by another `{%` before its `%}`, or whose name is not an
/// identifier, is plain text.
fn next_tag(input: &str, mut from: usize) -> Option<TagSpan<'_>> {
    let bytes = input.as_bytes();
    loop {
        let start = from + memchr::memmem::find(bytes.get(from..)?, b"{%")?;
        let close = start + 2 + memchr::memmem::find(&bytes[start + 2..], b"%}")?;
        if let Some(i) = memchr::memmem::find(&bytes[start + 2..close], b"{%") {
            from = start + 2 + i;
            continue;
        }

        let inner = &input[start + 2..close];
        let (trim_before, trim_after) = (inner.starts_with('-'), inner.ends_with('-'));
        let inner = inner.strip_prefix('-').unwrap_or(inner);
        let inner = inner.strip_suffix('-').unwrap_or(inner).trim();
        let (name, markup) = match inner.find(char::is_whitespace) {
            Some(i) => (&inner[..i], inner[i..].trim()),
            None => (inner, ""),
        };

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            from = start + 2;
            continue;
        }

        let end = close + 2;
        return Some(TagSpan { start, end, name, markup, trim_before, trim_after });
    }
}

/// `value` as a double-quoted template string literal.
fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::snippet::Options;

    fn fixture() -> (tempfile::TempDir, Verifier) {
        let site = tempfile::tempdir().unwrap();
        fs::create_dir_all(site.path().join("tutorials/ctmc/scripts")).unwrap();
        fs::write(
            site.path().join("tutorials/ctmc/scripts/mcmc.Rev"),
            "moves = VectorMoves()\n# the tree\ntree ~ dnUniformTopology(taxa)\nmymcmc.run(10000)\n",
        ).unwrap();

        let options = Options { fence_bare_blocks: false, ..Options::default() };
        let verifier = Verifier::new(site.path(), options);
        (site, verifier)
    }

    const PAGE: &str = "tutorials/ctmc/index.md";

    #[test]
    fn tags_are_replaced_in_place() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "Intro {{ site.title }}\n\
            {% snippet scripts/mcmc.Rev %}\nmoves = VectorMoves()\nmymcmc.run(10000)\n{% endsnippet %}\n\
            Outro {% include footer.html %}\n";

        let output = tags.preprocess(input).unwrap();
        assert_eq!(output, "Intro {{ site.title }}\n\
            \nmoves = VectorMoves()\nmymcmc.run(10000)\n\n\n\
            Outro {% include footer.html %}\n");

        assert_eq!(tags.expanded(), 1);
    }

    #[test]
    fn documents_without_snippets_are_borrowed() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "{% if page.x %}text{% endif %} and {{ y }}";
        assert!(matches!(tags.preprocess(input).unwrap(), Cow::Borrowed(_)));
        assert_eq!(tags.expanded(), 0);
    }

    #[test]
    fn whitespace_control_and_quotes_are_accepted() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "{%- snippet \"scripts/mcmc.Rev\" -%}\ntree ~ dnUniformTopology(taxa)\n{%- endsnippet -%}\
            {%snippet scripts/mcmc.Rev%}mymcmc.run(10000){%endsnippet%}";

        let output = tags.preprocess(input).unwrap();
        assert_eq!(output, "\ntree ~ dnUniformTopology(taxa)\n\n\nmymcmc.run(10000)\n\n");
        assert_eq!(tags.expanded(), 2);
    }

    #[test]
    fn whitespace_control_strips_around_the_block() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "Intro  \n{%- snippet scripts/mcmc.Rev %}\nmymcmc.run(10000)\n{% endsnippet -%}\n\n  Outro";
        assert_eq!(tags.preprocess(input).unwrap(), "Intro\nmymcmc.run(10000)\n\nOutro");

        let input = "Intro  \n{% snippet scripts/mcmc.Rev %}mymcmc.run(10000){% endsnippet %}\nOutro";
        assert_eq!(tags.preprocess(input).unwrap(), "Intro  \n\nmymcmc.run(10000)\n\n\nOutro");
    }

    #[test]
    fn raw_blocks_are_skipped() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "{% raw %}{% snippet nope.py %}x{% endsnippet %}{% endraw %}";
        assert_eq!(tags.preprocess(input).unwrap(), input);
        assert_eq!(tags.expanded(), 0);
    }

    #[test]
    fn failures_name_the_document_and_line() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "# Title\n\n{% snippet scripts/mcmc.Rev %}\nmymcmc.run(10000)\nmoves = VectorMoves()\n{% endsnippet %}\n";
        let error = tags.preprocess(input).unwrap_err();
        assert_eq!(error.message(), "snippet verification failed");
        assert!(error.mentions(PAGE));
        assert!(error.to_string().contains("line: 3"));
        assert!(error.mentions("moves = VectorMoves()"));
    }

    #[test]
    fn missing_files_surface_as_not_found() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let error = tags.preprocess("{% snippet data/none.nex %}x{% endsnippet %}").unwrap_err();
        assert!(error.mentions("not found at"));
        assert!(error.mentions("tutorials/ctmc/data/none.nex"));
    }

    #[test]
    fn malformed_tags_fail() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let unterminated = tags.preprocess("a\n{% snippet scripts/mcmc.Rev %}\nmoves = VectorMoves()\n").unwrap_err();
        assert_eq!(unterminated.message(), "unterminated `snippet` tag");
        assert!(unterminated.to_string().contains("line: 2"));

        let nested = tags.preprocess("{% snippet a %}{% snippet b %}{% endsnippet %}").unwrap_err();
        assert_eq!(nested.message(), "`snippet` tags cannot be nested");

        let no_args = tags.preprocess("{% snippet %}x{% endsnippet %}").unwrap_err();
        assert_eq!(no_args.message(), "invalid snippet tag");
        assert!(no_args.mentions("missing file path"));

        let stray_end = tags.preprocess("text\n{% endsnippet %}").unwrap_err();
        assert_eq!(stray_end.message(), "`endsnippet` without an opening `snippet` tag");
        assert!(stray_end.to_string().contains("line: 2"));
    }

    #[test]
    fn stray_tag_openers_do_not_hide_snippets() {
        let (_site, verifier) = fixture();
        let tags = SnippetTags::new(&verifier, Path::new(PAGE));

        let input = "Liquid tags start with {% and\n{% snippet scripts/mcmc.Rev %}\nTOTALLY_WRONG\n{% endsnippet %}";
        let error = tags.preprocess(input).unwrap_err();
        assert_eq!(error.message(), "snippet verification failed");
        assert!(error.mentions("TOTALLY_WRONG"));

        let input = "50{% 'off' %} {% snippet scripts/mcmc.Rev %}mymcmc.run(10000){% endsnippet %}";
        let output = tags.preprocess(input).unwrap();
        assert_eq!(output, "50{% 'off' %} \nmymcmc.run(10000)\n\n");
        assert_eq!(tags.expanded(), 1);
    }

    #[test]
    fn deferred_tags_become_filter_blocks() {
        let tags = SnippetTags::deferred(Path::new(PAGE));

        let input = "a {%- snippet 'scripts/say \"hi\".py' %}print({{ x }}){% endsnippet -%} b";
        let output = tags.preprocess(input).unwrap();
        assert_eq!(output, "a{% filter snippet(\"scripts/say \\\"hi\\\".py\") %}print({{ x }}){% endfilter %}b");
        assert_eq!(tags.expanded(), 1);

        let error = tags.preprocess("{% snippet a b %}x{% endsnippet %}").unwrap_err();
        assert_eq!(error.message(), "invalid snippet tag");
    }
}
