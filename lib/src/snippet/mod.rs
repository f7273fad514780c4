//! Verification of documentation snippets against their source files.
//!
//! A snippet is a block of text in a document that claims to be an excerpt of
//! a file next to that document. [`Verifier::verify_and_render()`] checks the
//! claim: every (normalized, non-skipped) line of the block must appear in
//! the file in the same relative order. On success the block is returned in
//! its display form; on failure a [`SnippetError`] names the file and the
//! first line that could not be found.
//!
//! ```rust
//! use std::fs;
//! use excerpt::snippet::{Options, Verifier};
//!
//! let site = tempfile::tempdir().unwrap();
//! fs::create_dir_all(site.path().join("docs")).unwrap();
//! fs::write(site.path().join("docs/run.py"), "a=1\n# comment\nb=2\nc=3\n").unwrap();
//!
//! let verifier = Verifier::new(site.path(), Options::default());
//! let page = "docs/index.md";
//! assert!(verifier.verify_and_render("a=1\nb=2", "run.py", page).is_ok());
//! assert!(verifier.verify_and_render("c=3\nb=2", "run.py", page).is_err());
//! ```

mod error;
mod args;
mod block;
mod source;
mod matcher;

pub use error::*;
pub use args::*;
pub use block::*;
pub use source::*;
pub use matcher::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A trimmed line and its 1-based line number in the text it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// Splits `text` on `\n` or `\r\n`, trimming every line.
    pub fn split(text: &'a str) -> Vec<Line<'a>> {
        text.lines()
            .enumerate()
            .map(|(i, line)| Line { number: i + 1, text: line.trim() })
            .collect()
    }
}

/// Which trimmed lines take part in matching.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineFilter {
    /// Blank lines and lines starting with a comment prefix are ignored.
    #[default]
    SkipComments,
    /// Every line must match, blank lines included.
    KeepAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub policy: MatchPolicy,
    pub filter: LineFilter,
    pub comment_prefixes: Vec<String>,
    /// Wrap blocks that carry no fence of their own in one when rendering.
    pub fence_bare_blocks: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            policy: MatchPolicy::default(),
            filter: LineFilter::default(),
            comment_prefixes: vec!["#".into()],
            fence_bare_blocks: true,
        }
    }
}

impl Options {
    pub fn participates(&self, line: &str) -> bool {
        match self.filter {
            LineFilter::KeepAll => true,
            LineFilter::SkipComments => !line.is_empty() && !self.is_comment(line),
        }
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comment_prefixes.iter().any(|p| !p.is_empty() && line.starts_with(p.as_str()))
    }

    fn retain<'a>(&self, lines: &[Line<'a>]) -> Vec<Line<'a>> {
        lines.iter().filter(|l| self.participates(l.text)).copied().collect()
    }
}

/// Verifies snippets for one site. Holds no per-verification state: every
/// call resolves, reads and scans its source file afresh.
#[derive(Debug, Clone)]
pub struct Verifier {
    root: PathBuf,
    options: Options,
}

impl Verifier {
    pub fn new<P: AsRef<Path>>(root: P, options: Options) -> Self {
        Verifier { root: root.as_ref().to_path_buf(), options }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Verifies that `raw_block` is an excerpt of `file_ref`, resolved
    /// relative to the directory of `document` (itself relative to the site
    /// root), and returns the block's display form.
    pub fn verify_and_render<P: AsRef<Path>>(
        &self,
        raw_block: &str,
        file_ref: &str,
        document: P,
    ) -> Result<String, SnippetError> {
        self.verify(raw_block, FileRef::declared(file_ref, document))
    }

    pub fn verify(&self, raw_block: &str, file: FileRef) -> Result<String, SnippetError> {
        let empty = || SnippetError::EmptyBlock { file_ref: file.file_ref().to_string() };
        let block = SnippetBlock::parse(raw_block).ok_or_else(empty)?;
        let needles = self.options.retain(block.lines());
        if needles.is_empty() {
            return Err(empty());
        }

        let source = file.resolve(&self.root)?;
        let haystack = self.options.retain(&source.lines());

        match self.options.policy.run(&needles, &haystack) {
            Ok(matched) => {
                tracing::debug!(
                    file = %source.path.display(),
                    lines = needles.len(),
                    matched = ?matched.span,
                    "snippet verified"
                );

                Ok(block.render(self.options.fence_bare_blocks))
            }
            Err(mismatch) => {
                let needle = needles[mismatch.index];
                Err(SnippetError::LineNotMatched {
                    line: needle.text.to_string(),
                    block_line: needle.number,
                    after_line: mismatch.cursor.after_line(&haystack),
                    block: block.text().to_string(),
                    file_ref: source.file_ref,
                    resolved: source.path,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    static_assertions::assert_impl_all!(Verifier: Send, Sync);
    static_assertions::assert_impl_all!(SnippetError: Send, Sync, std::error::Error);

    const SCRIPT: &str = "a=1\n# comment\nb=2\nc=3\n";

    fn site(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        dir
    }

    fn verifier(site: &tempfile::TempDir, options: Options) -> Verifier {
        Verifier::new(site.path(), options)
    }

    #[test]
    fn ordered_excerpts_render() {
        let site = site(&[("docs/run.py", SCRIPT)]);
        let v = verifier(&site, Options { fence_bare_blocks: false, ..Options::default() });

        let out = v.verify_and_render("  a=1\nb=2  \n", "run.py", "docs/index.md").unwrap();
        assert_eq!(out, "\na=1\nb=2\n\n");
    }

    #[test]
    fn out_of_order_and_missing_lines_are_reported() {
        let site = site(&[("docs/run.py", SCRIPT)]);
        let v = verifier(&site, Options::default());

        match v.verify_and_render("c=3\nb=2", "run.py", "docs/index.md") {
            Err(SnippetError::LineNotMatched { line, block_line, after_line, .. }) => {
                assert_eq!((line.as_str(), block_line, after_line), ("b=2", 2, 4));
            }
            other => panic!("expected LineNotMatched, got {other:?}"),
        }

        match v.verify_and_render("b=2\nd=4", "run.py", "docs/index.md") {
            Err(SnippetError::LineNotMatched { line, after_line, block, file_ref, .. }) => {
                assert_eq!((line.as_str(), after_line), ("d=4", 3));
                assert_eq!(block, "b=2\nd=4");
                assert_eq!(file_ref, "run.py");
            }
            other => panic!("expected LineNotMatched, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_is_insignificant() {
        let site = site(&[("run.R", "f <- function(x) {\n    x + 1\n}\n")]);
        let v = verifier(&site, Options::default());
        assert!(v.verify_and_render("f <- function(x) {\nx + 1\t\n  }", "run.R", "index.md").is_ok());
    }

    #[test]
    fn comments_and_blanks_are_skipped_but_kept() {
        let site = site(&[("run.py", SCRIPT)]);
        let v = verifier(&site, Options::default());

        let block = "a=1\n\n# explain b\nb=2\n    # trailing note";
        let out = v.verify_and_render(block, "run.py", "index.md").unwrap();
        assert!(out.contains("# explain b"));
        assert!(out.contains("\n\n# explain b"));
        assert!(out.starts_with("\n```\n"));
    }

    #[test]
    fn keep_all_requires_blank_and_comment_lines() {
        let site = site(&[("run.py", SCRIPT)]);
        let keep_all = Options { filter: LineFilter::KeepAll, ..Options::default() };
        let v = verifier(&site, keep_all);

        assert!(v.verify_and_render("a=1\n# comment\nc=3", "run.py", "index.md").is_ok());
        assert!(v.verify_and_render("a=1\n\nb=2", "run.py", "index.md").is_err());
        assert!(v.verify_and_render("a=1\n# other\nb=2", "run.py", "index.md").is_err());
    }

    #[test]
    fn contiguous_policy_ignores_skipped_source_lines() {
        let site = site(&[("run.py", SCRIPT)]);
        let contiguous = Options { policy: MatchPolicy::Contiguous, ..Options::default() };
        let v = verifier(&site, contiguous);

        assert!(v.verify_and_render("a=1\nb=2", "run.py", "index.md").is_ok());
        assert!(v.verify_and_render("a=1\nc=3", "run.py", "index.md").is_err());
    }

    #[test]
    fn custom_comment_prefixes() {
        let site = site(&[("run.Rev", "x <- 1\ny <- 2\n")]);
        let options = Options { comment_prefixes: vec!["//".into()], ..Options::default() };
        let v = verifier(&site, options);

        assert!(v.verify_and_render("x <- 1\n// why\ny <- 2", "run.Rev", "index.md").is_ok());
        assert!(v.verify_and_render("x <- 1\n# why\ny <- 2", "run.Rev", "index.md").is_err());
    }

    #[test]
    fn fenced_bodies_match_by_contents() {
        let site = site(&[("tutorials/t/scripts/run.py", SCRIPT)]);
        let v = verifier(&site, Options::default());

        let block = "```python\na=1\nc=3\n```";
        let out = v.verify_and_render(block, "scripts/run.py", "tutorials/t/index.md").unwrap();
        assert_eq!(out, format!("\n{block}\n\n"));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let site = site(&[]);
        let v = verifier(&site, Options::default());

        match v.verify_and_render("a=1", "scripts/none.py", "docs/index.md") {
            Err(e @ SnippetError::FileNotFound { .. }) => {
                assert!(e.to_string().contains("scripts/none.py"));
                let resolved = crate::error::ErrorDetail::context(&e).remove(0).1;
                assert!(resolved.ends_with("docs/scripts/none.py"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_fails_before_file_access() {
        let site = site(&[]);
        let v = verifier(&site, Options::default());
        let result = v.verify_and_render("  \n ", "none.py", "index.md");
        assert!(matches!(result, Err(SnippetError::EmptyBlock { .. })));
    }

    #[test]
    fn comment_only_bodies_have_nothing_to_verify() {
        let site = site(&[("run.py", SCRIPT)]);
        let v = verifier(&site, Options::default());

        let result = v.verify_and_render("# totally invented\n\n  # more", "run.py", "index.md");
        assert!(matches!(result, Err(SnippetError::EmptyBlock { .. })));

        let fenced = v.verify_and_render("```python\n# comment\n```", "run.py", "index.md");
        assert!(matches!(fenced, Err(SnippetError::EmptyBlock { .. })));

        let keep_all = verifier(&site, Options { filter: LineFilter::KeepAll, ..Options::default() });
        assert!(keep_all.verify_and_render("# comment", "run.py", "index.md").is_ok());
    }

    #[test]
    fn options_deserialize_from_toml() {
        let options: Options = toml::from_str(r#"
            policy = "contiguous"
            filter = "keep-all"
        "#).unwrap();

        assert_eq!(options.policy, MatchPolicy::Contiguous);
        assert_eq!(options.filter, LineFilter::KeepAll);
        assert_eq!(options.comment_prefixes, ["#"]);
        assert!(options.fence_bare_blocks);

        assert!(toml::from_str::<Options>("policy = \"fuzzy\"").is_err());
        assert!(toml::from_str::<Options>("unknown = 1").is_err());
    }
}
