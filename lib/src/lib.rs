#![doc = svgbobdoc::transform!(
//! Keeps documentation snippets honest.
//!
//! # Overview
//!
//! Excerpt checks that code shown in a document is really an excerpt of a
//! source file living next to that document. A snippet passes when every one
//! of its lines, compared without surrounding whitespace, appears in the file
//! in the same order. Lines in between may be elided. Blank lines and comments
//! in the snippet are kept in the output but take no part in matching.
//!
//! A site is checked as follows:
//!
//! ```svgbob
//!  +--------+     +--------+     +-------------+     +------------+
//!  | FsTree |---->| Site   |---->| SnippetTags |---->| Templatize |
//!  +--------+     +---+----+     +------+------+     +-----+------+
//!                     |                 |                  |
//!                     |                 v                  v
//!                     |          +------------+    +----------------+
//!                     |          |  Verifier  |<---| snippet filter |
//!                     |          +------+-----+    +----------------+
//!                     |                 |
//!                     v                 v
//!                 +--------+     +------------+
//!                 | Report |     | SourceFile |
//!                 +--------+     +------------+
//! ```
//!
//!   1. The site source is walked once into an [`FsTree`](fstree::FsTree),
//!      skipping hidden and excluded directories.
//!   2. Each page is run, in parallel, through the [`markdown`] plugins:
//!      `{% snippet path %} ... {% endsnippet %}` blocks are verified and
//!      replaced by their display form. With templates enabled they are
//!      instead lowered to `{% filter snippet("path") %}` blocks and the page
//!      is rendered as a template, so each body is rendered once and the
//!      rendered text is verified.
//!   3. Failures are collected into a [`Report`](site::Report), one per page.
//!
//! The [`snippet`] module holds the verification itself and can be used on
//! its own.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod snippet;
pub mod markdown;
pub mod templating;
pub mod site;

pub use site::*;
pub use snippet::{Verifier, SnippetError};
