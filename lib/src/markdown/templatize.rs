use std::borrow::Cow;
use std::path::Path;

use crate::markdown::Plugin;
use crate::templating::Engine;
use crate::error::{Result, Chainable};

/// Renders documents that contain template syntax. Documents without any are
/// passed through untouched.
pub struct Templatize<'m> {
    document: &'m Path,
    engine: &'m dyn Engine,
}

impl<'m> Templatize<'m> {
    pub fn with(document: &'m Path, engine: &'m dyn Engine) -> Self {
        Self { document, engine }
    }
}

impl Plugin for Templatize<'_> {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        if !crate::util::is_template(input) {
            return Ok(Cow::Borrowed(input));
        }

        self.engine.render_document(self.document, input)
            .chain_with(|| error! {
                "document templatization failed",
                "document" => self.document.display(),
            })
            .map(Cow::Owned)
    }
}
