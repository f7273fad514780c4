pub mod minijinja;

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::snippet::Verifier;

pub trait EngineInit {
    type Engine: Engine + 'static;

    fn init<G: Serialize>(verifier: Arc<Verifier>, globals: G) -> Self::Engine;
}

pub trait Engine: Send + Sync + Debug {
    /// Renders `template`, the contents of `document` (relative to the site
    /// root). The context exposes `page.path` and `page.dir`.
    fn render_document(&self, document: &Path, template: &str) -> Result<String>;
}
