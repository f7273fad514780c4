use std::fmt;
use std::sync::Arc;
use std::path::{Path, PathBuf};

use derive_more::Debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Error, Result};
use crate::fstree::{Entry, FsTree};
use crate::markdown::{self, Plugin, SnippetTags, Templatize};
use crate::snippet::{Options, Verifier};
use crate::templating::{Engine, EngineInit};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Extensions of the files checked for snippets.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub exclude: Vec<String>,
    /// Render documents containing template syntax.
    pub templates: bool,
    pub snippet: Options,
    /// Exposed to templates as `G`.
    pub globals: FxHashMap<String, toml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            extensions: vec!["md".into(), "markdown".into(), "html".into()],
            exclude: vec!["_site".into(), ".git".into(), "node_modules".into(), ".jekyll-cache".into()],
            templates: false,
            snippet: Options::default(),
            globals: FxHashMap::default(),
        }
    }
}

#[derive(Debug)]
pub struct Site {
    pub settings: Settings,
    #[debug(ignore)]
    pub tree: FsTree,
    verifier: Arc<Verifier>,
    engine: Option<Box<dyn Engine>>,
}

/// A processed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Snippet tags in the document, verified in place or by the template
    /// engine.
    pub snippets: usize,
}

#[derive(Debug, Default)]
pub struct Report {
    pub pages: usize,
    pub snippets: usize,
    pub failures: Vec<Failure>,
}

#[derive(Debug)]
pub struct Failure {
    /// Relative to the site root.
    pub page: PathBuf,
    pub error: Error,
}

impl Site {
    pub fn discover<E: EngineInit, P: AsRef<Path>>(root: P, settings: Settings) -> Result<Site> {
        let tree = FsTree::build_excluding(root, &settings.exclude)?;
        let verifier = Arc::new(Verifier::new(&tree.root().path, settings.snippet.clone()));
        let engine = settings.templates.then(|| {
            Box::new(E::init(verifier.clone(), &settings.globals)) as Box<dyn Engine>
        });

        Ok(Site { settings, tree, verifier, engine })
    }

    pub fn root(&self) -> &Path {
        &self.tree.root().path
    }

    pub fn pages(&self) -> impl Iterator<Item = &Entry> {
        self.tree.files().filter(|entry| {
            entry.file_ext().map_or(false, |ext| self.settings.extensions.iter().any(|e| e == ext))
        })
    }

    pub fn render_page(&self, entry: &Entry) -> Result<Rendered> {
        let document = entry.relative_path();
        let source = std::fs::read_to_string(&entry.path)
            .chain_with(|| error!("failed to read page", "path" => entry.path.display()))?;

        let tags = match self.engine {
            Some(_) => SnippetTags::deferred(document),
            None => SnippetTags::new(&self.verifier, document),
        };

        let templatize = self.engine.as_deref().map(|e| Templatize::with(document, e));

        let mut plugins: Vec<&dyn Plugin> = vec![&tags];
        if let Some(templatize) = &templatize {
            plugins.push(templatize);
        }

        let text = markdown::preprocess(&source, &plugins)?.into_owned();
        tracing::debug!(page = %document.display(), snippets = tags.expanded(), "page rendered");
        Ok(Rendered { text, snippets: tags.expanded() })
    }

    /// Renders the page at `document`, relative to the site root.
    pub fn render<P: AsRef<Path>>(&self, document: P) -> Result<Rendered> {
        let document = document.as_ref();
        match self.tree.get(document) {
            Some(entry) if entry.file_type.is_file() => self.render_page(entry),
            _ => err! {
                "document not found in site",
                "document" => document.display(),
                "site root" => self.root().display(),
            },
        }
    }

    /// Renders every page in parallel, collecting one failure per page that
    /// could not be rendered.
    pub fn check(&self) -> Report {
        let pages: Vec<&Entry> = self.pages().collect();
        let results: Vec<_> = pages.par_iter()
            .map(|entry| (entry.relative_path(), self.render_page(entry)))
            .collect();

        let mut report = Report { pages: pages.len(), ..Report::default() };
        for (page, result) in results {
            match result {
                Ok(rendered) => report.snippets += rendered.snippets,
                Err(error) => report.failures.push(Failure { page: page.to_path_buf(), error }),
            }
        }

        report.failures.sort_by(|a, b| a.page.cmp(&b.page));
        tracing::info!(
            pages = report.pages,
            snippets = report.snippets,
            failures = report.failures.len(),
            "site checked"
        );

        report
    }
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} snippets verified in {} pages", self.snippets, self.pages)?;
        match self.failures.len() {
            0 => Ok(()),
            1 => write!(f, ", 1 page failed"),
            n => write!(f, ", {n} pages failed"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\n{}", self.page.display(), self.error)
    }
}
