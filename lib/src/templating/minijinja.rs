use std::path::Path;
use std::sync::Arc;

use minijinja::{path_loader, Environment, State};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::Result;
use crate::snippet::Verifier;
use crate::templating::{Engine, EngineInit};

/// Directory, relative to the site root, searched by `{% include %}`.
pub const INCLUDES_DIR: &str = "_includes";

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    page: PageMeta<'a>,
}

#[derive(Serialize)]
struct PageMeta<'a> {
    path: &'a str,
    dir: &'a str,
}

fn init<G: Serialize>(verifier: Arc<Verifier>, globals: G) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(path_loader(verifier.root().join(INCLUDES_DIR)));
    env.add_global("G", Value::from_serializable(&globals));
    env.add_filter("snippet", move |state: &State, body: String, file_ref: String| {
        ext::snippet(&verifier, state, &body, &file_ref)
    });

    env
}

impl EngineInit for MiniJinjaEngine {
    type Engine = Self;

    fn init<G: Serialize>(verifier: Arc<Verifier>, globals: G) -> Self::Engine {
        MiniJinjaEngine { env: init(verifier, globals) }
    }
}

impl Engine for MiniJinjaEngine {
    fn render_document(&self, document: &Path, template: &str) -> Result<String> {
        let path = document.to_string_lossy();
        let dir = document.parent().map(|p| p.to_string_lossy()).unwrap_or_default();
        let context = Value::from_serializable(&PageContext {
            page: PageMeta { path: &path, dir: &dir },
        });

        Ok(self.env.render_named_str(&path, template, context)?)
    }
}

mod ext {
    use minijinja::{value::Value, Error, ErrorKind, State};

    use crate::snippet::Verifier;

    trait Ext {
        fn find(self, key: &str) -> Result<Value, Error>;
    }

    impl Ext for &State<'_, '_> {
        fn find(self, key: &str) -> Result<Value, Error> {
            let (base, rest) = key.split_once('.').unwrap_or((key, ""));
            let mut value = self.lookup(base)
                .filter(|v| !v.is_undefined())
                .ok_or_else(|| Error::new(
                    ErrorKind::MissingArgument,
                    format!("expected {base} in context but it wasn't found")
                ))?;

            for attr in rest.split('.').filter(|a| !a.is_empty()) {
                value = value.get_attr(attr)?;
                if value.is_undefined() {
                    return Err(Error::new(
                        ErrorKind::UndefinedError,
                        format!("missing key {key} in context")
                    ));
                }
            }

            Ok(value)
        }
    }

    /// `{% filter snippet("scripts/run.py") %} ... {% endfilter %}`: verifies
    /// the rendered body against the file, relative to `page.path`.
    pub fn snippet(
        verifier: &Verifier,
        state: &State<'_, '_>,
        body: &str,
        file_ref: &str,
    ) -> Result<Value, Error> {
        let document = state.find("page.path")?;
        let document = document.as_str().ok_or_else(|| Error::new(
            ErrorKind::InvalidOperation,
            "page.path must be a string"
        ))?;

        verifier.verify_and_render(body, file_ref, document)
            .map(Value::from_safe_string)
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                "snippet verification failed"
            ).with_source(e))
    }
}

impl_error_detail_with_std_error!(minijinja::Error);
