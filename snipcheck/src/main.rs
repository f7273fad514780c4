use std::path::Path;
use std::process::exit;

use excerpt::error::Result;
use excerpt::templating::minijinja::MiniJinjaEngine;
use excerpt::Site;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Verifies that documentation snippets are excerpts of their source files.
        cmd snipcheck {
            /// Settings file. Defaults to `snipcheck.toml` in the source directory.
            optional -c, --config path: PathBuf
            /// Log every verified snippet.
            optional -v, --verbose

            /// Verify every page of the site rooted at `source`.
            cmd check {
                required source: PathBuf
            }

            /// Print `document`, relative to `source`, after processing.
            cmd render {
                required source: PathBuf
                required document: PathBuf
            }
        }
    }
}

fn check(source: &Path, config: Option<&Path>) -> Result<bool> {
    let settings = config::load(source, config)?;
    let site = Site::discover::<MiniJinjaEngine, _>(source, settings)?;

    let start = std::time::Instant::now();
    let report = site.check();
    for failure in &report.failures {
        eprintln!("error: {failure}");
    }

    println!("{report} ({}ms)", start.elapsed().as_millis());
    Ok(report.is_ok())
}

fn render(source: &Path, document: &Path, config: Option<&Path>) -> Result<bool> {
    let settings = config::load(source, config)?;
    let site = Site::discover::<MiniJinjaEngine, _>(source, settings)?;
    print!("{}", site.render(document)?.text);
    Ok(true)
}

pub fn main() {
    let flags = flags::Snipcheck::from_env_or_exit();

    let default = if flags.verbose { "snipcheck=debug,excerpt=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = flags.config.as_deref();
    let result = match &flags.subcommand {
        flags::SnipcheckCmd::Check(cmd) => check(&cmd.source, config),
        flags::SnipcheckCmd::Render(cmd) => render(&cmd.source, &cmd.document, config),
    };

    match result {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;

    use super::*;

    fn parse(args: &[&str]) -> xflags::Result<flags::Snipcheck> {
        flags::Snipcheck::from_vec(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn flags_parse() {
        let flags = parse(&["-v", "render", "site", "docs/index.md"]).unwrap();
        assert!(flags.verbose);
        assert!(flags.config.is_none());
        match flags.subcommand {
            flags::SnipcheckCmd::Render(cmd) => {
                assert_eq!(cmd.source, Path::new("site"));
                assert_eq!(cmd.document, Path::new("docs/index.md"));
            }
            other => panic!("expected render, got {other:?}"),
        }

        let flags = parse(&["--config", "x.toml", "check", "site"]).unwrap();
        assert_eq!(flags.config.as_deref(), Some(Path::new("x.toml")));
        assert!(parse(&["check"]).is_err());
        assert!(parse(&["verify", "site"]).is_err());
    }

    #[test]
    fn check_reports_failing_sites() {
        let site = tempfile::Builder::new().prefix("site").tempdir().unwrap();
        fs::write(site.path().join("run.py"), "a=1\nb=2\n").unwrap();
        fs::write(site.path().join("good.md"), "{% snippet run.py %}a=1\nb=2{% endsnippet %}").unwrap();
        assert!(check(site.path(), None).unwrap());

        fs::write(site.path().join("bad.md"), "{% snippet run.py %}b=2\na=1{% endsnippet %}").unwrap();
        assert!(!check(site.path(), None).unwrap());

        let config = site.path().join("txt-only.toml");
        fs::write(&config, "extensions = [\"txt\"]\n").unwrap();
        assert!(check(site.path(), Some(&config)).unwrap());
    }
}
