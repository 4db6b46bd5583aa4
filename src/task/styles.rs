use camino::Utf8Path;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use thiserror::Error;

use crate::config::Profile;
use crate::reload::Reload;
use crate::task::{Outcome, TaskContext};

/// Browsers targeted when adding vendor prefixes.
const BROWSERSLIST: &[&str] = &["defaults"];

/// Errors that can occur when compiling stylesheets.
#[derive(Debug, Error)]
pub enum StyleError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Sass compiler rejected the stylesheet.
    #[error("Sass compilation error: {0}")]
    Sass(#[from] Box<grass::Error>),

    /// The compiled CSS could not be prefixed or minified.
    #[error("CSS processing error: {0}")]
    Css(String),

    /// The source map could not be serialized.
    #[error("Source map error: {0}")]
    SourceMap(String),
}

/// Compile the stylesheet entry.
///
/// Sass errors are logged and the task ends without output, so a broken
/// partial never takes down a watch session.
///
/// The development source map covers the prefixing step only. It maps
/// `main.css` back to the compiled Sass output, embedded as
/// `main.css.source`, not to the `.scss` files.
pub(super) fn compile(ctx: &TaskContext, profile: Profile) -> Result<Outcome, StyleError> {
    let config = ctx.config;
    let entry = config.resolve(&config.paths.src.scss_entry);
    let dist = config.resolve(&config.paths.dist.css);

    let css = match sass(&entry, profile) {
        Ok(css) => css,
        Err(StyleError::Sass(err)) => {
            tracing::error!(entry = %entry, "{err}");
            return Ok(Outcome::default());
        }
        Err(err) => return Err(err),
    };

    let stem = entry.file_stem().unwrap_or("main");

    let written = match profile {
        Profile::Development => {
            let name = format!("{stem}.css");
            let (code, map) = prefix_with_map(&css, &name)?;

            let path = dist.join(&name);
            let path_map = dist.join(format!("{name}.map"));

            crate::io::write(&path, format!("{code}\n/*# sourceMappingURL={name}.map */\n"))?;
            crate::io::write(&path_map, map)?;
            vec![path, path_map]
        }
        Profile::Production => {
            let name = format!("{stem}.min.css");
            let code = optimize(&css, &name)?;

            let path = dist.join(&name);
            crate::io::write(&path, code)?;
            vec![path]
        }
    };

    let reload = Reload::Stylesheets(vec![config.href(&written[0])]);

    Ok(Outcome { written, reload })
}

fn sass(entry: &Utf8Path, profile: Profile) -> Result<String, StyleError> {
    let style = match profile {
        Profile::Development => grass::OutputStyle::Expanded,
        Profile::Production => grass::OutputStyle::Compressed,
    };

    let options = grass::Options::default().style(style);
    Ok(grass::from_path(entry, &options)?)
}

fn targets() -> Result<Targets, StyleError> {
    let browsers =
        Browsers::from_browserslist(BROWSERSLIST).map_err(|e| StyleError::Css(e.to_string()))?;

    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Vendor-prefix the compiled CSS, keeping it readable, and map it back to
/// the compiler output.
fn prefix_with_map(css: &str, name: &str) -> Result<(String, String), StyleError> {
    let targets = targets()?;
    let source = format!("{name}.source");

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: source.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StyleError::Css(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?;

    let mut map = SourceMap::new("/");
    map.add_source(&source);
    map.set_source_content(0, css)
        .map_err(|e| StyleError::SourceMap(format!("{e:?}")))?;

    let code = sheet
        .to_css(PrinterOptions {
            minify: false,
            targets,
            source_map: Some(&mut map),
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?
        .code;

    let map = map
        .to_json(None)
        .map_err(|e| StyleError::SourceMap(format!("{e:?}")))?;

    Ok((code, map))
}

/// Prefix, merge rules and compress.
fn optimize(css: &str, name: &str) -> Result<String, StyleError> {
    let targets = targets()?;

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: name.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StyleError::Css(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?;

    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?;

    Ok(out.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::tests::Fixture;

    const SCSS: &str = r#"
@use "colors";

.product-card {
  color: colors.$primary;
  user-select: none;

  .price {
    font-weight: bold;
  }
}
"#;

    fn fixture() -> Fixture {
        let fixture = Fixture::new();
        fixture.write("src/scss/main.scss", SCSS);
        fixture.write("src/scss/_colors.scss", "$primary: #ff0000;\n");
        fixture
    }

    #[test]
    fn test_development_output() {
        let fixture = fixture();

        let outcome = compile(&fixture.ctx(), Profile::Development).unwrap();

        assert_eq!(outcome.written.len(), 2);
        assert_eq!(
            outcome.reload,
            Reload::Stylesheets(vec!["/css/main.css".into()])
        );

        let css = fixture.read("dist/css/main.css");
        assert!(css.contains(".product-card .price"));
        assert!(css.contains("-webkit-user-select"));
        assert!(css.ends_with("/*# sourceMappingURL=main.css.map */\n"));

        let map: serde_json::Value =
            serde_json::from_str(&fixture.read("dist/css/main.css.map")).unwrap();
        assert_eq!(map["version"], 3);
    }

    #[test]
    fn test_production_output() {
        let fixture = fixture();

        let outcome = compile(&fixture.ctx(), Profile::Production).unwrap();

        assert_eq!(outcome.written.len(), 1);
        assert!(!fixture.exists("dist/css/main.css"));
        assert!(!fixture.exists("dist/css/main.min.css.map"));

        let css = fixture.read("dist/css/main.min.css");
        assert!(css.contains(".product-card .price{"));
        assert!(!css.contains('\n'));
    }

    #[test]
    fn test_sass_errors_are_not_fatal() {
        let fixture = Fixture::new();
        fixture.write("src/scss/main.scss", ".broken { color: $missing; ");

        let outcome = compile(&fixture.ctx(), Profile::Development).unwrap();

        assert!(outcome.written.is_empty());
        assert_eq!(outcome.reload, Reload::None);
        assert!(!fixture.exists("dist/css/main.css"));
    }

    #[test]
    fn test_missing_entry_is_a_sass_error() {
        let fixture = Fixture::new();

        let outcome = compile(&fixture.ctx(), Profile::Production).unwrap();

        assert!(outcome.written.is_empty());
    }
}
