use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::Profile;
use crate::error::SourceError;
use crate::pattern::SourceGlob;
use crate::reload::Reload;
use crate::task::sourcemap;
use crate::task::{Outcome, TaskContext};

/// Errors that can occur when bundling scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// An I/O error occurred while reading sources or writing the bundle.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The script glob could not be resolved.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The minifier could not be started.
    #[error("Couldn't run '{0}': {1}")]
    Spawn(String, std::io::Error),

    /// The minifier returned a non-zero exit code.
    #[error("Esbuild execution failed: {0}")]
    Esbuild(String),

    /// Failed to parse minifier output as UTF-8.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The source map could not be built.
    #[error("Source map error: {0}")]
    SourceMap(String),
}

/// Concatenate every script into a single bundle.
pub(super) fn bundle(ctx: &TaskContext, profile: Profile) -> Result<Outcome, ScriptError> {
    let config = ctx.config;
    let glob = SourceGlob::new(&config.root, &config.paths.src.js)?;
    let dist = config.resolve(&config.paths.dist.js);

    let sources = glob
        .files()?
        .into_iter()
        .map(|file| -> Result<_, ScriptError> {
            let name = glob.relative(&file)?.to_string();
            let text = fs::read_to_string(&file)?;
            Ok((name, text))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if sources.is_empty() {
        tracing::warn!("no scripts matched '{}'", glob.as_str());
        return Ok(Outcome::default());
    }

    let written = match profile {
        Profile::Development => {
            let name = "main.js";
            let (code, mut map) = sourcemap::concat(&sources)
                .map_err(|e| ScriptError::SourceMap(format!("{e:?}")))?;
            let map = map
                .to_json(Some("/source/"))
                .map_err(|e| ScriptError::SourceMap(format!("{e:?}")))?;

            let path = dist.join(name);
            let path_map = dist.join(format!("{name}.map"));

            crate::io::write(&path, format!("{code}\n//# sourceMappingURL={name}.map\n"))?;
            crate::io::write(&path_map, map)?;
            vec![path, path_map]
        }
        Profile::Production => {
            let code = sources
                .iter()
                .map(|(_, text)| text.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            let code = minify_esbuild(&config.tools.esbuild, &code)?;

            let path = dist.join("main.min.js");
            crate::io::write(&path, code)?;
            vec![path]
        }
    };

    Ok(Outcome {
        written,
        reload: Reload::Full,
    })
}

/// Pipe the bundle through `esbuild --minify`.
fn minify_esbuild(binary: &str, code: &str) -> Result<String, ScriptError> {
    let mut child = Command::new(binary)
        .arg("--minify")
        .arg("--loader=js")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ScriptError::Spawn(binary.to_string(), e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ScriptError::Esbuild("stdin unavailable".into()))?;

    // feed stdin from another thread, esbuild may fill stdout before it has
    // read all of its input
    let output = std::thread::scope(|s| {
        let writer = s.spawn(move || stdin.write_all(code.as_bytes()));
        let output = child.wait_with_output();
        let written = writer.join().unwrap_or_else(|_| {
            Err(std::io::Error::other("stdin writer panicked"))
        });
        output.and_then(|output| written.map(|()| output))
    })?;

    if !output.status.success() {
        return Err(ScriptError::Esbuild(String::from_utf8(output.stderr)?));
    }

    Ok(String::from_utf8(output.stdout)?)
}
