//! The individual build steps.
//!
//! Each [`Task`] reads one source category and writes into its own output
//! subtree, so tasks grouped into the same stage never touch each other's
//! files and can run in parallel.

mod copy;
pub mod images;
pub mod scripts;
pub mod sourcemap;
pub mod styles;

use std::fmt;
use std::time::Instant;

use camino::Utf8PathBuf;

use crate::config::{Config, Profile};
use crate::reload::Reload;

/// A single transformation step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    /// Empty the output directory.
    Clean,
    /// Copy markup into the output root.
    Markup,
    /// Compile the stylesheet, expanded with a source map.
    Styles,
    /// Compile the stylesheet, compressed and suffixed `.min`.
    StylesMin,
    /// Concatenate scripts with a source map.
    Scripts,
    /// Concatenate and minify scripts.
    ScriptsMin,
    /// Optimize images.
    Images,
    /// Copy fonts.
    Fonts,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Clean => "clean",
            Task::Markup => "html",
            Task::Styles => "sass",
            Task::StylesMin => "sass:min",
            Task::Scripts => "js",
            Task::ScriptsMin => "js:min",
            Task::Images => "images",
            Task::Fonts => "fonts",
        }
    }

    /// Run the task to completion.
    pub fn run(&self, ctx: &TaskContext) -> anyhow::Result<Outcome> {
        let s = Instant::now();

        let outcome = match self {
            Task::Clean => {
                let dist = ctx.config.resolve(&ctx.config.paths.dist.base);
                let removed = crate::io::clean_dir(&dist)?;
                tracing::debug!(removed, "cleaned {dist}");
                Outcome::default()
            }
            Task::Markup => copy::markup(ctx)?,
            Task::Styles => styles::compile(ctx, Profile::Development)?,
            Task::StylesMin => styles::compile(ctx, Profile::Production)?,
            Task::Scripts => scripts::bundle(ctx, Profile::Development)?,
            Task::ScriptsMin => scripts::bundle(ctx, Profile::Production)?,
            Task::Images => images::optimize(ctx)?,
            Task::Fonts => copy::fonts(ctx)?,
        };

        tracing::info!(
            "finished '{}', {} file(s) {}",
            self.name(),
            outcome.written.len(),
            crate::io::as_overhead(s)
        );

        Ok(outcome)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a task can see while running.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub config: &'a Config,
    /// Port of the live-reload websocket, when a development server is going
    /// to run after this build.
    pub live_reload: Option<u16>,
}

impl<'a> TaskContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            live_reload: None,
        }
    }

    pub fn with_live_reload(mut self, port: Option<u16>) -> Self {
        self.live_reload = port;
        self
    }
}

/// Result of a finished task.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Files written to the output directory.
    pub written: Vec<Utf8PathBuf>,
    /// How connected browsers should react.
    pub reload: Reload,
}
