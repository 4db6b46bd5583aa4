use std::time::Instant;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use console::style;
use dicardo::{Config, Pipeline, Recipe};

#[derive(Parser)]
#[command(name = "dicardo")]
#[command(about = "Asset pipeline for the Dicardo storefront")]
#[command(version)]
struct Cli {
    /// Task to run: clean, sass, js, images, fonts, html, serve, watch, dev or build
    #[arg(default_value_t = Recipe::Dev)]
    task: Recipe,

    /// Path to the config file (defaults to ./dicardo.toml when present)
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Port of the development server
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not open the browser
    #[arg(long)]
    no_open: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    dicardo::logging::init(cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.no_open {
        config.server.open = false;
    }
    config.validate()?;

    let s = Instant::now();
    Pipeline::new(config).run(cli.task)?;

    tracing::info!(
        "'{}' done in {}",
        cli.task,
        style(format!("{}ms", s.elapsed().as_millis())).blue()
    );

    Ok(())
}
