//! Pipeline configuration.
//!
//! Every value has a default matching the conventional storefront layout, so
//! the config file is optional. When present, `dicardo.toml` only needs to
//! list the fields that differ:
//!
//! ```toml
//! [paths.src]
//! js = "assets/js/**/*.js"
//!
//! [server]
//! port = 8080
//! open = false
//! ```

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "dicardo.toml";

/// Controls how stylesheets and scripts are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Expanded output with source maps.
    Development,
    /// Minified output with a `.min` suffix and no source maps.
    Production,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory every relative path is resolved against. Not read from the
    /// config file, it is the directory the file was loaded from.
    #[serde(skip)]
    pub root: Utf8PathBuf,
    pub paths: Paths,
    pub server: ServerConfig,
    pub images: ImageConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    pub src: SourcePaths,
    pub dist: DistPaths,
}

/// Source globs, one per asset category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePaths {
    pub html: String,
    /// Stylesheets watched for changes, partials included.
    pub scss: String,
    /// The single stylesheet compiled into the bundle.
    pub scss_entry: Utf8PathBuf,
    pub js: String,
    pub images: String,
    pub fonts: String,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            html: "src/html/**/*.html".into(),
            scss: "src/scss/**/*.scss".into(),
            scss_entry: "src/scss/main.scss".into(),
            js: "src/js/**/*.js".into(),
            images: "src/images/**/*.{jpg,jpeg,png,gif,svg,webp}".into(),
            fonts: "src/fonts/**/*.{woff,woff2,ttf,eot}".into(),
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistPaths {
    pub base: Utf8PathBuf,
    pub css: Utf8PathBuf,
    pub js: Utf8PathBuf,
    pub images: Utf8PathBuf,
    pub fonts: Utf8PathBuf,
}

impl Default for DistPaths {
    fn default() -> Self {
        Self {
            base: "dist".into(),
            css: "dist/css".into(),
            js: "dist/js".into(),
            images: "dist/images".into(),
            fonts: "dist/fonts".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP port of the development server.
    pub port: u16,
    /// Open the default browser once the server is up.
    pub open: bool,
    /// Inject the live-reload client into copied markup while serving.
    pub live_reload: bool,
    /// Port of the live-reload websocket.
    pub reload_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            open: true,
            live_reload: true,
            reload_port: 3001,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// JPEG re-encoding quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Where optimized images are cached between runs.
    pub cache_dir: Utf8PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            cache_dir: ".cache/images".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Binary used to minify the production script bundle.
    pub esbuild: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            esbuild: "esbuild".into(),
        }
    }
}

impl Config {
    /// Default configuration with paths resolved against `root`.
    pub fn rooted(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, [`CONFIG_FILE`] in the
    /// working directory is used when present, otherwise the defaults.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        let cwd = Utf8PathBuf::try_from(cwd)?;

        let file = match path {
            Some(path) => Some(cwd.join(path)),
            None => Some(cwd.join(CONFIG_FILE)).filter(|file| file.is_file()),
        };

        let mut config = match file {
            Some(file) => {
                let text = fs::read_to_string(&file).map_err(|e| ConfigError::Read(file.clone(), e))?;
                let mut config = Self::parse(&text).map_err(|e| ConfigError::Parse(file.clone(), e))?;
                config.root = file.parent().map(Utf8Path::to_path_buf).unwrap_or(cwd);
                config
            }
            None => Self::rooted(cwd),
        };

        config.validate()?;
        config.root = config.root.canonicalize_utf8().unwrap_or(config.root);

        Ok(config)
    }

    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "images.jpeg_quality must be between 1 and 100, got {}",
                self.images.jpeg_quality
            )));
        }

        if self.server.live_reload && self.server.port == self.server.reload_port {
            return Err(ConfigError::Invalid(format!(
                "server.port and server.reload_port are both {}",
                self.server.port
            )));
        }

        Ok(())
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.root.join(path)
    }

    /// Site-absolute URL of a file inside the output directory.
    pub fn href(&self, dist_file: &Utf8Path) -> String {
        let base = self.resolve(&self.paths.dist.base);
        let relative = dist_file.strip_prefix(&base).unwrap_or(dist_file);
        format!("/{}", relative.as_str().trim_start_matches('/'))
    }
}
