//! Source globs.
//!
//! The `glob` crate has no brace alternatives, so `*.{png,svg}` is expanded
//! into one pattern per alternative before compiling. Every glob also has a
//! *base*: the static directory prefix in front of the first wildcard.
//! Outputs mirror the layout of matched files relative to that base.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern};

use crate::error::SourceError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled source glob rooted at the project directory.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    raw: String,
    base: Utf8PathBuf,
    patterns: Vec<Pattern>,
}

impl SourceGlob {
    pub fn new(root: &Utf8Path, glob: &str) -> Result<Self, SourceError> {
        // the root is a literal path, only the glob part is pattern syntax
        let root_escaped = Utf8PathBuf::from(Pattern::escape(root.as_str()));
        let patterns = expand_braces(glob)
            .iter()
            .map(|pattern| Pattern::new(root_escaped.join(pattern).as_str()))
            .collect::<Result<_, _>>()?;

        let (base, _) = split_base(glob);

        Ok(Self {
            raw: glob.to_string(),
            base: root.join(base),
            patterns,
        })
    }

    /// The glob as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Static directory prefix of the glob.
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// Every regular file matched by any alternative, sorted and deduplicated.
    pub fn files(&self) -> Result<Vec<Utf8PathBuf>, SourceError> {
        let mut files = BTreeSet::new();

        for pattern in &self.patterns {
            for path in glob::glob_with(pattern.as_str(), MATCH_OPTIONS)? {
                let path = Utf8PathBuf::try_from(path?)?;
                if path.is_file() {
                    files.insert(path);
                }
            }
        }

        Ok(files.into_iter().collect())
    }

    pub fn matches(&self, path: &Utf8Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(path.as_str(), MATCH_OPTIONS))
    }

    /// Path of a matched file relative to the glob base.
    pub fn relative<'a>(&self, path: &'a Utf8Path) -> Result<&'a Utf8Path, SourceError> {
        path.strip_prefix(&self.base)
            .map_err(|_| SourceError::OutsideBase(path.to_owned(), self.base.clone()))
    }
}

/// Expand every `{a,b}` group into separate patterns. Groups may nest.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = vec![];

    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }

    // unbalanced braces are matched literally
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{prefix}{}{suffix}", &pattern[w[0] + 1..w[1]])))
        .collect()
}

/// Split a glob into its static prefix and the wildcard suffix.
pub fn split_base(glob: &str) -> (Utf8PathBuf, Utf8PathBuf) {
    let path = Utf8Path::new(glob);

    let components: Vec<_> = path.components().collect();
    let split_idx = components
        .iter()
        .position(|c| c.as_str().contains(['*', '?', '[', '{']))
        .unwrap_or(components.len());

    let base: Utf8PathBuf = components.iter().take(split_idx).collect();
    let rest: Utf8PathBuf = components.iter().skip(split_idx).collect();

    (base, rest)
}

/// Reduces a set of paths to the minimal set of recursive watch roots.
pub fn collapse_roots(paths: impl IntoIterator<Item = Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut paths: Vec<_> = paths.into_iter().collect();
    paths.sort();
    paths.dedup();

    let mut filtered: Vec<Utf8PathBuf> = Vec::new();
    for path in paths {
        if let Some(last) = filtered.last()
            && path.starts_with(last)
        {
            continue;
        }
        filtered.push(path);
    }

    filtered
}
