use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::CopyError;
use crate::pattern::SourceGlob;
use crate::reload::{self, Reload};
use crate::task::{Outcome, TaskContext};

/// Copy markup into the output root. While a live-reload server is going to
/// run, the client snippet is injected into every page.
pub(super) fn markup(ctx: &TaskContext) -> Result<Outcome, CopyError> {
    let config = ctx.config;
    let glob = SourceGlob::new(&config.root, &config.paths.src.html)?;
    let dist = config.resolve(&config.paths.dist.base);

    let written = glob
        .files()?
        .into_par_iter()
        .map(|file| -> Result<_, CopyError> {
            let target = dist.join(glob.relative(&file)?);

            match ctx.live_reload {
                Some(port) => {
                    let html = fs::read_to_string(&file)?;
                    crate::io::write(&target, reload::inject(&html, port))?;
                }
                None => crate::io::copy(&file, &target)?,
            }

            Ok(target)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Outcome {
        written,
        reload: Reload::Full,
    })
}

/// Copy fonts verbatim.
pub(super) fn fonts(ctx: &TaskContext) -> Result<Outcome, CopyError> {
    let config = ctx.config;
    let glob = SourceGlob::new(&config.root, &config.paths.src.fonts)?;
    let dist = config.resolve(&config.paths.dist.fonts);

    let written = copy_all(&glob, &dist)?;

    Ok(Outcome {
        written,
        reload: Reload::None,
    })
}

fn copy_all(glob: &SourceGlob, dist: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CopyError> {
    glob.files()?
        .into_par_iter()
        .map(|file| -> Result<_, CopyError> {
            let target = dist.join(glob.relative(&file)?);
            crate::io::copy(&file, &target)?;
            Ok(target)
        })
        .collect()
}
