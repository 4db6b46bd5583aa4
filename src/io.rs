use std::fmt::Display;
use std::fs;
use std::time::Instant;

use camino::Utf8Path;
use console::Style;

use crate::error::CleanError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete everything inside `dist`, keeping the directory itself.
pub fn clean_dir(dist: &Utf8Path) -> Result<usize, CleanError> {
    if !dist.exists() {
        fs::create_dir_all(dist) //
            .map_err(|e| CleanError::Create(dist.to_owned(), e))?;
        return Ok(0);
    }

    let entries = fs::read_dir(dist).map_err(|e| CleanError::Read(dist.to_owned(), e))?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| CleanError::Read(dist.to_owned(), e))?;
        let path = entry.path();
        let kind = entry
            .file_type()
            .map_err(|e| CleanError::Read(dist.to_owned(), e))?;

        let result = if kind.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        if let Err(e) = result {
            let name = entry.file_name();
            return Err(CleanError::Remove(dist.join(name.to_string_lossy().as_ref()), e));
        }
        removed += 1;
    }

    Ok(removed)
}

/// Write `data` to `path`, creating any missing parent directories.
pub fn write(path: &Utf8Path, data: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::write(path, data)
}

/// Copy a single file, creating any missing parent directories.
pub fn copy(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
    if let Some(dir) = dst.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::copy(src, dst)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_clean_removes_contents_but_keeps_dir() {
        let (_guard, root) = tempdir();
        let dist = root.join("dist");
        write(&dist.join("css/main.css"), "a{}").unwrap();
        write(&dist.join("index.html"), "<p>").unwrap();

        let removed = clean_dir(&dist).unwrap();

        assert_eq!(removed, 2);
        assert!(dist.is_dir());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let (_guard, root) = tempdir();
        let dist = root.join("dist");

        assert_eq!(clean_dir(&dist).unwrap(), 0);
        assert_eq!(clean_dir(&dist).unwrap(), 0);
        assert!(dist.is_dir());
    }

    #[test]
    fn test_copy_creates_parents() {
        let (_guard, root) = tempdir();
        let src = root.join("a.txt");
        fs::write(&src, "hello").unwrap();

        let dst = root.join("deep/nested/a.txt");
        copy(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst).unwrap(), "hello");
    }
}
