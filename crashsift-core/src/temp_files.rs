//! Atomic output files.
//!
//! Every exported table is first written to a temporary file next to its
//! destination and renamed into place only after the writer finished. An
//! interrupted run therefore never leaves a half-written result behind; the
//! temporary file is removed when dropped.
//!
//! A whole analysis run is staged the same way: its files go into a hidden
//! directory next to the output directory and are moved into place only
//! once every file has been written.

use crate::error::CoreResult;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};

/// Creates a hidden temporary file in `dir` for an output named `file_name`.
pub fn create_temp_file(dir: &Path, file_name: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)?;

    Ok(temp_file)
}

/// Writes `path` atomically through `write`.
///
/// The closure receives a buffered writer over the temporary file. The
/// destination is replaced only if the closure and the flush succeed.
pub fn write_atomic<F>(path: &Path, write: F) -> CoreResult<()>
where
    F: FnOnce(&mut dyn Write) -> CoreResult<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let temp = create_temp_file(dir, &file_name)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Creates a hidden staging directory beside `output_dir`, on the same
/// file system so staged files can be renamed into place.
pub fn create_staging_dir(output_dir: &Path) -> CoreResult<TempDir> {
    let parent = match output_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let base = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let staging = TempFileBuilder::new()
        .prefix(&format!(".{base}.staging."))
        .tempdir_in(parent)?;
    log::debug!("Staging run output in {}", staging.path().display());
    Ok(staging)
}

/// Moves the staged files `names` from `staging` into `output_dir`.
///
/// Files already in `output_dir` for which `is_stale` holds and that are not
/// replaced by a staged file are removed first, so the directory never ends
/// up mixing files of two runs. Other files are left alone.
pub fn promote_staged<F>(staging: &Path, output_dir: &Path, names: &[String], is_stale: F) -> CoreResult<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    std::fs::create_dir_all(output_dir)?;
    let fresh: HashSet<&str> = names.iter().map(String::as_str).collect();

    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file() && is_stale(&name) && !fresh.contains(name.as_str()) {
            std::fs::remove_file(entry.path())?;
            log::debug!("Removed stale {}", entry.path().display());
        }
    }

    let mut promoted = Vec::with_capacity(names.len());
    for name in names {
        let target = output_dir.join(name);
        std::fs::rename(staging.join(name), &target)?;
        promoted.push(target);
    }
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use tempfile::tempdir;

    #[test]
    fn replaces_destination_on_success() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old")?;

        write_atomic(&path, |w| {
            w.write_all(b"new")?;
            Ok(())
        })?;

        assert_eq!(std::fs::read_to_string(&path)?, "new");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn failed_write_keeps_old_file_and_leaves_no_temp() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old")?;

        let result = write_atomic(&path, |w| {
            w.write_all(b"partial")?;
            Err(CoreError::OperationFailed("interrupted".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path)?, "old");
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn promotion_replaces_stale_files_only() -> Result<(), Box<dyn std::error::Error>> {
        let root = tempdir()?;
        let out = root.path().join("out");
        std::fs::create_dir_all(&out)?;
        std::fs::write(out.join("01_kept.json"), "old")?;
        std::fs::write(out.join("05_scheme_09.json"), "old")?;
        std::fs::write(out.join("notes.txt"), "mine")?;

        let staging = create_staging_dir(&out)?;
        assert_eq!(staging.path().parent(), Some(root.path()));
        std::fs::write(staging.path().join("01_kept.json"), "new")?;

        let names = vec!["01_kept.json".to_string()];
        let promoted = promote_staged(staging.path(), &out, &names, |n| n.starts_with('0'))?;

        assert_eq!(promoted, vec![out.join("01_kept.json")]);
        assert_eq!(std::fs::read_to_string(out.join("01_kept.json"))?, "new");
        assert!(!out.join("05_scheme_09.json").exists());
        assert_eq!(std::fs::read_to_string(out.join("notes.txt"))?, "mine");

        let staging_path = staging.path().to_path_buf();
        drop(staging);
        assert!(!staging_path.exists());
        Ok(())
    }
}
