//! Discovery of per-video tensor archives.
//!
//! Only the top level of the tensor directory is scanned; archives are
//! matched by a case-insensitive `.npz` extension.

use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

/// Finds `.npz` archives in `tensor_dir`, sorted by file name.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - the archives, possibly empty
/// * `Err(CoreError::DataNotFound)` - if the directory does not exist
///
/// # Examples
///
/// ```rust,no_run
/// use crashsift_core::discover_tensor_files;
/// use std::path::Path;
///
/// let files = discover_tensor_files(Path::new("/data/yolo_features/positive")).unwrap();
/// println!("Found {} tensor archives", files.len());
/// ```
pub fn discover_tensor_files(tensor_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    if !tensor_dir.is_dir() {
        return Err(CoreError::not_found("tensor directory", tensor_dir));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(tensor_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if !path.is_file() {
                return None;
            }
            path.extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| ext.eq_ignore_ascii_case("npz"))
                .map(|_| path.clone())
        })
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::info!("Found {} tensor archives in {}", files.len(), tensor_dir.display());
    Ok(files)
}

/// Video key for an archive: the file stem with `.mp4` appended, matching
/// the annotation index keys.
#[must_use]
pub fn video_key(archive: &Path) -> Option<String> {
    archive
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| format!("{stem}.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn finds_only_npz_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        File::create(dir.path().join("000123.npz"))?;
        File::create(dir.path().join("000045.NPZ"))?;
        File::create(dir.path().join("notes.txt"))?;
        std::fs::create_dir(dir.path().join("nested.npz"))?;

        let files = discover_tensor_files(dir.path())?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["000045.NPZ", "000123.npz"]);
        Ok(())
    }

    #[test]
    fn missing_directory_is_data_not_found() {
        let err = discover_tensor_files(Path::new("/nonexistent/crashsift/tensors")).unwrap_err();
        assert!(err.is_data_not_found());
    }

    #[test]
    fn video_key_uses_stem() {
        assert_eq!(video_key(Path::new("/x/000001.npz")).as_deref(), Some("000001.mp4"));
    }
}
