use std::path::{Path, PathBuf};

use crate::error::ConfigureError;
use crate::utils::{absolute_path, with_appended_extension};

/// Path of the tabix index expected next to a bgzipped annotation file.
pub fn tabix_index_path(path: &Path) -> PathBuf {
    with_appended_extension(path, ".tbi")
}

/// Validates an optional tabix-indexed annotation file (ploidy, target regions, call regions).
///
/// Returns `Ok(None)` when the option was not given. Otherwise the file must exist,
/// must not be empty and must have a `.tbi` index next to it. The returned path is absolute.
///
/// # Arguments
///
/// * `path` - The optional user supplied path.
/// * `label` - Human readable option label used in error messages, e.g. "ploidy bed".
///
/// # Example
///
/// ```
/// use seqerr_configure::tabix::check_optional_tabix_indexed_file;
///
/// assert!(check_optional_tabix_indexed_file(None, "ploidy bed").unwrap().is_none());
/// ```
pub fn check_optional_tabix_indexed_file(path: Option<&Path>, label: &str) -> Result<Option<PathBuf>, ConfigureError> {
    let path = match path {
        Some(path) => absolute_path(path)?,
        None => return Ok(None),
    };

    if !path.is_file() {
        return Err(ConfigureError::MissingFile(label.to_string(), path));
    }
    if path.metadata()?.len() == 0 {
        return Err(ConfigureError::EmptyFile(label.to_string(), path));
    }
    let index = tabix_index_path(&path);
    if !index.is_file() {
        return Err(ConfigureError::MissingTabixIndex(label.to_string(), index));
    }

    log::debug!("Validated {} file: {}", label, path.display());

    Ok(Some(path))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn annotation_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ploidy.bed.gz"), b"bgzf-bytes").unwrap();
        dir
    }

    #[rstest]
    fn absent_option_passes() {
        assert_eq!(check_optional_tabix_indexed_file(None, "ploidy bed").unwrap(), None);
    }

    #[rstest]
    fn missing_index_names_label(annotation_dir: TempDir) {
        let bed = annotation_dir.path().join("ploidy.bed.gz");
        let err = check_optional_tabix_indexed_file(Some(&bed), "ploidy bed").unwrap_err();

        assert!(matches!(err, ConfigureError::MissingTabixIndex(..)));
        assert!(err.to_string().contains("ploidy bed"));
        assert!(err.to_string().contains("ploidy.bed.gz.tbi"));
    }

    #[rstest]
    fn indexed_file_resolves_to_absolute(annotation_dir: TempDir) {
        let bed = annotation_dir.path().join("ploidy.bed.gz");
        std::fs::write(tabix_index_path(&bed), b"tbi").unwrap();

        let resolved = check_optional_tabix_indexed_file(Some(&bed), "ploidy bed").unwrap().unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, bed);
    }

    #[rstest]
    fn missing_file_names_label(annotation_dir: TempDir) {
        let bed = annotation_dir.path().join("targets.bed.gz");
        let err = check_optional_tabix_indexed_file(Some(&bed), "targeted-regions bed").unwrap_err();

        assert!(matches!(err, ConfigureError::MissingFile(..)));
        assert!(err.to_string().contains("targeted-regions bed"));
    }

    #[rstest]
    fn empty_file_is_rejected(annotation_dir: TempDir) {
        let bed = annotation_dir.path().join("empty.bed.gz");
        std::fs::write(&bed, b"").unwrap();
        std::fs::write(tabix_index_path(&bed), b"tbi").unwrap();

        let err = check_optional_tabix_indexed_file(Some(&bed), "call regions bed").unwrap_err();
        assert!(matches!(err, ConfigureError::EmptyFile(..)));
    }
}
