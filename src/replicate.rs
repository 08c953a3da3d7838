// src/replicate.rs

//! Package tree replication
//!
//! Copies an AIP directory tree into the DIP directory, skipping excluded
//! substructures. Directories (and symlinks) are created in walk order,
//! then regular files are copied in parallel. Any I/O error aborts the copy
//! and is reported with the path it concerns.

use crate::error::{Error, Result};
use crate::filter::ExclusionMode;
use rayon::prelude::*;
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory holding the representations of an E-ARK package
pub const REPRESENTATIONS_DIR: &str = "representations";

/// A rule removing part of the source tree from the copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// One relative path (and everything below it)
    Path(PathBuf),
    /// Directories directly inside the relative directory `parent` whose
    /// name the filter classifies as excluded; regular files are kept
    Classified { parent: PathBuf, mode: ExclusionMode },
}

impl Exclusion {
    /// Exclusions matching the substructures a mode removes from METS
    ///
    /// - submission: top-level `submission*` directories
    /// - representation: `representations/*-preservation` directories
    pub fn for_mode(mode: ExclusionMode) -> Vec<Self> {
        let parent = match mode {
            ExclusionMode::Submission => PathBuf::new(),
            ExclusionMode::Representation => PathBuf::from(REPRESENTATIONS_DIR),
        };
        vec![Self::Classified { parent, mode }]
    }

    fn matches(&self, relative: &Path, is_dir: bool) -> bool {
        match self {
            Self::Path(path) => relative == path,
            Self::Classified { parent, mode } => {
                if !is_dir {
                    return false;
                }
                let in_parent = relative.parent().is_some_and(|p| p == parent.as_path());
                in_parent
                    && relative
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| mode.is_excluded(name))
            }
        }
    }
}

/// Counters describing a finished replication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationStats {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub bytes: u64,
    /// Excluded top entries (an excluded directory counts once)
    pub excluded: usize,
}

/// Copies a directory tree while honouring exclusions
#[derive(Debug, Clone, Default)]
pub struct TreeReplicator {
    exclusions: Vec<Exclusion>,
}

impl TreeReplicator {
    /// Replicator copying everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Replicator with the given exclusions
    pub fn with_exclusions(exclusions: Vec<Exclusion>) -> Self {
        Self { exclusions }
    }

    /// Add one exclusion
    pub fn exclude(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.push(exclusion);
        self
    }

    /// Whether a path relative to the source root is excluded
    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        self.exclusions.iter().any(|e| e.matches(relative, is_dir))
    }

    /// Copy `source` into `destination`, creating `destination` if needed
    pub fn replicate(&self, source: &Path, destination: &Path) -> Result<ReplicationStats> {
        fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;

        let mut stats = ReplicationStats::default();
        let mut copies: Vec<(PathBuf, PathBuf)> = Vec::new();
        let excluded_count = Cell::new(0usize);

        let walker = WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_dir();
                let excluded = entry
                    .path()
                    .strip_prefix(source)
                    .is_ok_and(|relative| self.is_excluded(relative, is_dir));
                if excluded {
                    debug!("Excluding {}", entry.path().display());
                    excluded_count.set(excluded_count.get() + 1);
                }
                !excluded
            });

        for entry in walker {
            let entry = entry.map_err(|e| walk_error(source, e))?;
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            let target = destination.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
                stats.directories += 1;
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
                stats.symlinks += 1;
            } else {
                copies.push((entry.path().to_path_buf(), target));
            }
        }

        stats.excluded = excluded_count.get();

        let sizes = copies
            .par_iter()
            .map(|(from, to)| fs::copy(from, to).map_err(|e| Error::io(from, e)))
            .collect::<Result<Vec<u64>>>()?;

        stats.files = sizes.len();
        stats.bytes = sizes.iter().sum();

        info!(
            "Replicated {} files ({} bytes), {} directories from {} ({} excluded)",
            stats.files,
            stats.bytes,
            stats.directories,
            source.display(),
            stats.excluded
        );
        Ok(stats)
    }
}

fn walk_error(source: &Path, err: walkdir::Error) -> Error {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source.to_path_buf());
    let io_err = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    Error::io(path, io_err)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let points_to = fs::read_link(link).map_err(|e| Error::io(link, e))?;
    std::os::unix::fs::symlink(&points_to, target).map_err(|e| Error::io(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    fs::copy(link, target).map_err(|e| Error::io(link, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "METS.xml", "<mets/>");
        write(dir.path(), "metadata/descriptive/dc.xml", "<dc/>");
        write(dir.path(), "representations/rep1/data/a.txt", "hello");
        write(dir.path(), "representations/rep1-preservation/data/a.tif", "tiff");
        write(dir.path(), "submission/METS.xml", "<sip/>");
        dir
    }

    #[test]
    fn test_classified_matching() {
        let rule = Exclusion::Classified {
            parent: PathBuf::from(REPRESENTATIONS_DIR),
            mode: ExclusionMode::Representation,
        };
        assert!(rule.matches(Path::new("representations/rep1-preservation"), true));
        assert!(!rule.matches(Path::new("representations/rep1-preservation"), false));
        assert!(!rule.matches(Path::new("representations/rep1"), true));
        assert!(!rule.matches(Path::new("other/rep1-preservation"), true));
        assert!(!rule.matches(Path::new("representations/x/rep1-preservation"), true));
    }

    #[test]
    fn test_submission_exclusion() {
        let src = sample_tree();
        let dst = tempfile::tempdir().unwrap();
        let replicator =
            TreeReplicator::with_exclusions(Exclusion::for_mode(ExclusionMode::Submission));

        let stats = replicator.replicate(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join("submission").exists());
        assert!(dst.path().join("representations/rep1-preservation/data/a.tif").exists());
        assert_eq!(
            fs::read_to_string(dst.path().join("representations/rep1/data/a.txt")).unwrap(),
            "hello"
        );
        assert_eq!(stats.files, 4);
        assert_eq!(stats.excluded, 1);
    }

    #[test]
    fn test_submission_named_files_are_kept() {
        let src = sample_tree();
        write(src.path(), "submission_agreement.pdf", "signed");
        write(src.path(), "representations/rep1/submission.txt", "note");
        let dst = tempfile::tempdir().unwrap();
        let replicator =
            TreeReplicator::with_exclusions(Exclusion::for_mode(ExclusionMode::Submission));

        let stats = replicator.replicate(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join("submission").exists());
        assert_eq!(
            fs::read_to_string(dst.path().join("submission_agreement.pdf")).unwrap(),
            "signed"
        );
        assert!(dst.path().join("representations/rep1/submission.txt").exists());
        assert_eq!(stats.excluded, 1);
    }

    #[test]
    fn test_preservation_named_file_is_kept() {
        let src = sample_tree();
        write(src.path(), "representations/notes-preservation", "plain file");
        let dst = tempfile::tempdir().unwrap();
        let replicator =
            TreeReplicator::with_exclusions(Exclusion::for_mode(ExclusionMode::Representation));

        replicator.replicate(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join("representations/rep1-preservation").exists());
        assert!(dst.path().join("representations/notes-preservation").is_file());
    }

    #[test]
    fn test_representation_exclusion() {
        let src = sample_tree();
        let dst = tempfile::tempdir().unwrap();
        let replicator =
            TreeReplicator::with_exclusions(Exclusion::for_mode(ExclusionMode::Representation));

        let stats = replicator.replicate(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join("representations/rep1-preservation").exists());
        assert!(dst.path().join("representations/rep1/data/a.txt").exists());
        assert!(dst.path().join("submission/METS.xml").exists());
        assert_eq!(stats.files, 4);
        let expected = "<mets/>".len() + "<dc/>".len() + "hello".len() + "<sip/>".len();
        assert_eq!(stats.bytes, expected as u64);
    }

    #[test]
    fn test_path_exclusion() {
        let src = sample_tree();
        let dst = tempfile::tempdir().unwrap();
        let replicator = TreeReplicator::new().exclude(Exclusion::Path(PathBuf::from("metadata")));

        replicator.replicate(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join("metadata").exists());
        assert!(dst.path().join("METS.xml").exists());
    }

    #[test]
    fn test_missing_source_fails_loudly() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("nope");
        let err = TreeReplicator::new()
            .replicate(&missing, &dst.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
