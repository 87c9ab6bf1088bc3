//! Path classification by hierarchy depth
//!
//! The media root holds one directory per show and each show directory holds
//! one directory per season. Whether a path is a show or season directory is
//! decided purely by how many path segments separate it from the root, never
//! by the names involved.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while classifying a path
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The path vanished or never existed
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but could not be inspected
    #[error("Failed to inspect {path}: {source}")]
    InspectFailed { path: PathBuf, source: io::Error },
}

/// Position of a path within the media hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// A directory exactly one level below the root
    ShowRoot,
    /// A directory exactly two levels below the root
    SeasonRoot,
    /// Anything else, including files and the root itself
    Other,
}

/// Classifies paths relative to a fixed media root
#[derive(Debug, Clone)]
pub struct PathClassifier {
    root: PathBuf,
}

impl PathClassifier {
    /// Creates a classifier for the given root.
    ///
    /// The root should be absolute and canonical; candidates are compared
    /// against it component by component.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of segments between the root and `path`.
    ///
    /// Returns `None` for paths outside the root and for paths that contain
    /// `.` or `..` segments below it.
    pub fn depth(&self, path: &Path) -> Option<usize> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => depth += 1,
                _ => return None,
            }
        }
        Some(depth)
    }

    /// Classifies `path` by depth below the root.
    ///
    /// Fails with `NotFound` if the path does not exist when queried.
    pub fn classify(&self, path: &Path) -> Result<PathClass, ClassifyError> {
        let metadata = fs::metadata(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ClassifyError::NotFound(path.to_path_buf())
            } else {
                ClassifyError::InspectFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if !metadata.is_dir() {
            return Ok(PathClass::Other);
        }

        Ok(match self.depth(path) {
            Some(1) => PathClass::ShowRoot,
            Some(2) => PathClass::SeasonRoot,
            _ => PathClass::Other,
        })
    }

    pub fn is_show_root(&self, path: &Path) -> Result<bool, ClassifyError> {
        Ok(self.classify(path)? == PathClass::ShowRoot)
    }

    pub fn is_season_root(&self, path: &Path) -> Result<bool, ClassifyError> {
        Ok(self.classify(path)? == PathClass::SeasonRoot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    /// root/Show/1/ep.mp4, root/Show/1/extras/, root/loose.mp4
    fn media_tree(root_name: &str) -> (TempDir, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap().join(root_name);
        fs::create_dir_all(root.join("Show").join("1").join("extras")).unwrap();
        File::create(root.join("Show").join("1").join("ep.mp4")).unwrap();
        File::create(root.join("loose.mp4")).unwrap();
        (temp, root)
    }

    #[test]
    fn test_classify_by_depth() {
        let (_temp, root) = media_tree("media");
        let classifier = PathClassifier::new(&root);

        assert_eq!(classifier.classify(&root).unwrap(), PathClass::Other);
        assert_eq!(
            classifier.classify(&root.join("Show")).unwrap(),
            PathClass::ShowRoot
        );
        assert_eq!(
            classifier.classify(&root.join("Show/1")).unwrap(),
            PathClass::SeasonRoot
        );
        assert_eq!(
            classifier.classify(&root.join("Show/1/extras")).unwrap(),
            PathClass::Other
        );
    }

    #[test]
    fn test_files_are_never_roots() {
        let (_temp, root) = media_tree("media");
        let classifier = PathClassifier::new(&root);

        assert_eq!(
            classifier.classify(&root.join("loose.mp4")).unwrap(),
            PathClass::Other
        );
        assert_eq!(
            classifier.classify(&root.join("Show/1/ep.mp4")).unwrap(),
            PathClass::Other
        );
    }

    #[test]
    fn test_root_name_with_pattern_characters() {
        // names that would have broken a pattern anchored on the root name
        let (_temp, root) = media_tree("[media]+.*");
        let classifier = PathClassifier::new(&root);

        assert!(classifier.is_show_root(&root.join("Show")).unwrap());
        assert!(classifier.is_season_root(&root.join("Show/1")).unwrap());
        assert!(!classifier.is_show_root(&root.join("Show/1")).unwrap());
    }

    #[test]
    fn test_path_outside_root_is_other() {
        let (temp, root) = media_tree("media");
        let outside = temp.path().canonicalize().unwrap().join("elsewhere");
        fs::create_dir_all(outside.join("Show")).unwrap();
        let classifier = PathClassifier::new(&root);

        assert_eq!(
            classifier.classify(&outside.join("Show")).unwrap(),
            PathClass::Other
        );
        assert_eq!(classifier.depth(&outside), None);
    }

    #[test]
    fn test_parent_segments_are_rejected() {
        let classifier = PathClassifier::new("/media");
        assert_eq!(classifier.depth(Path::new("/media/Show/../Other")), None);
        assert_eq!(classifier.depth(Path::new("/media/Show/1")), Some(2));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let (_temp, root) = media_tree("media");
        let classifier = PathClassifier::new(&root);

        let result = classifier.classify(&root.join("Gone"));
        assert!(matches!(result, Err(ClassifyError::NotFound(_))));
    }
}
