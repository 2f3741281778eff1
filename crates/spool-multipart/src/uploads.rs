//! Result of an upload session.

use std::path::{Path, PathBuf};

/// Files and fields collected from one request body.
///
/// Files are keyed by declared filename in order of first arrival. A later
/// part with the same filename replaces the recorded path; the earlier file
/// stays on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    files: Vec<(String, PathBuf)>,
    fields: Vec<(String, String)>,
}

impl Uploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file, returning the path it replaced, if any.
    pub fn insert_file(&mut self, filename: impl Into<String>, path: PathBuf) -> Option<PathBuf> {
        let filename = filename.into();
        match self.files.iter_mut().find(|(name, _)| *name == filename) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, path)),
            None => {
                self.files.push((filename, path));
                None
            }
        }
    }

    /// Record an in-memory field value. Repeated names are kept.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Temporary path for a declared filename.
    pub fn get(&self, filename: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, path)| path.as_path())
    }

    /// First value of a form field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of distinct filenames.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_keeps_first_position() {
        let mut uploads = Uploads::new();
        assert_eq!(uploads.insert_file("a.txt", PathBuf::from("/t/1")), None);
        assert_eq!(uploads.insert_file("b.txt", PathBuf::from("/t/2")), None);
        assert_eq!(
            uploads.insert_file("a.txt", PathBuf::from("/t/3")),
            Some(PathBuf::from("/t/1"))
        );

        let names: Vec<_> = uploads.files().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(uploads.get("a.txt"), Some(Path::new("/t/3")));
        assert_eq!(uploads.len(), 2);
    }

    #[test]
    fn fields_keep_repeats() {
        let mut uploads = Uploads::new();
        uploads.insert_field("tag", "x");
        uploads.insert_field("tag", "y");
        assert_eq!(uploads.field("tag"), Some("x"));
        assert_eq!(uploads.fields().count(), 2);
        assert!(uploads.is_empty());
    }
}
