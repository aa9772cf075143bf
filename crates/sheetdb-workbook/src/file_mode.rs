use crate::traits::SpreadsheetWriter;
use std::path::Path;

/// How a file-backed workbook is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// The file must exist.
    #[default]
    Read,
    /// Start an empty workbook bound to the path, ignoring any existing file.
    Create,
    /// Read when the file exists, create otherwise.
    ReadOrCreate,
}

impl FileMode {
    pub fn open<S: SpreadsheetWriter>(self, path: &Path) -> Result<S, S::Error> {
        let create = match self {
            FileMode::Read => false,
            FileMode::Create => true,
            FileMode::ReadOrCreate => !path.exists(),
        };
        tracing::debug!(path = %path.display(), mode = ?self, create, "opening workbook");
        if create {
            S::create_path(path)
        } else {
            S::open_path(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IoError, JsonAdapter, SpreadsheetReader};

    #[test]
    fn read_is_the_default_and_needs_the_file() {
        assert_eq!(FileMode::default(), FileMode::Read);
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let err = FileMode::default().open::<JsonAdapter>(&missing).unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn read_or_create_starts_empty_for_a_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.json");
        let store = FileMode::ReadOrCreate.open::<JsonAdapter>(&path).unwrap();
        assert!(store.sheet_names().unwrap().is_empty());
    }
}
