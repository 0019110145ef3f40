/// Discriminates the kind of virtual entry a [`super::PlaceholderEntry`] row describes.
///
/// Numeric values are part of the on-disk format and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum PathType {
    File = 0,
    PartialFolder = 1,
    ExpandedFolder = 2,
    PossibleTombstoneFolder = 3,
}

impl PathType {
    pub fn is_folder(self) -> bool {
        !matches!(self, PathType::File)
    }

    pub(crate) fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(PathType::File),
            1 => Some(PathType::PartialFolder),
            2 => Some(PathType::ExpandedFolder),
            3 => Some(PathType::PossibleTombstoneFolder),
            _ => None,
        }
    }
}

/// A row in the `Placeholder` table.
///
/// `path` is the primary key; a second insert for the same path overwrites `path_type`
/// and `sha` atomically (see [`super::PlaceholderCatalog::add`]). Folder-typed entries
/// always carry a `None` sha on disk, regardless of what the caller passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderEntry {
    pub path: String,
    pub path_type: PathType,
    pub sha: Option<String>,
}

impl PlaceholderEntry {
    pub fn file(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            path_type: PathType::File,
            sha: Some(sha.into()),
        }
    }

    pub fn folder(path: impl Into<String>, path_type: PathType) -> Self {
        debug_assert!(path_type.is_folder());
        Self {
            path: path.into(),
            path_type,
            sha: None,
        }
    }
}
