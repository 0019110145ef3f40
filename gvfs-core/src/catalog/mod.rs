//! The placeholder catalog: the durable, indexed record of every virtual file and
//! folder entry the projection layer has shown to the OS.
//!
//! Backed by a single SQLite table (`Placeholder`), matching the on-disk schema the
//! host projection layer expects so existing stores stay readable across versions.

mod entry;

use std::collections::HashSet;
use std::path::Path;

pub use entry::{PathType, PlaceholderEntry};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::error::Result;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS Placeholder (
        path TEXT PRIMARY KEY,
        pathType TINYINT NOT NULL,
        sha CHAR(40) NULL
    ) WITHOUT ROWID
";

/// Durable, connection-pooled index of placeholder entries.
///
/// Each operation borrows one connection from the pool for its own scope and returns
/// it on every exit path, including errors; the catalog holds no long-lived cursors
/// or cross-operation transactions.
#[derive(Debug, Clone)]
pub struct PlaceholderCatalog {
    pool: Pool<SqliteConnectionManager>,
}

impl PlaceholderCatalog {
    /// Opens (creating if missing) the catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::new(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(Self { pool })
    }

    /// Opens an in-memory catalog, primarily useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::new(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(Self { pool })
    }

    /// Exact row count at a transactional snapshot.
    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM Placeholder", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Classifies every row into files and folders in a single scan.
    ///
    /// Folder rows always come back with `sha = None`, regardless of what is (or
    /// isn't) stored on disk for them.
    pub fn get_all_entries(&self) -> Result<(Vec<PlaceholderEntry>, Vec<PlaceholderEntry>)> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT path, pathType, sha FROM Placeholder")?;
        let rows = stmt.query_map([], |row| {
            let path: String = row.get(0)?;
            let raw_type: i64 = row.get(1)?;
            let sha: Option<String> = row.get(2)?;
            Ok((path, raw_type, sha))
        })?;

        let mut files = Vec::new();
        let mut folders = Vec::new();
        for row in rows {
            let (path, raw_type, sha) = row?;
            let path_type = PathType::from_raw(raw_type).unwrap_or(PathType::File);
            let entry = PlaceholderEntry {
                path,
                path_type,
                sha: if path_type.is_folder() { None } else { sha },
            };
            if path_type.is_folder() {
                folders.push(entry);
            } else {
                files.push(entry);
            }
        }
        Ok((files, folders))
    }

    /// The set of paths for every row with `path_type = File`.
    pub fn get_all_file_paths(&self) -> Result<HashSet<String>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT path FROM Placeholder WHERE pathType = ?1")?;
        let rows = stmt.query_map(params![PathType::File as i64], |row| row.get::<_, String>(0))?;
        let mut paths = HashSet::new();
        for row in rows {
            paths.insert(row?);
        }
        Ok(paths)
    }

    /// Insert-or-replace by `path`. Folder-typed entries are stored with a null sha
    /// regardless of what the caller passed in.
    pub fn add(&self, entry: &PlaceholderEntry) -> Result<()> {
        let conn = self.pool.get()?;
        let sha = if entry.path_type.is_folder() {
            None
        } else {
            entry.sha.as_deref()
        };
        conn.execute(
            "INSERT INTO Placeholder (path, pathType, sha) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET pathType = excluded.pathType, sha = excluded.sha",
            params![entry.path, entry.path_type as i64, sha],
        )?;
        Ok(())
    }

    pub fn add_file(&self, path: impl Into<String>, sha: impl Into<String>) -> Result<()> {
        self.add(&PlaceholderEntry::file(path, sha))
    }

    pub fn add_partial_folder(&self, path: impl Into<String>) -> Result<()> {
        self.add(&PlaceholderEntry::folder(path, PathType::PartialFolder))
    }

    pub fn add_expanded_folder(&self, path: impl Into<String>) -> Result<()> {
        self.add(&PlaceholderEntry::folder(path, PathType::ExpandedFolder))
    }

    pub fn add_possible_tombstone_folder(&self, path: impl Into<String>) -> Result<()> {
        self.add(&PlaceholderEntry::folder(
            path,
            PathType::PossibleTombstoneFolder,
        ))
    }

    /// Removes the row for `path`; silent if absent.
    pub fn remove(&self, path: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM Placeholder WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// Point lookup, mainly used by tests and callers that just need one row.
    pub fn get(&self, path: &str) -> Result<Option<PlaceholderEntry>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT path, pathType, sha FROM Placeholder WHERE path = ?1",
                params![path],
                |row| {
                    let path: String = row.get(0)?;
                    let raw_type: i64 = row.get(1)?;
                    let sha: Option<String> = row.get(2)?;
                    Ok((path, raw_type, sha))
                },
            )
            .optional()?;
        Ok(row.map(|(path, raw_type, sha)| {
            let path_type = PathType::from_raw(raw_type).unwrap_or(PathType::File);
            PlaceholderEntry {
                path,
                path_type,
                sha: if path_type.is_folder() { None } else { sha },
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_classifies_files_and_folders() {
        let catalog = PlaceholderCatalog::open_in_memory().unwrap();
        catalog.add_file("a/b.txt", "0".repeat(40)).unwrap();
        catalog.add_partial_folder("a").unwrap();
        catalog.add_expanded_folder("a").unwrap();

        assert_eq!(catalog.count().unwrap(), 2);
        assert_eq!(
            catalog.get_all_file_paths().unwrap(),
            HashSet::from(["a/b.txt".to_string()])
        );

        let (files, folders) = catalog.get_all_entries().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].path, "a");
        assert_eq!(folders[0].path_type, PathType::ExpandedFolder);
        assert_eq!(folders[0].sha, None);
    }

    #[test]
    fn replace_semantics_overwrite_sha() {
        let catalog = PlaceholderCatalog::open_in_memory().unwrap();
        catalog.add_file("p", "a".repeat(40)).unwrap();
        catalog.add_file("p", "b".repeat(40)).unwrap();

        assert_eq!(catalog.count().unwrap(), 1);
        let entry = catalog.get("p").unwrap().unwrap();
        assert_eq!(entry.sha, Some("b".repeat(40)));
    }

    #[test]
    fn folder_sha_is_always_null_even_if_requested_otherwise() {
        let catalog = PlaceholderCatalog::open_in_memory().unwrap();
        let mut entry = PlaceholderEntry::folder("weird", PathType::PartialFolder);
        entry.sha = Some("f".repeat(40));
        catalog.add(&entry).unwrap();

        let stored = catalog.get("weird").unwrap().unwrap();
        assert_eq!(stored.sha, None);
    }

    #[test]
    fn remove_is_silent_when_absent() {
        let catalog = PlaceholderCatalog::open_in_memory().unwrap();
        catalog.remove("never/existed").unwrap();
        assert_eq!(catalog.count().unwrap(), 0);
    }

    #[test]
    fn remove_deletes_existing_row() {
        let catalog = PlaceholderCatalog::open_in_memory().unwrap();
        catalog.add_file("p", "a".repeat(40)).unwrap();
        catalog.remove("p").unwrap();
        assert_eq!(catalog.count().unwrap(), 0);
    }
}
