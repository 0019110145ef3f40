use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::reflog::is_sha1;

/// A source of full symbolic refs (e.g. `HEAD`, `refs/heads/main`) to diagnose, plus
/// the validation rule applied to each one's on-disk contents.
pub trait RefFamily {
    /// Full symbolic refs this family contributes, relative to `.git/`.
    fn enumerate_refs(&self, git_dir: &Path) -> std::io::Result<Vec<String>>;

    /// Whether `contents` (already trimmed of trailing whitespace) is well-formed.
    ///
    /// Default rule: a symbolic ref (`ref: refs/...`, case-insensitive prefix) or a
    /// 40-character lowercase-hex SHA-1.
    fn is_valid_ref_contents(&self, contents: &str) -> bool {
        is_valid_ref_contents_default(contents)
    }
}

pub(crate) fn is_valid_ref_contents_default(contents: &str) -> bool {
    let trimmed = contents.trim_end();
    trimmed
        .as_bytes()
        .get(.."ref: refs/".len())
        .is_some_and(|b| b.eq_ignore_ascii_case(b"ref: refs/"))
        || is_sha1(trimmed)
}

/// Yields the single symbolic ref `HEAD`.
#[derive(Debug, Default)]
pub struct HeadFamily;

impl RefFamily for HeadFamily {
    fn enumerate_refs(&self, git_dir: &Path) -> std::io::Result<Vec<String>> {
        let _ = git_dir;
        Ok(vec!["HEAD".to_string()])
    }
}

/// Recursively enumerates `refs/heads/**`, yielding each as a full symbolic ref.
#[derive(Debug, Default)]
pub struct LocalBranchesFamily;

impl RefFamily for LocalBranchesFamily {
    fn enumerate_refs(&self, git_dir: &Path) -> std::io::Result<Vec<String>> {
        let heads_dir = git_dir.join("refs").join("heads");
        if !heads_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&heads_dir) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&heads_dir)
                .expect("walkdir yields paths under heads_dir");
            let relative = path_to_ref_component(relative);
            refs.push(format!("refs/heads/{relative}"));
        }
        refs.sort();
        Ok(refs)
    }
}

fn path_to_ref_component(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Convenience for callers that want both in-scope families without naming each type.
pub fn default_families() -> Vec<Box<dyn RefFamily>> {
    vec![Box::new(HeadFamily), Box::new(LocalBranchesFamily)]
}

pub(crate) fn ref_file_path(git_dir: &Path, full_ref: &str) -> PathBuf {
    git_dir.join(full_ref)
}

pub(crate) fn reflog_path(git_dir: &Path, full_ref: &str) -> PathBuf {
    git_dir.join("logs").join(full_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn head_family_yields_head_unconditionally() {
        let dir = tempdir().unwrap();
        let refs = HeadFamily.enumerate_refs(dir.path()).unwrap();
        assert_eq!(refs, vec!["HEAD".to_string()]);
    }

    #[test]
    fn local_branches_recurses_nested_directories() {
        let dir = tempdir().unwrap();
        let heads = dir.path().join("refs").join("heads");
        std::fs::create_dir_all(heads.join("feature")).unwrap();
        std::fs::write(heads.join("main"), "deadbeef\n").unwrap();
        std::fs::write(heads.join("feature").join("x"), "deadbeef\n").unwrap();

        let mut refs = LocalBranchesFamily.enumerate_refs(dir.path()).unwrap();
        refs.sort();
        assert_eq!(
            refs,
            vec!["refs/heads/feature/x".to_string(), "refs/heads/main".to_string()]
        );
    }

    #[test]
    fn local_branches_empty_when_heads_dir_missing() {
        let dir = tempdir().unwrap();
        assert!(LocalBranchesFamily.enumerate_refs(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn default_validation_accepts_symbolic_and_sha_forms() {
        assert!(is_valid_ref_contents_default("ref: refs/heads/main\n"));
        assert!(is_valid_ref_contents_default("REF: REFS/heads/main"));
        assert!(is_valid_ref_contents_default(&"a".repeat(40)));
        assert!(!is_valid_ref_contents_default("garbage"));
        assert!(!is_valid_ref_contents_default(&"A".repeat(40)));
    }

    #[test]
    fn default_validation_does_not_panic_on_multibyte_garbage() {
        // The 11th byte of this string falls in the middle of the 3-byte UTF-8
        // encoding of '€', so a byte-index slice at 10 would land off a char
        // boundary if not guarded.
        assert!(!is_valid_ref_contents_default("123456789€garbage"));
    }
}
