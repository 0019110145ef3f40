//! Offline diagnosis and repair of malformed Git refs, operating directly on the
//! on-disk `.git` layout so a corrupted enlistment doesn't need a working Git binary
//! to be inspected.

mod family;
mod reflog;

pub use family::{default_families, HeadFamily, LocalBranchesFamily, RefFamily};
pub use reflog::RefLogEntry;

use std::path::{Path, PathBuf};

use family::{ref_file_path, reflog_path};

/// Interlock paths under `.git` whose presence forbids repair, paired with the
/// operation name used in the resulting message.
const INTERLOCKS: &[(&str, &str)] = &[
    ("rebase-apply", "rebase"),
    ("MERGE_HEAD", "merge"),
    ("BISECT_START", "bisect"),
    ("CHERRY_PICK_HEAD", "cherry-pick"),
    ("REVERT_HEAD", "revert"),
];

/// Result of [`RefRepairEngine::has_issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefIssue {
    /// No bad refs found; nothing to do.
    NoIssue,
    /// At least one bad ref, and no interlock blocks repair.
    Fixable,
    /// At least one bad ref, but an in-progress Git operation forbids repair.
    CantFix,
}

/// Result of [`RefRepairEngine::try_fix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    Success,
    /// All-or-nothing: if any ref failed to repair the whole attempt is a failure,
    /// even though the refs that did succeed are left repaired on disk.
    Failure { failed_count: usize },
}

/// Diagnoses and repairs refs from a set of [`RefFamily`] sources rooted at one
/// enlistment's `.git` directory.
pub struct RefRepairEngine {
    git_dir: PathBuf,
    families: Vec<Box<dyn RefFamily>>,
}

impl RefRepairEngine {
    /// `enlistment_root` is the directory containing `.git`.
    pub fn new(enlistment_root: impl AsRef<Path>, families: Vec<Box<dyn RefFamily>>) -> Self {
        Self {
            git_dir: enlistment_root.as_ref().join(".git"),
            families,
        }
    }

    /// Uses [`default_families`]: `HEAD` and local branches.
    pub fn with_default_families(enlistment_root: impl AsRef<Path>) -> Self {
        Self::new(enlistment_root, default_families())
    }

    /// Scans every ref from every family. Appends one message to `messages` per bad
    /// ref encountered, and one more if an interlock blocks repair.
    pub fn has_issue(&self, messages: &mut Vec<String>) -> std::io::Result<RefIssue> {
        let bad_refs = self.collect_bad_refs(messages)?;
        if bad_refs.is_empty() {
            return Ok(RefIssue::NoIssue);
        }

        if let Some(op) = self.blocking_interlock() {
            messages.push(format!("Can't repair while a {op} operation is in progress"));
            return Ok(RefIssue::CantFix);
        }
        Ok(RefIssue::Fixable)
    }

    /// Attempts to repair every ref that still fails validation, reconstructing each
    /// from the tail of its reflog. Callers must not invoke this after `has_issue`
    /// returned [`RefIssue::CantFix`].
    pub fn try_fix(&self, messages: &mut Vec<String>) -> std::io::Result<RepairOutcome> {
        let bad_refs = self.collect_bad_refs(&mut Vec::new())?;
        let mut failed = 0usize;
        for full_ref in &bad_refs {
            if let Err(err) = self.try_write_ref_from_log(full_ref) {
                messages.push(format!("failed to repair {full_ref}: {err}"));
                failed += 1;
            }
        }

        if failed == 0 {
            Ok(RepairOutcome::Success)
        } else {
            messages.push(format!("{failed} of {} refs could not be repaired", bad_refs.len()));
            Ok(RepairOutcome::Failure { failed_count: failed })
        }
    }

    fn collect_bad_refs(&self, messages: &mut Vec<String>) -> std::io::Result<Vec<String>> {
        let mut bad = Vec::new();
        for family in &self.families {
            for full_ref in family.enumerate_refs(&self.git_dir)? {
                match std::fs::read_to_string(ref_file_path(&self.git_dir, &full_ref)) {
                    Ok(contents) if family.is_valid_ref_contents(&contents) => {}
                    Ok(contents) => {
                        messages.push(format!("Invalid contents found in '{full_ref}': {contents}"));
                        bad.push(full_ref);
                    }
                    Err(err) => {
                        messages.push(format!("{full_ref} could not be read: {err}"));
                        bad.push(full_ref);
                    }
                }
            }
        }
        Ok(bad)
    }

    fn blocking_interlock(&self) -> Option<&'static str> {
        INTERLOCKS
            .iter()
            .find(|(path, _)| self.git_dir.join(path).exists())
            .map(|(_, op)| *op)
    }

    /// Opens `.git/logs/<full_ref>`, parses its last line, and overwrites
    /// `.git/<full_ref>` with `<target_sha>\n`.
    fn try_write_ref_from_log(&self, full_ref: &str) -> std::io::Result<()> {
        let log_path = reflog_path(&self.git_dir, full_ref);
        let log_contents = std::fs::read_to_string(&log_path)?;
        let entry = RefLogEntry::parse_last_line(&log_contents)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed reflog entry"))?;
        std::fs::write(ref_file_path(&self.git_dir, full_ref), format!("{}\n", entry.target_sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_ref(git_dir: &Path, full_ref: &str, contents: &str) {
        let path = git_dir.join(full_ref);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn write_reflog(git_dir: &Path, full_ref: &str, last_line: &str) {
        let path = git_dir.join("logs").join(full_ref);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{last_line}\n")).unwrap();
    }

    #[test]
    fn no_issue_when_all_refs_are_valid() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "HEAD", "ref: refs/heads/main\n");

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(HeadFamily)]);
        let mut messages = Vec::new();
        assert_eq!(engine.has_issue(&mut messages).unwrap(), RefIssue::NoIssue);
        assert!(messages.is_empty());
    }

    #[test]
    fn blocked_by_merge_interlock() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "refs/heads/main", "garbage");
        std::fs::write(git_dir.join("MERGE_HEAD"), "deadbeef\n").unwrap();

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(LocalBranchesFamily)]);
        let mut messages = Vec::new();
        assert_eq!(engine.has_issue(&mut messages).unwrap(), RefIssue::CantFix);
        assert!(messages
            .iter()
            .any(|m| m == "Can't repair while a merge operation is in progress"));
    }

    #[test]
    fn malformed_contents_message_includes_the_offending_contents() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "refs/heads/main", "garbage");

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(LocalBranchesFamily)]);
        let mut messages = Vec::new();
        assert_eq!(engine.has_issue(&mut messages).unwrap(), RefIssue::Fixable);
        assert!(messages
            .iter()
            .any(|m| m == "Invalid contents found in 'refs/heads/main': garbage"));
    }

    #[test]
    fn repairs_a_ref_from_its_reflog_tail() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "refs/heads/main", "garbage");
        let target = "d".repeat(40);
        let last_line = format!("{} {target} a <a@b.c> 1700000000 +0000\tcommit", "0".repeat(40));
        write_reflog(&git_dir, "refs/heads/main", &last_line);

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(LocalBranchesFamily)]);
        let mut messages = Vec::new();
        assert_eq!(engine.has_issue(&mut messages).unwrap(), RefIssue::Fixable);

        let mut fix_messages = Vec::new();
        assert_eq!(engine.try_fix(&mut fix_messages).unwrap(), RepairOutcome::Success);

        let repaired = std::fs::read_to_string(git_dir.join("refs/heads/main")).unwrap();
        assert_eq!(repaired, format!("{target}\n"));
    }

    #[test]
    fn repair_is_idempotent() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "refs/heads/main", "garbage");
        let target = "d".repeat(40);
        let last_line = format!("{} {target} a <a@b.c> 1700000000 +0000\tcommit", "0".repeat(40));
        write_reflog(&git_dir, "refs/heads/main", &last_line);

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(LocalBranchesFamily)]);
        engine.try_fix(&mut Vec::new()).unwrap();
        let after_first = std::fs::read_to_string(git_dir.join("refs/heads/main")).unwrap();

        // Second run sees a now-valid ref (a bare SHA-1), so has_issue reports no issue
        // and try_fix touches nothing further.
        let mut messages = Vec::new();
        assert_eq!(engine.has_issue(&mut messages).unwrap(), RefIssue::NoIssue);
        let after_second = std::fs::read_to_string(git_dir.join("refs/heads/main")).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn failure_is_reported_when_reflog_is_missing() {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        write_ref(&git_dir, "refs/heads/main", "garbage");

        let engine = RefRepairEngine::new(dir.path(), vec![Box::new(LocalBranchesFamily)]);
        let mut messages = Vec::new();
        assert_eq!(
            engine.try_fix(&mut messages).unwrap(),
            RepairOutcome::Failure { failed_count: 1 }
        );
    }
}
