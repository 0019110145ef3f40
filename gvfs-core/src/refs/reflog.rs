/// A single parsed line of a Git reflog file.
///
/// Reflog lines follow `<old-sha> <new-sha> <committer> <timestamp> <tz>\t<message>`.
/// The repair engine only ever needs `new-sha`, so that is all this type keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefLogEntry {
    pub target_sha: String,
}

impl RefLogEntry {
    /// Parses the last non-empty line of `contents` as a reflog entry.
    ///
    /// Returns `None` if there is no non-empty line, or if the line's second
    /// whitespace-separated field is not a 40-character lowercase-hex SHA-1.
    pub fn parse_last_line(contents: &str) -> Option<Self> {
        let last_line = contents.lines().rev().find(|line| !line.trim().is_empty())?;
        let mut fields = last_line.split_whitespace();
        let _old_sha = fields.next()?;
        let target_sha = fields.next()?;
        if is_sha1(target_sha) {
            Some(Self {
                target_sha: target_sha.to_string(),
            })
        } else {
            None
        }
    }
}

pub(crate) fn is_sha1(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
