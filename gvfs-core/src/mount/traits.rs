use std::path::{Path, PathBuf};

/// A repository registered for a user session. The registry that produces these is
/// external and read-only from the supervisor's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRegistration {
    pub enlistment_root: PathBuf,
    pub owner_user_id: String,
    pub active: bool,
}

/// Read-only view over a user's registered repositories.
pub trait RepoRegistry: Send + Sync {
    /// Active repos owned by `user_sid`, or a human-readable error on registry
    /// failure (a transient environmental condition, not a contract violation).
    fn try_get_active_repos_for_user(
        &self,
        user_sid: &str,
    ) -> std::result::Result<Vec<RepoRegistration>, String>;
}

/// Resolves the filesystem volume root a given enlistment lives on. Platform-specific
/// and out of scope for this crate; callers supply their own implementation.
pub trait VolumeRootResolver: Send + Sync {
    fn volume_root_for(&self, enlistment_root: &Path) -> PathBuf;
}

/// Launches (and eventually tears down) the per-repo projection process.
pub trait MountFactory: Send + Sync {
    /// Attempts to mount `enlistment_root`. Returns whether the mount succeeded.
    fn mount(&self, enlistment_root: &Path) -> bool;

    /// The SID of the currently logged-in user driving this supervisor.
    fn user_sid(&self) -> String;

    fn dispose(&self);
}

/// User-visible notification delivery. Out of scope beyond this sink interface.
pub trait NotificationSink: Send + Sync {
    fn send_notification(&self, session_id: &str, title: &str, message: &str);
}
