//! Per-user control loop that mounts all of a user's registered repositories once
//! their volumes become reachable, retrying on a bounded timer until every repo is
//! either mounted or its volume is confirmed still absent.

mod traits;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub use traits::{MountFactory, NotificationSink, RepoRegistration, RepoRegistry, VolumeRootResolver};

use crate::volume_watch::POLL_INTERVAL;

const NOTIFICATION_TITLE: &str = "GVFS AutoMount";

/// Outcome of a single sweep over a user's registered repos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepOutcome {
    /// Every repo's volume was present during this sweep (mounts may still have
    /// individually failed; that does not trigger a retry).
    AllVolumesPresent,
    /// At least one repo's volume was absent; the sweep should be retried.
    SomeVolumeMissing,
    /// The registry could not be queried. The next *external* trigger (a fresh
    /// `start()`, or a volume watcher callback) retries; the timer is left alone.
    RegistryFailed,
}

struct State {
    session_id: String,
    user_sid: String,
    registry: Arc<dyn RepoRegistry>,
    volumes: Arc<dyn VolumeRootResolver>,
    mount_factory: Arc<dyn MountFactory>,
    notifications: Arc<dyn NotificationSink>,
    timer_running: Mutex<bool>,
    shutdown: CancellationToken,
}

/// Drives mounts for one logged-in user's session.
#[derive(Clone)]
pub struct MountSupervisor {
    state: Arc<State>,
}

impl MountSupervisor {
    pub fn new(
        session_id: impl Into<String>,
        registry: Arc<dyn RepoRegistry>,
        volumes: Arc<dyn VolumeRootResolver>,
        mount_factory: Arc<dyn MountFactory>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let user_sid = mount_factory.user_sid();
        Self {
            state: Arc::new(State {
                session_id: session_id.into(),
                user_sid,
                registry,
                volumes,
                mount_factory,
                notifications,
                timer_running: Mutex::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Runs one immediate sweep, arming the retry timer if any volume was absent.
    pub fn start(&self) {
        let outcome = self.state.mount_all();
        if outcome == SweepOutcome::SomeVolumeMissing {
            State::ensure_timer_running(&self.state);
        }
    }

    /// Stops the retry timer and disposes the mount factory. In-flight mounts
    /// already executing run to completion; no per-task cancellation exists.
    pub fn dispose(&self) {
        self.state.shutdown.cancel();
        self.state.mount_factory.dispose();
    }
}

impl State {
    fn ensure_timer_running(state: &Arc<State>) {
        {
            let mut running = state.timer_running.lock();
            if *running {
                return;
            }
            *running = true;
        }

        let state = Arc::clone(state);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = state.shutdown.cancelled() => {
                        tracing::debug!(session_id = %state.session_id, "mount supervisor disposed, timer stopping");
                        break;
                    }
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
                if state.shutdown.is_cancelled() {
                    break;
                }
                if state.mount_all() != SweepOutcome::SomeVolumeMissing {
                    break;
                }
            }
            *state.timer_running.lock() = false;
        });
    }

    /// One pass over the user's active repos: mount whichever have a reachable
    /// volume, notify on success/failure, and report whether any volume is still
    /// absent.
    fn mount_all(&self) -> SweepOutcome {
        let span = tracing::info_span!("mount_sweep", session_id = %self.session_id, user_sid = %self.user_sid);
        let _enter = span.enter();

        let repos = match self.registry.try_get_active_repos_for_user(&self.user_sid) {
            Ok(repos) => repos,
            Err(err) => {
                tracing::warn!(error = %err, "failed to query repo registry");
                return SweepOutcome::RegistryFailed;
            }
        };

        let mut any_missing = false;
        for repo in &repos {
            let volume_root = self.volumes.volume_root_for(&repo.enlistment_root);
            if !volume_root.is_dir() {
                any_missing = true;
                continue;
            }

            let mounted = self.mount_factory.mount(&repo.enlistment_root);
            let path = repo.enlistment_root.display();
            if mounted {
                self.notifications.send_notification(
                    &self.session_id,
                    NOTIFICATION_TITLE,
                    &format!("{path} is ready."),
                );
            } else {
                tracing::warn!(enlistment = %path, "repo failed to mount");
                self.notifications.send_notification(
                    &self.session_id,
                    NOTIFICATION_TITLE,
                    &format!("{path} failed to mount."),
                );
            }
        }

        if any_missing {
            SweepOutcome::SomeVolumeMissing
        } else {
            SweepOutcome::AllVolumesPresent
        }
    }
}
