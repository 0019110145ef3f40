//! Single-shot notification that a directory path (interpreted as a volume root) has
//! become reachable. Shared by the mount supervisor and any other subsystem that
//! needs "fire once when this path's volume appears".

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Shared polling cadence for the volume watcher and the mount supervisor.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Ordered list of one-shot callbacks waiting on a single volume path, plus whether
/// the poll timer is currently spawned for them.
///
/// Both live behind one lock so that "the timer is about to stop because bindings
/// are empty" and "a new binding just arrived" can never interleave: the decision to
/// clear `timer_running` is made in the same critical section that observes
/// `by_path` is empty, and a concurrent `register` that adds a binding while holding
/// this lock always sees a consistent view of whether it still needs to spawn.
#[derive(Default)]
struct Bindings {
    by_path: HashMap<PathBuf, Vec<Callback>>,
    timer_running: bool,
}

struct Inner {
    bindings: Mutex<Bindings>,
    shutdown: CancellationToken,
}

/// Polls for path reachability every [`POLL_INTERVAL`] and fires registered
/// callbacks, in registration order, the first time a path is observed to exist.
#[derive(Clone)]
pub struct VolumeWatcher {
    inner: Arc<Inner>,
}

impl Default for VolumeWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeWatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                bindings: Mutex::new(Bindings::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Appends `callback` to the binding for `volume_path` and starts the poll
    /// timer if it isn't already running. Never fails; duplicate registrations for
    /// the same path accumulate and all fire together, in registration order.
    pub fn register(&self, volume_path: impl Into<PathBuf>, callback: impl FnOnce() + Send + 'static) {
        let volume_path = volume_path.into();
        let should_spawn = {
            let mut bindings = self.inner.bindings.lock();
            bindings
                .by_path
                .entry(volume_path)
                .or_default()
                .push(Box::new(callback));
            if bindings.timer_running {
                false
            } else {
                bindings.timer_running = true;
                true
            }
        };
        if should_spawn {
            Inner::spawn_timer(&self.inner);
        }
    }

    /// Stops the timer and drops any pending callbacks silently. No callback fires
    /// after `dispose` returns.
    pub fn dispose(&self) {
        self.inner.shutdown.cancel();
        self.inner.bindings.lock().by_path.clear();
    }
}

impl Inner {
    /// Spawns the poll loop. Callers must have already marked `timer_running = true`
    /// under the bindings lock before calling this, so the flag and the running task
    /// never disagree.
    fn spawn_timer(inner: &Arc<Inner>) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => {
                        tracing::debug!("volume watcher disposed, timer stopping");
                        inner.bindings.lock().timer_running = false;
                        return;
                    }
                    _ = tokio::time::sleep(POLL_INTERVAL) => {
                        inner.sweep();
                    }
                }

                let mut bindings = inner.bindings.lock();
                if bindings.by_path.is_empty() {
                    bindings.timer_running = false;
                    return;
                }
            }
        });
    }

    /// One tick: snapshot the registered paths, and for each that now exists, fire
    /// every attached callback in order and remove the binding.
    fn sweep(&self) {
        let paths: Vec<PathBuf> = self.bindings.lock().by_path.keys().cloned().collect();
        for path in paths {
            if !path_exists(&path) {
                continue;
            }
            let callbacks = self.bindings.lock().by_path.remove(&path);
            let Some(callbacks) = callbacks else {
                continue;
            };
            for callback in callbacks {
                if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(callback)) {
                    tracing::warn!(?path, ?panic, "volume watcher callback panicked");
                }
            }
        }
    }
}

fn path_exists(path: &Path) -> bool {
    path.exists()
}
