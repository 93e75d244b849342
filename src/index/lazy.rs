use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::list::ListError;

enum State<T> {
    Uninit,
    Building,
    Ready(Arc<T>),
    Failed(String),
}

/// Index built on first use and shared by every later access.
///
/// Exactly one caller runs the build; concurrent callers block on a condition
/// variable until it publishes. The build closure runs without the lock held,
/// so it may do slow I/O. A failed (or panicking) build leaves the index in a
/// terminal failed state and every caller gets [`ListError::IndexBuildFailed`].
pub struct LazyIndex<T> {
    state: Mutex<State<T>>,
    published: Condvar,
}

impl<T> Default for LazyIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyIndex<T> {
    /// Unbuilt index
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Uninit),
            published: Condvar::new(),
        }
    }

    /// True once a build has been published
    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock(), State::Ready(_))
    }

    /// Return the published index, building it with `build` if nobody has yet
    pub fn get_or_build<F>(&self, component: &str, build: F) -> Result<Arc<T>, ListError>
    where
        F: FnOnce() -> Result<T, ListError>,
    {
        let mut state = self.lock();
        loop {
            let building = match &*state {
                State::Ready(index) => return Ok(Arc::clone(index)),
                State::Failed(message) => return Err(failed(component, message)),
                State::Building => true,
                State::Uninit => false,
            };
            if !building {
                break;
            }
            state = self.wait(state);
        }
        *state = State::Building;
        drop(state);
        self.run_build(component, build)
    }

    /// Replace `stale` with a freshly built index.
    ///
    /// When another caller already replaced it, their index is returned and
    /// `build` is not run, so one stale observation causes at most one rebuild.
    pub fn rebuild_if_current<F>(&self, component: &str, stale: &Arc<T>, build: F) -> Result<Arc<T>, ListError>
    where
        F: FnOnce() -> Result<T, ListError>,
    {
        let mut state = self.lock();
        loop {
            let building = match &*state {
                State::Ready(current) if !Arc::ptr_eq(current, stale) => return Ok(Arc::clone(current)),
                State::Ready(_) | State::Uninit => false,
                State::Failed(message) => return Err(failed(component, message)),
                State::Building => true,
            };
            if !building {
                break;
            }
            state = self.wait(state);
        }
        *state = State::Building;
        drop(state);
        log::debug!("[{}] rebuilding index", component);
        self.run_build(component, build)
    }

    fn run_build<F>(&self, component: &str, build: F) -> Result<Arc<T>, ListError>
    where
        F: FnOnce() -> Result<T, ListError>,
    {
        let mut guard = PanicGuard {
            index: self,
            armed: true,
        };
        let outcome = build();

        let mut state = self.lock();
        let result = match outcome {
            Ok(value) => {
                let index = Arc::new(value);
                *state = State::Ready(Arc::clone(&index));
                Ok(index)
            }
            Err(e) => {
                log::error!("[{}] index build failed: {}", component, e);
                *state = State::Failed(e.to_string());
                Err(e)
            }
        };
        guard.armed = false;
        drop(state);
        self.published.notify_all();
        result
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        self.published
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn failed(component: &str, message: &str) -> ListError {
    ListError::IndexBuildFailed {
        component: component.to_string(),
        message: message.to_string(),
    }
}

/// Moves the index to `Failed` if the build closure unwinds, so waiters wake
struct PanicGuard<'a, T> {
    index: &'a LazyIndex<T>,
    armed: bool,
}

impl<T> Drop for PanicGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.index.lock() = State::Failed("index build panicked".to_string());
            self.index.published.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_builds_once_under_contention() {
        let index = Arc::new(LazyIndex::<Vec<u32>>::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    index
                        .get_or_build("test", || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(vec![1, 2, 3])
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert!(index.is_ready());
    }

    #[test]
    fn test_failed_build_is_terminal() {
        let index = LazyIndex::<u32>::new();
        let err = index
            .get_or_build("test", || Err(ListError::rejected("test", "boom")))
            .unwrap_err();
        assert!(matches!(err, ListError::ConfigurationRejected { .. }));

        let err = index.get_or_build("test", || Ok(1)).unwrap_err();
        assert!(matches!(err, ListError::IndexBuildFailed { ref message, .. } if message.contains("boom")));
        assert!(!index.is_ready());
    }

    #[test]
    fn test_panicking_build_fails_index() {
        let index = Arc::new(LazyIndex::<u32>::new());
        let cloned = Arc::clone(&index);
        let joined = thread::spawn(move || {
            let _ = cloned.get_or_build("test", || panic!("build exploded"));
        })
        .join();
        assert!(joined.is_err());

        let err = index.get_or_build("test", || Ok(1)).unwrap_err();
        assert!(matches!(err, ListError::IndexBuildFailed { .. }));
    }

    #[test]
    fn test_rebuild_only_once_per_stale_observation() {
        let index = LazyIndex::<u32>::new();
        let first = index.get_or_build("test", || Ok(1)).unwrap();

        let second = index.rebuild_if_current("test", &first, || Ok(2)).unwrap();
        assert_eq!(*second, 2);

        // a caller still holding the old Arc gets the replacement, no rebuild
        let third = index
            .rebuild_if_current("test", &first, || panic!("must not rebuild"))
            .unwrap();
        assert!(Arc::ptr_eq(&second, &third));
    }
}
