//! Sequential sync loop
//!
//! For every version in the cursor: fetch, flatten, persist, pace. Nothing
//! runs concurrently: the remote rate limit applies to the whole client and
//! artifacts are ordered by version, so parallelism would buy nothing.

use log::{debug, error, info};
use std::time::Duration;

use super::cursor::{Backfill, VersionCursor, percent_complete};
use super::fetch::ChunkFetcher;
use super::timing::Sleeper;
use crate::flatten::flatten;
use crate::remote::{ChangelogService, RemoteError};
use crate::storage::ChunkStore;

/// Progress report emitted before each version is fetched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub version: i32,
    pub target: i32,
    pub percent: f64,
}

/// Why a run stopped early
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to fetch version {version}")]
    Remote {
        version: i32,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to persist version {version}")]
    Persist {
        version: i32,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// The version that was in flight when the run stopped
    pub fn version(&self) -> i32 {
        match self {
            SyncError::Remote { version, .. } | SyncError::Persist { version, .. } => *version,
        }
    }
}

/// Terminal state of a run
#[derive(Debug)]
pub enum Outcome {
    /// Every version was persisted; `last_version` is the last one written
    Done { last_version: i32, synced: usize },
    /// A fatal error stopped the run; `last_good` is the safe resume point
    Halted { last_good: i32, cause: SyncError },
}

impl Outcome {
    /// Highest version known to be persisted after the run
    pub fn last_persisted(&self) -> i32 {
        match self {
            Outcome::Done { last_version, .. } => *last_version,
            Outcome::Halted { last_good, .. } => *last_good,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done { .. })
    }
}

/// Drives fetch, flatten and persist over a set of versions
pub struct SyncDriver<'a, R: ?Sized, S> {
    fetcher: ChunkFetcher<'a, R, S>,
    store: &'a dyn ChunkStore,
    pacing: Duration,
}

impl<'a, R, S> SyncDriver<'a, R, S>
where
    R: ChangelogService + ?Sized,
    S: Sleeper,
{
    /// Create a driver
    ///
    /// # Arguments
    /// * `fetcher` - Chunk fetcher; its sleeper is also used for pacing
    /// * `store` - Archive receiving each flattened chunk
    /// * `pacing` - Pause between consecutive versions
    pub fn new(fetcher: ChunkFetcher<'a, R, S>, store: &'a dyn ChunkStore, pacing: Duration) -> Self {
        Self {
            fetcher,
            store,
            pacing,
        }
    }

    /// Sync every version in `cursor`
    ///
    /// `on_progress` is called once per version before it is fetched.
    pub fn run<F>(&self, cursor: VersionCursor, on_progress: F) -> Outcome
    where
        F: FnMut(&Progress),
    {
        let target = cursor.target();
        info!(
            "Syncing {} versions ({}..={})",
            cursor.len(),
            cursor.resume_from() + 1,
            target
        );

        let outcome = self.drive(
            cursor.resume_from(),
            cursor,
            |version, _| Progress {
                version,
                target,
                percent: percent_complete(version, target),
            },
            on_progress,
        );
        if let Outcome::Done { last_version, synced } = &outcome {
            info!("Sync complete at version {} ({} versions)", last_version, synced);
        }
        outcome
    }

    /// Fetch the versions missing below the archive's highest version
    ///
    /// Versions are visited newest first. On a halt, `last_good` is the most
    /// recently persisted version (or the ceiling if none was).
    pub fn run_backfill<F>(&self, backfill: Backfill, on_progress: F) -> Outcome
    where
        F: FnMut(&Progress),
    {
        let ceiling = backfill.ceiling();
        let total = backfill.len();
        info!("Backfilling {} versions below {}", total, ceiling);

        let outcome = self.drive(
            ceiling,
            backfill,
            |version, position| Progress {
                version,
                target: ceiling,
                percent: position as f64 / total as f64 * 100.0,
            },
            on_progress,
        );
        if let Outcome::Done { synced, .. } = &outcome {
            info!("Backfill complete ({} versions)", synced);
        }
        outcome
    }

    /// Fetch, flatten and persist each version in order
    ///
    /// `progress_of` receives the version and its 1-based position.
    fn drive<I, P, F>(&self, mut last_good: i32, versions: I, progress_of: P, mut on_progress: F) -> Outcome
    where
        I: IntoIterator<Item = i32>,
        P: Fn(i32, usize) -> Progress,
        F: FnMut(&Progress),
    {
        let mut synced = 0;
        let mut versions = versions.into_iter().peekable();
        let mut position = 0;

        while let Some(version) = versions.next() {
            position += 1;
            let progress = progress_of(version, position);
            info!("Fetching version {} ({:.2}%)", version, progress.percent);
            on_progress(&progress);

            let chunk = match self.fetcher.fetch(version) {
                Ok(chunk) => chunk,
                Err(source) => {
                    error!("Halting at version {}: {}", version, source);
                    return Outcome::Halted {
                        last_good,
                        cause: SyncError::Remote { version, source },
                    };
                }
            };

            let value = flatten(&chunk);
            drop(chunk);

            if let Err(source) = self.store.persist(version, &value) {
                error!("Halting at version {}: {:#}", version, source);
                return Outcome::Halted {
                    last_good,
                    cause: SyncError::Persist { version, source },
                };
            }
            last_good = version;
            synced += 1;

            if let Some(next) = versions.peek() {
                debug!("Pacing {} ms before version {}", self.pacing.as_millis(), next);
                self.fetcher.sleeper().sleep(self.pacing);
            }
        }

        Outcome::Done {
            last_version: last_good,
            synced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::SyncFilter;
    use crate::storage::InMemoryChunkStore;
    use crate::sync::cursor::Plan;
    use crate::value::Value;
    use std::cell::RefCell;

    /// Returns the version number as the chunk, failing on request
    struct Versions {
        fail_on: Option<i32>,
        calls: RefCell<Vec<i32>>,
    }

    impl ChangelogService for Versions {
        type Chunk = i32;

        fn latest_version(&self) -> Result<i32, RemoteError> {
            Ok(0)
        }

        fn get_chunk(&self, since: i32, _max: i32, _filter: &SyncFilter) -> Result<i32, RemoteError> {
            self.calls.borrow_mut().push(since);
            if self.fail_on == Some(since) {
                return Err(RemoteError::Transport("connection reset".into()));
            }
            Ok(since)
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Duration>>);

    impl Sleeper for Recorder {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    fn cursor(latest: i32, highest: i32) -> VersionCursor {
        match VersionCursor::compute(latest, highest) {
            Plan::Sync(cursor) => cursor,
            Plan::UpToDate { .. } => panic!("expected a sync plan"),
        }
    }

    #[test]
    fn test_run_to_completion() {
        let service = Versions { fail_on: None, calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::new();
        let recorder = Recorder::default();
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), &recorder);
        let driver = SyncDriver::new(fetcher, &store, Duration::from_millis(1010));

        let mut seen = Vec::new();
        let outcome = driver.run(cursor(13, 10), |p| seen.push(p.version));

        assert!(matches!(outcome, Outcome::Done { last_version: 13, synced: 3 }));
        assert_eq!(seen, vec![11, 12, 13]);
        assert_eq!(*service.calls.borrow(), vec![11, 12, 13]);
        assert_eq!(store.persisted_versions().unwrap(), vec![11, 12, 13]);
        assert_eq!(store.load(12).unwrap(), Some(serde_json::json!(12)));
        // Pacing between versions, none after the last one
        assert_eq!(*recorder.0.borrow(), vec![Duration::from_millis(1010); 2]);
    }

    #[test]
    fn test_progress_percent() {
        let service = Versions { fail_on: None, calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::new();
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), Recorder::default());
        let driver = SyncDriver::new(fetcher, &store, Duration::ZERO);

        let mut reports = Vec::new();
        driver.run(cursor(4, 2), |p| reports.push(*p));

        assert_eq!(reports[0], Progress { version: 3, target: 4, percent: 75.0 });
        assert_eq!(reports[1].percent, 100.0);
    }

    #[test]
    fn test_remote_failure_halts_at_last_good() {
        let service = Versions { fail_on: Some(12), calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::new();
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), Recorder::default());
        let driver = SyncDriver::new(fetcher, &store, Duration::ZERO);

        let outcome = driver.run(cursor(14, 10), |_| {});

        match outcome {
            Outcome::Halted { last_good, cause } => {
                assert_eq!(last_good, 11);
                assert_eq!(cause.version(), 12);
                assert!(matches!(cause, SyncError::Remote { source: RemoteError::Transport(_), .. }));
            }
            other => panic!("expected halt, got {:?}", other),
        }
        assert_eq!(store.persisted_versions().unwrap(), vec![11]);
        assert_eq!(*service.calls.borrow(), vec![11, 12]);
    }

    #[test]
    fn test_failure_on_first_version_reports_resume_point() {
        let service = Versions { fail_on: Some(6), calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::new();
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), Recorder::default());
        let driver = SyncDriver::new(fetcher, &store, Duration::ZERO);

        let outcome = driver.run(cursor(8, 5), |_| {});
        assert_eq!(outcome.last_persisted(), 5);
        assert!(!outcome.is_done());
    }

    #[test]
    fn test_backfill_newest_first() {
        let service = Versions { fail_on: None, calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::with_versions([3, 5]);
        let recorder = Recorder::default();
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), &recorder);
        let driver = SyncDriver::new(fetcher, &store, Duration::from_secs(1));

        let backfill = Backfill::compute(store.persisted_versions().unwrap(), 1);
        let mut reports = Vec::new();
        let outcome = driver.run_backfill(backfill, |p| reports.push(*p));

        assert!(matches!(outcome, Outcome::Done { last_version: 1, synced: 3 }));
        assert_eq!(*service.calls.borrow(), vec![4, 2, 1]);
        assert_eq!(store.persisted_versions().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(reports.last().map(|p| p.percent), Some(100.0));
        assert_eq!(reports[0].target, 5);
        assert_eq!(recorder.0.borrow().len(), 2);
    }

    #[test]
    fn test_backfill_halt_reports_last_written() {
        let service = Versions { fail_on: Some(2), calls: RefCell::new(Vec::new()) };
        let store = InMemoryChunkStore::with_versions([5]);
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), Recorder::default());
        let driver = SyncDriver::new(fetcher, &store, Duration::ZERO);

        let outcome = driver.run_backfill(Backfill::compute([5], 1), |_| {});
        assert_eq!(outcome.last_persisted(), 3);
        assert_eq!(store.persisted_versions().unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn test_persist_failure_halts() {
        struct Refusing;
        impl ChunkStore for Refusing {
            fn persisted_versions(&self) -> anyhow::Result<Vec<i32>> {
                Ok(Vec::new())
            }
            fn persist(&self, _version: i32, _value: &Value) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
            fn load(&self, _version: i32) -> anyhow::Result<Option<serde_json::Value>> {
                Ok(None)
            }
        }

        let service = Versions { fail_on: None, calls: RefCell::new(Vec::new()) };
        let fetcher = ChunkFetcher::new(&service, SyncFilter::default(), Recorder::default());
        let driver = SyncDriver::new(fetcher, &Refusing, Duration::ZERO);

        let outcome = driver.run(cursor(3, 0), |_| {});
        match outcome {
            Outcome::Halted { last_good: 0, cause: SyncError::Persist { version: 1, source } } => {
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("expected persist halt, got {:?}", other),
        }
        // Nothing after the failing version was requested
        assert_eq!(*service.calls.borrow(), vec![1]);
    }
}
