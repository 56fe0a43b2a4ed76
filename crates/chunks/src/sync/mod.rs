//! Sync engine for fetching and archiving changelog chunks
//!
//! A run resumes after the highest persisted version and stops at the
//! latest version the service reported when the run started. Every chunk
//! is persisted before the next one is requested, so a halted run can
//! always be resumed by running again.

mod cursor;
mod driver;
mod fetch;
mod timing;

use anyhow::Result;
use log::debug;

use crate::remote::ChangelogService;
use crate::storage::ChunkStore;

pub use cursor::{Backfill, Plan, VersionCursor, percent_complete, resume_point};
pub use driver::{Outcome, Progress, SyncDriver, SyncError};
pub use fetch::{ChunkFetcher, MAX_ENTRIES};
pub use timing::{DEFAULT_PACING, RATE_LIMIT_MARGIN, Sleeper, ThreadSleeper, rate_limit_delay};

/// Decide what a run should do
///
/// Reads the latest remote version once and compares it with the highest
/// version already in the archive (or `floor` when the archive is empty).
///
/// # Arguments
/// * `service` - Remote changelog
/// * `store` - Local archive
/// * `floor` - Resume point used when nothing is persisted yet
pub fn determine_plan<R>(service: &R, store: &dyn ChunkStore, floor: i32) -> Result<Plan>
where
    R: ChangelogService + ?Sized,
{
    let latest = service.latest_version()?;
    let highest = resume_point(store.persisted_versions()?, floor);
    let plan = VersionCursor::compute(latest, highest);
    debug!("Latest remote version {}, highest persisted {}: {:?}", latest, highest, plan);
    Ok(plan)
}

/// Versions missing from the archive, from its highest version down to `down_to`
pub fn plan_backfill(store: &dyn ChunkStore, down_to: i32) -> Result<Backfill> {
    let backfill = Backfill::compute(store.persisted_versions()?, down_to);
    debug!(
        "Backfill below {} down to {}: {} missing",
        backfill.ceiling(),
        down_to,
        backfill.len()
    );
    Ok(backfill)
}
