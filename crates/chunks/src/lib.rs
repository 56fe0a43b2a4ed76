//! Chunks crate - Incremental archiving of a remote changelog
//!
//! This crate provides the archiving pipeline, independent of any front end:
//! - Version cursor that resumes after the highest archived version
//! - Chunk fetcher that waits out rate limits and retries
//! - Record flattening into JSON-ready values, with a text/binary heuristic
//! - Atomic per-version artifact storage
//! - Evernote EDAM client (Thrift over HTTPS) as the remote changelog

pub mod config;
pub mod edam;
pub mod flatten;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod value;

pub use config::SyncConfig;
pub use edam::{EdamClient, Record, RemoteState};
pub use flatten::{Flattenable, flatten};
pub use remote::{ChangelogService, RemoteError, SyncFilter};
pub use storage::{ChunkStore, FileChunkStore, InMemoryChunkStore};
pub use sync::{
    // Planning
    Backfill, Plan, VersionCursor, determine_plan, percent_complete, plan_backfill, resume_point,
    // Execution
    ChunkFetcher, Outcome, Progress, SyncDriver, SyncError,
    // Timing
    Sleeper, ThreadSleeper,
};
pub use value::{Number, Value};
