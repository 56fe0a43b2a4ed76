//! Chunk archive
//!
//! One artifact per version, written atomically so that an interrupted run
//! never leaves a partial chunk behind. The set of artifacts present is the
//! only record of sync progress.

mod file;
mod memory;
mod traits;

pub use file::FileChunkStore;
pub use memory::InMemoryChunkStore;
pub use traits::ChunkStore;
