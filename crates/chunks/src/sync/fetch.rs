//! Chunk retrieval with rate-limit retry

use log::info;

use super::timing::{Sleeper, rate_limit_delay};
use crate::remote::{ChangelogService, RemoteError, SyncFilter};

/// Page size passed to the service: everything it has for the version
pub const MAX_ENTRIES: i32 = i32::MAX;

/// Fetches one version's chunk at a time
///
/// A rate-limit signal is never surfaced: the fetcher sleeps for the
/// mandated wait plus a one second margin and issues the identical request
/// again, as many times as the service asks. Every other error is returned
/// unchanged on the first occurrence.
pub struct ChunkFetcher<'a, R: ?Sized, S> {
    service: &'a R,
    filter: SyncFilter,
    sleeper: S,
}

impl<'a, R, S> ChunkFetcher<'a, R, S>
where
    R: ChangelogService + ?Sized,
    S: Sleeper,
{
    /// Create a fetcher over a remote service
    pub fn new(service: &'a R, filter: SyncFilter, sleeper: S) -> Self {
        Self {
            service,
            filter,
            sleeper,
        }
    }

    /// Fetch the chunk for `version`
    pub fn fetch(&self, version: i32) -> Result<R::Chunk, RemoteError> {
        loop {
            match self.service.get_chunk(version, MAX_ENTRIES, &self.filter) {
                Err(err) => match err.rate_limit_wait() {
                    Some(mandated) => {
                        let delay = rate_limit_delay(mandated);
                        info!(
                            "Rate limit reached for version {}: retrying in {} seconds",
                            version,
                            delay.as_secs()
                        );
                        self.sleeper.sleep(delay);
                    }
                    None => return Err(err),
                },
                ok => return ok,
            }
        }
    }

    /// The sleeper used for mandated waits
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}
