//! Remote changelog capability
//!
//! The sync pipeline only talks to the remote store through
//! [`ChangelogService`]. The EDAM client in [`crate::edam`] is the production
//! implementation; tests script their own.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::flatten::Flattenable;

/// Which sub-entities a sync chunk should carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncFilter {
    pub include_notes: bool,
    pub include_note_resources: bool,
    pub include_note_attributes: bool,
    pub include_notebooks: bool,
    pub include_tags: bool,
    pub include_searches: bool,
    pub include_resources: bool,
    pub include_linked_notebooks: bool,
    pub include_expunged: bool,
    pub include_note_application_data_full_map: bool,
    pub include_resource_application_data_full_map: bool,
    pub include_note_resource_application_data_full_map: bool,
}

impl Default for SyncFilter {
    fn default() -> Self {
        Self {
            include_notes: true,
            include_note_resources: true,
            include_note_attributes: true,
            include_notebooks: true,
            include_tags: true,
            include_searches: true,
            include_resources: true,
            include_linked_notebooks: true,
            include_expunged: false,
            include_note_application_data_full_map: true,
            include_resource_application_data_full_map: true,
            include_note_resource_application_data_full_map: true,
        }
    }
}

/// Failures reported by the remote store
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transient: the identical request may be retried after the wait
    #[error("Rate limit reached, retry in {wait_seconds} seconds")]
    RateLimited { wait_seconds: u32 },

    #[error("User error {code} ({name}) on parameter {parameter:?}")]
    User {
        code: i32,
        name: &'static str,
        parameter: Option<String>,
    },

    #[error("System error {code} ({name}): {message:?}")]
    System {
        code: i32,
        name: &'static str,
        message: Option<String>,
    },

    #[error("Not found: {identifier:?} = {key:?}")]
    NotFound {
        identifier: Option<String>,
        key: Option<String>,
    },

    #[error("Client API version rejected by the service")]
    VersionRejected,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Protocol failure: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// The mandated wait when this is a rate-limit signal
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited { wait_seconds } => {
                Some(Duration::from_secs(u64::from(*wait_seconds)))
            }
            _ => None,
        }
    }
}

/// A versioned record store exposing a changelog API
pub trait ChangelogService {
    type Chunk: Flattenable;

    /// The latest version currently known to the service
    fn latest_version(&self) -> Result<i32, RemoteError>;

    /// The chunk for version `since`: changes from that version on, up to
    /// `max_entries` entries
    fn get_chunk(
        &self,
        since: i32,
        max_entries: i32,
        filter: &SyncFilter,
    ) -> Result<Self::Chunk, RemoteError>;
}
