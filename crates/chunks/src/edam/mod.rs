//! Evernote EDAM adapter
//!
//! Thrift binary codec, field-name tables, and the HTTP client that
//! implements [`ChangelogService`](crate::remote::ChangelogService) against
//! the Evernote NoteStore.

mod client;
pub mod protocol;
mod record;
pub mod schema;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::remote::RemoteError;
use protocol::Wire;

pub use client::{
    EDAM_VERSION_MAJOR, EDAM_VERSION_MINOR, EdamClient, RATE_LIMIT_REACHED, error_code_name,
};
pub use record::Record;

/// Account-wide sync state (EDAM `SyncState`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteState {
    /// Highest USN assigned in the account; the latest changelog version
    pub update_count: i32,
    pub current_time: DateTime<Utc>,
    /// Clients that last synced before this time must do a full sync
    pub full_sync_before: DateTime<Utc>,
    pub uploaded: Option<i64>,
}

impl RemoteState {
    pub(crate) fn from_wire(wire: &Wire) -> Result<Self, RemoteError> {
        let millis = |id: i16, name: &str| -> Result<DateTime<Utc>, RemoteError> {
            let ms = wire
                .field(id)
                .and_then(Wire::as_i64)
                .ok_or_else(|| RemoteError::Protocol(format!("SyncState missing {}", name)))?;
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| RemoteError::Protocol(format!("SyncState {} out of range: {}", name, ms)))
        };

        Ok(Self {
            update_count: wire
                .field(3)
                .and_then(Wire::as_i32)
                .ok_or_else(|| RemoteError::Protocol("SyncState missing updateCount".into()))?,
            current_time: millis(1, "currentTime")?,
            full_sync_before: millis(2, "fullSyncBefore")?,
            uploaded: wire.field(4).and_then(Wire::as_i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_state_from_wire() {
        let wire = Wire::Struct(vec![
            (1, Wire::I64(1_700_000_000_123)),
            (2, Wire::I64(0)),
            (3, Wire::I32(3555)),
        ]);
        let state = RemoteState::from_wire(&wire).unwrap();
        assert_eq!(state.update_count, 3555);
        assert_eq!(state.current_time.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(state.full_sync_before.timestamp(), 0);
        assert_eq!(state.uploaded, None);
    }

    #[test]
    fn test_remote_state_requires_update_count() {
        let wire = Wire::Struct(vec![(1, Wire::I64(0)), (2, Wire::I64(0))]);
        let err = RemoteState::from_wire(&wire).unwrap_err();
        assert!(err.to_string().contains("updateCount"));
    }
}
