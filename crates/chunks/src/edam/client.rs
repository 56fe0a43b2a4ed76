//! EDAM HTTP client
//!
//! Speaks Thrift binary protocol over HTTPS to the Evernote UserStore and
//! NoteStore. Uses synchronous HTTP (ureq) to be executor-agnostic.

use log::debug;
use std::sync::atomic::{AtomicI32, Ordering};

use super::RemoteState;
use super::protocol::{self, MessageHeader, MessageType, Wire};
use super::record::Record;
use super::schema::{NOTEBOOK, SYNC_CHUNK};
use crate::remote::{ChangelogService, RemoteError, SyncFilter};

/// EDAM protocol version this client speaks
pub const EDAM_VERSION_MAJOR: i16 = 1;
pub const EDAM_VERSION_MINOR: i16 = 28;

/// EDAMErrorCode.RATE_LIMIT_REACHED
pub const RATE_LIMIT_REACHED: i32 = 19;

/// Cap on a single response body
const MAX_RESPONSE_BYTES: u64 = 512 * 1024 * 1024;

const USER_AGENT: &str = concat!("archivist/", env!("CARGO_PKG_VERSION"));

/// Name of an EDAMErrorCode value
pub fn error_code_name(code: i32) -> &'static str {
    match code {
        1 => "UNKNOWN",
        2 => "BAD_DATA_FORMAT",
        3 => "PERMISSION_DENIED",
        4 => "INTERNAL_ERROR",
        5 => "DATA_REQUIRED",
        6 => "LIMIT_REACHED",
        7 => "QUOTA_REACHED",
        8 => "INVALID_AUTH",
        9 => "AUTH_EXPIRED",
        10 => "DATA_CONFLICT",
        11 => "ENML_VALIDATION",
        12 => "SHARD_UNAVAILABLE",
        13 => "LEN_TOO_SHORT",
        14 => "LEN_TOO_LONG",
        15 => "TOO_FEW",
        16 => "TOO_MANY",
        17 => "UNSUPPORTED_OPERATION",
        18 => "TAKEN_DOWN",
        19 => "RATE_LIMIT_REACHED",
        _ => "UNRECOGNIZED",
    }
}

/// Evernote NoteStore client
///
/// Holds the developer token and the NoteStore URL resolved at connect
/// time. Each call is an independent HTTP POST.
pub struct EdamClient {
    auth_token: String,
    note_store_url: String,
    seq_id: AtomicI32,
}

impl EdamClient {
    const PRODUCTION_HOST: &'static str = "www.evernote.com";
    const SANDBOX_HOST: &'static str = "sandbox.evernote.com";
    const CLIENT_NAME: &'static str = "Archivist (Rust)";

    /// Connect through the UserStore
    ///
    /// Confirms the service accepts this client's EDAM version, then asks
    /// for the NoteStore URL of the token's account.
    pub fn connect(auth_token: impl Into<String>, sandbox: bool) -> Result<Self, RemoteError> {
        let auth_token = auth_token.into();
        let host = if sandbox {
            Self::SANDBOX_HOST
        } else {
            Self::PRODUCTION_HOST
        };
        let user_store_url = format!("https://{}/edam/user", host);
        let client = Self::with_note_store_url(auth_token, String::new());

        debug!(
            "Confirming client version... ( {}.{} )",
            EDAM_VERSION_MAJOR, EDAM_VERSION_MINOR
        );
        let accepted = client.call(
            &user_store_url,
            "checkVersion",
            vec![
                (1, Wire::string(Self::CLIENT_NAME)),
                (2, Wire::I16(EDAM_VERSION_MAJOR)),
                (3, Wire::I16(EDAM_VERSION_MINOR)),
            ],
        )?;
        if accepted.as_bool() != Some(true) {
            return Err(RemoteError::VersionRejected);
        }

        let url = client.call(
            &user_store_url,
            "getNoteStoreUrl",
            vec![(1, Wire::string(client.auth_token.clone()))],
        )?;
        let note_store_url = url
            .as_string()
            .ok_or_else(|| RemoteError::Protocol("getNoteStoreUrl returned a non-string".into()))?;
        debug!("NoteStore URL: {}", note_store_url);

        Ok(Self {
            note_store_url,
            ..client
        })
    }

    /// Build a client for a known NoteStore URL, skipping the UserStore
    pub fn with_note_store_url(auth_token: impl Into<String>, note_store_url: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            note_store_url: note_store_url.into(),
            seq_id: AtomicI32::new(0),
        }
    }

    /// NoteStore URL in use
    pub fn note_store_url(&self) -> &str {
        &self.note_store_url
    }

    /// NoteStore.getSyncState
    pub fn sync_state(&self) -> Result<RemoteState, RemoteError> {
        let wire = self.note_store_call("getSyncState", vec![(1, self.token_arg())])?;
        RemoteState::from_wire(&wire)
    }

    /// NoteStore.getFilteredSyncChunk
    ///
    /// # Arguments
    /// * `after_usn` - Return changes with a USN above this one
    /// * `max_entries` - Upper bound on entries in the chunk
    /// * `filter` - Which entity kinds to include
    pub fn get_filtered_sync_chunk(
        &self,
        after_usn: i32,
        max_entries: i32,
        filter: &SyncFilter,
    ) -> Result<Record, RemoteError> {
        let wire = self.note_store_call(
            "getFilteredSyncChunk",
            vec![
                (1, self.token_arg()),
                (2, Wire::I32(after_usn)),
                (3, Wire::I32(max_entries)),
                (4, filter_to_wire(filter)),
            ],
        )?;
        Ok(Record::from_wire(wire, Some(&SYNC_CHUNK)))
    }

    /// NoteStore.listNotebooks
    pub fn list_notebooks(&self) -> Result<Record, RemoteError> {
        let wire = self.note_store_call("listNotebooks", vec![(1, self.token_arg())])?;
        Ok(Record::from_wire(wire, Some(&NOTEBOOK)))
    }

    fn token_arg(&self) -> Wire {
        Wire::string(self.auth_token.clone())
    }

    fn note_store_call(&self, method: &str, args: Vec<(i16, Wire)>) -> Result<Wire, RemoteError> {
        if self.note_store_url.is_empty() {
            return Err(RemoteError::Transport("NoteStore URL not resolved".into()));
        }
        self.call(&self.note_store_url, method, args)
    }

    /// Send one call and return the success value of its reply
    fn call(&self, url: &str, method: &str, args: Vec<(i16, Wire)>) -> Result<Wire, RemoteError> {
        let seq_id = self.seq_id.fetch_add(1, Ordering::Relaxed) + 1;
        let header = MessageHeader {
            name: method.to_string(),
            kind: MessageType::Call,
            seq_id,
        };
        let body = protocol::encode_message(&header, &args);

        debug!("EDAM call {} (seq {})", method, seq_id);
        let reply = post_thrift(url, &body)?;
        interpret_reply(method, seq_id, &reply)
    }
}

impl ChangelogService for EdamClient {
    type Chunk = Record;

    fn latest_version(&self) -> Result<i32, RemoteError> {
        Ok(self.sync_state()?.update_count)
    }

    fn get_chunk(
        &self,
        since: i32,
        max_entries: i32,
        filter: &SyncFilter,
    ) -> Result<Record, RemoteError> {
        self.get_filtered_sync_chunk(after_usn(since), max_entries, filter)
    }
}

/// `afterUSN` that makes a chunk start at `version`
///
/// The NoteStore returns changes with a USN strictly above `afterUSN`.
pub(crate) fn after_usn(version: i32) -> i32 {
    version.saturating_sub(1)
}

fn post_thrift(url: &str, body: &[u8]) -> Result<Vec<u8>, RemoteError> {
    let mut response = ureq::post(url)
        .header("Content-Type", "application/x-thrift")
        .header("Accept", "application/x-thrift")
        .header("User-Agent", USER_AGENT)
        .send(body)
        .map_err(|e| RemoteError::Transport(format!("POST {} failed: {}", url, e)))?;

    response
        .body_mut()
        .with_config()
        .limit(MAX_RESPONSE_BYTES)
        .read_to_vec()
        .map_err(|e| RemoteError::Transport(format!("Failed to read response from {}: {}", url, e)))
}

/// Serialize a filter as an EDAM SyncChunkFilter struct
pub(crate) fn filter_to_wire(filter: &SyncFilter) -> Wire {
    Wire::Struct(vec![
        (1, Wire::Bool(filter.include_notes)),
        (2, Wire::Bool(filter.include_note_resources)),
        (3, Wire::Bool(filter.include_note_attributes)),
        (4, Wire::Bool(filter.include_notebooks)),
        (5, Wire::Bool(filter.include_tags)),
        (6, Wire::Bool(filter.include_searches)),
        (7, Wire::Bool(filter.include_resources)),
        (8, Wire::Bool(filter.include_linked_notebooks)),
        (9, Wire::Bool(filter.include_expunged)),
        (10, Wire::Bool(filter.include_note_application_data_full_map)),
        (12, Wire::Bool(filter.include_resource_application_data_full_map)),
        (13, Wire::Bool(filter.include_note_resource_application_data_full_map)),
    ])
}

/// Decode a reply and map declared exceptions to [`RemoteError`]
///
/// The result struct carries the return value in field 0 and the declared
/// exceptions in fields 1 (user), 2 (system) and 3 (not found).
pub(crate) fn interpret_reply(method: &str, seq_id: i32, bytes: &[u8]) -> Result<Wire, RemoteError> {
    let (header, body) =
        protocol::decode_message(bytes).map_err(|e| RemoteError::Protocol(e.to_string()))?;

    if header.seq_id != seq_id || header.name != method {
        return Err(RemoteError::Protocol(format!(
            "Reply {} (seq {}) does not match call {} (seq {})",
            header.name, header.seq_id, method, seq_id
        )));
    }

    if header.kind == MessageType::Exception {
        let message = body.field(1).and_then(Wire::as_string);
        let kind = body.field(2).and_then(Wire::as_i32).unwrap_or(0);
        return Err(RemoteError::Protocol(format!(
            "{} raised application exception {}: {}",
            method,
            kind,
            message.unwrap_or_default()
        )));
    }

    let fields = protocol::expect_struct(body).map_err(|e| RemoteError::Protocol(e.to_string()))?;
    let Some((id, value)) = fields.into_iter().next() else {
        return Err(RemoteError::Protocol(format!("{} returned an empty result", method)));
    };

    match id {
        0 => Ok(value),
        1 => {
            let code = value.field(1).and_then(Wire::as_i32).unwrap_or(0);
            Err(RemoteError::User {
                code,
                name: error_code_name(code),
                parameter: value.field(2).and_then(Wire::as_string),
            })
        }
        2 => {
            let code = value.field(1).and_then(Wire::as_i32).unwrap_or(0);
            if code == RATE_LIMIT_REACHED {
                let wait = value.field(3).and_then(Wire::as_i32).unwrap_or(0);
                return Err(RemoteError::RateLimited {
                    wait_seconds: u32::try_from(wait).unwrap_or(0),
                });
            }
            Err(RemoteError::System {
                code,
                name: error_code_name(code),
                message: value.field(2).and_then(Wire::as_string),
            })
        }
        3 => Err(RemoteError::NotFound {
            identifier: value.field(1).and_then(Wire::as_string),
            key: value.field(2).and_then(Wire::as_string),
        }),
        other => Err(RemoteError::Protocol(format!(
            "{} returned unexpected result field {} ({:?})",
            method,
            other,
            value.ttype()
        ))),
    }
}
