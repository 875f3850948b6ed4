use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::stream::InterceptedStream;

/// Opaque identifier correlating one viewer navigation with one parked stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
    /// Mints an unguessable key for a new interception.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StreamKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StreamKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("stream key {0} is already registered")]
    DuplicateKey(StreamKey),
    #[error("no pending stream for key {0}")]
    NotFound(StreamKey),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Process-wide parking lot for intercepted streams.
///
/// Shared between the context that produces responses and the context that
/// starts viewers. Every operation runs inside one critical section and only
/// owned streams ever leave it. Presence of a key means "not yet claimed".
#[derive(Clone, Default)]
pub struct StreamRegistry {
    streams: Arc<Mutex<HashMap<StreamKey, InterceptedStream>>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: StreamKey, stream: InterceptedStream) -> RegistryResult<()> {
        let mut guard = self.streams.lock();
        match guard.entry(key) {
            Entry::Occupied(entry) => {
                let key = entry.key().clone();
                error!(stream_key = %key, "refusing to overwrite pending stream");
                Err(RegistryError::DuplicateKey(key))
            }
            Entry::Vacant(entry) => {
                debug!(
                    stream_key = %entry.key(),
                    mime_type = %stream.mime_type,
                    original_url = %stream.original_url,
                    "stream parked"
                );
                entry.insert(stream);
                Ok(())
            }
        }
    }

    /// Mints a key, parks `stream` under it and returns the key.
    pub fn register(&self, stream: InterceptedStream) -> StreamKey {
        let mut guard = self.streams.lock();
        let mut key = StreamKey::mint();
        while guard.contains_key(&key) {
            key = StreamKey::mint();
        }
        debug!(
            stream_key = %key,
            mime_type = %stream.mime_type,
            original_url = %stream.original_url,
            "stream parked"
        );
        guard.insert(key.clone(), stream);
        key
    }

    /// Removes the stream parked under `key` and hands ownership to the caller.
    pub fn release(&self, key: &StreamKey) -> RegistryResult<InterceptedStream> {
        let released = self.streams.lock().remove(key);
        match released {
            Some(stream) => {
                debug!(stream_key = %key, "stream released");
                Ok(stream)
            }
            None => {
                warn!(stream_key = %key, "release of unknown or already claimed stream");
                Err(RegistryError::NotFound(key.clone()))
            }
        }
    }

    /// Number of streams that were parked and never claimed yet.
    pub fn pending(&self) -> usize {
        self.streams.lock().len()
    }
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("pending", &self.pending())
            .finish()
    }
}
