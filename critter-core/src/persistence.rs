//! Binary snapshot of the whole agent.
//!
//! ```text
//! u32 step_count
//! u32 last_update_time      (low 32 bits of the millisecond clock)
//! u32 payload_len
//! payload:
//!   InternalState | EmotionSystem | LearningSystem | BalanceManager | MemorySystem
//! ```
//!
//! All integers and floats are little-endian. Subsystem blobs are written
//! into one capacity-bounded [`StagingBuffer`]; if any blob does not fit the
//! whole save is aborted. Decoding builds every subsystem afresh and only
//! hands them back once all five decoded cleanly, so a failed load never
//! leaves partially restored state behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::balance::{self, BalanceManager};
use crate::codec::{ByteReader, StagingBuffer};
use crate::config::CritterConfig;
use crate::embedding::TextEmbedder;
use crate::emotion::{self, EmotionEngine};
use crate::error::{CritterError, Result};
use crate::learning::{self, LearningSystem};
use crate::memory::{self, MemoryStore};
use crate::state::{self, InternalStateModel};

/// Size of the metadata header that precedes the payload.
pub const HEADER_LEN: usize = 12;

const HEADER: &str = "SnapshotHeader";

/// Counters stored ahead of the subsystem payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotHeader {
    /// Ticks run so far.
    pub step_count: u32,
    /// Wire timestamp of the last tick.
    pub last_update_time: u32,
}

/// Borrowed view of everything a snapshot contains.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotParts<'a> {
    /// Header counters.
    pub header: SnapshotHeader,
    /// Homeostatic state.
    pub state: &'a InternalStateModel,
    /// Emotion catalog.
    pub emotion: &'a EmotionEngine,
    /// Skills and experience.
    pub learning: &'a LearningSystem,
    /// Exploration balance.
    pub balance: &'a BalanceManager,
    /// Episodic memory.
    pub memory: &'a MemoryStore,
}

/// Owned subsystems produced by a successful decode.
#[derive(Debug)]
pub struct RestoredParts {
    /// Header counters.
    pub header: SnapshotHeader,
    /// Homeostatic state.
    pub state: InternalStateModel,
    /// Emotion catalog.
    pub emotion: EmotionEngine,
    /// Skills and experience.
    pub learning: LearningSystem,
    /// Exploration balance.
    pub balance: BalanceManager,
    /// Episodic memory.
    pub memory: MemoryStore,
}

/// What [`read_snapshot`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No snapshot file: a first run, defaults stay in place.
    FirstRun,
    /// A snapshot was decoded and applied.
    Restored {
        /// Step count read from the header.
        step_count: u32,
        /// Payload bytes decoded.
        payload_len: usize,
    },
}

/// Encode a full snapshot.
///
/// `staging_capacity` bounds the header plus payload.
///
/// # Errors
/// [`CritterError::BufferTooSmall`] naming the first subsystem that did not fit.
pub fn encode_snapshot(parts: &SnapshotParts<'_>, staging_capacity: usize) -> Result<Vec<u8>> {
    let payload_capacity = staging_capacity.checked_sub(HEADER_LEN).ok_or(CritterError::BufferTooSmall {
        subsystem: HEADER,
        required: HEADER_LEN,
        available: staging_capacity,
    })?;
    let mut staging = StagingBuffer::with_capacity(payload_capacity);
    parts.state.encode(&mut staging)?;
    parts.emotion.encode(&mut staging)?;
    parts.learning.encode(&mut staging)?;
    parts.balance.encode(&mut staging)?;
    parts.memory.encode(&mut staging)?;

    let payload = staging.into_bytes();
    let mut out = StagingBuffer::with_capacity(HEADER_LEN + payload.len());
    out.put_u32(parts.header.step_count);
    out.put_u32(parts.header.last_update_time);
    out.put_len(payload.len());
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a full snapshot into fresh subsystems.
///
/// # Errors
/// [`CritterError::Truncated`] or [`CritterError::Malformed`] naming the
/// subsystem that failed. Nothing is returned on failure.
pub fn decode_snapshot(
    bytes: &[u8],
    config: &CritterConfig,
    embedder: Arc<dyn TextEmbedder>,
) -> Result<RestoredParts> {
    let mut input = ByteReader::new(bytes, HEADER);
    let header = SnapshotHeader {
        step_count: input.u32()?,
        last_update_time: input.u32()?,
    };
    let payload_len = input.u32()? as usize;
    if payload_len != input.remaining() {
        if payload_len > input.remaining() {
            return Err(CritterError::Truncated {
                subsystem: HEADER,
                needed: payload_len,
                remaining: input.remaining(),
            });
        }
        return Err(input.malformed(format!(
            "{} trailing bytes after a {payload_len}-byte payload",
            input.remaining() - payload_len
        )));
    }

    input.enter(state::SUBSYSTEM);
    let state = InternalStateModel::decode(&mut input, &config.state)?;
    input.enter(emotion::SUBSYSTEM);
    let emotion = EmotionEngine::decode(&mut input, &config.emotion)?;
    input.enter(learning::SUBSYSTEM);
    let learning = LearningSystem::decode(&mut input, &config.learning)?;
    input.enter(balance::SUBSYSTEM);
    let balance = BalanceManager::decode(&mut input, &config.balance)?;
    input.enter(memory::SUBSYSTEM);
    let memory = MemoryStore::decode(&mut input, &config.memory, embedder)?;

    if input.remaining() != 0 {
        return Err(input.malformed(format!("{} unread bytes after the last blob", input.remaining())));
    }
    debug!(payload_len, step_count = header.step_count, "Snapshot decoded");
    Ok(RestoredParts {
        header,
        state,
        emotion,
        learning,
        balance,
        memory,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` through a temporary file and a rename, so a
/// crash mid-write never leaves a half-written snapshot in place.
///
/// # Errors
/// [`CritterError::Io`] on any filesystem failure.
pub fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<()> {
    let start = Instant::now();
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        elapsed_us = start.elapsed().as_micros(),
        "Snapshot written"
    );
    Ok(())
}

/// Read a snapshot file. A missing file is not an error and yields `None`.
///
/// # Errors
/// [`CritterError::Io`] on any other filesystem failure.
pub fn read_snapshot(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot found, starting fresh");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::lifecycle::LifecycleInfo;
    use crate::types::{Action, Vitals};

    struct Fixture {
        config: CritterConfig,
        state: InternalStateModel,
        emotion: EmotionEngine,
        learning: LearningSystem,
        balance: BalanceManager,
        memory: MemoryStore,
    }

    impl Fixture {
        fn new() -> Self {
            let config = CritterConfig::default();
            Self {
                state: InternalStateModel::new(&config.state),
                emotion: EmotionEngine::new(&config.emotion),
                learning: LearningSystem::new(&config.learning),
                balance: BalanceManager::new(&config.balance),
                memory: MemoryStore::new(&config.memory),
                config,
            }
        }

        fn parts(&self) -> SnapshotParts<'_> {
            SnapshotParts {
                header: SnapshotHeader {
                    step_count: 7,
                    last_update_time: 1234,
                },
                state: &self.state,
                emotion: &self.emotion,
                learning: &self.learning,
                balance: &self.balance,
                memory: &self.memory,
            }
        }
    }

    #[test]
    fn round_trip() {
        let mut f = Fixture::new();
        f.emotion.trigger("fear", 0.6);
        f.learning.learn_from_experience(Action::Rest, true, None, 3);
        f.balance.record_action(Action::Rest, true, 3);
        f.memory.store(Action::Rest, Vitals::default(), 0.8, "fear", LifecycleInfo::from_age(3), 3);

        let bytes = encode_snapshot(&f.parts(), 4096).expect("encode");
        let restored = decode_snapshot(&bytes, &f.config, Arc::new(HashEmbedder)).expect("decode");
        assert_eq!(restored.header, f.parts().header);
        assert_eq!(restored.state.states(), f.state.states());
        assert_eq!(restored.emotion.emotions(), f.emotion.emotions());
        assert_eq!(restored.learning.status(), f.learning.status());
        assert_eq!(restored.memory.records(), f.memory.records());
    }

    #[test]
    fn small_staging_buffer_names_the_subsystem() {
        let f = Fixture::new();
        let err = encode_snapshot(&f.parts(), HEADER_LEN + state::ENCODED_LEN + 10).expect_err("too small");
        assert!(matches!(
            err,
            CritterError::BufferTooSmall { subsystem: "EmotionSystem", .. }
        ));
        assert!(matches!(
            encode_snapshot(&f.parts(), 4),
            Err(CritterError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn every_truncation_is_rejected() {
        let f = Fixture::new();
        let bytes = encode_snapshot(&f.parts(), 4096).expect("encode");
        for cut in [0, 5, HEADER_LEN, HEADER_LEN + 20, bytes.len() - 1] {
            assert!(
                decode_snapshot(&bytes[..cut], &f.config, Arc::new(HashEmbedder)).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let f = Fixture::new();
        let mut bytes = encode_snapshot(&f.parts(), 4096).expect("encode");
        bytes.push(0);
        assert!(matches!(
            decode_snapshot(&bytes, &f.config, Arc::new(HashEmbedder)),
            Err(CritterError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_file_is_first_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_snapshot(&dir.path().join("absent.bin")).expect("read").is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.bin");
        write_snapshot(&path, &[1, 2, 3]).expect("write");
        assert_eq!(read_snapshot(&path).expect("read"), Some(vec![1, 2, 3]));
        assert!(!temp_path(&path).exists());
    }
}
