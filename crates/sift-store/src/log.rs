use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sift_types::{DocKey, Document};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::{MemoryStore, DEFAULT_SHARDS};
use crate::retry::RetryPolicy;
use crate::traits::DocumentStore;

/// File name of the log inside the store directory.
pub const LOG_FILE_NAME: &str = "documents.log";

/// Lock file held exclusively for as long as a [`LogStore`] is open.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Flush/sync strategy for log appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Configuration for [`LogStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub sync_mode: SyncMode,
    pub retry: RetryPolicy,
    /// Shard count of the in-memory index.
    pub shards: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            retry: RetryPolicy::default(),
            shards: DEFAULT_SHARDS,
        }
    }
}

/// One upsert as persisted in the log.
///
/// The document travels as JSON bytes because bincode cannot decode
/// self-describing values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub namespace: String,
    pub id: String,
    pub body: Vec<u8>,
}

impl LogRecord {
    pub fn new(key: &DocKey, document: &Document) -> StoreResult<Self> {
        let body = document.to_json_vec().map_err(StoreError::storage)?;
        Ok(Self {
            namespace: key.namespace.to_string(),
            id: key.id.to_string(),
            body,
        })
    }

    /// Frame the record for the log.
    ///
    /// On-disk format:
    /// ```text
    /// [4 bytes: payload length (little-endian u32)]
    /// [4 bytes: CRC32 of payload (little-endian u32)]
    /// [N bytes: payload (bincode-serialized LogRecord)]
    /// ```
    pub fn encode_frame(&self) -> StoreResult<Vec<u8>> {
        let payload = bincode::serialize(self).map_err(StoreError::storage)?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::storage("log record exceeds 4 GiB"))?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    fn into_entry(self) -> Option<(DocKey, Document)> {
        let key = match DocKey::new(self.namespace, self.id) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "log record has invalid key; skipping");
                return None;
            }
        };
        match Document::from_json_slice(&self.body) {
            Ok(document) => Some((key, document)),
            Err(e) => {
                warn!(%key, error = %e, "log record body is not valid JSON; skipping");
                None
            }
        }
    }
}

/// Outcome of scanning a log file.
#[derive(Debug, Default)]
struct Replay {
    records: Vec<LogRecord>,
    /// End of the last structurally complete frame.
    valid_len: u64,
    skipped: usize,
}

/// File operations the writer depends on.
trait LogSink: Write + Send {
    fn sync_data(&self) -> io::Result<()>;

    /// Cut the file to `len` bytes and move the write position there.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Internal mutable state for appends.
struct LogWriter {
    file: Box<dyn LogSink>,
    /// Current end of the log.
    offset: u64,
    /// Set when a failed append could not be rolled back. The file may hold
    /// a torn frame, so no further appends are accepted.
    broken: bool,
}

impl LogWriter {
    fn append(&mut self, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
        self.file.write_all(frame)?;
        if sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        self.offset += frame.len() as u64;
        Ok(())
    }

    /// Cut the file back to `offset`, discarding any partial frame.
    fn rollback(&mut self, offset: u64) -> io::Result<()> {
        self.file.truncate(offset)?;
        self.offset = offset;
        Ok(())
    }
}

/// Durable document store: an append-only log plus an in-memory index.
///
/// Every write appends one CRC-framed [`LogRecord`] and then updates a
/// [`MemoryStore`] index; reads are served from the index alone and never
/// wait on the log. On open the log is replayed front-to-back, so the last
/// record for a key wins.
///
/// Appends are serialized through a single writer mutex and the index is
/// updated while it is held, keeping index order and log order identical for
/// writes to the same key.
///
/// A store owns its directory: `open` takes an exclusive lock on
/// [`LOCK_FILE_NAME`] and a second open of the same directory, from this
/// process or another, fails until the first store is dropped.
pub struct LogStore {
    dir: PathBuf,
    path: PathBuf,
    writer: Mutex<LogWriter>,
    index: MemoryStore,
    config: LogConfig,
    _lock: File,
}

impl LogStore {
    /// Open (or create) a log store in `dir`.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let lock = lock_dir(&dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let file_len = file.metadata()?.len();

        let replay = replay(&path)?;
        if replay.valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len = replay.valid_len,
                file_len,
                "discarding torn log tail"
            );
            file.truncate(replay.valid_len)?;
            file.sync_all()?;
        }

        let index = MemoryStore::with_shards(config.shards);
        let record_count = replay.records.len();
        for record in replay.records {
            if let Some((key, document)) = record.into_entry() {
                index.insert(key, document);
            }
        }

        info!(
            path = %path.display(),
            records = record_count,
            skipped = replay.skipped,
            documents = index.len(),
            "opened log store"
        );

        Ok(Self {
            dir,
            path,
            writer: Mutex::new(LogWriter {
                file: Box::new(file),
                offset: replay.valid_len,
                broken: false,
            }),
            index,
            config,
            _lock: lock,
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte length of the log.
    pub fn log_len(&self) -> StoreResult<u64> {
        Ok(self.lock_writer()?.offset)
    }

    /// Number of documents in the index.
    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    /// Rewrite the log so it holds exactly one record per live key.
    ///
    /// Writes are blocked for the duration; reads continue against the
    /// index. Returns the number of records written.
    pub fn compact(&self) -> StoreResult<usize> {
        let mut w = self.lock_writer()?;
        if w.broken {
            return Err(broken_log());
        }
        let before = w.offset;

        let entries = self.index.entries();
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        let mut written: u64 = 0;
        for (key, document) in &entries {
            let frame = LogRecord::new(key, document)?.encode_frame()?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        // Appends continue on the persisted handle, never the replaced file.
        let file = tmp.persist(&self.path).map_err(|e| StoreError::from(e.error))?;
        w.file = Box::new(file);
        w.offset = written;
        sync_dir(&self.dir)?;

        info!(
            path = %self.path.display(),
            records = entries.len(),
            before,
            after = written,
            "log compacted"
        );
        Ok(entries.len())
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, LogWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::storage(format!("log writer lock poisoned: {e}")))
    }
}

impl DocumentStore for LogStore {
    fn write(&self, key: &DocKey, document: Document) -> StoreResult<()> {
        let frame = LogRecord::new(key, &document)?.encode_frame()?;

        let mut guard = self.lock_writer()?;
        let w = &mut *guard;
        if w.broken {
            return Err(broken_log());
        }
        let start = w.offset;
        let sync_mode = self.config.sync_mode;

        let appended = self.config.retry.run("log append", |attempt| {
            if attempt > 1 {
                w.rollback(start)?;
            }
            w.append(&frame, sync_mode)
        });
        if let Err(e) = appended {
            warn!(%key, offset = start, error = %e, "log append failed");
            if let Err(rollback_err) = w.rollback(start) {
                warn!(
                    error = %rollback_err,
                    "could not roll back failed append; log is now read-only"
                );
                w.broken = true;
            }
            return Err(e.into());
        }

        self.index.insert(key.clone(), document);
        debug!(%key, offset = start, len = frame.len(), "log append");
        Ok(())
    }

    fn read(&self, key: &DocKey) -> StoreResult<Option<Document>> {
        Ok(self.index.lookup(key))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.index.len())
    }

    fn backend_name(&self) -> &'static str {
        "log"
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path)
            .field("document_count", &self.index.len())
            .finish()
    }
}

/// Take the directory's exclusive lock, failing fast if it is held.
fn lock_dir(dir: &Path) -> StoreResult<File> {
    let lock_path = dir.join(LOCK_FILE_NAME);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)?;
    lock.try_lock_exclusive().map_err(|_| {
        StoreError::storage(format!(
            "log store at '{}' is already in use",
            dir.display()
        ))
    })?;
    Ok(lock)
}

/// Make a rename inside `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn broken_log() -> StoreError {
    StoreError::storage("log has an unrecoverable torn append; reopen the store")
}

/// Scan the log front-to-back.
///
/// Frames whose CRC does not match are skipped. An impossible length or a
/// truncated frame ends the scan: everything from there on is a torn tail.
fn replay(path: &Path) -> StoreResult<Replay> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut out = Replay::default();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + u64::from(length) > file_len {
            warn!(offset, length, file_len, "invalid log frame length; stopping replay");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated log frame; stopping replay");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let frame_end = offset + HEADER_SIZE as u64 + u64::from(length);

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping log frame"
            );
            out.skipped += 1;
        } else {
            match bincode::deserialize::<LogRecord>(&payload) {
                Ok(record) => out.records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "failed to decode log record; skipping");
                    out.skipped += 1;
                }
            }
        }

        offset = frame_end;
        out.valid_len = offset;
    }

    debug!(records = out.records.len(), skipped = out.skipped, "log replay complete");
    Ok(out)
}
