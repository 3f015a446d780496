//! Cached JSON document persisted to a single file.
//!
//! Reads are served from memory and never touch the disk. Writes replace
//! the cached value immediately and are then flushed on the blocking pool,
//! one at a time per store.

use std::ffi::OsString;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::PrettyFormatter;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::error::{StoreError, StoreResult};

/// Poll interval of [`JsonStore::set_blocking`].
const SPIN_INTERVAL: Duration = Duration::from_millis(5);

/// Values a [`JsonStore`] can hold.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A single JSON value, cached in memory and mirrored to a file.
///
/// Cloning is cheap and shares the same cache and write queue.
pub struct JsonStore<T: Document> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    path: PathBuf,
    cached: RwLock<T>,
    /// Sequence number handed to the most recent `set`.
    issued: AtomicU64,
    /// Held for the whole of every disk operation. Holds the sequence
    /// number of the last `set` that was flushed (or failed trying).
    settled: Mutex<u64>,
}

impl<T: Document> Clone for JsonStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Document> JsonStore<T> {
    /// Open the document at `path`, creating it with `default` if absent.
    ///
    /// This blocks on file I/O and is meant to run once at startup.
    ///
    /// # Errors
    /// `Io` if the file cannot be created or read, `Corruption` if it does
    /// not parse as the expected document.
    pub fn open(path: impl Into<PathBuf>, default: T) -> StoreResult<Self> {
        let path = path.into();

        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "document missing, writing default");
                write_document(&path, &encode(&default)?)?;
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        let value = read_document(&path)?;
        debug!(path = %path.display(), "document loaded");

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                cached: RwLock::new(value),
                issued: AtomicU64::new(0),
                settled: Mutex::new(0),
            }),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// A copy of the cached value. Never waits on I/O.
    pub fn get(&self) -> T {
        self.inner.cached.read().clone()
    }

    /// Replace the value.
    ///
    /// The cache is updated before this returns, so `get` observes the new
    /// value right away. The returned future flushes it to disk and must be
    /// awaited (or spawned) for the write to happen. Flushes of one store
    /// never overlap; a flush that finds a newer value already on disk is
    /// skipped, so the file always ends up holding the last value issued.
    ///
    /// A failed flush is reported to this caller only. The cache keeps the
    /// new value.
    #[must_use = "the value is not persisted until the returned future is awaited"]
    pub fn set(&self, value: T) -> impl Future<Output = StoreResult<T>> + Send + 'static {
        let seq = self.stage(value.clone());
        let inner = Arc::clone(&self.inner);

        async move {
            let mut settled = inner.settled.lock().await;
            if *settled > seq {
                debug!(path = %inner.path.display(), seq, "newer value already flushed, skipping");
                return Ok(value);
            }
            *settled = seq;

            let bytes = encode(&value)?;
            let path = inner.path.clone();
            let result = match tokio::task::spawn_blocking(move || write_document(&path, &bytes)).await {
                Ok(written) => written,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(()) => {
                    debug!(path = %inner.path.display(), seq, "document flushed");
                    Ok(value)
                }
                Err(e) => {
                    error!(path = %inner.path.display(), error = %e, "failed to flush document");
                    Err(e)
                }
            }
        }
    }

    /// Apply `f` to a copy of the cached value and [`set`](Self::set) the result.
    #[must_use = "the value is not persisted until the returned future is awaited"]
    pub fn update<F>(&self, f: F) -> impl Future<Output = StoreResult<T>> + Send + 'static
    where
        F: FnOnce(&mut T),
    {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// Blocking counterpart of [`set`](Self::set) for startup code.
    ///
    /// The flush runs on the calling thread, so call it from the blocking
    /// pool (`spawn_blocking`) or before a runtime exists. It parks that
    /// thread, and a flush of the same store pending on it would never
    /// finish.
    pub fn set_blocking(&self, value: T) -> StoreResult<T> {
        let seq = self.stage(value.clone());

        let mut settled = loop {
            match self.inner.settled.try_lock() {
                Ok(guard) => break guard,
                Err(_) => thread::sleep(SPIN_INTERVAL),
            }
        };
        if *settled > seq {
            return Ok(value);
        }
        *settled = seq;

        match write_document(&self.inner.path, &encode(&value)?) {
            Ok(()) => Ok(value),
            Err(e) => {
                error!(path = %self.inner.path.display(), error = %e, "failed to flush document");
                Err(e)
            }
        }
    }

    /// Re-read the backing file into the cache.
    ///
    /// Waits for any in-flight flush first. If a value was staged by `set`
    /// but has not been flushed yet, the cache keeps it, since the in-memory
    /// value is the authoritative one.
    pub async fn reload_from_disk(&self) -> StoreResult<T> {
        let settled = self.inner.settled.lock().await;

        let path = self.path().to_path_buf();
        let value = match tokio::task::spawn_blocking(move || read_document::<T>(&path)).await {
            Ok(read) => read?,
            Err(e) => return Err(e.into()),
        };

        if self.inner.issued.load(Ordering::SeqCst) != *settled {
            debug!(path = %self.path().display(), "unflushed value pending, keeping cache");
            return Ok(self.get());
        }

        *self.inner.cached.write() = value.clone();
        debug!(path = %self.path().display(), "document reloaded from disk");
        Ok(value)
    }

    /// Swap the cached value and take the next sequence number.
    fn stage(&self, value: T) -> u64 {
        let mut cached = self.inner.cached.write();
        *cached = value;
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl<T: Document> std::fmt::Debug for JsonStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore")
            .field("path", &self.inner.path)
            .finish()
    }
}

/// Pretty-print with four-space indentation.
fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corruption {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the target.
fn write_document(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
