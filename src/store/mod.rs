//! Owner of the raw bytes of one open asset.
//!
//! Codecs never touch the store directly: callers take a snapshot (or run
//! [`BufferStore::update`]), let a codec compute a replacement buffer, and the
//! store swaps it in whole and bumps its revision.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ensure_len, Result};
use crate::lights::LIGHTS_FILE_SIZE;
use crate::map::TILES_END;
use crate::mission::MIN_MISSION_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Lights,
    Map,
    Mission,
}

impl AssetKind {
    /// Smallest buffer the kind's codec can work on.
    pub fn min_size(self) -> usize {
        match self {
            AssetKind::Lights => LIGHTS_FILE_SIZE,
            // tile grid plus the trailing world number
            AssetKind::Map => TILES_END + 4,
            AssetKind::Mission => MIN_MISSION_SIZE,
        }
    }

    pub fn from_path(path: &Path) -> Option<AssetKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "lgt" => Some(AssetKind::Lights),
            "iam" => Some(AssetKind::Map),
            "ucm" => Some(AssetKind::Mission),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    bytes: Vec<u8>,
    path: Option<PathBuf>,
    dirty: bool,
    revision: u64,
}

#[derive(Debug)]
pub struct BufferStore {
    kind: AssetKind,
    inner: Mutex<Inner>,
}

impl BufferStore {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Start from in-memory template bytes; the result is unsaved and dirty.
    pub fn new_from_template(kind: AssetKind, bytes: Vec<u8>) -> Result<Self> {
        ensure_len(&bytes, kind.min_size())?;
        Ok(Self {
            kind,
            inner: Mutex::new(Inner {
                bytes,
                path: None,
                dirty: true,
                revision: 1,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().bytes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    /// Drop the buffer and forget the path.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.bytes = Vec::new();
        inner.path = None;
        inner.dirty = false;
        inner.revision += 1;
    }

    /// Replace the buffer with the result of `f`, returning the new revision.
    pub fn update<F>(&self, f: F) -> Result<u64>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        self.update_with(|bytes| f(bytes).map(|out| (out, ())))
            .map(|(revision, ())| revision)
    }

    /// Like [`update`](Self::update) for operations that also return a value,
    /// such as the slot index picked by an add.
    pub fn update_with<F, T>(&self, f: F) -> Result<(u64, T)>
    where
        F: FnOnce(&[u8]) -> Result<(Vec<u8>, T)>,
    {
        let mut inner = self.lock();
        ensure_len(&inner.bytes, self.kind.min_size())?;
        let (bytes, value) = f(&inner.bytes)?;
        ensure_len(&bytes, self.kind.min_size())?;
        inner.bytes = bytes;
        inner.dirty = true;
        inner.revision += 1;
        Ok((inner.revision, value))
    }

    /// Read `path` and swap it in once the whole file is in memory.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        ensure_len(&bytes, self.kind.min_size())?;

        let mut inner = self.lock();
        inner.bytes = bytes;
        inner.path = Some(path.to_path_buf());
        inner.dirty = false;
        inner.revision += 1;
        info!(path = %path.display(), len = inner.bytes.len(), "loaded asset");
        Ok(inner.revision)
    }

    /// Write the current buffer to `path` through a sibling temp file.
    ///
    /// The dirty flag is cleared only if nothing changed the buffer while the
    /// write was in flight.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (bytes, revision) = {
            let inner = self.lock();
            (inner.bytes.clone(), inner.revision)
        };

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "could not remove temp file");
            }
            return Err(e.into());
        }

        let mut inner = self.lock();
        inner.path = Some(path.to_path_buf());
        if inner.revision == revision {
            inner.dirty = false;
        } else {
            debug!(saved = revision, current = inner.revision, "buffer changed during save");
        }
        info!(path = %path.display(), len = bytes.len(), "saved asset");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
