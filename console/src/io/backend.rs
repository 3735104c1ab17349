//! Storage backends the replicated store fans out to.
//!
//! Each backend owns its medium and its failure mode. Only the expiring file
//! backend honours record expiry natively; the others persist values as-is.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend {0} is unavailable")]
    Unavailable(String),
    #[error("backend {name} i/o failed: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("backend {name} holds unreadable data: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Lifetime class of a file backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Survives restarts, never expires on its own.
    Persistent,
    /// Survives restarts until each record's expiry.
    Expiring,
}

/// One stored fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_ms: Option<u64>,
}

impl Record {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expiry_ms.is_none_or(|expiry| now_ms < expiry)
    }
}

pub trait Backend: Send {
    fn name(&self) -> &str;

    /// Current value of `key`, or `None` when absent or expired.
    fn read(&self, key: &str, now_ms: u64) -> Result<Option<String>, BackendError>;

    /// Store `value`, superseding any previous record. `expiry_ms` is an
    /// absolute deadline; backends without native expiry drop it.
    fn write(&mut self, key: &str, value: &str, expiry_ms: Option<u64>)
    -> Result<(), BackendError>;
}

#[derive(Debug)]
struct MemoryInner {
    records: BTreeMap<String, Record>,
    available: bool,
}

/// Session-scoped in-memory backend.
///
/// Clones share the same storage, so a test (or host) can keep a handle to
/// wipe or disable it after handing it to the store.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    name: String,
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(MemoryInner {
                records: BTreeMap::new(),
                available: true,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every record, as a user clearing storage would.
    pub fn clear(&self) {
        self.lock().records.clear();
    }

    /// Simulate storage being blocked (`false`) or restored (`true`).
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Raw stored value, bypassing availability.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().records.get(key).map(|record| record.value.clone())
    }

    /// Overwrite a value directly, bypassing availability.
    pub fn poke(&self, key: &str, value: &str) {
        self.lock().records.insert(
            key.to_string(),
            Record {
                key: key.to_string(),
                value: value.to_string(),
                expiry_ms: None,
            },
        );
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, key: &str, _now_ms: u64) -> Result<Option<String>, BackendError> {
        let inner = self.lock();
        if !inner.available {
            return Err(BackendError::Unavailable(self.name.clone()));
        }
        Ok(inner.records.get(key).map(|record| record.value.clone()))
    }

    fn write(
        &mut self,
        key: &str,
        value: &str,
        _expiry_ms: Option<u64>,
    ) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if !inner.available {
            return Err(BackendError::Unavailable(self.name.clone()));
        }
        inner.records.insert(
            key.to_string(),
            Record {
                key: key.to_string(),
                value: value.to_string(),
                expiry_ms: None,
            },
        );
        Ok(())
    }
}

/// JSON-file backend. `persistent` files ignore expiry; `expiring` files keep
/// it per record and hide records past their deadline.
#[derive(Debug, Clone)]
pub struct FileBackend {
    name: String,
    path: PathBuf,
    scope: Scope,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileContents {
    records: BTreeMap<String, Record>,
}

pub const PERSISTENT_FILE: &str = "local.json";
pub const COOKIE_FILE: &str = "cookies.json";

impl FileBackend {
    pub fn persistent(dir: &Path) -> Self {
        Self {
            name: "persistent".to_string(),
            path: dir.join(PERSISTENT_FILE),
            scope: Scope::Persistent,
        }
    }

    pub fn expiring(dir: &Path) -> Self {
        Self {
            name: "cookie".to_string(),
            path: dir.join(COOKIE_FILE),
            scope: Scope::Expiring,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<FileContents, BackendError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FileContents::default()),
            Err(source) => {
                return Err(BackendError::Io {
                    name: self.name.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| BackendError::Corrupt {
            name: self.name.clone(),
            source,
        })
    }

    fn store(&self, contents: &FileContents) -> Result<(), BackendError> {
        let io_err = |source| BackendError::Io {
            name: self.name.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut buf =
            serde_json::to_string_pretty(contents).map_err(|source| BackendError::Corrupt {
                name: self.name.clone(),
                source,
            })?;
        buf.push('\n');
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, buf).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, key: &str, now_ms: u64) -> Result<Option<String>, BackendError> {
        // A corrupt file holds nothing usable; reporting it absent lets repair overwrite it.
        let contents = match self.load() {
            Ok(contents) => contents,
            Err(err @ BackendError::Corrupt { .. }) => {
                warn!(backend = %self.name, error = %err, "discarding corrupt store file");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some(record) = contents.records.get(key) else {
            return Ok(None);
        };
        if self.scope == Scope::Expiring && !record.is_live(now_ms) {
            debug!(backend = %self.name, key, "record expired");
            return Ok(None);
        }
        Ok(Some(record.value.clone()))
    }

    fn write(
        &mut self,
        key: &str,
        value: &str,
        expiry_ms: Option<u64>,
    ) -> Result<(), BackendError> {
        // An unreadable file is replaced rather than blocking every later write.
        let mut contents = match self.load() {
            Ok(contents) => contents,
            Err(BackendError::Corrupt { .. }) => FileContents::default(),
            Err(err) => return Err(err),
        };
        let expiry_ms = match self.scope {
            Scope::Expiring => expiry_ms,
            Scope::Persistent => None,
        };
        contents.records.insert(
            key.to_string(),
            Record {
                key: key.to_string(),
                value: value.to_string(),
                expiry_ms,
            },
        );
        self.store(&contents)
    }
}
