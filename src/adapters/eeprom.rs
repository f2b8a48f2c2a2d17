//! EEPROM adapters.
//!
//! Implements [`NonVolatileStore`] twice:
//!
//! - [`MemoryEeprom`]: a byte vector, for tests.
//! - [`FileEeprom`]: an image file on the host, rewritten on every commit
//!   so the simulator's alarm table survives restarts.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{NonVolatileStore, StorageError};

/// Value of an erased EEPROM cell.
pub const ERASED: u8 = 0xFF;

/// Default image size: the alarm table plus headroom.
pub const DEFAULT_CAPACITY: usize = 64;

// ── In-memory ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    bytes: Vec<u8>,
}

impl MemoryEeprom {
    /// A zero-filled store.
    pub fn new(capacity: usize) -> Self {
        Self::filled(capacity, 0)
    }

    pub fn filled(capacity: usize, byte: u8) -> Self {
        Self { bytes: vec![byte; capacity] }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl NonVolatileStore for MemoryEeprom {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&self, offset: usize) -> Result<u8, StorageError> {
        self.bytes.get(offset).copied().ok_or(StorageError::OutOfRange { offset })
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        let cell = self.bytes.get_mut(offset).ok_or(StorageError::OutOfRange { offset })?;
        *cell = value;
        Ok(())
    }
}

// ── File-backed ───────────────────────────────────────────────

/// EEPROM image persisted to a host file.
pub struct FileEeprom {
    path: PathBuf,
    image: RefCell<Vec<u8>>,
}

impl FileEeprom {
    /// Open (or create) an image of `capacity` bytes.  A short or missing
    /// file is padded with erased cells.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut image = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("eeprom: no image at {}, starting erased", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("eeprom: cannot read {}: {e}", path.display());
                return Err(StorageError::Io);
            }
        };
        image.resize(capacity, ERASED);
        let eeprom = Self { path, image: RefCell::new(image) };
        eeprom.commit()?;
        Ok(eeprom)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&self) -> Result<(), StorageError> {
        fs::write(&self.path, &*self.image.borrow()).map_err(|e| {
            warn!("eeprom: cannot write {}: {e}", self.path.display());
            StorageError::Io
        })
    }
}

impl NonVolatileStore for FileEeprom {
    fn capacity(&self) -> usize {
        self.image.borrow().len()
    }

    fn read_byte(&self, offset: usize) -> Result<u8, StorageError> {
        self.image.borrow().get(offset).copied().ok_or(StorageError::OutOfRange { offset })
    }

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        {
            let mut image = self.image.borrow_mut();
            let cell = image.get_mut(offset).ok_or(StorageError::OutOfRange { offset })?;
            *cell = value;
        }
        self.commit()
    }

    fn write_block(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        {
            let mut image = self.image.borrow_mut();
            let end = offset + data.len();
            if end > image.len() {
                return Err(StorageError::OutOfRange { offset: end.saturating_sub(1) });
            }
            image[offset..end].copy_from_slice(data);
        }
        self.commit()
    }
}
