//! Durable storage for gallery snapshots.
//!
//! A [`GalleryStorage`] never holds a live reference into the in-memory
//! gallery: `save` receives an immutable snapshot and `load` returns a
//! freshly decoded mapping.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::codec;
use crate::error::GalleryError;
use crate::record::Records;

/// Default gallery file name.
pub const DEFAULT_FILE_NAME: &str = "faces_database.bin";

/// Persists whole-gallery snapshots.
///
/// Implementations must be safe for concurrent use.
pub trait GalleryStorage: Send + Sync {
    /// Replace the persisted gallery with `records`.
    ///
    /// Either the new snapshot is fully persisted or the previous one is
    /// left intact.
    fn save(&self, records: &Records) -> Result<(), GalleryError>;

    /// Read the persisted gallery. Returns `Ok(None)` when nothing has
    /// been saved yet.
    fn load(&self) -> Result<Option<Records>, GalleryError>;
}

/// File-backed storage with atomic replace-on-save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    dim: usize,
}

impl FileStorage {
    /// Creates storage for the gallery file at `path` holding
    /// `dim`-dimensional embeddings. Nothing is touched on disk until the
    /// first save or load.
    pub fn new(path: impl Into<PathBuf>, dim: usize) -> Self {
        Self {
            path: path.into(),
            dim,
        }
    }

    /// Returns the gallery file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }
}

impl GalleryStorage for FileStorage {
    fn save(&self, records: &Records) -> Result<(), GalleryError> {
        let bytes = codec::encode_to_vec(records, self.dim)?;
        let persist_err = |e: std::io::Error| {
            GalleryError::Persistence(format!("{}: {e}", self.path.display()))
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(persist_err)?;
        }

        let tmp_path = self.temp_path();
        let staged = (|| {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()
        })();
        if let Err(e) = staged {
            let _ = fs::remove_file(&tmp_path);
            return Err(persist_err(e));
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(persist_err(e));
        }

        sync_parent_dir(&self.path);
        Ok(())
    }

    /// A missing file is `Ok(None)`. A file that exists but cannot be read
    /// is treated like a corrupt one.
    fn load(&self) -> Result<Option<Records>, GalleryError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GalleryError::CorruptState(format!(
                    "{}: unreadable: {e}",
                    self.path.display()
                )));
            }
        };
        decode_checked(&data, self.dim).map(Some)
    }
}

/// Makes the rename durable. Failure only weakens the crash guarantee, so
/// it is not reported.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

fn decode_checked(data: &[u8], dim: usize) -> Result<Records, GalleryError> {
    codec::decode_slice(data, Some(dim)).map(|(_, records)| records)
}

/// In-memory [`GalleryStorage`] that keeps the encoded bytes.
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryStorage {
    dim: usize,
    inner: Mutex<MemoryStorageInner>,
}

struct MemoryStorageInner {
    data: Option<Vec<u8>>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStorage {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            inner: Mutex::new(MemoryStorageInner {
                data: None,
                saves: 0,
                fail_saves: false,
            }),
        }
    }

    /// Creates storage preloaded with raw bytes, as if read from a file.
    pub fn with_bytes(dim: usize, data: Vec<u8>) -> Self {
        let storage = Self::new(dim);
        storage.inner.lock().data = Some(data);
        storage
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }

    /// When set, every subsequent save fails with a persistence error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.lock().fail_saves = fail;
    }

    /// Returns a copy of the last persisted bytes.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.inner.lock().data.clone()
    }
}

impl GalleryStorage for MemoryStorage {
    fn save(&self, records: &Records) -> Result<(), GalleryError> {
        let bytes = codec::encode_to_vec(records, self.dim)?;
        let mut inner = self.inner.lock();
        if inner.fail_saves {
            return Err(GalleryError::Persistence("memory storage: save disabled".into()));
        }
        inner.data = Some(bytes);
        inner.saves += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<Records>, GalleryError> {
        let inner = self.inner.lock();
        match &inner.data {
            None => Ok(None),
            Some(data) => decode_checked(data, self.dim).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::record::FaceRecord;

    fn records(entries: &[(&str, [f32; 2])]) -> Records {
        entries
            .iter()
            .map(|(n, v)| (n.to_string(), Arc::new(FaceRecord::new(*n, v.to_vec()))))
            .collect()
    }

    #[test]
    fn file_missing_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = FileStorage::new(dir.path().join(DEFAULT_FILE_NAME), 2);
        assert!(s.load().unwrap().is_none());
    }

    #[test]
    fn file_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let s = FileStorage::new(dir.path().join("nested/faces.bin"), 2);
        let g = records(&[("alice", [0.6, 0.8]), ("bob", [1.0, 0.0])]);
        s.save(&g).unwrap();
        assert_eq!(s.load().unwrap().unwrap(), g);
    }

    #[test]
    fn file_save_replaces_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.bin");
        let s = FileStorage::new(&path, 2);
        s.save(&records(&[("alice", [0.6, 0.8])])).unwrap();
        s.save(&records(&[("bob", [1.0, 0.0])])).unwrap();

        let loaded = s.load().unwrap().unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["bob"]);

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["faces.bin".to_string()]);
    }

    #[test]
    fn file_failed_save_keeps_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.bin");
        let s = FileStorage::new(&path, 2);
        let g = records(&[("alice", [0.6, 0.8])]);
        s.save(&g).unwrap();

        // Wrong-dimension snapshot fails to encode before anything is written.
        let bad = FileStorage::new(&path, 3);
        assert!(bad.save(&g).is_err());
        assert_eq!(s.load().unwrap().unwrap(), g);
    }

    #[test]
    fn file_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.bin");
        fs::write(&path, b"garbage").unwrap();
        let s = FileStorage::new(&path, 2);
        assert!(matches!(s.load(), Err(GalleryError::CorruptState(_))));
    }

    #[test]
    fn file_unreadable_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory fails with something other than NotFound.
        let s = FileStorage::new(dir.path(), 2);
        let err = s.load().unwrap_err();
        assert!(matches!(err, GalleryError::CorruptState(_)), "{err}");
    }

    #[test]
    fn file_huge_dimension_header_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.bin");
        let mut data = b"FACE".to_vec();
        for v in [1u32, u32::MAX, 1, 1] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.push(b'a');
        fs::write(&path, &data).unwrap();
        let err = FileStorage::new(&path, 192).load().unwrap_err();
        assert!(matches!(err, GalleryError::CorruptState(_)), "{err}");
    }

    #[test]
    fn save_rejects_oversized_name() {
        let s = MemoryStorage::new(2);
        let name = "x".repeat(codec::MAX_NAME_LEN + 1);
        let g: Records = [(name.clone(), Arc::new(FaceRecord::new(name, vec![1.0, 0.0])))]
            .into_iter()
            .collect();
        assert!(matches!(s.save(&g), Err(GalleryError::InvalidName(_))));
        assert!(s.bytes().is_none());
    }

    #[test]
    fn file_dimension_change_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.bin");
        FileStorage::new(&path, 2)
            .save(&records(&[("alice", [0.6, 0.8])]))
            .unwrap();
        let err = FileStorage::new(&path, 192).load().unwrap_err();
        assert!(matches!(err, GalleryError::CorruptState(_)), "{err}");
    }

    #[test]
    fn file_save_into_missing_parent_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let s = FileStorage::new(blocker.join("faces.bin"), 2);
        assert!(matches!(
            s.save(&records(&[("a", [1.0, 0.0])])),
            Err(GalleryError::Persistence(_))
        ));
    }

    #[test]
    fn memory_counts_saves() {
        let s = MemoryStorage::new(2);
        assert!(s.load().unwrap().is_none());
        s.save(&records(&[("a", [1.0, 0.0])])).unwrap();
        s.save(&Records::new()).unwrap();
        assert_eq!(s.save_count(), 2);
        assert!(s.load().unwrap().unwrap().is_empty());
    }

    #[test]
    fn memory_fail_saves() {
        let s = MemoryStorage::new(2);
        s.set_fail_saves(true);
        assert!(matches!(
            s.save(&Records::new()),
            Err(GalleryError::Persistence(_))
        ));
        assert_eq!(s.save_count(), 0);
        s.set_fail_saves(false);
        s.save(&Records::new()).unwrap();
        assert_eq!(s.save_count(), 1);
    }

    #[test]
    fn memory_with_corrupt_bytes() {
        let s = MemoryStorage::with_bytes(2, b"FACE".to_vec());
        assert!(matches!(s.load(), Err(GalleryError::CorruptState(_))));
    }
}
