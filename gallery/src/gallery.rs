use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::codec::check_name_len;
use crate::config::GalleryConfig;
use crate::cosine::best_match;
use crate::error::GalleryError;
use crate::normalize::normalize;
use crate::provider::{FaceEmbedder, FaceImage};
use crate::record::{FaceRecord, Match, Records, Snapshot, UNKNOWN};
use crate::storage::GalleryStorage;

struct WriterState {
    /// Set once storage has been read (successfully or not).
    loaded: bool,
}

struct GalleryInner {
    cfg: GalleryConfig,
    storage: Box<dyn GalleryStorage>,
    current: RwLock<Snapshot>,
    writer: Mutex<WriterState>,
}

/// Shared handle to a face gallery.
///
/// Cloning is cheap and every clone sees the same records. Readers take an
/// immutable snapshot (a reference-count bump under a briefly held lock),
/// so recognition never observes a half-written record and never waits on
/// a save. Mutations are serialized and each one is followed by a full
/// save, so persisted generations follow mutation order.
#[derive(Clone)]
pub struct Gallery {
    inner: Arc<GalleryInner>,
}

impl Gallery {
    /// Creates an empty gallery backed by `storage`. Call [`Gallery::load`]
    /// once at startup to read persisted records; otherwise the first
    /// enroll or remove reads them before changing anything.
    pub fn new(cfg: GalleryConfig, storage: Box<dyn GalleryStorage>) -> Self {
        Self {
            inner: Arc::new(GalleryInner {
                cfg: cfg.with_defaults(),
                storage,
                current: RwLock::new(Arc::new(Records::new())),
                writer: Mutex::new(WriterState { loaded: false }),
            }),
        }
    }

    /// Creates a gallery and loads it. A load failure is returned for
    /// logging alongside a usable, empty gallery.
    pub fn open(
        cfg: GalleryConfig,
        storage: Box<dyn GalleryStorage>,
    ) -> (Self, Option<GalleryError>) {
        let gallery = Self::new(cfg, storage);
        let err = gallery.load().err();
        (gallery, err)
    }

    /// Reads persisted records into the gallery.
    ///
    /// Only the first call touches storage; later calls return the current
    /// record count. A missing file yields an empty gallery. An unreadable
    /// or corrupt file also leaves the gallery empty and is reported as
    /// [`GalleryError::CorruptState`]; the gallery stays usable and the
    /// next save overwrites the bad file.
    pub fn load(&self) -> Result<usize, GalleryError> {
        let mut writer = self.inner.writer.lock();
        self.load_locked(&mut writer)
    }

    fn load_locked(&self, writer: &mut WriterState) -> Result<usize, GalleryError> {
        if writer.loaded {
            return Ok(self.len());
        }
        writer.loaded = true;

        match self.inner.storage.load() {
            Ok(Some(records)) => {
                let n = records.len();
                *self.inner.current.write() = Arc::new(records);
                info!(records = n, "gallery: loaded");
                Ok(n)
            }
            Ok(None) => {
                info!("gallery: no persisted gallery, starting empty");
                Ok(0)
            }
            Err(e) => {
                error!(error = %e, "gallery: load failed, starting empty");
                Err(e)
            }
        }
    }

    /// Returns the effective configuration.
    pub fn config(&self) -> &GalleryConfig {
        &self.inner.cfg
    }

    /// Returns an immutable view of all records at this instant.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.current.read().clone()
    }

    /// Returns enrolled names in ascending byte order.
    pub fn list(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Returns the number of enrolled faces.
    pub fn len(&self) -> usize {
        self.inner.current.read().len()
    }

    /// Returns true if no faces are enrolled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports whether `name` is enrolled.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.current.read().contains_key(name)
    }

    /// Returns the record stored under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<FaceRecord>> {
        self.inner.current.read().get(name).cloned()
    }

    /// Normalizes `raw` and stores it under `name`, replacing any previous
    /// record, then saves the gallery.
    ///
    /// If the save fails the in-memory gallery keeps the new record and a
    /// [`GalleryError::Persistence`] is returned.
    pub fn enroll(&self, name: &str, raw: &[f32]) -> Result<(), GalleryError> {
        check_name_len(name)?;
        self.check_dim(raw)?;

        let record = Arc::new(FaceRecord::new(name, normalize(raw)));
        let mut writer = self.inner.writer.lock();
        self.ensure_loaded(&mut writer);

        let snapshot = self.swap(|records| {
            records.insert(name.to_string(), record);
        });
        debug!(name, records = snapshot.len(), "gallery: enrolled");
        self.persist(&snapshot)
    }

    /// Removes `name`. Returns `Ok(false)` without saving if it was not
    /// enrolled.
    ///
    /// If the save fails the record stays removed in memory and a
    /// [`GalleryError::Persistence`] is returned.
    pub fn remove(&self, name: &str) -> Result<bool, GalleryError> {
        let mut writer = self.inner.writer.lock();
        self.ensure_loaded(&mut writer);
        if !self.contains(name) {
            return Ok(false);
        }

        let snapshot = self.swap(|records| {
            records.remove(name);
        });
        debug!(name, records = snapshot.len(), "gallery: removed");
        self.persist(&snapshot)?;
        Ok(true)
    }

    /// Finds the enrolled face most similar to `raw`, if its similarity
    /// strictly exceeds `threshold`.
    ///
    /// Records are scanned in name order, so on an exact score tie the
    /// lexicographically smallest name wins.
    pub fn identify(&self, raw: &[f32], threshold: f32) -> Result<Option<Match>, GalleryError> {
        self.check_dim(raw)?;
        let query = normalize(raw);
        let snapshot = self.snapshot();
        let m = best_match(&query, snapshot.values().map(|r| &**r), threshold)?;
        match &m {
            Some(m) => debug!(name = %m.name, score = m.score, "gallery: recognized"),
            None => debug!(records = snapshot.len(), "gallery: no match"),
        }
        Ok(m)
    }

    /// Recognizes `raw` with the configured threshold, returning the
    /// matched name or [`UNKNOWN`].
    pub fn recognize(&self, raw: &[f32]) -> Result<String, GalleryError> {
        self.recognize_with_threshold(raw, self.inner.cfg.threshold)
    }

    /// Recognizes `raw` with an explicit threshold, returning the matched
    /// name or [`UNKNOWN`].
    pub fn recognize_with_threshold(
        &self,
        raw: &[f32],
        threshold: f32,
    ) -> Result<String, GalleryError> {
        Ok(self
            .identify(raw, threshold)?
            .map(|m| m.name)
            .unwrap_or_else(|| UNKNOWN.to_string()))
    }

    /// Embeds `face` with `provider` and enrolls the result under `name`.
    /// Nothing changes if the provider fails.
    pub fn enroll_face(
        &self,
        name: &str,
        provider: &dyn FaceEmbedder,
        face: &FaceImage,
    ) -> Result<(), GalleryError> {
        check_name_len(name)?;
        let raw = provider.embed(face)?;
        self.enroll(name, &raw)
    }

    /// Embeds `face` with `provider` and recognizes it with the configured
    /// threshold.
    pub fn recognize_face(
        &self,
        provider: &dyn FaceEmbedder,
        face: &FaceImage,
    ) -> Result<String, GalleryError> {
        let raw = provider.embed(face)?;
        self.recognize(&raw)
    }

    /// Reads storage before the first mutation so a save never drops
    /// persisted records. A failed read was already logged by `load_locked`
    /// and leaves the gallery empty, as with [`Gallery::open`].
    fn ensure_loaded(&self, writer: &mut WriterState) {
        if !writer.loaded {
            let _ = self.load_locked(writer);
        }
    }

    fn check_dim(&self, v: &[f32]) -> Result<(), GalleryError> {
        if v.len() != self.inner.cfg.dim {
            return Err(GalleryError::DimensionMismatch {
                expected: self.inner.cfg.dim,
                got: v.len(),
            });
        }
        Ok(())
    }

    /// Applies `f` to a copy of the current records and publishes the
    /// result. Caller must hold the writer lock.
    fn swap(&self, f: impl FnOnce(&mut Records)) -> Snapshot {
        let mut records = Records::clone(&self.snapshot());
        f(&mut records);
        let snapshot = Arc::new(records);
        *self.inner.current.write() = snapshot.clone();
        snapshot
    }

    fn persist(&self, snapshot: &Records) -> Result<(), GalleryError> {
        self.inner.storage.save(snapshot).map_err(|e| {
            warn!(error = %e, "gallery: save failed, keeping in-memory state");
            e
        })
    }
}

impl std::fmt::Debug for Gallery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gallery")
            .field("cfg", &self.inner.cfg)
            .field("records", &self.len())
            .finish()
    }
}
