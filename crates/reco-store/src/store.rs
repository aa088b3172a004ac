use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use reco_core::model::{Reco, RecoBox, Tag};
use reco_core::{RecoError, RecoResult};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::debug;

/// Every record in the store, keyed by primary key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub(crate) recos: BTreeMap<String, Reco>,
    /// keyed by tag name
    pub(crate) tags: BTreeMap<String, Tag>,
    pub(crate) boxes: BTreeMap<String, RecoBox>,
}

impl Tables {
    /// Insert a new reco. The id and (for live recos) the checksum must be
    /// unused.
    pub fn save_reco(&mut self, reco: Reco) -> RecoResult<()> {
        if self.recos.contains_key(&reco.id) {
            return Err(RecoError::AlreadyExists(format!("reco {}", reco.id)));
        }
        self.check_checksum_unique(&reco)?;
        debug!(id = %reco.id, "save reco");
        self.recos.insert(reco.id.clone(), reco);
        Ok(())
    }

    /// Replace an existing reco wholesale.
    pub fn update_reco(&mut self, reco: Reco) -> RecoResult<()> {
        if !self.recos.contains_key(&reco.id) {
            return Err(RecoError::NotFound(format!("reco {}", reco.id)));
        }
        self.check_checksum_unique(&reco)?;
        self.recos.insert(reco.id.clone(), reco);
        Ok(())
    }

    /// Hard delete. Tag and box references are left alone.
    pub fn delete_reco(&mut self, id: &str) -> RecoResult<Reco> {
        self.recos
            .remove(id)
            .ok_or_else(|| RecoError::NotFound(format!("reco {id}")))
    }

    pub fn one_reco(&self, id: &str) -> RecoResult<&Reco> {
        self.recos
            .get(id)
            .ok_or_else(|| RecoError::NotFound(format!("reco {id}")))
    }

    pub(crate) fn reco_mut(&mut self, id: &str) -> RecoResult<&mut Reco> {
        self.recos
            .get_mut(id)
            .ok_or_else(|| RecoError::NotFound(format!("reco {id}")))
    }

    /// The live reco holding `checksum`, if any.
    pub fn reco_by_checksum(&self, checksum: &str) -> Option<&Reco> {
        if checksum.is_empty() {
            return None;
        }
        self.recos
            .values()
            .find(|r| !r.is_deleted() && r.checksum == checksum)
    }

    pub fn tag(&self, name: &str) -> RecoResult<&Tag> {
        self.tags
            .get(name)
            .ok_or_else(|| RecoError::NotFound(format!("tag {name}")))
    }

    /// All tags ordered by name.
    pub fn all_tags(&self) -> Vec<Tag> {
        self.tags.values().cloned().collect()
    }

    pub fn box_by_id(&self, id: &str) -> RecoResult<&RecoBox> {
        self.boxes
            .get(id)
            .ok_or_else(|| RecoError::NotFound(format!("box {id}")))
    }

    pub(crate) fn box_mut(&mut self, id: &str) -> RecoResult<&mut RecoBox> {
        self.boxes
            .get_mut(id)
            .ok_or_else(|| RecoError::NotFound(format!("box {id}")))
    }

    pub fn box_by_title(&self, title: &str) -> RecoResult<&RecoBox> {
        self.boxes
            .values()
            .find(|b| b.title == title)
            .ok_or_else(|| RecoError::NotFound(format!("box titled {title:?}")))
    }

    /// All boxes, most recently updated first.
    pub fn all_boxes(&self) -> Vec<RecoBox> {
        let mut boxes: Vec<RecoBox> = self.boxes.values().cloned().collect();
        boxes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        boxes
    }

    pub fn save_box(&mut self, b: RecoBox) -> RecoResult<()> {
        if self.boxes.contains_key(&b.id) {
            return Err(RecoError::AlreadyExists(format!("box {}", b.id)));
        }
        self.check_title_unique(&b)?;
        self.boxes.insert(b.id.clone(), b);
        Ok(())
    }

    pub fn update_box(&mut self, b: RecoBox) -> RecoResult<()> {
        if !self.boxes.contains_key(&b.id) {
            return Err(RecoError::NotFound(format!("box {}", b.id)));
        }
        self.check_title_unique(&b)?;
        self.boxes.insert(b.id.clone(), b);
        Ok(())
    }

    fn check_checksum_unique(&self, reco: &Reco) -> RecoResult<()> {
        if reco.is_deleted() {
            return Ok(());
        }
        match self.reco_by_checksum(&reco.checksum) {
            Some(other) if other.id != reco.id => Err(RecoError::AlreadyExists(format!(
                "checksum {} (reco {})",
                reco.checksum, other.id
            ))),
            _ => Ok(()),
        }
    }

    fn check_title_unique(&self, b: &RecoBox) -> RecoResult<()> {
        match self.boxes.values().find(|o| o.title == b.title) {
            Some(other) if other.id != b.id => {
                Err(RecoError::AlreadyExists(format!("box title {:?}", b.title)))
            }
            _ => Ok(()),
        }
    }
}

/// The metadata store: committed tables in memory, mirrored to one JSON file.
pub struct MetadataStore {
    path: PathBuf,
    committed: RwLock<Tables>,
    writer: Mutex<()>,
}

impl MetadataStore {
    /// Load the store at `path`, or start empty if the file doesn't exist.
    pub fn open(path: &Path) -> RecoResult<Self> {
        let tables = if path.exists() {
            let content = std::fs::read(path)?;
            serde_json::from_slice(&content).map_err(|e| {
                RecoError::DataIntegrity(format!("parsing {}: {e}", path.display()))
            })?
        } else {
            Tables::default()
        };
        debug!(path = %path.display(), "opened metadata store");

        Ok(Self {
            path: path.to_path_buf(),
            committed: RwLock::new(tables),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared view of the last committed state.
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.committed.read().await
    }

    /// Start the (single) write transaction, waiting for any other to finish.
    pub async fn begin(&self) -> Transaction<'_> {
        let guard = self.writer.lock().await;
        let work = self.committed.read().await.clone();
        Transaction {
            store: self,
            _writer: guard,
            work,
            done: false,
        }
    }

    /// The committed store file, for backups. Empty if nothing was committed.
    pub async fn file_bytes(&self) -> RecoResult<Vec<u8>> {
        let _writer = self.writer.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, tables: &Tables) -> RecoResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(tables).map_err(anyhow::Error::from)?;

        // Atomic write: write to temp file, then rename
        let mut tmp_path = self.path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// A write transaction over a private copy of the tables.
///
/// Dereferences to [`Tables`] for reads and mutations. Nothing is visible to
/// readers until [`Transaction::commit`]; dropping it rolls back.
pub struct Transaction<'a> {
    store: &'a MetadataStore,
    _writer: MutexGuard<'a, ()>,
    work: Tables,
    done: bool,
}

impl Transaction<'_> {
    /// Persist the working copy, then publish it to readers.
    pub async fn commit(mut self) -> RecoResult<()> {
        self.store.persist(&self.work)?;
        *self.store.committed.write().await = std::mem::take(&mut self.work);
        self.done = true;
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) {
        self.done = true;
        debug!("transaction rolled back");
    }
}

impl Deref for Transaction<'_> {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.work
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Tables {
        &mut self.work
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            debug!("transaction dropped without commit, rolled back");
        }
    }
}
