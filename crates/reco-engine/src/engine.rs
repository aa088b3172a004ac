use std::path::PathBuf;

use reco_core::config::{RecoConfig, StorageConfig};
use reco_core::model::FIRST_RECO_ID;
use reco_core::{RecoError, RecoResult};
use reco_crypto::{KdfParams, MasterKey};
use reco_storage::ObjectStorage;
use reco_store::MetadataStore;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::BlobCache;
use crate::session::{EngineState, Session};
use crate::thumbnail::{jpeg_thumbnailer, ThumbnailFn};

/// The storage engine. One per data directory; cheap to share behind an `Arc`.
pub struct Engine {
    pub(crate) store: MetadataStore,
    pub(crate) cache: BlobCache,
    pub(crate) session: RwLock<Session>,
    pub(crate) settings_path: PathBuf,
    pub(crate) kdf: KdfParams,
    pub(crate) storage_cfg: StorageConfig,
    pub(crate) thumbnailer: ThumbnailFn,
}

impl Engine {
    /// Open the data directory described by `config`, creating it if needed.
    /// The engine starts Locked (or Uninitialized); nothing is decrypted yet.
    pub fn open(config: &RecoConfig) -> RecoResult<Self> {
        let paths = &config.paths;
        let cache_dir = paths.cache_dir();
        let thumb_dir = paths.thumb_dir();
        for dir in [paths.data_dir(), cache_dir.clone(), thumb_dir.clone()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                RecoError::Config(format!("creating {}: {e}", dir.display()))
            })?;
        }

        let store = MetadataStore::open(&paths.db_path())?;
        info!(data_dir = %paths.data_dir().display(), "engine opened");

        Ok(Self {
            store,
            cache: BlobCache::new(
                cache_dir,
                thumb_dir,
                config.cache.max_mb.saturating_mul(1024 * 1024),
            ),
            session: RwLock::new(Session::default()),
            settings_path: paths.settings_path(),
            kdf: KdfParams::from(&config.crypto),
            storage_cfg: config.storage.clone(),
            thumbnailer: jpeg_thumbnailer(config.cache.thumb_size),
        })
    }

    /// Replace the thumbnail generator.
    pub fn with_thumbnailer(mut self, f: ThumbnailFn) -> Self {
        self.thumbnailer = f;
        self
    }

    pub async fn state(&self) -> EngineState {
        let exists = self.account_exists().await;
        self.session.read().await.state(exists)
    }

    /// True once the bootstrap record exists.
    pub async fn account_exists(&self) -> bool {
        self.store.read().await.one_reco(FIRST_RECO_ID).is_ok()
    }

    /// True if an encrypted cloud settings file is on disk.
    pub fn cloud_configured(&self) -> bool {
        self.settings_path.exists()
    }

    pub fn cache(&self) -> &BlobCache {
        &self.cache
    }

    /// The master key, or `RequireLogin`.
    pub(crate) async fn master_key(&self) -> RecoResult<MasterKey> {
        self.session
            .read()
            .await
            .master_key
            .clone()
            .ok_or(RecoError::RequireLogin)
    }

    /// Master key and cloud storage, or `RequireLogin` / `CloudNotConfigured`.
    pub(crate) async fn ready(&self) -> RecoResult<(MasterKey, ObjectStorage)> {
        let session = self.session.read().await;
        let key = session.master_key.clone().ok_or(RecoError::RequireLogin)?;
        let storage = session
            .storage
            .clone()
            .ok_or(RecoError::CloudNotConfigured)?;
        Ok((key, storage))
    }
}
