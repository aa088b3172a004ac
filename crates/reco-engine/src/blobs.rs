//! Blob retrieval: cloud → decrypt → local cache, thumbnails, backups.

use std::path::{Path, PathBuf};

use reco_core::mime::is_image;
use reco_core::model::Reco;
use reco_core::{RecoError, RecoResult};
use reco_crypto::{open, seal, sha256_hex};
use tracing::{debug, info, warn};

use crate::cache::write_atomic;
use crate::engine::Engine;

impl Engine {
    /// Fetch `blob_name` from cloud storage, decrypt it, and write the
    /// plaintext to `dest`. Works for soft-deleted recos too.
    pub async fn download_decrypt(&self, blob_name: &str, dest: &Path) -> RecoResult<()> {
        let plain = self.fetch_plaintext(blob_name).await?;
        write_atomic(dest, &plain).await?;
        debug!(blob = blob_name, dest = %dest.display(), "downloaded");
        Ok(())
    }

    /// Path of the decrypted content of a file reco, downloading it into the
    /// cache on a miss.
    pub async fn cached_file(&self, id: &str) -> RecoResult<PathBuf> {
        let reco = self.file_reco(id).await?;
        let path = self.cache.blob_path(id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let plain = self.fetch_plaintext(&reco.blob_name()).await?;
        if sha256_hex(&plain) != reco.checksum {
            return Err(RecoError::DataIntegrity(format!(
                "content of reco {id} does not match its checksum"
            )));
        }
        self.cache.put_blob(id, &plain).await
    }

    /// Path of the thumbnail of an image reco, generating it if needed.
    pub async fn thumbnail(&self, id: &str) -> RecoResult<PathBuf> {
        let reco = self.file_reco(id).await?;
        if !is_image(&reco.file_type) {
            return Err(RecoError::InvalidInput(format!(
                "reco {id} is not an image ({})",
                reco.file_type
            )));
        }
        let path = self.cache.thumb_path(id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let plain = match self.cache.get_blob(id).await {
            Some(data) => data,
            None => tokio::fs::read(self.cached_file(id).await?).await?,
        };
        let thumb = self
            .make_thumbnail(plain)
            .await?
            .map_err(|e| RecoError::InvalidInput(format!("cannot thumbnail reco {id}: {e}")))?;
        self.cache.put_thumb(id, &thumb).await
    }

    /// Seal the committed metadata file and upload it under its file name.
    /// Returns the object name.
    pub async fn backup_database(&self) -> RecoResult<String> {
        let (key, storage) = self.ready().await?;
        let name = self
            .store
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reco.db".into());

        let bytes = self.store.file_bytes().await?;
        storage.put_object(&name, seal(key.as_bytes(), &bytes)?).await?;
        info!(object = %name, bytes = bytes.len(), "metadata backed up");
        Ok(name)
    }

    /// Cache freshly stored plaintext and, for images, its thumbnail.
    /// Images that fail to decode only get a warning.
    pub(crate) async fn cache_plaintext(&self, reco: &Reco, data: Vec<u8>) -> RecoResult<()> {
        self.cache.put_blob(&reco.id, &data).await?;
        if !is_image(&reco.file_type) {
            return Ok(());
        }
        match self.make_thumbnail(data).await? {
            Ok(thumb) => {
                self.cache.put_thumb(&reco.id, &thumb).await?;
            }
            Err(e) => warn!(id = %reco.id, "thumbnail skipped: {e}"),
        }
        Ok(())
    }

    async fn make_thumbnail(&self, data: Vec<u8>) -> RecoResult<anyhow::Result<Vec<u8>>> {
        let f = self.thumbnailer.clone();
        Ok(tokio::task::spawn_blocking(move || f(&data))
            .await
            .map_err(anyhow::Error::from)?)
    }

    async fn fetch_plaintext(&self, blob_name: &str) -> RecoResult<Vec<u8>> {
        let (key, storage) = self.ready().await?;
        let sealed = storage.get_object_body(blob_name).await?;
        open(key.as_bytes(), &sealed)
    }

    async fn file_reco(&self, id: &str) -> RecoResult<Reco> {
        let reco = self.get_reco(id).await?;
        if !reco.is_file() {
            return Err(RecoError::InvalidInput(format!("reco {id} has no file")));
        }
        Ok(reco)
    }
}
