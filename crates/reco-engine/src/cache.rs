//! Local plaintext cache for decrypted blobs and their thumbnails.
//!
//! Layout: `{cache_dir}/{id}.reco` and `{thumb_dir}/{id}.small`. Entries are
//! written atomically (temp → rename). When the blob cache exceeds
//! `max_bytes`, least-recently-modified blobs are evicted. A `max_bytes` of 0
//! disables eviction.

use std::path::{Path, PathBuf};

use reco_core::model::{BLOB_EXT, THUMB_EXT};
use reco_core::RecoResult;
use tokio::fs;
use tracing::debug;

pub struct BlobCache {
    cache_dir: PathBuf,
    thumb_dir: PathBuf,
    max_bytes: u64,
}

impl BlobCache {
    pub fn new(cache_dir: PathBuf, thumb_dir: PathBuf, max_bytes: u64) -> Self {
        BlobCache {
            cache_dir,
            thumb_dir,
            max_bytes,
        }
    }

    pub fn blob_path(&self, reco_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{reco_id}{BLOB_EXT}"))
    }

    pub fn thumb_path(&self, reco_id: &str) -> PathBuf {
        self.thumb_dir.join(format!("{reco_id}{THUMB_EXT}"))
    }

    pub async fn get_blob(&self, reco_id: &str) -> Option<Vec<u8>> {
        fs::read(self.blob_path(reco_id)).await.ok()
    }

    /// Store decrypted content, then evict old entries if over capacity.
    pub async fn put_blob(&self, reco_id: &str, data: &[u8]) -> RecoResult<PathBuf> {
        let path = self.blob_path(reco_id);
        write_atomic(&path, data).await?;
        if let Err(e) = self.evict_if_needed(&path).await {
            debug!("cache eviction failed: {e}");
        }
        Ok(path)
    }

    pub async fn put_thumb(&self, reco_id: &str, data: &[u8]) -> RecoResult<PathBuf> {
        let path = self.thumb_path(reco_id);
        write_atomic(&path, data).await?;
        Ok(path)
    }

    /// Evict least-recently-modified blobs until the total is under
    /// `max_bytes`. `keep` is never evicted.
    async fn evict_if_needed(&self, keep: &Path) -> RecoResult<()> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let mut entries: Vec<(PathBuf, u64, std::time::SystemTime)> = Vec::new();
        let mut total: u64 = 0;

        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_file() && entry.file_name().to_string_lossy().ends_with(BLOB_EXT) {
                let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
                total += meta.len();
                entries.push((entry.path(), meta.len(), mtime));
            }
        }

        if total <= self.max_bytes {
            return Ok(());
        }

        entries.sort_by_key(|(_, _, mtime)| *mtime);
        for (path, size, _) in entries {
            if total <= self.max_bytes {
                break;
            }
            if path == keep {
                continue;
            }
            if fs::remove_file(&path).await.is_ok() {
                debug!(path = %path.display(), "evicted cached blob");
                total = total.saturating_sub(size);
            }
        }
        Ok(())
    }
}

/// Write `data` to `path` via a sibling temp file and rename.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> RecoResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_sibling(path);
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// `path` with `.tmp` appended to the full file name, so files sharing a
/// stem never share a temp file.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_in(dir: &Path, max_bytes: u64) -> BlobCache {
        BlobCache::new(dir.join("cache"), dir.join("thumbs"), max_bytes)
    }

    #[tokio::test]
    async fn put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), 0);

        let path = cache.put_blob("abc", b"hello world").await.unwrap();
        assert_eq!(path, dir.path().join("cache/abc.reco"));
        assert_eq!(cache.get_blob("abc").await.unwrap(), b"hello world");

        let thumb = cache.put_thumb("abc", b"jpeg").await.unwrap();
        assert_eq!(thumb, dir.path().join("thumbs/abc.small"));
    }

    #[test]
    fn temp_names_keep_the_extension() {
        assert_eq!(
            tmp_sibling(Path::new("/d/reco.db")),
            PathBuf::from("/d/reco.db.tmp")
        );
        assert_ne!(
            tmp_sibling(Path::new("/d/reco.db")),
            tmp_sibling(Path::new("/d/reco.settings"))
        );
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), 0);
        assert!(cache.get_blob("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn evicts_oldest_over_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), 10);

        cache.put_blob("old", &[0u8; 6]).await.unwrap();
        // mtime granularity can be coarse; make the order unambiguous
        let old = std::fs::File::options()
            .write(true)
            .open(cache.blob_path("old"))
            .unwrap();
        old.set_modified(std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_000))
            .unwrap();
        drop(old);

        cache.put_blob("new", &[1u8; 6]).await.unwrap();

        assert!(cache.get_blob("old").await.is_none(), "oldest entry evicted");
        assert!(cache.get_blob("new").await.is_some(), "new entry kept");
    }
}
