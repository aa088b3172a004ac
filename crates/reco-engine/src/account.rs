//! Account lifecycle: bootstrap, login/logout, cloud setup.

use std::path::Path;

use reco_core::model::{Reco, FIRST_RECO_ID};
use reco_core::{RecoError, RecoResult};
use reco_crypto::{open, seal, ExposeSecret, MasterKey, SecretString, WrappedMasterKey};
use reco_storage::{CloudSettings, ObjectStorage};
use tracing::{info, warn};

use crate::cache::tmp_sibling;
use crate::engine::Engine;

impl Engine {
    /// Create the account: a random master key sealed under `passphrase`,
    /// stored as the bootstrap record. Does not log in.
    pub async fn create_account(&self, passphrase: SecretString) -> RecoResult<()> {
        if passphrase.expose_secret().is_empty() {
            return Err(RecoError::InvalidInput("passphrase is empty".into()));
        }
        if self.account_exists().await {
            return Err(RecoError::AlreadyExists("account".into()));
        }

        let params = self.kdf.clone();
        let wrapped = tokio::task::spawn_blocking(move || {
            WrappedMasterKey::wrap(&passphrase, &MasterKey::generate(), &params)
        })
        .await
        .map_err(anyhow::Error::from)??;

        let mut tx = self.store.begin().await;
        if tx.one_reco(FIRST_RECO_ID).is_ok() {
            return Err(RecoError::AlreadyExists("account".into()));
        }
        tx.save_reco(Reco::first(wrapped.encode()?))?;
        tx.commit().await?;

        info!("account created");
        Ok(())
    }

    /// Resolve the master key from `passphrase`. If cloud settings were saved
    /// earlier they are decrypted and attached too, so the engine ends up
    /// Ready; a settings file that can't be read leaves the engine Locked.
    pub async fn login(&self, passphrase: SecretString) -> RecoResult<()> {
        let encoded = {
            let tables = self.store.read().await;
            tables
                .one_reco(FIRST_RECO_ID)
                .map_err(|_| RecoError::NotFound("account".into()))?
                .message
                .clone()
        };
        let wrapped = WrappedMasterKey::decode(&encoded)?;

        let key = tokio::task::spawn_blocking(move || wrapped.unwrap(&passphrase))
            .await
            .map_err(anyhow::Error::from)??;

        let storage = self.load_cloud(&key).await?;
        let ready = storage.is_some();

        let mut session = self.session.write().await;
        session.master_key = Some(key);
        session.storage = storage;
        info!(cloud = ready, "logged in");
        Ok(())
    }

    /// Forget the master key and cloud handle.
    pub async fn logout(&self) {
        self.session.write().await.clear();
        info!("logged out");
    }

    /// Verify `settings` with a probe round trip, save them encrypted, attach
    /// the storage, and push a first metadata backup.
    pub async fn setup_cloud(&self, settings: CloudSettings) -> RecoResult<()> {
        let key = self.master_key().await?;

        let storage = ObjectStorage::from_settings(&settings, &self.storage_cfg)?;
        storage.self_test().await?;

        let sealed = seal(key.as_bytes(), &settings.to_json()?)?;
        write_private(&self.settings_path, &sealed).await?;

        self.session.write().await.storage = Some(storage);
        info!(provider = settings.provider(), "cloud storage configured");

        self.backup_database().await?;
        Ok(())
    }

    /// Hard-delete the bootstrap record and log out. Other records, blobs and
    /// the settings file are left in place.
    pub async fn delete_account(&self) -> RecoResult<()> {
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        tx.delete_reco(FIRST_RECO_ID)?;
        tx.commit().await?;

        self.logout().await;
        warn!("bootstrap record deleted");
        Ok(())
    }

    async fn load_cloud(&self, key: &MasterKey) -> RecoResult<Option<ObjectStorage>> {
        let sealed = match tokio::fs::read(&self.settings_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings = CloudSettings::from_json(&open(key.as_bytes(), &sealed)?)?;
        Ok(Some(ObjectStorage::from_settings(
            &settings,
            &self.storage_cfg,
        )?))
    }
}

/// Atomic write readable only by the owner.
async fn write_private(path: &Path, data: &[u8]) -> RecoResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_sibling(path);
    tokio::fs::write(&tmp, data).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
