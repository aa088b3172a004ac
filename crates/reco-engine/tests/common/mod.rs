//! Shared fixtures: a temp data dir, light Argon2 params, and a local
//! filesystem "cloud" so tests never touch the network.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use reco_core::config::{CryptoConfig, PathsConfig, RecoConfig, StorageConfig};
use reco_crypto::SecretString;
use reco_engine::{CloudSettings, Engine};

pub const PASSPHRASE: &str = "secret123";

pub fn test_config(dir: &Path) -> RecoConfig {
    let mut config = RecoConfig {
        paths: PathsConfig::under(dir.join("data")),
        crypto: CryptoConfig {
            argon2_mem_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        },
        storage: StorageConfig {
            timeout_secs: 5,
            max_retries: 0,
            enforce_tls: false,
        },
        ..Default::default()
    };
    config.cache.max_mb = 0;
    config
}

pub fn pass(s: &str) -> SecretString {
    SecretString::from(s)
}

pub fn cloud_root(dir: &Path) -> PathBuf {
    dir.join("cloud")
}

pub fn fs_cloud(dir: &Path) -> CloudSettings {
    CloudSettings::Fs {
        root: cloud_root(dir).to_string_lossy().into_owned(),
    }
}

/// Engine with an account, logged in, without cloud storage.
pub async fn unlocked_engine(dir: &Path) -> Engine {
    let engine = Engine::open(&test_config(dir)).unwrap();
    engine.create_account(pass(PASSPHRASE)).await.unwrap();
    engine.login(pass(PASSPHRASE)).await.unwrap();
    engine
}

/// Engine with an account, logged in, with a filesystem cloud under `dir`.
pub async fn ready_engine(dir: &Path) -> Engine {
    let engine = unlocked_engine(dir).await;
    engine.setup_cloud(fs_cloud(dir)).await.unwrap();
    engine
}
