//! Account lifecycle: bootstrap, login, logout, cloud setup.

mod common;

use common::*;
use reco_core::{Reco, RecoError};
use reco_crypto::WrappedMasterKey;
use reco_engine::{CloudSettings, Engine, EngineState};
use tempfile::TempDir;

#[tokio::test]
async fn account_bootstrap_scenario() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    assert_eq!(engine.state().await, EngineState::Uninitialized);

    engine.create_account(pass("secret123")).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Locked);

    let err = engine.create_account(pass("secret123")).await.unwrap_err();
    assert!(matches!(err, RecoError::AlreadyExists(_)));

    let err = engine.login(pass("wrong")).await.unwrap_err();
    assert!(matches!(err, RecoError::Authentication));
    assert_eq!(engine.state().await, EngineState::Locked);

    engine.login(pass("secret123")).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Unlocked);

    engine.setup_cloud(fs_cloud(tmp.path())).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Ready);

    let reco = Reco::new_file("hello.txt").unwrap();
    engine
        .insert_reco(reco, Some(b"hello".to_vec()))
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_passphrase_is_invalid_input() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    let err = engine.create_account(pass("")).await.unwrap_err();
    assert!(matches!(err, RecoError::InvalidInput(_)));
    assert!(!engine.account_exists().await);
}

#[tokio::test]
async fn login_without_account_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    let err = engine.login(pass(PASSPHRASE)).await.unwrap_err();
    assert!(matches!(err, RecoError::NotFound(_)));
}

#[tokio::test]
async fn logout_fails_closed() {
    let tmp = TempDir::new().unwrap();
    let engine = ready_engine(tmp.path()).await;
    let reco = engine
        .insert_reco(Reco::new_note("hi", vec![]).unwrap(), None)
        .await
        .unwrap();

    engine.logout().await;
    assert_eq!(engine.state().await, EngineState::Locked);

    let err = engine.get_reco(&reco.id).await.unwrap_err();
    assert!(matches!(err, RecoError::RequireLogin));
    let err = engine
        .list_recos(&Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecoError::RequireLogin));
    let err = engine
        .insert_reco(Reco::new_note("again", vec![]).unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RecoError::RequireLogin));
}

#[tokio::test]
async fn login_restores_saved_cloud_settings() {
    let tmp = TempDir::new().unwrap();
    {
        let engine = ready_engine(tmp.path()).await;
        assert!(engine.cloud_configured());
    }

    // a fresh process: same data dir, nothing in memory
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    assert_eq!(engine.state().await, EngineState::Locked);
    engine.login(pass(PASSPHRASE)).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Ready);
}

#[tokio::test]
async fn settings_file_is_encrypted_and_private() {
    let tmp = TempDir::new().unwrap();
    let engine = ready_engine(tmp.path()).await;
    drop(engine);

    let config = test_config(tmp.path());
    let raw = std::fs::read(config.paths.settings_path()).unwrap();
    let root = cloud_root(tmp.path()).to_string_lossy().into_owned();
    assert!(
        !String::from_utf8_lossy(&raw).contains(&root),
        "settings must not be stored in plaintext"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(config.paths.settings_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn corrupt_settings_file_keeps_engine_locked() {
    let tmp = TempDir::new().unwrap();
    drop(ready_engine(tmp.path()).await);

    let config = test_config(tmp.path());
    std::fs::write(config.paths.settings_path(), b"garbage").unwrap();

    let engine = Engine::open(&config).unwrap();
    let err = engine.login(pass(PASSPHRASE)).await.unwrap_err();
    assert!(matches!(err, RecoError::Authentication));
    assert_eq!(engine.state().await, EngineState::Locked);
}

#[tokio::test]
async fn setup_cloud_requires_login() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    engine.create_account(pass(PASSPHRASE)).await.unwrap();
    let err = engine.setup_cloud(fs_cloud(tmp.path())).await.unwrap_err();
    assert!(matches!(err, RecoError::RequireLogin));
    assert!(!engine.cloud_configured());
}

#[tokio::test]
async fn failed_self_test_saves_nothing() {
    let tmp = TempDir::new().unwrap();
    let engine = unlocked_engine(tmp.path()).await;

    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let settings = CloudSettings::Fs {
        root: blocker.to_string_lossy().into_owned(),
    };

    let err = engine.setup_cloud(settings).await.unwrap_err();
    assert!(matches!(err, RecoError::InvalidCloudSettings(_)));
    assert!(!engine.cloud_configured());
    assert_eq!(engine.state().await, EngineState::Unlocked);
}

#[tokio::test]
async fn setup_cloud_uploads_metadata_backup() {
    let tmp = TempDir::new().unwrap();
    let _engine = ready_engine(tmp.path()).await;
    assert!(cloud_root(tmp.path()).join("reco.db").exists());
}

#[tokio::test]
async fn delete_account_logs_out_and_allows_recreate() {
    let tmp = TempDir::new().unwrap();
    let engine = unlocked_engine(tmp.path()).await;

    engine.delete_account().await.unwrap();
    assert_eq!(engine.state().await, EngineState::Uninitialized);

    engine.create_account(pass("new-pass")).await.unwrap();
    engine.login(pass("new-pass")).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Unlocked);
}

#[tokio::test]
async fn delete_account_requires_login() {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&test_config(tmp.path())).unwrap();
    engine.create_account(pass(PASSPHRASE)).await.unwrap();
    let err = engine.delete_account().await.unwrap_err();
    assert!(matches!(err, RecoError::RequireLogin));
    assert!(engine.account_exists().await);
}

#[tokio::test]
async fn settings_and_db_sharing_a_stem_stay_separate() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.paths.db_file = "reco.db".into();
    config.paths.settings_file = "reco.settings".into();

    {
        let engine = Engine::open(&config).unwrap();
        engine.create_account(pass(PASSPHRASE)).await.unwrap();
        engine.login(pass(PASSPHRASE)).await.unwrap();
        engine.setup_cloud(fs_cloud(tmp.path())).await.unwrap();
        engine
            .insert_reco(Reco::new_note("after setup", vec![]).unwrap(), None)
            .await
            .unwrap();
    }

    let engine = Engine::open(&config).unwrap();
    engine.login(pass(PASSPHRASE)).await.unwrap();
    assert_eq!(engine.state().await, EngineState::Ready);
    assert_eq!(engine.list_recos(&Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn huge_cache_limit_opens() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.cache.max_mb = u64::MAX;
    let engine = Engine::open(&config).unwrap();
    assert_eq!(engine.state().await, EngineState::Uninitialized);
}

#[tokio::test]
async fn damaged_bootstrap_record_is_authentication() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    {
        let engine = Engine::open(&config).unwrap();
        engine.create_account(pass(PASSPHRASE)).await.unwrap();
    }

    // zero out the stored Argon2 memory cost inside the wrapped key
    let db_path = config.paths.db_path();
    let mut tables: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&db_path).unwrap()).unwrap();
    let first = &mut tables["recos"]["1"];
    let mut damaged = WrappedMasterKey::decode(first["message"].as_str().unwrap()).unwrap();
    damaged.kdf.mem_cost_kib = 0;
    first["message"] = serde_json::Value::String(damaged.encode().unwrap());
    std::fs::write(&db_path, serde_json::to_vec(&tables).unwrap()).unwrap();

    let engine = Engine::open(&config).unwrap();
    let err = engine.login(pass(PASSPHRASE)).await.unwrap_err();
    assert!(matches!(err, RecoError::Authentication));
    assert_eq!(engine.state().await, EngineState::Locked);
}
