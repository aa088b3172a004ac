//! Key derivation: Argon2id passphrase → user key

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use reco_core::config::CryptoConfig;
use reco_core::{RecoError, RecoResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from the user's passphrase. It only ever seals the
/// master key and is never persisted.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct UserKey {
    bytes: [u8; KEY_SIZE],
}

impl UserKey {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for UserKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(cfg: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: cfg.argon2_mem_cost_kib,
            time_cost: cfg.argon2_time_cost,
            parallelism: cfg.argon2_parallelism,
        }
    }
}

/// Random salt for a new account.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive the user key from a passphrase and salt using Argon2id.
///
/// Deliberately slow with the default parameters; async callers should run
/// it on a blocking thread.
pub fn derive_user_key(
    passphrase: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> RecoResult<UserKey> {
    if passphrase.expose_secret().is_empty() {
        return Err(RecoError::InvalidInput("passphrase is empty".into()));
    }

    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| RecoError::InvalidInput(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| RecoError::InvalidInput(format!("Argon2id KDF failed: {e}")))?;

    Ok(UserKey { bytes: key })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_user_key(&passphrase, &salt, &fast()).unwrap();
        let key2 = derive_user_key(&passphrase, &salt, &fast()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_user_key(&SecretString::from("passphrase-a"), &salt, &fast()).unwrap();
        let key2 = derive_user_key(&SecretString::from("passphrase-b"), &salt, &fast()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");
        let key1 = derive_user_key(&passphrase, &[1u8; SALT_SIZE], &fast()).unwrap();
        let key2 = derive_user_key(&passphrase, &[2u8; SALT_SIZE], &fast()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        let err = derive_user_key(&SecretString::from(""), &[1u8; SALT_SIZE], &fast()).unwrap_err();
        assert!(matches!(err, RecoError::InvalidInput(_)));
    }

    #[test]
    fn test_params_from_config() {
        let params = KdfParams::from(&CryptoConfig::default());
        assert_eq!(params, KdfParams::default());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = derive_user_key(&SecretString::from("x"), &[0u8; SALT_SIZE], &fast()).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
