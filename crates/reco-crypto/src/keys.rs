//! Master key and its passphrase-wrapped form stored in the bootstrap record.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use reco_core::{RecoError, RecoResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::envelope::{open, seal};
use crate::kdf::{derive_user_key, generate_salt, KdfParams};
use crate::KEY_SIZE;

/// Current [`WrappedMasterKey`] format version.
pub const WRAP_VERSION: u32 = 1;

/// The 256-bit account master key. Seals every blob, the cloud settings,
/// and metadata backups.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    /// A fresh random master key for a new account.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The master key sealed under a passphrase-derived user key, together with
/// everything needed to re-derive that user key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedMasterKey {
    pub version: u32,
    pub kdf: KdfParams,
    /// base64 salt
    pub salt: String,
    /// base64 of `seal(user_key, master_key)`
    pub sealed_key: String,
}

impl WrappedMasterKey {
    /// Seal `master` under a user key freshly derived from `passphrase` with
    /// a random salt.
    pub fn wrap(
        passphrase: &SecretString,
        master: &MasterKey,
        params: &KdfParams,
    ) -> RecoResult<Self> {
        let salt = generate_salt();
        let user_key = derive_user_key(passphrase, &salt, params)?;
        let sealed = seal(user_key.as_bytes(), master.as_bytes())?;
        Ok(Self {
            version: WRAP_VERSION,
            kdf: params.clone(),
            salt: BASE64.encode(salt),
            sealed_key: BASE64.encode(sealed),
        })
    }

    /// Recover the master key. Only an empty passphrase is `InvalidInput`;
    /// a wrong passphrase, an unknown version, and damaged salt, params or
    /// key material all fail with [`RecoError::Authentication`].
    pub fn unwrap(&self, passphrase: &SecretString) -> RecoResult<MasterKey> {
        if passphrase.expose_secret().is_empty() {
            return Err(RecoError::InvalidInput("passphrase is empty".into()));
        }
        if self.version != WRAP_VERSION {
            return Err(RecoError::Authentication);
        }
        let salt = BASE64
            .decode(&self.salt)
            .map_err(|_| RecoError::Authentication)?;
        let sealed = BASE64
            .decode(&self.sealed_key)
            .map_err(|_| RecoError::Authentication)?;

        let user_key = derive_user_key(passphrase, &salt, &self.kdf)
            .map_err(|_| RecoError::Authentication)?;
        let mut plaintext =
            open(user_key.as_bytes(), &sealed).map_err(|_| RecoError::Authentication)?;

        if plaintext.len() != KEY_SIZE {
            plaintext.zeroize();
            return Err(RecoError::Authentication);
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&plaintext);
        plaintext.zeroize();
        Ok(MasterKey::from_bytes(bytes))
    }

    /// Text form stored in the bootstrap record: base64 of the JSON.
    pub fn encode(&self) -> RecoResult<String> {
        let json = serde_json::to_vec(self).map_err(anyhow::Error::from)?;
        Ok(BASE64.encode(json))
    }

    pub fn decode(text: &str) -> RecoResult<Self> {
        let json = BASE64
            .decode(text.trim())
            .map_err(|_| RecoError::Authentication)?;
        serde_json::from_slice(&json).map_err(|_| RecoError::Authentication)
    }
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
    fn test_master_key_generation() {
        let k1 = MasterKey::generate();
        let k2 = MasterKey::generate();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let pass = SecretString::from("correct horse");
        let master = MasterKey::generate();
        let wrapped = WrappedMasterKey::wrap(&pass, &master, &fast()).unwrap();

        let text = wrapped.encode().unwrap();
        let decoded = WrappedMasterKey::decode(&text).unwrap();
        assert_eq!(decoded, wrapped);

        let recovered = decoded.unwrap(&pass).unwrap();
        assert_eq!(recovered.as_bytes(), master.as_bytes());
    }

    #[test]
    fn test_wrong_passphrase_is_authentication() {
        let master = MasterKey::generate();
        let wrapped =
            WrappedMasterKey::wrap(&SecretString::from("right"), &master, &fast()).unwrap();
        let err = wrapped.unwrap(&SecretString::from("wrong")).unwrap_err();
        assert!(matches!(err, RecoError::Authentication));
    }

    #[test]
    fn test_garbage_is_authentication() {
        assert!(matches!(
            WrappedMasterKey::decode("not base64 at all!").unwrap_err(),
            RecoError::Authentication
        ));
        let not_json = BASE64.encode(b"{nope");
        assert!(matches!(
            WrappedMasterKey::decode(&not_json).unwrap_err(),
            RecoError::Authentication
        ));
    }

    #[test]
    fn test_salt_is_random_per_wrap() {
        let pass = SecretString::from("p");
        let master = MasterKey::generate();
        let a = WrappedMasterKey::wrap(&pass, &master, &fast()).unwrap();
        let b = WrappedMasterKey::wrap(&pass, &master, &fast()).unwrap();
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_stored_params_are_used() {
        let pass = SecretString::from("p");
        let master = MasterKey::generate();
        let params = KdfParams {
            mem_cost_kib: 2048,
            time_cost: 2,
            parallelism: 1,
        };
        let wrapped = WrappedMasterKey::wrap(&pass, &master, &params).unwrap();
        assert_eq!(wrapped.kdf, params);
        assert_eq!(
            wrapped.unwrap(&pass).unwrap().as_bytes(),
            master.as_bytes()
        );
    }

    #[test]
    fn test_damaged_record_is_authentication() {
        let pass = SecretString::from("right");
        let wrapped = WrappedMasterKey::wrap(&pass, &MasterKey::generate(), &fast()).unwrap();

        let mut bad_params = wrapped.clone();
        bad_params.kdf.mem_cost_kib = 0;
        let mut bad_time = wrapped.clone();
        bad_time.kdf.time_cost = 0;
        let mut short_salt = wrapped.clone();
        short_salt.salt = "AAAA".into();
        let mut bad_version = wrapped.clone();
        bad_version.version = WRAP_VERSION + 1;

        for damaged in [bad_params, bad_time, short_salt, bad_version] {
            let err = damaged.unwrap(&pass).unwrap_err();
            assert!(
                matches!(err, RecoError::Authentication),
                "expected Authentication, got {err:?}"
            );
        }
    }

    #[test]
    fn test_empty_passphrase_is_invalid_input() {
        let wrapped =
            WrappedMasterKey::wrap(&SecretString::from("p"), &MasterKey::generate(), &fast())
                .unwrap();
        let err = wrapped.unwrap(&SecretString::from("")).unwrap_err();
        assert!(matches!(err, RecoError::InvalidInput(_)));
    }
}
