//! AES-256-GCM sealing of arbitrary byte strings.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use reco_core::{RecoError, RecoResult};

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Returns `[12-byte nonce][ciphertext][16-byte tag]`. Sealing the same
/// plaintext twice yields different output.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> RecoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt the output of [`seal`].
///
/// Short input, a wrong key, and tampered bytes all fail the same way, with
/// [`RecoError::Authentication`].
pub fn open(key: &[u8; KEY_SIZE], sealed: &[u8]) -> RecoResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        tracing::debug!(len = sealed.len(), "sealed buffer too short");
        return Err(RecoError::Authentication);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(key.into());

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| RecoError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [7u8; KEY_SIZE];

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(&KEY, b"hello, sealed world").unwrap();
        assert_eq!(open(&KEY, &sealed).unwrap(), b"hello, sealed world");
    }

    #[test]
    fn test_sealed_size() {
        let sealed = seal(&KEY, &[0u8; 100]).unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 100 + TAG_SIZE);
    }

    #[test]
    fn test_empty_plaintext() {
        let sealed = seal(&KEY, b"").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + TAG_SIZE);
        assert!(open(&KEY, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_nonce_is_fresh() {
        let a = seal(&KEY, b"same").unwrap();
        let b = seal(&KEY, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(&KEY, b"secret").unwrap();
        let err = open(&[8u8; KEY_SIZE], &sealed).unwrap_err();
        assert!(matches!(err, RecoError::Authentication));
    }

    #[test]
    fn test_tampered_fails() {
        let mut sealed = seal(&KEY, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            open(&KEY, &sealed).unwrap_err(),
            RecoError::Authentication
        ));
    }

    #[test]
    fn test_short_input_fails() {
        assert!(matches!(
            open(&KEY, &[0u8; NONCE_SIZE + TAG_SIZE - 1]).unwrap_err(),
            RecoError::Authentication
        ));
    }
}
