//! reco-crypto: envelope encryption for reco
//!
//! Key hierarchy:
//! ```text
//! passphrase ──Argon2id(salt, params)──► User Key (256-bit, never stored)
//!                                          │ AES-256-GCM
//!                                          ▼
//!                              Master Key (256-bit random, sealed in the
//!                              bootstrap record as a WrappedMasterKey)
//!                                          │ AES-256-GCM
//!                                          ▼
//!                       file blobs, cloud settings, metadata backups
//! ```
//!
//! Sealed format: `[12-byte random nonce][ciphertext][16-byte GCM tag]`.

pub mod checksum;
pub mod envelope;
pub mod kdf;
pub mod keys;

pub use checksum::{is_sha256_hex, sha256_hex};
pub use envelope::{open, seal};
pub use kdf::{derive_user_key, generate_salt, KdfParams, UserKey};
pub use keys::{MasterKey, WrappedMasterKey};
pub use secrecy::{ExposeSecret, SecretString};

/// Size of every symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an Argon2id salt
pub const SALT_SIZE: usize = 16;
