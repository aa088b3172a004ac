//! Cloud provider settings, persisted encrypted under the master key.

use reco_core::{RecoError, RecoResult};
use serde::{Deserialize, Serialize};

/// Where encrypted blobs live. Serialized as JSON tagged by `provider`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum CloudSettings {
    /// Any S3-compatible object store (path-style addressing).
    S3 {
        endpoint: String,
        region: String,
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
    },
    /// A local directory, e.g. a NAS mount.
    Fs { root: String },
    /// Process-local; contents vanish with the operator.
    Memory,
}

impl CloudSettings {
    pub fn provider(&self) -> &'static str {
        match self {
            CloudSettings::S3 { .. } => "s3",
            CloudSettings::Fs { .. } => "fs",
            CloudSettings::Memory => "memory",
        }
    }

    /// Reject settings that can never produce a working operator.
    pub fn validate(&self) -> RecoResult<()> {
        match self {
            CloudSettings::S3 {
                endpoint,
                region,
                bucket,
                access_key_id,
                secret_access_key,
            } => {
                let fields = [
                    ("endpoint", endpoint),
                    ("region", region),
                    ("bucket", bucket),
                    ("access_key_id", access_key_id),
                    ("secret_access_key", secret_access_key),
                ];
                for (name, value) in fields {
                    if value.trim().is_empty() {
                        return Err(RecoError::InvalidCloudSettings(format!(
                            "{name} is empty"
                        )));
                    }
                }
                Ok(())
            }
            CloudSettings::Fs { root } if root.trim().is_empty() => Err(
                RecoError::InvalidCloudSettings("root is empty".into()),
            ),
            CloudSettings::Fs { .. } | CloudSettings::Memory => Ok(()),
        }
    }

    pub fn to_json(&self) -> RecoResult<Vec<u8>> {
        Ok(serde_json::to_vec(self).map_err(anyhow::Error::from)?)
    }

    pub fn from_json(bytes: &[u8]) -> RecoResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| RecoError::InvalidCloudSettings(e.to_string()))
    }
}

impl std::fmt::Debug for CloudSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudSettings::S3 {
                endpoint,
                region,
                bucket,
                access_key_id,
                ..
            } => f
                .debug_struct("S3")
                .field("endpoint", endpoint)
                .field("region", region)
                .field("bucket", bucket)
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"[REDACTED]")
                .finish(),
            CloudSettings::Fs { root } => f.debug_struct("Fs").field("root", root).finish(),
            CloudSettings::Memory => f.write_str("Memory"),
        }
    }
}
