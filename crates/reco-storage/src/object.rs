//! Object-level operations on the configured bucket.

use opendal::Operator;
use rand::RngCore;
use reco_core::config::StorageConfig;
use reco_core::{RecoError, RecoResult};
use tracing::{debug, warn};

use crate::operator::build_operator;
use crate::settings::CloudSettings;

/// Thin adapter over an OpenDAL [`Operator`] speaking reco's error taxonomy.
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    op: Operator,
}

impl ObjectStorage {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn from_settings(settings: &CloudSettings, cfg: &StorageConfig) -> RecoResult<Self> {
        Ok(Self::new(build_operator(settings, cfg)?))
    }

    pub async fn put_object(&self, name: &str, body: Vec<u8>) -> RecoResult<()> {
        let len = body.len();
        self.op
            .write(name, body)
            .await
            .map_err(|e| transport(name, e))?;
        debug!(object = name, bytes = len, "put object");
        Ok(())
    }

    /// Full body of an object; [`RecoError::NotFound`] when absent.
    pub async fn get_object_body(&self, name: &str) -> RecoResult<Vec<u8>> {
        let buf = self.op.read(name).await.map_err(|e| transport(name, e))?;
        Ok(buf.to_vec())
    }

    /// Deleting an absent object succeeds.
    pub async fn delete_object(&self, name: &str) -> RecoResult<()> {
        self.op.delete(name).await.map_err(|e| transport(name, e))?;
        debug!(object = name, "deleted object");
        Ok(())
    }

    /// Write a random probe object, read it back, and delete it.
    ///
    /// The probe is deleted even when the read fails. A body mismatch means
    /// the settings point at something that is not a usable bucket.
    pub async fn self_test(&self) -> RecoResult<()> {
        let mut token = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut token);
        let name = format!("reco-probe-{}.tmp", hex::encode(token));
        let body = hex::encode(token).into_bytes();

        self.put_object(&name, body.clone())
            .await
            .map_err(|e| probe_failed("write", e))?;
        let read = self.get_object_body(&name).await;
        if let Err(e) = self.delete_object(&name).await {
            warn!(object = %name, "failed to delete probe object: {e}");
        }

        if read.map_err(|e| probe_failed("read", e))? != body {
            return Err(RecoError::InvalidCloudSettings(
                "probe object read back with different content".into(),
            ));
        }
        Ok(())
    }
}

fn probe_failed(step: &str, e: RecoError) -> RecoError {
    RecoError::InvalidCloudSettings(format!("probe {step} failed: {e}"))
}

fn transport(name: &str, e: opendal::Error) -> RecoError {
    if e.kind() == opendal::ErrorKind::NotFound {
        RecoError::NotFound(format!("object {name}"))
    } else {
        RecoError::Transport(format!("{name}: {e}"))
    }
}
