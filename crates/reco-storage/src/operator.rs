//! OpenDAL Operator factory for reco storage backends

use std::time::Duration;

use opendal::layers::{LoggingLayer, RetryLayer, TimeoutLayer};
use opendal::{Builder, Operator};
use reco_core::config::StorageConfig;
use reco_core::{RecoError, RecoResult};

use crate::settings::CloudSettings;

/// Build an OpenDAL Operator for the configured provider.
///
/// Every operator gets logging and a per-call timeout; retries with jitter
/// wrap the timeout unless `max_retries` is 0. If `enforce_tls` is set, a
/// plaintext `http://` S3 endpoint is rejected, otherwise it is only logged.
pub fn build_operator(settings: &CloudSettings, cfg: &StorageConfig) -> RecoResult<Operator> {
    settings.validate()?;

    let op = match settings {
        CloudSettings::S3 {
            endpoint,
            region,
            bucket,
            access_key_id,
            secret_access_key,
        } => {
            check_tls(endpoint, cfg.enforce_tls)?;
            // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
            let builder = opendal::services::S3::default()
                .endpoint(endpoint)
                .region(region)
                .bucket(bucket)
                .access_key_id(access_key_id)
                .secret_access_key(secret_access_key);
            finish(builder, cfg)?
        }
        CloudSettings::Fs { root } => finish(opendal::services::Fs::default().root(root), cfg)?,
        CloudSettings::Memory => finish(opendal::services::Memory::default(), cfg)?,
    };

    let op = if cfg.max_retries > 0 {
        op.layer(
            RetryLayer::new()
                .with_max_times(cfg.max_retries)
                .with_jitter(),
        )
    } else {
        op
    };

    tracing::debug!(provider = settings.provider(), "built storage operator");
    Ok(op)
}

fn finish<B: Builder>(builder: B, cfg: &StorageConfig) -> RecoResult<Operator> {
    let op = Operator::new(builder)
        .map_err(|e| RecoError::InvalidCloudSettings(format!("creating operator: {e}")))?
        .layer(LoggingLayer::default())
        .layer(TimeoutLayer::new().with_timeout(Duration::from_secs(cfg.timeout_secs.max(1))))
        .finish();
    Ok(op)
}

fn check_tls(endpoint: &str, enforce_tls: bool) -> RecoResult<()> {
    if endpoint.starts_with("http://") {
        if enforce_tls {
            return Err(RecoError::InvalidCloudSettings(format!(
                "S3 endpoint uses plaintext HTTP ({endpoint}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development."
            )));
        }
        tracing::warn!(
            endpoint = %endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted. \
             Set storage.enforce_tls = true and use HTTPS in production."
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3(endpoint: &str) -> CloudSettings {
        CloudSettings::S3 {
            endpoint: endpoint.into(),
            region: "us-east-1".into(),
            bucket: "test-bucket".into(),
            access_key_id: "test-key".into(),
            secret_access_key: "test-secret".into(),
        }
    }

    #[test]
    fn test_build_operator_valid() {
        let op = build_operator(&s3("http://localhost:8333"), &StorageConfig::default());
        assert!(op.is_ok(), "operator construction should succeed");
    }

    #[test]
    fn test_http_enforce_tls() {
        let cfg = StorageConfig {
            enforce_tls: true,
            ..Default::default()
        };
        let err = build_operator(&s3("http://insecure:8333"), &cfg).unwrap_err();
        assert!(matches!(err, RecoError::InvalidCloudSettings(_)));
        assert!(
            err.to_string().contains("enforce_tls"),
            "error message should mention enforce_tls"
        );
    }

    #[test]
    fn test_https_enforce_tls() {
        let cfg = StorageConfig {
            enforce_tls: true,
            ..Default::default()
        };
        assert!(build_operator(&s3("https://s3.example.com"), &cfg).is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected_before_build() {
        let err = build_operator(&s3(""), &StorageConfig::default()).unwrap_err();
        assert!(matches!(err, RecoError::InvalidCloudSettings(_)));
    }

    #[test]
    fn test_no_retry_layer() {
        let cfg = StorageConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(build_operator(&CloudSettings::Memory, &cfg).is_ok());
    }
}
