//! OpenDAL Operator factory for qf storage backends

use anyhow::{Context, Result};
use base64::Engine;
use opendal::{Builder, Operator};
use qf_core::config::{StorageBackend, StorageConfig};

/// Build an OpenDAL Operator for the configured backend.
///
/// Credentials come only from `cfg`; ambient config files and environment
/// variables are never consulted by the S3 builder.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    match cfg.backend {
        StorageBackend::S3 => build_s3(cfg),
        StorageBackend::Gcs => build_gcs(cfg),
        StorageBackend::Memory => finish(opendal::services::Memory::default()),
    }
}

fn build_s3(cfg: &StorageConfig) -> Result<Operator> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted"
        );
    }

    // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
    let mut builder = opendal::services::S3::default()
        .region(&cfg.region)
        .bucket(&cfg.bucket)
        .disable_config_load();
    if !cfg.endpoint.is_empty() {
        builder = builder.endpoint(&cfg.endpoint);
    }
    if cfg.access_key_id.is_empty() {
        builder = builder.allow_anonymous();
    } else {
        builder = builder
            .access_key_id(&cfg.access_key_id)
            .secret_access_key(&cfg.secret_access_key);
    }

    finish(builder).context("creating OpenDAL S3 operator")
}

fn build_gcs(cfg: &StorageConfig) -> Result<Operator> {
    if cfg.google_credentials.is_empty() {
        anyhow::bail!("GCS backend requires storage.google_credentials (base64 service account JSON)");
    }
    // The builder wants the base64 form; decode only to validate.
    base64::engine::general_purpose::STANDARD
        .decode(cfg.google_credentials.trim())
        .context("google_credentials is not valid base64")?;

    let builder = opendal::services::Gcs::default()
        .bucket(&cfg.bucket)
        .credential(cfg.google_credentials.trim());

    finish(builder).context("creating OpenDAL GCS operator")
}

fn finish<B: Builder>(builder: B) -> Result<Operator> {
    let op = Operator::new(builder)?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(3)
                .with_jitter(),
        )
        .finish();
    Ok(op)
}
