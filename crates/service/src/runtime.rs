//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime::ensure_env` without depending directly on `common`.

use std::path::Path;

/// Ensure the image directory exists before serving.
pub async fn ensure_env(image_dir: &Path) -> anyhow::Result<()> {
    common::env::ensure_env(image_dir).await
}
