//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the temporary image directory exists and is a directory.
pub async fn ensure_env(image_dir: &Path) -> anyhow::Result<()> {
    match tokio::fs::metadata(image_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(anyhow::anyhow!("{} exists but is not a directory", image_dir.display()));
        }
        Err(_) => {
            warn!(image_dir = %image_dir.display(), "image directory not found; creating it");
        }
    }
    tokio::fs::create_dir_all(image_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", image_dir.display()))?;
    info!(image_dir = %image_dir.display(), "image directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_env;

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = std::env::temp_dir()
            .join(format!("meter-reader-env-{}", std::process::id()))
            .join("temp_images");
        let _ = tokio::fs::remove_dir_all(&dir).await;

        ensure_env(&dir).await.unwrap();
        assert!(tokio::fs::metadata(&dir).await.unwrap().is_dir());

        // second call is a no-op
        ensure_env(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_regular_file() {
        let file = std::env::temp_dir().join(format!("meter-reader-env-file-{}", std::process::id()));
        tokio::fs::write(&file, b"x").await.unwrap();
        assert!(ensure_env(&file).await.is_err());
        let _ = tokio::fs::remove_file(&file).await;
    }
}
