//! Environment/runtime helpers
//!
//! Sanity checks run once at startup, before the storage backend is built.

use std::path::Path;

use tracing::warn;

/// Check that the demo data file is present; a missing file only disables seeding.
///
/// Returns whether the file exists so the caller can skip the initial reload.
pub async fn ensure_env(demo_data_file: &Path) -> anyhow::Result<bool> {
    match tokio::fs::metadata(demo_data_file).await {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => Err(anyhow::anyhow!(
            "demo data path {} is not a regular file",
            demo_data_file.display()
        )),
        Err(_) => {
            warn!(path = %demo_data_file.display(), "demo data file not found; initial reload disabled");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_fatal() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("missing_{}.json", uuid::Uuid::new_v4()));
        assert!(!ensure_env(&path).await?);
        Ok(())
    }

    #[tokio::test]
    async fn directory_is_rejected() {
        let dir = std::env::temp_dir();
        assert!(ensure_env(&dir).await.is_err());
    }

    #[tokio::test]
    async fn present_file_is_reported() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("present_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"{}\n").await?;
        assert!(ensure_env(&path).await?);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }
}
