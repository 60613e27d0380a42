use std::path::{Path, PathBuf};

use crate::EmbedError;

/// Whether a failed asset resolution may be papered over with the stub.
pub(crate) fn should_fallback_to_stub(err: &EmbedError) -> bool {
    matches!(err, EmbedError::ModelNotFound(_) | EmbedError::Download(_))
}

/// Returns `target` if it already exists, otherwise downloads `remote_url` into it.
pub(crate) async fn ensure_model_file(
    target: &Path,
    remote_url: Option<&str>,
) -> Result<PathBuf, EmbedError> {
    if target.exists() {
        return Ok(target.to_path_buf());
    }

    if let Some(url) = remote_url {
        tracing::info!(url, path = %target.display(), "downloading model");
        download_to_path(target, url).await?;
        return Ok(target.to_path_buf());
    }

    Err(EmbedError::ModelNotFound(target.display().to_string()))
}

/// Downloads `url` into `target`, creating parent directories as needed.
async fn download_to_path(target: &Path, url: &str) -> Result<(), EmbedError> {
    if let Some(parent) = target.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let response = reqwest::get(url)
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EmbedError::Download(format!(
            "unexpected status {status} while fetching {url}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))?;

    tokio::fs::write(target, &bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_file_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"onnx").unwrap();

        let resolved = ensure_model_file(&path, None).await.unwrap();
        assert_eq!(resolved, path);
    }

    #[tokio::test]
    async fn missing_file_without_url_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.onnx");

        let err = ensure_model_file(&path, None).await.unwrap_err();
        assert!(matches!(err, EmbedError::ModelNotFound(_)));
        assert!(should_fallback_to_stub(&err));
    }

    #[test]
    fn inference_errors_do_not_fall_back() {
        assert!(!should_fallback_to_stub(&EmbedError::Inference("x".into())));
        assert!(!should_fallback_to_stub(&EmbedError::InvalidImage("x".into())));
    }
}
