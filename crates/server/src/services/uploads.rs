//! Saving uploaded files under the upload directory.

use std::path::Path;

use crate::services::ids::unique_filename;

/// Write `bytes` under `dir` with a fresh name that keeps the extension.
///
/// Creates `dir` if needed and returns the stored file name.
///
/// # Errors
///
/// Returns the I/O error if the directory or file cannot be written.
pub async fn save_upload(dir: &Path, original_name: &str, bytes: &[u8]) -> std::io::Result<String> {
    tokio::fs::create_dir_all(dir).await?;
    let filename = unique_filename(original_name);
    tokio::fs::write(dir.join(&filename), bytes).await?;
    tracing::info!(%filename, size = bytes.len(), "upload stored");
    Ok(filename)
}

/// Public path of a stored upload.
#[must_use]
pub fn upload_url(filename: &str) -> String {
    format!("/uploads/{filename}")
}

/// Whether a client file name ends in `.xlsx`, case-insensitively.
#[must_use]
pub fn is_xlsx(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xlsx() {
        assert!(is_xlsx("products.xlsx"));
        assert!(is_xlsx("PRODUCTS.XLSX"));
        assert!(!is_xlsx("products.xls"));
        assert!(!is_xlsx("xlsx"));
    }

    #[tokio::test]
    async fn test_save_upload_keeps_extension() {
        let dir = std::env::temp_dir().join(format!("hackshop-upload-{}", uuid::Uuid::new_v4()));
        let name = save_upload(&dir, "photo.jpg", b"jpeg").await.unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(tokio::fs::read(dir.join(&name)).await.unwrap(), b"jpeg");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
