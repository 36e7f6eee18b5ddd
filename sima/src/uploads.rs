//! Photo blob store.
//!
//! Uploaded files are written once under a generated unique name and never
//! mutated in place, so concurrent uploads need no locking. The store only
//! hands back reference strings (`/uploads/<name>`); it never inspects the
//! file bytes, and references are not re-validated for existence at write
//! time.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::UploadsConfig;
use crate::errors::Error;

pub struct UploadStore {
    dir: PathBuf,
    allowed_extensions: Vec<String>,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, allowed_extensions: Vec<String>, max_file_size: usize) -> Self {
        Self {
            dir: dir.into(),
            allowed_extensions,
            max_file_size,
        }
    }

    pub fn from_config(config: &UploadsConfig) -> Self {
        Self::new(&config.directory, config.allowed_extensions.clone(), config.max_file_size)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn extension_of(original_name: &str) -> Option<String> {
        Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
    }

    /// Store one uploaded file and return its reference string.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String, Error> {
        if bytes.len() > self.max_file_size {
            return Err(Error::BadRequest {
                message: "El archivo supera el tamaño máximo permitido".to_string(),
            });
        }

        let extension = Self::extension_of(original_name).ok_or_else(|| Error::BadRequest {
            message: "Tipo de archivo no permitido".to_string(),
        })?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(Error::BadRequest {
                message: "Tipo de archivo no permitido".to_string(),
            });
        }

        let filename = format!("{}{}", Uuid::new_v4(), extension);
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await.map_err(|e| Error::Internal {
            operation: format!("write uploaded file: {e}"),
        })?;

        Ok(format!("/uploads/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> UploadStore {
        let dir = std::env::temp_dir().join(format!("sima-uploads-{}", Uuid::new_v4()));
        UploadStore::new(
            dir,
            vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string(), ".webp".to_string()],
            1024,
        )
    }

    #[tokio::test]
    async fn stores_files_under_generated_names() {
        let store = test_store();
        store.ensure_dir().await.unwrap();

        let reference = store.store("foto.JPG", b"fake image bytes").await.unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with(".jpg"));

        let on_disk = store.dir().join(reference.strip_prefix("/uploads/").unwrap());
        assert_eq!(std::fs::read(on_disk).unwrap(), b"fake image bytes");

        // Names never collide across uploads of the same file
        let other = store.store("foto.JPG", b"fake image bytes").await.unwrap();
        assert_ne!(reference, other);
    }

    #[tokio::test]
    async fn rejects_disallowed_extensions() {
        let store = test_store();
        store.ensure_dir().await.unwrap();

        for name in ["malware.exe", "nota.txt", "sin_extension"] {
            let err = store.store(name, b"x").await.unwrap_err();
            assert_eq!(err.user_message(), "Tipo de archivo no permitido");
        }
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let store = test_store();
        store.ensure_dir().await.unwrap();

        let big = vec![0u8; 2048];
        let err = store.store("foto.jpg", &big).await.unwrap_err();
        assert!(err.user_message().contains("tamaño máximo"));
    }
}
