//! File Storage - 文件系统标注预览存储实现
//!
//! 实现 AnnotationStoragePort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AnnotationStorageError, AnnotationStoragePort};
use crate::domain::batch::BatchRunId;

/// 文件系统标注存储
pub struct FileAnnotationStorage {
    /// 存储根目录
    base_dir: PathBuf,
}

impl FileAnnotationStorage {
    /// 创建新的文件存储
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, AnnotationStorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    /// 获取存储根目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl AnnotationStoragePort for FileAnnotationStorage {
    fn get_run_dir(&self, run_id: BatchRunId) -> PathBuf {
        self.base_dir.join(run_id.to_string())
    }

    fn get_preview_path(&self, run_id: BatchRunId, index: usize, file_name: &str) -> PathBuf {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        self.get_run_dir(run_id)
            .join(format!("{:02}_{}.png", index + 1, stem))
    }

    async fn save_preview(
        &self,
        run_id: BatchRunId,
        index: usize,
        file_name: &str,
        png: &[u8],
    ) -> Result<PathBuf, AnnotationStorageError> {
        let run_dir = self.get_run_dir(run_id);

        fs::create_dir_all(&run_dir)
            .await
            .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?;

        let path = self.get_preview_path(run_id, index, file_name);
        fs::write(&path, png)
            .await
            .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?;

        tracing::debug!(
            run_id = %run_id,
            index = index,
            path = %path.display(),
            size = png.len(),
            "Saved annotated preview"
        );

        Ok(path)
    }

    async fn delete_run(&self, run_id: BatchRunId) -> Result<u64, AnnotationStorageError> {
        let run_dir = self.get_run_dir(run_id);

        if !run_dir.exists() {
            return Ok(0);
        }

        let mut deleted_count = 0u64;
        let mut entries = fs::read_dir(&run_dir)
            .await
            .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?
        {
            if entry.path().extension().map_or(false, |ext| ext == "png") {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|e| AnnotationStorageError::IoError(e.to_string()))?;
                deleted_count += 1;
            }
        }

        // 尝试删除空目录
        let _ = fs::remove_dir(&run_dir).await;

        tracing::info!(run_id = %run_id, files = deleted_count, "Deleted run previews");

        Ok(deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_delete_previews() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAnnotationStorage::new(temp_dir.path()).await.unwrap();
        let run_id = BatchRunId::new();

        let path = storage
            .save_preview(run_id, 0, "chest_xray.jpeg", b"png bytes")
            .await
            .unwrap();
        assert!(path.exists());
        assert!(path.ends_with("01_chest_xray.png"));

        storage
            .save_preview(run_id, 1, "other.png", b"png bytes")
            .await
            .unwrap();

        let deleted = storage.delete_run(run_id).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(!storage.get_run_dir(run_id).exists());
    }

    #[tokio::test]
    async fn test_delete_missing_run() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAnnotationStorage::new(temp_dir.path()).await.unwrap();
        assert_eq!(storage.delete_run(BatchRunId::new()).await.unwrap(), 0);
    }
}
