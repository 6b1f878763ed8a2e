//! Annotation Storage Port - 出站端口
//!
//! 保存带标注的预览图

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::batch::BatchRunId;

/// 标注存储错误
#[derive(Debug, Error)]
pub enum AnnotationStorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Annotation Storage Port
#[async_trait]
pub trait AnnotationStoragePort: Send + Sync {
    /// 批次的输出目录
    fn get_run_dir(&self, run_id: BatchRunId) -> PathBuf;

    /// 单项预览图路径
    fn get_preview_path(&self, run_id: BatchRunId, index: usize, file_name: &str) -> PathBuf;

    /// 保存 PNG 数据
    async fn save_preview(
        &self,
        run_id: BatchRunId,
        index: usize,
        file_name: &str,
        png: &[u8],
    ) -> Result<PathBuf, AnnotationStorageError>;

    /// 删除批次的全部预览图，返回删除数量
    async fn delete_run(&self, run_id: BatchRunId) -> Result<u64, AnnotationStorageError>;
}
