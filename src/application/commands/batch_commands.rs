//! Batch Commands - 批量上传相关命令

use std::path::PathBuf;

use crate::domain::batch::{BatchReport, BatchRunId, ImagePayload, QueueWarning};

/// 用新文件替换队列
#[derive(Debug, Clone)]
pub struct SubmitFiles {
    pub files: Vec<ImagePayload>,
}

/// 提交结果
#[derive(Debug, Clone)]
pub struct SubmitFilesResponse {
    pub queued: usize,
    pub warning: Option<QueueWarning>,
}

/// 开始处理当前队列
#[derive(Debug, Clone, Default)]
pub struct StartBatch;

/// 批次完成后的报告
#[derive(Debug, Clone)]
pub struct StartBatchResponse {
    pub report: BatchReport,
}

/// 清空队列和结果
#[derive(Debug, Clone, Default)]
pub struct ClearBatch;

/// 为最近一次批次生成标注预览
#[derive(Debug, Clone, Default)]
pub struct RenderAnnotations;

/// 单项预览
#[derive(Debug, Clone)]
pub struct RenderedPreview {
    pub index: usize,
    pub file_name: String,
    pub path: PathBuf,
    /// 是否画出了边界框
    pub annotated: bool,
}

/// 标注结果
#[derive(Debug, Clone)]
pub struct RenderAnnotationsResponse {
    pub run_id: BatchRunId,
    pub previews: Vec<RenderedPreview>,
    /// 解码失败等跳过的项 (index, reason)
    pub skipped: Vec<(usize, String)>,
}
