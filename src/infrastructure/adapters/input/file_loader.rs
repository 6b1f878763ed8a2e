//! File Loader - 读取并校验待上传的图像文件
//!
//! 只接受 JPEG/PNG 且不超过大小上限的文件；被拒绝的文件只产生警告，不影响其它文件

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::batch::{ImageFormat, ImagePayload};

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedType,
    TooLarge { size: u64, limit: u64 },
    Unreadable(String),
}

/// 单个被拒绝的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRejection {
    pub path: PathBuf,
    pub reason: RejectReason,
}

impl InputRejection {
    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl std::fmt::Display for InputRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.display_name();
        match &self.reason {
            RejectReason::UnsupportedType => {
                write!(f, "{} is not a supported image type (JPEG/PNG only).", name)
            }
            RejectReason::TooLarge { limit, .. } => {
                write!(f, "{} exceeds {}MB limit.", name, limit / (1024 * 1024))
            }
            RejectReason::Unreadable(e) => write!(f, "{} could not be read: {}", name, e),
        }
    }
}

/// 加载结果
#[derive(Debug, Default)]
pub struct LoadedFiles {
    pub files: Vec<ImagePayload>,
    pub rejections: Vec<InputRejection>,
}

/// 图像文件加载器
pub struct FileLoader {
    max_file_size: u64,
}

impl FileLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// 按输入顺序加载文件
    pub async fn load(&self, paths: &[PathBuf]) -> LoadedFiles {
        let mut loaded = LoadedFiles::default();

        for path in paths {
            match self.load_one(path).await {
                Ok(payload) => loaded.files.push(payload),
                Err(reason) => {
                    let rejection = InputRejection {
                        path: path.clone(),
                        reason,
                    };
                    tracing::warn!(path = %path.display(), reason = %rejection, "File rejected");
                    loaded.rejections.push(rejection);
                }
            }
        }

        tracing::debug!(
            accepted = loaded.files.len(),
            rejected = loaded.rejections.len(),
            "Input files loaded"
        );
        loaded
    }

    async fn load_one(&self, path: &Path) -> Result<ImagePayload, RejectReason> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(RejectReason::Unreadable("not a regular file".to_string()));
        }
        if metadata.len() > self.max_file_size {
            return Err(RejectReason::TooLarge {
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        let data = fs::read(path)
            .await
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?;

        // 优先按文件头识别，无法识别时退回扩展名
        let format = ImageFormat::from_magic(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or(RejectReason::UnsupportedType)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        ImagePayload::new(file_name, format, data)
            .map_err(|e| RejectReason::Unreadable(e.to_string()))
    }
}
