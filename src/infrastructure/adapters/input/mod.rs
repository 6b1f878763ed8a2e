//! Input Adapter - 本地图像文件加载与校验

mod file_loader;

pub use file_loader::{FileLoader, InputRejection, LoadedFiles, RejectReason};
