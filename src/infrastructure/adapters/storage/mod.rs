//! Storage Adapter - 标注预览文件存储

mod file_storage;

pub use file_storage::FileAnnotationStorage;
