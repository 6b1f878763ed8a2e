//! Item Queue - 待处理图像队列

use serde::{Deserialize, Serialize};

use super::{ImagePayload, WorkItem};

/// 单批次默认最大图像数
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// 队列警告（不是错误，提示给用户后继续处理）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueWarning {
    /// 超出上限的文件被丢弃
    Truncated { kept: usize, dropped: usize },
}

impl std::fmt::Display for QueueWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueWarning::Truncated { kept, .. } => {
                write!(f, "Only the first {} images will be processed.", kept)
            }
        }
    }
}

/// 工作项队列
///
/// 保持输入顺序，每个文件对应一个 WorkItem。
/// 提交新文件会替换之前的队列。
#[derive(Debug, Clone)]
pub struct ItemQueue {
    max_items: usize,
    items: Vec<WorkItem>,
}

impl ItemQueue {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            items: Vec::new(),
        }
    }

    /// 用新的文件列表替换队列
    ///
    /// 超出 `max_items` 的文件被截断并返回警告。
    /// 空列表不会改变现有队列。
    pub fn submit(&mut self, mut files: Vec<ImagePayload>) -> Option<QueueWarning> {
        let warning = if files.len() > self.max_items {
            let dropped = files.len() - self.max_items;
            files.truncate(self.max_items);
            Some(QueueWarning::Truncated {
                kept: self.max_items,
                dropped,
            })
        } else {
            None
        };

        if !files.is_empty() {
            self.items = files
                .into_iter()
                .enumerate()
                .map(|(index, payload)| WorkItem::new(index, payload))
                .collect();
        }

        warning
    }

    /// 清空队列
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// 为一次运行生成全新的工作项，队列保持不变
    pub fn fresh_items(&self) -> Vec<WorkItem> {
        self.items
            .iter()
            .map(|item| WorkItem::new(item.index(), item.payload().clone()))
            .collect()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

impl Default for ItemQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}
