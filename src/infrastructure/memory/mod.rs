//! Memory Layer - In-Memory State Management
//!
//! 实现 BatchSessionPort，管理待处理队列和批次运行状态

mod batch_session;

pub use batch_session::InMemoryBatchSession;
