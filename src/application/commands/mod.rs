//! 应用层 - 命令（写操作）

mod batch_commands;

pub mod handlers;

pub use batch_commands::*;
