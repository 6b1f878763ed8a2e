//! Command Handlers 实现

mod batch_handlers;

pub use batch_handlers::*;
