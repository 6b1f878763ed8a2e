//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod input;
pub mod overlay;
pub mod prediction;
pub mod storage;

pub use input::*;
pub use overlay::*;
pub use prediction::*;
pub use storage::*;
