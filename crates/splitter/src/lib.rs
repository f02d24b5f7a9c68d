//! # Splitter
//!
//! 单输入多输出分流引擎。
//!
//! 负责：
//! - 按端口策略表路由元数据（首个接收端口转移所有权，其余端口克隆）
//! - EOS 按端口重新标记为 internal / external
//! - 样本数据按端口容量拷贝或原地转发
//! - 按端口时间戳模式设置时间戳
//!
//! ## 使用示例
//!
//! ```ignore
//! use splitter::Splitter;
//!
//! let mut splitter = Splitter::from_blueprint(&blueprint)?;
//!
//! let report = splitter.process(&mut input, &mut outputs)?;
//! if report.status() == FrameStatus::Degraded {
//!     // some metadata duplicates were lost
//! }
//! ```

mod error;
mod fanout;
mod handler;
mod metadata;
mod policy;
mod port;
mod splitter;

pub use error::SplitterError;
pub use handler::HeapMetadataHandler;
pub use policy::{is_blocked, AllowList, PortPolicyTable};
pub use port::OutputPort;
pub use splitter::{Splitter, SplitterStats};

// Re-export contracts types
pub use contracts::{FrameReport, FrameStatus, MetadataHandler, StreamFrame};
