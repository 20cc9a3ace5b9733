//! 声明式 frame graph
//!
//! 注册逻辑资源（buffer / image / sampler / shader resource）和 Pass，
//! compile 时推导依赖、物化物理资源、计算 barrier，之后每帧 execute。
//! GPU 相关的操作全部通过 [`device::RgDevice`] 完成。

pub mod config;
pub mod device;
pub mod error;
pub mod headless_device;
pub mod logging;
pub mod render_graph;

pub use config::{RgConfig, RgWriterPolicy};
pub use device::{RgCommandRecorder, RgDevice};
pub use error::{RgError, RgErrorKind, RgResult};
pub use headless_device::{HeadlessCommand, HeadlessDevice};
pub use render_graph::*;
