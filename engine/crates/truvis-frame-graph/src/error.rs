//! Frame graph 错误类型
//!
//! 所有失败都通过 `RgError` 返回，`RgError::kind()` 给出错误类别：
//!
//! - **Configuration**: 引用了未定义的资源、shader resource 的绑定类型不匹配等
//! - **Structural**: pass 之间存在循环依赖
//! - **Resource**: device 创建物理资源失败（返回了 null handle）

use crate::render_graph::{RgGraphState, RgResourceKind};

pub type RgResult<T> = Result<T, RgError>;

/// 错误类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgErrorKind {
    Configuration,
    Structural,
    Resource,
}

#[derive(Debug, thiserror::Error)]
pub enum RgError {
    #[error("pass \"{pass}\" references undefined {kind:?} \"{name}\"")]
    UndefinedResource {
        pass: String,
        kind: RgResourceKind,
        name: String,
    },

    #[error("shader resource \"{shader_resource}\" binding {binding}: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        shader_resource: String,
        binding: u32,
        expected: RgResourceKind,
        actual: RgResourceKind,
    },

    #[error("shader resource \"{shader_resource}\" binding {binding}: expected {expected} elements, got {actual}")]
    ArraySizeMismatch {
        shader_resource: String,
        binding: u32,
        expected: usize,
        actual: usize,
    },

    #[error("shader resource \"{shader_resource}\" binding {binding}: {kind:?} cannot be bound to a descriptor")]
    UnsupportedBindingKind {
        shader_resource: String,
        binding: u32,
        kind: RgResourceKind,
    },

    #[error("shader resource \"{shader_resource}\" has no binding {binding}")]
    UnknownBinding { shader_resource: String, binding: u32 },

    #[error("shader resource \"{shader_resource}\" binding {binding}[{element}] is unresolved: {reason}")]
    UnresolvedBinding {
        shader_resource: String,
        binding: u32,
        element: usize,
        reason: String,
    },

    #[error("import of {kind:?} \"{name}\" rejected: {reason}")]
    InvalidImport {
        kind: RgResourceKind,
        name: String,
        reason: String,
    },

    #[error("stale or invalid {0:?} handle")]
    InvalidHandle(RgResourceKind),

    #[error("device failed to create {kind:?} \"{name}\" (frame slot {frame})")]
    ResourceCreation {
        kind: RgResourceKind,
        name: String,
        frame: usize,
    },

    #[error("device failed to create command buffer for pass \"{pass}\" (frame slot {frame})")]
    CommandBufferCreation { pass: String, frame: usize },

    #[error("cyclic dependency: sorted {sorted} of {total} passes, remaining {remaining:?}")]
    CyclicDependency {
        sorted: usize,
        total: usize,
        remaining: Vec<String>,
    },

    #[error("render graph is not compiled (state: {0:?})")]
    NotCompiled(RgGraphState),

    #[error("invalid frame graph config: {0}")]
    Config(String),
}

impl RgError {
    pub fn kind(&self) -> RgErrorKind {
        match self {
            Self::CyclicDependency { .. } => RgErrorKind::Structural,
            Self::ResourceCreation { .. } | Self::CommandBufferCreation { .. } => RgErrorKind::Resource,
            _ => RgErrorKind::Configuration,
        }
    }
}
