//! RenderGraph 资源句柄定义
//!
//! 句柄是 registry 内部 SlotMap 的 key（index + generation），与 device 的物理句柄分离。
//! `clear()` 之后旧句柄全部失效，访问时返回 `None` 而不是悬空引用。

use slotmap::{Key, new_key_type};

new_key_type! { pub struct RgBufferHandle; }
new_key_type! { pub struct RgImageHandle; }
new_key_type! { pub struct RgSamplerHandle; }
new_key_type! { pub struct RgShaderResourceHandle; }

/// 逻辑资源的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceKind {
    Buffer,
    Image,
    Sampler,
    ShaderResource,
    /// 仅出现在 shader resource 的绑定中
    BufferView,
}

/// 带类型的资源句柄
///
/// 指向四个 registry 之一；`Default` 为无效句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceHandle {
    Buffer(RgBufferHandle),
    Image(RgImageHandle),
    Sampler(RgSamplerHandle),
    ShaderResource(RgShaderResourceHandle),
}

impl Default for RgResourceHandle {
    fn default() -> Self {
        Self::Buffer(RgBufferHandle::null())
    }
}

impl RgResourceHandle {
    #[inline]
    pub fn kind(&self) -> RgResourceKind {
        match self {
            Self::Buffer(_) => RgResourceKind::Buffer,
            Self::Image(_) => RgResourceKind::Image,
            Self::Sampler(_) => RgResourceKind::Sampler,
            Self::ShaderResource(_) => RgResourceKind::ShaderResource,
        }
    }

    /// 是否为 null 句柄（从未解析过）
    #[inline]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Buffer(h) => h.is_null(),
            Self::Image(h) => h.is_null(),
            Self::Sampler(h) => h.is_null(),
            Self::ShaderResource(h) => h.is_null(),
        }
    }

    #[inline]
    pub fn as_buffer(&self) -> Option<RgBufferHandle> {
        match self {
            Self::Buffer(h) if !h.is_null() => Some(*h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_image(&self) -> Option<RgImageHandle> {
        match self {
            Self::Image(h) if !h.is_null() => Some(*h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_sampler(&self) -> Option<RgSamplerHandle> {
        match self {
            Self::Sampler(h) if !h.is_null() => Some(*h),
            _ => None,
        }
    }

    #[inline]
    pub fn as_shader_resource(&self) -> Option<RgShaderResourceHandle> {
        match self {
            Self::ShaderResource(h) if !h.is_null() => Some(*h),
            _ => None,
        }
    }
}

impl From<RgBufferHandle> for RgResourceHandle {
    fn from(h: RgBufferHandle) -> Self {
        Self::Buffer(h)
    }
}

impl From<RgImageHandle> for RgResourceHandle {
    fn from(h: RgImageHandle) -> Self {
        Self::Image(h)
    }
}

impl From<RgSamplerHandle> for RgResourceHandle {
    fn from(h: RgSamplerHandle) -> Self {
        Self::Sampler(h)
    }
}

impl From<RgShaderResourceHandle> for RgResourceHandle {
    fn from(h: RgShaderResourceHandle) -> Self {
        Self::ShaderResource(h)
    }
}
