use ash::vk;

use crate::render_graph::resource_state::{RgResourceSource, RgResourceUsageState};

/// 缓冲区资源描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBufferDesc {
    /// 缓冲区大小（字节）
    pub size: vk::DeviceSize,
    /// 缓冲区用途
    pub usage: vk::BufferUsageFlags,
}

impl Default for RgBufferDesc {
    fn default() -> Self {
        Self {
            size: 0,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
        }
    }
}

// new & init
impl RgBufferDesc {
    /// 创建新描述
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self { size, usage }
    }
}

/// 缓冲区资源条目
#[derive(Clone, Debug)]
pub struct RgBufferResource {
    /// 调试名称
    pub name: String,
    pub desc: RgBufferDesc,
    pub source: RgResourceSource,
    frames_in_flight: usize,
    /// 每个 frame in flight 一份；物化之前为空
    physical: Vec<vk::Buffer>,
}

// new & init
impl RgBufferResource {
    /// 由 RenderGraph 创建的缓冲区
    pub fn owned(name: impl Into<String>, desc: RgBufferDesc, frames_in_flight: usize) -> Self {
        Self {
            name: name.into(),
            desc,
            source: RgResourceSource::Owned,
            frames_in_flight,
            physical: Vec::new(),
        }
    }

    /// 导入的缓冲区
    pub fn imported(
        name: impl Into<String>,
        physical: Vec<vk::Buffer>,
        desc: RgBufferDesc,
        initial_state: RgResourceUsageState,
    ) -> Self {
        Self {
            name: name.into(),
            desc,
            source: RgResourceSource::Imported { initial_state },
            frames_in_flight: physical.len(),
            physical,
        }
    }
}

// update
impl RgBufferResource {
    pub(crate) fn set_physical(&mut self, physical: Vec<vk::Buffer>) {
        self.physical = physical;
    }

    pub(crate) fn take_physical(&mut self) -> Vec<vk::Buffer> {
        std::mem::take(&mut self.physical)
    }
}

// getter
impl RgBufferResource {
    #[inline]
    pub fn is_materialized(&self) -> bool {
        !self.physical.is_empty()
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// 当前帧的物理缓冲区
    #[inline]
    pub fn physical(&self, frame_index: usize) -> Option<vk::Buffer> {
        if self.physical.is_empty() {
            return None;
        }
        self.physical.get(frame_index % self.physical.len()).copied()
    }

    #[inline]
    pub fn physical_all(&self) -> &[vk::Buffer] {
        &self.physical
    }
}
