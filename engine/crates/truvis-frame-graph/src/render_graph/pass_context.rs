use std::collections::HashMap;

use ash::vk;

use crate::device::RgDevice;
use crate::render_graph::image_resource::RgImagePhysical;
use crate::render_graph::pass::RgQueueType;
use crate::render_graph::resource_handle::{RgResourceHandle, RgResourceKind};
use crate::render_graph::resource_registry::RgResourceRegistry;

/// Pass 自己声明过的资源：`(种类, 名字) -> 句柄`，在 compile 的资源链接阶段填充
#[derive(Clone, Debug, Default)]
pub struct RgPassContextData {
    handles: HashMap<(RgResourceKind, String), RgResourceHandle>,
}

impl RgPassContextData {
    pub(crate) fn insert(&mut self, name: &str, handle: RgResourceHandle) {
        self.handles.insert((handle.kind(), name.to_string()), handle);
    }

    pub(crate) fn clear(&mut self) {
        self.handles.clear();
    }

    #[inline]
    pub fn get(&self, kind: RgResourceKind, name: &str) -> Option<RgResourceHandle> {
        self.handles.get(&(kind, name.to_string())).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// 预先配置好的命令编码器
///
/// 命令缓冲区已经 begin，pass 内的 draw/dispatch 通过 `device()` 自行录制。
pub struct RgCommandEncoder<'a> {
    pub(crate) device: &'a dyn RgDevice,
    pub(crate) command_buffer: vk::CommandBuffer,
    pub(crate) queue: RgQueueType,
    pub(crate) frame_index: usize,
}

impl<'a> RgCommandEncoder<'a> {
    #[inline]
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    #[inline]
    pub fn device(&self) -> &'a dyn RgDevice {
        self.device
    }

    #[inline]
    pub fn queue(&self) -> RgQueueType {
        self.queue
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }
}

/// Pass 执行时的上下文
///
/// 按名字解析到当前帧的物理资源。先查 pass 自己声明过的资源，
/// 找不到时再查 graph 的注册表，因此 pass 也可以访问未声明依赖的资源（不会为其生成 barrier）。
pub struct RgPassContext<'a> {
    pub(crate) pass_name: &'a str,
    pub(crate) frame_index: usize,
    pub(crate) registry: &'a RgResourceRegistry,
    pub(crate) data: &'a RgPassContextData,
    pub(crate) encoder: RgCommandEncoder<'a>,
}

// getters
impl<'a> RgPassContext<'a> {
    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[inline]
    pub fn encoder(&self) -> &RgCommandEncoder<'a> {
        &self.encoder
    }

    #[inline]
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.encoder.command_buffer
    }

    fn resolve(&self, kind: RgResourceKind, name: &str) -> Option<RgResourceHandle> {
        self.data.get(kind, name).or_else(|| self.registry.lookup(kind, name))
    }

    /// 当前帧的物理缓冲区
    pub fn get_buffer(&self, name: &str) -> Option<vk::Buffer> {
        let handle = self.resolve(RgResourceKind::Buffer, name)?.as_buffer()?;
        self.registry.physical_buffer(handle, self.frame_index)
    }

    /// 当前帧的物理图像和默认 view
    pub fn get_image(&self, name: &str) -> Option<RgImagePhysical> {
        let handle = self.resolve(RgResourceKind::Image, name)?.as_image()?;
        self.registry.physical_image(handle, self.frame_index)
    }

    #[inline]
    pub fn get_image_view(&self, name: &str) -> Option<vk::ImageView> {
        self.get_image(name).map(|p| p.view)
    }

    pub fn get_image_extent(&self, name: &str) -> Option<vk::Extent2D> {
        let handle = self.resolve(RgResourceKind::Image, name)?.as_image()?;
        self.registry.get_image(handle).map(|r| r.extent())
    }

    pub fn get_sampler(&self, name: &str) -> Option<vk::Sampler> {
        let handle = self.resolve(RgResourceKind::Sampler, name)?.as_sampler()?;
        self.registry.physical_sampler(handle)
    }

    /// 当前帧的 descriptor set
    pub fn get_descriptor_set(&self, name: &str) -> Option<vk::DescriptorSet> {
        let handle = self.resolve(RgResourceKind::ShaderResource, name)?.as_shader_resource()?;
        self.registry.descriptor_set(handle, self.frame_index)
    }
}
